//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, GestureConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only existing
/// files are returned.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/gesture-study/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("gesture-study/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("gesture-study.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load a TOML file on top of `base`. Keys absent from the file keep their
/// value from `base`.
pub fn load_from_file(base: GestureConfig, path: &Path) -> Result<GestureConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml_onto(base, &contents, path)
}

/// Overlay the keys found in `contents` onto `config`.
fn parse_toml_onto(
    mut config: GestureConfig,
    contents: &str,
    path: &Path,
) -> Result<GestureConfig, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("state_dir").and_then(|v| v.as_str()) {
            config.infra.paths.state_dir = expand_path(v);
        }
        if let Some(v) = paths.get("database").and_then(|v| v.as_str()) {
            config.infra.paths.database = Some(expand_path(v));
        }
    }

    if let Some(bind) = table.get("bind").and_then(|v| v.as_table()) {
        if let Some(v) = bind.get("host").and_then(|v| v.as_str()) {
            config.infra.bind.host = v.to_string();
        }
        if let Some(v) = bind.get("http_port").and_then(|v| v.as_integer()) {
            config.infra.bind.http_port = port_from(v, path)?;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("otlp_endpoint").and_then(|v| v.as_str()) {
            config.infra.telemetry.otlp_endpoint = v.to_string();
        }
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.infra.telemetry.log_level = v.to_string();
        }
    }

    if let Some(admin) = table.get("admin").and_then(|v| v.as_table()) {
        if let Some(v) = admin.get("token").and_then(|v| v.as_str()) {
            config.infra.admin.token = v.to_string();
        }
    }

    if let Some(capture) = table.get("capture").and_then(|v| v.as_table()) {
        if let Some(v) = capture.get("target_hz").and_then(|v| v.as_integer()) {
            config.capture.target_hz = rate_from(v, "capture.target_hz", path)?;
        }
        if let Some(v) = capture.get("min_hz").and_then(|v| v.as_integer()) {
            config.capture.min_hz = rate_from(v, "capture.min_hz", path)?;
        }
    }

    Ok(config)
}

fn port_from(value: i64, path: &Path) -> Result<u16, ConfigError> {
    u16::try_from(value).map_err(|_| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("bind.http_port out of range: {}", value),
    })
}

fn rate_from(value: i64, key: &str, path: &Path) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{} must be a non-negative integer: {}", key, value),
    })
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut GestureConfig, sources: &mut ConfigSources) {
    apply_overrides_with(config, sources, |key| env::var(key).ok());
}

/// Apply overrides using an arbitrary lookup, so callers can supply a fixed map.
pub fn apply_overrides_with<F>(config: &mut GestureConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut note = |key: &str| sources.env_overrides.push(key.to_string());

    if let Some(v) = lookup("GESTURE_STATE_DIR") {
        config.infra.paths.state_dir = expand_path(&v);
        note("GESTURE_STATE_DIR");
    }
    if let Some(v) = lookup("GESTURE_DATABASE") {
        config.infra.paths.database = Some(expand_path(&v));
        note("GESTURE_DATABASE");
    }

    if let Some(v) = lookup("GESTURE_HOST") {
        config.infra.bind.host = v;
        note("GESTURE_HOST");
    }
    if let Some(v) = lookup("GESTURE_HTTP_PORT") {
        if let Ok(port) = v.parse() {
            config.infra.bind.http_port = port;
            note("GESTURE_HTTP_PORT");
        }
    }

    if let Some(v) = lookup("GESTURE_OTLP_ENDPOINT") {
        config.infra.telemetry.otlp_endpoint = v;
        note("GESTURE_OTLP_ENDPOINT");
    }
    if let Some(v) = lookup("GESTURE_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        note("GESTURE_LOG_LEVEL");
    }

    if let Some(v) = lookup("GESTURE_ADMIN_TOKEN") {
        config.infra.admin.token = v;
        note("GESTURE_ADMIN_TOKEN");
    }

    if let Some(v) = lookup("GESTURE_TARGET_HZ") {
        if let Ok(hz) = v.parse() {
            config.capture.target_hz = hz;
            note("GESTURE_TARGET_HZ");
        }
    }
    if let Some(v) = lookup("GESTURE_MIN_HZ") {
        if let Ok(hz) = v.parse() {
            config.capture.min_hz = hz;
            note("GESTURE_MIN_HZ");
        }
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
