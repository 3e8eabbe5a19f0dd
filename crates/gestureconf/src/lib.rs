//! Configuration loading for the gesture study services.
//!
//! Both `gesturehub` (the HTTP API) and `gesturectl` (the capture CLI) read
//! their settings through this crate so that paths, ports and sampling hints
//! agree between the two.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/gesture-study/config.toml` (system)
//! 2. `~/.config/gesture-study/config.toml` (user)
//! 3. `./gesture-study.toml` (local override, replaced by `--config` if given)
//! 4. Environment variables (`GESTURE_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! state_dir = "~/.local/share/gesture-study"
//!
//! [bind]
//! host = "0.0.0.0"
//! http_port = 8090
//!
//! [telemetry]
//! otlp_endpoint = ""
//! log_level = "info"
//!
//! [admin]
//! token = "change-me"
//!
//! [capture]
//! target_hz = 100
//! min_hz = 60
//! ```

pub mod infra;
pub mod loader;
pub mod study;

pub use infra::{AdminConfig, BindConfig, InfraConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use study::CaptureDefaults;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete gesture study configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GestureConfig {
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Sampling hints handed to clients when a session starts.
    #[serde(default)]
    pub capture: CaptureDefaults,
}

impl GestureConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` replace the local
    /// `./gesture-study.toml` override. System and user files still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = GestureConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            config = loader::load_from_file(config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Resolved SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        self.infra.paths.database_path()
    }

    /// Serialize config to a TOML string. The admin token is redacted.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Gesture Study Configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "state_dir = \"{}\"\n",
            self.infra.paths.state_dir.display()
        ));
        if let Some(database) = &self.infra.paths.database {
            output.push_str(&format!("database = \"{}\"\n", database.display()));
        }

        output.push_str("\n[bind]\n");
        output.push_str(&format!("host = \"{}\"\n", self.infra.bind.host));
        output.push_str(&format!("http_port = {}\n", self.infra.bind.http_port));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "otlp_endpoint = \"{}\"\n",
            self.infra.telemetry.otlp_endpoint
        ));
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.infra.telemetry.log_level
        ));

        output.push_str("\n[admin]\n");
        let token = if self.infra.admin.is_configured() {
            "<redacted>"
        } else {
            ""
        };
        output.push_str(&format!("token = \"{}\"\n", token));

        output.push_str("\n[capture]\n");
        output.push_str(&format!("target_hz = {}\n", self.capture.target_hz));
        output.push_str(&format!("min_hz = {}\n", self.capture.min_hz));

        output
    }
}
