//! Admin export: every trial of a study as one JSON file per trial in a zip.

use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use gesturedb::TrialRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::ApiError;
use crate::web::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub study_id: Option<String>,
    pub study_version: Option<String>,
}

/// One exported trial file.
#[derive(Debug, Serialize)]
pub struct ExportedTrial {
    pub schema_version: i64,
    pub study_id: String,
    pub study_version: String,
    pub session_id: String,
    pub trial_id: String,
    pub trial_index: i64,
    pub stimulus_id: Option<String>,
    pub t_start_perf_ms: f64,
    pub t_end_perf_ms: f64,
    pub duration_ms: f64,
    pub sample_count: i64,
    pub effective_hz: f64,
    pub survey: Value,
    pub diagnostics: Value,
    pub samples: Value,
    pub created_at: String,
}

impl From<TrialRecord> for ExportedTrial {
    fn from(row: TrialRecord) -> Self {
        let decode = |text: Option<&str>| {
            text.and_then(|t| serde_json::from_str::<Value>(t).ok())
                .unwrap_or(Value::Null)
        };
        let samples = serde_json::from_str::<Value>(&row.samples_json)
            .ok()
            .filter(Value::is_array)
            .unwrap_or_else(|| Value::Array(Vec::new()));

        Self {
            schema_version: row.schema_version,
            survey: decode(row.survey_json.as_deref()),
            diagnostics: decode(row.diagnostics_json.as_deref()),
            samples,
            study_id: row.study_id,
            study_version: row.study_version,
            session_id: row.session_id,
            trial_id: row.id,
            trial_index: row.trial_index,
            stimulus_id: row.stimulus_id,
            t_start_perf_ms: row.t_start_perf_ms,
            t_end_perf_ms: row.t_end_perf_ms,
            duration_ms: row.duration_ms,
            sample_count: row.sample_count,
            effective_hz: row.effective_hz,
            created_at: row.created_at,
        }
    }
}

/// Check the presented token against the configured one.
pub fn authorize(configured: &str, presented: Option<&str>) -> Result<(), ApiError> {
    if configured.is_empty() {
        error!("export requested but no admin token is configured");
        return Err(ApiError::Internal("Export is not configured".to_string()));
    }
    let presented = presented.unwrap_or_default();
    if bool::from(presented.as_bytes().ct_eq(configured.as_bytes())) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Keep ASCII letters, digits, `-`, `_` and `.`; everything else becomes `_`.
fn safe_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn archive_name(study_id: &str, study_version: Option<&str>) -> String {
    match study_version {
        Some(version) => format!("trials_{}_{}.zip", safe_name(study_id), safe_name(version)),
        None => format!("trials_{}.zip", safe_name(study_id)),
    }
}

/// Build the archive in memory, one deflated `trial_<id>.json` per row.
pub fn build_archive(rows: Vec<TrialRecord>) -> Result<Vec<u8>> {
    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for row in rows {
        let entry = format!("trial_{}.json", safe_name(&row.id));
        let trial = ExportedTrial::from(row);
        let json = serde_json::to_vec_pretty(&trial).context("Failed to encode trial")?;

        zip_writer
            .start_file(entry.as_str(), options)
            .with_context(|| format!("Failed to start zip entry {}", entry))?;
        zip_writer
            .write_all(&json)
            .with_context(|| format!("Failed to write zip entry {}", entry))?;
    }

    let finished = zip_writer.finish().context("Failed to finish zip archive")?;
    Ok(finished.into_inner())
}

#[tracing::instrument(skip_all)]
pub async fn export_trials(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = authorize(&state.config.infra.admin.token, presented) {
        if matches!(e, ApiError::Unauthorized) {
            warn!("export rejected: bad admin token");
        }
        return Err(e);
    }
    let Query(query) = query.map_err(|e| {
        warn!("export rejected: {}", e.body_text());
        ApiError::invalid("Invalid query string")
    })?;

    let study_id = query
        .study_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::invalid("study_id required"))?;
    let study_version = query
        .study_version
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let filename = archive_name(&study_id, study_version.as_deref());
    let (count, bytes) = state
        .with_db(move |db| {
            let rows = db.trials_for_study(&study_id, study_version.as_deref())?;
            let count = rows.len();
            if count == 0 {
                return Ok((0, Vec::new()));
            }
            Ok((count, build_archive(rows)?))
        })
        .await?;

    if count == 0 {
        return Err(ApiError::not_found("No trials found"));
    }
    info!(%filename, trials = count, bytes = bytes.len(), "export built");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))
}
