//! Session lifecycle: create and end.

use axum::extract::State;
use axum::Json;
use gesturedb::{format_timestamp, NewSession};
use serde::Serialize;
use tracing::{debug, info};

use crate::decode::{self, Body, JsonBody};
use crate::error::ApiError;
use crate::web::AppState;

const UNKNOWN: &str = "unknown";

/// Sampling hints returned to the client with a new session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub target_hz: u32,
    pub min_hz: u32,
    pub trials: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub ok: bool,
    pub session_id: String,
    pub study_id: String,
    pub study_version: String,
    pub schema_version: i64,
    pub consent_version: String,
    pub config: SessionConfig,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub ok: bool,
    pub session_id: String,
    pub completed_at: String,
}

/// Read a create-session body, applying defaults to anything malformed.
pub fn new_session_from(body: &Body) -> Result<NewSession, ApiError> {
    Ok(NewSession {
        study_id: decode::identifier_or(body, "study_id", UNKNOWN)?,
        study_version: decode::identifier_or(body, "study_version", UNKNOWN)?,
        schema_version: decode::strict_int_or(body, "schema_version", 1),
        consent_version: decode::string_or(body, "consent_version", UNKNOWN),
        capabilities: decode::structured(body, "capabilities"),
        metadata: decode::structured(body, "metadata"),
    })
}

#[tracing::instrument(skip_all, fields(session_id))]
pub async fn start_session(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let new = new_session_from(&body)?;
    let session = state.with_db(move |db| db.create_session(&new)).await?;

    tracing::Span::current().record("session_id", session.id.as_str());
    info!(
        study_id = %session.study_id,
        study_version = %session.study_version,
        "session started"
    );

    let defaults = &state.config.capture;
    Ok(Json(StartSessionResponse {
        ok: true,
        session_id: session.id.0,
        study_id: session.study_id,
        study_version: session.study_version,
        schema_version: session.schema_version,
        consent_version: session.consent_version,
        config: SessionConfig {
            target_hz: defaults.target_hz,
            min_hz: defaults.min_hz,
            trials: Vec::new(),
        },
    }))
}

/// Mark a session complete. The update itself reports whether the session
/// exists; no row is ever created.
#[tracing::instrument(skip_all, fields(session_id))]
pub async fn end_session(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<EndSessionResponse>, ApiError> {
    let session_id = decode::required(&body, "session_id")?;
    tracing::Span::current().record("session_id", session_id.as_str());

    let id = session_id.clone();
    let completed_at = state
        .with_db(move |db| db.end_session(&id))
        .await?
        .ok_or_else(|| {
            debug!("end requested for unknown session");
            ApiError::not_found("Session not found")
        })?;

    info!("session ended");
    Ok(Json(EndSessionResponse {
        ok: true,
        session_id,
        completed_at: format_timestamp(completed_at),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Body {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn malformed_fields_fall_back() {
        let new = new_session_from(&body(json!({
            "study_id": 12,
            "schema_version": "2",
            "consent_version": "  ",
            "capabilities": "yes",
            "metadata": {"ua": "x"},
        })))
        .unwrap();

        assert_eq!(new.study_id, "unknown");
        assert_eq!(new.study_version, "unknown");
        assert_eq!(new.schema_version, 1);
        assert_eq!(new.consent_version, "unknown");
        assert_eq!(new.capabilities, None);
        assert_eq!(new.metadata, Some(json!({"ua": "x"})));
    }

    #[test]
    fn blank_study_id_is_rejected() {
        let err = new_session_from(&body(json!({"study_id": "  ", "study_version": "v1"})))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn values_are_trimmed() {
        let new = new_session_from(&body(json!({
            "study_id": " s1 ",
            "study_version": "v1\n",
            "schema_version": 3,
        })))
        .unwrap();
        assert_eq!(new.study_id, "s1");
        assert_eq!(new.study_version, "v1");
        assert_eq!(new.schema_version, 3);
    }
}
