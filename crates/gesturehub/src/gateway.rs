//! Trial persistence: validate, derive diagnostics, write once.

use axum::extract::State;
use axum::Json;
use capture::diagnostics::{effective_hz, round2};
use gesturedb::NewTrial;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::decode::{self, Body, JsonBody};
use crate::error::ApiError;
use crate::web::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitTrialResponse {
    pub ok: bool,
    pub trial_id: String,
    pub session_id: String,
    pub sample_count: i64,
    pub duration_ms: f64,
    pub effective_hz: f64,
}

/// Summary fields stored alongside each trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFields {
    pub sample_count: i64,
    pub duration_ms: f64,
    pub effective_hz: f64,
}

impl DerivedFields {
    /// Client diagnostics win field by field. Gaps are filled from the
    /// samples and the trial window, and finally zero.
    pub fn resolve(
        diagnostics: Option<&Value>,
        samples: &Value,
        t_start_ms: f64,
        t_end_ms: f64,
    ) -> Self {
        let reported = |key: &str| {
            diagnostics
                .and_then(|d| d.get(key))
                .and_then(decode::loose_number)
        };
        let samples = samples.as_array().map(Vec::as_slice).unwrap_or(&[]);

        let sample_count = reported("sample_count")
            .map(|n| n.trunc() as i64)
            .unwrap_or(samples.len() as i64);

        let duration_ms = reported("duration_ms").unwrap_or_else(|| {
            if t_end_ms > t_start_ms {
                t_end_ms - t_start_ms
            } else {
                sample_span_ms(samples).unwrap_or(0.0)
            }
        });

        let effective_hz = reported("effective_hz").unwrap_or_else(|| {
            round2(effective_hz(sample_count.max(0) as usize, duration_ms))
        });

        Self {
            sample_count,
            duration_ms,
            effective_hz,
        }
    }
}

/// Last minus first sample timestamp, when positive.
fn sample_span_ms(samples: &[Value]) -> Option<f64> {
    let t = |v: &Value| v.get("t_ms").and_then(Value::as_f64);
    let span = t(samples.last()?)? - t(samples.first()?)?;
    (span > 0.0).then_some(span)
}

/// Read a submit-trial body into the row to store.
pub fn new_trial_from(body: &Body) -> Result<NewTrial, ApiError> {
    let session_id = decode::required(body, "session_id")?;
    let trial_id =
        decode::non_blank(body, "trial_id").unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let t_start_perf_ms = decode::loose_float_or(body, "t_start_perf_ms", 0.0);
    let t_end_perf_ms = decode::loose_float_or(body, "t_end_perf_ms", 0.0);
    let diagnostics = decode::structured(body, "diagnostics");
    let samples = decode::array_or_empty(body, "samples");
    let derived =
        DerivedFields::resolve(diagnostics.as_ref(), &samples, t_start_perf_ms, t_end_perf_ms);

    Ok(NewTrial {
        id: trial_id,
        session_id,
        study_id: decode::string_or(body, "study_id", "unknown"),
        study_version: decode::string_or(body, "study_version", "unknown"),
        schema_version: decode::loose_int_or(body, "schema_version", 1),
        trial_index: decode::loose_int_or(body, "trial_index", 0),
        stimulus_id: decode::non_blank(body, "stimulus_id"),
        t_start_perf_ms,
        t_end_perf_ms,
        survey: decode::structured(body, "survey"),
        diagnostics,
        samples,
        sample_count: derived.sample_count,
        duration_ms: derived.duration_ms,
        effective_hz: derived.effective_hz,
    })
}

/// Store a trial. The session must exist. Resubmitting a stored trial id
/// succeeds without touching the stored row.
#[tracing::instrument(skip_all, fields(session_id, trial_id))]
pub async fn submit_trial(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<SubmitTrialResponse>, ApiError> {
    let trial = new_trial_from(&body)?;
    let span = tracing::Span::current();
    span.record("session_id", trial.session_id.as_str());
    span.record("trial_id", trial.id.as_str());

    let session_id = trial.session_id.clone();
    if !state.with_db(move |db| db.session_exists(&session_id)).await? {
        return Err(ApiError::not_found("Session not found"));
    }

    let response = SubmitTrialResponse {
        ok: true,
        trial_id: trial.id.clone(),
        session_id: trial.session_id.clone(),
        sample_count: trial.sample_count,
        duration_ms: trial.duration_ms,
        effective_hz: trial.effective_hz,
    };

    let inserted = state.with_db(move |db| db.insert_trial(&trial)).await?;
    if inserted {
        info!(
            sample_count = response.sample_count,
            effective_hz = response.effective_hz,
            "trial stored"
        );
    } else {
        warn!("trial id already stored, resubmission ignored");
    }

    Ok(Json(response))
}
