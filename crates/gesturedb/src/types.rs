use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned session identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input for creating a session. Defaults are already applied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub study_id: String,
    pub study_version: String,
    pub schema_version: i64,
    pub consent_version: String,
    pub capabilities: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub study_id: String,
    pub study_version: String,
    pub schema_version: i64,
    pub consent_version: String,
    pub capabilities: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A trial row as written. `survey`, `diagnostics` and `samples` are stored
/// as JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrial {
    pub id: String,
    pub session_id: String,
    pub study_id: String,
    pub study_version: String,
    pub schema_version: i64,
    pub trial_index: i64,
    pub stimulus_id: Option<String>,
    pub t_start_perf_ms: f64,
    pub t_end_perf_ms: f64,
    pub survey: Option<serde_json::Value>,
    pub diagnostics: Option<serde_json::Value>,
    pub samples: serde_json::Value,
    pub sample_count: i64,
    pub duration_ms: f64,
    pub effective_hz: f64,
}

/// A stored trial row, JSON columns left as the text that was written.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub id: String,
    pub session_id: String,
    pub study_id: String,
    pub study_version: String,
    pub schema_version: i64,
    pub trial_index: i64,
    pub stimulus_id: Option<String>,
    pub t_start_perf_ms: f64,
    pub t_end_perf_ms: f64,
    pub survey_json: Option<String>,
    pub diagnostics_json: Option<String>,
    pub samples_json: String,
    pub sample_count: i64,
    pub duration_ms: f64,
    pub effective_hz: f64,
    pub created_at: String,
}

/// Timestamp format used for every stored datetime. Fixed width, so text
/// order matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp. Falls back to now for rows written by hand.
pub fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
