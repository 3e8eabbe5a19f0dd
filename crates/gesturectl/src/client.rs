//! HTTP client for the hub API.

use anyhow::{bail, Context, Result};
use capture::{SessionHandle, StudyInfo, Trial};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8090";

#[derive(Debug, Clone, Serialize)]
pub struct StartSession {
    pub study_id: String,
    pub study_version: String,
    pub schema_version: i64,
    pub consent_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct StartedSession {
    session_id: String,
    study_id: String,
    study_version: String,
    schema_version: i64,
    consent_version: String,
    config: SamplingHints,
}

#[derive(Debug, Clone, Deserialize)]
struct SamplingHints {
    target_hz: u32,
    min_hz: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndedSession {
    pub session_id: String,
    pub completed_at: String,
}

/// What the hub recorded for a submitted trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReceipt {
    pub trial_id: String,
    pub session_id: String,
    pub sample_count: i64,
    pub duration_ms: f64,
    pub effective_hz: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
}

impl HubClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn start_session(&self, request: &StartSession) -> Result<SessionHandle> {
        let started: StartedSession = self.post("/api/start_session", request).await?;
        Ok(SessionHandle {
            session_id: started.session_id,
            study: StudyInfo::new(
                started.study_id,
                started.study_version,
                started.schema_version,
            ),
            consent_version: started.consent_version,
            target_hz: started.config.target_hz,
            min_hz: started.config.min_hz,
        })
    }

    pub async fn end_session(&self, session_id: &str) -> Result<EndedSession> {
        self.post(
            "/api/end_session",
            &serde_json::json!({ "session_id": session_id }),
        )
        .await
    }

    pub async fn submit_trial(&self, trial: &Trial) -> Result<TrialReceipt> {
        self.post("/api/submit_trial", trial).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| "no error message".to_string());
            bail!("{} returned {}: {}", path, status, message);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Unexpected response from {}", path))
    }
}
