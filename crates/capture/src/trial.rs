//! Trial assembly: shape a finished window into the submit payload.
//!
//! Nothing here touches the network or storage, so trials can be built and
//! inspected without a live session.

use serde::{Deserialize, Serialize};

use crate::buffer::Capture;
use crate::diagnostics::Diagnostics;
use crate::sample::Sample;

/// Study descriptors copied onto every trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyInfo {
    pub study_id: String,
    pub study_version: String,
    pub schema_version: i64,
}

impl StudyInfo {
    pub fn new(study_id: impl Into<String>, study_version: impl Into<String>, schema_version: i64) -> Self {
        Self {
            study_id: study_id.into(),
            study_version: study_version.into(),
            schema_version,
        }
    }
}

/// Participant answers collected after a trial. Unknown keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A trial ready for submission. Built once by [`TrialAssembler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    session_id: String,
    trial_id: String,
    study_id: String,
    study_version: String,
    schema_version: i64,
    trial_index: u32,
    stimulus_id: Option<String>,
    t_start_perf_ms: f64,
    t_end_perf_ms: f64,
    survey: Option<Survey>,
    diagnostics: Diagnostics,
    samples: Vec<Sample>,
}

impl Trial {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn trial_id(&self) -> &str {
        &self.trial_id
    }

    pub fn study(&self) -> StudyInfo {
        StudyInfo::new(&self.study_id, &self.study_version, self.schema_version)
    }

    pub fn trial_index(&self) -> u32 {
        self.trial_index
    }

    pub fn stimulus_id(&self) -> Option<&str> {
        self.stimulus_id.as_deref()
    }

    pub fn window_ms(&self) -> (f64, f64) {
        (self.t_start_perf_ms, self.t_end_perf_ms)
    }

    pub fn survey(&self) -> Option<&Survey> {
        self.survey.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

/// Builder combining a capture window with its trial metadata.
#[derive(Debug, Clone)]
pub struct TrialAssembler {
    session_id: String,
    study: StudyInfo,
    trial_id: Option<String>,
    trial_index: u32,
    stimulus_id: Option<String>,
    survey: Option<Survey>,
}

impl TrialAssembler {
    pub fn new(session_id: impl Into<String>, study: &StudyInfo) -> Self {
        Self {
            session_id: session_id.into(),
            study: study.clone(),
            trial_id: None,
            trial_index: 0,
            stimulus_id: None,
            survey: None,
        }
    }

    /// Use a caller-chosen id. Blank ids are replaced with a fresh one.
    pub fn trial_id(mut self, id: impl Into<String>) -> Self {
        self.trial_id = Some(id.into());
        self
    }

    pub fn trial_index(mut self, index: u32) -> Self {
        self.trial_index = index;
        self
    }

    pub fn stimulus(mut self, stimulus_id: Option<String>) -> Self {
        self.stimulus_id = stimulus_id.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn survey(mut self, survey: Survey) -> Self {
        self.survey = Some(survey);
        self
    }

    pub fn assemble(self, capture: Capture) -> Trial {
        let diagnostics = capture.diagnostics();
        let trial_id = self
            .trial_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Trial {
            session_id: self.session_id,
            trial_id,
            study_id: self.study.study_id,
            study_version: self.study.study_version,
            schema_version: self.study.schema_version,
            trial_index: self.trial_index,
            stimulus_id: self.stimulus_id,
            t_start_perf_ms: capture.t_start_ms,
            t_end_perf_ms: capture.t_end_ms,
            survey: self.survey,
            diagnostics,
            samples: capture.samples,
        }
    }
}
