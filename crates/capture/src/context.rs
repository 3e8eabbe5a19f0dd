//! Client-side session state, passed explicitly between capture and submit.

use serde::{Deserialize, Serialize};

use crate::buffer::Capture;
use crate::trial::{StudyInfo, Survey, Trial, TrialAssembler};

/// What the server handed back when the session was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    pub study: StudyInfo,
    pub consent_version: String,
    pub target_hz: u32,
    pub min_hz: u32,
}

/// One participant session on the client.
#[derive(Debug, Clone)]
pub struct SessionContext {
    handle: SessionHandle,
    next_trial_index: u32,
}

impl SessionContext {
    pub fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            next_trial_index: 0,
        }
    }

    /// Resume numbering after trials that were already submitted.
    pub fn starting_at(handle: SessionHandle, next_trial_index: u32) -> Self {
        Self {
            handle,
            next_trial_index,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn next_trial_index(&self) -> u32 {
        self.next_trial_index
    }

    /// Package a finished window as the next trial of this session.
    pub fn assemble(
        &mut self,
        capture: Capture,
        stimulus_id: Option<String>,
        survey: Option<Survey>,
    ) -> Trial {
        let mut assembler = TrialAssembler::new(&self.handle.session_id, &self.handle.study)
            .trial_index(self.next_trial_index)
            .stimulus(stimulus_id);
        if let Some(survey) = survey {
            assembler = assembler.survey(survey);
        }
        self.next_trial_index += 1;
        assembler.assemble(capture)
    }
}
