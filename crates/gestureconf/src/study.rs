//! Study-facing defaults handed to capture clients.

use serde::{Deserialize, Serialize};

/// Sampling-rate hints returned with every new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDefaults {
    /// Rate the client should try to sample at.
    #[serde(default = "CaptureDefaults::default_target_hz")]
    pub target_hz: u32,

    /// Below this the capture is considered degraded.
    #[serde(default = "CaptureDefaults::default_min_hz")]
    pub min_hz: u32,
}

impl CaptureDefaults {
    fn default_target_hz() -> u32 {
        100
    }

    fn default_min_hz() -> u32 {
        60
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            target_hz: Self::default_target_hz(),
            min_hz: Self::default_min_hz(),
        }
    }
}
