//! Sample accumulation for one recording window at a time.
//!
//! Events arrive from a single event loop, so the buffer is plain owned state
//! with no locking. Motion events produce samples only while a window is
//! open. Orientation events arrive on their own schedule and only refresh the
//! latest-orientation slot, which every following motion sample copies.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, MonotonicClock};
use crate::diagnostics::Diagnostics;
use crate::event::RawEvent;
use crate::sample::{orientation, Euler, Sample};
use crate::{CaptureError, Result};

/// A finished recording window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub samples: Vec<Sample>,
    pub t_start_ms: f64,
    pub t_end_ms: f64,
}

impl Capture {
    /// Window length from its boundaries, not from sample timestamps.
    pub fn duration_ms(&self) -> f64 {
        (self.t_end_ms - self.t_start_ms).max(0.0)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::compute(&self.samples, self.t_start_ms, self.t_end_ms)
    }
}

pub struct SampleBuffer<C: Clock = MonotonicClock> {
    clock: C,
    window_start: Option<f64>,
    samples: Vec<Sample>,
    latest_orientation: Option<Euler>,
}

impl SampleBuffer<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for SampleBuffer<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SampleBuffer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            window_start: None,
            samples: Vec::new(),
            latest_orientation: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.window_start.is_some()
    }

    /// Samples collected so far in the open window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest_orientation(&self) -> Option<Euler> {
        self.latest_orientation
    }

    /// Open a window at the clock's current time.
    pub fn start(&mut self) -> Result<()> {
        let now = self.clock.now_ms();
        self.start_at(now)
    }

    /// Open a window at an explicit timestamp. Discards leftovers from any
    /// earlier window but keeps the latest orientation.
    pub fn start_at(&mut self, t_ms: f64) -> Result<()> {
        if self.is_recording() {
            return Err(CaptureError::AlreadyRecording);
        }
        self.samples.clear();
        self.window_start = Some(t_ms);
        debug!(t_ms, "recording window opened");
        Ok(())
    }

    pub fn push(&mut self, event: &RawEvent) {
        match event {
            RawEvent::Orientation(o) => {
                if let Some(angles) = orientation(o) {
                    self.latest_orientation = Some(angles);
                }
            }
            RawEvent::Motion(m) => {
                if !self.is_recording() {
                    return;
                }
                let t_ms = m
                    .t_ms
                    .filter(|t| t.is_finite())
                    .unwrap_or_else(|| self.clock.now_ms());
                self.samples
                    .push(Sample::from_motion(t_ms, m, self.latest_orientation));
            }
        }
    }

    /// Close the window at the clock's current time.
    pub fn stop(&mut self) -> Result<Capture> {
        let now = self.clock.now_ms();
        self.stop_at(now)
    }

    pub fn stop_at(&mut self, t_ms: f64) -> Result<Capture> {
        let t_start_ms = self.window_start.take().ok_or(CaptureError::NotRecording)?;
        let samples = std::mem::take(&mut self.samples);
        debug!(t_ms, samples = samples.len(), "recording window closed");
        Ok(Capture {
            samples,
            t_start_ms,
            t_end_ms: t_ms,
        })
    }
}
