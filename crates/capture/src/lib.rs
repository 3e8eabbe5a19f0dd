//! Motion capture for gesture study trials.
//!
//! The pipeline runs leaves-first:
//!
//! - [`event`]: raw `devicemotion` / `deviceorientation` payloads as a
//!   browser reports them, decoded leniently.
//! - [`buffer`]: the [`SampleBuffer`] that turns raw events into [`Sample`]s
//!   during a recording window.
//! - [`diagnostics`]: sample count, duration, effective rate and missing
//!   channel counts for a finished window.
//! - [`trial`]: packages a window, its diagnostics and survey answers into a
//!   submittable [`Trial`].
//! - [`context`]: the explicit per-session client state.
//! - [`channel`]: feeds a serialized stream of start/event/stop signals into a
//!   single buffer.
//!
//! # Example
//!
//! ```
//! use capture::{ManualClock, RawEvent, SampleBuffer, StudyInfo, TrialAssembler};
//!
//! let clock = ManualClock::new(1000.0);
//! let mut buffer = SampleBuffer::with_clock(clock.clone());
//! buffer.start().unwrap();
//! buffer.push(&RawEvent::motion_xyz(1010.0, 0.1, 0.2, 9.8));
//! clock.set(3000.0);
//! let capture = buffer.stop().unwrap();
//!
//! let study = StudyInfo::new("s1", "v1", 1);
//! let trial = TrialAssembler::new("session-1", &study)
//!     .trial_index(0)
//!     .assemble(capture);
//! assert_eq!(trial.diagnostics().sample_count, 1);
//! ```

pub mod buffer;
pub mod channel;
pub mod clock;
pub mod context;
pub mod diagnostics;
pub mod event;
pub mod sample;
pub mod trial;

pub use buffer::{Capture, SampleBuffer};
pub use channel::{run_capture_loop, spawn_capture_loop, CaptureResult, CaptureSignal};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use context::{SessionContext, SessionHandle};
pub use diagnostics::{CaptureStatus, Channel, Diagnostics, MissingCounts};
pub use event::{MotionEvent, OrientationEvent, RawAxes, RawEvent};
pub use sample::{Euler, Sample, Vec3};
pub use trial::{StudyInfo, Survey, Trial, TrialAssembler};

/// Errors from the recording window state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("a recording window is already open")]
    AlreadyRecording,

    #[error("no recording window is open")]
    NotRecording,
}

pub type Result<T> = std::result::Result<T, CaptureError>;
