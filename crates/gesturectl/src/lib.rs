//! gesturectl - capture client for the gesture study hub.

pub mod client;
pub mod replay;

pub use client::{EndedSession, HubClient, StartSession, TrialReceipt, DEFAULT_SERVER};
pub use replay::{ReplayOptions, WindowReport};
