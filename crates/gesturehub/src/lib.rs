//! gesturehub - collection server for motion gesture studies.
//!
//! Sessions are opened and closed over HTTP, trials are submitted once per
//! capture window and written to SQLite, and an admin endpoint exports a
//! study as a zip of per-trial JSON files.

pub mod decode;
pub mod error;
pub mod export;
pub mod gateway;
pub mod serve;
pub mod session;
pub mod telemetry;
pub mod web;

pub use error::ApiError;
pub use web::{router, AppState};
