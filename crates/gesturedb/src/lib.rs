//! SQLite-backed storage for study sessions and their trials.
//!
//! Sessions are written once at creation and touched again only when they
//! end. Trials are write-once: a repeated trial id is silently ignored.

pub mod db;
pub mod types;

pub use db::StudyDb;
pub use types::*;
