use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::debug;

use crate::types::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    study_id TEXT NOT NULL,
    study_version TEXT NOT NULL,
    schema_version INTEGER NOT NULL DEFAULT 1,
    consent_version TEXT NOT NULL,
    capabilities_json TEXT,
    metadata_json TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_sessions_study ON sessions(study_id, study_version);

CREATE TABLE IF NOT EXISTS trials (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES sessions(id),
    study_id TEXT NOT NULL,
    study_version TEXT NOT NULL,
    schema_version INTEGER NOT NULL DEFAULT 1,
    trial_index INTEGER NOT NULL DEFAULT 0,
    stimulus_id TEXT,
    t_start_perf_ms REAL NOT NULL DEFAULT 0,
    t_end_perf_ms REAL NOT NULL DEFAULT 0,
    survey_json TEXT,
    diagnostics_json TEXT,
    samples_json TEXT NOT NULL DEFAULT '[]',
    sample_count INTEGER NOT NULL DEFAULT 0,
    duration_ms REAL NOT NULL DEFAULT 0,
    effective_hz REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trials_session ON trials(session_id);
CREATE INDEX IF NOT EXISTS idx_trials_study ON trials(study_id, study_version, created_at);
"#;

const TRIAL_COLUMNS: &str = "id, session_id, study_id, study_version, schema_version,
    trial_index, stimulus_id, t_start_perf_ms, t_end_perf_ms,
    survey_json, diagnostics_json, samples_json,
    sample_count, duration_ms, effective_hz, created_at";

/// Study database with connection-per-call.
/// Each method opens a fresh connection with WAL mode, so the handle can be
/// shared across request tasks without a pool.
#[derive(Debug, Clone)]
pub struct StudyDb {
    path: PathBuf,
}

impl StudyDb {
    /// Open database at path, creating it and its directory if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let db = Self { path };
        db.initialize()?;
        debug!("study database ready at {:?}", db.path);
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a connection with WAL mode and busy timeout
    pub fn conn(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database: {:?}", self.path))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        Ok(conn)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Persist a new session under a freshly generated id.
    pub fn create_session(&self, new: &NewSession) -> Result<Session> {
        let id = SessionId::new();
        let created_at = Utc::now();
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO sessions (id, study_id, study_version, schema_version, consent_version,
                                   capabilities_json, metadata_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.as_str(),
                new.study_id,
                new.study_version,
                new.schema_version,
                new.consent_version,
                json_text(new.capabilities.as_ref())?,
                json_text(new.metadata.as_ref())?,
                format_timestamp(created_at),
            ],
        )?;

        self.get_session(id.as_str())?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created session"))
    }

    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT id, study_id, study_version, schema_version, consent_version,
                    capabilities_json, metadata_json, created_at, completed_at
             FROM sessions WHERE id = ?1",
            [id],
            |row| {
                Ok(Session {
                    id: SessionId(row.get(0)?),
                    study_id: row.get(1)?,
                    study_version: row.get(2)?,
                    schema_version: row.get(3)?,
                    consent_version: row.get(4)?,
                    capabilities: decode_json(row.get(5)?),
                    metadata: decode_json(row.get(6)?),
                    created_at: parse_timestamp(&row.get::<_, String>(7)?),
                    completed_at: row
                        .get::<_, Option<String>>(8)?
                        .map(|s| parse_timestamp(&s)),
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn session_exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row("SELECT 1 FROM sessions WHERE id = ?1", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Mark a session completed now. The update runs unconditionally and an
    /// unknown id is detected from the affected-row count, so no row is ever
    /// created here. Returns `None` for an unknown id.
    pub fn end_session(&self, id: &str) -> Result<Option<DateTime<Utc>>> {
        let completed_at = Utc::now();
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sessions SET completed_at = ?1 WHERE id = ?2",
            params![format_timestamp(completed_at), id],
        )?;

        if rows == 0 {
            Ok(None)
        } else {
            Ok(Some(completed_at))
        }
    }

    pub fn count_sessions(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?)
    }

    /// Insert a trial unless its id already exists. Returns whether a row
    /// was written; an existing row is never modified.
    pub fn insert_trial(&self, trial: &NewTrial) -> Result<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "INSERT INTO trials (
                id, session_id, study_id, study_version, schema_version,
                trial_index, stimulus_id, t_start_perf_ms, t_end_perf_ms,
                survey_json, diagnostics_json, samples_json,
                sample_count, duration_ms, effective_hz, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(id) DO NOTHING",
            params![
                trial.id,
                trial.session_id,
                trial.study_id,
                trial.study_version,
                trial.schema_version,
                trial.trial_index,
                trial.stimulus_id,
                trial.t_start_perf_ms,
                trial.t_end_perf_ms,
                json_text(trial.survey.as_ref())?,
                json_text(trial.diagnostics.as_ref())?,
                serde_json::to_string(&trial.samples)?,
                trial.sample_count,
                trial.duration_ms,
                trial.effective_hz,
                format_timestamp(Utc::now()),
            ],
        )?;

        Ok(rows > 0)
    }

    pub fn get_trial(&self, id: &str) -> Result<Option<TrialRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM trials WHERE id = ?1", TRIAL_COLUMNS),
            [id],
            trial_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn count_trials_for_session(&self, session_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM trials WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?)
    }

    /// Trials for a study, oldest first. `study_version` of `None` matches
    /// every version.
    pub fn trials_for_study(
        &self,
        study_id: &str,
        study_version: Option<&str>,
    ) -> Result<Vec<TrialRecord>> {
        let conn = self.conn()?;

        let rows = match study_version {
            Some(version) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM trials WHERE study_id = ?1 AND study_version = ?2
                     ORDER BY created_at ASC, rowid ASC",
                    TRIAL_COLUMNS
                ))?;
                let rows = stmt.query_map([study_id, version], trial_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM trials WHERE study_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                    TRIAL_COLUMNS
                ))?;
                let rows = stmt.query_map([study_id], trial_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(rows)
    }
}

fn trial_from_row(row: &Row<'_>) -> rusqlite::Result<TrialRecord> {
    Ok(TrialRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        study_id: row.get(2)?,
        study_version: row.get(3)?,
        schema_version: row.get(4)?,
        trial_index: row.get(5)?,
        stimulus_id: row.get(6)?,
        t_start_perf_ms: row.get(7)?,
        t_end_perf_ms: row.get(8)?,
        survey_json: row.get(9)?,
        diagnostics_json: row.get(10)?,
        samples_json: row.get(11)?,
        sample_count: row.get(12)?,
        duration_ms: row.get(13)?,
        effective_hz: row.get(14)?,
        created_at: row.get(15)?,
    })
}

fn json_text(value: Option<&serde_json::Value>) -> Result<Option<String>> {
    value
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to encode JSON column")
}

fn decode_json(text: Option<String>) -> Option<serde_json::Value> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}
