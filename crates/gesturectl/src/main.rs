//! gesturectl - drive gesture study sessions from the command line
//!
//! Subcommands:
//! - `gesturectl start-session` - Open a session and print its handle
//! - `gesturectl end-session <id>` - Mark a session complete
//! - `gesturectl replay <files>...` - Capture recorded sensor events and submit trials

use std::path::PathBuf;

use anyhow::{Context, Result};
use capture::{SessionContext, SessionHandle, StudyInfo};
use clap::{Parser, Subcommand};
use gestureconf::GestureConfig;
use gesturectl::{replay, HubClient, ReplayOptions, StartSession, DEFAULT_SERVER};

#[derive(Parser)]
#[command(name = "gesturectl")]
#[command(about = "Capture client for the gesture study hub")]
#[command(version)]
struct Cli {
    /// Hub base URL
    #[arg(long, env = "GESTURE_SERVER", default_value = DEFAULT_SERVER, global = true)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a session and print the server's response
    StartSession {
        #[arg(long)]
        study_id: String,

        #[arg(long)]
        study_version: String,

        #[arg(long, default_value = "unknown")]
        consent_version: String,

        #[arg(long, default_value = "1")]
        schema_version: i64,
    },

    /// Mark a session complete
    EndSession {
        session_id: String,
    },

    /// Replay event files through the capture buffer and submit one trial per window
    Replay {
        /// Session to submit into
        #[arg(long)]
        session: String,

        #[arg(long)]
        study_id: String,

        #[arg(long)]
        study_version: String,

        #[arg(long, default_value = "1")]
        schema_version: i64,

        /// Consent version the session was opened with
        #[arg(long, default_value = "unknown")]
        consent_version: String,

        /// Trial index of the first submitted window
        #[arg(long, default_value = "0")]
        first_index: u32,

        /// Stimulus id recorded on every trial
        #[arg(long)]
        stimulus: Option<String>,

        /// Submit windows that captured no samples
        #[arg(long)]
        submit_empty: bool,

        /// JSON-lines event files, each captured on its own
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = HubClient::new(&cli.server);

    match cli.command {
        Commands::StartSession {
            study_id,
            study_version,
            consent_version,
            schema_version,
        } => {
            let handle = client
                .start_session(&StartSession {
                    study_id,
                    study_version,
                    schema_version,
                    consent_version,
                    capabilities: None,
                    metadata: None,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&handle)?);
        }
        Commands::EndSession { session_id } => {
            let ended = client.end_session(&session_id).await?;
            println!("{}", serde_json::to_string_pretty(&ended)?);
        }
        Commands::Replay {
            session,
            study_id,
            study_version,
            schema_version,
            consent_version,
            first_index,
            stimulus,
            submit_empty,
            files,
        } => {
            let defaults = GestureConfig::load()
                .context("Failed to load configuration")?
                .capture;
            let handle = SessionHandle {
                session_id: session,
                study: StudyInfo::new(study_id, study_version, schema_version),
                consent_version,
                target_hz: defaults.target_hz,
                min_hz: defaults.min_hz,
            };
            let mut ctx = SessionContext::starting_at(handle, first_index);

            let windows = replay::replay_files(&files).await?;

            let options = ReplayOptions {
                stimulus_id: stimulus,
                submit_empty,
            };
            for report in replay::submit_windows(&client, &mut ctx, windows, &options).await? {
                println!("{}", serde_json::to_string(&report)?);
            }
        }
    }

    Ok(())
}
