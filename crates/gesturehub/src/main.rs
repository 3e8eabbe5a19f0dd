//! gesturehub - HTTP collection server for gesture studies
//!
//! Subcommands:
//! - `gesturehub serve` - Run the API server
//! - `gesturehub config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gestureconf::GestureConfig;

use gesturehub::{serve, telemetry};

#[derive(Parser)]
#[command(name = "gesturehub")]
#[command(about = "Session and trial collection server for gesture studies")]
#[command(version)]
struct Cli {
    /// Config file to load instead of ./gesture-study.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// HTTP port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print the effective configuration and where it came from
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = GestureConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { port, db } => {
            if let Some(port) = port {
                config.infra.bind.http_port = port;
            }
            if let Some(db) = db {
                config.infra.paths.database = Some(db);
            }

            telemetry::init(&config.infra.telemetry)?;
            for file in &sources.files {
                tracing::info!("Loaded config from {}", file.display());
            }

            serve::run(config).await?;
        }
        Commands::Config => {
            for file in &sources.files {
                println!("# loaded: {}", file.display());
            }
            for var in &sources.env_overrides {
                println!("# env: {}", var);
            }
            println!("{}", config.to_toml());
        }
    }

    Ok(())
}
