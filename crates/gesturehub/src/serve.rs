//! Server startup and shutdown.

use anyhow::{Context, Result};
use gestureconf::GestureConfig;
use gesturedb::StudyDb;
use tracing::{info, warn};

use crate::web::{router, AppState};

/// Open the database, bind and serve until SIGINT/SIGTERM.
pub async fn run(config: GestureConfig) -> Result<()> {
    let db_path = config.database_path();
    let addr = config.infra.bind.addr();

    info!("Gesture hub starting");
    info!("   Database: {}", db_path.display());
    if !config.infra.admin.is_configured() {
        warn!("   No admin token configured, /admin/export will refuse requests");
    }

    let db = StudyDb::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    let app = router(AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Gesture hub ready on http://{}", addr);
    info!("   Sessions: POST /api/start_session, /api/end_session");
    info!("   Trials: POST /api/submit_trial");
    info!("   Export: GET /admin/export");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
