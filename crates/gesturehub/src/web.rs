//! HTTP surface: shared state, routing and the health probe.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use gestureconf::GestureConfig;
use gesturedb::StudyDb;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::{export, gateway, session};

/// A trial with a few thousand samples is a few hundred kilobytes.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<StudyDb>,
    pub config: Arc<GestureConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: StudyDb, config: GestureConfig) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Run a storage call off the async runtime.
    pub(crate) async fn with_db<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&StudyDb) -> anyhow::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || f(&db)).await?;
        result.map_err(ApiError::from)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/start_session",
            post(session::start_session).fallback(post_required),
        )
        .route(
            "/api/end_session",
            post(session::end_session).fallback(post_required),
        )
        .route(
            "/api/submit_trial",
            post(gateway::submit_trial).fallback(post_required),
        )
        .route(
            "/admin/export",
            get(export::export_trials).fallback(get_required),
        )
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn post_required() -> ApiError {
    ApiError::MethodNotAllowed(Method::POST)
}

async fn get_required() -> ApiError {
    ApiError::MethodNotAllowed(Method::GET)
}

/// Health check endpoint
pub async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed();

    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": uptime.as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let db = StudyDb::open(dir.path().join("hub.db")).unwrap();
        (dir, router(AppState::new(db, GestureConfig::default())))
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let (_dir, app) = app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/submit_trial")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/admin/export")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "GET required");
    }
}
