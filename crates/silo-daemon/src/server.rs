//! HTTP surface of the daemon.
//!
//! One ingestion endpoint plus the usual health endpoints. The router is
//! built separately from the listener so tests can drive it directly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use silo_core::error::{Error, Result};
use silo_ingest::notification::UploadNotification;

use crate::dispatch::{DispatchOutcome, Dispatcher};

/// Shared state behind the router.
pub struct AppState {
    /// Notification dispatcher.
    pub dispatcher: Dispatcher,
    started_at: Instant,
    processed: AtomicU64,
    dropped: AtomicU64,
}

impl AppState {
    /// Creates state around a dispatcher.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            started_at: Instant::now(),
            processed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }
}

/// Builds the daemon router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/notifications", post(ingest))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state)
}

/// Binds the listener and serves until shutdown.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal {
            message: format!("failed to bind {addr}: {e}"),
        })?;
    tracing::info!(%addr, "silo daemon listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| Error::Internal {
            message: format!("server error: {e}"),
        })
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    status: &'static str,
    kind: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
    uptime_secs: u64,
    processed: u64,
    dropped: u64,
    active_runs: u64,
}

async fn ingest(State(state): State<Arc<AppState>>, body: String) -> Response {
    let notification = match UploadNotification::from_json(&body) {
        Ok(notification) => notification,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.dispatcher.handle_notification(notification).await {
        Ok(DispatchOutcome::Accepted(kind)) => {
            state.processed.fetch_add(1, Ordering::SeqCst);
            (
                StatusCode::ACCEPTED,
                Json(IngestResponse {
                    status: "accepted",
                    kind: Some(match kind {
                        silo_core::event::UploadKind::Data => "data",
                        silo_core::event::UploadKind::Manifest => "manifest",
                    }),
                }),
            )
                .into_response()
        }
        Ok(DispatchOutcome::Dropped) => {
            state.dropped.fetch_add(1, Ordering::SeqCst);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err @ Error::MalformedNotification { .. }) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "notification dispatch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        processed: state.processed.load(Ordering::SeqCst),
        dropped: state.dropped.load(Ordering::SeqCst),
        active_runs: state.dispatcher.active_runs(),
    })
}
