//! Axum router and all HTTP handlers for pks-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pks_runtime::RunOutcome;
use pks_schemas::StartRunCommand;

use crate::{
    api_types::{RunCompletedResponse, RunTimeoutResponse},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/run", post(run))
        .route("/api/run", post(run))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// POST /run
// ---------------------------------------------------------------------------

/// Submit a run and hold the request open until its result or the deadline.
///
/// A timeout is a normal 200 response carrying `status: "timeout"`.
pub(crate) async fn run(
    State(st): State<Arc<AppState>>,
    Json(cmd): Json<StartRunCommand>,
) -> Response {
    let (run_id, outcome) = st.gateway.submit_and_wait(cmd).await;

    match outcome {
        RunOutcome::Completed(result) => {
            (StatusCode::OK, Json(RunCompletedResponse { run_id, result })).into_response()
        }
        RunOutcome::TimedOut => {
            (StatusCode::OK, Json(RunTimeoutResponse::new(run_id))).into_response()
        }
    }
}
