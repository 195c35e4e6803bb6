//! HTTP server implementation using Axum.

use crate::error::ExecError;
use crate::language::LanguageDescriptor;
use crate::result::ExecutionResult;
use crate::state::AppState;
use crate::submission::RunRequest;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Deserialize)]
struct RunParams {
    /// Attach the unprocessed backend response
    #[serde(default)]
    raw: bool,
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    languages: Vec<&'static str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/languages", get(languages))
        .route("/run", post(run))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn run_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "coderun: Judge0 runner with local JAR support",
        languages: state.dispatcher.languages().ids(),
    })
}

async fn health() -> &'static str {
    "OK"
}

async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageDescriptor>> {
    Json(state.dispatcher.languages().iter().cloned().collect())
}

async fn run(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
    Json(req): Json<RunRequest>,
) -> Result<Json<ExecutionResult>, ExecError> {
    info!("POST /run - language: {}, files: {}", req.language, req.files.0.len());
    let result = state.dispatcher.run(req, params.raw).await?;
    Ok(Json(result))
}
