//! Liveness and dependency health.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AiHealthResponse {
    pub healthy: bool,
}

/// Liveness check. Does not touch any dependency.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Whether the NLP service answers its health endpoint.
pub async fn ai_health(State(state): State<AppState>) -> Json<AiHealthResponse> {
    Json(AiHealthResponse {
        healthy: state.summaries.ai_healthy().await,
    })
}
