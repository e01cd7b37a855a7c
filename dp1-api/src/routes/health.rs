use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/health", get(health)).route("/api/v1", get(info))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION") })
}

async fn info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": "dp1-feed-operator",
        "version": env!("CARGO_PKG_VERSION"),
        "minDpVersion": state.config.dp_version.min_dp_version,
    }))
}
