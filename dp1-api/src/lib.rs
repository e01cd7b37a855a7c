//! HTTP surface for the DP-1 feed operator service: router assembly,
//! request/response DTOs, auth middleware, and error mapping. Domain logic
//! lives in `dp1_core`.

pub mod body;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod prefer;
pub mod routes;
pub mod state;

pub use error::{AppError, AppResult};
pub use state::AppState;

use axum::http::{HeaderName, Method};
use axum::{middleware as axum_middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Assemble the full router: resource routes, CORS, tracing, request-id
/// propagation, and a Swagger UI mounted at `/swagger-ui`.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", openapi::ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Open CORS per the external interface contract: any origin, the five
/// resource verbs plus `OPTIONS`, which axum answers with 204 by default.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE, prefer_header()])
}

fn prefer_header() -> HeaderName {
    HeaderName::from_static("prefer")
}
