use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::Instrument;

use crate::error::AppError;
use crate::state::AppState;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Reads `x-request-id` off the request, or generates one, and attaches it
/// to both the tracing span covering the request and the response headers.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let header_value = HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("invalid"));
    req.headers_mut().insert(REQUEST_ID_HEADER.clone(), header_value.clone());

    let span = tracing::info_span!("http_request", request_id = %request_id);
    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(REQUEST_ID_HEADER.clone(), header_value);
    response
}

/// Proof that a write request carried a bearer token accepted under one of
/// the two schemes this deployment supports: a shared secret compared
/// directly, or a JWT verified against a configured public key.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    pub subject: Option<String>,
}

impl FromRequestParts<AppState> for BearerAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = extract_bearer_token(header)?;
        authenticate(&state.config.auth, token)
    }
}

fn extract_bearer_token(header: &HeaderValue) -> Result<&str, AppError> {
    let raw = header
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;
    raw.strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Authorization header must be 'Bearer <token>'"))
}

fn authenticate(auth: &dp1_core::config::AuthConfig, token: &str) -> Result<BearerAuth, AppError> {
    if !auth.api_secret.is_empty() && token == auth.api_secret {
        return Ok(BearerAuth { subject: None });
    }

    if let Some(public_key) = &auth.jwt_public_key {
        return verify_jwt(public_key, auth, token);
    }

    Err(AppError::unauthorized("invalid bearer token"))
}

#[derive(serde::Deserialize)]
struct Claims {
    sub: Option<String>,
}

fn verify_jwt(public_key: &str, auth: &dp1_core::config::AuthConfig, token: &str) -> Result<BearerAuth, AppError> {
    let key = DecodingKey::from_ed_pem(public_key.as_bytes())
        .map_err(|e| AppError::internal_error(format!("invalid configured JWT public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    if let Some(issuer) = &auth.jwt_issuer {
        validation.set_issuer(&[issuer]);
    }
    if let Some(audience) = &auth.jwt_audience {
        validation.set_audience(&[audience]);
    }

    let data = jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .map_err(|e| AppError::unauthorized(format!("invalid bearer token: {e}")))?;

    Ok(BearerAuth { subject: data.claims.sub })
}
