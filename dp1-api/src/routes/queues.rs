use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use dp1_core::Error as CoreError;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::BearerAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/queues/process-message", post(process_message))
        .route("/api/v1/queues/process-batch", post(process_batch))
}

/// A single queued write, pushed to us directly rather than pulled from the
/// Queue port — lets an external queue provider drive delivery over HTTP.
async fn process_message(State(state): State<AppState>, _auth: BearerAuth, body: Bytes) -> AppResult<impl IntoResponse> {
    if body.is_empty() {
        return Err(AppError::invalid_message("request body must contain a queue message"));
    }

    match state.consumer.process_message_body(&body).await {
        Ok(()) => Ok(Json(json!({ "success": true, "processedCount": 1 }))),
        Err(CoreError::InvalidInput(msg)) => Err(AppError::invalid_message(msg)),
        Err(err) => {
            tracing::error!(error = %err, "failed to process queue message");
            Err(AppError::processing_failed("failed to process queue message"))
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ProcessBatchRequest {
    #[serde(rename = "maxMessages", default = "default_max_messages")]
    max_messages: usize,
}

const fn default_max_messages() -> usize {
    10
}

#[derive(Serialize)]
struct ProcessBatchResponse {
    success: bool,
    #[serde(rename = "processedCount")]
    processed_count: usize,
    #[serde(rename = "messageIds")]
    message_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// Drains up to `maxMessages` (default 10) from the Queue port and applies
/// each to the Storage Engine, batch ack/nack per the consumer's
/// all-or-nothing policy.
async fn process_batch(State(state): State<AppState>, _auth: BearerAuth, body: Bytes) -> AppResult<impl IntoResponse> {
    let request: ProcessBatchRequest = if body.is_empty() {
        ProcessBatchRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::invalid_batch(format!("invalid batch request: {e}")))?
    };

    match state.consumer.process_batch(request.max_messages).await {
        Ok(Some(result)) => {
            if result.all_succeeded() {
                let response = ProcessBatchResponse {
                    success: true,
                    processed_count: result.processed_count,
                    message_ids: result.message_ids,
                    errors: result.errors,
                };
                Ok((StatusCode::OK, Json(response)))
            } else {
                Err(AppError::batch_processing_failed(result.errors.join("; ")))
            }
        }
        Ok(None) => Ok((
            StatusCode::OK,
            Json(ProcessBatchResponse { success: true, processed_count: 0, message_ids: vec![], errors: vec![] }),
        )),
        Err(err) => {
            tracing::error!(error = %err, "failed to drain queue batch");
            Err(AppError::batch_processing_failed("failed to process queue batch"))
        }
    }
}
