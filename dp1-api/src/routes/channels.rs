use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use dp1_core::models::validation;
use dp1_core::models::{Channel, ChannelInput, ChannelUpdate};
use dp1_core::storage::engine::validate_limit;
use dp1_core::WriteResult;

use crate::body::{parse_raw, parse_typed};
use crate::dto::{is_valid_path_id, ListQuery, PageResponse};
use crate::error::{limit_error, AppError, AppResult};
use crate::middleware::BearerAuth;
use crate::prefer::wants_async;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/channels", get(list_channels).post(create_channel))
        .route(
            "/api/v1/channels/{id}",
            get(get_channel).put(replace_channel).patch(patch_channel).delete(delete_channel),
        )
}

async fn list_channels(State(state): State<AppState>, Query(query): Query<ListQuery>) -> AppResult<impl IntoResponse> {
    let limit = validate_limit(query.limit).map_err(limit_error)?;
    let page = state.engine.list_channels(limit, query.cursor.as_deref(), query.sort_direction()).await?;
    Ok(Json(PageResponse::from(page)))
}

async fn get_channel(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    if !is_valid_path_id(&id) {
        return Err(AppError::invalid_id(format!("'{id}' is not a valid id")));
    }
    let channel = state
        .engine
        .get_channel_by_id_or_slug(&id)
        .await?
        .ok_or_else(|| AppError::not_found("channel not found"))?;
    Ok(Json(channel))
}

async fn create_channel(
    State(state): State<AppState>,
    _auth: BearerAuth,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let raw = parse_raw(&body)?;
    let input: ChannelInput = parse_typed(raw)?;

    let result = state.coordinator.create_channel(input, wants_async(&headers)).await?;
    Ok(write_response(result, StatusCode::CREATED))
}

async fn replace_channel(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    if !is_valid_path_id(&id) {
        return Err(AppError::invalid_id(format!("'{id}' is not a valid id")));
    }
    let raw = parse_raw(&body)?;
    let input: ChannelInput = parse_typed(raw)?;

    let result = state.coordinator.replace_channel(&id, input, wants_async(&headers)).await?;
    Ok(write_response(result, StatusCode::OK))
}

async fn patch_channel(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    if !is_valid_path_id(&id) {
        return Err(AppError::invalid_id(format!("'{id}' is not a valid id")));
    }
    let raw = parse_raw(&body)?;
    validation::reject_protected_fields(&raw)?;
    let update: ChannelUpdate = parse_typed(raw)?;

    let result = state.coordinator.patch_channel(&id, update, wants_async(&headers)).await?;
    Ok(write_response(result, StatusCode::OK))
}

async fn delete_channel(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    if !is_valid_path_id(&id) {
        return Err(AppError::invalid_id(format!("'{id}' is not a valid id")));
    }
    let result = state.coordinator.delete_channel(&id, wants_async(&headers)).await?;
    Ok(match result {
        WriteResult::Async(()) => StatusCode::ACCEPTED,
        WriteResult::Sync(()) => StatusCode::NO_CONTENT,
    })
}

fn write_response(result: WriteResult<Channel>, sync_status: StatusCode) -> impl IntoResponse {
    let status = if result.is_async() { StatusCode::ACCEPTED } else { sync_status };
    (status, Json(result.into_inner()))
}
