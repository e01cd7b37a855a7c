use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dp1_core::models::validation;
use dp1_core::models::{Playlist, PlaylistInput, PlaylistUpdate};
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
        .route("/api/v1/playlists", get(list_playlists).post(create_playlist))
        .route(
            "/api/v1/playlists/{id}",
            get(get_playlist).put(replace_playlist).patch(patch_playlist).delete(delete_playlist),
        )
}

async fn list_playlists(State(state): State<AppState>, Query(query): Query<ListQuery>) -> AppResult<impl IntoResponse> {
    let limit = validate_limit(query.limit).map_err(limit_error)?;

    if let Some(raw) = &query.channel {
        if !is_valid_path_id(raw) {
            return Err(AppError::invalid_channel_id(format!("'{raw}' is not a valid channel id")));
        }
        let Some(channel) = state.engine.get_channel_by_id_or_slug(raw).await? else {
            return Ok(Json(PageResponse::<Playlist> { items: vec![], cursor: None, has_more: false }));
        };
        let page = state.engine.list_playlists_by_channel(channel.id, limit, query.cursor.as_deref()).await?;
        return Ok(Json(page.into()));
    }

    let page = state.engine.list_playlists(limit, query.cursor.as_deref(), query.sort_direction()).await?;
    Ok(Json(page.into()))
}

async fn get_playlist(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    if !is_valid_path_id(&id) {
        return Err(AppError::invalid_id(format!("'{id}' is not a valid id")));
    }
    let playlist = state
        .engine
        .get_playlist_by_id_or_slug(&id)
        .await?
        .ok_or_else(|| AppError::not_found("playlist not found"))?;
    Ok(Json(playlist))
}

async fn create_playlist(
    State(state): State<AppState>,
    _auth: BearerAuth,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let raw = parse_raw(&body)?;
    let input: PlaylistInput = parse_typed(raw)?;

    let result = state.coordinator.create_playlist(input, wants_async(&headers)).await?;
    Ok(write_response(result, StatusCode::CREATED))
}

async fn replace_playlist(
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
    let input: PlaylistInput = parse_typed(raw)?;

    let result = state.coordinator.replace_playlist(&id, input, wants_async(&headers)).await?;
    Ok(write_response(result, StatusCode::OK))
}

async fn patch_playlist(
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
    let update: PlaylistUpdate = parse_typed(raw)?;

    let result = state.coordinator.patch_playlist(&id, update, wants_async(&headers)).await?;
    Ok(write_response(result, StatusCode::OK))
}

async fn delete_playlist(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    if !is_valid_path_id(&id) {
        return Err(AppError::invalid_id(format!("'{id}' is not a valid id")));
    }
    let result = state.coordinator.delete_playlist(&id, wants_async(&headers)).await?;
    Ok(match result {
        WriteResult::Async(()) => StatusCode::ACCEPTED,
        WriteResult::Sync(()) => StatusCode::NO_CONTENT,
    })
}

fn write_response(result: WriteResult<Playlist>, sync_status: StatusCode) -> impl IntoResponse {
    let status = if result.is_async() { StatusCode::ACCEPTED } else { sync_status };
    (status, Json(result.into_inner()))
}
