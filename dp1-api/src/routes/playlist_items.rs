use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use dp1_core::models::PlaylistItem;
use dp1_core::storage::engine::validate_limit;

use crate::dto::{is_valid_item_id, is_valid_path_id, ListQuery, PageResponse};
use crate::error::{limit_error, AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/playlist-items", get(list_items))
        .route("/api/v1/playlist-items/{id}", get(get_item))
}

async fn list_items(State(state): State<AppState>, Query(query): Query<ListQuery>) -> AppResult<impl IntoResponse> {
    let limit = validate_limit(query.limit).map_err(limit_error)?;

    if let Some(raw) = &query.channel {
        if !is_valid_path_id(raw) {
            return Err(AppError::invalid_channel_id(format!("'{raw}' is not a valid channel id")));
        }
        let Some(channel) = state.engine.get_channel_by_id_or_slug(raw).await? else {
            return Ok(Json(PageResponse::<PlaylistItem> { items: vec![], cursor: None, has_more: false }));
        };
        let page = state.engine.list_items_by_channel(channel.id, limit, query.cursor.as_deref()).await?;
        return Ok(Json(page.into()));
    }

    let page = state.engine.list_items(limit, query.cursor.as_deref(), query.sort_direction()).await?;
    Ok(Json(page.into()))
}

async fn get_item(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    if !is_valid_item_id(&id) {
        return Err(AppError::invalid_id(format!("'{id}' is not a valid id")));
    }
    let item_id = id.parse().map_err(|_| AppError::invalid_id(format!("'{id}' is not a valid id")))?;
    let item = state.engine.get_item_by_id(item_id).await?.ok_or_else(|| AppError::not_found("playlist item not found"))?;
    Ok(Json(item))
}
