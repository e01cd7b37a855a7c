pub mod channels;
pub mod health;
pub mod playlist_items;
pub mod playlists;
pub mod queues;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(playlists::router())
        .merge(playlist_items::router())
        .merge(channels::router())
        .merge(queues::router())
}
