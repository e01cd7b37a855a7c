use dp1_core::models::looks_like_uuid;
use dp1_core::storage::SortDirection;
use serde::{Deserialize, Serialize};

/// Shared shape of `GET /playlists`, `GET /playlist-items`, `GET /channels`
/// query strings.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
    pub sort: Option<String>,
    pub channel: Option<String>,
}

impl ListQuery {
    #[must_use]
    pub fn sort_direction(&self) -> SortDirection {
        SortDirection::from_query(self.sort.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl<T> From<dp1_core::storage::Page<T>> for PageResponse<T> {
    fn from(page: dp1_core::storage::Page<T>) -> Self {
        Self { items: page.items, cursor: page.cursor, has_more: page.has_more }
    }
}

/// A path `:id` segment is accepted if it looks like a UUIDv4 or matches
/// `^[A-Za-z0-9-]+$`; anything else is `invalid_id`.
#[must_use]
pub fn is_valid_path_id(raw: &str) -> bool {
    !raw.is_empty() && (looks_like_uuid(raw) || raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
}

/// Playlist-item ids must be UUIDv4 specifically, never a slug-shaped id.
#[must_use]
pub fn is_valid_item_id(raw: &str) -> bool {
    looks_like_uuid(raw)
}

