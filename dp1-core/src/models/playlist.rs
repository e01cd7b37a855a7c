use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ids::{ItemId, PlaylistId};

/// A versioned, ordered sequence of artwork items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(rename = "dpVersion")]
    pub dp_version: String,
    pub id: PlaylistId,
    pub slug: String,
    pub title: String,
    pub created: DateTime<Utc>,
    pub signature: String,
    pub items: Vec<PlaylistItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curators: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "coverImage", default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(rename = "dynamicQueries", default, skip_serializing_if = "Option::is_none")]
    pub dynamic_queries: Option<JsonValue>,
}

/// One artwork reference inside a playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: ItemId,
    pub title: String,
    pub source: String,
    pub duration: u64,
    pub license: License,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum License {
    Open,
    Token,
    Subscription,
}

/// Client-supplied payload for `POST /playlists` and full `PUT` replacement.
/// Carries no server-controlled fields (those are rejected if present by
/// the protected-field guard on PATCH, and simply ignored/overwritten on
/// POST/PUT since the client is not expected to send them at all).
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistInput {
    #[serde(rename = "dpVersion")]
    pub dp_version: String,
    pub title: String,
    pub items: Vec<PlaylistItemInput>,

    #[serde(default)]
    pub defaults: Option<JsonValue>,
    #[serde(default)]
    pub curators: Option<JsonValue>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(rename = "coverImage", default)]
    pub cover_image: Option<String>,
    #[serde(rename = "dynamicQueries", default)]
    pub dynamic_queries: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemInput {
    pub title: String,
    pub source: String,
    pub duration: u64,
    pub license: License,
}

/// Partial-update payload for `PATCH /playlists/:id`. Every field is
/// optional; presence of `id`/`slug`/`created`/`signature` in the raw JSON
/// body is rejected before this type is even deserialized (see
/// `validation::reject_protected_fields`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistUpdate {
    #[serde(rename = "dpVersion", default)]
    pub dp_version: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<PlaylistItemInput>>,
    #[serde(default)]
    pub defaults: Option<JsonValue>,
    #[serde(default)]
    pub curators: Option<JsonValue>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(rename = "coverImage", default)]
    pub cover_image: Option<String>,
    #[serde(rename = "dynamicQueries", default)]
    pub dynamic_queries: Option<JsonValue>,
}

impl Playlist {
    /// Canonical payload: every field except `signature`, used both as the
    /// signing input and as the verification input.
    #[must_use]
    pub fn without_signature(&self) -> JsonValue {
        let mut value = serde_json::to_value(self).expect("Playlist always serializes");
        if let Some(obj) = value.as_object_mut() {
            obj.remove("signature");
        }
        value
    }
}
