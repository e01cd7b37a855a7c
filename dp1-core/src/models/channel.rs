use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ids::ChannelId;

/// A curated collection of playlist references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub slug: String,
    pub title: String,
    pub curator: String,
    pub created: DateTime<Utc>,
    pub signature: String,
    pub playlists: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curators: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<JsonValue>,
    #[serde(rename = "coverImage", default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(rename = "dynamicQueries", default, skip_serializing_if = "Option::is_none")]
    pub dynamic_queries: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInput {
    pub title: String,
    pub curator: String,
    pub playlists: Vec<String>,

    #[serde(default)]
    pub curators: Option<JsonValue>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub publisher: Option<JsonValue>,
    #[serde(rename = "coverImage", default)]
    pub cover_image: Option<String>,
    #[serde(rename = "dynamicQueries", default)]
    pub dynamic_queries: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub curator: Option<String>,
    #[serde(default)]
    pub playlists: Option<Vec<String>>,
    #[serde(default)]
    pub curators: Option<JsonValue>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub publisher: Option<JsonValue>,
    #[serde(rename = "coverImage", default)]
    pub cover_image: Option<String>,
    #[serde(rename = "dynamicQueries", default)]
    pub dynamic_queries: Option<JsonValue>,
}

impl Channel {
    #[must_use]
    pub fn without_signature(&self) -> JsonValue {
        let mut value = serde_json::to_value(self).expect("Channel always serializes");
        if let Some(obj) = value.as_object_mut() {
            obj.remove("signature");
        }
        value
    }
}
