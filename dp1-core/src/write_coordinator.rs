use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::crypto;
use crate::error::{Error, Result};
use crate::models::channel::{ChannelInput, ChannelUpdate};
use crate::models::playlist::{PlaylistInput, PlaylistItemInput, PlaylistUpdate};
use crate::models::validation;
use crate::models::{Channel, ChannelId, Playlist, PlaylistId, PlaylistItem};
use crate::ports::Queue;
use crate::storage::StorageEngine;

/// The tagged union persisted on the queue. Modeled as a Rust enum rather
/// than a bag of optional fields so the consumer can match exhaustively on
/// `operation` instead of checking which optional field is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", content = "data")]
pub enum WriteOperation {
    #[serde(rename = "create_playlist")]
    CreatePlaylist { playlist: Playlist },
    #[serde(rename = "update_playlist")]
    UpdatePlaylist { playlist: Playlist },
    #[serde(rename = "delete_playlist")]
    DeletePlaylist {
        #[serde(rename = "playlistId")]
        playlist_id: PlaylistId,
    },
    #[serde(rename = "create_channel")]
    CreateChannel { channel: Channel },
    #[serde(rename = "update_channel")]
    UpdateChannel { channel: Channel },
    #[serde(rename = "delete_channel")]
    DeleteChannel {
        #[serde(rename = "channelId")]
        channel_id: ChannelId,
    },

    /// Catch-all for any `operation` value the consumer doesn't recognize.
    /// Deserialize-only; the coordinator never constructs this variant.
    #[serde(other)]
    Unknown,
}

impl WriteOperation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreatePlaylist { .. } => "create_playlist",
            Self::UpdatePlaylist { .. } => "update_playlist",
            Self::DeletePlaylist { .. } => "delete_playlist",
            Self::CreateChannel { .. } => "create_channel",
            Self::UpdateChannel { .. } => "update_channel",
            Self::DeleteChannel { .. } => "delete_channel",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOperationMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub operation: WriteOperation,
    #[serde(rename = "retryCount", default)]
    pub retry_count: u32,
}

impl WriteOperationMessage {
    #[must_use]
    pub fn new(operation: WriteOperation, resource_id: &str) -> Self {
        let op_name = operation.name();
        Self {
            id: format!("{op_name}_{resource_id}_{}", Ulid::new()),
            timestamp: Utc::now(),
            operation,
            retry_count: 0,
        }
    }
}

/// Outcome of a write operation: which HTTP status the caller should use is
/// derived from this plus the operation kind (201/200/204 for `Sync`, 202
/// for `Async`).
#[derive(Debug, Clone)]
pub enum WriteResult<T> {
    Sync(T),
    Async(T),
}

impl<T> WriteResult<T> {
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Sync(t) | Self::Async(t) => t,
        }
    }

    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

/// Validates input, synthesizes server-controlled fields, signs, and
/// dispatches to sync (direct Storage Engine) or async (Queue Port) commit.
pub struct WriteCoordinator {
    engine: Arc<StorageEngine>,
    queue: Arc<dyn Queue>,
    min_dp_version: String,
}

impl WriteCoordinator {
    #[must_use]
    pub fn new(engine: Arc<StorageEngine>, queue: Arc<dyn Queue>, min_dp_version: String) -> Self {
        Self { engine, queue, min_dp_version }
    }

    async fn enqueue(&self, operation: WriteOperation, resource_id: &str) -> Result<()> {
        let message = WriteOperationMessage::new(operation, resource_id);
        let body = serde_json::to_vec(&message)?;
        self.queue.publish(body).await
    }

    // ---- Playlists ---------------------------------------------------

    pub async fn create_playlist(&self, input: PlaylistInput, respond_async: bool) -> Result<WriteResult<Playlist>> {
        validation::validate_playlist_input(&input, &self.min_dp_version)?;

        let playlist = synthesize_new_playlist(input)?;

        if respond_async {
            self.enqueue(WriteOperation::CreatePlaylist { playlist: playlist.clone() }, &playlist.id.to_string()).await?;
            Ok(WriteResult::Async(playlist))
        } else {
            self.engine.save_playlist(&playlist, false).await?;
            Ok(WriteResult::Sync(playlist))
        }
    }

    pub async fn replace_playlist(
        &self,
        identifier: &str,
        input: PlaylistInput,
        respond_async: bool,
    ) -> Result<WriteResult<Playlist>> {
        validation::validate_playlist_input(&input, &self.min_dp_version)?;

        let existing = self
            .engine
            .get_playlist_by_id_or_slug(identifier)
            .await?
            .ok_or_else(|| Error::not_found("playlist"))?;

        let playlist = synthesize_replaced_playlist(&existing, input)?;

        if respond_async {
            self.enqueue(WriteOperation::UpdatePlaylist { playlist: playlist.clone() }, &playlist.id.to_string()).await?;
            Ok(WriteResult::Async(playlist))
        } else {
            self.engine.save_playlist(&playlist, true).await?;
            Ok(WriteResult::Sync(playlist))
        }
    }

    pub async fn patch_playlist(
        &self,
        identifier: &str,
        update: PlaylistUpdate,
        respond_async: bool,
    ) -> Result<WriteResult<Playlist>> {
        let existing = self
            .engine
            .get_playlist_by_id_or_slug(identifier)
            .await?
            .ok_or_else(|| Error::not_found("playlist"))?;

        if is_empty_playlist_update(&update) {
            return Ok(WriteResult::Sync(existing));
        }

        let playlist = synthesize_patched_playlist(&existing, update, &self.min_dp_version)?;

        if respond_async {
            self.enqueue(WriteOperation::UpdatePlaylist { playlist: playlist.clone() }, &playlist.id.to_string()).await?;
            Ok(WriteResult::Async(playlist))
        } else {
            self.engine.save_playlist(&playlist, true).await?;
            Ok(WriteResult::Sync(playlist))
        }
    }

    pub async fn delete_playlist(&self, identifier: &str, respond_async: bool) -> Result<WriteResult<()>> {
        let existing = self
            .engine
            .get_playlist_by_id_or_slug(identifier)
            .await?
            .ok_or_else(|| Error::not_found("playlist"))?;

        if respond_async {
            self.enqueue(WriteOperation::DeletePlaylist { playlist_id: existing.id }, &existing.id.to_string()).await?;
            Ok(WriteResult::Async(()))
        } else {
            self.engine.delete_playlist(&existing).await?;
            Ok(WriteResult::Sync(()))
        }
    }

    // ---- Channels ------------------------------------------------------

    pub async fn create_channel(&self, input: ChannelInput, respond_async: bool) -> Result<WriteResult<Channel>> {
        validation::validate_channel_input(&input)?;

        let resolved = self.engine.resolve_channel_playlists(&input.playlists).await?;
        let channel = synthesize_new_channel(input)?;

        if respond_async {
            self.enqueue(WriteOperation::CreateChannel { channel: channel.clone() }, &channel.id.to_string()).await?;
            Ok(WriteResult::Async(channel))
        } else {
            self.engine.save_channel(&channel, &resolved, false).await?;
            Ok(WriteResult::Sync(channel))
        }
    }

    pub async fn replace_channel(
        &self,
        identifier: &str,
        input: ChannelInput,
        respond_async: bool,
    ) -> Result<WriteResult<Channel>> {
        validation::validate_channel_input(&input)?;

        let existing = self
            .engine
            .get_channel_by_id_or_slug(identifier)
            .await?
            .ok_or_else(|| Error::not_found("channel"))?;

        let resolved = self.engine.resolve_channel_playlists(&input.playlists).await?;
        let channel = synthesize_replaced_channel(&existing, input)?;

        if respond_async {
            self.enqueue(WriteOperation::UpdateChannel { channel: channel.clone() }, &channel.id.to_string()).await?;
            Ok(WriteResult::Async(channel))
        } else {
            self.engine.save_channel(&channel, &resolved, true).await?;
            Ok(WriteResult::Sync(channel))
        }
    }

    pub async fn patch_channel(
        &self,
        identifier: &str,
        update: ChannelUpdate,
        respond_async: bool,
    ) -> Result<WriteResult<Channel>> {
        let existing = self
            .engine
            .get_channel_by_id_or_slug(identifier)
            .await?
            .ok_or_else(|| Error::not_found("channel"))?;

        if is_empty_channel_update(&update) {
            return Ok(WriteResult::Sync(existing));
        }

        let playlists = update.playlists.clone().unwrap_or_else(|| existing.playlists.clone());
        let resolved = self.engine.resolve_channel_playlists(&playlists).await?;
        let channel = synthesize_patched_channel(&existing, update)?;

        if respond_async {
            self.enqueue(WriteOperation::UpdateChannel { channel: channel.clone() }, &channel.id.to_string()).await?;
            Ok(WriteResult::Async(channel))
        } else {
            self.engine.save_channel(&channel, &resolved, true).await?;
            Ok(WriteResult::Sync(channel))
        }
    }

    pub async fn delete_channel(&self, identifier: &str, respond_async: bool) -> Result<WriteResult<()>> {
        let existing = self
            .engine
            .get_channel_by_id_or_slug(identifier)
            .await?
            .ok_or_else(|| Error::not_found("channel"))?;

        if respond_async {
            self.enqueue(WriteOperation::DeleteChannel { channel_id: existing.id }, &existing.id.to_string()).await?;
            Ok(WriteResult::Async(()))
        } else {
            self.engine.delete_channel(&existing).await?;
            Ok(WriteResult::Sync(()))
        }
    }
}

fn is_empty_playlist_update(update: &PlaylistUpdate) -> bool {
    update.dp_version.is_none()
        && update.title.is_none()
        && update.items.is_none()
        && update.defaults.is_none()
        && update.curators.is_none()
        && update.summary.is_none()
        && update.cover_image.is_none()
        && update.dynamic_queries.is_none()
}

fn is_empty_channel_update(update: &ChannelUpdate) -> bool {
    update.title.is_none()
        && update.curator.is_none()
        && update.playlists.is_none()
        && update.curators.is_none()
        && update.summary.is_none()
        && update.publisher.is_none()
        && update.cover_image.is_none()
        && update.dynamic_queries.is_none()
}

/// Regenerate item ids and assign monotone `created` timestamps within this
/// save: `now + index` milliseconds, so items sort stably by creation order.
fn synthesize_items(inputs: Vec<PlaylistItemInput>) -> Vec<PlaylistItem> {
    let base = Utc::now();
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, item)| PlaylistItem {
            id: crate::models::ItemId::new(),
            title: item.title,
            source: item.source,
            duration: item.duration,
            license: item.license,
            created: base + Duration::milliseconds(index as i64),
        })
        .collect()
}

fn synthesize_new_playlist(input: PlaylistInput) -> Result<Playlist> {
    let mut playlist = Playlist {
        dp_version: input.dp_version,
        id: PlaylistId::new(),
        slug: validation::generate_slug(&input.title),
        title: input.title,
        created: Utc::now(),
        signature: String::new(),
        items: synthesize_items(input.items),
        defaults: input.defaults,
        curators: input.curators,
        summary: input.summary,
        cover_image: input.cover_image,
        dynamic_queries: input.dynamic_queries,
    };
    sign_playlist(&mut playlist)?;
    Ok(playlist)
}

fn synthesize_replaced_playlist(existing: &Playlist, input: PlaylistInput) -> Result<Playlist> {
    let mut playlist = Playlist {
        dp_version: input.dp_version,
        id: existing.id,
        slug: existing.slug.clone(),
        title: input.title,
        created: existing.created,
        signature: String::new(),
        items: synthesize_items(input.items),
        defaults: input.defaults,
        curators: input.curators,
        summary: input.summary,
        cover_image: input.cover_image,
        dynamic_queries: input.dynamic_queries,
    };
    sign_playlist(&mut playlist)?;
    Ok(playlist)
}

fn synthesize_patched_playlist(existing: &Playlist, update: PlaylistUpdate, min_dp_version: &str) -> Result<Playlist> {
    let dp_version = update.dp_version.unwrap_or_else(|| existing.dp_version.clone());
    validation::validate_dp_version(&dp_version, min_dp_version)?;

    let items = match update.items {
        Some(inputs) => synthesize_items(inputs),
        None => existing.items.clone(),
    };

    let mut playlist = Playlist {
        dp_version,
        id: existing.id,
        slug: existing.slug.clone(),
        title: update.title.unwrap_or_else(|| existing.title.clone()),
        created: existing.created,
        signature: String::new(),
        items,
        defaults: update.defaults.or_else(|| existing.defaults.clone()),
        curators: update.curators.or_else(|| existing.curators.clone()),
        summary: update.summary.or_else(|| existing.summary.clone()),
        cover_image: update.cover_image.or_else(|| existing.cover_image.clone()),
        dynamic_queries: update.dynamic_queries.or_else(|| existing.dynamic_queries.clone()),
    };
    sign_playlist(&mut playlist)?;
    Ok(playlist)
}

fn sign_playlist(playlist: &mut Playlist) -> Result<()> {
    playlist.signature = crypto::sign(&playlist.without_signature())?;
    Ok(())
}

fn synthesize_new_channel(input: ChannelInput) -> Result<Channel> {
    let mut channel = Channel {
        id: ChannelId::new(),
        slug: validation::generate_slug(&input.title),
        title: input.title,
        curator: input.curator,
        created: Utc::now(),
        signature: String::new(),
        playlists: input.playlists,
        curators: input.curators,
        summary: input.summary,
        publisher: input.publisher,
        cover_image: input.cover_image,
        dynamic_queries: input.dynamic_queries,
    };
    sign_channel(&mut channel)?;
    Ok(channel)
}

fn synthesize_replaced_channel(existing: &Channel, input: ChannelInput) -> Result<Channel> {
    let mut channel = Channel {
        id: existing.id,
        slug: existing.slug.clone(),
        title: input.title,
        curator: input.curator,
        created: existing.created,
        signature: String::new(),
        playlists: input.playlists,
        curators: input.curators,
        summary: input.summary,
        publisher: input.publisher,
        cover_image: input.cover_image,
        dynamic_queries: input.dynamic_queries,
    };
    sign_channel(&mut channel)?;
    Ok(channel)
}

fn synthesize_patched_channel(existing: &Channel, update: ChannelUpdate) -> Result<Channel> {
    let mut channel = Channel {
        id: existing.id,
        slug: existing.slug.clone(),
        title: update.title.unwrap_or_else(|| existing.title.clone()),
        curator: update.curator.unwrap_or_else(|| existing.curator.clone()),
        created: existing.created,
        signature: String::new(),
        playlists: update.playlists.unwrap_or_else(|| existing.playlists.clone()),
        curators: update.curators.or_else(|| existing.curators.clone()),
        summary: update.summary.or_else(|| existing.summary.clone()),
        publisher: update.publisher.or_else(|| existing.publisher.clone()),
        cover_image: update.cover_image.or_else(|| existing.cover_image.clone()),
        dynamic_queries: update.dynamic_queries.or_else(|| existing.dynamic_queries.clone()),
    };
    sign_channel(&mut channel)?;
    Ok(channel)
}

fn sign_channel(channel: &mut Channel) -> Result<()> {
    channel.signature = crypto::sign(&channel.without_signature())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::License;
    use crate::ports::InMemoryKv;
    use crate::ports::InMemoryQueue;
    use crate::storage::StorageEngine;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_key() {
        INIT.call_once(|| {
            crypto::init_signing_key(&hex::encode([9u8; 32])).unwrap();
        });
    }

    fn coordinator() -> WriteCoordinator {
        ensure_key();
        let kv = InMemoryKv::new();
        let engine = Arc::new(StorageEngine::new(kv, vec![], 5, "1.0.0".to_string()));
        let queue = InMemoryQueue::new();
        WriteCoordinator::new(engine, queue, "1.0.0".to_string())
    }

    fn sample_input(title: &str) -> PlaylistInput {
        PlaylistInput {
            dp_version: "1.0.0".to_string(),
            title: title.to_string(),
            items: vec![PlaylistItemInput {
                title: "A".to_string(),
                source: "https://example.com/a".to_string(),
                duration: 300,
                license: License::Open,
            }],
            defaults: None,
            curators: None,
            summary: None,
            cover_image: None,
            dynamic_queries: None,
        }
    }

    #[tokio::test]
    async fn create_playlist_synthesizes_and_signs() {
        let coordinator = coordinator();
        let result = coordinator.create_playlist(sample_input("Test Playlist"), false).await.unwrap();
        let playlist = result.into_inner();
        assert!(playlist.slug.starts_with("test-playlist-"));
        assert!(playlist.signature.starts_with("ed25519:0x"));
        assert_ne!(playlist.items[0].id.to_string(), "");
    }

    #[tokio::test]
    async fn two_creates_of_same_title_produce_distinct_ids_and_slugs() {
        let coordinator = coordinator();
        let a = coordinator.create_playlist(sample_input("Same Title"), false).await.unwrap().into_inner();
        let b = coordinator.create_playlist(sample_input("Same Title"), false).await.unwrap().into_inner();
        assert_ne!(a.id, b.id);
        assert_ne!(a.slug, b.slug);
    }

    #[tokio::test]
    async fn async_create_enqueues_and_does_not_persist_synchronously() {
        let coordinator = coordinator();
        let result = coordinator.create_playlist(sample_input("Async Playlist"), true).await.unwrap();
        assert!(result.is_async());
    }

    #[tokio::test]
    async fn patch_with_no_fields_is_a_no_op() {
        let coordinator = coordinator();
        let created = coordinator.create_playlist(sample_input("Keep Me"), false).await.unwrap().into_inner();

        let result = coordinator
            .patch_playlist(&created.id.to_string(), PlaylistUpdate::default(), false)
            .await
            .unwrap();
        let unchanged = result.into_inner();
        assert_eq!(unchanged.signature, created.signature);
    }
}
