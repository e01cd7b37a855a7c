use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::error::{Error, Result};
use crate::models::{Channel, ChannelId, ItemId, Playlist, PlaylistId, PlaylistItem};
use crate::ports::{KvStore, ListDirection};
use crate::storage::keys;
use crate::storage::url_resolver::{LocalPlaylistLookup, ResolvedPlaylist, UrlResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Any value other than `"desc"` collapses to `asc`.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }

    #[must_use]
    const fn as_kv_direction(self) -> ListDirection {
        match self {
            Self::Asc => ListDirection::Ascending,
            Self::Desc => ListDirection::Descending,
        }
    }
}

pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 100;
pub const DEFAULT_LIMIT: usize = 100;

/// `1 <= limit <= 100`; anything else is an input error.
pub fn validate_limit(limit: Option<usize>) -> Result<usize> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if (MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(Error::InvalidInput("Limit must be between 1 and 100".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
    pub has_more: bool,
}

/// Encodes and persists the multi-index KV schema, and performs the
/// joins/sorts/paginations over it.
pub struct StorageEngine {
    kv: Arc<dyn KvStore>,
    resolver: UrlResolver,
    min_dp_version: String,
}

impl StorageEngine {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, self_hosted_domains: Vec<String>, fetch_timeout_secs: u64, min_dp_version: String) -> Self {
        Self { kv, resolver: UrlResolver::new(self_hosted_domains, fetch_timeout_secs), min_dp_version }
    }

    // ---- Playlists -----------------------------------------------------

    pub async fn get_playlist_by_id(&self, id: PlaylistId) -> Result<Option<Playlist>> {
        let Some(bytes) = self.kv.get(&keys::playlist_id_key(id)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub async fn get_playlist_by_slug(&self, slug: &str) -> Result<Option<Playlist>> {
        let Some(id_bytes) = self.kv.get(&keys::playlist_slug_key(slug)).await? else {
            return Ok(None);
        };
        let id: PlaylistId = String::from_utf8_lossy(&id_bytes)
            .parse()
            .map_err(|_| Error::Internal("corrupt playlist slug index".to_string()))?;
        self.get_playlist_by_id(id).await
    }

    pub async fn get_playlist_by_id_or_slug(&self, identifier: &str) -> Result<Option<Playlist>> {
        if crate::models::looks_like_uuid(identifier) {
            let id: PlaylistId = identifier.parse().map_err(|_| Error::InvalidInput("invalid id".to_string()))?;
            self.get_playlist_by_id(id).await
        } else {
            self.get_playlist_by_slug(identifier).await
        }
    }

    pub async fn get_item_by_id(&self, id: ItemId) -> Result<Option<PlaylistItem>> {
        let Some(bytes) = self.kv.get(&keys::item_id_key(id)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Item writes are issued before the playlist record is written so a
    /// reader observing `playlist:id` never sees a stale item set.
    pub async fn save_playlist(&self, playlist: &Playlist, is_update: bool) -> Result<()> {
        if is_update {
            if let Some(old) = self.get_playlist_by_id(playlist.id).await? {
                self.delete_playlist_items(&old).await?;
            }
        }

        self.write_playlist_items(playlist).await?;

        let body = serde_json::to_vec(playlist)?;
        futures::try_join!(
            self.kv.put(&keys::playlist_id_key(playlist.id), body),
            self.kv.put(&keys::playlist_slug_key(&playlist.slug), playlist.id.to_string().into_bytes()),
            self.kv.put(&keys::playlist_created_asc_key(playlist.created, playlist.id), playlist.id.to_string().into_bytes()),
            self.kv.put(&keys::playlist_created_desc_key(playlist.created, playlist.id), playlist.id.to_string().into_bytes()),
        )?;
        Ok(())
    }

    async fn write_playlist_items(&self, playlist: &Playlist) -> Result<()> {
        let writes = playlist.items.iter().map(|item| self.write_item(item));
        try_join_all(writes).await?;
        Ok(())
    }

    async fn write_item(&self, item: &PlaylistItem) -> Result<()> {
        let body = serde_json::to_vec(item)?;
        futures::try_join!(
            self.kv.put(&keys::item_id_key(item.id), body),
            self.kv.put(&keys::item_created_asc_key(item.created, item.id), item.id.to_string().into_bytes()),
            self.kv.put(&keys::item_created_desc_key(item.created, item.id), item.id.to_string().into_bytes()),
        )?;
        Ok(())
    }

    async fn delete_playlist_items(&self, playlist: &Playlist) -> Result<()> {
        let deletes = playlist.items.iter().map(|item| async move {
            self.kv.delete(&keys::item_id_key(item.id)).await?;
            self.kv.delete(&keys::item_created_asc_key(item.created, item.id)).await?;
            self.kv.delete(&keys::item_created_desc_key(item.created, item.id)).await
        });
        try_join_all(deletes).await?;
        Ok(())
    }

    pub async fn delete_playlist(&self, playlist: &Playlist) -> Result<()> {
        self.delete_playlist_items(playlist).await?;
        self.kv.delete(&keys::playlist_id_key(playlist.id)).await?;
        self.kv.delete(&keys::playlist_slug_key(&playlist.slug)).await?;
        self.kv.delete(&keys::playlist_created_asc_key(playlist.created, playlist.id)).await?;
        self.kv.delete(&keys::playlist_created_desc_key(playlist.created, playlist.id)).await?;
        Ok(())
    }

    pub async fn list_playlists(&self, limit: usize, cursor: Option<&str>, sort: SortDirection) -> Result<Page<Playlist>> {
        let prefix = keys::playlist_created_prefix(sort == SortDirection::Asc);
        let listing = self.kv.list(prefix, limit, cursor, sort.as_kv_direction()).await?;

        let mut items = Vec::with_capacity(listing.entries.len());
        for (_, id_bytes) in &listing.entries {
            let id: PlaylistId = String::from_utf8_lossy(id_bytes)
                .parse()
                .map_err(|_| Error::Internal("corrupt playlist created index".to_string()))?;
            if let Some(playlist) = self.get_playlist_by_id(id).await? {
                items.push(playlist);
            }
        }
        Ok(Page { items, cursor: listing.next_cursor, has_more: !listing.complete })
    }

    pub async fn list_items(&self, limit: usize, cursor: Option<&str>, sort: SortDirection) -> Result<Page<PlaylistItem>> {
        let prefix = keys::item_created_prefix(sort == SortDirection::Asc);
        let listing = self.kv.list(prefix, limit, cursor, sort.as_kv_direction()).await?;

        let mut items = Vec::with_capacity(listing.entries.len());
        for (_, id_bytes) in &listing.entries {
            let id: ItemId = String::from_utf8_lossy(id_bytes)
                .parse()
                .map_err(|_| Error::Internal("corrupt item created index".to_string()))?;
            if let Some(item) = self.get_item_by_id(id).await? {
                items.push(item);
            }
        }
        Ok(Page { items, cursor: listing.next_cursor, has_more: !listing.complete })
    }

    pub async fn list_playlists_by_channel(
        &self,
        channel_id: ChannelId,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Page<Playlist>> {
        let prefix = keys::channel_to_playlists_prefix(channel_id);
        let listing = self.kv.list(&prefix, limit, cursor, ListDirection::Ascending).await?;

        let mut items = Vec::with_capacity(listing.entries.len());
        for (_, pid_bytes) in &listing.entries {
            let pid: PlaylistId = String::from_utf8_lossy(pid_bytes)
                .parse()
                .map_err(|_| Error::Internal("corrupt channel-to-playlists index".to_string()))?;
            if let Some(playlist) = self.get_playlist_by_id(pid).await? {
                items.push(playlist);
            }
        }
        Ok(Page { items, cursor: listing.next_cursor, has_more: !listing.complete })
    }

    pub async fn list_items_by_channel(
        &self,
        channel_id: ChannelId,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Page<PlaylistItem>> {
        let prefix = keys::item_channel_prefix(channel_id);
        let listing = self.kv.list(&prefix, limit, cursor, ListDirection::Ascending).await?;

        let mut items = Vec::with_capacity(listing.entries.len());
        for (_, iid_bytes) in &listing.entries {
            let iid: ItemId = String::from_utf8_lossy(iid_bytes)
                .parse()
                .map_err(|_| Error::Internal("corrupt playlist-item channel index".to_string()))?;
            if let Some(item) = self.get_item_by_id(iid).await? {
                items.push(item);
            }
        }
        Ok(Page { items, cursor: listing.next_cursor, has_more: !listing.complete })
    }

    // ---- Channels --------------------------------------------------------

    pub async fn get_channel_by_id(&self, id: ChannelId) -> Result<Option<Channel>> {
        let Some(bytes) = self.kv.get(&keys::channel_id_key(id)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub async fn get_channel_by_slug(&self, slug: &str) -> Result<Option<Channel>> {
        let Some(id_bytes) = self.kv.get(&keys::channel_slug_key(slug)).await? else {
            return Ok(None);
        };
        let id: ChannelId = String::from_utf8_lossy(&id_bytes)
            .parse()
            .map_err(|_| Error::Internal("corrupt channel slug index".to_string()))?;
        self.get_channel_by_id(id).await
    }

    pub async fn get_channel_by_id_or_slug(&self, identifier: &str) -> Result<Option<Channel>> {
        if crate::models::looks_like_uuid(identifier) {
            let id: ChannelId = identifier.parse().map_err(|_| Error::InvalidInput("invalid id".to_string()))?;
            self.get_channel_by_id(id).await
        } else {
            self.get_channel_by_slug(identifier).await
        }
    }

    pub async fn list_channels(&self, limit: usize, cursor: Option<&str>, sort: SortDirection) -> Result<Page<Channel>> {
        let prefix = keys::channel_created_prefix(sort == SortDirection::Asc);
        let listing = self.kv.list(prefix, limit, cursor, sort.as_kv_direction()).await?;

        let mut items = Vec::with_capacity(listing.entries.len());
        for (_, id_bytes) in &listing.entries {
            let id: ChannelId = String::from_utf8_lossy(id_bytes)
                .parse()
                .map_err(|_| Error::Internal("corrupt channel created index".to_string()))?;
            if let Some(channel) = self.get_channel_by_id(id).await? {
                items.push(channel);
            }
        }
        Ok(Page { items, cursor: listing.next_cursor, has_more: !listing.complete })
    }

    /// Resolve every URL in a channel's `playlists` array in parallel.
    /// Any single failure aborts the whole batch.
    pub async fn resolve_channel_playlists(&self, urls: &[String]) -> Result<Vec<ResolvedPlaylist>> {
        let futures = urls.iter().map(|url| self.resolver.resolve(url, self, &self.min_dp_version));
        try_join_all(futures).await
    }

    /// Writes the resolved playlist mappings, then the channel record itself.
    pub async fn save_channel(&self, channel: &Channel, resolved: &[ResolvedPlaylist], is_update: bool) -> Result<()> {
        if is_update {
            self.clear_channel_mappings(channel.id).await?;
        }

        for entry in resolved {
            if entry.external {
                self.upsert_external_playlist(&entry.playlist).await?;
            }

            futures::try_join!(
                self.kv.put(&keys::channel_to_playlists_key(channel.id, entry.id), entry.id.to_string().into_bytes()),
                self.kv.put(&keys::playlist_to_channels_key(entry.id, channel.id), channel.id.to_string().into_bytes()),
            )?;

            let item_writes = entry.playlist.items.iter().map(|item| {
                self.kv.put(&keys::item_channel_key(channel.id, entry.id, item.id), item.id.to_string().into_bytes())
            });
            try_join_all(item_writes).await?;
        }

        let body = serde_json::to_vec(channel)?;
        futures::try_join!(
            self.kv.put(&keys::channel_id_key(channel.id), body),
            self.kv.put(&keys::channel_slug_key(&channel.slug), channel.id.to_string().into_bytes()),
            self.kv.put(&keys::channel_created_asc_key(channel.created, channel.id), channel.id.to_string().into_bytes()),
            self.kv.put(&keys::channel_created_desc_key(channel.created, channel.id), channel.id.to_string().into_bytes()),
        )?;
        Ok(())
    }

    /// Materializes an externally-fetched playlist locally for caching and
    /// item listing.
    async fn upsert_external_playlist(&self, playlist: &Playlist) -> Result<()> {
        self.write_playlist_items(playlist).await?;
        let body = serde_json::to_vec(playlist)?;
        futures::try_join!(
            self.kv.put(&keys::playlist_id_key(playlist.id), body),
            self.kv.put(&keys::playlist_slug_key(&playlist.slug), playlist.id.to_string().into_bytes()),
        )?;
        Ok(())
    }

    /// Delete every existing `channel-to-playlists:<cid>:*` mapping and its
    /// `playlist-to-channels` mirror, plus the channel's item-membership
    /// index, so a replace never leaves stale entries for dropped playlists.
    async fn clear_channel_mappings(&self, channel_id: ChannelId) -> Result<()> {
        let mapping_prefix = keys::channel_to_playlists_prefix(channel_id);
        let mut cursor: Option<String> = None;
        loop {
            let listing = self.kv.list(&mapping_prefix, MAX_LIMIT, cursor.as_deref(), ListDirection::Ascending).await?;
            for (_, pid_bytes) in &listing.entries {
                let pid: PlaylistId = String::from_utf8_lossy(pid_bytes)
                    .parse()
                    .map_err(|_| Error::Internal("corrupt channel-to-playlists index".to_string()))?;
                self.kv.delete(&keys::channel_to_playlists_key(channel_id, pid)).await?;
                self.kv.delete(&keys::playlist_to_channels_key(pid, channel_id)).await?;
            }
            if listing.complete {
                break;
            }
            cursor = listing.next_cursor;
        }

        let item_prefix = keys::item_channel_prefix(channel_id);
        let mut cursor: Option<String> = None;
        loop {
            let listing = self.kv.list(&item_prefix, MAX_LIMIT, cursor.as_deref(), ListDirection::Ascending).await?;
            for (key, _) in &listing.entries {
                self.kv.delete(key).await?;
            }
            if listing.complete {
                break;
            }
            cursor = listing.next_cursor;
        }
        Ok(())
    }

    pub async fn delete_channel(&self, channel: &Channel) -> Result<()> {
        self.clear_channel_mappings(channel.id).await?;
        self.kv.delete(&keys::channel_id_key(channel.id)).await?;
        self.kv.delete(&keys::channel_slug_key(&channel.slug)).await?;
        self.kv.delete(&keys::channel_created_asc_key(channel.created, channel.id)).await?;
        self.kv.delete(&keys::channel_created_desc_key(channel.created, channel.id)).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalPlaylistLookup for StorageEngine {
    // Dot-call resolves to the inherent method above: inherent methods take
    // priority over trait methods of the same name, so this is not
    // infinitely recursive.
    async fn get_playlist_by_id_or_slug(&self, identifier: &str) -> Result<Option<Playlist>> {
        self.get_playlist_by_id_or_slug(identifier).await
    }
}
