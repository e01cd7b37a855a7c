use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{ChannelId, ItemId, PlaylistId};

/// RFC 3339 (millisecond precision) representation used for the ascending
/// `created` index.
#[must_use]
pub fn ts_asc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fixed-width descending encoding such that lexicographic order on this
/// string inverts chronological order. Using `i64::MAX - millis` zero-padded
/// to 20 digits rather than a character
/// complement keeps the encoding trivially reversible-order without
/// depending on the ASCII range of every RFC 3339 byte.
#[must_use]
pub fn ts_desc(ts: DateTime<Utc>) -> String {
    let millis = ts.timestamp_millis();
    format!("{:020}", i64::MAX - millis)
}

#[must_use]
pub fn playlist_id_key(id: PlaylistId) -> String {
    format!("playlist:id:{id}")
}

#[must_use]
pub fn playlist_slug_key(slug: &str) -> String {
    format!("playlist:slug:{slug}")
}

#[must_use]
pub fn playlist_created_asc_key(ts: DateTime<Utc>, id: PlaylistId) -> String {
    format!("playlist:created:asc:{}:{id}", ts_asc(ts))
}

#[must_use]
pub fn playlist_created_desc_key(ts: DateTime<Utc>, id: PlaylistId) -> String {
    format!("playlist:created:desc:{}:{id}", ts_desc(ts))
}

#[must_use]
pub const fn playlist_created_prefix(ascending: bool) -> &'static str {
    if ascending {
        "playlist:created:asc:"
    } else {
        "playlist:created:desc:"
    }
}

#[must_use]
pub fn item_id_key(id: ItemId) -> String {
    format!("playlist-item:id:{id}")
}

#[must_use]
pub fn item_created_asc_key(ts: DateTime<Utc>, id: ItemId) -> String {
    format!("playlist-item:created:asc:{}:{id}", ts_asc(ts))
}

#[must_use]
pub fn item_created_desc_key(ts: DateTime<Utc>, id: ItemId) -> String {
    format!("playlist-item:created:desc:{}:{id}", ts_desc(ts))
}

#[must_use]
pub const fn item_created_prefix(ascending: bool) -> &'static str {
    if ascending {
        "playlist-item:created:asc:"
    } else {
        "playlist-item:created:desc:"
    }
}

#[must_use]
pub fn channel_id_key(id: ChannelId) -> String {
    format!("channel:id:{id}")
}

#[must_use]
pub fn channel_slug_key(slug: &str) -> String {
    format!("channel:slug:{slug}")
}

#[must_use]
pub fn channel_created_asc_key(ts: DateTime<Utc>, id: ChannelId) -> String {
    format!("channel:created:asc:{}:{id}", ts_asc(ts))
}

#[must_use]
pub fn channel_created_desc_key(ts: DateTime<Utc>, id: ChannelId) -> String {
    format!("channel:created:desc:{}:{id}", ts_desc(ts))
}

#[must_use]
pub const fn channel_created_prefix(ascending: bool) -> &'static str {
    if ascending {
        "channel:created:asc:"
    } else {
        "channel:created:desc:"
    }
}

#[must_use]
pub fn channel_to_playlists_key(cid: ChannelId, pid: PlaylistId) -> String {
    format!("channel-to-playlists:{cid}:{pid}")
}

#[must_use]
pub fn channel_to_playlists_prefix(cid: ChannelId) -> String {
    format!("channel-to-playlists:{cid}:")
}

#[must_use]
pub fn playlist_to_channels_key(pid: PlaylistId, cid: ChannelId) -> String {
    format!("playlist-to-channels:{pid}:{cid}")
}

#[must_use]
pub fn playlist_to_channels_prefix(pid: PlaylistId) -> String {
    format!("playlist-to-channels:{pid}:")
}

#[must_use]
pub fn item_channel_key(cid: ChannelId, pid: PlaylistId, iid: ItemId) -> String {
    format!("playlist-item:channel:{cid}:{pid}:{iid}")
}

#[must_use]
pub fn item_channel_prefix(cid: ChannelId) -> String {
    format!("playlist-item:channel:{cid}:")
}
