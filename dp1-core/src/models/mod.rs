pub mod channel;
pub mod ids;
pub mod playlist;
pub mod validation;

pub use channel::{Channel, ChannelInput, ChannelUpdate};
pub use ids::{looks_like_uuid, ChannelId, ItemId, PlaylistId};
pub use playlist::{License, Playlist, PlaylistInput, PlaylistItem, PlaylistItemInput, PlaylistUpdate};
