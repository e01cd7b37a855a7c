pub mod engine;
pub mod keys;
pub mod url_resolver;

pub use engine::{Page, SortDirection, StorageEngine, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT};
pub use url_resolver::{LocalPlaylistLookup, ResolvedPlaylist, UrlResolver};
