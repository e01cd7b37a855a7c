use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UUIDv4 regex used to disambiguate a path `:id` segment from a slug.
pub const UUID_RE: &str = r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-4[0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$";

/// Server-assigned identifier shared by Playlist, Channel and PlaylistItem.
/// A thin `Uuid` wrapper so each resource family gets its own type at the
/// API boundary while storage code can still treat all of them uniformly.
macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn as_str_buf(&self) -> uuid::fmt::Hyphenated {
                self.0.hyphenated()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(PlaylistId);
uuid_id!(ChannelId);
uuid_id!(ItemId);

/// Returns true when `candidate` matches the UUIDv4 shape used for
/// server-assigned ids.
#[must_use]
pub fn looks_like_uuid(candidate: &str) -> bool {
    // `Uuid::parse_str` also accepts v1/v3/v5 UUIDs, which are looser than
    // what we want here, so match the UUIDv4 regex directly.
    static UUID_REGEX: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(UUID_RE).expect("static regex"));
    UUID_REGEX.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_id_roundtrips_through_string() {
        let id = PlaylistId::new();
        let parsed: PlaylistId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn looks_like_uuid_accepts_v4_only() {
        let v4 = PlaylistId::new().to_string();
        assert!(looks_like_uuid(&v4));
        assert!(!looks_like_uuid("my-cool-slug-1234"));
        assert!(!looks_like_uuid("not-a-uuid"));
    }
}
