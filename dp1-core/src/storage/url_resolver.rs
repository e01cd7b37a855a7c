use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::models::{validation, PlaylistId};
use crate::models::Playlist;

static SELF_HOSTED_PLAYLIST_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/v1/playlists/([A-Za-z0-9_\-]+)$").expect("static regex"));

/// Outcome of resolving one channel->playlist URL.
pub struct ResolvedPlaylist {
    pub id: PlaylistId,
    pub playlist: Playlist,
    pub external: bool,
}

/// Local playlist lookup the resolver needs for the self-hosted
/// short-circuit path, implemented by the Storage Engine. Kept as a trait
/// here (rather than a direct dependency on `StorageEngine`) so the
/// resolver stays testable without constructing a full engine. Accepts
/// either a UUID or a slug, since a self-hosted channel reference may name
/// either.
#[async_trait]
pub trait LocalPlaylistLookup: Send + Sync {
    async fn get_playlist_by_id_or_slug(&self, identifier: &str) -> Result<Option<Playlist>>;
}

pub struct UrlResolver {
    self_hosted_domains: Vec<String>,
    fetch_timeout: Duration,
    http_client: reqwest::Client,
}

impl UrlResolver {
    #[must_use]
    pub fn new(self_hosted_domains: Vec<String>, fetch_timeout_secs: u64) -> Self {
        let fetch_timeout = Duration::from_secs(fetch_timeout_secs);
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_default();
        Self { self_hosted_domains, fetch_timeout, http_client }
    }

    /// Resolve a single channel->playlist reference. Self-hosted domains
    /// short-circuit to a local KV lookup and never make an outbound HTTP
    /// call, so the resolver cannot deadlock recursing into its own process.
    pub async fn resolve(
        &self,
        url_str: &str,
        lookup: &dyn LocalPlaylistLookup,
        min_dp_version: &str,
    ) -> Result<ResolvedPlaylist> {
        let url = url::Url::parse(url_str)
            .map_err(|e| Error::UrlResolution(format!("invalid url '{url_str}': {e}")))?;

        let Some(host) = url.host_str() else {
            return Err(Error::UrlResolution(format!("url '{url_str}' has no host")));
        };
        let host_port = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        if self.is_self_hosted(host, &host_port) {
            return self.resolve_self_hosted(url.path(), lookup).await;
        }

        self.resolve_external(url_str, min_dp_version).await
    }

    fn is_self_hosted(&self, host: &str, host_port: &str) -> bool {
        self.self_hosted_domains
            .iter()
            .any(|configured| configured.eq_ignore_ascii_case(host) || configured.eq_ignore_ascii_case(host_port))
    }

    async fn resolve_self_hosted(&self, path: &str, lookup: &dyn LocalPlaylistLookup) -> Result<ResolvedPlaylist> {
        let captures = SELF_HOSTED_PLAYLIST_PATH
            .captures(path)
            .ok_or_else(|| Error::UrlResolution(format!("invalid_self_hosted_url: {path}")))?;
        let identifier = &captures[1];

        let playlist = lookup
            .get_playlist_by_id_or_slug(identifier)
            .await?
            .ok_or_else(|| Error::UrlResolution(format!("self_hosted_playlist_missing: {identifier}")))?;

        let id = playlist.id;
        Ok(ResolvedPlaylist { id, playlist, external: false })
    }

    async fn resolve_external(&self, url_str: &str, min_dp_version: &str) -> Result<ResolvedPlaylist> {
        let response = self
            .http_client
            .get(url_str)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| Error::UrlResolution(format!("fetch failed for '{url_str}': {e}")))?;

        if !response.status().is_success() {
            return Err(Error::UrlResolution(format!(
                "fetch returned {} for '{url_str}'",
                response.status()
            )));
        }

        let playlist: Playlist = response
            .json()
            .await
            .map_err(|e| Error::UrlResolution(format!("invalid playlist body from '{url_str}': {e}")))?;

        validate_fetched_playlist(&playlist, min_dp_version)?;

        Ok(ResolvedPlaylist { id: playlist.id, playlist, external: true })
    }
}

/// Structural DP-1 validation applied to a playlist fetched from an
/// external URL: parses as JSON and validates against the playlist schema.
fn validate_fetched_playlist(playlist: &Playlist, min_dp_version: &str) -> Result<()> {
    validation::validate_dp_version(&playlist.dp_version, min_dp_version)?;
    if playlist.items.is_empty() {
        return Err(Error::UrlResolution("fetched playlist has no items".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubLookup(Mutex<Option<Playlist>>);

    #[async_trait]
    impl LocalPlaylistLookup for StubLookup {
        async fn get_playlist_by_id_or_slug(&self, _identifier: &str) -> Result<Option<Playlist>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    fn sample_playlist(id: PlaylistId) -> Playlist {
        use crate::models::{License, PlaylistItem};
        use chrono::Utc;

        Playlist {
            dp_version: "1.0.0".to_string(),
            id,
            slug: "sample-0001".to_string(),
            title: "Sample".to_string(),
            created: Utc::now(),
            signature: "ed25519:0xdead".to_string(),
            items: vec![PlaylistItem {
                id: crate::models::ItemId::new(),
                title: "A".to_string(),
                source: "https://example.com/a".to_string(),
                duration: 10,
                license: License::Open,
                created: Utc::now(),
            }],
            defaults: None,
            curators: None,
            summary: None,
            cover_image: None,
            dynamic_queries: None,
        }
    }

    #[tokio::test]
    async fn self_hosted_domain_never_issues_http_and_uses_local_lookup() {
        let id = PlaylistId::new();
        let lookup = StubLookup(Mutex::new(Some(sample_playlist(id))));
        let resolver = UrlResolver::new(vec!["api.feed.example.com".to_string()], 5);

        let url = format!("https://api.feed.example.com/api/v1/playlists/{id}");
        let resolved = resolver.resolve(&url, &lookup, "1.0.0").await.unwrap();
        assert!(!resolved.external);
        assert_eq!(resolved.id, id);
    }

    #[tokio::test]
    async fn self_hosted_domain_resolves_by_slug_too() {
        let id = PlaylistId::new();
        let lookup = StubLookup(Mutex::new(Some(sample_playlist(id))));
        let resolver = UrlResolver::new(vec!["api.feed.example.com".to_string()], 5);

        let url = "https://api.feed.example.com/api/v1/playlists/sample-0001";
        let resolved = resolver.resolve(url, &lookup, "1.0.0").await.unwrap();
        assert!(!resolved.external);
        assert_eq!(resolved.id, id);
    }

    #[tokio::test]
    async fn self_hosted_missing_playlist_is_fatal() {
        let id = PlaylistId::new();
        let lookup = StubLookup(Mutex::new(None));
        let resolver = UrlResolver::new(vec!["api.feed.example.com".to_string()], 5);

        let url = format!("https://api.feed.example.com/api/v1/playlists/{id}");
        let err = resolver.resolve(&url, &lookup, "1.0.0").await.unwrap_err();
        assert!(matches!(err, Error::UrlResolution(msg) if msg.contains("self_hosted_playlist_missing")));
    }

    #[tokio::test]
    async fn self_hosted_bad_path_is_fatal() {
        let lookup = StubLookup(Mutex::new(None));
        let resolver = UrlResolver::new(vec!["api.feed.example.com".to_string()], 5);

        let url = "https://api.feed.example.com/not/a/playlist/path";
        let err = resolver.resolve(url, &lookup, "1.0.0").await.unwrap_err();
        assert!(matches!(err, Error::UrlResolution(msg) if msg.contains("invalid_self_hosted_url")));
    }
}
