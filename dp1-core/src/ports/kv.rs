use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListDirection {
    Ascending,
    Descending,
}

/// Result of a single prefix scan page.
#[derive(Debug, Clone, Default)]
pub struct KvListing {
    pub entries: Vec<(String, Vec<u8>)>,
    pub next_cursor: Option<String>,
    pub complete: bool,
}

/// Ordered, prefix-scannable string->bytes store with cursor pagination.
/// The core never parses cursors; they are forwarded verbatim between
/// client and implementation.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn list(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<&str>,
        direction: ListDirection,
    ) -> Result<KvListing>;
}

/// Reference implementation used for tests and the single-process
/// deployment profile. Production profiles swap this for a `CloudflareKV`
/// or `Etcd` backed implementation behind the same trait; that wiring is
/// outside the core's scope.
#[derive(Default)]
pub struct InMemoryKv {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryKv {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<&str>,
        direction: ListDirection,
    ) -> Result<KvListing> {
        let data = self.data.read().await;
        let mut matching: Vec<(&String, &Vec<u8>)> =
            data.range(prefix.to_string()..).take_while(|(k, _)| k.starts_with(prefix)).collect();

        if direction == ListDirection::Descending {
            matching.reverse();
        }

        // Cursor is the last key returned in the previous page; skip past it.
        let start_index = match cursor {
            Some(after) => matching.iter().position(|(k, _)| k.as_str() == after).map_or(0, |pos| pos + 1),
            None => 0,
        };

        let remaining = &matching[start_index.min(matching.len())..];
        let page: Vec<(String, Vec<u8>)> =
            remaining.iter().take(limit).map(|(k, v)| ((*k).clone(), (*v).clone())).collect();

        let complete = page.len() >= remaining.len();
        let next_cursor = if complete { None } else { page.last().map(|(k, _)| k.clone()) };

        Ok(KvListing { entries: page, next_cursor, complete })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_paginates_in_ascending_order() {
        let kv = InMemoryKv::new();
        for i in 0..5 {
            kv.put(&format!("p:{i}"), vec![i as u8]).await.unwrap();
        }

        let page1 = kv.list("p:", 2, None, ListDirection::Ascending).await.unwrap();
        assert_eq!(page1.entries.len(), 2);
        assert_eq!(page1.entries[0].0, "p:0");
        assert!(!page1.complete);

        let page2 = kv
            .list("p:", 2, page1.next_cursor.as_deref(), ListDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(page2.entries[0].0, "p:2");
    }

    #[tokio::test]
    async fn list_descending_reverses_ascending() {
        let kv = InMemoryKv::new();
        for i in 0..3 {
            kv.put(&format!("p:{i}"), vec![]).await.unwrap();
        }
        let asc = kv.list("p:", 10, None, ListDirection::Ascending).await.unwrap();
        let desc = kv.list("p:", 10, None, ListDirection::Descending).await.unwrap();
        let asc_keys: Vec<_> = asc.entries.iter().map(|(k, _)| k.clone()).collect();
        let mut desc_keys: Vec<_> = desc.entries.iter().map(|(k, _)| k.clone()).collect();
        desc_keys.reverse();
        assert_eq!(asc_keys, desc_keys);
    }

    #[tokio::test]
    async fn get_put_delete_round_trip() {
        let kv = InMemoryKv::new();
        assert!(kv.get("k").await.unwrap().is_none());
        kv.put("k", b"v".to_vec()).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some(b"v".to_vec()));
        kv.delete("k").await.unwrap();
        assert!(kv.get("k").await.unwrap().is_none());
    }
}
