//! In-memory blob store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlobStore, CachedEntry, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<String, BTreeMap<String, CachedEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn open(&self, namespace: &str) -> StoreResult<()> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default();
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<CachedEntry>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, namespace: &str, key: &str, entry: CachedEntry) -> StoreResult<()> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool> {
        Ok(self
            .namespaces
            .write()
            .await
            .get_mut(namespace)
            .map(|entries| entries.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn keys(&self, namespace: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn has_namespace(&self, namespace: &str) -> StoreResult<bool> {
        Ok(self.namespaces.read().await.contains_key(namespace))
    }

    async fn drop_namespace(&self, namespace: &str) -> StoreResult<bool> {
        Ok(self.namespaces.write().await.remove(namespace).is_some())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        store
            .put("content", "index.html", CachedEntry::new("https://a/index.html", "<html>"))
            .await
            .unwrap();

        let entry = store.get("content", "index.html").await.unwrap().unwrap();
        assert_eq!(&entry.body[..], b"<html>");
        assert!(store.get("temp", "index.html").await.unwrap().is_none());

        assert!(store.delete("content", "index.html").await.unwrap());
        assert!(!store.delete("content", "index.html").await.unwrap());
        assert!(!store.delete("missing", "index.html").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_sorted_and_drop() {
        let store = MemoryStore::new();
        for key in ["main.dart.js", "/", "assets/NOTICES"] {
            store.put("content", key, CachedEntry::new(key, "x")).await.unwrap();
        }

        assert_eq!(
            store.keys("content").await.unwrap(),
            vec!["/", "assets/NOTICES", "main.dart.js"]
        );

        assert!(store.drop_namespace("content").await.unwrap());
        assert!(!store.has_namespace("content").await.unwrap());
        assert!(store.keys("content").await.unwrap().is_empty());
        assert!(!store.drop_namespace("content").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_creates_empty_namespace() {
        let store = MemoryStore::new();
        store.open("app-temp-cache").await.unwrap();
        assert!(store.has_namespace("app-temp-cache").await.unwrap());
        assert!(store.keys("app-temp-cache").await.unwrap().is_empty());
    }
}
