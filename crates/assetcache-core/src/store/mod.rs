//! Namespaced blob storage for cached responses.
//!
//! A worker keeps three namespaces (content, temp, manifest) in one
//! `BlobStore`. Backends:
//! - `MemoryStore`: process-local, used by tests and embedders
//! - `FsStore`: one directory per namespace, survives restarts
//!
//! Callers normally go through a `Namespace` handle rather than the trait.

pub mod error;
pub mod filesystem;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use url::Url;

use crate::fetch::Response;

pub use error::{StoreError, StoreResult};
pub use filesystem::FsStore;
pub use memory::MemoryStore;

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// URL the body was fetched from.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub stored_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            content_type: None,
            body: body.into(),
            stored_at: Utc::now(),
        }
    }

    pub fn from_response(response: &Response) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
            body: response.body.clone(),
            stored_at: Utc::now(),
        }
    }

    /// Replay the stored response for a request to `url`.
    pub fn into_response(self, url: Url) -> Response {
        Response {
            url,
            status: self.status,
            content_type: self.content_type,
            body: self.body,
        }
    }

    pub fn age_display(&self) -> String {
        age_display(self.stored_at)
    }
}

/// Human-readable age of a timestamp ("just now", "5m ago", "2h ago", "3d ago").
pub fn age_display(stored_at: DateTime<Utc>) -> String {
    let minutes = (Utc::now() - stored_at).num_minutes();
    if minutes < 1 {
        // Negative on clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Storage backend holding independently addressable namespaces of entries.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Create the namespace if it does not exist yet.
    async fn open(&self, namespace: &str) -> StoreResult<()>;

    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<CachedEntry>>;

    /// Insert or overwrite an entry, creating the namespace on demand.
    async fn put(&self, namespace: &str, key: &str, entry: CachedEntry) -> StoreResult<()>;

    /// Returns whether an entry was removed.
    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool>;

    /// Keys of a namespace in ascending order. Empty for a missing namespace.
    async fn keys(&self, namespace: &str) -> StoreResult<Vec<String>>;

    async fn has_namespace(&self, namespace: &str) -> StoreResult<bool>;

    /// Remove a namespace and every entry in it. Returns whether it existed.
    async fn drop_namespace(&self, namespace: &str) -> StoreResult<bool>;

    async fn contains(&self, namespace: &str, key: &str) -> StoreResult<bool> {
        Ok(self.get(namespace, key).await?.is_some())
    }

    /// When an entry was stored. Backends that keep metadata apart from the
    /// body should answer without loading the body.
    async fn stored_at(&self, namespace: &str, key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self.get(namespace, key).await?.map(|entry| entry.stored_at))
    }

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}

/// Namespace names become directory names, so keep them to a safe alphabet.
pub fn validate_namespace(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidNamespace(name.to_string()))
    }
}

/// Handle to one opened namespace of a store.
#[derive(Clone)]
pub struct Namespace {
    store: Arc<dyn BlobStore>,
    name: String,
}

impl Namespace {
    pub async fn open(store: Arc<dyn BlobStore>, name: &str) -> StoreResult<Self> {
        validate_namespace(name)?;
        store.open(name).await?;
        Ok(Self {
            store,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<CachedEntry>> {
        self.store.get(&self.name, key).await
    }

    pub async fn put(&self, key: &str, entry: CachedEntry) -> StoreResult<()> {
        self.store.put(&self.name, key, entry).await
    }

    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.store.delete(&self.name, key).await
    }

    pub async fn keys(&self) -> StoreResult<Vec<String>> {
        self.store.keys(&self.name).await
    }

    pub async fn contains(&self, key: &str) -> StoreResult<bool> {
        self.store.contains(&self.name, key).await
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("backend", &self.store.backend_name())
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_namespace() {
        assert!(validate_namespace("app-cache").is_ok());
        assert!(validate_namespace("app_temp.v2").is_ok());
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("..").is_err());
        assert!(validate_namespace("a/b").is_err());
    }

    #[test]
    fn test_entry_age_display() {
        let mut entry = CachedEntry::new("https://app.example.com/", "x");
        assert_eq!(entry.age_display(), "just now");

        entry.stored_at = Utc::now() - Duration::minutes(5);
        assert_eq!(entry.age_display(), "5m ago");

        entry.stored_at = Utc::now() - Duration::minutes(95);
        assert_eq!(entry.age_display(), "2h ago");

        entry.stored_at = Utc::now() - Duration::hours(50);
        assert_eq!(entry.age_display(), "2d ago");

        // Clock skew
        entry.stored_at = Utc::now() + Duration::minutes(10);
        assert_eq!(entry.age_display(), "just now");
    }
}
