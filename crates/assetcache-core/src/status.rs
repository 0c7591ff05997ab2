//! Cache status reporting.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::store::age_display;
use crate::worker::{CacheWorker, WorkerError, WorkerState, MANIFEST_KEY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub backend: &'static str,
    pub state: WorkerState,
    pub content_entries: usize,
    pub temp_entries: usize,
    /// Whether a previous deployment's manifest is persisted.
    pub has_manifest: bool,
    /// Manifest resources not present in content.
    pub missing: Vec<String>,
    /// Age of the most recently stored content entry.
    pub newest_age: Option<String>,
}

impl CacheStatus {
    pub fn is_offline_ready(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn last_updated(&self) -> String {
        self.newest_age
            .clone()
            .unwrap_or_else(|| "never".to_string())
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "backend:        {}", self.backend)?;
        writeln!(f, "worker:         {}", self.state)?;
        writeln!(f, "content:        {} entries", self.content_entries)?;
        writeln!(f, "temp:           {} entries", self.temp_entries)?;
        writeln!(f, "manifest:       {}", if self.has_manifest { "saved" } else { "none" })?;
        writeln!(f, "last updated:   {}", self.last_updated())?;
        write!(f, "offline ready:  ")?;
        if self.is_offline_ready() {
            write!(f, "yes")
        } else {
            write!(f, "no ({} missing)", self.missing.len())
        }
    }
}

impl CacheWorker {
    /// Snapshot of the namespaces. Reads only; never creates a namespace.
    pub async fn status(&self) -> Result<CacheStatus, WorkerError> {
        let names = &self.config.cache_names;
        let content_keys = self.store.keys(&names.content).await?;
        let temp_entries = self.store.keys(&names.temp).await?.len();
        let has_manifest = self.store.contains(&names.manifest, MANIFEST_KEY).await?;

        let mut newest: Option<DateTime<Utc>> = None;
        for key in &content_keys {
            match self.store.stored_at(&names.content, key).await {
                Ok(Some(stored_at)) if newest.map_or(true, |n| stored_at > n) => {
                    newest = Some(stored_at);
                }
                Ok(_) => {}
                Err(e) => debug!(key = %key, error = %e, "Failed to read entry time for status"),
            }
        }

        let present: HashSet<&str> = content_keys.iter().map(String::as_str).collect();
        let missing = self
            .deployment
            .resources
            .paths()
            .filter(|path| !present.contains(path))
            .map(str::to_string)
            .collect();

        Ok(CacheStatus {
            backend: self.store.backend_name(),
            state: self.state().await,
            content_entries: content_keys.len(),
            temp_entries,
            has_manifest,
            missing,
            newest_age: newest.map(age_display),
        })
    }
}
