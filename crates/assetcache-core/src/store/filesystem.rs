//! Filesystem blob store.
//!
//! Layout: one file per entry at `<root>/<namespace>/<sha256(key)>.entry`.
//! The file starts with a single line of JSON metadata (including the
//! logical key) followed by the raw body. Each write goes to its own
//! temporary file which is then renamed into place, so readers only ever
//! see a complete entry and concurrent writers of one key never collide.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::{validate_namespace, BlobStore, CachedEntry, StoreError, StoreResult};

const ENTRY_EXT: &str = "entry";

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    url: String,
    status: u16,
    content_type: Option<String>,
    stored_at: DateTime<Utc>,
    /// Body length in bytes, checked on read.
    size: u64,
}

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: PathBuf) -> StoreResult<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> StoreResult<PathBuf> {
        validate_namespace(namespace)?;
        Ok(self.root.join(namespace))
    }

    /// Fixed-length file name, whatever the key's length.
    fn entry_path(dir: &Path, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        dir.join(format!("{}.{}", hex::encode(digest), ENTRY_EXT))
    }

    fn is_entry_file(path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXT)
    }
}

fn corrupt(namespace: &str, key: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        namespace: namespace.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Read only the metadata line of an entry file. `None` if the file is gone.
async fn read_meta(path: &Path) -> StoreResult<Option<EntryMeta>> {
    let file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut header = String::new();
    BufReader::new(file).read_line(&mut header).await?;
    Ok(Some(serde_json::from_str(header.trim_end())?))
}

/// Write `meta` and `body` to a fresh temp file in `dir`, then rename it
/// over `path`.
async fn write_entry(dir: PathBuf, path: PathBuf, meta: Vec<u8>, body: Bytes) -> StoreResult<()> {
    let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&meta)?;
        tmp.write_all(b"\n")?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_data()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?;
    Ok(written?)
}

#[async_trait]
impl BlobStore for FsStore {
    async fn open(&self, namespace: &str) -> StoreResult<()> {
        fs::create_dir_all(self.namespace_dir(namespace)?).await?;
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<CachedEntry>> {
        let dir = self.namespace_dir(namespace)?;

        let contents = match fs::read(Self::entry_path(&dir, key)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some(split) = contents.iter().position(|&b| b == b'\n') else {
            return Err(corrupt(namespace, key, "missing metadata terminator"));
        };
        let meta: EntryMeta = serde_json::from_slice(&contents[..split])?;
        if meta.key != key {
            return Err(corrupt(namespace, key, format!("file holds key {:?}", meta.key)));
        }

        let body = Bytes::from(contents).slice(split + 1..);
        if body.len() as u64 != meta.size {
            return Err(corrupt(
                namespace,
                key,
                format!("expected {} body bytes, found {}", meta.size, body.len()),
            ));
        }

        Ok(Some(CachedEntry {
            url: meta.url,
            status: meta.status,
            content_type: meta.content_type,
            body,
            stored_at: meta.stored_at,
        }))
    }

    async fn put(&self, namespace: &str, key: &str, entry: CachedEntry) -> StoreResult<()> {
        let dir = self.namespace_dir(namespace)?;
        fs::create_dir_all(&dir).await?;

        let size = entry.body.len();
        let meta = EntryMeta {
            key: key.to_string(),
            url: entry.url,
            status: entry.status,
            content_type: entry.content_type,
            stored_at: entry.stored_at,
            size: size as u64,
        };
        let path = Self::entry_path(&dir, key);
        write_entry(dir, path, serde_json::to_vec(&meta)?, entry.body).await?;

        debug!(namespace = namespace, key = key, bytes = size, "Stored entry");
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool> {
        let dir = self.namespace_dir(namespace)?;
        match fs::remove_file(Self::entry_path(&dir, key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, namespace: &str) -> StoreResult<Vec<String>> {
        let dir = self.namespace_dir(namespace)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !Self::is_entry_file(&path) {
                continue;
            }
            match read_meta(&path).await {
                Ok(Some(meta)) => keys.push(meta.key),
                // Deleted while listing
                Ok(None) => {}
                Err(e) => warn!(
                    namespace = namespace,
                    file = %path.display(),
                    error = %e,
                    "Skipping unreadable entry"
                ),
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn stored_at(&self, namespace: &str, key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let dir = self.namespace_dir(namespace)?;
        Ok(read_meta(&Self::entry_path(&dir, key))
            .await?
            .map(|meta| meta.stored_at))
    }

    async fn has_namespace(&self, namespace: &str) -> StoreResult<bool> {
        Ok(fs::try_exists(self.namespace_dir(namespace)?).await?)
    }

    async fn drop_namespace(&self, namespace: &str) -> StoreResult<bool> {
        match fs::remove_dir_all(self.namespace_dir(namespace)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
