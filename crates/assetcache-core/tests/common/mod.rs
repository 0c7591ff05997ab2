//! Shared fixtures for worker integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use assetcache_core::fetch::{FetchError, FetchRequest, Fetcher, Response};
use assetcache_core::store::{BlobStore, CachedEntry, MemoryStore, StoreError, StoreResult};
use assetcache_core::{CacheWorker, CoreSet, Deployment, Manifest, WorkerConfig};
use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

pub const ORIGIN: &str = "https://app.example.com";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn url(path: &str) -> Url {
    origin().join(path).unwrap()
}

/// Resources of the first deployment: the default core set plus icons.
pub const V1: &[(&str, &str)] = &[
    ("/", "r00t-1"),
    ("index.html", "r00t-1"),
    ("main.dart.js", "main-1"),
    ("assets/NOTICES", "notices-1"),
    ("assets/AssetManifest.json", "assets-1"),
    ("assets/FontManifest.json", "fonts-1"),
    ("favicon.png", "fav-1"),
    ("icons/Icon-192.png", "icon192-1"),
    ("icons/Icon-512.png", "icon512-1"),
];

pub fn deployment(resources: &[(&str, &str)]) -> Deployment {
    let manifest: Manifest = resources.iter().copied().collect();
    Deployment::new(manifest, CoreSet::default()).unwrap()
}

pub fn worker_config(skip_waiting_on_install: bool) -> WorkerConfig {
    let mut config = WorkerConfig::new(origin());
    config.skip_waiting_on_install = skip_waiting_on_install;
    config
}

pub fn worker(
    store: Arc<dyn BlobStore>,
    fetcher: &Arc<MockFetcher>,
    deployment: Deployment,
) -> CacheWorker {
    CacheWorker::new(worker_config(true), deployment, store, fetcher.clone())
}

/// Fetcher serving bodies keyed by URL path; queries are ignored.
#[derive(Default)]
pub struct MockFetcher {
    bodies: Mutex<HashMap<String, Bytes>>,
    requests: Mutex<Vec<FetchRequest>>,
    offline: AtomicBool,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A fetcher serving `"<path>@<digest>"` for every resource.
    pub fn serving(resources: &[(&str, &str)]) -> Arc<Self> {
        let fetcher = Self::new();
        for (path, digest) in resources {
            fetcher.serve(path, format!("{}@{}", path, digest));
        }
        fetcher
    }

    pub fn serve(&self, key: &str, body: impl Into<Bytes>) {
        self.bodies.lock().unwrap().insert(Self::url_path(key), body.into());
    }

    pub fn remove(&self, key: &str) {
        self.bodies.lock().unwrap().remove(&Self::url_path(key));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requested_paths(&self) -> HashSet<String> {
        self.requests()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }

    fn url_path(key: &str) -> String {
        if key == "/" {
            "/".to_string()
        } else {
            format!("/{}", key.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Offline(request.url.to_string()));
        }

        let body = self.bodies.lock().unwrap().get(request.url.path()).cloned();
        match body {
            Some(body) => Ok(Response::ok(request.url.clone(), body)),
            None => Err(FetchError::NotFound(request.url.to_string())),
        }
    }
}

/// Memory store whose writes into one namespace can be made to fail.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_puts_in: Mutex<Option<String>>,
    fail_key: Mutex<Option<String>>,
}

impl FailingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_puts_in(&self, namespace: &str) {
        *self.fail_puts_in.lock().unwrap() = Some(namespace.to_string());
    }

    /// Fail writes of one key in any namespace.
    pub fn fail_puts_of(&self, key: &str) {
        *self.fail_key.lock().unwrap() = Some(key.to_string());
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn open(&self, namespace: &str) -> StoreResult<()> {
        self.inner.open(namespace).await
    }

    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<CachedEntry>> {
        self.inner.get(namespace, key).await
    }

    async fn put(&self, namespace: &str, key: &str, entry: CachedEntry) -> StoreResult<()> {
        let failing = self.fail_puts_in.lock().unwrap().as_deref() == Some(namespace)
            || self.fail_key.lock().unwrap().as_deref() == Some(key);
        if failing {
            return Err(StoreError::Io(std::io::Error::other("injected write failure")));
        }
        self.inner.put(namespace, key, entry).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool> {
        self.inner.delete(namespace, key).await
    }

    async fn keys(&self, namespace: &str) -> StoreResult<Vec<String>> {
        self.inner.keys(namespace).await
    }

    async fn has_namespace(&self, namespace: &str) -> StoreResult<bool> {
        self.inner.has_namespace(namespace).await
    }

    async fn drop_namespace(&self, namespace: &str) -> StoreResult<bool> {
        self.inner.drop_namespace(namespace).await
    }

    fn backend_name(&self) -> &'static str {
        "failing-memory"
    }
}
