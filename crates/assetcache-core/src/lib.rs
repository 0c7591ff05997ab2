//! Core library for assetcache.
//!
//! assetcache keeps an offline copy of a web application's static assets.
//! A deployment ships a manifest mapping each asset path to a content
//! digest; the [`CacheWorker`] installs the core set into a staging
//! namespace, reconciles it into the durable content namespace on
//! activation (keeping assets whose digest did not change), and serves
//! requests from that namespace.
//!
//! Storage and networking are injected through the [`BlobStore`] and
//! [`Fetcher`] traits.

pub mod config;
pub mod fetch;
pub mod manifest;
pub mod request;
pub mod status;
pub mod store;
pub mod worker;

pub use config::{CacheNames, Config, WorkerConfig};
pub use fetch::{CacheMode, FetchError, FetchRequest, Fetcher, HttpFetcher, Response};
pub use manifest::{CoreSet, Deployment, Manifest, ManifestError};
pub use request::{Method, Request};
pub use status::CacheStatus;
pub use store::{BlobStore, CachedEntry, FsStore, MemoryStore, Namespace, StoreError};
pub use worker::{
    spawn_control_loop, ActivationOutcome, CacheWorker, ControlMessage, Intercept,
    PrefetchReport, WorkerError, WorkerState, MANIFEST_KEY,
};
