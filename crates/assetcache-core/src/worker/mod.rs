//! The cache worker.
//!
//! One `CacheWorker` exists per deployment. Its handlers:
//! - `install`: stage the core set in the temp namespace
//! - `activate`: reconcile content against temp and the previous manifest
//! - `handle_fetch`: serve manifest resources from the content namespace
//! - `download_offline`: fill content with every missing manifest resource
//! - `handle_message`: control messages (`skipWaiting`, `downloadOffline`)
//!
//! Lifecycle gating (when activation may run) belongs to the host; the
//! worker only refuses transitions that make no sense.

pub mod activate;
pub mod control;
pub mod install;
pub mod intercept;
pub mod prefetch;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::config::WorkerConfig;
use crate::fetch::{FetchError, Fetcher};
use crate::manifest::{Deployment, ManifestError};
use crate::store::{BlobStore, Namespace, StoreError};

pub use activate::{ActivationOutcome, MANIFEST_KEY};
pub use control::{spawn_control_loop, ControlMessage};
pub use intercept::Intercept;
pub use prefetch::PrefetchReport;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Install failed fetching {path}: {source}")]
    Install {
        path: String,
        #[source]
        source: FetchError,
    },

    #[error("Cannot {action} while {state}")]
    Lifecycle {
        action: &'static str,
        state: WorkerState,
    },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker will never activate.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

pub struct CacheWorker {
    pub(crate) config: WorkerConfig,
    pub(crate) deployment: Deployment,
    pub(crate) store: Arc<dyn BlobStore>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
}

impl CacheWorker {
    pub fn new(
        config: WorkerConfig,
        deployment: Deployment,
        store: Arc<dyn BlobStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let skip_waiting = AtomicBool::new(config.skip_waiting_on_install);
        Self {
            config,
            deployment,
            store,
            fetcher,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn origin(&self) -> &Url {
        &self.config.origin
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Move from `from` to `to`, failing if the worker is elsewhere.
    async fn transition(
        &self,
        action: &'static str,
        from: WorkerState,
        to: WorkerState,
    ) -> Result<(), WorkerError> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(WorkerError::Lifecycle {
                action,
                state: *state,
            });
        }
        debug!(from = %from, to = %to, "Worker state change");
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        let mut state = self.state.write().await;
        debug!(from = %*state, to = %to, "Worker state change");
        *state = to;
    }

    async fn open(&self, name: &str) -> Result<Namespace, StoreError> {
        Namespace::open(Arc::clone(&self.store), name).await
    }
}
