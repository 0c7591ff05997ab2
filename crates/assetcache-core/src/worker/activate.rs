use tracing::{debug, error, info, warn};

use super::{CacheWorker, WorkerError, WorkerState};
use crate::manifest::Manifest;
use crate::store::{CachedEntry, Namespace, StoreError};

/// Sentinel key of the single record in the manifest namespace.
pub const MANIFEST_KEY: &str = "manifest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No previous manifest: content was rebuilt from temp.
    FirstInstall { copied: usize },
    /// Previous manifest found: unchanged entries kept, the rest evicted,
    /// then the core set copied over from temp.
    Upgraded {
        retained: usize,
        evicted: usize,
        refreshed: usize,
    },
    /// Reconciliation failed and every namespace was dropped.
    Reset { reason: String },
}

impl CacheWorker {
    /// Activate an installed worker.
    ///
    /// Reconciliation errors never escape: they trigger a full reset and
    /// come back as `ActivationOutcome::Reset`. Only calling this outside
    /// the `Installed` state is an error.
    pub async fn activate(&self) -> Result<ActivationOutcome, WorkerError> {
        self.transition("activate", WorkerState::Installed, WorkerState::Activating)
            .await?;
        Ok(self.run_activation().await)
    }

    /// Activate now if installed; used by skip-waiting paths that may race.
    pub(crate) async fn activate_if_waiting(&self) -> Option<ActivationOutcome> {
        match self.activate().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                debug!(error = %e, "Worker not waiting, skipping activation");
                None
            }
        }
    }

    async fn run_activation(&self) -> ActivationOutcome {
        let outcome = match self.reconcile().await {
            Ok(outcome) => {
                info!(outcome = ?outcome, "Activation complete");
                outcome
            }
            Err(e) => {
                error!(error = %e, "Failed to upgrade cache, resetting all namespaces");
                self.reset_all().await;
                ActivationOutcome::Reset {
                    reason: e.to_string(),
                }
            }
        };
        self.set_state(WorkerState::Activated).await;
        outcome
    }

    async fn reconcile(&self) -> Result<ActivationOutcome, WorkerError> {
        let names = &self.config.cache_names;
        let content = self.open(&names.content).await?;
        let temp = self.open(&names.temp).await?;
        let manifest_store = self.open(&names.manifest).await?;

        let Some(record) = manifest_store.get(MANIFEST_KEY).await? else {
            self.store.drop_namespace(&names.content).await?;
            let content = self.open(&names.content).await?;
            let copied = copy_entries(&temp, &content).await?;
            self.store.drop_namespace(&names.temp).await?;
            self.persist_manifest(&manifest_store).await?;
            return Ok(ActivationOutcome::FirstInstall { copied });
        };

        let previous = Manifest::from_json(&record.body)?;
        let current = &self.deployment.resources;

        let mut retained = 0;
        let mut evicted = 0;
        for key in content.keys().await? {
            if current.is_unchanged(&previous, &key) {
                retained += 1;
            } else {
                debug!(key = %key, "Evicting stale resource");
                content.delete(&key).await?;
                evicted += 1;
            }
        }

        let refreshed = copy_entries(&temp, &content).await?;
        self.store.drop_namespace(&names.temp).await?;
        self.persist_manifest(&manifest_store).await?;

        Ok(ActivationOutcome::Upgraded {
            retained,
            evicted,
            refreshed,
        })
    }

    async fn persist_manifest(&self, manifest_store: &Namespace) -> Result<(), WorkerError> {
        let mut record = CachedEntry::new(MANIFEST_KEY, self.deployment.resources.to_json()?);
        record.content_type = Some("application/json".to_string());
        manifest_store.put(MANIFEST_KEY, record).await?;
        Ok(())
    }

    /// Drop the content, temp and manifest namespaces.
    ///
    /// Idempotent. A failure on one namespace is logged and the others are
    /// still attempted.
    pub async fn reset_all(&self) {
        for name in self.config.cache_names.all() {
            match self.store.drop_namespace(name).await {
                Ok(existed) => debug!(namespace = name, existed = existed, "Dropped namespace"),
                Err(e) => warn!(namespace = name, error = %e, "Failed to drop namespace during reset"),
            }
        }
    }
}

async fn copy_entries(from: &Namespace, to: &Namespace) -> Result<usize, StoreError> {
    let mut copied = 0;
    for key in from.keys().await? {
        if let Some(entry) = from.get(&key).await? {
            to.put(&key, entry).await?;
            copied += 1;
        }
    }
    Ok(copied)
}
