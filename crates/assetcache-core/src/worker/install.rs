use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{error, info};

use super::{ActivationOutcome, CacheWorker, WorkerError, WorkerState};
use crate::fetch::{FetchError, FetchRequest};
use crate::request::revision_url;
use crate::store::CachedEntry;

impl CacheWorker {
    /// Download the core set into the temp namespace.
    ///
    /// Every core resource is requested from the network with a revision
    /// query and `CacheMode::Reload`. Nothing is written unless all of them
    /// arrive; a failure leaves the worker `Redundant`. When skip-waiting is
    /// set the worker activates immediately and the outcome is returned.
    pub async fn install(&self) -> Result<Option<ActivationOutcome>, WorkerError> {
        self.transition("install", WorkerState::Parsed, WorkerState::Installing)
            .await?;

        match self.populate_temp().await {
            Ok(staged) => {
                info!(resources = staged, "Install complete");
                self.set_state(WorkerState::Installed).await;
            }
            Err(e) => {
                error!(error = %e, "Install failed");
                self.set_state(WorkerState::Redundant).await;
                return Err(e);
            }
        }

        if self.skip_waiting_requested() {
            return Ok(self.activate_if_waiting().await);
        }
        Ok(None)
    }

    async fn populate_temp(&self) -> Result<usize, WorkerError> {
        // Leftovers from a worker that installed but never activated.
        self.store.drop_namespace(&self.config.cache_names.temp).await?;
        let temp = self.open(&self.config.cache_names.temp).await?;

        let requests = self
            .deployment
            .core_resources()
            .map(|(path, digest)| -> Result<_, FetchError> {
                let url = revision_url(&self.config.origin, path, digest)?;
                Ok((path.to_string(), FetchRequest::reload(url)))
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        let fetcher = Arc::clone(&self.fetcher);
        let fetched: Vec<_> = stream::iter(requests)
            .map(|(path, request)| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    match fetcher.fetch(&request).await {
                        Ok(response) => Ok((path, response)),
                        Err(source) => Err(WorkerError::Install { path, source }),
                    }
                }
            })
            .buffered(self.config.prefetch_concurrency.max(1))
            .try_collect()
            .await?;

        for (path, response) in &fetched {
            temp.put(path, CachedEntry::from_response(response)).await?;
        }
        Ok(fetched.len())
    }
}
