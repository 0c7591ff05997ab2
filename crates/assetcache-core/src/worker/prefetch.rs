use std::collections::HashSet;
use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use super::{CacheWorker, WorkerError};
use crate::fetch::{FetchError, FetchRequest};
use crate::request::resource_url;
use crate::store::CachedEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Manifest resources that were missing from content.
    pub requested: usize,
    pub stored: usize,
}

impl CacheWorker {
    /// Download every manifest resource not yet in the content namespace.
    ///
    /// All-or-nothing: downloads run with bounded concurrency and nothing is
    /// stored unless every one of them succeeds. If a write fails, entries
    /// already written by this call are removed again.
    pub async fn download_offline(&self) -> Result<PrefetchReport, WorkerError> {
        let content = self.open(&self.config.cache_names.content).await?;
        let present: HashSet<String> = content.keys().await?.into_iter().collect();

        let requests = self
            .deployment
            .resources
            .paths()
            .filter(|path| !present.contains(*path))
            .map(|path| -> Result<_, FetchError> {
                let url = resource_url(&self.config.origin, path)?;
                Ok((path.to_string(), FetchRequest::new(url)))
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        if requests.is_empty() {
            debug!("All manifest resources already cached");
            return Ok(PrefetchReport::default());
        }

        let requested = requests.len();
        info!(resources = requested, "Downloading resources for offline use");

        let fetcher = Arc::clone(&self.fetcher);
        let fetched: Vec<_> = stream::iter(requests)
            .map(|(path, request)| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    let response = fetcher.fetch(&request).await?;
                    Ok::<_, FetchError>((path, response))
                }
            })
            .buffer_unordered(self.config.prefetch_concurrency.max(1))
            .try_collect()
            .await?;

        let mut written: Vec<&str> = Vec::with_capacity(fetched.len());
        for (path, response) in &fetched {
            if let Err(e) = content.put(path, CachedEntry::from_response(response)).await {
                warn!(
                    key = %path,
                    error = %e,
                    rollback = written.len(),
                    "Offline download failed to store, rolling back"
                );
                for key in written {
                    if let Err(e) = content.delete(key).await {
                        warn!(key = key, error = %e, "Failed to roll back offline download entry");
                    }
                }
                return Err(e.into());
            }
            written.push(path);
        }

        Ok(PrefetchReport {
            requested,
            stored: fetched.len(),
        })
    }
}
