use tracing::{debug, warn};

use super::{CacheWorker, WorkerError};
use crate::fetch::{FetchRequest, Response};
use crate::manifest::ROOT_PATH;
use crate::request::{normalize_path, Method, Request};
use crate::store::{CachedEntry, Namespace};

/// What the interceptor decided for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercept {
    /// Not a manifest resource; the caller should use the network directly.
    Passthrough,
    Respond(Response),
}

impl CacheWorker {
    /// Serve a request from the content namespace.
    ///
    /// Only GETs for manifest resources are handled. The root document is
    /// fetched online-first; every other resource is cache-first with a
    /// single network attempt on a miss. Network responses are copied into
    /// content before being returned.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Intercept, WorkerError> {
        if request.method != Method::Get {
            return Ok(Intercept::Passthrough);
        }

        let Some(key) = normalize_path(&self.config.origin, &request.url) else {
            return Ok(Intercept::Passthrough);
        };
        if !self.deployment.resources.contains(&key) {
            debug!(url = %request.url, "Not a manifest resource, passing through");
            return Ok(Intercept::Passthrough);
        }

        let content = self.open(&self.config.cache_names.content).await?;
        let response = if key == ROOT_PATH {
            self.online_first(&content, &key, request).await?
        } else {
            self.cache_first(&content, &key, request).await?
        };
        Ok(Intercept::Respond(response))
    }

    async fn online_first(
        &self,
        content: &Namespace,
        key: &str,
        request: &Request,
    ) -> Result<Response, WorkerError> {
        let fetch_error = match self.fetcher.fetch(&FetchRequest::new(request.url.clone())).await {
            Ok(response) => {
                store_copy(content, key, &response).await;
                return Ok(response);
            }
            Err(e) => e,
        };

        warn!(url = %request.url, error = %fetch_error, "Network unavailable, trying cache");
        match content.get(key).await {
            Ok(Some(entry)) => Ok(entry.into_response(request.url.clone())),
            Ok(None) => Err(fetch_error.into()),
            Err(e) => {
                warn!(key = key, error = %e, "Cache lookup failed after network failure");
                Err(fetch_error.into())
            }
        }
    }

    async fn cache_first(
        &self,
        content: &Namespace,
        key: &str,
        request: &Request,
    ) -> Result<Response, WorkerError> {
        if let Some(entry) = content.get(key).await? {
            debug!(key = key, "Cache hit");
            return Ok(entry.into_response(request.url.clone()));
        }

        let response = self
            .fetcher
            .fetch(&FetchRequest::new(request.url.clone()))
            .await?;
        store_copy(content, key, &response).await;
        Ok(response)
    }
}

/// Write a copy of a network response; a failed write does not fail the
/// request.
async fn store_copy(content: &Namespace, key: &str, response: &Response) {
    if let Err(e) = content.put(key, CachedEntry::from_response(response)).await {
        warn!(key = key, error = %e, "Failed to cache response");
    }
}
