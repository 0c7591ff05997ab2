//! Command implementations.
//!
//! Each invocation builds a fresh worker over the on-disk store. The last
//! deployed manifest is saved next to the namespaces so later commands
//! (`get`, `prefetch`, `status`) run against the same deployment.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use assetcache_core::{
    ActivationOutcome, CacheWorker, Config, ControlMessage, CoreSet, Deployment, FetchRequest,
    Fetcher, FsStore, HttpFetcher, Intercept, Manifest, PrefetchReport, Request,
};
use tracing::{debug, info};
use url::Url;

/// The deployment that was last installed, stored in the cache root.
const DEPLOYMENT_FILE: &str = "deployment.json";

fn build_worker(config: &Config, deployment: Deployment) -> Result<CacheWorker> {
    let worker_config = config.worker_config()?;
    let cache_dir = config.cache_dir()?;
    debug!(cache_dir = %cache_dir.display(), "Opening filesystem store");

    let store = FsStore::new(cache_dir)
        .context("Failed to open cache directory")?;
    let fetcher = HttpFetcher::with_timeout(config.request_timeout())
        .context("Failed to build HTTP client")?;

    Ok(CacheWorker::new(
        worker_config,
        deployment,
        Arc::new(store),
        Arc::new(fetcher),
    ))
}

fn saved_deployment(config: &Config) -> Result<Option<Deployment>> {
    let path = config.cache_dir()?.join(DEPLOYMENT_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let deployment = Deployment::load(&path)
        .with_context(|| format!("Failed to load saved deployment: {}", path.display()))?;
    Ok(Some(deployment))
}

fn require_deployment(config: &Config) -> Result<Deployment> {
    saved_deployment(config)?
        .context("No deployment found. Run `assetcache deploy <deployment.json>` first.")
}

fn save_deployment(config: &Config, deployment: &Deployment) -> Result<()> {
    let dir = config.cache_dir()?;
    std::fs::create_dir_all(&dir)?;
    let contents = serde_json::to_string_pretty(deployment)?;
    std::fs::write(dir.join(DEPLOYMENT_FILE), contents)?;
    Ok(())
}

fn describe(outcome: &ActivationOutcome) -> String {
    match outcome {
        ActivationOutcome::FirstInstall { copied } => {
            format!("First install: {} core resources cached", copied)
        }
        ActivationOutcome::Upgraded {
            retained,
            evicted,
            refreshed,
        } => format!(
            "Upgraded: {} retained, {} evicted, {} core resources refreshed",
            retained, evicted, refreshed
        ),
        ActivationOutcome::Reset { reason } => {
            format!("Cache was reset after a failed activation: {}", reason)
        }
    }
}

pub async fn deploy(config: &Config, path: &Path) -> Result<()> {
    let deployment = Deployment::load(path)
        .with_context(|| format!("Failed to load deployment: {}", path.display()))?;
    let resources = deployment.resources.len();
    let worker = build_worker(config, deployment.clone())?;

    let outcome = match worker.install().await? {
        Some(outcome) => outcome,
        // Nothing else in this process is holding the old deployment open.
        None => worker.activate().await?,
    };

    save_deployment(config, &deployment)?;
    info!(resources = resources, outcome = ?outcome, "Deployment activated");
    println!("{}", describe(&outcome));
    Ok(())
}

/// Resolve a CLI argument to a URL: absolute URLs as given, anything else
/// relative to the configured origin.
fn resolve_target(origin: &Url, target: &str) -> Result<Url> {
    match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => origin
            .join(target)
            .with_context(|| format!("Invalid resource path: {}", target)),
        Err(e) => Err(e).with_context(|| format!("Invalid URL: {}", target)),
    }
}

pub async fn get(config: &Config, target: &str) -> Result<()> {
    let worker = build_worker(config, require_deployment(config)?)?;
    let url = resolve_target(worker.origin(), target)?;

    let response = match worker.handle_fetch(&Request::get(url.clone())).await? {
        Intercept::Respond(response) => response,
        Intercept::Passthrough => {
            debug!(url = %url, "Not a manifest resource, fetching directly");
            let fetcher = HttpFetcher::with_timeout(config.request_timeout())?;
            fetcher.fetch(&FetchRequest::new(url)).await?
        }
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&response.body)?;
    stdout.flush()?;
    Ok(())
}

pub async fn prefetch(config: &Config) -> Result<()> {
    let worker = build_worker(config, require_deployment(config)?)?;
    let report = worker.download_offline().await?;
    println!("{}", prefetch_summary(&report));
    Ok(())
}

pub async fn status(config: &Config) -> Result<()> {
    let Some(deployment) = saved_deployment(config)? else {
        println!("No deployment found");
        return Ok(());
    };
    let worker = build_worker(config, deployment)?;
    let status = worker.status().await?;

    println!("{}", status);
    for path in &status.missing {
        println!("  missing: {}", path);
    }
    Ok(())
}

pub async fn reset(config: &Config) -> Result<()> {
    let deployment = match saved_deployment(config)? {
        Some(deployment) => deployment,
        None => Deployment::new(Manifest::new(), CoreSet::new(Vec::<&str>::new()))?,
    };
    let worker = build_worker(config, deployment)?;
    worker.reset_all().await;
    println!("Cache cleared");
    Ok(())
}

pub async fn message(config: &Config, text: &str) -> Result<()> {
    let Some(message) = ControlMessage::parse(text) else {
        println!("Unrecognized message ignored: {}", text);
        return Ok(());
    };
    let worker = build_worker(config, require_deployment(config)?)?;

    match message {
        ControlMessage::SkipWaiting => {
            let outcome = worker.skip_waiting().await;
            println!("{}", skip_waiting_summary(outcome.as_ref()));
        }
        ControlMessage::DownloadOffline => {
            let report = worker.download_offline().await?;
            println!("{}", prefetch_summary(&report));
        }
    }
    Ok(())
}

/// `deploy` activates before it returns, so a fresh worker normally has
/// nothing waiting.
fn skip_waiting_summary(outcome: Option<&ActivationOutcome>) -> String {
    match outcome {
        Some(outcome) => describe(outcome),
        None => "No installed deployment is waiting to activate".to_string(),
    }
}

fn prefetch_summary(report: &PrefetchReport) -> String {
    if report.requested == 0 {
        "All resources already cached".to_string()
    } else {
        format!("Downloaded {} of {} missing resources", report.stored, report.requested)
    }
}
