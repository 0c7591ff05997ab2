//! assetcache - keep an offline copy of a web application's static assets.
//!
//! Deploys a manifest into a local filesystem cache, serves assets from it
//! the way a browser-side asset cache would, and reports how much of the
//! application is available offline.

mod commands;

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use assetcache_core::Config;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: assetcache <command> [args]

Commands:
  deploy <deployment.json>   Install the core set and activate the deployment
  get <path-or-url>          Fetch a resource through the cache (body to stdout)
  prefetch                   Download every resource for offline use
  status                     Show cache state
  reset                      Drop every cache namespace
  message <text>             Send a control message (skipWaiting, downloadOffline)

Environment:
  ASSETCACHE_ORIGIN, ASSETCACHE_CACHE_DIR, ASSETCACHE_LOG_FILE, RUST_LOG";

/// Initialize the tracing subscriber for logging.
///
/// Stderr always; additionally a log file when configured. The returned
/// guard must live until exit so buffered file output is flushed.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("assetcache.log"));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn required_arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("Missing argument: <{}>\n\n{}", name, USAGE))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _guard = init_tracing(config.log_file.as_deref());

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    info!(command = %command, origin = %config.origin, "assetcache starting");

    match command.as_str() {
        "deploy" => {
            let path = PathBuf::from(required_arg(&args, 2, "deployment.json")?);
            commands::deploy(&config, &path).await
        }
        "get" => commands::get(&config, required_arg(&args, 2, "path-or-url")?).await,
        "prefetch" => commands::prefetch(&config).await,
        "status" => commands::status(&config).await,
        "reset" => commands::reset(&config).await,
        "message" => commands::message(&config, required_arg(&args, 2, "text")?).await,
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => anyhow::bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}
