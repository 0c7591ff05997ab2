use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{ActivationOutcome, CacheWorker, WorkerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Activate a waiting worker immediately.
    SkipWaiting,
    /// Run the offline pre-fetcher.
    DownloadOffline,
}

impl ControlMessage {
    /// Parse a wire message. Anything unrecognized is `None`.
    pub fn parse(message: &str) -> Option<Self> {
        match message {
            "skipWaiting" => Some(ControlMessage::SkipWaiting),
            "downloadOffline" => Some(ControlMessage::DownloadOffline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMessage::SkipWaiting => "skipWaiting",
            ControlMessage::DownloadOffline => "downloadOffline",
        }
    }
}

impl CacheWorker {
    /// Request activation without waiting for the host.
    ///
    /// Activates right away if the worker is installed; otherwise the
    /// request is remembered and applied as soon as install finishes.
    pub async fn skip_waiting(&self) -> Option<ActivationOutcome> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.activate_if_waiting().await
    }

    /// Handle one control message. Unrecognized messages are ignored.
    pub async fn handle_message(&self, message: &str) -> Result<(), WorkerError> {
        match ControlMessage::parse(message) {
            Some(ControlMessage::SkipWaiting) => {
                if let Some(outcome) = self.skip_waiting().await {
                    info!(outcome = ?outcome, "Activated on skipWaiting");
                }
            }
            Some(ControlMessage::DownloadOffline) => {
                let report = self.download_offline().await?;
                info!(
                    requested = report.requested,
                    stored = report.stored,
                    "Offline download complete"
                );
            }
            None => debug!(message = message, "Ignoring unrecognized control message"),
        }
        Ok(())
    }
}

/// Feed messages from `rx` to `worker` until every sender is dropped.
/// Handler failures are logged; the loop keeps running.
pub fn spawn_control_loop(
    worker: Arc<CacheWorker>,
    mut rx: mpsc::Receiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = worker.handle_message(&message).await {
                error!(message = %message, error = %e, "Control message failed");
            }
        }
        debug!("Control channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_messages() {
        assert_eq!(ControlMessage::parse("skipWaiting"), Some(ControlMessage::SkipWaiting));
        assert_eq!(
            ControlMessage::parse("downloadOffline"),
            Some(ControlMessage::DownloadOffline)
        );
        assert_eq!(ControlMessage::parse("SKIPWAITING"), None);
        assert_eq!(ControlMessage::parse(""), None);
    }

    #[test]
    fn test_as_str_matches_wire_names() {
        for message in [ControlMessage::SkipWaiting, ControlMessage::DownloadOffline] {
            assert_eq!(ControlMessage::parse(message.as_str()), Some(message));
        }
    }
}
