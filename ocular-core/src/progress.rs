// ocular-core/src/progress.rs

//! Best-effort progress reporting for long-running commands.
//!
//! The executor hands one [`ProgressUpdate`] per stdout line to an optional
//! [`ProgressSink`]. Sinks may fail; the executor logs the failure and carries on.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// One incremental progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    /// Number of output lines seen so far. Starts at 1 and only grows.
    pub progress: u64,
    /// Notional total (the caller's expected line count). Not a limit.
    pub total: Option<u32>,
    /// The trimmed text of the line that triggered this update.
    pub message: String,
}

/// Receiver of progress updates during command execution.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, update: ProgressUpdate) -> Result<()>;
}

/// Writes each update to the `tracing` debug stream.
#[derive(Debug, Clone)]
pub struct TracingProgress {
    service: String,
}

impl TracingProgress {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl ProgressSink for TracingProgress {
    async fn report(&self, update: ProgressUpdate) -> Result<()> {
        debug!(
            service = %self.service,
            progress = update.progress,
            total = ?update.total,
            "{}",
            update.message
        );
        Ok(())
    }
}

/// Forwards updates into an unbounded channel.
///
/// Reporting fails once the receiving half has been dropped.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new(sender: UnboundedSender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ProgressSink for ChannelProgress {
    async fn report(&self, update: ProgressUpdate) -> Result<()> {
        self.sender
            .send(update)
            .map_err(|e| anyhow!("progress receiver closed: {}", e))
    }
}
