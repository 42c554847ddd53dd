//! Background reader task.
//!
//! The reader drains whatever the controller has sent, frames it into lines
//! with [`LineCodec`] and publishes every non-empty line as the last status.
//!
//! ```text
//!  ┌──────────────┐  bytes   ┌───────────┐  lines   ┌─────────────┐
//!  │ Device Link  │────────► │ LineCodec │────────► │ StatusStore │
//!  └──────────────┘          └───────────┘          └─────────────┘
//!         ▲
//!         │ poll every `poll_interval` while idle
//! ```
//!
//! The loop runs until the stop token is cancelled or its link is no longer
//! the manager's current link. A transport read error tears the link down
//! and ends the loop; there is no automatic reconnect. Decode anomalies and
//! transient OS conditions are logged and the loop carries on.

use bytes::BytesMut;
use printgate_core::constants::READ_CHUNK_SIZE;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::LineCodec;
use crate::error::Result;
use crate::links::AnyTransport;
use crate::manager::LinkShared;
use crate::transport::Transport;

/// Timing and framing parameters of the reader loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReaderConfig {
    /// Sleep between polls when no bytes are pending.
    pub poll_interval: Duration,

    /// Sleep after a transient read anomaly.
    pub error_backoff: Duration,

    /// Longest accepted line.
    pub max_line_length: usize,
}

/// State of one reader loop, bound to one link.
pub(crate) struct ReaderTask {
    shared: Arc<LinkShared>,
    link: Arc<AnyTransport>,
    codec: LineCodec,
    buffer: BytesMut,
    config: ReaderConfig,
    stop: CancellationToken,
}

impl ReaderTask {
    pub(crate) fn new(
        shared: Arc<LinkShared>,
        link: Arc<AnyTransport>,
        config: ReaderConfig,
        stop: CancellationToken,
    ) -> Self {
        Self {
            shared,
            link,
            codec: LineCodec::with_max_line_length(config.max_line_length),
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            config,
            stop,
        }
    }

    /// Run until stopped or until the link fails.
    pub(crate) async fn run(mut self) {
        let info = self.link.info();
        info!(port = %info.port, "Serial reader started");

        while !self.stop.is_cancelled() && self.shared.is_current(&self.link) {
            match self.drain_available() {
                Ok(0) => self.pause(self.config.poll_interval).await,
                Ok(_) => tokio::task::yield_now().await,
                Err(e) if e.is_fatal() => {
                    error!(port = %info.port, error = %e, "Serial read failed, closing link");
                    if self.shared.tear_down(&self.link) {
                        self.shared
                            .status
                            .publish(format!("SERIAL ERROR: {}", e.detail()));
                    }
                    break;
                }
                Err(e) => {
                    warn!(port = %info.port, error = %e, "Unexpected error while reading");
                    self.pause(self.config.error_backoff).await;
                }
            }
        }

        info!(port = %info.port, "Serial reader stopped");
    }

    /// Read what is pending and publish every complete line.
    ///
    /// Returns the number of bytes read; zero means the link was idle.
    pub(crate) fn drain_available(&mut self) -> Result<usize> {
        let available = self.link.bytes_available()?;
        if available == 0 {
            return Ok(0);
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let want = available.min(chunk.len());
        let n = self.link.read(&mut chunk[..want])?;
        self.buffer.extend_from_slice(&chunk[..n]);

        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(line)) if line.is_empty() => {}
                Ok(Some(line)) => {
                    debug!("DEVICE -> {}", line);
                    self.shared.status.publish(line);
                }
                Ok(None) => break,
                Err(e) => warn!(error = %e, "Discarding malformed input"),
            }
        }

        Ok(n)
    }

    /// Sleep for `duration`, waking early on stop.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stop.cancelled() => {}
        }
    }
}
