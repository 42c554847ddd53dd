//! Serial link manager.
//!
//! This module provides the [`DeviceManager`], the single owner of the link
//! to the fingerprint controller. It opens the port, runs the background
//! reader, forwards command tokens and exposes the last status.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!  send_command ────►│  link slot (Mutex<Option>)  │◄──── reader task
//!                    └──────────────┬──────────────┘
//!                                   │
//!                            ┌──────▼──────┐
//!  last_status  ◄────────────│ StatusStore │◄──── reader / sender failures
//!                            └─────────────┘
//! ```
//!
//! The link lives in one mutex-guarded slot. Whoever hits a transport error
//! first (reader or sender) takes the link out of the slot and closes it, so
//! exactly one party performs the teardown and every later operation sees
//! "not connected" immediately.
//!
//! # Lifecycle
//!
//! 1. Create the manager with a [`LinkConfig`]
//! 2. Call [`initialize`](DeviceManager::initialize) with the resolved port
//! 3. Send commands and query the status from any task
//! 4. Call [`shutdown`](DeviceManager::shutdown) once at process exit
//!
//! # Examples
//!
//! ```no_run
//! use printgate_serial::manager::{DeviceManager, LinkConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = DeviceManager::new(LinkConfig::default());
//!
//!     if let Err(e) = manager.initialize("/dev/ttyACM0") {
//!         eprintln!("running without device: {e}");
//!     }
//!
//!     let _ = manager.verify().await;
//!     println!("status: {}", manager.last_status());
//!
//!     manager.shutdown().await;
//! }
//! ```

use bytes::BytesMut;
use printgate_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_ERROR_BACKOFF_MS, DEFAULT_IO_TIMEOUT_MS, DEFAULT_MAX_LINE_LENGTH,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS, STATUS_CONNECT_FAILED,
    STATUS_NOT_CONNECTED,
};
use printgate_core::{Command, EnrollId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::codec::Encoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::LineCodec;
use crate::error::{EnrollError, LinkError, Result};
use crate::links::AnyTransport;
use crate::reader::{ReaderConfig, ReaderTask};
use crate::serial::SerialLink;
use crate::status::{StatusFile, StatusStore};
use crate::transport::{LinkInfo, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connection state of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// No link is open.
    Disconnected,

    /// Link open and reader running.
    Connected,

    /// A link existed and was torn down after a transport error.
    Failed,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Configuration of the serial link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Baud rate used when opening the port.
    pub baud_rate: u32,

    /// Reader sleep between polls while the link is idle.
    pub poll_interval: Duration,

    /// Reader sleep after a transient read anomaly.
    pub error_backoff: Duration,

    /// Port read/write timeout.
    pub io_timeout: Duration,

    /// Maximum time shutdown waits for the reader.
    pub shutdown_timeout: Duration,

    /// Longest accepted status line in bytes.
    pub max_line_length: usize,

    /// Optional on-disk mirror of the last status.
    pub status_file: Option<PathBuf>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            error_backoff: Duration::from_millis(DEFAULT_ERROR_BACKOFF_MS),
            io_timeout: Duration::from_millis(DEFAULT_IO_TIMEOUT_MS),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            status_file: None,
        }
    }
}

impl LinkConfig {
    fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            poll_interval: self.poll_interval,
            error_backoff: self.error_backoff,
            max_line_length: self.max_line_length,
        }
    }
}

/// State shared between the manager and its reader task.
#[derive(Debug)]
pub(crate) struct LinkShared {
    /// The open link, if any.
    link: Mutex<Option<Arc<AnyTransport>>>,

    /// Reader is supposed to be running. Never true without a link.
    running: AtomicBool,

    /// Last link was torn down by a transport error.
    failed: AtomicBool,

    /// Last observed status.
    pub(crate) status: StatusStore,
}

impl LinkShared {
    pub(crate) fn new(status: StatusStore) -> Self {
        Self {
            link: Mutex::new(None),
            running: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            status,
        }
    }

    /// Make `link` the current link.
    pub(crate) fn install(&self, link: Arc<AnyTransport>) {
        *lock(&self.link) = Some(link);
        self.failed.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    pub(crate) fn current(&self) -> Option<Arc<AnyTransport>> {
        lock(&self.link).clone()
    }

    pub(crate) fn is_connected(&self) -> bool {
        lock(&self.link).is_some()
    }

    /// Whether `link` is still the current link.
    pub(crate) fn is_current(&self, link: &Arc<AnyTransport>) -> bool {
        lock(&self.link)
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, link))
    }

    /// Close `link` after a transport error.
    ///
    /// Returns `false` if `link` is no longer current, i.e. someone else
    /// already tore it down or a new link replaced it.
    pub(crate) fn tear_down(&self, link: &Arc<AnyTransport>) -> bool {
        let taken = {
            let mut slot = lock(&self.link);
            match slot.as_ref() {
                Some(current) if Arc::ptr_eq(current, link) => slot.take(),
                _ => None,
            }
        };

        let Some(taken) = taken else {
            return false;
        };

        self.running.store(false, Ordering::SeqCst);
        self.failed.store(true, Ordering::SeqCst);
        taken.close();
        true
    }

    /// Forget a previous teardown; the manager is plainly disconnected.
    pub(crate) fn clear_failure(&self) {
        self.failed.store(false, Ordering::SeqCst);
    }

    /// Remove and close the current link without marking it failed.
    fn release(&self) -> Option<LinkInfo> {
        let taken = lock(&self.link).take();
        self.running.store(false, Ordering::SeqCst);

        taken.map(|link| {
            link.close();
            link.info()
        })
    }

    fn state(&self) -> LinkState {
        if self.is_connected() && self.running.load(Ordering::SeqCst) {
            LinkState::Connected
        } else if self.failed.load(Ordering::SeqCst) {
            LinkState::Failed
        } else {
            LinkState::Disconnected
        }
    }
}

/// A running reader and the token that stops it.
#[derive(Debug)]
struct ReaderSession {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

/// Owner of the link to the fingerprint controller.
///
/// Construct one per process and share it (`Arc<DeviceManager>`) with
/// whatever serves requests. All methods take `&self`.
///
/// # Examples
///
/// ```
/// use printgate_serial::manager::{DeviceManager, LinkConfig, LinkState};
/// use printgate_serial::mock::MockTransport;
///
/// #[tokio::main]
/// async fn main() {
///     let manager = DeviceManager::new(LinkConfig::default());
///     let (transport, handle) = MockTransport::new();
///
///     manager.initialize_with(transport.into());
///     assert_eq!(manager.state(), LinkState::Connected);
///
///     manager.verify().await.unwrap();
///     assert_eq!(handle.written_tokens(), vec!["V".to_string()]);
///
///     manager.shutdown().await;
///     assert!(!manager.is_connected());
/// }
/// ```
#[derive(Debug)]
pub struct DeviceManager {
    shared: Arc<LinkShared>,

    /// Reader of the current (or last) link. Also serializes initialization.
    session: Mutex<Option<ReaderSession>>,

    /// Port requested by the last initialization.
    target: Mutex<Option<String>>,

    config: LinkConfig,
}

impl DeviceManager {
    /// Create a manager with no link. The last status holds the initial
    /// sentinel until something is published.
    pub fn new(config: LinkConfig) -> Self {
        let status = StatusStore::new(config.status_file.clone().map(StatusFile::new));

        Self {
            shared: Arc::new(LinkShared::new(status)),
            session: Mutex::new(None),
            target: Mutex::new(None),
            config,
        }
    }

    /// Open the serial port and start the background reader.
    ///
    /// Does nothing if a link is already open. On failure the manager stays
    /// usable in degraded mode: the last status reports the failure and
    /// every command is rejected as not connected. Calling this again after
    /// a failure is the explicit way to reconnect.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::OpenFailed`] if the port cannot be opened.
    pub fn initialize(&self, port: &str) -> Result<()> {
        let mut session = lock(&self.session);
        if self.shared.is_connected() {
            debug!(port, "Link already open, ignoring initialize");
            return Ok(());
        }

        *lock(&self.target) = Some(port.to_string());

        match SerialLink::open(port, self.config.baud_rate, self.config.io_timeout) {
            Ok(link) => {
                self.attach(&mut session, AnyTransport::Serial(link));
                Ok(())
            }
            Err(e) => {
                error!(
                    port,
                    error = %e,
                    "Could not open serial port, API will run without the device"
                );
                self.shared.clear_failure();
                self.shared.status.publish(STATUS_CONNECT_FAILED);
                Err(e)
            }
        }
    }

    /// Start the manager over an already-open transport.
    ///
    /// Does nothing (and drops `transport`) if a link is already open.
    /// Must be called from within a Tokio runtime.
    pub fn initialize_with(&self, transport: AnyTransport) {
        let mut session = lock(&self.session);
        if self.shared.is_connected() {
            debug!("Link already open, ignoring initialize");
            return;
        }

        *lock(&self.target) = Some(transport.info().port);
        self.attach(&mut session, transport);
    }

    fn attach(&self, session: &mut Option<ReaderSession>, transport: AnyTransport) {
        // A previous reader has already exited on its own teardown.
        if let Some(previous) = session.take() {
            previous.stop.cancel();
            previous.task.abort();
        }

        let link = Arc::new(transport);
        let info = link.info();
        self.shared.install(Arc::clone(&link));

        let stop = CancellationToken::new();
        let reader = ReaderTask::new(
            Arc::clone(&self.shared),
            link,
            self.config.reader_config(),
            stop.clone(),
        );
        let task = tokio::spawn(reader.run());

        *session = Some(ReaderSession { stop, task });
        info!("Connected to {}", info);
    }

    /// Send a raw command token, appending the line terminator.
    ///
    /// Returns a confirmation message once the bytes are written. No reply
    /// from the controller is awaited.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotConnected`] if no link is open
    /// - [`LinkError::Write`] if the write failed; the link is closed before
    ///   returning
    pub async fn send_command(&self, token: &str) -> Result<String> {
        let Some(link) = self.shared.current() else {
            warn!(token, "Command rejected, no serial link");
            self.shared.status.publish(STATUS_NOT_CONNECTED);
            return Err(LinkError::not_connected(self.target_port()));
        };

        let mut frame = BytesMut::new();
        LineCodec::new().encode(token, &mut frame)?;

        let writer = Arc::clone(&link);
        let result = tokio::task::spawn_blocking(move || writer.write_all(&frame))
            .await
            .map_err(|e| self.write_task_failed(token, &e))?;

        match result {
            Ok(()) => {
                debug!("HOST -> {}", token);
                Ok(format!("Command '{token}' sent."))
            }
            Err(e) => {
                error!(token, error = %e, "Serial write failed, closing link");
                if e.is_fatal() {
                    self.shared.tear_down(&link);
                }
                self.shared
                    .status
                    .publish(format!("SERIAL ERROR (write): {}", e.detail()));
                Err(e)
            }
        }
    }

    fn write_task_failed(&self, token: &str, e: &JoinError) -> LinkError {
        error!(token, error = %e, "Serial write task failed");
        let e = LinkError::other(format!("Unexpected error while sending: {e}"));
        self.shared
            .status
            .publish(format!("SERIAL ERROR (write): {}", e.detail()));
        e
    }

    /// Send a typed command.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command).
    pub async fn send(&self, command: Command) -> Result<String> {
        self.send_command(&command.token()).await
    }

    /// Switch the controller to verification mode.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command).
    pub async fn verify(&self) -> Result<String> {
        self.send(Command::Verify).await
    }

    /// Cancel the enrollment in progress.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command).
    pub async fn cancel(&self) -> Result<String> {
        self.send(Command::Cancel).await
    }

    /// Run the enroll sequence: select slot `id`, then enter enrollment mode.
    ///
    /// The second step is only attempted if the first one succeeded.
    ///
    /// # Errors
    ///
    /// [`EnrollError::SetId`] if selecting the slot failed,
    /// [`EnrollError::EnterEnroll`] if entering enrollment mode failed.
    pub async fn enroll(&self, id: EnrollId) -> std::result::Result<String, EnrollError> {
        self.send(Command::SetId(id))
            .await
            .map_err(EnrollError::SetId)?;

        self.send(Command::Enroll)
            .await
            .map_err(EnrollError::EnterEnroll)?;

        Ok(format!(
            "ID {id} set. Enrollment mode active. Follow the instructions on the device."
        ))
    }

    /// Copy of the last status. Never touches the hardware.
    pub fn last_status(&self) -> String {
        self.shared.status.last()
    }

    /// Whether a link is currently open.
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Current connection state.
    pub fn state(&self) -> LinkState {
        self.shared.state()
    }

    /// Identity of the open link, if any.
    pub fn link_info(&self) -> Option<LinkInfo> {
        self.shared.current().map(|link| link.info())
    }

    /// Status file mirror, if configured.
    pub fn status_file(&self) -> Option<&StatusFile> {
        self.shared.status.file()
    }

    /// Manager configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    fn target_port(&self) -> String {
        lock(&self.target)
            .clone()
            .unwrap_or_else(|| "<none>".to_string())
    }

    /// Stop the reader and release the link.
    ///
    /// Waits up to the configured shutdown timeout for the reader, aborting
    /// it past the deadline, then closes the port. Safe to call any number
    /// of times; calls after the first are no-ops. The last status remains
    /// readable afterwards.
    pub async fn shutdown(&self) {
        let session = lock(&self.session).take();

        if let Some(ReaderSession { stop, mut task }) = session {
            stop.cancel();

            match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Serial reader terminated abnormally"),
                Err(_) => {
                    warn!(
                        timeout_ms = self.config.shutdown_timeout.as_millis() as u64,
                        "Serial reader did not stop in time, aborting"
                    );
                    task.abort();
                }
            }
        }

        match self.shared.release() {
            Some(info) => info!("Serial connection closed ({})", info),
            None => debug!("Shutdown: no serial link open"),
        }
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        if let Some(session) = lock(&self.session).take() {
            session.stop.cancel();
            session.task.abort();
        }
        self.shared.release();
    }
}
