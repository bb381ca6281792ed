//! Transfer engine for Thruput.
//!
//! This module owns the client side of a transfer:
//!
//! - Connecting to the server and performing the handshake
//! - Dispatching to the dummy or file engine
//! - Tearing the connection down on every exit path
//! - Cancellation from another task
//!
//! ## Session Lifecycle
//!
//! ```text
//! Connected -> HandshakeSent -> ReadyConfirmed -> Transferring -> Complete
//!                    |                                 |
//!                    +------------> Failed <-----------+
//! ```
//!
//! `Complete` and `Failed` both end with the socket being shut down.

mod dummy;
mod file;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::connection::{self, ConnectOptions, Endpoint};
use crate::error::{Error, Result};
use crate::progress::{ProgressObserver, ProgressReporter};
use crate::protocol::{self, ChunkPlan, Direction, PayloadKind};
use crate::units;

/// Byte source of a file upload.
pub type FileSource = Box<dyn AsyncRead + Send + Unpin>;

/// State of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket established
    Connected,
    /// Handshake written, waiting for the ready signal
    HandshakeSent,
    /// Server accepted the transfer
    ReadyConfirmed,
    /// Payload bytes are moving
    Transferring,
    /// Transfer finished successfully
    Complete,
    /// Transfer failed
    Failed,
}

/// Everything needed to run one transfer.
pub struct TransferRequest {
    /// Whether this client sends or receives the payload
    pub direction: Direction,
    /// Synthetic or file payload
    pub kind: PayloadKind,
    /// Server address
    pub endpoint: Endpoint,
    /// Bytes per read/write call
    pub chunk_size: usize,
    /// Payload size for dummy transfers and file uploads
    pub total_size: u64,
    /// File name announced on upload
    pub file_name: Option<String>,
    /// File content on upload
    pub source: Option<FileSource>,
    /// Destination directory on download
    pub output_dir: Option<PathBuf>,
}

impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("direction", &self.direction)
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("chunk_size", &self.chunk_size)
            .field("total_size", &self.total_size)
            .field("file_name", &self.file_name)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl TransferRequest {
    /// A transfer of `total_size` synthetic bytes.
    #[must_use]
    pub fn dummy(
        direction: Direction,
        endpoint: Endpoint,
        chunk_size: usize,
        total_size: u64,
    ) -> Self {
        Self {
            direction,
            kind: PayloadKind::Dummy,
            endpoint,
            chunk_size,
            total_size,
            file_name: None,
            source: None,
            output_dir: None,
        }
    }

    /// Upload `total_size` bytes read from `source` under `file_name`.
    #[must_use]
    pub fn upload(
        endpoint: Endpoint,
        chunk_size: usize,
        file_name: impl Into<String>,
        total_size: u64,
        source: FileSource,
    ) -> Self {
        Self {
            direction: Direction::Upload,
            kind: PayloadKind::File,
            endpoint,
            chunk_size,
            total_size,
            file_name: Some(file_name.into()),
            source: Some(source),
            output_dir: None,
        }
    }

    /// Upload the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `path` has no file name or is not a
    /// regular file, and `Error::Io` if it cannot be opened.
    pub async fn upload_path(endpoint: Endpoint, chunk_size: usize, path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::InvalidInput(format!("'{}' is not a file", path.display())))?;

        let file = tokio::fs::File::open(path).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a regular file",
                path.display()
            )));
        }
        let size = metadata.len();

        Ok(Self::upload(
            endpoint,
            chunk_size,
            file_name,
            size,
            Box::new(file),
        ))
    }

    /// Download the file offered by the server into `output_dir`.
    #[must_use]
    pub fn download(endpoint: Endpoint, chunk_size: usize, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            direction: Direction::Download,
            kind: PayloadKind::File,
            endpoint,
            chunk_size,
            total_size: 0,
            file_name: None,
            source: None,
            output_dir: Some(output_dir.into()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidInput(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }
        if let Some(name) = &self.file_name {
            if name.is_empty() {
                return Err(Error::InvalidInput("file name must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Outcome of a successful transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferResult {
    /// Payload bytes moved
    pub bytes: u64,
    /// Wall-clock time spent moving the payload
    pub elapsed: Duration,
    /// Path of the written file (file downloads only)
    pub path: Option<PathBuf>,
    /// Name of the received file (file downloads only)
    pub file_name: Option<String>,
}

impl TransferResult {
    /// A result carrying timing only.
    #[must_use]
    pub fn timed(elapsed: Duration) -> Self {
        Self {
            elapsed,
            ..Self::default()
        }
    }

    /// A result for `bytes` moved in `elapsed`.
    #[must_use]
    pub fn completed(bytes: u64, elapsed: Duration) -> Self {
        Self {
            bytes,
            elapsed,
            ..Self::default()
        }
    }

    /// Average throughput in bytes per second, if any time elapsed.
    #[must_use]
    pub fn bytes_per_second(&self) -> Option<u64> {
        units::bytes_per_second(self.bytes, self.elapsed)
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

type ActiveSlot = Arc<Mutex<Option<CancellationToken>>>;

/// Client running one transfer at a time.
///
/// The client only remembers the cancellation token of the transfer in
/// flight; the connection itself lives inside the session created by
/// [`TransferClient::start`] and is closed before `start` returns.
#[derive(Debug, Default)]
pub struct TransferClient {
    options: ConnectOptions,
    active: ActiveSlot,
}

impl TransferClient {
    /// Create a client with default socket options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client with custom socket options.
    #[must_use]
    pub fn with_options(options: ConnectOptions) -> Self {
        Self {
            options,
            active: ActiveSlot::default(),
        }
    }

    /// Whether a connection is currently held.
    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Stop the transfer in flight, if any.
    ///
    /// Returns `true` if a transfer was signalled.
    pub fn stop(&self) -> bool {
        self.stop_handle().stop()
    }

    /// A handle that can stop this client's transfers from another task.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            active: Arc::clone(&self.active),
        }
    }

    /// Run one transfer.
    ///
    /// Connects to the endpoint, performs the handshake, runs the transfer
    /// matching the request's direction and payload kind, and closes the
    /// connection whatever the outcome.
    ///
    /// # Errors
    ///
    /// - `Error::Connect` if the server cannot be reached
    /// - `Error::ServerNotReady` if the server refuses any handshake step
    /// - `Error::Cancelled` if [`TransferClient::stop`] was called
    /// - `Error::Truncated` / `Error::InvalidHeader` on protocol violations
    /// - `Error::Io` on any other socket or file failure
    pub async fn start(
        &self,
        request: TransferRequest,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<TransferResult> {
        request.validate()?;
        if self.is_running() {
            return Err(already_running());
        }

        let stream = connection::connect(&request.endpoint, &self.options).await?;

        let token = CancellationToken::new();
        let _guard = ActiveGuard::register(&self.active, token.clone())?;

        let mut session = Session::new(stream);
        let outcome = tokio::select! {
            result = session.run(request, observer) => result,
            () = token.cancelled() => {
                tracing::info!("Transfer cancelled");
                Err(Error::Cancelled)
            }
        };

        if outcome.is_err() {
            session.set_state(SessionState::Failed);
        }
        session.close().await;

        outcome
    }
}

/// Cancels the transfer of a [`TransferClient`] from anywhere.
#[derive(Debug, Clone)]
pub struct StopHandle {
    active: ActiveSlot,
}

impl StopHandle {
    /// Signal the transfer in flight to stop.
    ///
    /// Does nothing when the client is idle. Returns `true` if a transfer was
    /// signalled.
    pub fn stop(&self) -> bool {
        let active = lock(&self.active);
        let Some(token) = active.as_ref() else {
            return false;
        };
        tracing::debug!("Stop requested for running transfer");
        token.cancel();
        true
    }
}

fn lock(slot: &ActiveSlot) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn already_running() -> Error {
    Error::InvalidInput("a transfer is already running on this client".to_string())
}

/// Marks the client as running for as long as it lives.
struct ActiveGuard<'a> {
    slot: &'a ActiveSlot,
}

impl<'a> ActiveGuard<'a> {
    fn register(slot: &'a ActiveSlot, token: CancellationToken) -> Result<Self> {
        let mut active = lock(slot);
        if active.is_some() {
            return Err(already_running());
        }
        *active = Some(token);
        Ok(Self { slot })
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        lock(self.slot).take();
    }
}

/// One connection and the transfer running over it.
pub(crate) struct Session<S> {
    stream: S,
    state: SessionState,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            state: SessionState::Connected,
        }
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!("Session state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Handshake, then hand over to the engine matching the request.
    pub(crate) async fn run(
        &mut self,
        request: TransferRequest,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<TransferResult> {
        let handshake = protocol::handshake_message(request.direction, request.kind);
        protocol::write_text(&mut self.stream, &handshake).await?;
        self.set_state(SessionState::HandshakeSent);

        protocol::read_ready(&mut self.stream).await?;
        self.set_state(SessionState::ReadyConfirmed);
        tracing::debug!("Server accepted {}", handshake);

        let mut reporter = ProgressReporter::new(observer);

        let result = match (request.kind, request.direction) {
            (PayloadKind::Dummy, Direction::Download) => {
                let plan = ChunkPlan::new(request.total_size, request.chunk_size)?;
                self.receive_dummy(plan, &mut reporter).await?
            }
            (PayloadKind::Dummy, Direction::Upload) => {
                let plan = ChunkPlan::new(request.total_size, request.chunk_size)?;
                self.send_dummy(plan, &mut reporter).await?
            }
            (PayloadKind::File, Direction::Download) => match request.output_dir {
                Some(dir) => {
                    self.receive_file(request.chunk_size, &dir, &mut reporter)
                        .await?
                }
                None => return Ok(Self::skipped()),
            },
            (PayloadKind::File, Direction::Upload) => match (request.file_name, request.source) {
                (Some(name), Some(source)) => {
                    self.send_file(
                        request.chunk_size,
                        &name,
                        request.total_size,
                        source,
                        &mut reporter,
                    )
                    .await?
                }
                _ => return Ok(Self::skipped()),
            },
        };

        self.set_state(SessionState::Complete);
        tracing::debug!(
            "Transfer finished in {} ms after {} progress updates",
            result.elapsed_ms(),
            reporter.updates()
        );
        Ok(result)
    }

    fn skipped() -> TransferResult {
        tracing::warn!("File transfer requested without file parameters, nothing to do");
        TransferResult::timed(Duration::ZERO)
    }

    /// Shut the stream down. Failures are logged, never returned.
    pub(crate) async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::warn!("Failed to close connection: {}", e);
        }
        tracing::debug!("Connection closed in state {:?}", self.state);
    }
}
