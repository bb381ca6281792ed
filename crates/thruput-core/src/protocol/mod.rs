//! Wire protocol primitives.
//!
//! The protocol is plain text framing over a TCP stream. Fields carry no
//! length prefix and no terminator; each side knows what to expect next from
//! the step it is in.
//!
//! ## Message Flow
//!
//! ```text
//! client                                   server
//!   │  "<DIRECTION>;<PAYLOADKIND>"           │
//!   │ ─────────────────────────────────────► │
//!   │                              0x01      │
//!   │ ◄───────────────────────────────────── │
//!   │  variant specific setup (chunk size,   │
//!   │  file header, ready bytes)             │
//!   │ ◄────────────────────────────────────► │
//!   │  raw payload, chunked                  │
//!   │ ◄────────────────────────────────────► │
//! ```
//!
//! - Ready signal: a single byte, `0x01` means proceed
//! - File header: `"<filename>;<filesize>"`, at most 1024 bytes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Value of the ready signal byte.
pub const READY_SIGNAL: u8 = 1;

/// Maximum size of the file header sent by the server.
pub const HEADER_BUFFER_SIZE: usize = 1024;

/// Field separator used in every text message.
pub const FIELD_SEPARATOR: char = ';';

/// Which side of the connection sends the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// This client sends payload bytes to the server
    Upload,
    /// This client receives payload bytes from the server
    Download,
}

impl Direction {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "UPLOAD",
            Self::Download => "DOWNLOAD",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPLOAD" => Ok(Self::Upload),
            "DOWNLOAD" => Ok(Self::Download),
            other => Err(Error::InvalidInput(format!(
                "unknown direction '{other}', expected UPLOAD or DOWNLOAD"
            ))),
        }
    }
}

/// What kind of payload is exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// Synthetic bytes, used for timing only
    Dummy,
    /// Content of a real file
    File,
}

impl PayloadKind {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dummy => "DUMMY",
            Self::File => "FILE",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DUMMY" => Ok(Self::Dummy),
            "FILE" => Ok(Self::File),
            other => Err(Error::InvalidInput(format!(
                "unknown payload kind '{other}', expected DUMMY or FILE"
            ))),
        }
    }
}

/// Build the opening handshake message.
#[must_use]
pub fn handshake_message(direction: Direction, kind: PayloadKind) -> String {
    format!("{direction}{FIELD_SEPARATOR}{kind}")
}

/// Build the setup message of a file upload.
#[must_use]
pub fn upload_announcement(chunk_size: usize, file_name: &str) -> String {
    format!("{chunk_size}{FIELD_SEPARATOR}{file_name}")
}

/// File metadata announced by the server before a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// File name as reported by the server
    pub name: String,
    /// File size in bytes
    pub size: u64,
}

impl FileHeader {
    /// Parse a `"<filename>;<filesize>"` header.
    ///
    /// The text is split on the first separator, so the size part must be a
    /// plain decimal number.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHeader` if the separator is missing, the name is
    /// empty or the size is not a number.
    pub fn parse(text: &str) -> Result<Self> {
        let (name, size) = text.split_once(FIELD_SEPARATOR).ok_or_else(|| {
            Error::InvalidHeader(format!("missing '{FIELD_SEPARATOR}' in '{text}'"))
        })?;

        if name.is_empty() {
            return Err(Error::InvalidHeader("empty file name".to_string()));
        }

        let size = size
            .trim()
            .parse()
            .map_err(|_| Error::InvalidHeader(format!("invalid file size '{size}'")))?;

        Ok(Self {
            name: name.to_string(),
            size,
        })
    }
}

/// Exact chunk arithmetic for a payload of known size.
///
/// A payload of `total` bytes is moved as `full_chunks` chunks of
/// `chunk_size` bytes followed by one partial chunk of `remainder` bytes when
/// `remainder` is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Bytes per full chunk
    pub chunk_size: usize,
    /// Total payload size
    pub total: u64,
    /// Number of full chunks
    pub full_chunks: u64,
    /// Size of the trailing partial chunk (0 if none)
    pub remainder: usize,
}

impl ChunkPlan {
    /// Create a plan for `total` bytes in chunks of `chunk_size`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `chunk_size` is zero.
    pub fn new(total: u64, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }

        let chunk = chunk_size as u64;
        #[allow(clippy::cast_possible_truncation)]
        let remainder = (total % chunk) as usize;

        Ok(Self {
            chunk_size,
            total,
            full_chunks: total / chunk,
            remainder,
        })
    }

    /// Number of read/write calls needed, partial chunk included.
    #[must_use]
    pub const fn chunk_count(&self) -> u64 {
        self.full_chunks + if self.remainder > 0 { 1 } else { 0 }
    }

    /// Completion percentage after `done` bytes.
    #[must_use]
    pub fn percent(&self, done: u64) -> f64 {
        percent(done, self.total)
    }
}

/// Completion percentage of `done` out of `total` bytes.
///
/// An empty payload counts as complete.
#[must_use]
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

/// Write a text message and flush it.
///
/// # Errors
///
/// Returns an error if writing fails.
pub async fn write_text<W>(writer: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Send the ready signal.
///
/// # Errors
///
/// Returns an error if writing fails.
pub async fn write_ready<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[READY_SIGNAL]).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one byte and require it to be the ready signal.
///
/// # Errors
///
/// Returns `Error::ServerNotReady` if the byte differs from [`READY_SIGNAL`]
/// or the stream ended, and `Error::Io` if reading fails.
pub async fn read_ready<R>(reader: &mut R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut signal = [0u8; 1];
    let n = reader.read(&mut signal).await?;

    match (n, signal[0]) {
        (0, _) => Err(Error::ServerNotReady { received: None }),
        (_, READY_SIGNAL) => Ok(()),
        (_, other) => Err(Error::ServerNotReady {
            received: Some(other),
        }),
    }
}

/// Read the file header sent by the server.
///
/// The header is taken from a single read of at most
/// [`HEADER_BUFFER_SIZE`] bytes, with no length prefix or terminator to frame
/// it. The server sends nothing else before the ready signal, so one read
/// normally holds the whole header, but this is best effort: a header split
/// across TCP segments is rejected as `Error::InvalidHeader`.
///
/// # Errors
///
/// Returns `Error::InvalidHeader` if the stream ended or the text is
/// malformed.
pub async fn read_file_header<R>(reader: &mut R) -> Result<FileHeader>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = [0u8; HEADER_BUFFER_SIZE];
    let n = reader.read(&mut buffer).await?;
    if n == 0 {
        return Err(Error::InvalidHeader(
            "connection closed before file header".to_string(),
        ));
    }

    let text = std::str::from_utf8(&buffer[..n])
        .map_err(|e| Error::InvalidHeader(format!("header is not UTF-8: {e}")))?;

    FileHeader::parse(text)
}

/// Fill `buffer` completely from `reader`.
///
/// `received` is the number of payload bytes read before this call and
/// `expected` the announced payload size; both only feed the error.
///
/// # Errors
///
/// Returns `Error::Truncated` if the stream ends before the buffer is full.
pub async fn read_chunk<R>(
    reader: &mut R,
    buffer: &mut [u8],
    received: u64,
    expected: u64,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..]).await?;
        if n == 0 {
            return Err(Error::Truncated {
                expected,
                received: received + filled as u64,
            });
        }
        filled += n;
    }
    Ok(())
}
