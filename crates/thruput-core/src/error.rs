//! Error types for Thruput.
//!
//! Every failure of a transfer is reported through [`Error`]. The variants
//! form a closed set so callers can branch on the cause directly, and
//! [`Error::kind`] collapses them into the coarse categories a UI usually
//! cares about.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Thruput operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Thruput.
#[derive(Error, Debug)]
pub enum Error {
    /// The connection to the server could not be established (E001)
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        /// Address that was dialed
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The server answered a handshake step with something other than the ready byte (E002)
    #[error("server is not ready (received {})", describe_signal(*.received))]
    ServerNotReady {
        /// Byte received instead of the ready signal, `None` on end-of-stream
        received: Option<u8>,
    },

    /// The peer closed the connection before the announced payload arrived (E003)
    #[error("transfer truncated: expected {expected} bytes, received {received}")]
    Truncated {
        /// Bytes announced for the transfer
        expected: u64,
        /// Bytes actually received
        received: u64,
    },

    /// The file header sent by the server could not be understood (E004)
    #[error("invalid file header: {0}")]
    InvalidHeader(String),

    /// The transfer was stopped by the caller
    #[error("transfer cancelled")]
    Cancelled,

    /// Invalid user input (endpoint, sizes, units)
    #[error("{0}")]
    InvalidInput(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error during the transfer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket could not be established
    Connection,
    /// Ready signal missing or wrong
    ServerNotReady,
    /// Read/write failure during the transfer
    Io,
    /// Stopped by the caller
    Cancelled,
    /// Peer violated the wire format
    Protocol,
    /// Bad input or configuration
    Config,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. } => ErrorKind::Connection,
            Self::ServerNotReady { .. } => ErrorKind::ServerNotReady,
            Self::Io(_) => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Truncated { .. } | Self::InvalidHeader(_) => ErrorKind::Protocol,
            Self::InvalidInput(_) | Self::ConfigError(_) | Self::InvalidConfig { .. } => {
                ErrorKind::Config
            }
        }
    }

    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::Connect { .. } => Some("E001"),
            Self::ServerNotReady { .. } => Some("E002"),
            Self::Truncated { .. } => Some("E003"),
            Self::InvalidHeader(_) => Some("E004"),
            _ => None,
        }
    }

    /// Returns whether starting the transfer again may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ServerNotReady { .. } | Self::Truncated { .. } | Self::Io(_)
        )
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Connect { .. } => Some(
                "Check that the server is running and reachable.\n\
                 The default port is 65432; pass --port or HOST:PORT to change it.",
            ),
            Self::ServerNotReady { .. } => {
                Some("The server refused the transfer. It may be busy with another client.")
            }
            _ => None,
        }
    }
}

fn describe_signal(received: Option<u8>) -> String {
    received.map_or_else(|| "end of stream".to_string(), |b| format!("byte {b}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = Error::ServerNotReady { received: Some(0) };
        assert_eq!(err.kind(), ErrorKind::ServerNotReady);

        let err = Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert_eq!(err.kind(), ErrorKind::Io);

        let err = Error::Truncated {
            expected: 10,
            received: 4,
        };
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_server_not_ready_message() {
        let err = Error::ServerNotReady { received: None };
        assert_eq!(err.to_string(), "server is not ready (received end of stream)");

        let err = Error::ServerNotReady { received: Some(7) };
        assert_eq!(err.to_string(), "server is not ready (received byte 7)");
    }

    #[test]
    fn test_error_codes() {
        let err = Error::Connect {
            addr: "127.0.0.1:1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(err.code(), Some("E001"));
        assert!(err.is_recoverable());
        assert!(err.suggestion().is_some());
        assert_eq!(Error::Cancelled.code(), None);
        assert!(!Error::Cancelled.is_recoverable());
    }
}
