//! # Thruput Core Library
//!
//! `thruput-core` implements the client side of a small point-to-point
//! transfer protocol used to measure network throughput against a matching
//! server.
//!
//! ## Features
//!
//! - **Dummy transfers**: stream a fixed amount of synthetic bytes in either
//!   direction to time the link
//! - **File transfers**: upload a file or download one into a directory
//! - **Progress reporting**: a percentage callback invoked after every chunk
//! - **Cancellation**: stop an in-flight transfer from another task
//!
//! ## Modules
//!
//! - [`config`] - Configuration management
//! - [`connection`] - Endpoint parsing and socket setup
//! - [`error`] - Error types
//! - [`progress`] - Progress observers
//! - [`protocol`] - Wire protocol primitives and chunk arithmetic
//! - [`transfer`] - Session manager and the dummy/file engines
//! - [`units`] - Data size units and formatting
//!
//! ## Example
//!
//! ```rust,ignore
//! use thruput_core::connection::Endpoint;
//! use thruput_core::transfer::{TransferClient, TransferRequest};
//! use thruput_core::protocol::Direction;
//!
//! let client = TransferClient::new();
//! let request = TransferRequest::dummy(
//!     Direction::Download,
//!     Endpoint::new("127.0.0.1", 65432),
//!     1024,
//!     64 * 1024 * 1024,
//! );
//! let result = client.start(request, Some(&|pct: f64| println!("{pct:.1}%"))).await?;
//! println!("took {} ms", result.elapsed_ms());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod connection;
pub mod error;
pub mod progress;
pub mod protocol;
pub mod transfer;
pub mod units;

pub use error::{Error, ErrorKind, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default server port
pub const DEFAULT_PORT: u16 = 65432;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default dummy payload size (1 GB)
pub const DEFAULT_DUMMY_SIZE: u64 = 1024 * 1024 * 1024;
