//! Thruput CLI - point-to-point throughput benchmarking
//!
//! Thruput times bulk transfers against a matching server, either with
//! synthetic data or with real files.
//!
//! ## Quick Start
//!
//! ```bash
//! # Download 1 GB of synthetic data from the default server
//! thruput dummy download
//!
//! # Upload 256 MB in 64 KB chunks
//! thruput dummy upload --size 256MB --chunk-size 64KB --host 10.0.0.5
//!
//! # Send a file, then fetch one back
//! thruput send ./capture.pcap
//! thruput receive --output ./downloads
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::struct_excessive_bools)]

use anyhow::Result;
use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Dummy(args) => commands::dummy::run(args).await,
        Command::Send(args) => commands::send::run(args).await,
        Command::Receive(args) => commands::receive::run(args).await,
        Command::Config(args) => commands::config::run(args),
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,thruput=info,thruput_core=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
