//! CLI command definitions and handlers.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::watch;

use thruput_core::config::Config;
use thruput_core::connection::Endpoint;
use thruput_core::progress::WatchObserver;
use thruput_core::protocol::Direction;
use thruput_core::transfer::{StopHandle, TransferClient, TransferRequest, TransferResult};
use thruput_core::units;

use crate::ui;

pub mod config;
pub mod dummy;
pub mod receive;
pub mod send;

/// Load configuration with graceful fallback to defaults.
///
/// A missing or unreadable config file is not fatal for transfer commands;
/// the problem is logged and defaults are used.
pub fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring configuration: {}", e);
        Config::default()
    })
}

/// Thruput - point-to-point throughput benchmarking
#[derive(Parser)]
#[command(name = "thruput")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Time a transfer of synthetic data
    Dummy(DummyArgs),

    /// Upload a file to the server
    Send(SendArgs),

    /// Download the file offered by the server
    Receive(ReceiveArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Transfer direction as seen from this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Send data to the server
    Upload,
    /// Receive data from the server
    Download,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Upload => Self::Upload,
            DirectionArg::Download => Self::Download,
        }
    }
}

/// Connection and output options shared by transfer commands
#[derive(Args, Debug, Clone)]
pub struct TransferOptions {
    /// Server address (HOST or HOST:PORT)
    #[arg(long, env = "THRUPUT_HOST")]
    pub host: Option<String>,

    /// Server port, used when --host has no port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Bytes per read/write call (e.g., 1024, 64KB)
    #[arg(short, long, value_parser = parse_size_arg)]
    pub chunk_size: Option<u64>,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl TransferOptions {
    /// Server endpoint from the flags, falling back to the configuration.
    pub fn endpoint(&self, config: &Config) -> Result<Endpoint> {
        let port = self.port.unwrap_or(config.network.port);
        let host = self.host.as_deref().unwrap_or(&config.network.host);
        Ok(Endpoint::parse(host, port)?)
    }

    /// Chunk size from the flags, falling back to the configuration.
    pub fn chunk_size(&self, config: &Config) -> Result<usize> {
        match self.chunk_size {
            Some(size) => Ok(usize::try_from(size)?),
            None => Ok(config.transfer.chunk_size),
        }
    }

    /// Whether the live progress line is drawn.
    pub const fn shows_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Arguments for the dummy command
#[derive(Parser)]
pub struct DummyArgs {
    /// Transfer direction
    #[arg(value_enum)]
    pub direction: DirectionArg,

    /// Amount of data to move (e.g., 512MB, 1GB)
    #[arg(short, long, value_parser = parse_size_arg)]
    pub size: Option<u64>,

    #[command(flatten)]
    pub options: TransferOptions,
}

/// Arguments for the send command
#[derive(Parser)]
pub struct SendArgs {
    /// File to upload
    pub file: PathBuf,

    #[command(flatten)]
    pub options: TransferOptions,
}

/// Arguments for the receive command
#[derive(Parser)]
pub struct ReceiveArgs {
    /// Output directory for the received file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub options: TransferOptions,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Show all configuration
    Show,

    /// List all available configuration keys
    List,

    /// Show the configuration file path
    Path,

    /// Reset to defaults
    Reset,
}

fn parse_size_arg(s: &str) -> std::result::Result<u64, String> {
    units::parse_size(s).map_err(|e| e.to_string())
}

/// Exit status used when Ctrl-C arrives with no transfer to stop.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Outcome of one Ctrl-C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// The running transfer was signalled and will return `Cancelled`
    Stopped,
    /// Nothing holds a connection yet (or any more); leave the process
    Exit,
}

fn handle_interrupt(stop: &StopHandle) -> Interrupt {
    if stop.stop() {
        Interrupt::Stopped
    } else {
        Interrupt::Exit
    }
}

/// Run one transfer with a live progress line and Ctrl-C handling.
///
/// Every Ctrl-C stops the transfer in flight. One that arrives while the
/// client is still connecting, or after it let go of the connection, exits
/// the process with status 130.
pub async fn execute(
    config: &Config,
    request: TransferRequest,
    options: &TransferOptions,
) -> thruput_core::Result<TransferResult> {
    let client = TransferClient::with_options(config.network.connect_options());

    let stop = client.stop_handle();
    let interrupt = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match handle_interrupt(&stop) {
                Interrupt::Stopped => tracing::debug!("Interrupt received, stopping transfer"),
                Interrupt::Exit => {
                    eprintln!();
                    eprintln!("  Interrupted.");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        }
    });

    let (observer, progress_rx) = WatchObserver::channel();
    let progress_handle = options
        .shows_progress()
        .then(|| tokio::spawn(display_progress(progress_rx)));

    let result = client.start(request, Some(&observer)).await;

    drop(observer);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }
    interrupt.abort();

    result
}

async fn display_progress(mut rx: watch::Receiver<f64>) {
    let mut drawn = false;

    while rx.changed().await.is_ok() {
        let percent = *rx.borrow_and_update();
        print!("\r  {}", ui::progress_line(percent));
        let _ = io::stdout().flush();
        drawn = true;
    }

    if drawn {
        println!();
    }
}

/// Print the outcome of a transfer and convert it for `main`.
pub fn report(
    outcome: thruput_core::Result<TransferResult>,
    options: &TransferOptions,
    summary: impl FnOnce(&TransferResult) -> serde_json::Value,
) -> Result<()> {
    match outcome {
        Ok(result) => {
            if options.json {
                let mut output = summary(&result);
                output["success"] = serde_json::json!(true);
                output["bytes"] = serde_json::json!(result.bytes);
                output["elapsed_ms"] = serde_json::json!(result.elapsed_ms());
                output["bytes_per_second"] = serde_json::json!(result.bytes_per_second());
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else if !options.quiet {
                println!();
                println!(
                    "  Transfer complete: {} in {} ({})",
                    units::format_size(result.bytes),
                    ui::format_elapsed(result.elapsed),
                    ui::format_rate(result.bytes_per_second())
                );
                println!();
            }
            Ok(())
        }
        Err(e) => {
            if options.json {
                let output = serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "code": e.code(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else if !options.quiet {
                eprintln!();
                match &e {
                    thruput_core::Error::Cancelled => eprintln!("  Transfer cancelled."),
                    _ => eprintln!("  Transfer failed: {}", e),
                }
                if let Some(hint) = e.suggestion() {
                    eprintln!("  {}", hint);
                }
                eprintln!();
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_dummy() {
        let cli = Cli::try_parse_from([
            "thruput",
            "dummy",
            "upload",
            "--size",
            "256MB",
            "--chunk-size",
            "64KB",
            "--host",
            "10.0.0.5:9000",
            "--json",
        ])
        .unwrap();

        let Command::Dummy(args) = cli.command else {
            panic!("expected dummy command");
        };
        assert_eq!(args.direction, DirectionArg::Upload);
        assert_eq!(args.size, Some(256 * 1024 * 1024));
        assert_eq!(args.options.chunk_size, Some(64 * 1024));
        assert!(args.options.json);
        assert!(!args.options.shows_progress());

        let endpoint = args.options.endpoint(&Config::default()).unwrap();
        assert_eq!(endpoint, Endpoint::new("10.0.0.5", 9000));
    }

    #[test]
    fn test_cli_rejects_zero_sizes() {
        assert!(Cli::try_parse_from(["thruput", "dummy", "download", "--size", "0"]).is_err());
        assert!(Cli::try_parse_from(["thruput", "send", "a.bin", "--chunk-size", "0"]).is_err());
    }

    #[test]
    fn test_options_fall_back_to_config() {
        let cli = Cli::try_parse_from(["thruput", "receive", "--port", "7000"]).unwrap();
        let Command::Receive(args) = cli.command else {
            panic!("expected receive command");
        };

        let mut config = Config::default();
        config.network.host = "bench.local".to_string();
        config.transfer.chunk_size = 4096;

        let endpoint = args.options.endpoint(&config).unwrap();
        assert_eq!(endpoint, Endpoint::new("bench.local", 7000));
        assert_eq!(args.options.chunk_size(&config).unwrap(), 4096);
        assert!(args.output.is_none());
    }

    #[test]
    fn test_interrupt_while_idle_exits() {
        let client = TransferClient::new();
        assert_eq!(handle_interrupt(&client.stop_handle()), Interrupt::Exit);
    }

    #[tokio::test]
    async fn test_interrupt_stops_running_transfer() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut handshake = [0u8; 14];
            stream.read_exact(&mut handshake).await.unwrap();
            stream.write_all(&[1]).await.unwrap();
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest).await;
        });

        let client = TransferClient::new();
        let stop = client.stop_handle();
        let request = TransferRequest::dummy(
            Direction::Download,
            Endpoint::new("127.0.0.1", port),
            16,
            1_000_000,
        );

        let interrupter = async {
            while !client.is_running() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            handle_interrupt(&stop)
        };

        let (outcome, action) = tokio::join!(client.start(request, None), interrupter);

        assert_eq!(action, Interrupt::Stopped);
        assert!(matches!(outcome, Err(thruput_core::Error::Cancelled)));
        assert_eq!(handle_interrupt(&stop), Interrupt::Exit);
        server.await.unwrap();
    }
}
