//! Config command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use thruput_core::config::Config;
use thruput_core::units::{format_size, parse_size};

use super::{ConfigAction, ConfigArgs};

/// Every settable key with a short description.
const KEYS: &[(&str, &str)] = &[
    ("network.host", "Server host name or address"),
    ("network.port", "Server port"),
    (
        "network.connect_timeout",
        "Connect timeout, e.g. 10s or 1m (0s waits forever)",
    ),
    ("network.keepalive", "Enable TCP keep-alive (true/false)"),
    (
        "transfer.chunk_size",
        "Bytes per read/write call, e.g. 1024 or 64KB",
    ),
    ("transfer.dummy_size", "Dummy payload size, e.g. 512MB or 1GB"),
    (
        "transfer.output_dir",
        "Directory for received files (empty for current directory)",
    ),
];

/// Run the config command.
pub fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Get { key } => {
            let config = load()?;
            match get_config_value(&config, &key) {
                Some(v) => println!("{}: {}", key, v),
                None => bail!("Unknown configuration key: {}", key),
            }
        }

        ConfigAction::Set { key, value } => {
            let mut config = load()?;
            if !set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Invalid value for {}: '{}'", key, value))?
            {
                bail!("Unknown configuration key: {}", key);
            }
            config.validate()?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }

        ConfigAction::Show => show(&load()?),

        ConfigAction::List => {
            println!();
            for (key, description) in KEYS {
                println!("  {:<26} {}", key, description);
            }
            println!();
        }

        ConfigAction::Path => println!("{}", Config::config_path().display()),

        ConfigAction::Reset => {
            Config::default().save()?;
            println!("Configuration reset to defaults.");
        }
    }

    Ok(())
}

fn load() -> Result<Config> {
    Config::load().context("Failed to load configuration")
}

fn show(config: &Config) {
    println!();
    println!("Thruput Configuration");
    println!("{}", "─".repeat(50));
    println!();
    println!("[network]");
    println!("  host = \"{}\"", config.network.host);
    println!("  port = {}", config.network.port);
    println!(
        "  connect_timeout = \"{}s\"",
        config.network.connect_timeout.as_secs()
    );
    println!("  keepalive = {}", config.network.keepalive);
    println!();
    println!("[transfer]");
    println!(
        "  chunk_size = {} ({})",
        config.transfer.chunk_size,
        format_size(config.transfer.chunk_size as u64)
    );
    println!(
        "  dummy_size = {} ({})",
        config.transfer.dummy_size,
        format_size(config.transfer.dummy_size)
    );
    println!(
        "  output_dir = \"{}\"",
        get_config_value(config, "transfer.output_dir").unwrap_or_default()
    );
    println!();
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "network.host" => Some(config.network.host.clone()),
        "network.port" => Some(config.network.port.to_string()),
        "network.connect_timeout" => Some(format!("{}s", config.network.connect_timeout.as_secs())),
        "network.keepalive" => Some(config.network.keepalive.to_string()),
        "transfer.chunk_size" => Some(config.transfer.chunk_size.to_string()),
        "transfer.dummy_size" => Some(config.transfer.dummy_size.to_string()),
        "transfer.output_dir" => Some(
            config
                .transfer
                .output_dir
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string()),
        ),
        _ => None,
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<bool> {
    match key {
        "network.host" => {
            config.network.host = value.trim().to_string();
            Ok(true)
        }
        "network.port" => {
            config.network.port = value.parse()?;
            Ok(true)
        }
        "network.connect_timeout" => {
            config.network.connect_timeout = parse_timeout(value)?;
            Ok(true)
        }
        "network.keepalive" => {
            config.network.keepalive = value.parse()?;
            Ok(true)
        }
        "transfer.chunk_size" => {
            config.transfer.chunk_size = usize::try_from(parse_size(value)?)?;
            Ok(true)
        }
        "transfer.dummy_size" => {
            config.transfer.dummy_size = parse_size(value)?;
            Ok(true)
        }
        "transfer.output_dir" => {
            let value = value.trim();
            config.transfer.output_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Parse `<n>s`, `<n>m` or a bare number of seconds.
fn parse_timeout(value: &str) -> Result<Duration> {
    let value = value.trim();
    let secs = if let Some(mins) = value.strip_suffix('m') {
        mins.parse::<u64>()?
            .checked_mul(60)
            .context("timeout is too large")?
    } else {
        value.strip_suffix('s').unwrap_or(value).parse::<u64>()?
    };
    Ok(Duration::from_secs(secs))
}
