//! Configuration management for Thruput.
//!
//! This module handles loading, saving, and managing Thruput configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/thruput/config.toml` |
//! | macOS | `~/Library/Application Support/com.thruput.Thruput/config.toml` |
//! | Windows | `%APPDATA%\Thruput\Thruput\config\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use thruput_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Server: {}:{}", config.network.host, config.network.port);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::{ConnectOptions, Endpoint};
use crate::error::{Error, Result};

/// Main configuration struct for Thruput.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network settings
    pub network: NetworkConfig,
    /// Transfer settings
    pub transfer: TransferConfig,
}

/// Network configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Connect timeout (`0s` disables it)
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Enable TCP keep-alive
    pub keepalive: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            keepalive: true,
        }
    }
}

impl NetworkConfig {
    /// The configured server endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Socket options derived from this configuration.
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: (!self.connect_timeout.is_zero()).then_some(self.connect_timeout),
            keepalive: self.keepalive,
        }
    }
}

/// Transfer configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Chunk size for reads and writes, in bytes
    pub chunk_size: usize,
    /// Payload size of dummy transfers, in bytes
    pub dummy_size: u64,
    /// Directory for downloaded files (current directory if unset)
    pub output_dir: Option<PathBuf>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            dummy_size: crate::DEFAULT_DUMMY_SIZE,
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Check values that serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        if self.transfer.chunk_size == 0 {
            return Err(Error::InvalidConfig {
                key: "transfer.chunk_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.transfer.dummy_size == 0 {
            return Err(Error::InvalidConfig {
                key: "transfer.dummy_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.network.port == 0 {
            return Err(Error::InvalidConfig {
                key: "network.port".to_string(),
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        if self.network.host.trim().is_empty() {
            return Err(Error::InvalidConfig {
                key: "network.host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "thruput", "Thruput")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.strip_suffix('s')
            .map(|secs| {
                secs.parse()
                    .map(Duration::from_secs)
                    .map_err(serde::de::Error::custom)
            })
            .or_else(|| {
                s.strip_suffix('m').map(|mins| {
                    mins.parse::<u64>()
                        .map(|m| Duration::from_secs(m * 60))
                        .map_err(serde::de::Error::custom)
                })
            })
            .unwrap_or_else(|| Err(serde::de::Error::custom("invalid duration format")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.network.port, crate::DEFAULT_PORT);
        assert_eq!(config.network.host, "127.0.0.1");
        assert_eq!(config.transfer.chunk_size, 1024);
        assert_eq!(config.transfer.dummy_size, 1024 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config").join("config.toml");

        let mut original = Config::default();
        original.network.host = "bench.local".to_string();
        original.network.port = 9000;
        original.transfer.chunk_size = 64 * 1024;
        original.transfer.output_dir = Some(PathBuf::from("/tmp/out"));

        original.save_to(&config_path).expect("save");
        let loaded = Config::load_from(&config_path).expect("load");

        assert_eq!(loaded.network.host, "bench.local");
        assert_eq!(loaded.network.port, 9000);
        assert_eq!(loaded.transfer.chunk_size, 64 * 1024);
        assert_eq!(loaded.transfer.output_dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_config_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.network.port, crate::DEFAULT_PORT);
    }

    #[test]
    fn test_config_deserialization_partial() {
        let partial_toml = r#"
[network]
port = 9999
connect_timeout = "2m"
"#;

        let config: Config = toml::from_str(partial_toml).expect("parse partial config");

        assert_eq!(config.network.port, 9999);
        assert_eq!(config.network.connect_timeout, Duration::from_secs(120));
        assert_eq!(config.network.host, crate::DEFAULT_HOST);
        assert_eq!(config.transfer.chunk_size, crate::DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_config_rejects_zero_chunk_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[transfer]\nchunk_size = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { ref key, .. } if key == "transfer.chunk_size"));
    }

    #[test]
    fn test_connect_options_timeout_disabled() {
        let mut config = Config::default();
        assert_eq!(
            config.network.connect_options().connect_timeout,
            Some(Duration::from_secs(10))
        );

        config.network.connect_timeout = Duration::ZERO;
        assert_eq!(config.network.connect_options().connect_timeout, None);
    }

    #[test]
    fn test_humantime_duration_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");

        assert!(toml_str.contains("connect_timeout = \"10s\""));
        assert!(toml_str.contains("[network]"));
        assert!(toml_str.contains("[transfer]"));
    }

    #[test]
    fn test_config_path() {
        assert!(Config::config_path().ends_with("config.toml"));
    }
}
