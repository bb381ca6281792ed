//! Data size units.
//!
//! Sizes are binary: `1KB` is 1024 bytes, `1GB` is 1024³ bytes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Unit used to express a dummy payload size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataUnit {
    /// Bytes
    B,
    /// Kibibytes
    KB,
    /// Mebibytes
    MB,
    /// Gibibytes
    #[default]
    GB,
}

impl DataUnit {
    /// Number of bytes in one unit.
    #[must_use]
    pub const fn multiplier(self) -> u64 {
        match self {
            Self::B => 1,
            Self::KB => KB,
            Self::MB => MB,
            Self::GB => GB,
        }
    }

    /// Convert `amount` of this unit into bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` on overflow.
    pub fn to_bytes(self, amount: u64) -> Result<u64> {
        amount
            .checked_mul(self.multiplier())
            .ok_or_else(|| Error::InvalidInput(format!("size {amount}{self} is too large")))
    }
}

impl fmt::Display for DataUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::B => "B",
            Self::KB => "KB",
            Self::MB => "MB",
            Self::GB => "GB",
        };
        f.write_str(s)
    }
}

impl FromStr for DataUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "B" => Ok(Self::B),
            "K" | "KB" | "KIB" => Ok(Self::KB),
            "M" | "MB" | "MIB" => Ok(Self::MB),
            "G" | "GB" | "GIB" => Ok(Self::GB),
            other => Err(Error::InvalidInput(format!("unknown size unit '{other}'"))),
        }
    }
}

/// Parse a size such as `1024`, `64KB` or `1 GB` into bytes.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the text is not a positive amount with an
/// optional unit.
pub fn parse_size(text: &str) -> Result<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (amount, unit) = text.split_at(split);

    let amount: u64 = amount
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid size '{text}'")))?;
    if amount == 0 {
        return Err(Error::InvalidInput("size must be at least 1".to_string()));
    }

    unit.parse::<DataUnit>()?.to_bytes(amount)
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Average rate of moving `bytes` in `elapsed`, in bytes per second.
#[must_use]
pub fn bytes_per_second(bytes: u64, elapsed: Duration) -> Option<u64> {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some((bytes as f64 / secs) as u64)
    } else {
        None
    }
}
