//! Configuration loading traits and helpers.
//!
//! Two on-disk forms are supported across the workspace:
//!
//! - TOML files, loaded through the [`ConfigLoader`] blanket trait;
//! - legacy flat `KEY=VALUE` files as shipped on camera firmware images,
//!   tokenized by [`kv_pairs`] and converted with [`parse_int`] /
//!   [`parse_hex`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use ptz_common::config::{ConfigError, ConfigLoader};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct MyToolConfig {
//!     state_dir: String,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MyToolConfig::load(Path::new("ptz.toml"))?;
//!     println!("State dir: {}", config.state_dir);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// Parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Parse a level name as written in a legacy config file.
    ///
    /// Case-insensitive; returns `None` for anything unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_config_file(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Read a configuration file, mapping a missing file to `FileNotFound`.
pub fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound
        } else {
            ConfigError::ParseError(e.to_string())
        }
    })
}

/// Iterate the `KEY=VALUE` pairs of a legacy config file.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Key and value
/// are whitespace-trimmed; the value may be empty.
pub fn kv_pairs(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((key.trim(), value.trim()))
    })
}

/// Parse a signed integer with C-style radix detection.
///
/// Accepts an optional sign, then `0x` (hex), a leading `0` (octal) or
/// decimal digits. Trailing garbage after at least one digit is ignored.
/// Returns `default` when no digit can be read.
pub fn parse_int(value: &str, default: i32) -> i32 {
    let s = value.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (16, hex)
    } else if s.len() > 1 && s.starts_with('0') {
        (8, &s[1..])
    } else {
        (10, s)
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        // A lone "0" prefix (e.g. "0x" or "09") still reads as zero.
        return if radix != 10 { 0 } else { default };
    }

    match i64::from_str_radix(&digits[..end], radix) {
        Ok(n) => {
            let n = if negative { -n } else { n };
            n as i32
        }
        Err(_) => default,
    }
}

/// Parse an unsigned value that is usually written in hex.
///
/// - `0x`-prefixed values must be entirely hex;
/// - otherwise the value is tried as decimal (or octal with a leading `0`),
///   then as bare hex digits;
/// - anything else yields `default`.
pub fn parse_hex(value: &str, default: u64) -> u64 {
    let s = value.trim();
    if s.is_empty() {
        return default;
    }

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).unwrap_or(default);
    }

    let c_style = if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8)
    } else {
        s.parse::<u64>()
    };

    c_style
        .or_else(|_| u64::from_str_radix(s, 16))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" warning "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"error\"")
                .unwrap()
                .level,
            LogLevel::Error
        );
    }

    #[test]
    fn test_kv_pairs_skips_comments_and_junk() {
        let content = "# header\n\n  PAN_MAX_DEG = 350 \nno equals here\nSTATE_DIR=/tmp/x\nEMPTY=\n";
        let pairs: Vec<_> = kv_pairs(content).collect();
        assert_eq!(
            pairs,
            vec![("PAN_MAX_DEG", "350"), ("STATE_DIR", "/tmp/x"), ("EMPTY", "")]
        );
    }

    #[test]
    fn test_parse_int_radix_detection() {
        assert_eq!(parse_int("42", -1), 42);
        assert_eq!(parse_int("-7", 0), -7);
        assert_eq!(parse_int("0x10", 0), 16);
        assert_eq!(parse_int("010", 0), 8);
        assert_eq!(parse_int("0", 5), 0);
        assert_eq!(parse_int("12abc", 0), 12);
    }

    #[test]
    fn test_parse_int_falls_back_on_garbage() {
        assert_eq!(parse_int("", 9), 9);
        assert_eq!(parse_int("abc", 9), 9);
        assert_eq!(parse_int("-", 9), 9);
    }

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_hex("0x40046d40", 0), 0x4004_6d40);
        assert_eq!(parse_hex("537760", 0), 537_760);
        assert_eq!(parse_hex("5377d0", 0), 0x53_77d0);
        assert_eq!(parse_hex("0x12zz", 7), 7);
        assert_eq!(parse_hex("", 7), 7);
        assert_eq!(parse_hex("zz", 7), 7);
    }

    #[test]
    fn test_config_loader_file_not_found() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct TestConfig {
            value: String,
        }

        let result = TestConfig::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct TestConfig {
            value: String,
        }

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = TestConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
