//! AOProto Configuration Management
//!
//! Loads codec options from a `key = value` text file.
//!
//! ```text
//! # codec.txt
//! byte_order = big
//! max_collection_len = 4096
//! default_text_prefix = u16
//! trace_hex = true
//! ```

use aoproto_core::{ByteOrder, CodecError, LengthPrefix, Result};
use std::fs;
use std::path::Path;

/// Options shared by every codec a resolver builds
#[derive(Debug, Clone, PartialEq)]
pub struct CodecConfig {
    /// Byte order of fixed-width values (from "byte_order" option)
    pub byte_order: ByteOrder,
    /// Upper bound on decoded list and byte block lengths (from "max_collection_len" option)
    pub max_collection_len: usize,
    /// Upper bound on decoded text lengths in bytes (from "max_text_len" option)
    pub max_text_len: usize,
    /// Prefix for text fields that do not declare one (from "default_text_prefix" option)
    pub default_text_prefix: LengthPrefix,
    /// Prefix for list and byte block fields that do not declare one (from "default_list_prefix" option)
    pub default_list_prefix: LengthPrefix,
    /// Log a hex dump of every encoded message at trace level (from "trace_hex" option)
    pub trace_hex: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Big,
            max_collection_len: 65_536,
            max_text_len: 65_536,
            default_text_prefix: LengthPrefix::U32,
            default_list_prefix: LengthPrefix::U32,
            trace_hex: false,
        }
    }
}

impl CodecConfig {
    /// Load configuration from a codec options file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::parse(&content)?;
        tracing::debug!("Loaded codec config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse options file content
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some(eq_pos) = line.find('=') else {
                return Err(CodecError::Config(format!(
                    "line {}: expected key = value, got '{}'",
                    number + 1,
                    line
                )));
            };
            let key = line[..eq_pos].trim();
            let value = line[eq_pos + 1..].trim();

            config.parse_option(key, value);
        }

        config.validate()?;
        Ok(config)
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        match key {
            "byte_order" => match ByteOrder::from_name(value) {
                Some(order) => self.byte_order = order,
                None => tracing::warn!("Unknown byte_order '{}', keeping {:?}", value, self.byte_order),
            },
            "max_collection_len" => {
                self.max_collection_len = parse_or(key, value, self.max_collection_len);
            }
            "max_text_len" => {
                self.max_text_len = parse_or(key, value, self.max_text_len);
            }
            "default_text_prefix" => match LengthPrefix::from_name(value) {
                Some(prefix) => self.default_text_prefix = prefix,
                None => tracing::warn!("Unknown default_text_prefix '{}'", value),
            },
            "default_list_prefix" => match LengthPrefix::from_name(value) {
                Some(prefix) => self.default_list_prefix = prefix,
                None => tracing::warn!("Unknown default_list_prefix '{}'", value),
            },
            "trace_hex" => {
                self.trace_hex = parse_or(key, value, self.trace_hex);
            }
            _ => tracing::warn!("Ignoring unknown codec option '{}'", key),
        }
    }

    fn validate(&self) -> Result<()> {
        // Lists cannot be NUL terminated; only text has a natural terminator
        if self.default_list_prefix == LengthPrefix::NulTerminated {
            return Err(CodecError::Config(
                "default_list_prefix cannot be nul".into(),
            ));
        }
        if matches!(self.default_text_prefix, LengthPrefix::Fixed(_))
            || matches!(self.default_list_prefix, LengthPrefix::Fixed(_))
        {
            return Err(CodecError::Config(
                "fixed lengths must be declared per field".into(),
            ));
        }
        Ok(())
    }

    /// Log the effective configuration
    pub fn display(&self) {
        tracing::info!("  [codec]");
        tracing::info!("    Byte order: {:?}", self.byte_order);
        tracing::info!("    Max collection length: {}", self.max_collection_len);
        tracing::info!("    Max text length: {}", self.max_text_len);
        tracing::info!("    Default text prefix: {:?}", self.default_text_prefix);
        tracing::info!("    Default list prefix: {:?}", self.default_list_prefix);
        tracing::info!("    Hex tracing: {}", self.trace_hex);
    }
}

fn parse_or<T: std::str::FromStr + std::fmt::Debug>(key: &str, value: &str, current: T) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::warn!("Invalid value '{}' for {}, keeping {:?}", value, key, current);
            current
        }
    }
}
