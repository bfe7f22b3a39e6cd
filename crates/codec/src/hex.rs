//! Hex helpers for logs and the inspection tool

use aoproto_core::{CodecError, Result};
use std::fmt::Write;

/// Parse hex text; whitespace is ignored
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits).map_err(|e| CodecError::InvalidData(format!("invalid hex input: {}", e)))
}

/// Offset-prefixed dump, sixteen bytes per line
pub fn dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(16).enumerate() {
        if line > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:04x}: {:02X?}", line * 16, chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let data = [0x00, 0x0b, 0xd3, 0xff];
        assert_eq!(from_hex("00 0B d3\nff").unwrap(), data.to_vec());
        assert_eq!(from_hex(&hex::encode(data)).unwrap(), data.to_vec());
    }

    #[test]
    fn test_bad_hex() {
        assert!(matches!(from_hex("abc"), Err(CodecError::InvalidData(_))));
        assert!(matches!(from_hex("zz"), Err(CodecError::InvalidData(_))));
        assert!(from_hex("").unwrap().is_empty());
    }

    #[test]
    fn test_dump_lines() {
        let data: Vec<u8> = (0..20).collect();
        let dump = dump(&data);
        assert_eq!(dump.lines().count(), 2);
        assert!(dump.starts_with("0000: [00, 01"));
        assert!(dump.contains("0010: [10, 11, 12, 13]"));
    }
}
