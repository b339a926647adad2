//! Serializable results handed back to JavaScript.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use zettel_core::BlockHeader;

/// Decoded block header for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    /// Block version.
    pub version: i32,
    /// Previous block hash (display format).
    pub prev_hash: String,
    /// Merkle root (display format).
    pub merkle_root: String,
    /// Block time, seconds since the epoch.
    pub time: i64,
    /// Difficulty bits.
    pub bits: u32,
    pub nonce: u32,
    /// Size of the raw block in bytes.
    pub size: usize,
    /// Offset of the transaction list in the raw block.
    pub tx_offset: usize,
}

impl HeaderInfo {
    pub fn new(header: &BlockHeader, size: usize, tx_offset: usize) -> Self {
        HeaderInfo {
            version: header.version,
            prev_hash: header.prev_block_hash_hex(),
            merkle_root: header.merkle_root_hex(),
            time: header.time(),
            bits: header.bits,
            nonce: header.nonce,
            size,
            tx_offset,
        }
    }

    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
    }
}

/// Addresses resolved from an output script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub addresses: Vec<String>,
    /// Whether the script is a standard single-address script.
    pub standard: bool,
}

impl AddressInfo {
    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_info_display_hashes() {
        let mut prev = [0u8; 32];
        prev[31] = 0x01;
        let header = BlockHeader {
            version: 1,
            prev_block_hash: prev,
            merkle_root: [0u8; 32],
            timestamp: 1_537_510_458,
            bits: 0x1d00ffff,
            nonce: 7,
        };

        let info = HeaderInfo::new(&header, 300, 181);

        assert!(info.prev_hash.starts_with("01"));
        assert_eq!(info.time, 1_537_510_458);
        assert_eq!(info.tx_offset, 181);
    }
}
