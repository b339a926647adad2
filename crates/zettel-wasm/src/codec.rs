//! Header decoding and the address/script codec for JavaScript hosts.
//!
//! Transaction lists are left to the host: `decode_header` reports where
//! they start in the raw block.

use wasm_bindgen::prelude::*;
use zettel_core::{Network, ParserConfig, ZettelParser};

use crate::registry;
use crate::state::{AddressInfo, HeaderInfo};

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Address/script codec bound to one network.
#[wasm_bindgen]
pub struct AddressCodec {
    parser: ZettelParser<()>,
}

impl AddressCodec {
    fn for_network(network: &str) -> Result<Self, String> {
        let net = Network::from_name(network).ok_or_else(|| format!("Invalid network: {}", network))?;
        let parser = ZettelParser::for_chain(registry(), net.name(), ()).map_err(|e| e.to_string())?;
        Ok(AddressCodec { parser })
    }

    fn resolve(&self, script_hex: &str) -> zettel_core::Result<AddressInfo> {
        let script = self.parser.addr_desc_from_script_hex(script_hex)?;
        let (addresses, standard) = self.parser.script_to_addresses(&script)?;
        Ok(AddressInfo { addresses, standard })
    }

    fn encode(&self, address: &str) -> zettel_core::Result<String> {
        Ok(hex::encode(self.parser.address_to_script(address)?))
    }
}

#[wasm_bindgen]
impl AddressCodec {
    /// Create a codec for the specified network.
    ///
    /// # Arguments
    /// * `network` - The network ("main" or "test")
    #[wasm_bindgen(constructor)]
    pub fn new(network: &str) -> Result<AddressCodec, JsValue> {
        Self::for_network(network).map_err(|e| JsValue::from_str(&e))
    }

    /// Create a codec from a JSON parser configuration.
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(json: &str) -> Result<AddressCodec, JsValue> {
        let config = ParserConfig::from_json(json).map_err(to_js_error)?;
        Self::for_network(&config.network).map_err(|e| JsValue::from_str(&e))
    }

    /// Addresses paid by a hex output script.
    ///
    /// # Returns
    /// `{ addresses, standard }`
    #[wasm_bindgen(js_name = scriptToAddresses)]
    pub fn script_to_addresses(&self, script_hex: &str) -> Result<JsValue, JsValue> {
        self.resolve(script_hex).map_err(to_js_error)?.to_js()
    }

    /// Hex output script for an address.
    #[wasm_bindgen(js_name = addressToScript)]
    pub fn address_to_script(&self, address: &str) -> Result<String, JsValue> {
        self.encode(address).map_err(to_js_error)
    }

    /// Get the network name.
    #[wasm_bindgen(getter)]
    pub fn network(&self) -> String {
        self.parser.params().name.clone()
    }
}

fn header_info(raw: &[u8]) -> zettel_core::Result<HeaderInfo> {
    let (header, tx_offset) = zettel_core::block::decode_block_header(raw)?;
    Ok(HeaderInfo::new(&header, raw.len(), tx_offset))
}

/// Decode the header of a raw block.
#[wasm_bindgen(js_name = decodeHeader)]
pub fn decode_header(raw: &[u8]) -> Result<JsValue, JsValue> {
    header_info(raw).map_err(to_js_error)?.to_js()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zettel_core::HEADER_REGION_SIZE;

    #[test]
    fn test_codec_resolves_compact_script() {
        let codec = AddressCodec::for_network("main").unwrap();
        let info = codec.resolve("149f7db318cb93848108d3d6f91ce4517db50d5dd2ac").unwrap();

        assert_eq!(info.addresses, vec!["ZqvAn4MEHxqHgk8WHHTm6jVxhRAX5Ag6wY"]);
        assert!(info.standard);
    }

    #[test]
    fn test_codec_encodes_address() {
        let codec = AddressCodec::for_network("main").unwrap();
        assert_eq!(
            codec.encode("Zp7GizRRtx14WAA6HxypuqUxhihdDAewGa").unwrap(),
            "148ba6fcede976e803edc7b3625e258710ff023098ac"
        );
    }

    #[test]
    fn test_codec_rejects_unknown_network() {
        assert!(AddressCodec::for_network("regtest").is_err());
    }

    #[test]
    fn test_codec_network_name() {
        let codec = AddressCodec::for_network("testnet").unwrap();
        assert_eq!(codec.parser.params().name, "test");
    }

    #[test]
    fn test_header_info() {
        let mut raw = vec![0u8; HEADER_REGION_SIZE + 1];
        raw[0] = 0x01;
        raw[68..76].copy_from_slice(&1_529_535_924u64.to_le_bytes());

        let info = header_info(&raw).unwrap();
        assert_eq!(info.version, 1);
        assert_eq!(info.time, 1_529_535_924);
        assert_eq!(info.size, HEADER_REGION_SIZE + 1);
        assert_eq!(info.tx_offset, HEADER_REGION_SIZE);
    }

    #[test]
    fn test_header_info_truncated() {
        let err = header_info(&[0u8; 100]).unwrap_err();
        assert!(err.is_truncated());
    }
}
