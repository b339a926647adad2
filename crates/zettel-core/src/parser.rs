//! Zettelkasten parser: block decoding plus the address/script codec.

use std::sync::Arc;

use tracing::trace;

use crate::address::{decode_address, encode_base58check};
use crate::block::{decode_block, decode_block_header, Block, BlockHeader, TransactionDecoder};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::network::{NetworkParameters, NetworkRegistry};
use crate::script::{BitcoinScriptResolver, ScriptBuilder, StandardScriptResolver, OP_CHECKSIG};

/// Length of the compact pay-to-pubkey-hash script: `<push 20> <hash> OP_CHECKSIG`.
pub const COMPACT_P2PKH_SIZE: usize = 22;

/// Block decoder and address codec for one network.
///
/// `D` decodes the transaction list, `R` resolves every output script that
/// is not a compact pubkey-hash script.
#[derive(Debug, Clone)]
pub struct ZettelParser<D, R = BitcoinScriptResolver> {
    registry: Arc<NetworkRegistry>,
    params: Arc<NetworkParameters>,
    decoder: D,
    resolver: R,
}

impl<D> ZettelParser<D, BitcoinScriptResolver> {
    /// Parser using the standard Bitcoin resolver under `params`.
    pub fn new(registry: Arc<NetworkRegistry>, params: Arc<NetworkParameters>, decoder: D) -> Self {
        let resolver = BitcoinScriptResolver::new(Arc::clone(&params));
        Self::with_resolver(registry, params, decoder, resolver)
    }

    /// Parser for a chain name (`"main"` or `"test"`).
    pub fn for_chain(registry: Arc<NetworkRegistry>, chain: &str, decoder: D) -> Result<Self> {
        let params = registry.chain_params(chain)?;
        Ok(Self::new(registry, params, decoder))
    }

    pub fn from_config(registry: Arc<NetworkRegistry>, config: &ParserConfig, decoder: D) -> Result<Self> {
        Self::for_chain(registry, &config.network, decoder)
    }
}

impl<D, R> ZettelParser<D, R> {
    pub fn with_resolver(
        registry: Arc<NetworkRegistry>,
        params: Arc<NetworkParameters>,
        decoder: D,
        resolver: R,
    ) -> Self {
        ZettelParser {
            registry,
            params,
            decoder,
            resolver,
        }
    }

    pub fn params(&self) -> &NetworkParameters {
        &self.params
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Decode the header region, returning where the transaction list starts.
    pub fn parse_block_header(&self, raw: &[u8]) -> Result<(BlockHeader, usize)> {
        decode_block_header(raw)
    }

    /// Output script for an address: `push(payload) OP_CHECKSIG`.
    ///
    /// The framing is the same for every address class, so a script-hash or
    /// witness address does not round-trip through
    /// [`script_to_addresses`](Self::script_to_addresses).
    pub fn address_to_script(&self, address: &str) -> Result<Vec<u8>> {
        let decoded = decode_address(address, &self.registry)?;

        let script = ScriptBuilder::new()
            .push_slice(decoded.script_address())?
            .push_opcode(OP_CHECKSIG)?
            .into_script();

        Ok(script)
    }

    /// Address descriptor for an output script given as hex.
    pub fn addr_desc_from_script_hex(&self, script_hex: &str) -> Result<Vec<u8>> {
        Ok(hex::decode(script_hex)?)
    }
}

impl<D, R> ZettelParser<D, R>
where
    R: StandardScriptResolver,
{
    /// Addresses paid by an output script, and whether it is a standard
    /// single-address script.
    ///
    /// 22-byte scripts are compact pubkey-hash scripts and are recognized by
    /// length alone. Everything else goes to the resolver unchanged.
    pub fn script_to_addresses(&self, script: &[u8]) -> Result<(Vec<String>, bool)> {
        if script.len() == COMPACT_P2PKH_SIZE {
            let hash = &script[1..script.len() - 1];
            trace!(hash = %hex::encode(hash), "compact pubkey-hash script");
            let address = encode_base58check(self.params.pubkey_hash_prefix, hash);
            return Ok((vec![address], true));
        }

        trace!(len = script.len(), "delegating to standard resolver");
        Ok(self.resolver.script_to_addresses(script)?)
    }
}

impl<D, R> ZettelParser<D, R>
where
    D: TransactionDecoder,
{
    /// Decode a raw block.
    pub fn parse_block(&self, raw: &[u8]) -> Result<Block<D::Tx>> {
        decode_block(raw, &self.decoder)
    }
}
