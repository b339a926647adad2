//! Block and address-script decoding for the Zettelkasten chain.
//!
//! This crate provides:
//! - Decoding of the custom 181-byte block header (Bitcoin fields with an
//!   8-byte timestamp, a whole-block hash and a miner signature), with the
//!   transaction list delegated to a host [`TransactionDecoder`]
//! - The address/script codec, including the compact 22-byte pubkey-hash
//!   output script
//! - Base58Check and Bech32/Bech32m address encoding
//! - A registry of network parameters shared by parser instances

pub mod address;
pub mod block;
pub mod config;
pub mod error;
pub mod hash;
pub mod network;
pub mod parser;
pub mod script;
pub mod wire;

pub use address::{decode_address, AddressClass, AddressError, DecodedAddress};
pub use block::{Block, BlockHeader, TransactionDecoder, WitnessMode, HEADER_REGION_SIZE};
pub use config::ParserConfig;
pub use error::{Error, Result};
pub use network::{Network, NetworkError, NetworkParameters, NetworkRegistry};
pub use parser::{ZettelParser, COMPACT_P2PKH_SIZE};
pub use script::{BitcoinScriptResolver, ScriptBuilder, ScriptClass, ScriptError, StandardScriptResolver};
pub use wire::{ByteReader, WireError};
