//! Zettelkasten network definitions and the parameter registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::warn;

use crate::address::{AddressClass, AddressError};

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Another network already uses this magic value.
    #[error("network {name} reuses magic {magic:#010x} of network {existing}")]
    DuplicateMagic {
        name: String,
        existing: String,
        magic: u32,
    },
    /// No network registered under this name.
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

/// Built-in Zettelkasten network variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    /// Zettelkasten mainnet
    #[default]
    Mainnet,
    /// Zettelkasten testnet
    Testnet,
}

impl Network {
    /// Protocol magic identifying the network on the wire.
    pub fn magic(&self) -> u32 {
        match self {
            Network::Mainnet => 0xc2e3_cbfa,
            Network::Testnet => 0x0709_110b,
        }
    }

    /// Version byte for P2PKH addresses.
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::Mainnet => 81,
            Network::Testnet => 111,
        }
    }

    /// Version byte for P2SH addresses.
    pub fn p2sh_version(&self) -> u8 {
        match self {
            Network::Mainnet => 5,
            Network::Testnet => 196,
        }
    }

    /// Bech32 human-readable part for witness addresses.
    pub fn bech32_hrp(&self) -> &'static str {
        match self {
            Network::Mainnet => "bc",
            Network::Testnet => "tb",
        }
    }

    /// Parse network from string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "main" | "mainnet" => Some(Network::Mainnet),
            "test" | "testnet" => Some(Network::Testnet),
            _ => None,
        }
    }

    /// Registry name of the network.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "main",
            Network::Testnet => "test",
        }
    }

    /// Full parameter set for this variant.
    pub fn params(&self) -> NetworkParameters {
        NetworkParameters {
            name: self.name().to_string(),
            magic: self.magic(),
            pubkey_hash_prefix: self.p2pkh_version(),
            script_hash_prefix: self.p2sh_version(),
            bech32_hrp: self.bech32_hrp().to_string(),
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Chain parameters used by the block decoder and the address codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParameters {
    pub name: String,
    pub magic: u32,
    pub pubkey_hash_prefix: u8,
    pub script_hash_prefix: u8,
    pub bech32_hrp: String,
}

/// Process-wide set of known networks.
///
/// Constructed once by the host and shared as `Arc<NetworkRegistry>`.
/// Registration is idempotent: registering a name twice hands back the
/// parameters stored the first time.
#[derive(Debug, Default)]
pub struct NetworkRegistry {
    networks: RwLock<HashMap<String, Arc<NetworkParameters>>>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with mainnet and testnet already registered.
    pub fn with_defaults() -> Self {
        let networks = [Network::Mainnet, Network::Testnet]
            .iter()
            .map(|n| (n.name().to_string(), Arc::new(n.params())))
            .collect();
        NetworkRegistry {
            networks: RwLock::new(networks),
        }
    }

    /// Register a parameter set.
    pub fn register(&self, params: NetworkParameters) -> Result<Arc<NetworkParameters>, NetworkError> {
        let mut networks = self.networks.write();

        if let Some(existing) = networks.get(&params.name) {
            return Ok(Arc::clone(existing));
        }

        if let Some(clash) = networks.values().find(|p| p.magic == params.magic) {
            warn!(
                name = %params.name,
                existing = %clash.name,
                magic = params.magic,
                "refusing to register network with duplicate magic"
            );
            return Err(NetworkError::DuplicateMagic {
                name: params.name,
                existing: clash.name.clone(),
                magic: clash.magic,
            });
        }

        let params = Arc::new(params);
        networks.insert(params.name.clone(), Arc::clone(&params));
        Ok(params)
    }

    /// Register one of the built-in variants.
    pub fn register_network(&self, network: Network) -> Result<Arc<NetworkParameters>, NetworkError> {
        self.register(network.params())
    }

    /// Register mainnet and testnet.
    pub fn register_defaults(&self) -> Result<(), NetworkError> {
        self.register_network(Network::Mainnet)?;
        self.register_network(Network::Testnet)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<NetworkParameters>> {
        self.networks.read().get(name).cloned()
    }

    /// Like [`get`](Self::get) but failing with [`NetworkError::UnknownNetwork`].
    pub fn require(&self, name: &str) -> Result<Arc<NetworkParameters>, NetworkError> {
        self.get(name)
            .ok_or_else(|| NetworkError::UnknownNetwork(name.to_string()))
    }

    /// Parameters for a chain name, registering the defaults on first use.
    ///
    /// `"test"` selects testnet, anything else mainnet.
    pub fn chain_params(&self, chain: &str) -> Result<Arc<NetworkParameters>, NetworkError> {
        let network = match chain {
            "test" => Network::Testnet,
            _ => Network::Mainnet,
        };
        if let Some(params) = self.get(network.name()) {
            return Ok(params);
        }
        self.register_defaults()?;
        self.register_network(network)
    }

    /// Classify a base58 version byte against every registered network.
    pub fn address_class(&self, prefix: u8) -> Result<AddressClass, AddressError> {
        let networks = self.networks.read();
        let is_p2pkh = networks.values().any(|p| p.pubkey_hash_prefix == prefix);
        let is_p2sh = networks.values().any(|p| p.script_hash_prefix == prefix);

        match (is_p2pkh, is_p2sh) {
            (true, true) => Err(AddressError::AddressCollision(prefix)),
            (true, false) => Ok(AddressClass::PubKeyHash),
            (false, true) => Ok(AddressClass::ScriptHash),
            (false, false) => Err(AddressError::UnknownAddressType(prefix)),
        }
    }

    /// Whether `hrp` belongs to a registered network.
    pub fn is_segwit_hrp(&self, hrp: &str) -> bool {
        self.networks
            .read()
            .values()
            .any(|p| p.bech32_hrp.eq_ignore_ascii_case(hrp))
    }

    pub fn len(&self) -> usize {
        self.networks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.read().is_empty()
    }
}
