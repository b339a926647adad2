//! Crate-level error type.

use thiserror::Error;

use crate::address::AddressError;
use crate::network::NetworkError;
use crate::script::ScriptError;
use crate::wire::WireError;

/// Result type alias for decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the block decoder and the address/script codec.
///
/// Every failure is final: decoding is deterministic, so nothing is retried
/// and no partial block is returned.
#[derive(Debug, Error)]
pub enum Error {
    /// A fixed-width field ran past the end of the buffer.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The host transaction decoder failed.
    #[error("transaction decode failed: {0}")]
    TransactionDecode(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("script build failed: {0}")]
    ScriptBuild(#[from] ScriptError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Whether the input ended before a fixed-width field.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::Wire(WireError::TruncatedInput { .. }))
    }
}
