//! Address encoding and decoding.
//!
//! Supports:
//! - Base58Check P2PKH / P2SH addresses, classified by version byte against
//!   every registered network (mainnet P2PKH addresses start with `Z`)
//! - Bech32 (witness v0) and Bech32m (witness v1) addresses for any
//!   registered human-readable part
//! - Hex-serialized public keys (33 or 65 bytes), decode only

use thiserror::Error;

use crate::hash::double_sha256;
use crate::network::NetworkRegistry;

/// Address decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Invalid address format
    #[error("invalid address format")]
    InvalidFormat,
    /// Invalid Base58 character
    #[error("invalid base58 character: {0}")]
    InvalidBase58Char(char),
    /// Invalid checksum
    #[error("invalid checksum")]
    InvalidChecksum,
    /// Invalid Bech32 encoding
    #[error("invalid bech32 encoding: {0}")]
    InvalidBech32(String),
    /// Invalid witness version
    #[error("invalid witness version: {0}")]
    InvalidWitnessVersion(u8),
    /// Invalid witness program length
    #[error("invalid witness program length: {0}")]
    InvalidWitnessProgramLength(usize),
    /// Version byte not registered by any network
    #[error("unknown address type for version byte {0}")]
    UnknownAddressType(u8),
    /// Version byte is both a P2PKH and a P2SH prefix
    #[error("version byte {0} is ambiguous between P2PKH and P2SH")]
    AddressCollision(u8),
    /// Malformed hex public key
    #[error("invalid public key")]
    InvalidPublicKey,
    /// Valid encoding of an address kind this codec does not handle
    #[error("unsupported address type")]
    UnsupportedType,
}

/// What an address pays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    /// Base58 P2PKH: 20-byte public key hash
    PubKeyHash,
    /// Base58 P2SH: 20-byte script hash
    ScriptHash,
    /// Witness v0, 20-byte program
    WitnessPubKeyHash,
    /// Witness v0, 32-byte program
    WitnessScriptHash,
    /// Witness v1, 32-byte x-only key
    Taproot,
    /// Raw serialized public key
    PubKey,
}

impl AddressClass {
    pub fn name(&self) -> &'static str {
        match self {
            AddressClass::PubKeyHash => "P2PKH",
            AddressClass::ScriptHash => "P2SH",
            AddressClass::WitnessPubKeyHash => "P2WPKH",
            AddressClass::WitnessScriptHash => "P2WSH",
            AddressClass::Taproot => "P2TR",
            AddressClass::PubKey => "P2PK",
        }
    }
}

/// A decoded address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    pub class: AddressClass,
    /// Hash, witness program or serialized key carried by the address.
    pub payload: Vec<u8>,
    /// Version byte for base58 addresses.
    pub prefix: Option<u8>,
    /// The original address string.
    pub display: String,
}

impl DecodedAddress {
    /// Bytes an output script pushes to pay this address.
    pub fn script_address(&self) -> &[u8] {
        &self.payload
    }
}

/// Decode an address string.
///
/// Version bytes and bech32 prefixes are accepted from any network in
/// `registry`, not only the caller's own.
pub fn decode_address(address: &str, registry: &NetworkRegistry) -> Result<DecodedAddress, AddressError> {
    if let Some(sep) = address.rfind('1') {
        if sep > 1 && registry.is_segwit_hrp(&address[..sep]) {
            return decode_segwit_address(address);
        }
    }

    if address.len() == 66 || address.len() == 130 {
        return decode_pubkey_address(address);
    }

    decode_base58_address(address, registry)
}

fn decode_base58_address(address: &str, registry: &NetworkRegistry) -> Result<DecodedAddress, AddressError> {
    let (prefix, hash) = decode_base58check(address)?;

    if hash.len() != 20 {
        return Err(AddressError::InvalidFormat);
    }

    let class = registry.address_class(prefix)?;

    Ok(DecodedAddress {
        class,
        payload: hash,
        prefix: Some(prefix),
        display: address.to_string(),
    })
}

fn decode_segwit_address(address: &str) -> Result<DecodedAddress, AddressError> {
    let (_hrp, data, variant) = bech32_decode(address)?;

    if data.is_empty() {
        return Err(AddressError::InvalidFormat);
    }

    // First 5-bit group is the witness version
    let witness_version = data[0];
    let program = convert_bits(&data[1..], 5, 8, false)?;

    match witness_version {
        0 => {
            if variant != Bech32Variant::Bech32 {
                return Err(AddressError::InvalidBech32("witness v0 must use bech32".into()));
            }
        }
        1..=16 => {
            if variant != Bech32Variant::Bech32m {
                return Err(AddressError::InvalidBech32("witness v1+ must use bech32m".into()));
            }
        }
        _ => return Err(AddressError::InvalidWitnessVersion(witness_version)),
    }

    let class = match (witness_version, program.len()) {
        (0, 20) => AddressClass::WitnessPubKeyHash,
        (0, 32) => AddressClass::WitnessScriptHash,
        (1, 32) => AddressClass::Taproot,
        (v, len) if v > 0 && (2..=40).contains(&len) => return Err(AddressError::UnsupportedType),
        (_, len) => return Err(AddressError::InvalidWitnessProgramLength(len)),
    };

    Ok(DecodedAddress {
        class,
        payload: program,
        prefix: None,
        display: address.to_string(),
    })
}

fn decode_pubkey_address(address: &str) -> Result<DecodedAddress, AddressError> {
    let key = hex::decode(address).map_err(|_| AddressError::InvalidPublicKey)?;

    let well_formed = match key.len() {
        33 => matches!(key[0], 0x02 | 0x03),
        65 => matches!(key[0], 0x04 | 0x06 | 0x07),
        _ => false,
    };
    if !well_formed {
        return Err(AddressError::InvalidPublicKey);
    }

    Ok(DecodedAddress {
        class: AddressClass::PubKey,
        payload: key,
        prefix: None,
        display: address.to_string(),
    })
}

// ============================================================================
// Base58Check
// ============================================================================

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Encode `payload` under a one-byte version prefix with a 4-byte
/// double-SHA256 checksum.
pub fn encode_base58check(prefix: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 5);
    data.push(prefix);
    data.extend_from_slice(payload);
    let checksum = double_sha256(&data);
    data.extend_from_slice(&checksum[..4]);
    base58_encode(&data)
}

/// Decode a base58check string into its version byte and payload.
pub fn decode_base58check(input: &str) -> Result<(u8, Vec<u8>), AddressError> {
    let decoded = base58_decode(input)?;

    if decoded.len() < 5 {
        return Err(AddressError::InvalidFormat);
    }

    let (body, checksum) = decoded.split_at(decoded.len() - 4);
    if checksum != &double_sha256(body)[..4] {
        return Err(AddressError::InvalidChecksum);
    }

    Ok((body[0], body[1..].to_vec()))
}

fn base58_encode(input: &[u8]) -> String {
    let leading_zeros = input.iter().take_while(|&&b| b == 0).count();

    // Little-endian base58 digits
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
    for &byte in &input[leading_zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            let temp = ((*digit as u32) << 8) + carry;
            *digit = (temp % 58) as u8;
            carry = temp / 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut result = String::with_capacity(leading_zeros + digits.len());
    result.extend(std::iter::repeat('1').take(leading_zeros));
    result.extend(digits.iter().rev().map(|&d| BASE58_ALPHABET[d as usize] as char));
    result
}

fn base58_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    let mut result = Vec::new();

    // Leading '1's become leading zeros
    let leading_zeros = input.chars().take_while(|&c| c == '1').count();

    for c in input.chars() {
        let value = BASE58_ALPHABET
            .iter()
            .position(|&x| x as char == c)
            .ok_or(AddressError::InvalidBase58Char(c))? as u32;

        // Multiply result by 58 and add value
        let mut carry = value;
        for byte in result.iter_mut().rev() {
            let temp = (*byte as u32) * 58 + carry;
            *byte = (temp & 0xFF) as u8;
            carry = temp >> 8;
        }

        while carry > 0 {
            result.insert(0, (carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    let mut final_result = vec![0u8; leading_zeros];
    final_result.extend(result);

    Ok(final_result)
}

// ============================================================================
// Bech32/Bech32m
// ============================================================================

const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const BECH32M_CONST: u32 = 0x2bc830a3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bech32Variant {
    Bech32,
    Bech32m,
}

impl Bech32Variant {
    fn constant(&self) -> u32 {
        match self {
            Bech32Variant::Bech32 => 1,
            Bech32Variant::Bech32m => BECH32M_CONST,
        }
    }
}

/// Encode a witness program as a segwit address.
///
/// Version 0 uses bech32, later versions bech32m.
pub fn encode_segwit_address(hrp: &str, witness_version: u8, program: &[u8]) -> String {
    let variant = if witness_version == 0 {
        Bech32Variant::Bech32
    } else {
        Bech32Variant::Bech32m
    };

    let mut data = Vec::with_capacity(1 + (program.len() * 8 + 4) / 5);
    data.push(witness_version);
    // Padding is always allowed when encoding
    data.extend(convert_bits(program, 8, 5, true).unwrap_or_default());

    let hrp = hrp.to_lowercase();
    let checksum = bech32_create_checksum(&hrp, &data, variant);

    let mut result = String::with_capacity(hrp.len() + 1 + data.len() + 6);
    result.push_str(&hrp);
    result.push('1');
    for &d in data.iter().chain(checksum.iter()) {
        result.push(BECH32_CHARSET.as_bytes()[d as usize] as char);
    }
    result
}

fn bech32_decode(input: &str) -> Result<(String, Vec<u8>, Bech32Variant), AddressError> {
    if input.chars().any(|c| c.is_ascii_lowercase()) && input.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AddressError::InvalidBech32("mixed case".into()));
    }
    let input_lower = input.to_lowercase();

    let sep_pos = input_lower
        .rfind('1')
        .ok_or(AddressError::InvalidBech32("no separator found".into()))?;

    if sep_pos == 0 || sep_pos + 7 > input_lower.len() || input_lower.len() > 90 {
        return Err(AddressError::InvalidBech32("invalid separator position".into()));
    }

    let hrp = &input_lower[..sep_pos];
    let data_part = &input_lower[sep_pos + 1..];

    let mut data = Vec::with_capacity(data_part.len());
    for c in data_part.chars() {
        let idx = BECH32_CHARSET
            .find(c)
            .ok_or(AddressError::InvalidBech32(format!("invalid character: {}", c)))?;
        data.push(idx as u8);
    }

    let checksum = bech32_polymod(&hrp_expand(hrp), &data);

    let variant = if checksum == Bech32Variant::Bech32.constant() {
        Bech32Variant::Bech32
    } else if checksum == Bech32Variant::Bech32m.constant() {
        Bech32Variant::Bech32m
    } else {
        return Err(AddressError::InvalidBech32("invalid checksum".into()));
    };

    // Drop the 6 checksum characters
    data.truncate(data.len() - 6);

    Ok((hrp.to_string(), data, variant))
}

fn bech32_create_checksum(hrp: &str, data: &[u8], variant: Bech32Variant) -> [u8; 6] {
    let mut values = data.to_vec();
    values.extend_from_slice(&[0u8; 6]);
    let polymod = bech32_polymod(&hrp_expand(hrp), &values) ^ variant.constant();

    let mut checksum = [0u8; 6];
    for (i, c) in checksum.iter_mut().enumerate() {
        *c = ((polymod >> (5 * (5 - i))) & 31) as u8;
    }
    checksum
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(hrp.len() * 2 + 1);

    for c in hrp.bytes() {
        result.push(c >> 5);
    }
    result.push(0);
    for c in hrp.bytes() {
        result.push(c & 31);
    }

    result
}

fn bech32_polymod(hrp: &[u8], data: &[u8]) -> u32 {
    const GEN: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];

    let mut chk: u32 = 1;

    for &value in hrp.iter().chain(data.iter()) {
        let top = chk >> 25;
        chk = ((chk & 0x1ffffff) << 5) ^ (value as u32);
        for (i, &g) in GEN.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= g;
            }
        }
    }

    chk
}

fn convert_bits(data: &[u8], from_bits: u8, to_bits: u8, pad: bool) -> Result<Vec<u8>, AddressError> {
    let mut acc: u32 = 0;
    let mut bits: u8 = 0;
    let mut result = Vec::new();
    let max_value = (1u32 << to_bits) - 1;

    for &value in data {
        if (value as u32) >> from_bits != 0 {
            return Err(AddressError::InvalidBech32("invalid value in data".into()));
        }
        acc = (acc << from_bits) | (value as u32);
        bits += from_bits;

        while bits >= to_bits {
            bits -= to_bits;
            result.push(((acc >> bits) & max_value) as u8);
        }
    }

    if pad {
        if bits > 0 {
            result.push(((acc << (to_bits - bits)) & max_value) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & max_value) != 0 {
        return Err(AddressError::InvalidBech32("invalid padding".into()));
    }

    Ok(result)
}
