//! Output script construction and standard script-to-address resolution.

use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::address::{encode_base58check, encode_segwit_address};
use crate::hash::hash160;
use crate::network::NetworkParameters;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Largest data element a script may push.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Largest script the builder will produce.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Script construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("data element of {0} bytes exceeds the maximum of {max}", max = MAX_SCRIPT_ELEMENT_SIZE)]
    ElementTooLarge(usize),
    #[error("script of {0} bytes exceeds the maximum of {max}", max = MAX_SCRIPT_SIZE)]
    ScriptTooLarge(usize),
}

/// Incremental output script builder using canonical pushes.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single opcode.
    pub fn push_opcode(mut self, opcode: u8) -> Result<Self, ScriptError> {
        self.ensure_room(1)?;
        self.script.push(opcode);
        Ok(self)
    }

    /// Append a data push using the smallest encoding for `data`.
    pub fn push_slice(mut self, data: &[u8]) -> Result<Self, ScriptError> {
        if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::ElementTooLarge(data.len()));
        }

        match data {
            [] | [0] => return self.push_opcode(OP_0),
            [n @ 1..=16] => return self.push_opcode(OP_1 - 1 + n),
            [0x81] => return self.push_opcode(OP_1NEGATE),
            _ => {}
        }

        let len = data.len();
        let header_len = match len {
            0..=0x4b => 1,
            0x4c..=0xff => 2,
            _ => 3,
        };
        self.ensure_room(header_len + len)?;

        match len {
            // Direct push: the opcode is the length
            0..=0x4b => self.script.push(len as u8),
            0x4c..=0xff => {
                self.script.push(OP_PUSHDATA1);
                self.script.push(len as u8);
            }
            _ => {
                self.script.push(OP_PUSHDATA2);
                self.script.extend_from_slice(&(len as u16).to_le_bytes());
            }
        }
        self.script.extend_from_slice(data);
        Ok(self)
    }

    pub fn into_script(self) -> Vec<u8> {
        self.script
    }

    fn ensure_room(&self, extra: usize) -> Result<(), ScriptError> {
        let size = self.script.len() + extra;
        if size > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptTooLarge(size));
        }
        Ok(())
    }
}

/// Shape of an output script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
    PubKeyHash,
    /// OP_HASH160 <20> OP_EQUAL
    ScriptHash,
    /// OP_0 <20>
    WitnessPubKeyHash,
    /// OP_0 <32>
    WitnessScriptHash,
    /// OP_1 <32>
    Taproot,
    /// <33|65-byte key> OP_CHECKSIG
    PubKey,
    /// OP_m <keys..> OP_n OP_CHECKMULTISIG
    MultiSig,
    /// OP_RETURN ...
    NullData,
    NonStandard,
}

/// Classify an output script by its opcode pattern.
pub fn classify(script: &[u8]) -> ScriptClass {
    match script {
        [OP_DUP, OP_HASH160, 0x14, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20 => {
            ScriptClass::PubKeyHash
        }
        [OP_HASH160, 0x14, hash @ .., OP_EQUAL] if hash.len() == 20 => ScriptClass::ScriptHash,
        [OP_0, 0x14, program @ ..] if program.len() == 20 => ScriptClass::WitnessPubKeyHash,
        [OP_0, 0x20, program @ ..] if program.len() == 32 => ScriptClass::WitnessScriptHash,
        [OP_1, 0x20, program @ ..] if program.len() == 32 => ScriptClass::Taproot,
        [0x21, key @ .., OP_CHECKSIG] if key.len() == 33 && matches!(key[0], 0x02 | 0x03) => {
            ScriptClass::PubKey
        }
        [0x41, key @ .., OP_CHECKSIG] if key.len() == 65 && matches!(key[0], 0x04 | 0x06 | 0x07) => {
            ScriptClass::PubKey
        }
        [OP_RETURN, ..] => ScriptClass::NullData,
        _ if is_multisig(script) => ScriptClass::MultiSig,
        _ => ScriptClass::NonStandard,
    }
}

fn is_multisig(script: &[u8]) -> bool {
    let [m @ OP_1..=OP_16, keys @ .., n @ OP_1..=OP_16, OP_CHECKMULTISIG] = script else {
        return false;
    };
    let (required, total) = ((m - OP_1 + 1) as usize, (n - OP_1 + 1) as usize);
    if required > total {
        return false;
    }

    let mut count = 0;
    let mut rest = keys;
    while let [len @ (0x21 | 0x41), tail @ ..] = rest {
        let len = *len as usize;
        if tail.len() < len {
            return false;
        }
        count += 1;
        rest = &tail[len..];
    }
    rest.is_empty() && count == total
}

/// Describe an OP_RETURN output the way block explorers show it.
///
/// Accepts `OP_RETURN <len> <data>`, `OP_RETURN OP_PUSHDATA1 <len> <data>`
/// and `OP_RETURN OP_PUSHDATA2 <len16> <data>`. Returns `None` when the
/// declared length does not match the data.
pub fn parse_op_return(script: &[u8]) -> Option<String> {
    if script.len() < 2 || script[0] != OP_RETURN {
        return None;
    }

    let (declared, data) = match script[1] {
        OP_PUSHDATA1 if script.len() > 2 => {
            let declared = script[2] as usize;
            if declared == script.len() - 3 {
                (declared, &script[3..])
            } else {
                // OP_PUSHDATA1 may itself be a direct length of 0x4c
                (script[1] as usize, &script[2..])
            }
        }
        OP_PUSHDATA2 if script.len() > 3 => {
            (u16::from_le_bytes([script[2], script[3]]) as usize, &script[4..])
        }
        len => (len as usize, &script[2..]),
    };

    if declared != data.len() {
        return None;
    }

    let rendered = match std::str::from_utf8(data) {
        Ok(text) => format!("({})", text),
        Err(_) => hex::encode(data),
    };
    Some(format!("OP_RETURN {}", rendered))
}

/// Maps any output script to addresses.
///
/// Returns the addresses and whether the script is a standard
/// single-address form. Scripts it cannot address yield `(vec![], false)`.
pub trait StandardScriptResolver {
    fn script_to_addresses(&self, script: &[u8]) -> Result<(Vec<String>, bool), ScriptError>;
}

/// Resolver for the standard Bitcoin script set under a network's prefixes.
#[derive(Debug, Clone)]
pub struct BitcoinScriptResolver {
    params: Arc<NetworkParameters>,
}

impl BitcoinScriptResolver {
    pub fn new(params: Arc<NetworkParameters>) -> Self {
        BitcoinScriptResolver { params }
    }

    pub fn params(&self) -> &NetworkParameters {
        &self.params
    }
}

impl StandardScriptResolver for BitcoinScriptResolver {
    fn script_to_addresses(&self, script: &[u8]) -> Result<(Vec<String>, bool), ScriptError> {
        let params = &self.params;
        let class = classify(script);
        trace!(?class, len = script.len(), "resolving standard script");

        let resolved = match class {
            ScriptClass::PubKeyHash => (
                vec![encode_base58check(params.pubkey_hash_prefix, &script[3..23])],
                true,
            ),
            ScriptClass::ScriptHash => (
                vec![encode_base58check(params.script_hash_prefix, &script[2..22])],
                true,
            ),
            ScriptClass::WitnessPubKeyHash | ScriptClass::WitnessScriptHash => (
                vec![encode_segwit_address(&params.bech32_hrp, 0, &script[2..])],
                true,
            ),
            ScriptClass::Taproot => (
                vec![encode_segwit_address(&params.bech32_hrp, 1, &script[2..])],
                true,
            ),
            ScriptClass::PubKey => {
                let key = &script[1..script.len() - 1];
                (
                    vec![encode_base58check(params.pubkey_hash_prefix, &hash160(key))],
                    false,
                )
            }
            ScriptClass::NullData => (parse_op_return(script).into_iter().collect(), false),
            // Multisig has no single-address rendering here
            ScriptClass::MultiSig | ScriptClass::NonStandard => (Vec::new(), false),
        };

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;

    fn resolver() -> BitcoinScriptResolver {
        BitcoinScriptResolver::new(Arc::new(Network::Mainnet.params()))
    }

    fn script(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str).unwrap()
    }

    #[test]
    fn test_push_slice_direct() {
        let hash = [0xab; 20];
        let script = ScriptBuilder::new()
            .push_slice(&hash)
            .and_then(|b| b.push_opcode(OP_CHECKSIG))
            .unwrap()
            .into_script();

        assert_eq!(script.len(), 22);
        assert_eq!(script[0], 0x14);
        assert_eq!(&script[1..21], &hash);
        assert_eq!(script[21], OP_CHECKSIG);
    }

    #[test]
    fn test_push_slice_small_numbers() {
        let script = ScriptBuilder::new()
            .push_slice(&[])
            .and_then(|b| b.push_slice(&[0]))
            .and_then(|b| b.push_slice(&[5]))
            .and_then(|b| b.push_slice(&[16]))
            .and_then(|b| b.push_slice(&[0x81]))
            .and_then(|b| b.push_slice(&[17]))
            .unwrap()
            .into_script();

        assert_eq!(script, vec![OP_0, OP_0, 0x55, OP_16, OP_1NEGATE, 0x01, 17]);
    }

    #[test]
    fn test_push_slice_pushdata() {
        let script = ScriptBuilder::new().push_slice(&[7u8; 76]).unwrap().into_script();
        assert_eq!(&script[..2], &[OP_PUSHDATA1, 76]);
        assert_eq!(script.len(), 78);

        let script = ScriptBuilder::new().push_slice(&[7u8; 300]).unwrap().into_script();
        assert_eq!(&script[..3], &[OP_PUSHDATA2, 0x2c, 0x01]);
    }

    #[test]
    fn test_push_slice_too_large() {
        let result = ScriptBuilder::new().push_slice(&[0u8; MAX_SCRIPT_ELEMENT_SIZE + 1]);
        assert!(matches!(result, Err(ScriptError::ElementTooLarge(521))));
    }

    #[test]
    fn test_script_too_large() {
        let mut builder = ScriptBuilder::new();
        let mut failed = false;
        for _ in 0..40 {
            match builder.clone().push_slice(&[1u8; 500]) {
                Ok(b) => builder = b,
                Err(e) => {
                    assert!(matches!(e, ScriptError::ScriptTooLarge(_)));
                    failed = true;
                    break;
                }
            }
        }
        assert!(failed);
        assert!(builder.into_script().len() <= MAX_SCRIPT_SIZE);
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&script("76a9149f7db318cb93848108d3d6f91ce4517db50d5dd288ac")),
            ScriptClass::PubKeyHash
        );
        assert_eq!(
            classify(&script("a9149f7db318cb93848108d3d6f91ce4517db50d5dd287")),
            ScriptClass::ScriptHash
        );
        assert_eq!(
            classify(&script("0014751e76e8199196d454941c45d1b3a323f1433bd6")),
            ScriptClass::WitnessPubKeyHash
        );
        assert_eq!(classify(&script("6a0568656c6c6f")), ScriptClass::NullData);
        assert_eq!(classify(&script("51")), ScriptClass::NonStandard);
    }

    #[test]
    fn test_classify_multisig() {
        let key = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
        let one_of_two = format!("5121{key}21{key}52ae");
        assert_eq!(classify(&script(&one_of_two)), ScriptClass::MultiSig);

        let wrong_count = format!("5121{key}53ae");
        assert_eq!(classify(&script(&wrong_count)), ScriptClass::NonStandard);
    }

    #[test]
    fn test_resolve_p2pkh() {
        let (addresses, standard) = resolver()
            .script_to_addresses(&script("76a9149f7db318cb93848108d3d6f91ce4517db50d5dd288ac"))
            .unwrap();

        assert_eq!(addresses, vec!["ZqvAn4MEHxqHgk8WHHTm6jVxhRAX5Ag6wY"]);
        assert!(standard);
    }

    #[test]
    fn test_resolve_p2sh() {
        let (addresses, standard) = resolver()
            .script_to_addresses(&script("a9149f7db318cb93848108d3d6f91ce4517db50d5dd287"))
            .unwrap();

        assert_eq!(addresses, vec!["3GEKwohLLFchXoXvRQ9YFCpAs5aq68BcFD"]);
        assert!(standard);
    }

    #[test]
    fn test_resolve_witness() {
        let (addresses, standard) = resolver()
            .script_to_addresses(&script("0014751e76e8199196d454941c45d1b3a323f1433bd6"))
            .unwrap();

        assert_eq!(addresses, vec!["bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"]);
        assert!(standard);
    }

    #[test]
    fn test_resolve_p2pk() {
        let (addresses, standard) = resolver()
            .script_to_addresses(&script(
                "210279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798ac",
            ))
            .unwrap();

        assert_eq!(addresses, vec!["Zn48Jx2wsgPjPRV1Cm6971Ti6yJxgCpKbb"]);
        assert!(!standard);
    }

    #[test]
    fn test_resolve_multisig_unsupported() {
        let key = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
        let (addresses, standard) = resolver()
            .script_to_addresses(&script(&format!("5121{key}21{key}52ae")))
            .unwrap();

        assert!(addresses.is_empty());
        assert!(!standard);
    }

    #[test]
    fn test_op_return_text_and_hex() {
        assert_eq!(
            parse_op_return(&script("6a0568656c6c6f")).as_deref(),
            Some("OP_RETURN (hello)")
        );
        assert_eq!(
            parse_op_return(&script("6a02ff00")).as_deref(),
            Some("OP_RETURN ff00")
        );
        // declared length does not match
        assert_eq!(parse_op_return(&script("6a05ff00")), None);

        let (addresses, standard) = resolver()
            .script_to_addresses(&script("6a0568656c6c6f"))
            .unwrap();
        assert_eq!(addresses, vec!["OP_RETURN (hello)"]);
        assert!(!standard);
    }

    #[test]
    fn test_op_return_pushdata1() {
        let mut data = vec![OP_RETURN, OP_PUSHDATA1, 80];
        data.extend_from_slice(&[b'a'; 80]);
        let rendered = parse_op_return(&data).unwrap();
        assert_eq!(rendered, format!("OP_RETURN ({})", "a".repeat(80)));
    }
}
