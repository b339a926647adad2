//! Zettelkasten block header and block decoding.
//!
//! The header is the Bitcoin header with an 8-byte timestamp, followed by a
//! 32-byte whole-block hash and a 65-byte miner signature. Neither trailing
//! field is interpreted; the transaction list starts right after them.

use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::hash_to_display_hex;
use crate::wire::ByteReader;

/// Size of the whole-block hash field.
pub const WHOLE_BLOCK_HASH_SIZE: usize = 32;

/// Size of the miner signature field.
pub const MINER_SIGNATURE_SIZE: usize = 65;

/// Bytes consumed before the transaction list begins.
pub const HEADER_REGION_SIZE: usize =
    4 + 32 + 32 + 8 + 4 + 4 + WHOLE_BLOCK_HASH_SIZE + MINER_SIGNATURE_SIZE;

/// Decoded Zettelkasten block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time, 8 bytes on the wire).
    pub timestamp: u64,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Read the header region, leaving `reader` at the transaction list.
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self> {
        let version = reader.read_i32_le("version")?;
        let prev_block_hash = reader.read_array("prev_block_hash")?;
        let merkle_root = reader.read_array("merkle_root")?;
        let timestamp = reader.read_u64_le("timestamp")?;
        let bits = reader.read_u32_le("bits")?;
        let nonce = reader.read_u32_le("nonce")?;

        reader.skip(WHOLE_BLOCK_HASH_SIZE, "whole_block_hash")?;
        reader.skip(MINER_SIGNATURE_SIZE, "miner_signature")?;

        Ok(BlockHeader {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
        })
    }

    /// Block time as signed seconds since the epoch.
    pub fn time(&self) -> i64 {
        self.timestamp as i64
    }

    /// Previous block hash in display (reversed) hex.
    pub fn prev_block_hash_hex(&self) -> String {
        hash_to_display_hex(&self.prev_block_hash)
    }

    /// Merkle root in display (reversed) hex.
    pub fn merkle_root_hex(&self) -> String {
        hash_to_display_hex(&self.merkle_root)
    }

    /// Serialize the full header region.
    pub fn serialize(
        &self,
        whole_block_hash: &[u8; WHOLE_BLOCK_HASH_SIZE],
        miner_signature: &[u8; MINER_SIGNATURE_SIZE],
    ) -> [u8; HEADER_REGION_SIZE] {
        let mut header = [0u8; HEADER_REGION_SIZE];

        // Version (4 bytes, little-endian)
        header[0..4].copy_from_slice(&self.version.to_le_bytes());

        // Previous block hash (32 bytes, internal byte order)
        header[4..36].copy_from_slice(&self.prev_block_hash);

        // Merkle root (32 bytes)
        header[36..68].copy_from_slice(&self.merkle_root);

        // Timestamp (8 bytes, little-endian)
        header[68..76].copy_from_slice(&self.timestamp.to_le_bytes());

        // Bits (4 bytes, little-endian)
        header[76..80].copy_from_slice(&self.bits.to_le_bytes());

        // Nonce (4 bytes, little-endian)
        header[80..84].copy_from_slice(&self.nonce.to_le_bytes());

        header[84..116].copy_from_slice(whole_block_hash);
        header[116..181].copy_from_slice(miner_signature);

        header
    }
}

/// How the transaction decoder should treat segwit markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessMode {
    /// Legacy serialization only.
    Base,
    /// Accept the segwit marker and witness data.
    Witness,
}

/// Host-supplied transaction list codec.
///
/// The block decoder hands over the reader positioned at the transaction
/// list and converts every decoded transaction with
/// [`tx_from_wire`](Self::tx_from_wire).
pub trait TransactionDecoder {
    /// Transaction as decoded from the wire.
    type Wire;
    /// Host representation of a transaction.
    type Tx;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Decode a varint-prefixed transaction list into `out`.
    fn decode_transactions(
        &self,
        reader: &mut ByteReader<'_>,
        start_sequence: u32,
        mode: WitnessMode,
        out: &mut Vec<Self::Wire>,
    ) -> std::result::Result<(), Self::Error>;

    /// Convert a wire transaction; `coinbase_only` selects the coinbase fast
    /// path.
    fn tx_from_wire(&self, tx: Self::Wire, coinbase_only: bool) -> Self::Tx;
}

/// A decoded block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<T> {
    pub header: BlockHeader,
    /// Size of the raw block in bytes.
    pub size: usize,
    /// Block time, seconds since the epoch.
    pub time: i64,
    /// Transactions in block order.
    pub txs: Vec<T>,
}

/// Decode only the header region of a raw block.
///
/// Returns the header and the offset where the transaction list starts.
pub fn decode_block_header(raw: &[u8]) -> Result<(BlockHeader, usize)> {
    let mut reader = ByteReader::new(raw);
    let header = BlockHeader::decode(&mut reader)?;

    debug!(
        version = header.version,
        time = header.time(),
        bits = header.bits,
        "decoded block header"
    );

    Ok((header, reader.position()))
}

/// Decode a raw block, delegating the transaction list to `decoder`.
pub fn decode_block<D>(raw: &[u8], decoder: &D) -> Result<Block<D::Tx>>
where
    D: TransactionDecoder,
{
    let mut reader = ByteReader::new(raw);
    let header = BlockHeader::decode(&mut reader)?;

    let mut wire = Vec::new();
    decoder
        .decode_transactions(&mut reader, 0, WitnessMode::Witness, &mut wire)
        .map_err(|e| Error::TransactionDecode(Box::new(e)))?;

    let txs: Vec<D::Tx> = wire
        .into_iter()
        .map(|tx| decoder.tx_from_wire(tx, false))
        .collect();

    debug!(size = raw.len(), txs = txs.len(), time = header.time(), "decoded block");

    Ok(Block {
        time: header.time(),
        header,
        size: raw.len(),
        txs,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::wire::WireError;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RawTx(pub Vec<u8>);

    #[derive(Debug, Clone, PartialEq)]
    pub struct HostTx {
        pub hex: String,
        pub coinbase_only: bool,
    }

    /// Reads a compact-size count followed by `count` records of a u32
    /// length and that many opaque bytes.
    #[derive(Debug, Default)]
    pub struct LengthPrefixedDecoder {
        pub calls: RefCell<Vec<(usize, u32, WitnessMode)>>,
    }

    impl TransactionDecoder for LengthPrefixedDecoder {
        type Wire = RawTx;
        type Tx = HostTx;
        type Error = WireError;

        fn decode_transactions(
            &self,
            reader: &mut ByteReader<'_>,
            start_sequence: u32,
            mode: WitnessMode,
            out: &mut Vec<RawTx>,
        ) -> std::result::Result<(), WireError> {
            self.calls
                .borrow_mut()
                .push((reader.position(), start_sequence, mode));

            let count = reader.read_compact_size("tx_count")?;
            for _ in 0..count {
                let len = reader.read_u32_le("tx_len")? as usize;
                out.push(RawTx(reader.read_bytes(len, "tx")?.to_vec()));
            }
            Ok(())
        }

        fn tx_from_wire(&self, tx: RawTx, coinbase_only: bool) -> HostTx {
            HostTx {
                hex: hex::encode(tx.0),
                coinbase_only,
            }
        }
    }

    pub fn sample_header() -> BlockHeader {
        BlockHeader {
            version: 0x2000_0000,
            prev_block_hash: [0x12; 32],
            merkle_root: [0x34; 32],
            timestamp: 1_529_535_924,
            bits: 0x1d00ffff,
            nonce: 0xdeadbeef,
        }
    }

    pub fn sample_block(txs: &[&[u8]]) -> Vec<u8> {
        let mut raw = sample_header()
            .serialize(&[0xaa; WHOLE_BLOCK_HASH_SIZE], &[0xbb; MINER_SIGNATURE_SIZE])
            .to_vec();
        raw.push(txs.len() as u8);
        for tx in txs {
            raw.extend_from_slice(&(tx.len() as u32).to_le_bytes());
            raw.extend_from_slice(tx);
        }
        raw
    }

    #[test]
    fn test_header_region_size() {
        assert_eq!(HEADER_REGION_SIZE, 181);
    }

    #[test]
    fn test_header_serialization() {
        let header = sample_header();
        let serialized = header.serialize(&[0u8; 32], &[0u8; 65]);

        // Version (0x20000000 in little-endian)
        assert_eq!(&serialized[0..4], &[0x00, 0x00, 0x00, 0x20]);
        assert_eq!(&serialized[4..36], &[0x12; 32]);
        assert_eq!(&serialized[36..68], &[0x34; 32]);
        // 8-byte timestamp
        assert_eq!(&serialized[68..76], &1_529_535_924u64.to_le_bytes());
        // Nonce (0xDEADBEEF in little-endian)
        assert_eq!(&serialized[80..84], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_decode_header_region() {
        let raw = sample_block(&[]);
        let (header, offset) = decode_block_header(&raw).unwrap();

        assert_eq!(header, sample_header());
        assert_eq!(offset, HEADER_REGION_SIZE);
        assert_eq!(header.time(), 1_529_535_924);
        assert_eq!(header.prev_block_hash_hex(), "12".repeat(32));
    }

    #[test]
    fn test_decode_block() {
        let raw = sample_block(&[&[0x01, 0x02][..], &[0x03][..]]);
        let decoder = LengthPrefixedDecoder::default();
        let block = decode_block(&raw, &decoder).unwrap();

        assert_eq!(block.size, raw.len());
        assert_eq!(block.time, 1_529_535_924);
        assert_eq!(block.header, sample_header());
        assert_eq!(
            block.txs,
            vec![
                HostTx { hex: "0102".into(), coinbase_only: false },
                HostTx { hex: "03".into(), coinbase_only: false },
            ]
        );
    }

    #[test]
    fn test_decoder_starts_after_header_region() {
        let raw = sample_block(&[]);
        let decoder = LengthPrefixedDecoder::default();
        decode_block(&raw, &decoder).unwrap();

        assert_eq!(
            decoder.calls.borrow().as_slice(),
            &[(HEADER_REGION_SIZE, 0, WitnessMode::Witness)]
        );
    }

    #[test]
    fn test_truncated_header() {
        let raw = sample_block(&[]);
        for k in [0, 3, 4, 80, 84, 115, 116, 180] {
            let result = decode_block_header(&raw[..k]);
            assert!(
                matches!(result, Err(Error::Wire(WireError::TruncatedInput { .. }))),
                "prefix of {} bytes should be truncated",
                k
            );
        }
    }

    #[test]
    fn test_truncated_miner_signature_names_field() {
        let raw = sample_block(&[]);
        let err = decode_block_header(&raw[..150]).unwrap_err();

        assert!(matches!(
            err,
            Error::Wire(WireError::TruncatedInput {
                field: "miner_signature",
                needed: 65,
                available: 34,
            })
        ));
    }

    #[test]
    fn test_transaction_error_rejects_block() {
        let mut raw = sample_block(&[&[0x01, 0x02, 0x03][..]]);
        raw.truncate(raw.len() - 1);
        let decoder = LengthPrefixedDecoder::default();

        let err = decode_block(&raw, &decoder).unwrap_err();
        assert!(matches!(err, Error::TransactionDecode(_)));
    }

    #[test]
    fn test_timestamp_wraps_to_signed() {
        let mut header = sample_header();
        header.timestamp = u64::MAX;
        assert_eq!(header.time(), -1);
    }
}
