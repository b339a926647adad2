//! Forward-only byte cursor over a raw block buffer.

use thiserror::Error;

/// Errors raised while reading fixed-width fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Fewer bytes remain than the field requires.
    #[error("truncated input reading {field}: need {needed} bytes, {available} available")]
    TruncatedInput {
        field: &'static str,
        needed: usize,
        available: usize,
    },
    /// Non-canonical compact size encoding.
    #[error("non-canonical compact size for {field}")]
    NonCanonicalCompactSize { field: &'static str },
}

/// Little-endian reader that never seeks backwards.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Take the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], WireError> {
        let available = self.remaining();
        if available < n {
            return Err(WireError::TruncatedInput {
                field,
                needed: n,
                available,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, field)?);
        Ok(out)
    }

    /// Advance past `n` bytes without interpreting them.
    pub fn skip(&mut self, n: usize, field: &'static str) -> Result<(), WireError> {
        self.read_bytes(n, field).map(|_| ())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, WireError> {
        Ok(self.read_array::<1>(field)?[0])
    }

    pub fn read_u16_le(&mut self, field: &'static str) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_u32_le(&mut self, field: &'static str) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_i32_le(&mut self, field: &'static str) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_u64_le(&mut self, field: &'static str) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array(field)?))
    }

    /// Read a Bitcoin compact size (VarInt).
    ///
    /// - 0x00-0xfc: the byte itself
    /// - 0xfd: followed by a u16
    /// - 0xfe: followed by a u32
    /// - 0xff: followed by a u64
    ///
    /// Values that would fit a shorter form are rejected.
    pub fn read_compact_size(&mut self, field: &'static str) -> Result<u64, WireError> {
        let (value, min) = match self.read_u8(field)? {
            0xfd => (self.read_u16_le(field)? as u64, 0xfd),
            0xfe => (self.read_u32_le(field)? as u64, 0x1_0000),
            0xff => (self.read_u64_le(field)?, 0x1_0000_0000),
            n => return Ok(n as u64),
        };
        if value < min {
            return Err(WireError::NonCanonicalCompactSize { field });
        }
        Ok(value)
    }
}
