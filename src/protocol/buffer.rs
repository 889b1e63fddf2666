//! Buffer utilities for reading response data and info buffers.
//!
//! Info buffers (`op_info_sql`, `op_info_blob`, segment data) are clumplets of
//! `item, length(u16 LE), value` where integers use the little-endian "VAX"
//! encoding. Everything else the server sends is XDR (big-endian).

use crate::error::{Error, Result};
use bytes::Bytes;

/// A cursor over a received byte buffer.
pub struct ReadBuffer {
    data: Bytes,
    pos: usize,
}

impl ReadBuffer {
    /// Create a new read buffer from bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Get the current position in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the remaining bytes in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if the buffer has at least `n` bytes remaining.
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Get a slice of the remaining data.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[track_caller]
    fn ensure(&self, n: usize) -> Result<()> {
        if !self.has_remaining(n) {
            return Err(Error::BufferTooSmall {
                needed: n,
                available: self.remaining(),
                location: std::panic::Location::caller(),
            });
        }
        Ok(())
    }

    /// Skip `n` bytes.
    #[track_caller]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read a single byte.
    #[track_caller]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let val = self.data[self.pos];
        self.pos += 1;
        Ok(val)
    }

    /// Read a little-endian u16 (clumplet length).
    #[track_caller]
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let val = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(val)
    }

    /// Read a big-endian i32.
    #[track_caller]
    pub fn read_i32_be(&mut self) -> Result<i32> {
        self.ensure(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(i32::from_be_bytes(bytes))
    }

    /// Read a little-endian signed integer of `len` bytes.
    #[track_caller]
    pub fn read_vax(&mut self, len: usize) -> Result<i64> {
        self.ensure(len)?;
        let val = vax_integer(&self.data[self.pos..self.pos + len]);
        self.pos += len;
        Ok(val)
    }

    /// Read a clumplet value: u16 LE length followed by a VAX integer.
    #[track_caller]
    pub fn read_clumplet_int(&mut self) -> Result<i64> {
        let len = self.read_u16_le()? as usize;
        self.read_vax(len)
    }

    /// Read a clumplet value: u16 LE length followed by raw bytes.
    #[track_caller]
    pub fn read_clumplet_bytes(&mut self) -> Result<Bytes> {
        let len = self.read_u16_le()? as usize;
        self.read_bytes(len)
    }

    /// Read raw bytes.
    #[track_caller]
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }
}

/// Decode a little-endian signed integer of up to 8 bytes.
pub fn vax_integer(bytes: &[u8]) -> i64 {
    if bytes.is_empty() || bytes.len() > 8 {
        return 0;
    }
    let mut val: i64 = 0;
    for (shift, b) in bytes.iter().enumerate() {
        val |= (*b as i64) << (shift * 8);
    }
    // Sign-extend from the top byte
    let bits = bytes.len() * 8;
    if bits < 64 && (val >> (bits - 1)) & 1 == 1 {
        val -= 1i64 << bits;
    }
    val
}

/// Append a clumplet with a 4-byte VAX integer value.
pub fn write_clumplet_int(buf: &mut Vec<u8>, item: u8, value: i32) {
    buf.push(item);
    buf.extend_from_slice(&4u16.to_le_bytes());
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append a clumplet with raw bytes.
pub fn write_clumplet_bytes(buf: &mut Vec<u8>, item: u8, value: &[u8]) {
    buf.push(item);
    buf.extend_from_slice(&(value.len() as u16).to_le_bytes());
    buf.extend_from_slice(value);
}
