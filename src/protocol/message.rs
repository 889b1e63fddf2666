//! Message traits and XDR builders for request serialization.
//!
//! Requests implement the `Message` trait, which reports the exact wire size
//! so a request is serialized into a single allocation before it is written
//! to the connection.
//!
//! XDR rules: integers are big-endian, every item occupies a multiple of four
//! bytes, and variable-length data is sent as a 32-bit length followed by the
//! bytes and zero padding.

use crate::error::Result;

// ============================================================================
// Core Traits
// ============================================================================

/// A request that can calculate its wire size and serialize to bytes.
pub trait Message {
    /// Operation code written first.
    fn operation(&self) -> i32;

    /// Serialized size in bytes, operation code included.
    fn wire_size(&self) -> usize;

    /// Write the whole request, operation code included.
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()>;
}

// ============================================================================
// Size Calculation Helpers
// ============================================================================

/// Padding needed to bring `len` up to a 4-byte boundary.
#[inline]
pub const fn xdr_pad(len: usize) -> usize {
    (4 - (len & 3)) & 3
}

/// Wire size of opaque data of `len` bytes (no length prefix).
#[inline]
pub const fn opaque_wire_size(len: usize) -> usize {
    len + xdr_pad(len)
}

/// Wire size of a length-prefixed buffer of `len` bytes.
#[inline]
pub const fn buffer_wire_size(len: usize) -> usize {
    4 + opaque_wire_size(len)
}

// ============================================================================
// Write Helpers
// ============================================================================

/// Extension trait for writing XDR data to `Vec<u8>`.
pub trait WriteExt {
    /// Write a big-endian i32.
    fn write_i32(&mut self, val: i32);

    /// Write a big-endian u32.
    fn write_u32(&mut self, val: u32);

    /// Write a big-endian i64.
    fn write_i64(&mut self, val: i64);

    /// Write a big-endian f32.
    fn write_f32(&mut self, val: f32);

    /// Write a big-endian f64.
    fn write_f64(&mut self, val: f64);

    /// Write padding zeros for data of `len` bytes.
    fn write_pad(&mut self, len: usize);

    /// Write opaque bytes followed by padding.
    fn write_opaque(&mut self, bytes: &[u8]);

    /// Write opaque bytes into a fixed-length slot, filling with `fill`.
    fn write_opaque_fixed(&mut self, bytes: &[u8], length: usize, fill: u8);

    /// Write a length-prefixed buffer.
    fn write_buffer(&mut self, bytes: &[u8]);

    /// Write a boolean as one byte plus padding.
    fn write_boolean(&mut self, val: bool);
}

impl WriteExt for Vec<u8> {
    #[inline]
    fn write_i32(&mut self, val: i32) {
        self.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    fn write_u32(&mut self, val: u32) {
        self.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    fn write_i64(&mut self, val: i64) {
        self.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    fn write_f32(&mut self, val: f32) {
        self.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    fn write_f64(&mut self, val: f64) {
        self.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    fn write_pad(&mut self, len: usize) {
        self.resize(self.len() + xdr_pad(len), 0);
    }

    fn write_opaque(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
        self.write_pad(bytes.len());
    }

    fn write_opaque_fixed(&mut self, bytes: &[u8], length: usize, fill: u8) {
        let n = bytes.len().min(length);
        self.extend_from_slice(&bytes[..n]);
        self.resize(self.len() + (length - n), fill);
        self.write_pad(length);
    }

    fn write_buffer(&mut self, bytes: &[u8]) {
        self.write_i32(bytes.len() as i32);
        self.write_opaque(bytes);
    }

    #[inline]
    fn write_boolean(&mut self, val: bool) {
        self.write_opaque(&[u8::from(val)]);
    }
}

// ============================================================================
// Tests
// ============================================================================
