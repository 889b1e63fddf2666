//! GUID codec.
//!
//! GUIDs are stored in CHAR(16) CHARACTER SET OCTETS columns in network byte
//! order (RFC 4122 layout). Hosts that keep GUIDs in the mixed-endian layout
//! (first group of 4 bytes and the next two groups of 2 bytes little-endian)
//! convert with [`swap_mixed_endian`], which is its own inverse.

use crate::error::{Error, Result};
use uuid::Uuid;

/// Decode 16 wire bytes into a UUID.
pub fn decode_guid(data: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(data)
        .map_err(|_| Error::type_conversion(format!("GUID must be 16 bytes, got {}", data.len())))
}

/// Encode a UUID as 16 wire bytes.
pub fn encode_guid(value: &Uuid) -> [u8; 16] {
    *value.as_bytes()
}

/// Flip between network order and the mixed-endian host layout.
pub fn swap_mixed_endian(bytes: [u8; 16]) -> [u8; 16] {
    let mut out = bytes;
    out[0..4].reverse();
    out[4..6].reverse();
    out[6..8].reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_is_involution() {
        let raw: [u8; 16] = core::array::from_fn(|i| i as u8);
        let swapped = swap_mixed_endian(raw);
        assert_eq!(
            swapped,
            [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15]
        );
        assert_eq!(swap_mixed_endian(swapped), raw);
    }

    #[test]
    fn test_swap_matches_uuid_le_layout() {
        let id = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        assert_eq!(swap_mixed_endian(encode_guid(&id)), id.to_bytes_le());
    }

    #[test]
    fn test_decode_guid() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(decode_guid(&encode_guid(&id)).unwrap(), id);
        assert!(decode_guid(&[0u8; 15]).is_err());
    }
}
