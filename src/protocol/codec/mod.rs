//! Binary value codecs.
//!
//! Pure conversions between wire representations and Rust values; none of
//! these functions keep state or touch the connection.

pub mod date;
pub mod decfloat;
pub mod guid;
pub mod number;

pub use date::{
    decode_date, decode_time, decode_timestamp, encode_date, encode_time, encode_timestamp,
};
pub use decfloat::{decode_decfloat, encode_decfloat, DecFloatKind, FbDecFloat, DECIMAL128, DECIMAL64};
pub use guid::{decode_guid, encode_guid, swap_mixed_endian};
pub use number::{
    check_width, decimal_from_f64, decode_decimal, decode_int128, encode_decimal, encode_int128,
};

/// Decode a BOOLEAN byte.
pub fn decode_boolean(byte: u8) -> bool {
    byte != 0
}

/// Split a SQL_VARYING native value (2-byte little-endian length prefix).
pub fn decode_varying(data: &[u8]) -> crate::error::Result<&[u8]> {
    if data.len() < 2 {
        return Err(crate::error::Error::protocol("VARYING value shorter than its prefix"));
    }
    let len = u16::from_le_bytes([data[0], data[1]]) as usize;
    data.get(2..2 + len)
        .ok_or_else(|| crate::error::Error::protocol(format!("VARYING length {} exceeds data", len)))
}

/// Build a SQL_VARYING native value.
pub fn encode_varying(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}
