//! Scaled integer (NUMERIC/DECIMAL) and INT128 codecs.
//!
//! Exact numerics travel as an integer of the column width plus the column's
//! negative scale: `12345` with scale `-2` is `123.45`.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Largest scale `Decimal` can hold.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Decode a scaled integer into a decimal.
///
/// `sql_type` selects the magnitude width the value came from; floating
/// point sources go through [`decimal_from_f64`] instead.
pub fn decode_decimal(value: i128, scale: i32, sql_type: i32) -> Result<Decimal> {
    match sql_type & !1 {
        SQL_SHORT | SQL_LONG | SQL_INT64 | SQL_QUAD | SQL_INT128 => {}
        other => {
            return Err(Error::type_conversion(format!(
                "SQL type {} is not a scaled integer",
                other
            )))
        }
    }

    if scale <= 0 {
        let shift = scale.unsigned_abs();
        if shift > MAX_DECIMAL_SCALE {
            return Err(Error::overflow(format!("scale {} out of range", scale)));
        }
        Decimal::try_from_i128_with_scale(value, shift)
            .map_err(|e| Error::overflow(format!("{} with scale {}: {}", value, scale, e)))
    } else {
        let base = Decimal::try_from_i128_with_scale(value, 0)
            .map_err(|e| Error::overflow(e.to_string()))?;
        base.checked_mul(pow10(scale as u32)?)
            .ok_or_else(|| Error::overflow(format!("{}e{}", value, scale)))
    }
}

/// Convert a floating point column value carrying a scale into a decimal.
pub fn decimal_from_f64(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| Error::overflow(format!("{} does not fit a decimal", value)))
}

/// Encode a decimal as the scaled integer for a column of `sql_type` and `scale`.
///
/// The value is multiplied by `10^-scale` and truncated toward zero.
///
/// # Errors
/// Returns `Error::Overflow` if the scaled integer does not fit the column width.
pub fn encode_decimal(value: Decimal, scale: i32, sql_type: i32) -> Result<i128> {
    let scaled = if scale <= 0 {
        value.checked_mul(pow10(scale.unsigned_abs())?)
    } else {
        value.checked_div(pow10(scale as u32)?)
    }
    .ok_or_else(|| Error::overflow(format!("{} at scale {}", value, scale)))?;

    let integer = scaled
        .trunc()
        .to_i128()
        .ok_or_else(|| Error::overflow(format!("{} at scale {}", value, scale)))?;

    check_width(integer, sql_type)?;
    Ok(integer)
}

/// Check that `value` fits the integer width of `sql_type`.
pub fn check_width(value: i128, sql_type: i32) -> Result<()> {
    let fits = match sql_type & !1 {
        SQL_SHORT => i16::try_from(value).is_ok(),
        SQL_LONG => i32::try_from(value).is_ok(),
        SQL_INT64 | SQL_QUAD => i64::try_from(value).is_ok(),
        SQL_INT128 => true,
        other => {
            return Err(Error::type_conversion(format!(
                "SQL type {} is not a scaled integer",
                other
            )))
        }
    };
    if fits {
        Ok(())
    } else {
        Err(Error::overflow(format!(
            "{} does not fit SQL type {}",
            value,
            sql_type & !1
        )))
    }
}

fn pow10(exp: u32) -> Result<Decimal> {
    if exp > MAX_DECIMAL_SCALE {
        return Err(Error::overflow(format!("10^{} out of range", exp)));
    }
    Ok(Decimal::from_i128_with_scale(10i128.pow(exp), 0))
}

/// Decode a big-endian two's complement INT128.
pub fn decode_int128(data: &[u8]) -> Result<i128> {
    let bytes: [u8; 16] = data.try_into().map_err(|_| {
        Error::protocol(format!("INT128 must be 16 bytes, got {}", data.len()))
    })?;
    Ok(i128::from_be_bytes(bytes))
}

/// Encode an INT128 as 16 big-endian bytes.
pub fn encode_int128(value: i128) -> [u8; 16] {
    value.to_be_bytes()
}
