//! DECFLOAT(16) / DECFLOAT(34) codec.
//!
//! Values are IEEE 754 decimal64 / decimal128 in densely packed decimal
//! (DPD) encoding, sent big-endian. Layout, most significant bit first:
//! sign (1), combination field (5), exponent continuation (8 / 12),
//! coefficient continuation as 10-bit declets (5 / 11).

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Special-value class of a decimal float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecFloatKind {
    Finite,
    Infinity,
    NaN,
    SignalingNaN,
}

/// A decoded DECFLOAT value: `(-1)^negative * coefficient * 10^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FbDecFloat {
    pub kind: DecFloatKind,
    pub negative: bool,
    pub coefficient: u128,
    pub exponent: i32,
}

/// Bit layout of one interchange format.
#[derive(Debug, Clone, Copy)]
pub struct DecFloatFormat {
    bytes: usize,
    exp_cont_bits: u32,
    declets: u32,
    bias: i32,
    digits: u32,
}

/// decimal64, used by DECFLOAT(16).
pub const DECIMAL64: DecFloatFormat = DecFloatFormat {
    bytes: 8,
    exp_cont_bits: 8,
    declets: 5,
    bias: 398,
    digits: 16,
};

/// decimal128, used by DECFLOAT(34).
pub const DECIMAL128: DecFloatFormat = DecFloatFormat {
    bytes: 16,
    exp_cont_bits: 12,
    declets: 11,
    bias: 6176,
    digits: 34,
};

impl DecFloatFormat {
    /// Size on the wire.
    pub fn size(&self) -> usize {
        self.bytes
    }

    /// Maximum number of coefficient digits.
    pub fn digits(&self) -> u32 {
        self.digits
    }

    fn total_bits(&self) -> u32 {
        self.bytes as u32 * 8
    }

    fn max_biased_exponent(&self) -> i32 {
        (3 << self.exp_cont_bits) - 1
    }
}

impl FbDecFloat {
    /// A finite value.
    pub fn finite(negative: bool, coefficient: u128, exponent: i32) -> Self {
        Self {
            kind: DecFloatKind::Finite,
            negative,
            coefficient,
            exponent,
        }
    }

    /// Positive or negative infinity.
    pub fn infinity(negative: bool) -> Self {
        Self {
            kind: DecFloatKind::Infinity,
            negative,
            coefficient: 0,
            exponent: 0,
        }
    }

    /// Quiet NaN.
    pub fn nan() -> Self {
        Self {
            kind: DecFloatKind::NaN,
            negative: false,
            coefficient: 0,
            exponent: 0,
        }
    }

    /// Whether the value is finite.
    pub fn is_finite(&self) -> bool {
        self.kind == DecFloatKind::Finite
    }

    /// Convert to a `Decimal`, truncating digits beyond its 28-digit scale.
    pub fn to_decimal(&self) -> Result<Decimal> {
        if !self.is_finite() {
            return Err(Error::type_conversion(format!(
                "{} cannot be represented as a decimal",
                self
            )));
        }

        let mut coefficient = self.coefficient;
        let mut exponent = self.exponent;
        while exponent < -28 {
            coefficient /= 10;
            exponent += 1;
        }
        while exponent > 0 {
            coefficient = coefficient
                .checked_mul(10)
                .ok_or_else(|| Error::overflow(self.to_string()))?;
            exponent -= 1;
        }

        let signed = i128::try_from(coefficient).map_err(|_| Error::overflow(self.to_string()))?;
        let signed = if self.negative { -signed } else { signed };
        Decimal::try_from_i128_with_scale(signed, exponent.unsigned_abs())
            .map_err(|_| Error::overflow(self.to_string()))
    }

    /// Convert from a `Decimal` (exact).
    pub fn from_decimal(value: Decimal) -> Self {
        Self::finite(
            value.is_sign_negative(),
            value.mantissa().unsigned_abs(),
            -(value.scale() as i32),
        )
    }

    /// Convert to `f64` (lossy).
    pub fn to_f64(&self) -> f64 {
        match self.kind {
            DecFloatKind::Infinity if self.negative => f64::NEG_INFINITY,
            DecFloatKind::Infinity => f64::INFINITY,
            DecFloatKind::NaN | DecFloatKind::SignalingNaN => f64::NAN,
            DecFloatKind::Finite => self.to_string().parse().unwrap_or(f64::NAN),
        }
    }
}

impl fmt::Display for FbDecFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        match self.kind {
            DecFloatKind::Infinity => return write!(f, "{}Infinity", sign),
            DecFloatKind::NaN => return write!(f, "{}NaN", sign),
            DecFloatKind::SignalingNaN => return write!(f, "{}sNaN", sign),
            DecFloatKind::Finite => {}
        }

        let digits = self.coefficient.to_string();
        let len = digits.len() as i32;
        let adjusted = self.exponent + len - 1;

        if self.exponent <= 0 && adjusted >= -6 {
            if self.exponent == 0 {
                return write!(f, "{}{}", sign, digits);
            }
            let point = len + self.exponent;
            if point > 0 {
                let (int, frac) = digits.split_at(point as usize);
                write!(f, "{}{}.{}", sign, int, frac)
            } else {
                let zeros = "0".repeat((-point) as usize);
                write!(f, "{}0.{}{}", sign, zeros, digits)
            }
        } else {
            let (first, rest) = digits.split_at(1);
            let exp_sign = if adjusted >= 0 { "+" } else { "-" };
            if rest.is_empty() {
                write!(f, "{}{}E{}{}", sign, first, exp_sign, adjusted.abs())
            } else {
                write!(f, "{}{}.{}E{}{}", sign, first, rest, exp_sign, adjusted.abs())
            }
        }
    }
}

impl FromStr for FbDecFloat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let lower = body.to_ascii_lowercase();
        match lower.as_str() {
            "inf" | "infinity" => return Ok(Self::infinity(negative)),
            "nan" => return Ok(Self::nan()),
            "snan" => {
                return Ok(Self {
                    kind: DecFloatKind::SignalingNaN,
                    ..Self::nan()
                })
            }
            _ => {}
        }

        let invalid = || Error::type_conversion(format!("Invalid DECFLOAT literal: {}", s));

        let (mantissa, exp_part) = match lower.split_once('e') {
            Some((m, e)) => (m, Some(e)),
            None => (lower.as_str(), None),
        };
        let mut exponent: i32 = match exp_part {
            Some(e) => e.parse().map_err(|_| invalid())?,
            None => 0,
        };

        let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        let mut coefficient: u128 = 0;
        for c in int.chars().chain(frac.chars()) {
            let d = c.to_digit(10).ok_or_else(invalid)?;
            coefficient = coefficient
                .checked_mul(10)
                .and_then(|v| v.checked_add(d as u128))
                .ok_or_else(|| Error::overflow(s.to_string()))?;
        }
        exponent -= frac.len() as i32;

        Ok(Self::finite(negative, coefficient, exponent))
    }
}

/// Decode a DPD declet into its three-digit value.
fn dpd_decode(declet: u32) -> u32 {
    let b = |i: u32| (declet >> i) & 1;
    let pqr = (declet >> 7) & 7;
    let stu = (declet >> 4) & 7;
    let wxy = declet & 7;
    let pq = (declet >> 8) & 3;
    let st = (declet >> 5) & 3;
    let (r, u, y) = (b(7), b(4), b(0));

    let (d1, d2, d3) = if b(3) == 0 {
        (pqr, stu, wxy)
    } else {
        match (declet >> 1) & 3 {
            0b00 => (pqr, stu, 8 + y),
            0b01 => (pqr, 8 + u, (st << 1) | y),
            0b10 => (8 + r, stu, (pq << 1) | y),
            _ => match st {
                0b00 => (8 + r, 8 + u, (pq << 1) | y),
                0b01 => (8 + r, (pq << 1) | u, 8 + y),
                0b10 => (pqr, 8 + u, 8 + y),
                _ => (8 + r, 8 + u, 8 + y),
            },
        }
    };
    d1 * 100 + d2 * 10 + d3
}

/// Encode a value below 1000 as a DPD declet.
fn dpd_encode(value: u32) -> u32 {
    let (d1, d2, d3) = (value / 100, (value / 10) % 10, value % 10);
    let (a, e, i) = (d1 >= 8, d2 >= 8, d3 >= 8);
    let (low1, low2, low3) = (d1 & 1, d2 & 1, d3 & 1);
    let mid2 = (d2 >> 1) & 3;
    let mid3 = (d3 >> 1) & 3;

    match (a, e, i) {
        (false, false, false) => (d1 << 7) | (d2 << 4) | d3,
        (false, false, true) => (d1 << 7) | (d2 << 4) | 0b1000 | low3,
        (false, true, false) => (d1 << 7) | (mid3 << 5) | (low2 << 4) | 0b1010 | low3,
        (true, false, false) => (mid3 << 8) | (low1 << 7) | (d2 << 4) | 0b1100 | low3,
        (true, true, false) => (mid3 << 8) | (low1 << 7) | (low2 << 4) | 0b1110 | low3,
        (true, false, true) => (mid2 << 8) | (low1 << 7) | (0b01 << 5) | (low2 << 4) | 0b1110 | low3,
        (false, true, true) => (d1 << 7) | (0b10 << 5) | (low2 << 4) | 0b1110 | low3,
        (true, true, true) => (low1 << 7) | (0b11 << 5) | (low2 << 4) | 0b1110 | low3,
    }
}

/// Decode a big-endian decimal64/decimal128 value.
pub fn decode_decfloat(data: &[u8], format: DecFloatFormat) -> Result<FbDecFloat> {
    if data.len() != format.bytes {
        return Err(Error::protocol(format!(
            "DECFLOAT({}) must be {} bytes, got {}",
            format.digits,
            format.bytes,
            data.len()
        )));
    }

    let mut buf = [0u8; 16];
    buf[16 - format.bytes..].copy_from_slice(data);
    let bits = u128::from_be_bytes(buf);
    let total = format.total_bits();

    let negative = (bits >> (total - 1)) & 1 == 1;
    let comb = ((bits >> (total - 6)) & 0x1F) as u32;

    if comb == 0x1E {
        return Ok(FbDecFloat::infinity(negative));
    }
    if comb == 0x1F {
        let signaling = (bits >> (total - 7)) & 1 == 1;
        return Ok(FbDecFloat {
            kind: if signaling {
                DecFloatKind::SignalingNaN
            } else {
                DecFloatKind::NaN
            },
            negative,
            coefficient: 0,
            exponent: 0,
        });
    }

    let (exp_msb, msd) = if comb >> 3 == 0b11 {
        ((comb >> 1) & 3, 8 + (comb & 1))
    } else {
        (comb >> 3, comb & 7)
    };

    let exp_mask = (1u128 << format.exp_cont_bits) - 1;
    let exp_cont = ((bits >> (total - 6 - format.exp_cont_bits)) & exp_mask) as i32;
    let exponent = (((exp_msb as i32) << format.exp_cont_bits) | exp_cont) - format.bias;

    let mut coefficient = msd as u128;
    for i in (0..format.declets).rev() {
        let declet = ((bits >> (10 * i)) & 0x3FF) as u32;
        coefficient = coefficient * 1000 + dpd_decode(declet) as u128;
    }

    Ok(FbDecFloat::finite(negative, coefficient, exponent))
}

/// Encode a value as big-endian decimal64/decimal128 bytes.
///
/// Trailing zeros are folded into the exponent when the coefficient has too
/// many digits or the exponent is above range.
///
/// # Errors
/// Returns `Error::Overflow` if the value cannot be represented exactly.
pub fn encode_decfloat(value: &FbDecFloat, format: DecFloatFormat) -> Result<Vec<u8>> {
    let total = format.total_bits();
    let sign = if value.negative { 1u128 << (total - 1) } else { 0 };

    let bits = match value.kind {
        DecFloatKind::Infinity => sign | (0x1Eu128 << (total - 6)),
        DecFloatKind::NaN => sign | (0x1Fu128 << (total - 6)),
        DecFloatKind::SignalingNaN => sign | (0x1Fu128 << (total - 6)) | (1u128 << (total - 7)),
        DecFloatKind::Finite => {
            let limit = 10u128.pow(format.digits);
            let mut coefficient = value.coefficient;
            let mut biased = value.exponent + format.bias;

            while coefficient >= limit && coefficient % 10 == 0 {
                coefficient /= 10;
                biased += 1;
            }
            while biased > format.max_biased_exponent() && coefficient != 0 && coefficient * 10 < limit {
                coefficient *= 10;
                biased -= 1;
            }
            if coefficient == 0 {
                biased = biased.clamp(0, format.max_biased_exponent());
            }
            if coefficient >= limit || biased < 0 || biased > format.max_biased_exponent() {
                return Err(Error::overflow(format!(
                    "{} does not fit DECFLOAT({})",
                    value, format.digits
                )));
            }

            let msd_unit = 10u128.pow(format.digits - 1);
            let msd = (coefficient / msd_unit) as u32;
            let mut rest = coefficient % msd_unit;

            let mut bits = 0u128;
            for i in 0..format.declets {
                bits |= (dpd_encode((rest % 1000) as u32) as u128) << (10 * i);
                rest /= 1000;
            }

            let biased = biased as u32;
            let exp_msb = biased >> format.exp_cont_bits;
            let exp_cont = biased & ((1 << format.exp_cont_bits) - 1);
            let comb = if msd >= 8 {
                0b11000 | (exp_msb << 1) | (msd & 1)
            } else {
                (exp_msb << 3) | msd
            };

            sign | bits
                | ((exp_cont as u128) << (total - 6 - format.exp_cont_bits))
                | ((comb as u128) << (total - 6))
        }
    };

    Ok(bits.to_be_bytes()[16 - format.bytes..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declet_tables_agree() {
        for n in 0..1000 {
            assert_eq!(dpd_decode(dpd_encode(n)), n, "declet round trip for {}", n);
        }
    }

    #[test]
    fn test_decimal64_known_encodings() {
        // 1E+0 is 0x2238000000000001
        let one = decode_decfloat(&0x2238_0000_0000_0001u64.to_be_bytes(), DECIMAL64).unwrap();
        assert_eq!(one, FbDecFloat::finite(false, 1, 0));
        assert_eq!(
            encode_decfloat(&one, DECIMAL64).unwrap(),
            0x2238_0000_0000_0001u64.to_be_bytes().to_vec()
        );

        // -7.50 is 0xA2300000000003D0
        let v = FbDecFloat::finite(true, 750, -2);
        let bytes = encode_decfloat(&v, DECIMAL64).unwrap();
        assert_eq!(bytes, 0xA230_0000_0000_03D0u64.to_be_bytes().to_vec());
        assert_eq!(decode_decfloat(&bytes, DECIMAL64).unwrap(), v);
        assert_eq!(v.to_string(), "-7.50");
    }

    #[test]
    fn test_decimal128_one() {
        // 1E+0 is 0x22080000000000000000000000000001
        let bytes = 0x2208_0000_0000_0000_0000_0000_0000_0001u128.to_be_bytes();
        let one = decode_decfloat(&bytes, DECIMAL128).unwrap();
        assert_eq!(one, FbDecFloat::finite(false, 1, 0));
        assert_eq!(encode_decfloat(&one, DECIMAL128).unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_round_trip_extremes() {
        let max16 = FbDecFloat::finite(false, 9_999_999_999_999_999, 369);
        let bytes = encode_decfloat(&max16, DECIMAL64).unwrap();
        assert_eq!(decode_decfloat(&bytes, DECIMAL64).unwrap(), max16);

        let max34 = FbDecFloat::finite(true, 10u128.pow(34) - 1, -6176);
        let bytes = encode_decfloat(&max34, DECIMAL128).unwrap();
        assert_eq!(decode_decfloat(&bytes, DECIMAL128).unwrap(), max34);

        for v in [
            FbDecFloat::infinity(true),
            FbDecFloat::infinity(false),
            FbDecFloat::nan(),
        ] {
            let bytes = encode_decfloat(&v, DECIMAL64).unwrap();
            assert_eq!(decode_decfloat(&bytes, DECIMAL64).unwrap(), v);
        }
    }

    #[test]
    fn test_encode_overflow() {
        let v = FbDecFloat::finite(false, 12_345_678_901_234_567, 0);
        assert!(matches!(
            encode_decfloat(&v, DECIMAL64),
            Err(Error::Overflow { .. })
        ));
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(FbDecFloat::finite(false, 12345, -2).to_string(), "123.45");
        assert_eq!(FbDecFloat::finite(false, 5, -8).to_string(), "5E-8");
        assert_eq!(FbDecFloat::finite(false, 123, 3).to_string(), "1.23E+5");
        assert_eq!(FbDecFloat::finite(false, 1, -3).to_string(), "0.001");

        let v: FbDecFloat = "-123.450".parse().unwrap();
        assert_eq!(v, FbDecFloat::finite(true, 123450, -3));
        let v: FbDecFloat = "1.5E+3".parse().unwrap();
        assert_eq!(v, FbDecFloat::finite(false, 15, 2));
        assert!("1.2.3".parse::<FbDecFloat>().is_err());
    }

    #[test]
    fn test_decimal_conversion() {
        let d = Decimal::new(-12345, 2);
        let v = FbDecFloat::from_decimal(d);
        assert_eq!(v, FbDecFloat::finite(true, 12345, -2));
        assert_eq!(v.to_decimal().unwrap(), d);
        assert!(FbDecFloat::nan().to_decimal().is_err());
    }
}
