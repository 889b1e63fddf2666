//! Detached value storage.
//!
//! `Storage` is the statement-independent part of a value: what a fetch
//! produces per column, what the row pool recycles, and what a parameter
//! field holds before encoding. Conversions between kinds live here so the
//! value holder only has to deal with nulls and lazy payloads.

use crate::error::{Error, Result};
use crate::protocol::codec::{decimal_from_f64, FbDecFloat};
use crate::protocol::types::{FbArray, FbZonedDateTime, FbZonedTime};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

/// One decoded or assigned value.
///
/// BLOB and ARRAY columns are held as `Int64` ids until materialized.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Storage {
    #[default]
    Null,
    Boolean(bool),
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Guid(Uuid),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    String(String),
    Binary(Bytes),
    Int128(i128),
    Dec16(FbDecFloat),
    Dec34(FbDecFloat),
    ZonedDateTime(FbZonedDateTime),
    ZonedTime(FbZonedTime),
    Array(FbArray),
}

impl Storage {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Storage::Null)
    }

    /// Kind name used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Storage::Null => "Null",
            Storage::Boolean(_) => "Boolean",
            Storage::Byte(_) => "Byte",
            Storage::Int16(_) => "Int16",
            Storage::Int32(_) => "Int32",
            Storage::Int64(_) => "Int64",
            Storage::Float(_) => "Float",
            Storage::Double(_) => "Double",
            Storage::Decimal(_) => "Decimal",
            Storage::Guid(_) => "Guid",
            Storage::Date(_) => "Date",
            Storage::DateTime(_) => "DateTime",
            Storage::Time(_) => "Time",
            Storage::String(_) => "String",
            Storage::Binary(_) => "Binary",
            Storage::Int128(_) => "Int128",
            Storage::Dec16(_) => "Dec16",
            Storage::Dec34(_) => "Dec34",
            Storage::ZonedDateTime(_) => "ZonedDateTime",
            Storage::ZonedTime(_) => "ZonedTime",
            Storage::Array(_) => "Array",
        }
    }

    fn cannot(&self, target: &str) -> Error {
        Error::type_conversion(format!("Cannot convert {} to {}", self.kind(), target))
    }

    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Storage::Boolean(v) => Ok(*v),
            Storage::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(Error::type_conversion(format!("{:?} is not a boolean", s))),
            },
            Storage::Byte(_) | Storage::Int16(_) | Storage::Int32(_) | Storage::Int64(_)
            | Storage::Int128(_) => Ok(self.to_i128()? != 0),
            Storage::Float(_) | Storage::Double(_) | Storage::Decimal(_) => Ok(self.to_f64()? != 0.0),
            _ => Err(self.cannot("Boolean")),
        }
    }

    pub fn to_i64(&self) -> Result<i64> {
        match self {
            Storage::Boolean(v) => Ok(*v as i64),
            Storage::Byte(v) => Ok(*v as i64),
            Storage::Int16(v) => Ok(*v as i64),
            Storage::Int32(v) => Ok(*v as i64),
            Storage::Int64(v) => Ok(*v),
            Storage::Int128(v) => {
                i64::try_from(*v).map_err(|_| Error::overflow(format!("{} does not fit Int64", v)))
            }
            Storage::Float(_) | Storage::Double(_) => {
                let v = self.to_f64()?.round_ties_even();
                if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                    Ok(v as i64)
                } else {
                    Err(Error::overflow(format!("{} does not fit Int64", v)))
                }
            }
            Storage::Decimal(d) => d
                .round()
                .to_i64()
                .ok_or_else(|| Error::overflow(format!("{} does not fit Int64", d))),
            Storage::Dec16(d) | Storage::Dec34(d) => Storage::Decimal(d.to_decimal()?).to_i64(),
            Storage::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| Error::type_conversion(format!("{:?} is not an integer: {}", s, e))),
            _ => Err(self.cannot("Int64")),
        }
    }

    pub fn to_i32(&self) -> Result<i32> {
        let v = self.to_i64()?;
        i32::try_from(v).map_err(|_| Error::overflow(format!("{} does not fit Int32", v)))
    }

    pub fn to_i16(&self) -> Result<i16> {
        let v = self.to_i64()?;
        i16::try_from(v).map_err(|_| Error::overflow(format!("{} does not fit Int16", v)))
    }

    pub fn to_u8(&self) -> Result<u8> {
        let v = self.to_i64()?;
        u8::try_from(v).map_err(|_| Error::overflow(format!("{} does not fit Byte", v)))
    }

    pub fn to_i128(&self) -> Result<i128> {
        match self {
            Storage::Int128(v) => Ok(*v),
            Storage::Decimal(d) => d
                .round()
                .to_i128()
                .ok_or_else(|| Error::overflow(format!("{} does not fit Int128", d))),
            Storage::String(s) => s
                .trim()
                .parse::<i128>()
                .map_err(|e| Error::type_conversion(format!("{:?} is not an integer: {}", s, e))),
            _ => self.to_i64().map(i128::from),
        }
    }

    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Storage::Boolean(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Storage::Byte(v) => Ok(*v as f64),
            Storage::Int16(v) => Ok(*v as f64),
            Storage::Int32(v) => Ok(*v as f64),
            Storage::Int64(v) => Ok(*v as f64),
            Storage::Int128(v) => Ok(*v as f64),
            Storage::Float(v) => Ok(*v as f64),
            Storage::Double(v) => Ok(*v),
            Storage::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| Error::overflow(format!("{} does not fit Double", d))),
            Storage::Dec16(d) | Storage::Dec34(d) => Ok(d.to_f64()),
            Storage::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| Error::type_conversion(format!("{:?} is not a number: {}", s, e))),
            _ => Err(self.cannot("Double")),
        }
    }

    pub fn to_f32(&self) -> Result<f32> {
        if let Storage::Float(v) = self {
            return Ok(*v);
        }
        let v = self.to_f64()?;
        let narrowed = v as f32;
        if v.is_finite() && narrowed.is_infinite() {
            return Err(Error::overflow(format!("{} does not fit Float", v)));
        }
        Ok(narrowed)
    }

    pub fn to_decimal(&self) -> Result<Decimal> {
        match self {
            Storage::Decimal(d) => Ok(*d),
            Storage::Boolean(v) => Ok(Decimal::from(*v as i32)),
            Storage::Byte(v) => Ok(Decimal::from(*v)),
            Storage::Int16(v) => Ok(Decimal::from(*v)),
            Storage::Int32(v) => Ok(Decimal::from(*v)),
            Storage::Int64(v) => Ok(Decimal::from(*v)),
            Storage::Int128(v) => Decimal::try_from_i128_with_scale(*v, 0)
                .map_err(|_| Error::overflow(format!("{} does not fit Decimal", v))),
            Storage::Float(v) => decimal_from_f64(*v as f64),
            Storage::Double(v) => decimal_from_f64(*v),
            Storage::Dec16(d) | Storage::Dec34(d) => d.to_decimal(),
            Storage::String(s) => Decimal::from_str(s.trim())
                .or_else(|_| Decimal::from_scientific(s.trim()))
                .map_err(|e| Error::type_conversion(format!("{:?} is not a decimal: {}", s, e))),
            _ => Err(self.cannot("Decimal")),
        }
    }

    pub fn to_decfloat(&self) -> Result<FbDecFloat> {
        match self {
            Storage::Dec16(d) | Storage::Dec34(d) => Ok(*d),
            Storage::String(s) => FbDecFloat::from_str(s.trim()),
            Storage::Float(_) | Storage::Double(_) => {
                let v = self.to_f64()?;
                if v.is_nan() {
                    Ok(FbDecFloat::nan())
                } else if v.is_infinite() {
                    Ok(FbDecFloat::infinity(v < 0.0))
                } else {
                    FbDecFloat::from_str(&v.to_string())
                }
            }
            _ => Ok(FbDecFloat::from_decimal(self.to_decimal()?)),
        }
    }

    pub fn to_guid(&self) -> Result<Uuid> {
        match self {
            Storage::Guid(g) => Ok(*g),
            Storage::Binary(b) if b.len() == 16 => Uuid::from_slice(b)
                .map_err(|e| Error::type_conversion(format!("Invalid GUID bytes: {}", e))),
            Storage::String(s) => Uuid::parse_str(s.trim())
                .map_err(|e| Error::type_conversion(format!("{:?} is not a GUID: {}", s, e))),
            _ => Err(self.cannot("Guid")),
        }
    }

    pub fn to_date(&self) -> Result<NaiveDate> {
        match self {
            Storage::Date(d) => Ok(*d),
            Storage::DateTime(dt) => Ok(dt.date()),
            Storage::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .or_else(|_| self.to_datetime().map(|dt| dt.date()))
                .map_err(|_| Error::type_conversion(format!("{:?} is not a date", s))),
            _ => Err(self.cannot("Date")),
        }
    }

    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        match self {
            Storage::DateTime(dt) => Ok(*dt),
            Storage::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Storage::String(s) => {
                let s = s.trim();
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                    .or_else(|_| {
                        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
                    })
                    .map_err(|e| Error::type_conversion(format!("{:?} is not a timestamp: {}", s, e)))
            }
            _ => Err(self.cannot("DateTime")),
        }
    }

    pub fn to_time(&self) -> Result<NaiveTime> {
        match self {
            Storage::Time(t) => Ok(*t),
            Storage::DateTime(dt) => Ok(dt.time()),
            Storage::String(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .map_err(|e| Error::type_conversion(format!("{:?} is not a time: {}", s, e))),
            _ => Err(self.cannot("Time")),
        }
    }

    pub fn to_zoned_datetime(&self) -> Result<FbZonedDateTime> {
        match self {
            Storage::ZonedDateTime(v) => Ok(*v),
            _ => Err(self.cannot("ZonedDateTime")),
        }
    }

    pub fn to_zoned_time(&self) -> Result<FbZonedTime> {
        match self {
            Storage::ZonedTime(v) => Ok(*v),
            _ => Err(self.cannot("ZonedTime")),
        }
    }

    /// Textual form of the value.
    pub fn to_text(&self) -> Result<String> {
        Ok(match self {
            Storage::String(s) => s.clone(),
            Storage::Boolean(v) => v.to_string(),
            Storage::Byte(v) => v.to_string(),
            Storage::Int16(v) => v.to_string(),
            Storage::Int32(v) => v.to_string(),
            Storage::Int64(v) => v.to_string(),
            Storage::Int128(v) => v.to_string(),
            Storage::Float(v) => v.to_string(),
            Storage::Double(v) => v.to_string(),
            Storage::Decimal(d) => d.to_string(),
            Storage::Dec16(d) | Storage::Dec34(d) => d.to_string(),
            Storage::Guid(g) => g.to_string(),
            Storage::Date(d) => d.format("%Y-%m-%d").to_string(),
            Storage::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Storage::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Storage::ZonedDateTime(v) => format!("{} {}", v.utc.format("%Y-%m-%d %H:%M:%S%.f"), v.zone),
            Storage::ZonedTime(v) => format!("{} {}", v.utc.format("%H:%M:%S%.f"), v.zone),
            Storage::Binary(b) => String::from_utf8(b.to_vec())
                .map_err(|e| Error::type_conversion(format!("Binary value is not UTF-8: {}", e)))?,
            Storage::Null | Storage::Array(_) => return Err(self.cannot("String")),
        })
    }

    /// Raw bytes of the value.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Storage::Binary(b) => Ok(b.clone()),
            Storage::String(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            Storage::Guid(g) => Ok(Bytes::copy_from_slice(g.as_bytes())),
            _ => Err(self.cannot("Binary")),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Storage {
                fn from(v: $ty) -> Self {
                    Storage::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    u8 => Byte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Int128,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    Uuid => Guid,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    NaiveTime => Time,
    String => String,
    &str => String,
    Bytes => Binary,
    Vec<u8> => Binary,
    FbDecFloat => Dec34,
    FbZonedDateTime => ZonedDateTime,
    FbZonedTime => ZonedTime,
    FbArray => Array,
}

impl From<&[u8]> for Storage {
    fn from(v: &[u8]) -> Self {
        Storage::Binary(Bytes::copy_from_slice(v))
    }
}

impl<T: Into<Storage>> From<Option<T>> for Storage {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Storage::Null)
    }
}
