//! Row and parameter message encoding.
//!
//! A message is the XDR form of every field of a descriptor. Before protocol
//! 13 each value is followed by a 32-bit null indicator and NULLs still carry
//! a placeholder value; from 13 on a null bitmap precedes the values and
//! NULLs are omitted.

use crate::error::{Error, Result};
use crate::protocol::codec::*;
use crate::protocol::constants::*;
use crate::protocol::message::WriteExt;
use crate::protocol::stream::XdrReader;
use crate::protocol::types::{DbField, FbZonedDateTime, FbZonedTime, Storage, TimeZoneId};
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Null signalling layout of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Value then `0` / `-1` indicator word per field.
    IndicatorWords,
    /// Null bitmap (least significant bit first) then the non-null values.
    NullBitmap,
}

/// Bytes in the null bitmap of `count` fields.
pub fn bitmap_len(count: usize) -> usize {
    count.div_ceil(8)
}

// ============================================================================
// Decoding
// ============================================================================

/// Read one message into `out`, which is cleared first.
pub async fn read_row<R: AsyncRead + Unpin>(
    reader: &mut XdrReader<R>,
    fields: &[Arc<DbField>],
    format: MessageFormat,
    out: &mut Vec<Storage>,
) -> Result<()> {
    out.clear();
    match format {
        MessageFormat::NullBitmap => {
            let bitmap = reader.read_opaque(bitmap_len(fields.len())).await?;
            for (i, field) in fields.iter().enumerate() {
                if bitmap[i / 8] & (1 << (i % 8)) != 0 {
                    out.push(Storage::Null);
                } else {
                    out.push(read_value(reader, field).await?);
                }
            }
        }
        MessageFormat::IndicatorWords => {
            for field in fields {
                let value = read_value(reader, field).await?;
                match reader.read_i32().await? {
                    0 => out.push(value),
                    -1 => out.push(Storage::Null),
                    other => {
                        return Err(Error::protocol(format!(
                            "Invalid null indicator {} for column {}",
                            other,
                            field.label()
                        )))
                    }
                }
            }
        }
    }
    Ok(())
}

fn integer(field: &DbField, value: i128, plain: Storage) -> Result<Storage> {
    if field.scale == 0 {
        Ok(plain)
    } else {
        Ok(Storage::Decimal(decode_decimal(value, field.scale as i32, field.sql_type)?))
    }
}

fn decode_text(field: &DbField, data: Bytes) -> Result<Storage> {
    let charset = field.charset();
    if charset.is_octets() {
        if field.base_type() == SQL_TEXT && field.length == 16 {
            return Ok(Storage::Guid(decode_guid(&data)?));
        }
        return Ok(Storage::Binary(data));
    }

    let mut text = charset.decode(&data)?;
    if field.base_type() == SQL_TEXT {
        let bpc = charset.bytes_per_char();
        if bpc > 1 && field.length.max(0) as usize % bpc == 0 {
            if let Some((end, _)) = text.char_indices().nth(field.char_count()) {
                text.truncate(end);
            }
        }
    }
    Ok(Storage::String(text))
}

fn zone_id(raw: i32) -> TimeZoneId {
    TimeZoneId(raw as u16)
}

/// Read the XDR form of one non-null value.
pub async fn read_value<R: AsyncRead + Unpin>(
    reader: &mut XdrReader<R>,
    field: &DbField,
) -> Result<Storage> {
    match field.base_type() {
        SQL_TEXT => {
            let data = reader.read_opaque(field.length.max(0) as usize).await?;
            decode_text(field, data)
        }
        SQL_VARYING => {
            let data = reader.read_buffer().await?;
            decode_text(field, data)
        }
        SQL_SHORT => {
            let v = reader.read_i32().await? as i16;
            integer(field, v as i128, Storage::Int16(v))
        }
        SQL_LONG => {
            let v = reader.read_i32().await?;
            integer(field, v as i128, Storage::Int32(v))
        }
        SQL_INT64 | SQL_QUAD => {
            let v = reader.read_i64().await?;
            integer(field, v as i128, Storage::Int64(v))
        }
        SQL_INT128 => {
            let v = decode_int128(&reader.read_opaque(16).await?)?;
            integer(field, v, Storage::Int128(v))
        }
        SQL_BLOB | SQL_ARRAY => Ok(Storage::Int64(reader.read_i64().await?)),
        SQL_FLOAT => Ok(Storage::Float(reader.read_f32().await?)),
        SQL_DOUBLE | SQL_D_FLOAT => {
            let v = reader.read_f64().await?;
            if field.scale == 0 {
                Ok(Storage::Double(v))
            } else {
                Ok(Storage::Decimal(decimal_from_f64(v)?))
            }
        }
        SQL_TYPE_DATE => Ok(Storage::Date(decode_date(reader.read_i32().await?)?)),
        SQL_TYPE_TIME => Ok(Storage::Time(decode_time(reader.read_u32().await?)?)),
        SQL_TIMESTAMP => {
            let date = reader.read_i32().await?;
            let time = reader.read_u32().await?;
            Ok(Storage::DateTime(decode_timestamp(date, time)?))
        }
        SQL_BOOLEAN => Ok(Storage::Boolean(reader.read_boolean().await?)),
        SQL_DEC16 => Ok(Storage::Dec16(decode_decfloat(
            &reader.read_opaque(DECIMAL64.size()).await?,
            DECIMAL64,
        )?)),
        SQL_DEC34 => Ok(Storage::Dec34(decode_decfloat(
            &reader.read_opaque(DECIMAL128.size()).await?,
            DECIMAL128,
        )?)),
        SQL_TIME_TZ | SQL_TIME_TZ_EX => {
            let time = decode_time(reader.read_u32().await?)?;
            let mut value = FbZonedTime::new(time, zone_id(reader.read_i32().await?));
            if field.base_type() == SQL_TIME_TZ_EX {
                value.offset = Some(reader.read_i32().await? as i16);
            }
            Ok(Storage::ZonedTime(value))
        }
        SQL_TIMESTAMP_TZ | SQL_TIMESTAMP_TZ_EX => {
            let date = reader.read_i32().await?;
            let time = reader.read_u32().await?;
            let utc = decode_timestamp(date, time)?;
            let mut value = FbZonedDateTime::new(utc, zone_id(reader.read_i32().await?));
            if field.base_type() == SQL_TIMESTAMP_TZ_EX {
                value.offset = Some(reader.read_i32().await? as i16);
            }
            Ok(Storage::ZonedDateTime(value))
        }
        SQL_NULL => Ok(Storage::Null),
        other => Err(Error::protocol(format!(
            "Unsupported SQL type {} for column {}",
            other,
            field.label()
        ))),
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Write the parameter values of `fields` as one message.
pub fn write_row(buf: &mut Vec<u8>, fields: &[Arc<DbField>], format: MessageFormat) -> Result<()> {
    match format {
        MessageFormat::NullBitmap => {
            let mut bitmap = vec![0u8; bitmap_len(fields.len())];
            for (i, field) in fields.iter().enumerate() {
                if field.value.is_null() {
                    bitmap[i / 8] |= 1 << (i % 8);
                }
            }
            buf.write_opaque(&bitmap);
            for field in fields.iter().filter(|f| !f.value.is_null()) {
                write_value(buf, field, &field.value)?;
            }
        }
        MessageFormat::IndicatorWords => {
            for field in fields {
                write_value(buf, field, &field.value)?;
                buf.write_i32(if field.value.is_null() { -1 } else { 0 });
            }
        }
    }
    Ok(())
}

fn text_bytes(field: &DbField, value: &Storage) -> Result<Vec<u8>> {
    let charset = field.charset();
    let bytes = match value {
        Storage::Binary(b) => b.to_vec(),
        Storage::Guid(g) => encode_guid(g).to_vec(),
        other => {
            let text = other.to_text()?;
            if !charset.is_octets() && text.chars().count() > field.char_count() {
                return Err(right_truncation(field));
            }
            charset.encode(&text)?
        }
    };
    if bytes.len() > field.length.max(0) as usize {
        return Err(right_truncation(field));
    }
    Ok(bytes)
}

fn right_truncation(field: &DbField) -> Error {
    Error::overflow(format!(
        "string right truncation: value exceeds {} bytes for {}",
        field.length,
        field.label()
    ))
}

fn scaled_integer(field: &DbField, value: &Storage) -> Result<i128> {
    if field.scale == 0 {
        value.to_i128()
    } else {
        encode_decimal(value.to_decimal()?, field.scale as i32, field.sql_type)
    }
}

/// Write the XDR form of one value; NULL writes the type's placeholder.
pub fn write_value(buf: &mut Vec<u8>, field: &DbField, value: &Storage) -> Result<()> {
    if value.is_null() {
        write_placeholder(buf, field);
        return Ok(());
    }

    match field.base_type() {
        SQL_TEXT => {
            let bytes = text_bytes(field, value)?;
            let fill = if field.charset().is_octets() { 0 } else { b' ' };
            buf.write_opaque_fixed(&bytes, field.length.max(0) as usize, fill);
        }
        SQL_VARYING => buf.write_buffer(&text_bytes(field, value)?),
        SQL_SHORT => {
            let v = scaled_integer(field, value)?;
            check_width(v, SQL_SHORT)?;
            buf.write_i32(v as i32);
        }
        SQL_LONG => {
            let v = scaled_integer(field, value)?;
            check_width(v, SQL_LONG)?;
            buf.write_i32(v as i32);
        }
        SQL_INT64 | SQL_QUAD => {
            let v = scaled_integer(field, value)?;
            check_width(v, SQL_INT64)?;
            buf.write_i64(v as i64);
        }
        SQL_INT128 => buf.write_opaque(&encode_int128(scaled_integer(field, value)?)),
        SQL_BLOB | SQL_ARRAY => match value {
            Storage::Int64(id) => buf.write_i64(*id),
            other => {
                return Err(Error::invalid_state(format!(
                    "{} parameter {} has not been written to the server",
                    other.kind(),
                    field.label()
                )))
            }
        },
        SQL_FLOAT => buf.write_f32(value.to_f32()?),
        SQL_DOUBLE | SQL_D_FLOAT => buf.write_f64(value.to_f64()?),
        SQL_TYPE_DATE => buf.write_i32(encode_date(value.to_date()?)),
        SQL_TYPE_TIME => buf.write_u32(encode_time(value.to_time()?)),
        SQL_TIMESTAMP => {
            let (date, time) = encode_timestamp(value.to_datetime()?);
            buf.write_i32(date);
            buf.write_u32(time);
        }
        SQL_BOOLEAN => buf.write_boolean(value.to_bool()?),
        SQL_DEC16 => buf.write_opaque(&encode_decfloat(&value.to_decfloat()?, DECIMAL64)?),
        SQL_DEC34 => buf.write_opaque(&encode_decfloat(&value.to_decfloat()?, DECIMAL128)?),
        SQL_TIME_TZ | SQL_TIME_TZ_EX => {
            let v = value.to_zoned_time()?;
            buf.write_u32(encode_time(v.utc));
            buf.write_i32(v.zone.0 as i32);
            if field.base_type() == SQL_TIME_TZ_EX {
                buf.write_i32(zone_offset(v.offset, v.zone));
            }
        }
        SQL_TIMESTAMP_TZ | SQL_TIMESTAMP_TZ_EX => {
            let v = value.to_zoned_datetime()?;
            let (date, time) = encode_timestamp(v.utc);
            buf.write_i32(date);
            buf.write_u32(time);
            buf.write_i32(v.zone.0 as i32);
            if field.base_type() == SQL_TIMESTAMP_TZ_EX {
                buf.write_i32(zone_offset(v.offset, v.zone));
            }
        }
        SQL_NULL => {}
        other => {
            return Err(Error::protocol(format!(
                "Unsupported SQL type {} for parameter {}",
                other,
                field.label()
            )))
        }
    }
    Ok(())
}

fn zone_offset(offset: Option<i16>, zone: TimeZoneId) -> i32 {
    offset
        .map(i32::from)
        .or_else(|| zone.offset_minutes())
        .unwrap_or(0)
}

fn write_placeholder(buf: &mut Vec<u8>, field: &DbField) {
    match field.base_type() {
        SQL_TEXT => {
            let fill = if field.charset().is_octets() { 0 } else { b' ' };
            buf.write_opaque_fixed(&[], field.length.max(0) as usize, fill);
        }
        SQL_VARYING => buf.write_buffer(&[]),
        SQL_SHORT | SQL_LONG | SQL_FLOAT | SQL_TYPE_DATE | SQL_TYPE_TIME => buf.write_i32(0),
        SQL_INT64 | SQL_QUAD | SQL_BLOB | SQL_ARRAY | SQL_DOUBLE | SQL_D_FLOAT | SQL_TIMESTAMP
        | SQL_DEC16 => buf.write_i64(0),
        SQL_INT128 | SQL_DEC34 => buf.write_opaque(&[0u8; 16]),
        SQL_BOOLEAN => buf.write_boolean(false),
        SQL_TIME_TZ => {
            buf.write_u32(0);
            buf.write_i32(TZ_GMT as i32);
        }
        SQL_TIME_TZ_EX => {
            buf.write_u32(0);
            buf.write_i32(TZ_GMT as i32);
            buf.write_i32(0);
        }
        SQL_TIMESTAMP_TZ => {
            buf.write_i64(0);
            buf.write_i32(TZ_GMT as i32);
        }
        SQL_TIMESTAMP_TZ_EX => {
            buf.write_i64(0);
            buf.write_i32(TZ_GMT as i32);
            buf.write_i32(0);
        }
        _ => {}
    }
}
