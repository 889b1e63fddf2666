//! Row and parameter descriptors and their BLR message description.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::types::{DbField, Storage};
use bytes::Bytes;
use std::sync::{Arc, OnceLock};

/// BLR message description plus the aligned native message length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blr {
    pub data: Bytes,
    pub length: usize,
}

/// Ordered, fixed-size set of fields sized at prepare time.
///
/// `count` is the size the server declared; `actual_count` grows while
/// truncated describe output is re-queried.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    fields: Vec<Arc<DbField>>,
    actual_count: usize,
    blr: OnceLock<Blr>,
}

impl Descriptor {
    /// Create a descriptor with `count` default fields.
    pub fn new(count: usize) -> Self {
        Self {
            fields: (0..count).map(|_| Arc::new(DbField::default())).collect(),
            actual_count: 0,
            blr: OnceLock::new(),
        }
    }

    /// Build a descriptor from already described fields.
    pub fn from_fields(fields: Vec<DbField>) -> Self {
        let actual_count = fields.len();
        Self {
            fields: fields.into_iter().map(Arc::new).collect(),
            actual_count,
            blr: OnceLock::new(),
        }
    }

    /// Declared number of fields.
    pub fn count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields populated from server metadata so far.
    pub fn actual_count(&self) -> usize {
        self.actual_count
    }

    pub(crate) fn set_actual_count(&mut self, actual_count: usize) {
        self.actual_count = actual_count;
    }

    pub fn fields(&self) -> &[Arc<DbField>] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&DbField> {
        self.fields.get(index).map(Arc::as_ref)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.fields.len() {
            return Err(Error::ColumnIndexOutOfBounds {
                index,
                count: self.fields.len(),
            });
        }
        Ok(())
    }

    /// Mutable access to a field's shape. Drops the cached BLR.
    pub fn field_mut(&mut self, index: usize) -> Result<&mut DbField> {
        self.check_index(index)?;
        self.blr.take();
        Ok(Arc::make_mut(&mut self.fields[index]))
    }

    /// Assign a parameter value.
    pub fn set_value(&mut self, index: usize, value: impl Into<Storage>) -> Result<()> {
        self.check_index(index)?;
        Arc::make_mut(&mut self.fields[index]).value = value.into();
        Ok(())
    }

    /// Mark a parameter NULL.
    pub fn set_null(&mut self, index: usize) -> Result<()> {
        self.set_value(index, Storage::Null)
    }

    /// Clear every parameter value, keeping the shape.
    pub fn reset_values(&mut self) {
        for field in &mut self.fields {
            if !field.value.is_null() {
                Arc::make_mut(field).value = Storage::Null;
            }
        }
    }

    /// BLR message description, computed once and cached.
    pub fn to_blr(&self) -> Result<Blr> {
        if let Some(blr) = self.blr.get() {
            return Ok(blr.clone());
        }
        let blr = build_blr(&self.fields)?;
        let _ = self.blr.set(blr.clone());
        Ok(blr)
    }
}

fn align(n: usize, alignment: usize) -> usize {
    (n + alignment - 1) & !(alignment - 1)
}

/// Native size and alignment of a field value in a message.
fn native_layout(field: &DbField) -> Result<(usize, usize)> {
    let length = field.length.max(0) as usize;
    Ok(match field.base_type() {
        SQL_TEXT => (length, 1),
        SQL_VARYING => (length + 2, 2),
        SQL_SHORT => (2, 2),
        SQL_LONG | SQL_FLOAT | SQL_TYPE_DATE | SQL_TYPE_TIME => (4, 4),
        SQL_DOUBLE | SQL_D_FLOAT | SQL_INT64 | SQL_DEC16 => (8, 8),
        SQL_TIMESTAMP | SQL_BLOB | SQL_ARRAY | SQL_QUAD => (8, 4),
        SQL_BOOLEAN => (1, 1),
        SQL_DEC34 | SQL_INT128 => (16, 8),
        SQL_TIME_TZ => (6, 4),
        SQL_TIME_TZ_EX => (8, 4),
        SQL_TIMESTAMP_TZ => (10, 4),
        SQL_TIMESTAMP_TZ_EX => (12, 4),
        SQL_NULL => (0, 1),
        other => return Err(Error::protocol(format!("Cannot describe SQL type {} in BLR", other))),
    })
}

fn build_blr(fields: &[Arc<DbField>]) -> Result<Blr> {
    let par_count = fields.len() * 2;
    let mut blr = Vec::with_capacity(8 + fields.len() * 6);
    blr.extend_from_slice(&[BLR_VERSION5, BLR_BEGIN, BLR_MESSAGE, 0]);
    blr.extend_from_slice(&(par_count as u16).to_le_bytes());

    let mut length = 0usize;
    for field in fields {
        let len = field.length as u16;
        let scale = field.scale as i8 as u8;
        match field.base_type() {
            SQL_VARYING => {
                blr.push(BLR_VARYING);
                blr.extend_from_slice(&len.to_le_bytes());
            }
            SQL_TEXT => {
                blr.push(BLR_TEXT);
                blr.extend_from_slice(&len.to_le_bytes());
            }
            SQL_NULL => blr.extend_from_slice(&[BLR_TEXT, 0, 0]),
            SQL_DOUBLE => blr.push(BLR_DOUBLE),
            SQL_FLOAT => blr.push(BLR_FLOAT),
            SQL_D_FLOAT => blr.push(BLR_D_FLOAT),
            SQL_TYPE_DATE => blr.push(BLR_SQL_DATE),
            SQL_TYPE_TIME => blr.push(BLR_SQL_TIME),
            SQL_TIMESTAMP => blr.push(BLR_TIMESTAMP),
            SQL_BLOB | SQL_ARRAY => blr.extend_from_slice(&[BLR_QUAD, 0]),
            SQL_LONG => blr.extend_from_slice(&[BLR_LONG, scale]),
            SQL_SHORT => blr.extend_from_slice(&[BLR_SHORT, scale]),
            SQL_INT64 => blr.extend_from_slice(&[BLR_INT64, scale]),
            SQL_QUAD => blr.extend_from_slice(&[BLR_QUAD, scale]),
            SQL_INT128 => blr.extend_from_slice(&[BLR_INT128, scale]),
            SQL_BOOLEAN => blr.push(BLR_BOOL),
            SQL_DEC16 => blr.push(BLR_DEC64),
            SQL_DEC34 => blr.push(BLR_DEC128),
            SQL_TIME_TZ => blr.push(BLR_SQL_TIME_TZ),
            SQL_TIMESTAMP_TZ => blr.push(BLR_TIMESTAMP_TZ),
            SQL_TIME_TZ_EX => blr.push(BLR_EX_TIME_TZ),
            SQL_TIMESTAMP_TZ_EX => blr.push(BLR_EX_TIMESTAMP_TZ),
            other => {
                return Err(Error::protocol(format!("Cannot describe SQL type {} in BLR", other)))
            }
        }
        blr.extend_from_slice(&[BLR_SHORT, 0]);

        let (size, alignment) = native_layout(field)?;
        length = align(length, alignment) + size;
        length = align(length, 2) + 2;
    }

    blr.extend_from_slice(&[BLR_END, BLR_EOC]);
    Ok(Blr {
        data: Bytes::from(blr),
        length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blr_single_integer() {
        let desc = Descriptor::from_fields(vec![DbField::new(SQL_LONG + 1, 4)]);
        let blr = desc.to_blr().unwrap();
        assert_eq!(
            blr.data.as_ref(),
            &[
                BLR_VERSION5,
                BLR_BEGIN,
                BLR_MESSAGE,
                0,
                2,
                0,
                BLR_LONG,
                0,
                BLR_SHORT,
                0,
                BLR_END,
                BLR_EOC
            ]
        );
        assert_eq!(blr.length, 6);
    }

    #[test]
    fn test_blr_text_and_scaled() {
        let mut text = DbField::new(SQL_VARYING, 300);
        text.sub_type = 4;
        let mut num = DbField::new(SQL_INT64, 8);
        num.scale = -2;
        let desc = Descriptor::from_fields(vec![text, num]);
        let blr = desc.to_blr().unwrap();
        assert_eq!(&blr.data[4..6], &[4, 0]);
        assert_eq!(&blr.data[6..9], &[BLR_VARYING, 0x2C, 0x01]);
        assert_eq!(&blr.data[11..13], &[BLR_INT64, (-2i8) as u8]);
        // varying 302 + ind 2 = 304, int64 aligned to 304 + 8 + ind 2
        assert_eq!(blr.length, 314);
    }

    #[test]
    fn test_blr_cache_invalidated_by_field_mut() {
        let mut desc = Descriptor::from_fields(vec![DbField::new(SQL_SHORT, 2)]);
        let first = desc.to_blr().unwrap();
        desc.set_value(0, 5i16).unwrap();
        assert_eq!(desc.to_blr().unwrap(), first);

        desc.field_mut(0).unwrap().sql_type = SQL_LONG;
        assert_ne!(desc.to_blr().unwrap(), first);
    }

    #[test]
    fn test_reset_values_keeps_shape() {
        let mut desc = Descriptor::from_fields(vec![DbField::new(SQL_LONG, 4), DbField::new(SQL_TEXT, 5)]);
        desc.set_value(0, 1i32).unwrap();
        desc.set_value(1, "abc").unwrap();
        desc.reset_values();
        assert_eq!(desc.count(), 2);
        assert!(desc.fields().iter().all(|f| f.value().is_null()));
        assert_eq!(desc.get(1).unwrap().length, 5);
        assert!(matches!(
            desc.set_null(2),
            Err(Error::ColumnIndexOutOfBounds { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_new_is_empty_until_described() {
        let desc = Descriptor::new(3);
        assert_eq!(desc.count(), 3);
        assert_eq!(desc.actual_count(), 0);
    }
}
