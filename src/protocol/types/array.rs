//! Array column descriptors and values.
//!
//! Arrays live outside the row like blobs; a row carries an 8-byte array id.
//! Slices are read and written with a slice description (SDL) generated from
//! the column's descriptor.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::types::{DbField, Storage};

/// Bounds of one array dimension (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayBound {
    pub lower: i32,
    pub upper: i32,
}

impl ArrayBound {
    /// Number of elements in this dimension.
    pub fn len(&self) -> usize {
        (self.upper - self.lower + 1).max(0) as usize
    }

    /// Whether the dimension is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shape and element type of an array column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDescriptor {
    pub relation: String,
    pub field: String,
    /// Element type as a BLR type code (`RDB$FIELD_TYPE`).
    pub blr_type: u8,
    pub scale: i16,
    /// Element length in bytes.
    pub length: i16,
    /// Element subtype (charset id for text elements).
    pub sub_type: i16,
    pub bounds: Vec<ArrayBound>,
}

impl ArrayDescriptor {
    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.bounds.iter().map(ArrayBound::len).product()
    }

    /// SQL type corresponding to the element BLR type.
    pub fn element_sql_type(&self) -> Result<i32> {
        Ok(match self.blr_type {
            BLR_TEXT | BLR_TEXT2 | BLR_CSTRING => SQL_TEXT,
            BLR_VARYING | BLR_VARYING2 => SQL_VARYING,
            BLR_SHORT => SQL_SHORT,
            BLR_LONG => SQL_LONG,
            BLR_INT64 => SQL_INT64,
            BLR_QUAD => SQL_QUAD,
            BLR_FLOAT => SQL_FLOAT,
            BLR_DOUBLE | BLR_D_FLOAT => SQL_DOUBLE,
            BLR_SQL_DATE => SQL_TYPE_DATE,
            BLR_SQL_TIME => SQL_TYPE_TIME,
            BLR_TIMESTAMP => SQL_TIMESTAMP,
            BLR_BOOL => SQL_BOOLEAN,
            BLR_DEC64 => SQL_DEC16,
            BLR_DEC128 => SQL_DEC34,
            BLR_INT128 => SQL_INT128,
            other => {
                return Err(Error::type_conversion(format!(
                    "Unsupported array element type {}",
                    other
                )))
            }
        })
    }

    /// A field describing one element, used to encode and decode values.
    pub fn element_field(&self) -> Result<DbField> {
        let mut field = DbField::new(self.element_sql_type()?, self.length);
        field.scale = self.scale;
        field.sub_type = self.sub_type;
        field.name = self.field.clone();
        field.relation = self.relation.clone();
        Ok(field)
    }

    /// Native size of one element; VARYING elements carry a 2-byte prefix.
    pub fn element_size(&self) -> usize {
        match self.blr_type {
            BLR_VARYING | BLR_VARYING2 => self.length as usize + 2,
            BLR_SHORT => 2,
            BLR_LONG | BLR_FLOAT | BLR_SQL_DATE | BLR_SQL_TIME => 4,
            BLR_BOOL => 1,
            BLR_INT64 | BLR_QUAD | BLR_DOUBLE | BLR_D_FLOAT | BLR_TIMESTAMP | BLR_DEC64 => 8,
            BLR_DEC128 | BLR_INT128 => 16,
            _ => self.length as usize,
        }
    }

    /// Native size of the whole slice.
    pub fn slice_length(&self) -> usize {
        self.element_count() * self.element_size()
    }

    /// Generate the slice description for the full array.
    pub fn to_sdl(&self) -> Vec<u8> {
        let mut sdl = vec![ISC_SDL_VERSION1, ISC_SDL_STRUCT, 1, self.blr_type];

        match self.blr_type {
            BLR_SHORT | BLR_LONG | BLR_INT64 | BLR_QUAD | BLR_INT128 => {
                sdl.push(self.scale as i8 as u8);
            }
            BLR_TEXT | BLR_CSTRING | BLR_VARYING => {
                sdl.extend_from_slice(&(self.length as u16).to_le_bytes());
            }
            _ => {}
        }

        stuff_string(&mut sdl, ISC_SDL_RELATION, &self.relation);
        stuff_string(&mut sdl, ISC_SDL_FIELD, &self.field);

        for (n, bound) in self.bounds.iter().enumerate() {
            if bound.lower == 1 {
                sdl.push(ISC_SDL_DO1);
                sdl.push(n as u8);
            } else {
                sdl.push(ISC_SDL_DO2);
                sdl.push(n as u8);
                stuff_literal(&mut sdl, bound.lower);
            }
            stuff_literal(&mut sdl, bound.upper);
        }

        sdl.extend_from_slice(&[ISC_SDL_ELEMENT, 1, ISC_SDL_SCALAR, 0, self.bounds.len() as u8]);
        for n in 0..self.bounds.len() {
            sdl.push(ISC_SDL_VARIABLE);
            sdl.push(n as u8);
        }
        sdl.push(ISC_SDL_EOC);
        sdl
    }
}

fn stuff_string(sdl: &mut Vec<u8>, code: u8, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(255);
    sdl.push(code);
    sdl.push(len as u8);
    sdl.extend_from_slice(&bytes[..len]);
}

fn stuff_literal(sdl: &mut Vec<u8>, value: i32) {
    if let Ok(v) = i8::try_from(value) {
        sdl.push(ISC_SDL_TINY_INTEGER);
        sdl.push(v as u8);
    } else if let Ok(v) = i16::try_from(value) {
        sdl.push(ISC_SDL_SHORT_INTEGER);
        sdl.extend_from_slice(&v.to_le_bytes());
    } else {
        sdl.push(ISC_SDL_LONG_INTEGER);
        sdl.extend_from_slice(&value.to_le_bytes());
    }
}

/// A materialized array: bounds plus elements in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct FbArray {
    pub bounds: Vec<ArrayBound>,
    pub values: Vec<Storage>,
}

impl FbArray {
    /// Build a one-dimensional array indexed from 1.
    pub fn from_values(values: Vec<Storage>) -> Self {
        Self {
            bounds: vec![ArrayBound {
                lower: 1,
                upper: values.len() as i32,
            }],
            values,
        }
    }

    /// Element at the given subscripts (one per dimension).
    pub fn get(&self, subscripts: &[i32]) -> Option<&Storage> {
        if subscripts.len() != self.bounds.len() {
            return None;
        }
        let mut index = 0usize;
        for (s, b) in subscripts.iter().zip(&self.bounds) {
            if *s < b.lower || *s > b.upper {
                return None;
            }
            index = index * b.len() + (s - b.lower) as usize;
        }
        self.values.get(index)
    }
}
