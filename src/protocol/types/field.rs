//! Field descriptor: one column of a result row or one statement parameter.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::types::{ArrayDescriptor, Charset, DbDataType, Storage};
use std::sync::{Arc, Mutex};

/// One column or parameter, as described by the server.
#[derive(Debug)]
pub struct DbField {
    /// Raw SQL type code; odd values are nullable.
    pub sql_type: i32,
    pub sub_type: i16,
    pub scale: i16,
    /// Byte length of the value.
    pub length: i16,
    pub name: String,
    pub relation: String,
    pub owner: String,
    pub alias: String,
    /// Current parameter value (parameter descriptors only).
    pub(crate) value: Storage,
    /// Charset used when the column does not name one.
    pub(crate) connection_charset: Charset,
    /// Array layout, looked up on first use.
    pub(crate) array_descriptor: Mutex<Option<Arc<ArrayDescriptor>>>,
}

impl Clone for DbField {
    fn clone(&self) -> Self {
        Self {
            sql_type: self.sql_type,
            sub_type: self.sub_type,
            scale: self.scale,
            length: self.length,
            name: self.name.clone(),
            relation: self.relation.clone(),
            owner: self.owner.clone(),
            alias: self.alias.clone(),
            value: self.value.clone(),
            connection_charset: self.connection_charset,
            array_descriptor: Mutex::new(self.cached_array_descriptor()),
        }
    }
}

impl Default for DbField {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl DbField {
    /// Create a field of the given SQL type and byte length.
    pub fn new(sql_type: i32, length: i16) -> Self {
        Self {
            sql_type,
            sub_type: 0,
            scale: 0,
            length,
            name: String::new(),
            relation: String::new(),
            owner: String::new(),
            alias: String::new(),
            value: Storage::Null,
            connection_charset: Charset::default(),
            array_descriptor: Mutex::new(None),
        }
    }

    /// SQL type without the nullable bit.
    pub fn base_type(&self) -> i32 {
        self.sql_type & !1
    }

    pub fn is_nullable(&self) -> bool {
        self.sql_type & 1 != 0
    }

    pub fn is_blob(&self) -> bool {
        self.base_type() == SQL_BLOB
    }

    pub fn is_array(&self) -> bool {
        self.base_type() == SQL_ARRAY
    }

    /// Charset of a text column or text blob.
    ///
    /// Text columns carry the charset id in the low byte of the subtype,
    /// text blobs in the scale. Ids the client does not know resolve to the
    /// connection charset.
    pub fn charset(&self) -> Charset {
        let id = match self.base_type() {
            SQL_TEXT | SQL_VARYING => (self.sub_type & 0xFF) as u8,
            SQL_BLOB if self.sub_type == BLOB_SUB_TYPE_TEXT => (self.scale & 0xFF) as u8,
            _ => return self.connection_charset,
        };
        match id {
            CS_DYNAMIC => self.connection_charset,
            id => Charset::from_id(id).unwrap_or(self.connection_charset),
        }
    }

    /// Declared length in characters for text columns.
    pub fn char_count(&self) -> usize {
        let length = self.length.max(0) as usize;
        let bpc = self.charset().bytes_per_char();
        if bpc > 1 && length % bpc == 0 {
            length / bpc
        } else {
            length
        }
    }

    /// Logical data type.
    pub fn data_type(&self) -> Result<DbDataType> {
        DbDataType::from_sql_type(self.sql_type, self.sub_type, self.scale, self.length, self.charset())
    }

    /// Column label: the alias when present, otherwise the name.
    pub fn label(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }

    /// Assign the parameter value.
    pub fn set_value(&mut self, value: impl Into<Storage>) {
        self.value = value.into();
    }

    /// Current parameter value.
    pub fn value(&self) -> &Storage {
        &self.value
    }

    pub(crate) fn cached_array_descriptor(&self) -> Option<Arc<ArrayDescriptor>> {
        self.array_descriptor.lock().ok().and_then(|guard| guard.clone())
    }

    pub(crate) fn cache_array_descriptor(&self, descriptor: Arc<ArrayDescriptor>) {
        if let Ok(mut guard) = self.array_descriptor.lock() {
            *guard = Some(descriptor);
        }
    }

    pub(crate) fn clear_array_descriptor(&self) {
        if let Ok(mut guard) = self.array_descriptor.lock() {
            *guard = None;
        }
    }
}
