//! Value holder bound to a field and, for lazy payloads, to a connection.

use crate::array::ArrayHandle;
use crate::blob::BlobReader;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::codec::FbDecFloat;
use crate::protocol::constants::BLOB_SUB_TYPE_TEXT;
use crate::protocol::row::write_value;
use crate::protocol::types::{DbField, FbArray, FbZonedDateTime, FbZonedTime, Storage};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Connection and transaction a statement's values read blobs and arrays through.
pub struct ValueLink {
    db: Database,
    transaction: Mutex<Option<i32>>,
}

impl fmt::Debug for ValueLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueLink")
            .field("transaction", &self.transaction.lock().ok().and_then(|g| *g))
            .finish()
    }
}

impl ValueLink {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            transaction: Mutex::new(None),
        }
    }

    pub(crate) fn set_transaction(&self, handle: Option<i32>) {
        if let Ok(mut guard) = self.transaction.lock() {
            *guard = handle;
        }
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Handle of the transaction values are read under.
    pub(crate) fn transaction(&self) -> Result<i32> {
        self.transaction
            .lock()
            .ok()
            .and_then(|g| *g)
            .ok_or_else(|| Error::invalid_state("No transaction is associated with the statement"))
    }
}

/// One column value of a fetched row.
///
/// BLOB and ARRAY columns arrive as an `Int64` id; the first call to
/// [`get_string`](Self::get_string), [`get_binary`](Self::get_binary) or
/// [`get_array`](Self::get_array) reads the payload and replaces the id.
#[derive(Debug, Clone)]
pub struct DbValue {
    storage: Storage,
    field: Arc<DbField>,
    link: Option<Arc<ValueLink>>,
}

impl DbValue {
    pub fn new(field: Arc<DbField>, link: Option<Arc<ValueLink>>) -> Self {
        Self {
            storage: Storage::Null,
            field,
            link,
        }
    }

    /// A detached value, mostly useful for tests and conversions.
    pub fn with_storage(field: Arc<DbField>, storage: Storage) -> Self {
        Self {
            storage,
            field,
            link: None,
        }
    }

    pub fn field(&self) -> &DbField {
        &self.field
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn is_null(&self) -> bool {
        self.storage.is_null()
    }

    /// Blob or array id while the payload has not been read.
    pub fn lazy_id(&self) -> Option<i64> {
        match self.storage {
            Storage::Int64(id) if self.field.is_blob() || self.field.is_array() => Some(id),
            _ => None,
        }
    }

    fn scalar(&self) -> Result<&Storage> {
        if self.storage.is_null() {
            return Err(Error::NullValue {
                column: self.field.label().to_string(),
            });
        }
        if self.lazy_id().is_some() {
            return Err(Error::type_conversion(format!(
                "Column {} must be read with get_string, get_binary or get_array",
                self.field.label()
            )));
        }
        Ok(&self.storage)
    }

    pub fn get_bool(&self) -> Result<bool> {
        self.scalar()?.to_bool()
    }

    pub fn get_u8(&self) -> Result<u8> {
        self.scalar()?.to_u8()
    }

    pub fn get_i16(&self) -> Result<i16> {
        self.scalar()?.to_i16()
    }

    pub fn get_i32(&self) -> Result<i32> {
        self.scalar()?.to_i32()
    }

    pub fn get_i64(&self) -> Result<i64> {
        self.scalar()?.to_i64()
    }

    pub fn get_i128(&self) -> Result<i128> {
        self.scalar()?.to_i128()
    }

    pub fn get_f32(&self) -> Result<f32> {
        self.scalar()?.to_f32()
    }

    pub fn get_f64(&self) -> Result<f64> {
        self.scalar()?.to_f64()
    }

    pub fn get_decimal(&self) -> Result<Decimal> {
        self.scalar()?.to_decimal()
    }

    pub fn get_decfloat(&self) -> Result<FbDecFloat> {
        self.scalar()?.to_decfloat()
    }

    pub fn get_guid(&self) -> Result<Uuid> {
        self.scalar()?.to_guid()
    }

    pub fn get_date(&self) -> Result<NaiveDate> {
        self.scalar()?.to_date()
    }

    pub fn get_datetime(&self) -> Result<NaiveDateTime> {
        self.scalar()?.to_datetime()
    }

    pub fn get_time(&self) -> Result<NaiveTime> {
        self.scalar()?.to_time()
    }

    pub fn get_zoned_datetime(&self) -> Result<FbZonedDateTime> {
        self.scalar()?.to_zoned_datetime()
    }

    pub fn get_zoned_time(&self) -> Result<FbZonedTime> {
        self.scalar()?.to_zoned_time()
    }

    /// Textual form of an already materialized value.
    pub fn get_text(&self) -> Result<String> {
        self.scalar()?.to_text()
    }

    /// String value; text blobs are read on first access.
    pub async fn get_string(&mut self) -> Result<String> {
        self.materialize().await?;
        self.get_text()
    }

    /// Byte value; blobs are read on first access.
    pub async fn get_binary(&mut self) -> Result<Bytes> {
        self.materialize().await?;
        self.scalar()?.to_bytes()
    }

    /// Array value; the slice is read on first access.
    pub async fn get_array(&mut self) -> Result<FbArray> {
        self.materialize().await?;
        match self.scalar()? {
            Storage::Array(array) => Ok(array.clone()),
            other => Err(Error::type_conversion(format!(
                "Cannot convert {} to Array",
                other.kind()
            ))),
        }
    }

    async fn materialize(&mut self) -> Result<()> {
        let Some(id) = self.lazy_id() else {
            return Ok(());
        };
        let link = self
            .link
            .as_ref()
            .ok_or_else(|| Error::invalid_state("Value is not attached to a connection"))?;
        let transaction = link.transaction()?;

        if self.field.is_blob() {
            let reader = BlobReader::open(link.database(), transaction, id).await?;
            let data = reader.read_all().await?;
            self.storage = if self.field.sub_type == BLOB_SUB_TYPE_TEXT {
                Storage::String(self.field.charset().decode(&data)?)
            } else {
                Storage::Binary(Bytes::from(data))
            };
        } else {
            let handle = ArrayHandle::for_field(link.database(), transaction, &self.field).await?;
            self.storage = Storage::Array(handle.get_slice(id).await?);
        }
        Ok(())
    }

    /// Detach the current storage, leaving NULL behind.
    pub fn export_storage(&mut self) -> Storage {
        std::mem::take(&mut self.storage)
    }

    /// Replace the storage, returning the previous one.
    pub fn import_storage(&mut self, storage: Storage) -> Storage {
        std::mem::replace(&mut self.storage, storage)
    }

    /// Rebind the holder to another field and connection.
    pub fn bind(&mut self, field: Arc<DbField>, link: Option<Arc<ValueLink>>) {
        self.field = field;
        self.link = link;
    }

    /// The value in the exact XDR form used to send it as a parameter.
    pub fn get_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        write_value(&mut buf, &self.field, &self.storage)?;
        Ok(buf)
    }
}
