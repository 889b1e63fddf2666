//! Array slices.
//!
//! The whole array is transferred as one slice. On the wire a slice is its
//! native byte length followed by every element in XDR form, in row-major
//! order; the element count is the byte length divided by the native
//! element size.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::messages::{GetSliceMessage, PutSliceMessage};
use crate::protocol::row::{read_value, write_value};
use crate::protocol::types::{ArrayBound, ArrayDescriptor, DbField, FbArray};
use crate::statement::Statement;
use std::sync::Arc;

const DESCRIPTOR_SQL: &str = "SELECT F.RDB$FIELD_TYPE, F.RDB$FIELD_SCALE, F.RDB$FIELD_LENGTH, \
     F.RDB$FIELD_SUB_TYPE, F.RDB$CHARACTER_SET_ID, F.RDB$DIMENSIONS \
     FROM RDB$RELATION_FIELDS X, RDB$FIELDS F \
     WHERE X.RDB$FIELD_SOURCE = F.RDB$FIELD_NAME \
     AND X.RDB$RELATION_NAME = ? AND X.RDB$FIELD_NAME = ?";

const BOUNDS_SQL: &str = "SELECT D.RDB$LOWER_BOUND, D.RDB$UPPER_BOUND \
     FROM RDB$FIELD_DIMENSIONS D, RDB$RELATION_FIELDS X \
     WHERE D.RDB$FIELD_NAME = X.RDB$FIELD_SOURCE \
     AND X.RDB$RELATION_NAME = ? AND X.RDB$FIELD_NAME = ? \
     ORDER BY D.RDB$DIMENSION";

/// Array column bound to a transaction.
#[derive(Debug, Clone)]
pub struct ArrayHandle {
    db: Database,
    transaction: i32,
    descriptor: Arc<ArrayDescriptor>,
}

impl ArrayHandle {
    pub fn new(db: &Database, transaction: i32, descriptor: Arc<ArrayDescriptor>) -> Self {
        Self {
            db: db.clone(),
            transaction,
            descriptor,
        }
    }

    /// Handle for `table.column`, reading the descriptor from the system tables.
    pub async fn lookup(db: &Database, transaction: i32, table: &str, column: &str) -> Result<Self> {
        let descriptor = lookup_descriptor(db, transaction, table, column).await?;
        Ok(Self::new(db, transaction, Arc::new(descriptor)))
    }

    /// Handle for an array field; the descriptor is cached on the field.
    pub(crate) async fn for_field(db: &Database, transaction: i32, field: &DbField) -> Result<Self> {
        if let Some(descriptor) = field.cached_array_descriptor() {
            return Ok(Self::new(db, transaction, descriptor));
        }
        let descriptor = Arc::new(lookup_descriptor(db, transaction, &field.relation, &field.name).await?);
        field.cache_array_descriptor(descriptor.clone());
        Ok(Self::new(db, transaction, descriptor))
    }

    pub fn descriptor(&self) -> &ArrayDescriptor {
        &self.descriptor
    }

    /// Read the whole array `array_id`.
    pub async fn get_slice(&self, array_id: i64) -> Result<FbArray> {
        let element = self.descriptor.element_field()?;
        let element_size = self.descriptor.element_size().max(1);
        let sdl = self.descriptor.to_sdl();

        let mut conv = self.db.conversation().await;
        conv.send(&GetSliceMessage {
            transaction: self.transaction,
            array_id,
            slice_length: self.descriptor.slice_length() as i32,
            sdl: &sdl,
        })
        .await?;

        let reader = conv.reader();
        let op = reader.read_operation().await?;
        if op == OP_RESPONSE {
            // Only an error reply comes back as op_response here
            crate::protocol::response::read_generic_body(reader).await?;
            return Err(Error::protocol("Slice request answered without data"));
        }
        if op != OP_SLICE {
            return Err(Error::UnexpectedOperation {
                expected: OP_SLICE,
                actual: op,
            });
        }
        let length = reader.read_i32().await?;
        let _repeated = reader.read_i32().await?;
        let count = length.max(0) as usize / element_size;

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(read_value(reader, &element).await?);
        }
        tracing::debug!(array_id, elements = count, "array slice read");

        Ok(FbArray {
            bounds: self.descriptor.bounds.clone(),
            values,
        })
    }

    /// Write `array` as a new array and return its id.
    pub async fn put_slice(&self, array: &FbArray) -> Result<i64> {
        let expected = self.descriptor.element_count();
        if array.values.len() != expected {
            return Err(Error::invalid_state(format!(
                "Array {}.{} holds {} elements, got {}",
                self.descriptor.relation,
                self.descriptor.field,
                expected,
                array.values.len()
            )));
        }
        let element = self.descriptor.element_field()?;
        let mut elements = Vec::new();
        for value in &array.values {
            write_value(&mut elements, &element, value)?;
        }
        let sdl = self.descriptor.to_sdl();

        let mut conv = self.db.conversation().await;
        let response = conv
            .call(&PutSliceMessage {
                transaction: self.transaction,
                slice_length: self.descriptor.slice_length() as i32,
                sdl: &sdl,
                elements: &elements,
            })
            .await?;
        tracing::debug!(array_id = response.blob_id, elements = expected, "array slice written");
        Ok(response.blob_id)
    }
}

/// Read an array column's descriptor from the system tables.
pub async fn lookup_descriptor(
    db: &Database,
    transaction: i32,
    table: &str,
    column: &str,
) -> Result<ArrayDescriptor> {
    let mut statement = Statement::new(db);
    statement.set_transaction_handle(transaction);
    let result = query_descriptor(&mut statement, table, column).await;
    let released = statement.release().await;
    let descriptor = result?;
    released?;
    Ok(descriptor)
}

async fn run_lookup(statement: &mut Statement, sql: &str, table: &str, column: &str) -> Result<()> {
    statement.prepare(sql).await?;
    let parameters = statement
        .parameters_mut()
        .ok_or_else(|| Error::protocol("Lookup statement has no parameters"))?;
    parameters.set_value(0, table)?;
    parameters.set_value(1, column)?;
    statement.execute_direct().await
}

async fn query_descriptor(statement: &mut Statement, table: &str, column: &str) -> Result<ArrayDescriptor> {
    run_lookup(statement, DESCRIPTOR_SQL, table, column).await?;
    let row = statement.fetch().await?.ok_or_else(|| {
        Error::invalid_state(format!("Array column {}.{} not found", table, column))
    })?;

    let small = |index: usize| -> Result<i16> {
        match row.get(index) {
            Some(value) if !value.is_null() => value.get_i16(),
            _ => Ok(0),
        }
    };
    let blr_type = small(0)? as u8;
    let scale = small(1)?;
    let length = small(2)?;
    let sub_type = match blr_type {
        BLR_TEXT | BLR_TEXT2 | BLR_CSTRING | BLR_VARYING | BLR_VARYING2 => small(4)?,
        _ => small(3)?,
    };
    let dimensions = small(5)?.max(0) as usize;
    statement.close().await;

    run_lookup(statement, BOUNDS_SQL, table, column).await?;
    let mut bounds = Vec::with_capacity(dimensions);
    while let Some(row) = statement.fetch().await? {
        match row {
            [lower, upper, ..] => bounds.push(ArrayBound {
                lower: lower.get_i32()?,
                upper: upper.get_i32()?,
            }),
            _ => return Err(Error::protocol("Array bounds row is too short")),
        }
    }
    statement.close().await;

    if bounds.len() != dimensions {
        return Err(Error::protocol(format!(
            "Array {}.{} declares {} dimensions, found {}",
            table,
            column,
            dimensions,
            bounds.len()
        )));
    }

    Ok(ArrayDescriptor {
        relation: table.to_string(),
        field: column.to_string(),
        blr_type,
        scale,
        length,
        sub_type,
        bounds,
    })
}
