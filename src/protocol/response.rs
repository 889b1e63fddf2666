//! Response envelopes.
//!
//! After a request the server answers with one of:
//! - `op_response`: object handle, blob/array id, data buffer, status vector
//! - `op_sql_response`: message count, followed by an output row when 1
//! - `op_fetch_response`: fetch status and row count, followed by a row
//! - `op_batch_cs`: batch completion state

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::status::{IscException, StatusEntry};
use crate::protocol::stream::XdrReader;
use bytes::Bytes;
use std::collections::BTreeMap;
use tokio::io::AsyncRead;

/// Reply to most requests.
#[derive(Debug, Clone, Default)]
pub struct GenericResponse {
    /// Object handle (statement, transaction, blob) or operation-specific value.
    pub handle: i32,
    /// Blob or array id.
    pub blob_id: i64,
    /// Operation-specific data, usually an info buffer.
    pub data: Bytes,
    /// Warnings sent along with a successful reply.
    pub warning: Option<IscException>,
}

/// Reply to `op_execute2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlResponse {
    /// 1 when an output row follows, else 0.
    pub count: i32,
}

/// One reply frame to `op_fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchResponse {
    /// 0 while rows are delivered, 100 at end of cursor.
    pub status: i32,
    /// 1 when a row follows.
    pub count: i32,
}

/// Fetch status marking the end of the cursor.
pub const FETCH_END_OF_CURSOR: i32 = 100;

/// Result of executing a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchCompletion {
    /// Number of messages processed.
    pub record_count: i32,
    /// Per-message update counts.
    pub update_counts: Vec<i32>,
    /// Messages that failed, with the detailed error when one was reported.
    pub errors: BTreeMap<usize, Option<IscException>>,
}

impl BatchCompletion {
    /// Whether every message succeeded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error for message `index`, if it failed.
    pub fn error_for(&self, index: usize) -> Option<&Option<IscException>> {
        self.errors.get(&index)
    }
}

/// Any response envelope.
#[derive(Debug, Clone)]
pub enum Response {
    Generic(GenericResponse),
    Sql(SqlResponse),
    Fetch(FetchResponse),
    Batch(BatchCompletion),
}

/// Split status entries into an error or an optional warning.
pub fn check_status(entries: Vec<StatusEntry>) -> Result<Option<IscException>> {
    if entries.is_empty() {
        return Ok(None);
    }
    let ex = IscException::from_entries(entries);
    if ex.is_warning() {
        Ok(Some(ex))
    } else if ex.entries.iter().any(|e| matches!(e, StatusEntry::Gds(_))) {
        Err(Error::Isc(ex))
    } else {
        Ok(None)
    }
}

/// Read the body of an `op_response` (after the operation code).
pub async fn read_generic_body<R: AsyncRead + Unpin>(
    reader: &mut XdrReader<R>,
) -> Result<GenericResponse> {
    let handle = reader.read_i32().await?;
    let blob_id = reader.read_i64().await?;
    let data = reader.read_buffer().await?;
    let entries = reader.read_status_vector().await?;
    let warning = check_status(entries)?;
    Ok(GenericResponse {
        handle,
        blob_id,
        data,
        warning,
    })
}

/// Read the body of an `op_batch_cs` (after the operation code).
pub async fn read_batch_completion_body<R: AsyncRead + Unpin>(
    reader: &mut XdrReader<R>,
) -> Result<BatchCompletion> {
    let _statement = reader.read_i32().await?;
    let record_count = reader.read_i32().await?;
    let updates = reader.read_i32().await?;
    let vectors = reader.read_i32().await?;
    let errors = reader.read_i32().await?;

    let mut completion = BatchCompletion {
        record_count,
        update_counts: Vec::with_capacity(updates.max(0) as usize),
        errors: BTreeMap::new(),
    };

    for _ in 0..updates.max(0) {
        completion.update_counts.push(reader.read_i32().await?);
    }
    for _ in 0..vectors.max(0) {
        let index = reader.read_i32().await?;
        let entries = reader.read_status_vector().await?;
        let ex = (!entries.is_empty()).then(|| IscException::from_entries(entries));
        completion.errors.insert(index.max(0) as usize, ex);
    }
    for _ in 0..errors.max(0) {
        let index = reader.read_i32().await?;
        completion.errors.entry(index.max(0) as usize).or_insert(None);
    }

    Ok(completion)
}

/// Read the next response envelope.
///
/// For `op_sql_response` and `op_fetch_response` only the header is consumed;
/// the caller reads the row that follows when `count` is 1.
pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut XdrReader<R>) -> Result<Response> {
    let op = reader.read_operation().await?;
    match op {
        OP_RESPONSE => Ok(Response::Generic(read_generic_body(reader).await?)),
        OP_SQL_RESPONSE => {
            let count = reader.read_i32().await?;
            Ok(Response::Sql(SqlResponse { count }))
        }
        OP_FETCH_RESPONSE => {
            let status = reader.read_i32().await?;
            let count = reader.read_i32().await?;
            Ok(Response::Fetch(FetchResponse { status, count }))
        }
        OP_BATCH_CS => Ok(Response::Batch(read_batch_completion_body(reader).await?)),
        other => Err(Error::UnexpectedOperation {
            expected: OP_RESPONSE,
            actual: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::WriteExt;

    fn ok_response(handle: i32, data: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.write_i32(OP_RESPONSE);
        raw.write_i32(handle);
        raw.write_i64(0x0000_0001_0000_0002);
        raw.write_buffer(data);
        raw.write_i32(ISC_ARG_GDS);
        raw.write_i32(0);
        raw.write_i32(ISC_ARG_END);
        raw
    }

    #[tokio::test]
    async fn test_generic_response() {
        let raw = ok_response(7, &[1, 2, 3]);
        let mut reader = XdrReader::new(&raw[..]);
        match read_response(&mut reader).await.unwrap() {
            Response::Generic(r) => {
                assert_eq!(r.handle, 7);
                assert_eq!(r.blob_id, 0x0000_0001_0000_0002);
                assert_eq!(&r.data[..], &[1, 2, 3]);
                assert!(r.warning.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_response() {
        let mut raw = Vec::new();
        raw.write_i32(OP_RESPONSE);
        raw.write_i32(0);
        raw.write_i64(0);
        raw.write_buffer(&[]);
        raw.write_i32(ISC_ARG_GDS);
        raw.write_i32(335544580);
        raw.write_i32(ISC_ARG_END);

        let mut reader = XdrReader::new(&raw[..]);
        let err = read_response(&mut reader).await.unwrap_err();
        assert_eq!(err.error_code(), 335544580);
        assert_eq!(err.sql_state(), "42S02");
    }

    #[tokio::test]
    async fn test_batch_completion() {
        let mut raw = Vec::new();
        raw.write_i32(OP_BATCH_CS);
        raw.write_i32(1); // statement
        raw.write_i32(3); // records
        raw.write_i32(3); // update counts
        raw.write_i32(1); // vectors
        raw.write_i32(1); // simple errors
        raw.write_i32(1);
        raw.write_i32(-1);
        raw.write_i32(1);
        raw.write_i32(1);
        raw.write_i32(ISC_ARG_GDS);
        raw.write_i32(335544665);
        raw.write_i32(ISC_ARG_END);
        raw.write_i32(2);

        let mut reader = XdrReader::new(&raw[..]);
        let Response::Batch(done) = read_response(&mut reader).await.unwrap() else {
            panic!("expected batch completion");
        };
        assert_eq!(done.record_count, 3);
        assert_eq!(done.update_counts, vec![1, -1, 1]);
        assert_eq!(done.errors.len(), 2);
        assert_eq!(
            done.error_for(1).unwrap().as_ref().unwrap().error_code,
            335544665
        );
        assert!(done.error_for(2).unwrap().is_none());
        assert!(!done.is_success());
    }
}
