//! Blob streaming.
//!
//! A blob is read with `op_get_segment`, which returns a data buffer holding
//! one or more `[u16 LE length, bytes]` chunks, and written with
//! `op_put_segment`. Both streams are bound to one transaction.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;
use crate::protocol::messages::{
    BlobInfoMessage, GetSegmentMessage, HandleMessage, OpenBlobMessage, PutSegmentMessage,
    SeekBlobMessage,
};
use crate::protocol::types::Charset;
use bytes::Bytes;
use futures::Stream;

/// Origin for [`BlobReader::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    FromStart,
    FromCurrent,
    FromEnd,
}

impl SeekMode {
    fn code(self) -> i32 {
        match self {
            Self::FromStart => BLOB_SEEK_FROM_START,
            Self::FromCurrent => BLOB_SEEK_FROM_CURRENT,
            Self::FromEnd => BLOB_SEEK_FROM_END,
        }
    }
}

// ============================================================================
// Shared primitives
// ============================================================================

async fn open(db: &Database, operation: i32, transaction: i32, blob_id: i64) -> Result<(i32, i64)> {
    let mut conv = db.conversation().await;
    let response = conv
        .call(&OpenBlobMessage {
            operation,
            bpb: &[],
            transaction,
            blob_id,
        })
        .await?;
    Ok((response.handle, response.blob_id))
}

async fn release(db: &Database, operation: i32, handle: i32) -> Result<()> {
    let mut conv = db.conversation().await;
    conv.call(&HandleMessage::new(operation, handle)).await.map(|_| ())
}

/// Parse the info reply to a total-length request.
fn parse_total_length(data: Bytes) -> Result<i64> {
    let mut buf = ReadBuffer::new(data);
    while let Some(item) = buf.peek_u8() {
        buf.skip(1)?;
        match item {
            ISC_INFO_END => break,
            ISC_INFO_BLOB_TOTAL_LENGTH => return buf.read_clumplet_int(),
            ISC_INFO_TRUNCATED | ISC_INFO_ERROR => {
                return Err(Error::protocol(format!("Blob info item rejected: {}", item)));
            }
            _ => {
                buf.read_clumplet_bytes()?;
            }
        }
    }
    Err(Error::protocol("Blob info reply carries no total length"))
}

// ============================================================================
// Reader
// ============================================================================

/// Open blob being read segment by segment.
///
/// One segment reply is buffered at a time; [`read`](Self::read) drains it
/// before the next one is requested.
#[derive(Debug)]
pub struct BlobReader {
    db: Database,
    handle: i32,
    blob_id: i64,
    segment_size: usize,
    buffer: Vec<u8>,
    pos: usize,
    eof: bool,
    open: bool,
}

impl BlobReader {
    /// Open blob `blob_id` under `transaction`.
    pub async fn open(db: &Database, transaction: i32, blob_id: i64) -> Result<Self> {
        let (handle, _) = open(db, OP_OPEN_BLOB2, transaction, blob_id).await?;
        tracing::debug!(blob_id, handle, "blob opened");
        Ok(Self {
            db: db.clone(),
            handle,
            blob_id,
            segment_size: db.options().segment_size(),
            buffer: Vec::new(),
            pos: 0,
            eof: false,
            open: true,
        })
    }

    pub fn blob_id(&self) -> i64 {
        self.blob_id
    }

    /// Whether every segment has been received and consumed.
    pub fn is_eof(&self) -> bool {
        self.eof && self.pos >= self.buffer.len()
    }

    /// Total blob length as reported by the server.
    pub async fn total_length(&self) -> Result<i64> {
        let mut conv = self.db.conversation().await;
        let response = conv
            .call(&BlobInfoMessage {
                blob: self.handle,
                items: &[ISC_INFO_BLOB_TOTAL_LENGTH, ISC_INFO_END],
                buffer_length: BLOB_INFO_BUFFER_SIZE,
            })
            .await?;
        parse_total_length(response.data)
    }

    /// Replace the buffered segment with the next reply from the server.
    async fn fetch_segment(&mut self) -> Result<()> {
        let response = {
            let mut conv = self.db.conversation().await;
            conv.call(&GetSegmentMessage {
                blob: self.handle,
                segment_length: self.segment_size as i32,
            })
            .await?
        };

        self.buffer.clear();
        self.pos = 0;
        let mut data = ReadBuffer::new(response.data);
        while data.has_remaining(2) {
            let chunk = data.read_clumplet_bytes()?;
            self.buffer.extend_from_slice(&chunk);
        }
        if response.handle == BLOB_EOF {
            self.eof = true;
        }
        Ok(())
    }

    /// Copy up to `buf.len()` bytes; returns 0 at the end of the blob.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.buffer.len() {
            if self.eof {
                return Ok(0);
            }
            self.fetch_segment().await?;
        }
        let n = buf.len().min(self.buffer.len() - self.pos);
        buf[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    /// Reposition the blob; returns the new offset. Only stream blobs support this.
    pub async fn seek(&mut self, offset: i32, mode: SeekMode) -> Result<i32> {
        let response = {
            let mut conv = self.db.conversation().await;
            conv.call(&SeekBlobMessage {
                blob: self.handle,
                mode: mode.code(),
                offset,
            })
            .await?
        };
        self.buffer.clear();
        self.pos = 0;
        self.eof = false;
        Ok(response.handle)
    }

    /// Read the remaining content and close the blob.
    ///
    /// The blob is closed whether or not the read succeeds; a read error
    /// takes precedence over a close error.
    pub async fn read_all(mut self) -> Result<Vec<u8>> {
        let result = self.read_remaining().await;
        self.open = false;
        let closed = release(&self.db, OP_CLOSE_BLOB, self.handle).await;
        let data = result?;
        closed?;
        Ok(data)
    }

    async fn read_remaining(&mut self) -> Result<Vec<u8>> {
        let length = self.total_length().await?;
        if length < 0 {
            return Err(Error::protocol(format!("Negative blob length: {}", length)));
        }
        let mut data = Vec::with_capacity(initial_capacity(length, self.segment_size));
        data.extend_from_slice(&self.buffer[self.pos..]);
        self.pos = self.buffer.len();
        while !self.eof {
            self.fetch_segment().await?;
            data.extend_from_slice(&self.buffer);
            self.pos = self.buffer.len();
        }
        Ok(data)
    }

    /// Read the remaining content as text in `charset`.
    pub async fn read_string(self, charset: Charset) -> Result<String> {
        let data = self.read_all().await?;
        charset.decode(&data)
    }

    pub async fn close(mut self) -> Result<()> {
        self.open = false;
        release(&self.db, OP_CLOSE_BLOB, self.handle).await
    }

    pub async fn cancel(mut self) -> Result<()> {
        self.open = false;
        release(&self.db, OP_CANCEL_BLOB, self.handle).await
    }

    /// Stream the remaining segments; the blob is closed at the end.
    pub fn into_segment_stream(self) -> impl Stream<Item = Result<Bytes>> + Send {
        futures::stream::unfold(Some(self), |state| async move {
            let mut reader = state?;
            loop {
                if reader.pos < reader.buffer.len() {
                    let chunk = Bytes::copy_from_slice(&reader.buffer[reader.pos..]);
                    reader.pos = reader.buffer.len();
                    return Some((Ok(chunk), Some(reader)));
                }
                if reader.eof {
                    return match reader.close().await {
                        Ok(()) => None,
                        Err(e) => Some((Err(e), None)),
                    };
                }
                if let Err(e) = reader.fetch_segment().await {
                    if let Err(close_error) = reader.close().await {
                        tracing::debug!(error = %close_error, "closing blob after failed read");
                    }
                    return Some((Err(e), None));
                }
            }
        })
    }
}

/// Segments worth of buffer reserved up front by [`BlobReader::read_all`].
const PREALLOCATED_SEGMENTS: usize = 16;

/// Pre-allocation for a blob of reported `length`, bounded so a bogus
/// length cannot force a huge allocation.
fn initial_capacity(length: i64, segment_size: usize) -> usize {
    usize::try_from(length)
        .unwrap_or(0)
        .min(segment_size.max(1).saturating_mul(PREALLOCATED_SEGMENTS))
}

impl Drop for BlobReader {
    fn drop(&mut self) {
        if self.open {
            tracing::debug!(handle = self.handle, "blob reader dropped while open");
        }
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Newly created blob being written.
#[derive(Debug)]
pub struct BlobWriter {
    db: Database,
    handle: i32,
    blob_id: i64,
    segment_size: usize,
    open: bool,
}

impl BlobWriter {
    /// Create an empty blob under `transaction`.
    pub async fn create(db: &Database, transaction: i32) -> Result<Self> {
        let (handle, blob_id) = open(db, OP_CREATE_BLOB2, transaction, 0).await?;
        tracing::debug!(blob_id, handle, "blob created");
        Ok(Self {
            db: db.clone(),
            handle,
            blob_id,
            segment_size: db.options().segment_size(),
            open: true,
        })
    }

    /// Id to store in a BLOB column once the writer is closed.
    pub fn blob_id(&self) -> i64 {
        self.blob_id
    }

    /// Append `data` in segments of at most the segment size.
    ///
    /// On failure the blob is cancelled before the error is returned.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(self.segment_size.max(1)) {
            let result = {
                let mut conv = self.db.conversation().await;
                conv.call(&PutSegmentMessage {
                    blob: self.handle,
                    data: chunk,
                })
                .await
            };
            if let Err(e) = result {
                self.open = false;
                if let Err(cancel_err) = release(&self.db, OP_CANCEL_BLOB, self.handle).await {
                    tracing::debug!(error = %cancel_err, "blob cancel after failed write");
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Finish the blob and return its id.
    pub async fn close(mut self) -> Result<i64> {
        if !self.open {
            return Err(Error::invalid_state("Blob was cancelled."));
        }
        self.open = false;
        release(&self.db, OP_CLOSE_BLOB, self.handle).await?;
        Ok(self.blob_id)
    }

    /// Discard the blob.
    pub async fn cancel(mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        release(&self.db, OP_CANCEL_BLOB, self.handle).await
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if self.open {
            tracing::debug!(handle = self.handle, "blob writer dropped while open");
        }
    }
}

/// Create a blob holding `data` and return its id.
pub async fn write_blob(db: &Database, transaction: i32, data: &[u8]) -> Result<i64> {
    let mut writer = BlobWriter::create(db, transaction).await?;
    writer.write(data).await?;
    writer.close().await
}
