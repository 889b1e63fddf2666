//! XDR reader/writer over a split connection.
//!
//! The read half is buffered; every primitive consumes its XDR padding. The
//! write half sends one fully serialized request at a time and flushes it.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::message::{xdr_pad, Message};
use crate::protocol::status::StatusEntry;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Read buffer capacity for the connection.
const READ_BUFFER_SIZE: usize = 32 * 1024;

/// XDR reader over the read half of a connection.
pub struct XdrReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> XdrReader<R> {
    /// Create a new reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(READ_BUFFER_SIZE, inner),
        }
    }

    async fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner
            .read_exact(buf)
            .await
            .map(|_| ())
            .map_err(Error::net_read)
    }

    async fn skip_pad(&mut self, len: usize) -> Result<()> {
        let pad = xdr_pad(len);
        if pad > 0 {
            let mut scratch = [0u8; 3];
            self.fill(&mut scratch[..pad]).await?;
        }
        Ok(())
    }

    /// Read exactly `n` bytes without padding.
    pub async fn read_raw(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        self.fill(&mut buf).await?;
        Ok(buf.freeze())
    }

    /// Read a big-endian i32.
    pub async fn read_i32(&mut self) -> Result<i32> {
        let mut b = [0u8; 4];
        self.fill(&mut b).await?;
        Ok(i32::from_be_bytes(b))
    }

    /// Read a big-endian u32.
    pub async fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_i32().await? as u32)
    }

    /// Read a big-endian i64.
    pub async fn read_i64(&mut self) -> Result<i64> {
        let mut b = [0u8; 8];
        self.fill(&mut b).await?;
        Ok(i64::from_be_bytes(b))
    }

    /// Read a big-endian f32.
    pub async fn read_f32(&mut self) -> Result<f32> {
        let mut b = [0u8; 4];
        self.fill(&mut b).await?;
        Ok(f32::from_be_bytes(b))
    }

    /// Read a big-endian f64.
    pub async fn read_f64(&mut self) -> Result<f64> {
        let mut b = [0u8; 8];
        self.fill(&mut b).await?;
        Ok(f64::from_be_bytes(b))
    }

    /// Read `len` bytes of opaque data and its padding.
    pub async fn read_opaque(&mut self, len: usize) -> Result<Bytes> {
        let data = self.read_raw(len).await?;
        self.skip_pad(len).await?;
        Ok(data)
    }

    /// Read a length-prefixed buffer.
    pub async fn read_buffer(&mut self) -> Result<Bytes> {
        let len = self.read_i32().await?;
        if len < 0 {
            return Err(Error::protocol(format!("Negative buffer length: {}", len)));
        }
        self.read_opaque(len as usize).await
    }

    /// Read a length-prefixed string, replacing invalid UTF-8.
    pub async fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_buffer().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a boolean sent as one byte plus padding.
    pub async fn read_boolean(&mut self) -> Result<bool> {
        let b = self.read_opaque(1).await?;
        Ok(b[0] != 0)
    }

    /// Read the next operation code, skipping keep-alive `op_dummy`.
    pub async fn read_operation(&mut self) -> Result<i32> {
        loop {
            let op = self.read_i32().await?;
            if op != OP_DUMMY {
                tracing::trace!(op = operation_name(op), "received operation");
                return Ok(op);
            }
        }
    }

    /// Read a status vector up to `isc_arg_end`.
    pub async fn read_status_vector(&mut self) -> Result<Vec<StatusEntry>> {
        let mut entries = Vec::new();
        loop {
            let arg = self.read_i32().await?;
            match arg {
                ISC_ARG_END => break,
                ISC_ARG_GDS => {
                    let code = self.read_i32().await?;
                    if code != 0 {
                        entries.push(StatusEntry::Gds(code));
                    }
                }
                ISC_ARG_WARNING => {
                    let code = self.read_i32().await?;
                    if code != 0 {
                        entries.push(StatusEntry::Warning(code));
                    }
                }
                ISC_ARG_STRING | ISC_ARG_CSTRING => {
                    entries.push(StatusEntry::String(self.read_string().await?));
                }
                ISC_ARG_INTERPRETED => {
                    entries.push(StatusEntry::Interpreted(self.read_string().await?));
                }
                ISC_ARG_SQL_STATE => {
                    entries.push(StatusEntry::SqlState(self.read_string().await?));
                }
                ISC_ARG_NUMBER => {
                    entries.push(StatusEntry::Number(self.read_i32().await?));
                }
                _ => {
                    // Unknown argument kinds carry a single integer
                    let value = self.read_i32().await?;
                    entries.push(StatusEntry::Number(value));
                }
            }
        }
        Ok(entries)
    }
}

/// XDR writer over the write half of a connection.
pub struct XdrWriter<W> {
    inner: W,
    scratch: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> XdrWriter<W> {
    /// Create a new writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: Vec::new(),
        }
    }

    /// Write already serialized bytes and flush.
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).await.map_err(Error::net_write)?;
        self.inner.flush().await.map_err(Error::net_write)
    }

    /// Serialize a request into the reusable scratch buffer and send it.
    pub async fn send_message<M: Message>(&mut self, msg: &M) -> Result<()> {
        let mut buf = std::mem::take(&mut self.scratch);
        buf.clear();
        buf.reserve(msg.wire_size());
        let result = match msg.write_to(&mut buf) {
            Ok(()) => {
                tracing::trace!(
                    op = operation_name(msg.operation()),
                    size = buf.len(),
                    "sending request"
                );
                self.write_all(&buf).await
            }
            Err(e) => Err(e),
        };
        self.scratch = buf;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{XdrReader, XdrWriter};
    use crate::protocol::constants::*;
    use crate::protocol::message::WriteExt;
    use crate::protocol::messages::HandleMessage;
    use crate::protocol::status::StatusEntry;

    #[tokio::test]
    async fn test_read_primitives_consume_padding() {
        let mut raw = Vec::new();
        raw.write_i32(OP_DUMMY);
        raw.write_i32(OP_RESPONSE);
        raw.write_buffer(b"abc");
        raw.write_boolean(true);
        raw.write_i64(-5);

        let mut reader = XdrReader::new(&raw[..]);
        assert_eq!(reader.read_operation().await.unwrap(), OP_RESPONSE);
        assert_eq!(&reader.read_buffer().await.unwrap()[..], b"abc");
        assert!(reader.read_boolean().await.unwrap());
        assert_eq!(reader.read_i64().await.unwrap(), -5);
    }

    #[tokio::test]
    async fn test_eof_maps_to_network_read_error() {
        let raw = [0u8, 0];
        let mut reader = XdrReader::new(&raw[..]);
        let err = reader.read_i32().await.unwrap_err();
        assert_eq!(err.error_code(), ISC_NET_READ_ERR);
    }

    #[tokio::test]
    async fn test_status_vector() {
        let mut raw = Vec::new();
        raw.write_i32(ISC_ARG_GDS);
        raw.write_i32(335544569);
        raw.write_i32(ISC_ARG_STRING);
        raw.write_buffer(b"X");
        raw.write_i32(ISC_ARG_NUMBER);
        raw.write_i32(7);
        raw.write_i32(ISC_ARG_END);

        let mut reader = XdrReader::new(&raw[..]);
        let entries = reader.read_status_vector().await.unwrap();
        assert_eq!(
            entries,
            vec![
                StatusEntry::Gds(335544569),
                StatusEntry::String("X".into()),
                StatusEntry::Number(7)
            ]
        );
    }

    #[tokio::test]
    async fn test_writer_sends_serialized_message() {
        let mut sent = Vec::new();
        let mut writer = XdrWriter::new(&mut sent);
        writer
            .send_message(&HandleMessage::new(OP_COMMIT, 9))
            .await
            .unwrap();
        writer.write_all(&[0, 0, 0, 1]).await.unwrap();
        drop(writer);

        let mut expected = Vec::new();
        expected.write_i32(OP_COMMIT);
        expected.write_i32(9);
        expected.write_i32(1);
        assert_eq!(sent, expected);
    }
}
