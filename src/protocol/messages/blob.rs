//! Blob requests.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt};

/// `op_create_blob2` / `op_open_blob2`.
pub struct OpenBlobMessage<'a> {
    /// `OP_CREATE_BLOB2` or `OP_OPEN_BLOB2`.
    pub operation: i32,
    pub bpb: &'a [u8],
    pub transaction: i32,
    /// Blob id to open; 0 when creating.
    pub blob_id: i64,
}

impl Message for OpenBlobMessage<'_> {
    fn operation(&self) -> i32 {
        self.operation
    }

    fn wire_size(&self) -> usize {
        4 + buffer_wire_size(self.bpb.len()) + 4 + 8
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.operation);
        buf.write_buffer(self.bpb);
        buf.write_i32(self.transaction);
        buf.write_i64(self.blob_id);
        Ok(())
    }
}

/// `op_get_segment`: read up to `segment_length` bytes.
pub struct GetSegmentMessage {
    pub blob: i32,
    pub segment_length: i32,
}

impl Message for GetSegmentMessage {
    fn operation(&self) -> i32 {
        OP_GET_SEGMENT
    }

    fn wire_size(&self) -> usize {
        16
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_GET_SEGMENT);
        buf.write_i32(self.blob);
        buf.write_i32(self.segment_length);
        buf.write_i32(0); // empty data buffer
        Ok(())
    }
}

/// `op_put_segment`: write one segment.
pub struct PutSegmentMessage<'a> {
    pub blob: i32,
    pub data: &'a [u8],
}

impl Message for PutSegmentMessage<'_> {
    fn operation(&self) -> i32 {
        OP_PUT_SEGMENT
    }

    fn wire_size(&self) -> usize {
        12 + buffer_wire_size(self.data.len())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_PUT_SEGMENT);
        buf.write_i32(self.blob);
        buf.write_i32(self.data.len() as i32);
        buf.write_buffer(self.data);
        Ok(())
    }
}

/// `op_seek_blob`.
pub struct SeekBlobMessage {
    pub blob: i32,
    pub mode: i32,
    pub offset: i32,
}

impl Message for SeekBlobMessage {
    fn operation(&self) -> i32 {
        OP_SEEK_BLOB
    }

    fn wire_size(&self) -> usize {
        16
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_SEEK_BLOB);
        buf.write_i32(self.blob);
        buf.write_i32(self.mode);
        buf.write_i32(self.offset);
        Ok(())
    }
}

/// `op_info_blob`.
pub struct BlobInfoMessage<'a> {
    pub blob: i32,
    pub items: &'a [u8],
    pub buffer_length: i32,
}

impl Message for BlobInfoMessage<'_> {
    fn operation(&self) -> i32 {
        OP_INFO_BLOB
    }

    fn wire_size(&self) -> usize {
        12 + buffer_wire_size(self.items.len()) + 4
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_INFO_BLOB);
        buf.write_i32(self.blob);
        buf.write_i32(0); // incarnation
        buf.write_buffer(self.items);
        buf.write_i32(self.buffer_length);
        Ok(())
    }
}
