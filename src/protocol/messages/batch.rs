//! Batch requests (protocol 16).

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt};

/// Batch parameter buffer asking for per-message errors and update counts.
///
/// Batch buffers use wide clumplets: a tag, a 4-byte length, then the value.
pub fn batch_parameters() -> Vec<u8> {
    let mut bpb = vec![BATCH_VERSION1];
    for tag in [BATCH_TAG_MULTIERROR, BATCH_TAG_RECORD_COUNTS] {
        bpb.push(tag);
        bpb.extend_from_slice(&4u32.to_le_bytes());
        bpb.extend_from_slice(&1i32.to_le_bytes());
    }
    bpb
}

/// `op_batch_create`.
pub struct BatchCreateMessage<'a> {
    pub statement: i32,
    pub blr: &'a [u8],
    pub message_length: i32,
    pub bpb: &'a [u8],
}

impl Message for BatchCreateMessage<'_> {
    fn operation(&self) -> i32 {
        OP_BATCH_CREATE
    }

    fn wire_size(&self) -> usize {
        8 + buffer_wire_size(self.blr.len()) + 4 + buffer_wire_size(self.bpb.len())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_BATCH_CREATE);
        buf.write_i32(self.statement);
        buf.write_buffer(self.blr);
        buf.write_i32(self.message_length);
        buf.write_buffer(self.bpb);
        Ok(())
    }
}

/// `op_batch_msg`: `count` already encoded messages.
pub struct BatchMessagesMessage<'a> {
    pub statement: i32,
    pub count: i32,
    pub messages: &'a [u8],
}

impl Message for BatchMessagesMessage<'_> {
    fn operation(&self) -> i32 {
        OP_BATCH_MSG
    }

    fn wire_size(&self) -> usize {
        12 + self.messages.len()
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_BATCH_MSG);
        buf.write_i32(self.statement);
        buf.write_i32(self.count);
        buf.extend_from_slice(self.messages);
        Ok(())
    }
}

/// `op_batch_exec`.
pub struct BatchExecuteMessage {
    pub statement: i32,
    pub transaction: i32,
}

impl Message for BatchExecuteMessage {
    fn operation(&self) -> i32 {
        OP_BATCH_EXEC
    }

    fn wire_size(&self) -> usize {
        12
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_BATCH_EXEC);
        buf.write_i32(self.statement);
        buf.write_i32(self.transaction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_parameters() {
        assert_eq!(
            batch_parameters(),
            vec![1, 1, 4, 0, 0, 0, 1, 0, 0, 0, 2, 4, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_batch_create_layout() {
        let bpb = batch_parameters();
        let msg = BatchCreateMessage {
            statement: 5,
            blr: &[5, 2, 4, 0],
            message_length: 6,
            bpb: &bpb,
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
        assert_eq!(&buf[16..20], &6i32.to_be_bytes());
        assert_eq!(&buf[20..24], &(bpb.len() as i32).to_be_bytes());
    }
}
