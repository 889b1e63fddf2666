//! Execute requests for prepared statements.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt};

/// Output message description for `op_execute2`.
pub struct OutputBlr<'a> {
    pub blr: &'a [u8],
}

/// `op_execute` / `op_execute2`.
///
/// `message` is the already encoded parameter message (empty when the
/// statement has no parameters). Stored procedures use `op_execute2`, which
/// carries the output BLR so the server answers with the output row inline.
pub struct ExecuteMessage<'a> {
    pub statement: i32,
    pub transaction: i32,
    pub input_blr: &'a [u8],
    pub message: &'a [u8],
    pub output: Option<OutputBlr<'a>>,
    /// Statement timeout in milliseconds (protocol 16 and later).
    pub timeout: Option<u32>,
}

impl ExecuteMessage<'_> {
    fn message_count(&self) -> i32 {
        if self.input_blr.is_empty() {
            0
        } else {
            1
        }
    }
}

impl Message for ExecuteMessage<'_> {
    fn operation(&self) -> i32 {
        if self.output.is_some() {
            OP_EXECUTE2
        } else {
            OP_EXECUTE
        }
    }

    fn wire_size(&self) -> usize {
        let mut size = 3 * 4;
        size += buffer_wire_size(self.input_blr.len());
        size += 2 * 4;
        size += self.message.len();
        if let Some(output) = &self.output {
            size += buffer_wire_size(output.blr.len()) + 4;
        }
        if self.timeout.is_some() {
            size += 4;
        }
        size
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.operation());
        buf.write_i32(self.statement);
        buf.write_i32(self.transaction);

        buf.write_buffer(self.input_blr);
        buf.write_i32(0); // message number
        buf.write_i32(self.message_count());
        buf.extend_from_slice(self.message);

        if let Some(output) = &self.output {
            buf.write_buffer(output.blr);
            buf.write_i32(0); // output message number
        }
        if let Some(timeout) = self.timeout {
            buf.write_u32(timeout);
        }
        Ok(())
    }
}
