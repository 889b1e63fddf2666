//! Small control requests: single-handle operations, cancel and ping.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{Message, WriteExt};

/// A request made of an operation code and one object handle.
///
/// Used for commit/rollback (and their retaining forms), blob close/cancel,
/// statement allocation and batch release.
pub struct HandleMessage {
    pub operation: i32,
    pub handle: i32,
}

impl HandleMessage {
    pub fn new(operation: i32, handle: i32) -> Self {
        Self { operation, handle }
    }
}

impl Message for HandleMessage {
    fn operation(&self) -> i32 {
        self.operation
    }

    fn wire_size(&self) -> usize {
        8
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(self.operation);
        buf.write_i32(self.handle);
        Ok(())
    }
}

/// `op_cancel` with the requested cancel kind.
pub struct CancelMessage {
    pub kind: i32,
}

impl Message for CancelMessage {
    fn operation(&self) -> i32 {
        OP_CANCEL
    }

    fn wire_size(&self) -> usize {
        8
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_CANCEL);
        buf.write_i32(self.kind);
        Ok(())
    }
}

/// `op_ping`.
pub struct PingMessage;

impl Message for PingMessage {
    fn operation(&self) -> i32 {
        OP_PING
    }

    fn wire_size(&self) -> usize {
        4
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_PING);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_message() {
        let msg = HandleMessage::new(OP_COMMIT, 7);
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 30, 0, 0, 0, 7]);
        assert_eq!(buf.len(), msg.wire_size());
    }

    #[test]
    fn test_cancel_message() {
        let msg = CancelMessage {
            kind: FB_CANCEL_RAISE,
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 91, 0, 0, 0, 3]);
    }
}
