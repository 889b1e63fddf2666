//! Fetch message for retrieving rows from an open cursor.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt};

/// `op_fetch`: request up to `fetch_size` rows described by `blr`.
///
/// The server answers with a sequence of `op_fetch_response` messages, each
/// followed by one row while its status is 0 and its count is 1.
pub struct FetchMessage<'a> {
    pub statement: i32,
    pub blr: &'a [u8],
    pub fetch_size: u32,
}

impl<'a> FetchMessage<'a> {
    /// Create a new fetch message.
    pub fn new(statement: i32, blr: &'a [u8], fetch_size: u32) -> Self {
        Self {
            statement,
            blr,
            fetch_size,
        }
    }
}

impl Message for FetchMessage<'_> {
    fn operation(&self) -> i32 {
        OP_FETCH
    }

    fn wire_size(&self) -> usize {
        2 * 4 + buffer_wire_size(self.blr.len()) + 2 * 4
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_FETCH);
        buf.write_i32(self.statement);
        buf.write_buffer(self.blr);
        buf.write_i32(0); // message number
        buf.write_u32(self.fetch_size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_message_wire_size() {
        let msg = FetchMessage::new(42, &[5, 2, 4, 0, 2, 0], 100);

        let mut buf = Vec::with_capacity(msg.wire_size());
        msg.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), msg.wire_size());
    }

    #[test]
    fn test_fetch_message_content() {
        let msg = FetchMessage::new(42, &[5], 100);

        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], &OP_FETCH.to_be_bytes());
        assert_eq!(&buf[4..8], &42i32.to_be_bytes());
        assert_eq!(&buf[8..12], &1i32.to_be_bytes());
        assert_eq!(buf[12], 5);
        assert_eq!(&buf[buf.len() - 4..], &100u32.to_be_bytes());
    }
}
