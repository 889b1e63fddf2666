//! Transaction start request.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt};

/// `op_transaction`: start a transaction with a raw parameter buffer.
pub struct StartTransactionMessage<'a> {
    pub database: i32,
    pub tpb: &'a [u8],
}

impl Message for StartTransactionMessage<'_> {
    fn operation(&self) -> i32 {
        OP_TRANSACTION
    }

    fn wire_size(&self) -> usize {
        8 + buffer_wire_size(self.tpb.len())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_TRANSACTION);
        buf.write_i32(self.database);
        buf.write_buffer(self.tpb);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_transaction() {
        let tpb = [ISC_TPB_VERSION3, ISC_TPB_WRITE, ISC_TPB_WAIT];
        let msg = StartTransactionMessage {
            database: 0,
            tpb: &tpb,
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
        assert_eq!(&buf[8..12], &3i32.to_be_bytes());
        assert_eq!(&buf[12..15], &tpb);
        assert_eq!(buf[15], 0);
    }
}
