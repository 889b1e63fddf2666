//! Array slice requests.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt};

/// `op_get_slice`: read a slice described by `sdl`.
pub struct GetSliceMessage<'a> {
    pub transaction: i32,
    pub array_id: i64,
    pub slice_length: i32,
    pub sdl: &'a [u8],
}

impl Message for GetSliceMessage<'_> {
    fn operation(&self) -> i32 {
        OP_GET_SLICE
    }

    fn wire_size(&self) -> usize {
        4 + 4 + 8 + 4 + buffer_wire_size(self.sdl.len()) + buffer_wire_size(0) + 4
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_GET_SLICE);
        buf.write_i32(self.transaction);
        buf.write_i64(self.array_id);
        buf.write_i32(self.slice_length);
        buf.write_buffer(self.sdl);
        buf.write_buffer(&[]); // slice parameters
        buf.write_i32(0); // empty slice
        Ok(())
    }
}

/// `op_put_slice`: write a whole array; the server returns the new id.
///
/// `elements` is the XDR encoding of every element in row-major order.
pub struct PutSliceMessage<'a> {
    pub transaction: i32,
    pub slice_length: i32,
    pub sdl: &'a [u8],
    pub elements: &'a [u8],
}

impl Message for PutSliceMessage<'_> {
    fn operation(&self) -> i32 {
        OP_PUT_SLICE
    }

    fn wire_size(&self) -> usize {
        4 + 4 + 8 + 4 + buffer_wire_size(self.sdl.len()) + buffer_wire_size(0) + 4 + self.elements.len()
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_PUT_SLICE);
        buf.write_i32(self.transaction);
        buf.write_i64(0);
        buf.write_i32(self.slice_length);
        buf.write_buffer(self.sdl);
        buf.write_buffer(&[]);
        buf.write_i32(self.slice_length);
        buf.extend_from_slice(self.elements);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_slice_layout() {
        let msg = GetSliceMessage {
            transaction: 2,
            array_id: 77,
            slice_length: 12,
            sdl: &[1, 2, 3],
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
        assert_eq!(&buf[8..16], &77i64.to_be_bytes());
        assert_eq!(&buf[16..20], &12i32.to_be_bytes());
        assert_eq!(&buf[buf.len() - 8..], &[0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_put_slice_layout() {
        let elements = [0u8, 0, 0, 1, 0, 0, 0, 2];
        let msg = PutSliceMessage {
            transaction: 2,
            slice_length: 8,
            sdl: &[1],
            elements: &elements,
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
        assert_eq!(&buf[8..16], &[0u8; 8]);
        assert_eq!(&buf[buf.len() - 12..buf.len() - 8], &8i32.to_be_bytes());
        assert_eq!(&buf[buf.len() - 8..], &elements);
    }
}
