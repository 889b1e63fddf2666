//! Statement lifecycle requests: prepare, SQL info and free.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{buffer_wire_size, Message, WriteExt};

/// `op_prepare_statement`.
///
/// The server answers with a generic response whose data is the describe
/// output for `items`.
pub struct PrepareMessage<'a> {
    pub transaction: i32,
    pub statement: i32,
    pub dialect: i32,
    pub sql: &'a [u8],
    pub items: &'a [u8],
    pub buffer_length: i32,
}

impl Message for PrepareMessage<'_> {
    fn operation(&self) -> i32 {
        OP_PREPARE_STATEMENT
    }

    fn wire_size(&self) -> usize {
        4 * 4 + buffer_wire_size(self.sql.len()) + buffer_wire_size(self.items.len()) + 4
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_PREPARE_STATEMENT);
        buf.write_i32(self.transaction);
        buf.write_i32(self.statement);
        buf.write_i32(self.dialect);
        buf.write_buffer(self.sql);
        buf.write_buffer(self.items);
        buf.write_i32(self.buffer_length);
        Ok(())
    }
}

/// `op_info_sql`: describe items for an allocated statement.
pub struct InfoSqlMessage<'a> {
    pub statement: i32,
    pub items: &'a [u8],
    pub buffer_length: i32,
}

impl Message for InfoSqlMessage<'_> {
    fn operation(&self) -> i32 {
        OP_INFO_SQL
    }

    fn wire_size(&self) -> usize {
        3 * 4 + buffer_wire_size(self.items.len()) + 4
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_INFO_SQL);
        buf.write_i32(self.statement);
        buf.write_i32(0); // incarnation
        buf.write_buffer(self.items);
        buf.write_i32(self.buffer_length);
        Ok(())
    }
}

/// `op_free_statement` with `DSQL_close` or `DSQL_drop`.
pub struct FreeStatementMessage {
    pub statement: i32,
    pub option: i32,
}

impl Message for FreeStatementMessage {
    fn operation(&self) -> i32 {
        OP_FREE_STATEMENT
    }

    fn wire_size(&self) -> usize {
        12
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_i32(OP_FREE_STATEMENT);
        buf.write_i32(self.statement);
        buf.write_i32(self.option);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_layout() {
        let msg = PrepareMessage {
            transaction: 3,
            statement: 5,
            dialect: SQL_DIALECT_CURRENT,
            sql: b"SELECT 1",
            items: &[ISC_INFO_SQL_STMT_TYPE],
            buffer_length: PREPARE_INFO_BUFFER_SIZE,
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
        assert_eq!(&buf[0..4], &OP_PREPARE_STATEMENT.to_be_bytes());
        assert_eq!(&buf[16..20], &8i32.to_be_bytes());
        assert_eq!(&buf[20..28], b"SELECT 1");
        assert_eq!(&buf[28..32], &1i32.to_be_bytes());
        assert_eq!(buf[32], ISC_INFO_SQL_STMT_TYPE);
        assert_eq!(&buf[36..40], &PREPARE_INFO_BUFFER_SIZE.to_be_bytes());
    }

    #[test]
    fn test_info_sql_has_incarnation() {
        let msg = InfoSqlMessage {
            statement: 9,
            items: &[ISC_INFO_SQL_RECORDS, ISC_INFO_END],
            buffer_length: ROWS_AFFECTED_BUFFER_SIZE,
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());
        assert_eq!(&buf[8..12], &[0, 0, 0, 0]);
    }
}
