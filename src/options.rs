//! Per-connection options.

use crate::protocol::constants::{DEFAULT_FETCH_SIZE, DEFAULT_PACKET_SIZE, SQL_DIALECT_CURRENT};
use crate::protocol::types::Charset;
use crate::protocol::ProtocolVersion;
use std::time::Duration;

/// Options fixed for the lifetime of an attached database.
///
/// # Example
///
/// ```
/// use firebird_thin_rs::{DatabaseOptions, ProtocolVersion};
///
/// let options = DatabaseOptions::default()
///     .with_protocol(ProtocolVersion::V16)
///     .with_fetch_size(500);
/// assert_eq!(options.fetch_size, 500);
/// assert_eq!(options.dialect, 3);
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Protocol version accepted by the server.
    pub protocol: ProtocolVersion,
    /// SQL dialect used to prepare statements.
    pub dialect: i32,
    /// Rows requested per `op_fetch`.
    pub fetch_size: u32,
    /// Packet size; also the blob segment size.
    pub packet_size: u32,
    /// Whether execute queries the records-affected counters.
    pub return_records_affected: bool,
    /// Connection charset, used where a column does not name one.
    pub charset: Charset,
    /// Default statement timeout (protocol 16 and later).
    pub statement_timeout: Option<Duration>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            protocol: ProtocolVersion::V13,
            dialect: SQL_DIALECT_CURRENT,
            fetch_size: DEFAULT_FETCH_SIZE,
            packet_size: DEFAULT_PACKET_SIZE,
            return_records_affected: true,
            charset: Charset::Utf8,
            statement_timeout: None,
        }
    }
}

impl DatabaseOptions {
    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_dialect(mut self, dialect: i32) -> Self {
        self.dialect = dialect;
        self
    }

    /// Rows per fetch round trip; at least 1.
    pub fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    pub fn with_packet_size(mut self, packet_size: u32) -> Self {
        self.packet_size = packet_size.max(1);
        self
    }

    pub fn with_return_records_affected(mut self, enabled: bool) -> Self {
        self.return_records_affected = enabled;
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Largest blob segment; segments are limited to 16-bit lengths.
    pub fn segment_size(&self) -> usize {
        (self.packet_size as usize).min(u16::MAX as usize)
    }
}
