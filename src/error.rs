//! Error types for the Firebird thin client.

use crate::protocol::constants::{ISC_NET_READ_ERR, ISC_NET_WRITE_ERR};
use crate::protocol::status::IscException;
use std::io;
use std::panic::Location;
use thiserror::Error;

/// Result type alias for Firebird operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Firebird thin client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Local I/O error outside of a server conversation (runtime setup, socket options).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport failure while talking to the server.
    ///
    /// `code` is `isc_net_read_err` or `isc_net_write_err`.
    #[error("{}: {source}", network_message(*.code))]
    Network {
        code: i32,
        #[source]
        source: io::Error,
    },

    /// Error reported by the server through a status vector.
    #[error("{0}")]
    Isc(IscException),

    /// Operation not valid in the current statement or transaction state.
    #[error("{message}")]
    InvalidState { message: String },

    /// Malformed or unexpected data from the server.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Unexpected operation code received.
    #[error("Unexpected operation: expected {expected}, got {actual}")]
    UnexpectedOperation { expected: i32, actual: i32 },

    /// Value does not fit the target type or field.
    #[error("Arithmetic overflow: {message}")]
    Overflow { message: String },

    /// Type conversion error.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Null value error.
    #[error("Unexpected NULL value in column {column}")]
    NullValue { column: String },

    /// Column index out of bounds.
    #[error("Column index {index} out of bounds (columns: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    /// Buffer too small.
    #[error("Buffer too small: need {needed} bytes, have {available} filed at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },

    /// Statement metadata could not be fully described by the server.
    #[error("Metadata negotiation failed: {message}")]
    MetadataNegotiation { message: String },

    /// Feature not available with the negotiated protocol version.
    #[error("Not supported by protocol version {protocol}: {feature}")]
    Unsupported { protocol: u32, feature: String },

    /// Invalid connect string.
    #[error("Invalid connect string: {message}")]
    InvalidConnectString { message: String },

    /// Connection timed out during TCP connect.
    #[error("Connection to {host}:{port} timed out after {timeout:?}")]
    ConnectionTimeout {
        host: String,
        port: u16,
        timeout: std::time::Duration,
    },

    /// DNS resolution failed.
    #[error("Failed to resolve hostname '{hostname}': {message}")]
    DnsResolutionFailed { hostname: String, message: String },
}

fn network_message(code: i32) -> &'static str {
    if code == ISC_NET_WRITE_ERR {
        "Error writing data to the connection"
    } else {
        "Error reading data from the connection"
    }
}

impl Error {
    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create an overflow error.
    pub fn overflow(message: impl Into<String>) -> Self {
        Self::Overflow {
            message: message.into(),
        }
    }

    /// Wrap a read-side transport failure.
    pub fn net_read(source: io::Error) -> Self {
        Self::Network {
            code: ISC_NET_READ_ERR,
            source,
        }
    }

    /// Wrap a write-side transport failure.
    pub fn net_write(source: io::Error) -> Self {
        Self::Network {
            code: ISC_NET_WRITE_ERR,
            source,
        }
    }

    /// Whether this error came from the transport rather than the server.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Primary Firebird error code, or 0 for client-side errors without one.
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Network { code, .. } => *code,
            Self::Isc(e) => e.error_code,
            _ => 0,
        }
    }

    /// SQLSTATE for this error.
    pub fn sql_state(&self) -> &str {
        match self {
            Self::Network { .. } => "08006",
            Self::Isc(e) => &e.sql_state,
            Self::Overflow { .. } => "22003",
            Self::TypeConversion { .. } => "22018",
            Self::NullValue { .. } => "22004",
            Self::ConnectionTimeout { .. } | Self::DnsResolutionFailed { .. } => "08001",
            _ => "HY000",
        }
    }

    /// The server exception, if this error carries one.
    pub fn as_isc(&self) -> Option<&IscException> {
        match self {
            Self::Isc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IscException> for Error {
    fn from(e: IscException) -> Self {
        Self::Isc(e)
    }
}
