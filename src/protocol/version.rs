//! Negotiated protocol version and the wire strategy it selects.

use crate::error::{Error, Result};
use crate::protocol::row::MessageFormat;

/// Flag set on protocol numbers from version 11 on.
pub const PROTOCOL_FLAG: u32 = 0x8000;

/// Wire protocol version accepted by the server at attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ProtocolVersion {
    V10,
    V11,
    V12,
    #[default]
    V13,
    V15,
    V16,
}

impl ProtocolVersion {
    /// Protocol number without the flag bit.
    pub fn number(&self) -> u32 {
        match self {
            Self::V10 => 10,
            Self::V11 => 11,
            Self::V12 => 12,
            Self::V13 => 13,
            Self::V15 => 15,
            Self::V16 => 16,
        }
    }

    /// Parse a protocol number, with or without the flag bit.
    pub fn from_number(number: u32) -> Result<Self> {
        match number & !PROTOCOL_FLAG {
            10 => Ok(Self::V10),
            11 => Ok(Self::V11),
            12 => Ok(Self::V12),
            13 => Ok(Self::V13),
            15 => Ok(Self::V15),
            16 => Ok(Self::V16),
            other => Err(Error::Unsupported {
                protocol: other,
                feature: "protocol version".to_string(),
            }),
        }
    }

    /// Row and parameter message layout for this version.
    pub fn message_format(&self) -> MessageFormat {
        if *self >= Self::V13 {
            MessageFormat::NullBitmap
        } else {
            MessageFormat::IndicatorWords
        }
    }

    /// Whether `op_execute` carries a statement timeout.
    pub fn supports_statement_timeout(&self) -> bool {
        *self >= Self::V16
    }

    /// Whether the batch API is available.
    pub fn supports_batch(&self) -> bool {
        *self >= Self::V16
    }

    pub(crate) fn require(&self, minimum: ProtocolVersion, feature: &str) -> Result<()> {
        if *self < minimum {
            return Err(Error::Unsupported {
                protocol: self.number(),
                feature: feature.to_string(),
            });
        }
        Ok(())
    }
}
