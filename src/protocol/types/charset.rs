//! Character sets used to decode and encode text columns.

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Character set of a text column or blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    /// No conversion; bytes are passed through as Latin-1.
    None,
    /// Binary data.
    Octets,
    Ascii,
    UnicodeFss,
    #[default]
    Utf8,
    Iso8859_1,
    Win1252,
}

/// Windows-1252 code points for 0x80..=0x9F; 0 marks an unassigned byte.
const WIN1252_HIGH: [u16; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
    0x0152, 0, 0x017D, 0, 0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, 0x02DC,
    0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

impl Charset {
    /// Look up a charset by its id (low byte of a text column's subtype).
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            CS_NONE => Ok(Self::None),
            CS_OCTETS => Ok(Self::Octets),
            CS_ASCII => Ok(Self::Ascii),
            CS_UNICODE_FSS => Ok(Self::UnicodeFss),
            CS_UTF8 => Ok(Self::Utf8),
            CS_ISO8859_1 => Ok(Self::Iso8859_1),
            CS_WIN1252 => Ok(Self::Win1252),
            other => Err(Error::type_conversion(format!("Unsupported charset id {}", other))),
        }
    }

    /// Charset id on the wire.
    pub fn id(&self) -> u8 {
        match self {
            Self::None => CS_NONE,
            Self::Octets => CS_OCTETS,
            Self::Ascii => CS_ASCII,
            Self::UnicodeFss => CS_UNICODE_FSS,
            Self::Utf8 => CS_UTF8,
            Self::Iso8859_1 => CS_ISO8859_1,
            Self::Win1252 => CS_WIN1252,
        }
    }

    /// Server-side name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Octets => "OCTETS",
            Self::Ascii => "ASCII",
            Self::UnicodeFss => "UNICODE_FSS",
            Self::Utf8 => "UTF8",
            Self::Iso8859_1 => "ISO8859_1",
            Self::Win1252 => "WIN1252",
        }
    }

    /// Maximum bytes per character.
    pub fn bytes_per_char(&self) -> usize {
        match self {
            Self::UnicodeFss => 3,
            Self::Utf8 => 4,
            _ => 1,
        }
    }

    /// Whether values are binary.
    pub fn is_octets(&self) -> bool {
        matches!(self, Self::Octets)
    }

    /// Decode bytes to a string.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 | Self::UnicodeFss => String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::type_conversion(format!("Invalid {} data: {}", self.name(), e))),
            Self::Ascii => {
                if bytes.is_ascii() {
                    Ok(bytes.iter().map(|&b| b as char).collect())
                } else {
                    Err(Error::type_conversion("Invalid ASCII data"))
                }
            }
            Self::Win1252 => Ok(bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => {
                        let cp = WIN1252_HIGH[(b - 0x80) as usize];
                        char::from_u32(cp as u32)
                            .filter(|_| cp != 0)
                            .unwrap_or(b as char)
                    }
                    _ => b as char,
                })
                .collect()),
            Self::None | Self::Octets | Self::Iso8859_1 => {
                Ok(bytes.iter().map(|&b| b as char).collect())
            }
        }
    }

    /// Encode a string to bytes.
    pub fn encode(&self, s: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 | Self::UnicodeFss | Self::Octets => Ok(s.as_bytes().to_vec()),
            Self::Ascii => {
                if s.is_ascii() {
                    Ok(s.as_bytes().to_vec())
                } else {
                    Err(Error::type_conversion(format!(
                        "Cannot encode {:?} as ASCII",
                        s
                    )))
                }
            }
            Self::Win1252 => s
                .chars()
                .map(|c| {
                    let cp = c as u32;
                    if cp < 0x80 || (0xA0..=0xFF).contains(&cp) {
                        return Ok(cp as u8);
                    }
                    WIN1252_HIGH
                        .iter()
                        .position(|&w| w != 0 && w as u32 == cp)
                        .map(|i| 0x80 + i as u8)
                        .ok_or_else(|| {
                            Error::type_conversion(format!("Cannot encode {:?} as WIN1252", c))
                        })
                })
                .collect(),
            Self::None | Self::Iso8859_1 => s
                .chars()
                .map(|c| {
                    u8::try_from(c as u32).map_err(|_| {
                        Error::type_conversion(format!("Cannot encode {:?} as {}", c, self.name()))
                    })
                })
                .collect(),
        }
    }
}
