//! Time zone aware DATE/TIME values.
//!
//! The wire carries UTC values plus a zone id. Zone ids below 2879 encode a
//! fixed offset as `minutes + 1439`; 65535 is GMT; anything else is a
//! region from the server's zone database. The EX variants also carry the
//! offset in effect, which is the only way to localize region zones without
//! a zone database on the client.

use crate::error::{Error, Result};
use crate::protocol::constants::{TZ_GMT, TZ_ONE_DAY_MINUTES};
use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use std::fmt;

/// Zone id as sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeZoneId(pub u16);

impl TimeZoneId {
    /// GMT zone.
    pub const GMT: TimeZoneId = TimeZoneId(TZ_GMT);

    /// Zone id for a fixed offset in minutes.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self> {
        if !(-TZ_ONE_DAY_MINUTES..=TZ_ONE_DAY_MINUTES).contains(&minutes) {
            return Err(Error::overflow(format!("time zone offset {} minutes", minutes)));
        }
        Ok(Self((minutes + TZ_ONE_DAY_MINUTES) as u16))
    }

    /// Fixed offset in minutes if this id encodes one (GMT counts as 0).
    pub fn offset_minutes(&self) -> Option<i32> {
        if self.0 == TZ_GMT {
            Some(0)
        } else if (self.0 as i32) <= 2 * TZ_ONE_DAY_MINUTES {
            Some(self.0 as i32 - TZ_ONE_DAY_MINUTES)
        } else {
            None
        }
    }
}

impl fmt::Display for TimeZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset_minutes() {
            Some(_) if self.0 == TZ_GMT => f.write_str("GMT"),
            Some(m) => {
                let sign = if m < 0 { '-' } else { '+' };
                write!(f, "{}{:02}:{:02}", sign, m.abs() / 60, m.abs() % 60)
            }
            None => write!(f, "zone#{}", self.0),
        }
    }
}

fn fixed_offset(minutes: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| Error::overflow(format!("time zone offset {} minutes", minutes)))
}

/// TIMESTAMP WITH TIME ZONE (and its EX form when `offset` is set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FbZonedDateTime {
    /// UTC instant.
    pub utc: NaiveDateTime,
    pub zone: TimeZoneId,
    /// Offset in minutes reported by the server (EX form only).
    pub offset: Option<i16>,
}

impl FbZonedDateTime {
    /// Build from a UTC instant and zone.
    pub fn new(utc: NaiveDateTime, zone: TimeZoneId) -> Self {
        Self {
            utc,
            zone,
            offset: None,
        }
    }

    /// Build from an offset-aware timestamp; the zone is the fixed offset.
    pub fn from_fixed(value: DateTime<FixedOffset>) -> Result<Self> {
        let minutes = value.offset().local_minus_utc() / 60;
        Ok(Self {
            utc: value.naive_utc(),
            zone: TimeZoneId::from_offset_minutes(minutes)?,
            offset: Some(minutes as i16),
        })
    }

    /// UTC instant.
    pub fn to_utc(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.utc, Utc)
    }

    /// Local time in the value's zone.
    ///
    /// # Errors
    /// Region zones without a reported offset cannot be localized.
    pub fn to_fixed(&self) -> Result<DateTime<FixedOffset>> {
        let minutes = self
            .offset
            .map(i32::from)
            .or_else(|| self.zone.offset_minutes())
            .ok_or_else(|| {
                Error::type_conversion(format!("offset unknown for time zone {}", self.zone))
            })?;
        Ok(self.to_utc().with_timezone(&fixed_offset(minutes)?))
    }
}

/// TIME WITH TIME ZONE (and its EX form when `offset` is set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FbZonedTime {
    /// UTC time of day.
    pub utc: NaiveTime,
    pub zone: TimeZoneId,
    /// Offset in minutes reported by the server (EX form only).
    pub offset: Option<i16>,
}

impl FbZonedTime {
    /// Build from a UTC time of day and zone.
    pub fn new(utc: NaiveTime, zone: TimeZoneId) -> Self {
        Self {
            utc,
            zone,
            offset: None,
        }
    }

    /// Local time of day in the value's zone, with its offset.
    pub fn to_local(&self) -> Result<(NaiveTime, FixedOffset)> {
        let minutes = self
            .offset
            .map(i32::from)
            .or_else(|| self.zone.offset_minutes())
            .ok_or_else(|| {
                Error::type_conversion(format!("offset unknown for time zone {}", self.zone))
            })?;
        let local = self.utc.overflowing_add_signed(TimeDelta::minutes(minutes as i64)).0;
        Ok((local, fixed_offset(minutes)?))
    }
}
