//! Date and time codecs.
//!
//! A DATE is a signed day count from 1858-11-17 (modified Julian day). A TIME
//! is the number of 1/10000 second ticks since midnight. A TIMESTAMP is a
//! date word followed by a time word.

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Ticks per second in a wire TIME value.
pub const TICKS_PER_SECOND: u32 = 10_000;

/// Nanoseconds per wire tick.
pub const NANOS_PER_TICK: u32 = 100_000;

/// Ticks in one day.
pub const TICKS_PER_DAY: u32 = 86_400 * TICKS_PER_SECOND;

/// Decode a wire DATE into a calendar date.
///
/// # Errors
/// Returns `Error::TypeConversion` when the day count is outside the range
/// chrono can represent.
pub fn decode_date(sql_date: i32) -> Result<NaiveDate> {
    let mut d = sql_date as i64 + 678_882;

    let century = (4 * d - 1) / 146_097;
    d = 4 * d - 1 - 146_097 * century;
    let mut day = d / 4;

    d = (4 * day + 3) / 1461;
    day = 4 * day + 3 - 1461 * d;
    day = (day + 4) / 4;

    let mut month = (5 * day - 3) / 153;
    day = 5 * day - 3 - 153 * month;
    day = (day + 5) / 5;

    let mut year = 100 * century + d;

    if month < 10 {
        month += 3;
    } else {
        month -= 9;
        year += 1;
    }

    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month as u32, day as u32))
        .ok_or_else(|| {
            Error::type_conversion(format!(
                "Invalid DATE {}: year={}, month={}, day={}",
                sql_date, year, month, day
            ))
        })
}

/// Encode a calendar date as a wire DATE.
pub fn encode_date(date: NaiveDate) -> i32 {
    let mut year = date.year() as i64;
    let mut month = date.month() as i64;
    let day = date.day() as i64;

    if month > 2 {
        month -= 3;
    } else {
        month += 9;
        year -= 1;
    }

    let century = year / 100;
    let year_in_century = year - 100 * century;

    ((146_097 * century) / 4 + (1461 * year_in_century) / 4 + (153 * month + 2) / 5 + day
        - 678_882) as i32
}

/// Decode a wire TIME into a time of day.
pub fn decode_time(sql_time: u32) -> Result<NaiveTime> {
    let secs = sql_time / TICKS_PER_SECOND;
    let nanos = (sql_time % TICKS_PER_SECOND) * NANOS_PER_TICK;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .ok_or_else(|| Error::type_conversion(format!("Invalid TIME ticks: {}", sql_time)))
}

/// Encode a time of day as wire TIME ticks. Sub-tick precision is truncated.
pub fn encode_time(time: NaiveTime) -> u32 {
    // Leap second representation folds into the last tick of the second
    let nanos = time.nanosecond().min(999_999_999);
    time.num_seconds_from_midnight() * TICKS_PER_SECOND + nanos / NANOS_PER_TICK
}

/// Decode a wire TIMESTAMP (date word, time word).
pub fn decode_timestamp(sql_date: i32, sql_time: u32) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::new(
        decode_date(sql_date)?,
        decode_time(sql_time)?,
    ))
}

/// Encode a timestamp into its (date word, time word) pair.
pub fn encode_timestamp(value: NaiveDateTime) -> (i32, u32) {
    (encode_date(value.date()), encode_time(value.time()))
}
