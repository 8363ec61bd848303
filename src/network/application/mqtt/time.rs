//! Timestamp rendering for data-point payloads.
//!
//! All timestamps are Unix milliseconds and rendered in UTC.

use chrono::{DateTime, Datelike, Timelike, Utc};
use core::fmt::Write as _;
use heapless::String;

use super::error::Error;

/// Length of `YYYY-MM-DD HH:MM:SS.mmm`.
pub const TIME_STRING_LEN: usize = 23;

/// Length of `YYYY-MM-DD HH:MM:SS`.
pub const SECONDS_STRING_LEN: usize = 19;

/// Replace a non-positive timestamp with the current time.
///
/// Without the `std` feature there is no clock, so a non-positive timestamp is
/// rejected.
pub(crate) fn resolve(timestamp_ms: i64) -> Result<i64, Error> {
    if timestamp_ms > 0 {
        return Ok(timestamp_ms);
    }
    now_ms()
}

#[cfg(feature = "std")]
fn now_ms() -> Result<i64, Error> {
    let elapsed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|_| Error::Internal)?;
    i64::try_from(elapsed.as_millis()).map_err(|_| Error::Internal)
}

#[cfg(not(feature = "std"))]
fn now_ms() -> Result<i64, Error> {
    Err(Error::InvalidParameter)
}

fn utc(timestamp_ms: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(timestamp_ms).ok_or(Error::InvalidParameter)
}

/// `YYYY-MM-DD HH:MM:SS.mmm` for the data-point builder keys.
pub(crate) fn format_millis(timestamp_ms: i64) -> Result<String<TIME_STRING_LEN>, Error> {
    let t = utc(timestamp_ms)?;
    let mut out = String::new();
    write!(
        out,
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
        t.year(),
        t.month(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
        t.timestamp_subsec_millis()
    )
    .map_err(|_| Error::InvalidParameter)?;
    Ok(out)
}

/// `YYYY-MM-DD HH:MM:SS` for the binary data-point descriptor.
pub(crate) fn format_seconds(timestamp_ms: i64) -> Result<String<SECONDS_STRING_LEN>, Error> {
    let t = utc(timestamp_ms)?;
    let mut out = String::new();
    write!(
        out,
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        t.year(),
        t.month(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
    .map_err(|_| Error::InvalidParameter)?;
    Ok(out)
}

/// Six-byte wire timestamp: year % 100, month, day, hour, minute, second.
pub(crate) fn wire_bytes(timestamp_ms: i64) -> Result<[u8; 6], Error> {
    let t = utc(timestamp_ms)?;
    Ok([
        t.year().rem_euclid(100) as u8,
        t.month() as u8,
        t.day() as u8,
        t.hour() as u8,
        t.minute() as u8,
        t.second() as u8,
    ])
}
