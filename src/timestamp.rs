//! Timestamp helpers bridging `chrono` and TOML's native datetime type.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, FixedOffset, Local, Offset, TimeZone, Timelike};
use toml::value::{Date, Datetime, Offset as TomlOffset, Time};

/// The current local time as an offset TOML datetime, at microsecond precision.
pub fn now() -> Result<Datetime> {
    from_chrono(&Local::now())
}

/// Convert a chrono timestamp into a TOML offset datetime.
///
/// Sub-microsecond precision is dropped; a leap second is clamped into the
/// preceding second. Years outside `0..=9999` are rejected.
pub fn from_chrono<Tz: TimeZone>(at: &DateTime<Tz>) -> Result<Datetime> {
    let year = u16::try_from(at.year())
        .ok()
        .filter(|year| *year <= 9999)
        .ok_or(Error::TimestampOutOfRange { year: at.year() })?;
    let offset_minutes = at.offset().fix().local_minus_utc() / 60;
    let micros = (at.nanosecond() / 1_000).min(999_999);

    Ok(Datetime {
        date: Some(Date {
            year,
            month: at.month() as u8,
            day: at.day() as u8,
        }),
        time: Some(Time {
            hour: at.hour() as u8,
            minute: at.minute() as u8,
            second: at.second() as u8,
            nanosecond: micros * 1_000,
        }),
        offset: Some(TomlOffset::Custom {
            minutes: offset_minutes as i16,
        }),
    })
}

/// Convert a TOML datetime back into chrono so it can be ordered.
///
/// Returns `None` unless the datetime carries a date, a time and an offset.
pub fn to_chrono(dt: &Datetime) -> Option<DateTime<FixedOffset>> {
    if dt.date.is_none() || dt.time.is_none() || dt.offset.is_none() {
        return None;
    }
    DateTime::parse_from_rfc3339(&dt.to_string()).ok()
}
