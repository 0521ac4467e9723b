//! Timestamp decoding and encoding.
//!
//! BigQuery exports timestamps in several shapes: RFC 3339 strings,
//! `long` columns annotated with a timestamp logical type (plain `long`
//! timestamp columns are microseconds), and `date` columns as days since
//! the epoch. [`Time`] binds to all of them and encodes as an RFC 3339
//! string.

use crate::bind::{Bind, CodecSet, Reset};
use crate::buffer::{ReadBuf, WriteBuf};
use crate::codec::{read_len, BoxCodec, Codec};
use crate::error::{Error, Result};
use crate::schema::{LogicalType, Schema};
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

/// A UTC timestamp. Wraps [`chrono::DateTime<Utc>`] so the zero value is
/// the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub DateTime<Utc>);

impl Time {
    /// The wrapped timestamp.
    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Time {
    fn default() -> Time {
        Time(DateTime::UNIX_EPOCH)
    }
}

impl Reset for Time {
    fn reset(&mut self) {
        *self = Time::default();
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(dt: DateTime<Utc>) -> Time {
        Time(dt)
    }
}

impl std::ops::Deref for Time {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Bind for Time {
    fn bind(schema: &Schema, _set: &CodecSet, optional: bool) -> Result<BoxCodec<Time>> {
        match schema {
            Schema::String => Ok(Box::new(TimeStringCodec {
                omit_empty: optional,
            })),
            Schema::Long { logical } => {
                let scale = match logical {
                    // Unannotated longs are microseconds, the scale
                    // BigQuery exports timestamp columns at.
                    None | Some(LogicalType::TimestampMicros) => Scale::Micros,
                    Some(LogicalType::TimestampMillis) => Scale::Millis,
                    Some(LogicalType::TimestampNanos) => Scale::Nanos,
                    Some(LogicalType::Date) => {
                        return Err(Error::Malformed(
                            "logical type date belongs on int, not long".into(),
                        ))
                    }
                };
                Ok(Box::new(TimeLongCodec {
                    scale,
                    omit_empty: optional,
                }))
            }
            Schema::Int {
                logical: Some(LogicalType::Date),
            } => Ok(Box::new(TimeDateCodec {
                omit_empty: optional,
            })),
            other => Err(Error::Malformed(format!(
                "schema {} cannot be bound to a timestamp",
                other.kind_name()
            ))),
        }
    }

    fn schema(_set: &CodecSet) -> Result<Schema> {
        Ok(Schema::String)
    }
}

/// Codec for timestamps carried as RFC 3339 strings.
struct TimeStringCodec {
    omit_empty: bool,
}

impl Codec for TimeStringCodec {
    type Target = Time;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Time) -> Result<()> {
        let len = read_len(buf)?;
        let raw = buf.next(len)?;
        let s = std::str::from_utf8(raw)
            .map_err(|_| Error::Malformed("timestamp string is not valid utf-8".into()))?;
        *slot = Time(parse_rfc3339(s)?);
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        let len = read_len(buf)?;
        buf.next(len).map(drop)
    }

    fn new_value(&self) -> Time {
        Time::default()
    }

    fn omit(&self, value: &Time) -> bool {
        self.omit_empty && *value == Time::default()
    }

    fn write(&self, buf: &mut WriteBuf, value: &Time) -> Result<()> {
        let s = value.0.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        buf.varint(s.len() as i64);
        buf.write(s.as_bytes());
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Scale {
    Millis,
    Micros,
    Nanos,
}

/// Codec for timestamps carried as epoch `long`s.
struct TimeLongCodec {
    scale: Scale,
    omit_empty: bool,
}

impl Codec for TimeLongCodec {
    type Target = Time;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Time) -> Result<()> {
        let v = buf.varint()?;
        let dt = match self.scale {
            Scale::Millis => DateTime::from_timestamp_millis(v),
            Scale::Micros => DateTime::from_timestamp_micros(v),
            Scale::Nanos => Some(DateTime::from_timestamp_nanos(v)),
        };
        *slot = Time(dt.ok_or(Error::Range {
            value: v,
            target: "timestamp",
        })?);
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.varint().map(drop)
    }

    fn new_value(&self) -> Time {
        Time::default()
    }

    fn omit(&self, value: &Time) -> bool {
        self.omit_empty && *value == Time::default()
    }

    fn write(&self, buf: &mut WriteBuf, value: &Time) -> Result<()> {
        let v = match self.scale {
            Scale::Millis => value.0.timestamp_millis(),
            Scale::Micros => value.0.timestamp_micros(),
            Scale::Nanos => value.0.timestamp_nanos_opt().ok_or(Error::Overflow)?,
        };
        buf.varint(v);
        Ok(())
    }
}

/// Codec for `date` columns: days since 1970-01-01 as an `int`.
struct TimeDateCodec {
    omit_empty: bool,
}

impl Codec for TimeDateCodec {
    type Target = Time;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Time) -> Result<()> {
        let days = buf.varint()?;
        if days > i64::from(i32::MAX) || days < i64::from(i32::MIN) {
            return Err(Error::Range {
                value: days,
                target: "date",
            });
        }
        let dt = days
            .checked_mul(86_400)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or(Error::Range {
                value: days,
                target: "date",
            })?;
        *slot = Time(dt);
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.varint().map(drop)
    }

    fn new_value(&self) -> Time {
        Time::default()
    }

    fn omit(&self, value: &Time) -> bool {
        self.omit_empty && *value == Time::default()
    }

    fn write(&self, buf: &mut WriteBuf, value: &Time) -> Result<()> {
        buf.varint(value.0.timestamp().div_euclid(86_400));
        Ok(())
    }
}

/// Parses an RFC 3339 timestamp.
///
/// Exists because parsing string timestamps comes up rather more often than
/// is ideal in BigQuery exports, and a direct parse of this fixed layout is
/// much faster than a general format-string parser. Accepts a bare date,
/// optional fractional seconds, and `Z` or `±hh:mm` offsets.
pub fn parse_rfc3339(input: &str) -> Result<DateTime<Utc>> {
    let bytes = input.as_bytes();
    if bytes.len() < 10 {
        return Err(malformed(input, "expected at least a yyyy-mm-dd date"));
    }
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(malformed(input, "date is missing its - separators"));
    }

    let year = atoi4(&bytes[..4]).ok_or_else(|| malformed(input, "could not parse year"))?;
    let month = atoi2(&bytes[5..7]).ok_or_else(|| malformed(input, "could not parse month"))?;
    let day = atoi2(&bytes[8..10]).ok_or_else(|| malformed(input, "could not parse day"))?;

    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| malformed(input, "no such calendar date"))?;

    if bytes.len() == 10 {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| malformed(input, "no such calendar date"))?;
        return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
    }

    if bytes.len() < 20 {
        return Err(malformed(input, "too short to carry a time and timezone"));
    }
    if bytes[10] != b'T' {
        return Err(malformed(input, "time is missing its T separator"));
    }
    if bytes[13] != b':' || bytes[16] != b':' {
        return Err(malformed(input, "time is missing its : separators"));
    }

    let hour = atoi2(&bytes[11..13]).ok_or_else(|| malformed(input, "could not parse hour"))?;
    let minute =
        atoi2(&bytes[14..16]).ok_or_else(|| malformed(input, "could not parse minute"))?;
    let second =
        atoi2(&bytes[17..19]).ok_or_else(|| malformed(input, "could not parse seconds"))?;

    let mut rest = &bytes[19..];
    let mut nanos: u32 = 0;
    if rest[0] == b'.' || rest[0] == b',' {
        rest = &rest[1..];
        let mut digits = 0usize;
        let mut value: u32 = 0;
        while digits < rest.len() && rest[digits].is_ascii_digit() {
            // Digits beyond nanosecond precision are consumed but dropped.
            if digits < 9 {
                value = value * 10 + u32::from(rest[digits] - b'0');
            }
            digits += 1;
        }
        if digits == 0 {
            return Err(malformed(input, "empty fractional seconds"));
        }
        let mut scale = 1u32;
        for _ in digits..9 {
            scale *= 10;
        }
        nanos = value * if digits < 9 { scale } else { 1 };
        rest = &rest[digits..];
        if rest.is_empty() {
            return Err(malformed(input, "too short to contain a timezone"));
        }
    }

    let offset_seconds: i64 = match rest[0] {
        b'Z' | b'z' => {
            rest = &rest[1..];
            0
        }
        sign @ (b'+' | b'-') => {
            rest = &rest[1..];
            if rest.len() < 5 {
                return Err(malformed(input, "timezone offset is the wrong length"));
            }
            if rest[2] != b':' {
                return Err(malformed(input, "timezone offset is missing its :"));
            }
            let hours = atoi2(&rest[..2])
                .ok_or_else(|| malformed(input, "could not parse timezone offset hours"))?;
            let minutes = atoi2(&rest[3..5])
                .ok_or_else(|| malformed(input, "could not parse timezone offset minutes"))?;
            rest = &rest[5..];
            let magnitude = i64::from(hours) * 3600 + i64::from(minutes) * 60;
            if sign == b'+' {
                magnitude
            } else {
                -magnitude
            }
        }
        _ => return Err(malformed(input, "timezone must be Z or start with + or -")),
    };

    if !rest.is_empty() {
        return Err(malformed(input, "unparsed data remains after the timezone"));
    }

    let naive = date
        .and_hms_nano_opt(hour as u32, minute as u32, second as u32, nanos)
        .ok_or_else(|| malformed(input, "no such time of day"))?;
    Ok(DateTime::from_naive_utc_and_offset(
        naive - Duration::seconds(offset_seconds),
        Utc,
    ))
}

fn malformed(input: &str, what: &str) -> Error {
    Error::Malformed(format!("invalid timestamp {input:?}: {what}"))
}

fn atoi2(digits: &[u8]) -> Option<u8> {
    let (a, b) = (
        digits[0].wrapping_sub(b'0'),
        digits[1].wrapping_sub(b'0'),
    );
    if a > 9 || b > 9 {
        return None;
    }
    Some(a * 10 + b)
}

fn atoi4(digits: &[u8]) -> Option<u16> {
    let high = atoi2(&digits[..2])?;
    let low = atoi2(&digits[2..4])?;
    Some(u16::from(high) * 100 + u16::from(low))
}
