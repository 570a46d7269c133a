//! RFC 3339 timestamps used by date comparison values.
//!
//! A [`Timestamp`] is an instant in microseconds since the Unix epoch. It
//! parses either a full date-time (`2024-03-15T14:30:00+05:30`) or a bare
//! date (`2024-03-15`, midnight at the given offset) and always formats as a
//! UTC date-time.

use std::fmt;

use thiserror::Error;

const MICROSECONDS_PER_SECOND: i64 = 1_000_000;
const MICROSECONDS_PER_MINUTE: i64 = 60 * MICROSECONDS_PER_SECOND;
const MICROSECONDS_PER_HOUR: i64 = 60 * MICROSECONDS_PER_MINUTE;
const MICROSECONDS_PER_DAY: i64 = 24 * MICROSECONDS_PER_HOUR;

/// Error type for RFC 3339 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid RFC 3339 timestamp {input:?}: {reason}")]
pub struct DateTimeParseError {
    pub input: String,
    pub reason: &'static str,
}

impl DateTimeParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// An instant, in microseconds since 1970-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    epoch_us: i64,
}

impl Timestamp {
    pub fn from_epoch_micros(epoch_us: i64) -> Self {
        Self { epoch_us }
    }

    /// Converts seconds since the epoch, rounding to the microsecond.
    pub fn from_epoch_seconds(seconds: f64) -> Option<Self> {
        let micros = seconds * MICROSECONDS_PER_SECOND as f64;
        if !micros.is_finite() || micros.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Self {
            epoch_us: micros.round() as i64,
        })
    }

    pub fn epoch_micros(self) -> i64 {
        self.epoch_us
    }

    /// Parses an RFC 3339 date-time or date.
    pub fn parse(input: &str) -> Result<Self, DateTimeParseError> {
        let input = input.trim();
        if input.len() >= 11 && matches!(input.as_bytes()[10], b'T' | b't' | b' ') {
            parse_datetime(input)
        } else {
            parse_date(input)
        }
    }

    /// Formats as an RFC 3339 date-time in UTC.
    pub fn to_rfc3339(self) -> String {
        let days = self.epoch_us.div_euclid(MICROSECONDS_PER_DAY);
        let time_us = self.epoch_us.rem_euclid(MICROSECONDS_PER_DAY);
        let (year, month, day) = days_to_date(days);

        let hours = time_us / MICROSECONDS_PER_HOUR;
        let minutes = (time_us % MICROSECONDS_PER_HOUR) / MICROSECONDS_PER_MINUTE;
        let seconds = (time_us % MICROSECONDS_PER_MINUTE) / MICROSECONDS_PER_SECOND;
        let micros = time_us % MICROSECONDS_PER_SECOND;

        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}Z",
            year,
            month,
            day,
            hours,
            minutes,
            seconds,
            format_fractional_seconds(micros)
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

fn parse_date(input: &str) -> Result<Timestamp, DateTimeParseError> {
    if input.len() < 10 || !input.is_char_boundary(10) {
        return Err(DateTimeParseError::new(input, "too short for a date"));
    }
    let days = parse_ymd(input, &input[..10])?;
    let offset_min = match &input[10..] {
        "" => 0,
        offset => parse_timezone_offset(input, offset)?,
    };
    Ok(Timestamp {
        epoch_us: days * MICROSECONDS_PER_DAY - offset_min * MICROSECONDS_PER_MINUTE,
    })
}

fn parse_datetime(input: &str) -> Result<Timestamp, DateTimeParseError> {
    if input.len() < 19 || !input.is_char_boundary(19) {
        return Err(DateTimeParseError::new(input, "too short for a date-time"));
    }
    let days = parse_ymd(input, &input[..10])?;

    let time = &input[11..19];
    let bytes = time.as_bytes();
    if bytes[2] != b':' || bytes[5] != b':' {
        return Err(DateTimeParseError::new(input, "expected HH:MM:SS"));
    }
    let hours: i64 = parse_digits(input, &time[..2], "invalid hours")?;
    let minutes: i64 = parse_digits(input, &time[3..5], "invalid minutes")?;
    let seconds: i64 = parse_digits(input, &time[6..8], "invalid seconds")?;
    if hours > 23 || minutes > 59 || seconds > 60 {
        return Err(DateTimeParseError::new(input, "time component out of range"));
    }

    let rest = &input[19..];
    let (fraction, offset) = match rest.strip_prefix('.') {
        Some(after_dot) => {
            let end = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            (&after_dot[..end], &after_dot[end..])
        }
        None => ("", rest),
    };

    let offset_min = if offset.is_empty() {
        0
    } else {
        parse_timezone_offset(input, offset)?
    };

    let epoch_us = days * MICROSECONDS_PER_DAY
        + hours * MICROSECONDS_PER_HOUR
        + minutes * MICROSECONDS_PER_MINUTE
        + seconds.min(59) * MICROSECONDS_PER_SECOND
        + parse_fractional_seconds(fraction)
        - offset_min * MICROSECONDS_PER_MINUTE;

    Ok(Timestamp { epoch_us })
}

fn parse_digits(input: &str, digits: &str, reason: &'static str) -> Result<i64, DateTimeParseError> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateTimeParseError::new(input, reason));
    }
    digits
        .parse()
        .map_err(|_| DateTimeParseError::new(input, reason))
}

/// Parses `YYYY-MM-DD` into days since the epoch.
fn parse_ymd(input: &str, date: &str) -> Result<i64, DateTimeParseError> {
    let bytes = date.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(DateTimeParseError::new(input, "expected YYYY-MM-DD"));
    }
    let year = parse_digits(input, &date[..4], "invalid year")? as i32;
    let month = parse_digits(input, &date[5..7], "invalid month")? as u32;
    let day = parse_digits(input, &date[8..10], "invalid day")? as u32;

    if !(1..=12).contains(&month) {
        return Err(DateTimeParseError::new(input, "invalid month"));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(DateTimeParseError::new(input, "invalid day"));
    }
    Ok(date_to_days(year, month, day))
}

/// Parses a timezone offset (Z, +HH:MM, -HH:MM) into minutes.
fn parse_timezone_offset(input: &str, offset: &str) -> Result<i64, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }

    let bytes = offset.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return Err(DateTimeParseError::new(input, "invalid timezone offset"));
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(DateTimeParseError::new(input, "invalid timezone offset")),
    };
    let hours = parse_digits(input, &offset[1..3], "invalid timezone offset")?;
    let minutes = parse_digits(input, &offset[4..6], "invalid timezone offset")?;
    if hours > 23 || minutes > 59 {
        return Err(DateTimeParseError::new(input, "timezone offset out of range"));
    }
    Ok(sign * (hours * 60 + minutes))
}

/// Parses fractional seconds, padded or truncated to microseconds.
fn parse_fractional_seconds(fraction: &str) -> i64 {
    if fraction.is_empty() {
        return 0;
    }
    let mut padded = fraction.to_string();
    while padded.len() < 6 {
        padded.push('0');
    }
    padded.truncate(6);
    padded.parse().unwrap_or(0)
}

/// Formats microseconds as fractional seconds, omitting if zero.
fn format_fractional_seconds(us: i64) -> String {
    if us == 0 {
        return String::new();
    }
    let digits = format!("{:06}", us);
    format!(".{}", digits.trim_end_matches('0'))
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since the epoch for a civil date (Howard Hinnant's algorithm).
fn date_to_days(year: i32, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year } as i64;
    let m = if month <= 2 { month + 9 } else { month - 3 } as i64;

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * m + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;

    era * 146097 + doe - 719468
}

/// Civil date for days since the epoch.
fn days_to_date(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;

    (if m <= 2 { y + 1 } else { y }, m, d)
}
