//! Wall-clock time model for catalog events.
//!
//! Catalog times are 12-hour strings such as `"11:30 AM"`. They are converted
//! to minutes since midnight so they can be ordered and compared. There is no
//! date or time zone: every event starts and ends on the same local day.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Pre-compiled pattern for `H:MM AM` / `HH:MM PM`.
static TIME_OF_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}) (AM|PM)$").expect("time-of-day pattern is valid")
});

const MINUTES_PER_HOUR: u16 = 60;
const NOON: u16 = 12 * MINUTES_PER_HOUR;

/// A catalog time string could not be interpreted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedTimeError {
    /// The string is not of the form `H:MM AM` or `HH:MM PM`.
    #[error("expected a time like \"11:30 AM\", got {input:?}")]
    Format { input: String },

    /// The hour is outside 1–12.
    #[error("hour must be between 1 and 12 in {input:?}")]
    HourOutOfRange { input: String },

    /// The minute is outside 0–59.
    #[error("minute must be between 0 and 59 in {input:?}")]
    MinuteOutOfRange { input: String },

    /// The end of a range is not strictly after its start.
    #[error("end time {end} does not follow start time {start}")]
    EndNotAfterStart { start: TimeOfDay, end: TimeOfDay },
}

/// A time of day with minute resolution, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// 12:00 AM.
    pub const MIDNIGHT: Self = Self(0);

    /// The last representable minute, 11:59 PM.
    pub const LAST_MINUTE: Self = Self(24 * MINUTES_PER_HOUR - 1);

    /// Builds a time from minutes since midnight, if in range.
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes <= Self::LAST_MINUTE.0 {
            Some(Self(minutes))
        } else {
            None
        }
    }

    /// Minutes since midnight, in `0..=1439`.
    pub const fn minutes(self) -> u16 {
        self.0
    }

    /// Parses a 12-hour time such as `"9:05 AM"` or `"12:00 PM"`.
    ///
    /// Surrounding whitespace is ignored; the AM/PM marker is case-sensitive.
    pub fn parse(input: &str) -> Result<Self, MalformedTimeError> {
        let format_error = || MalformedTimeError::Format {
            input: input.to_string(),
        };

        let caps = TIME_OF_DAY_RE
            .captures(input.trim())
            .ok_or_else(format_error)?;
        let hour: u16 = caps[1].parse().map_err(|_| format_error())?;
        let minute: u16 = caps[2].parse().map_err(|_| format_error())?;

        if !(1..=12).contains(&hour) {
            return Err(MalformedTimeError::HourOutOfRange {
                input: input.to_string(),
            });
        }
        if minute >= MINUTES_PER_HOUR {
            return Err(MalformedTimeError::MinuteOutOfRange {
                input: input.to_string(),
            });
        }

        // 12 AM is hour 0 and 12 PM stays hour 12.
        let hour = hour % 12;
        let offset = if &caps[3] == "PM" { NOON } else { 0 };
        Ok(Self(offset + hour * MINUTES_PER_HOUR + minute))
    }
}

impl FromStr for TimeOfDay {
    type Err = MalformedTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hour = self.0 / MINUTES_PER_HOUR;
        let minute = self.0 % MINUTES_PER_HOUR;
        let marker = if self.0 < NOON { "AM" } else { "PM" };
        let hour = match hour % 12 {
            0 => 12,
            h => h,
        };
        write!(f, "{hour}:{minute:02} {marker}")
    }
}

/// Converts a catalog time string into minutes since midnight.
pub fn parse_time_of_day(input: &str) -> Result<u16, MalformedTimeError> {
    TimeOfDay::parse(input).map(TimeOfDay::minutes)
}

/// Returns true if `[start_a, end_a)` and `[start_b, end_b)` overlap.
///
/// Intervals are half-open: an event ending exactly when another starts does
/// not overlap it.
pub fn intervals_overlap(
    start_a: &str,
    end_a: &str,
    start_b: &str,
    end_b: &str,
) -> Result<bool, MalformedTimeError> {
    let start_a = parse_time_of_day(start_a)?;
    let end_a = parse_time_of_day(end_a)?;
    let start_b = parse_time_of_day(start_b)?;
    let end_b = parse_time_of_day(end_b)?;
    Ok(start_a < end_b && start_b < end_a)
}

/// A validated half-open time range within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TimeRange {
    /// Creates a range; the end must be strictly after the start.
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, MalformedTimeError> {
        if end <= start {
            return Err(MalformedTimeError::EndNotAfterStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses a range from catalog start and end strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, MalformedTimeError> {
        Self::new(TimeOfDay::parse(start)?, TimeOfDay::parse(end)?)
    }

    pub const fn start(&self) -> TimeOfDay {
        self.start
    }

    pub const fn end(&self) -> TimeOfDay {
        self.end
    }

    pub const fn duration_minutes(&self) -> u16 {
        self.end.0 - self.start.0
    }

    /// Half-open overlap test; shared endpoints do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
