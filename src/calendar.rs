//! # CF Time Decoding
//!
//! Decodes numeric time coordinates stored as `"<unit> since <reference date>"`
//! into calendar timestamps, following the CF conventions' calendars. Model
//! output routinely uses non-standard calendars (`noleap`, `360_day`, ...) and
//! years outside the range of most date libraries, so dates are carried as the
//! plain [`CfDatetime`] record rather than a `chrono` type.
//!
//! ## Supported Calendars
//!
//! - `standard` / `gregorian`: Julian before 1582-10-15, Gregorian after
//! - `proleptic_gregorian`
//! - `julian`
//! - `noleap` / `365_day`
//! - `all_leap` / `366_day`
//! - `360_day`

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SECONDS_PER_DAY: i64 = 86_400;

/// First day of the Gregorian reform as a Julian day number (1582-10-15).
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;

const CUMULATIVE_DAYS_NOLEAP: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const CUMULATIVE_DAYS_LEAP: [i64; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// Errors raised while decoding a numeric time axis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Invalid time units '{0}': expected '<unit> since <date>'")]
    InvalidUnits(String),

    #[error("Unsupported time unit '{0}'")]
    UnsupportedUnit(String),

    #[error("Invalid reference date '{0}'")]
    InvalidReferenceDate(String),

    #[error("Unknown calendar '{0}'")]
    UnknownCalendar(String),

    #[error("Non-finite time value at index {index}")]
    NonFiniteValue { index: usize },

    #[error("Time value {value} at index {index} is out of range")]
    OutOfRange { index: usize, value: f64 },
}

/// Access to the calendar fields of a decoded timestamp.
pub trait CalendarDate {
    fn year(&self) -> i32;
    /// Month of the year, 1-based
    fn month(&self) -> u32;
    /// Day of the month, 1-based
    fn day(&self) -> u32;
}

/// A timestamp in an arbitrary CF calendar.
///
/// Field order makes the derived ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CfDatetime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CfDatetime {
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        CfDatetime {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    /// Converts to a `chrono` timestamp; `None` for dates that do not exist
    /// in the proleptic Gregorian calendar (e.g. 30 February in `360_day`).
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, self.second)
    }

    fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }
}

impl fmt::Display for CfDatetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl CalendarDate for CfDatetime {
    fn year(&self) -> i32 {
        self.year
    }

    fn month(&self) -> u32 {
        self.month
    }

    fn day(&self) -> u32 {
        self.day
    }
}

impl CalendarDate for NaiveDate {
    fn year(&self) -> i32 {
        Datelike::year(self)
    }

    fn month(&self) -> u32 {
        Datelike::month(self)
    }

    fn day(&self) -> u32 {
        Datelike::day(self)
    }
}

impl CalendarDate for NaiveDateTime {
    fn year(&self) -> i32 {
        Datelike::year(self)
    }

    fn month(&self) -> u32 {
        Datelike::month(self)
    }

    fn day(&self) -> u32 {
        Datelike::day(self)
    }
}

/// CF calendar identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Calendar {
    Standard,
    ProlepticGregorian,
    Julian,
    NoLeap,
    AllLeap,
    Day360,
}

impl FromStr for Calendar {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "julian" => Ok(Calendar::Julian),
            "noleap" | "no_leap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            _ => Err(DecodeError::UnknownCalendar(s.to_string())),
        }
    }
}

impl Calendar {
    pub fn is_leap(&self, year: i32) -> bool {
        match self {
            Calendar::ProlepticGregorian => gregorian_leap(year),
            Calendar::Julian => year.rem_euclid(4) == 0,
            Calendar::Standard => {
                if year > 1582 {
                    gregorian_leap(year)
                } else {
                    year.rem_euclid(4) == 0
                }
            }
            Calendar::NoLeap | Calendar::Day360 => false,
            Calendar::AllLeap => true,
        }
    }

    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match (self, month) {
            (Calendar::Day360, _) => 30,
            (_, 1 | 3 | 5 | 7 | 8 | 10 | 12) => 31,
            (_, 4 | 6 | 9 | 11) => 30,
            (_, 2) if self.is_leap(year) => 29,
            (_, 2) => 28,
            _ => 0,
        }
    }

    /// Counts days from a calendar-specific origin.
    fn day_number(&self, year: i32, month: u32, day: u32) -> i64 {
        let (y, m, d) = (i64::from(year), i64::from(month), i64::from(day));
        match self {
            Calendar::ProlepticGregorian => gregorian_to_jdn(y, m, d),
            Calendar::Julian => julian_to_jdn(y, m, d),
            Calendar::Standard => {
                if (year, month, day) >= (1582, 10, 15) {
                    gregorian_to_jdn(y, m, d)
                } else {
                    julian_to_jdn(y, m, d)
                }
            }
            Calendar::NoLeap => y * 365 + CUMULATIVE_DAYS_NOLEAP[(m - 1) as usize] + d - 1,
            Calendar::AllLeap => y * 366 + CUMULATIVE_DAYS_LEAP[(m - 1) as usize] + d - 1,
            Calendar::Day360 => y * 360 + (m - 1) * 30 + d - 1,
        }
    }

    /// Inverse of [`Calendar::day_number`].
    fn from_day_number(&self, n: i64) -> (i32, u32, u32) {
        match self {
            Calendar::ProlepticGregorian => jdn_to_gregorian(n),
            Calendar::Julian => jdn_to_julian(n),
            Calendar::Standard => {
                if n >= GREGORIAN_REFORM_JDN {
                    jdn_to_gregorian(n)
                } else {
                    jdn_to_julian(n)
                }
            }
            Calendar::NoLeap => split_fixed_year(n, 365, &CUMULATIVE_DAYS_NOLEAP),
            Calendar::AllLeap => split_fixed_year(n, 366, &CUMULATIVE_DAYS_LEAP),
            Calendar::Day360 => {
                let year = n.div_euclid(360);
                let doy = n.rem_euclid(360);
                (year as i32, (doy / 30 + 1) as u32, (doy % 30 + 1) as u32)
            }
        }
    }
}

fn gregorian_leap(year: i32) -> bool {
    (year.rem_euclid(4) == 0 && year.rem_euclid(100) != 0) || year.rem_euclid(400) == 0
}

fn gregorian_to_jdn(y: i64, m: i64, d: i64) -> i64 {
    let a = (14 - m) / 12;
    let y = y + 4800 - a;
    let m = m + 12 * a - 3;
    d + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)
        - 32045
}

fn julian_to_jdn(y: i64, m: i64, d: i64) -> i64 {
    let a = (14 - m) / 12;
    let y = y + 4800 - a;
    let m = m + 12 * a - 3;
    d + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32083
}

fn jdn_to_gregorian(jdn: i64) -> (i32, u32, u32) {
    let a = jdn + 32044;
    let b = (4 * a + 3).div_euclid(146_097);
    let c = a - (146_097 * b).div_euclid(4);
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = 100 * b + d - 4800 + m / 10;
    (year as i32, month as u32, day as u32)
}

fn jdn_to_julian(jdn: i64) -> (i32, u32, u32) {
    let c = jdn + 32082;
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    (year as i32, month as u32, day as u32)
}

fn split_fixed_year(n: i64, year_length: i64, cumulative: &[i64; 12]) -> (i32, u32, u32) {
    let year = n.div_euclid(year_length);
    let doy = n.rem_euclid(year_length);
    let month_index = cumulative.iter().rposition(|&start| start <= doy).unwrap_or(0);
    let day = doy - cumulative[month_index] + 1;
    (year as i32, month_index as u32 + 1, day as u32)
}

/// Length of one step of a CF time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3600,
            TimeUnit::Days => SECONDS_PER_DAY,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seconds" | "second" | "secs" | "sec" | "s" => Ok(TimeUnit::Seconds),
            "minutes" | "minute" | "mins" | "min" => Ok(TimeUnit::Minutes),
            "hours" | "hour" | "hrs" | "hr" | "h" => Ok(TimeUnit::Hours),
            "days" | "day" | "d" => Ok(TimeUnit::Days),
            _ => Err(DecodeError::UnsupportedUnit(s.to_string())),
        }
    }
}

/// A parsed `"<unit> since <reference date>"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub reference: CfDatetime,
    /// Offset of the reference clock east of UTC.
    pub utc_offset_seconds: i64,
}

impl TimeUnits {
    /// Parses strings such as `"days since 0001-01-01 00:00:00"`,
    /// `"hours since 1979-01-01T00:00:00Z"` or `"days since 2000-01-01 UTC"`.
    ///
    /// A zone designator (`Z`, `UTC`, `GMT` or `±hh[:mm]`) may follow the
    /// time, or the date when no time is given.
    pub fn parse(units: &str) -> Result<Self, DecodeError> {
        let lowered = units.trim().to_lowercase();
        let mut tokens = lowered.split_whitespace();
        let unit_token = tokens
            .next()
            .ok_or_else(|| DecodeError::InvalidUnits(units.to_string()))?;
        if tokens.next() != Some("since") {
            return Err(DecodeError::InvalidUnits(units.to_string()));
        }
        let unit: TimeUnit = unit_token.parse()?;

        let stamp = tokens
            .next()
            .ok_or_else(|| DecodeError::InvalidUnits(units.to_string()))?;
        let mut rest: Vec<&str> = tokens.collect();
        let (date_part, mut time_part) = match stamp.split_once('t') {
            Some((date, time)) => (date, Some(time)),
            None => (stamp, None),
        };
        if time_part.is_none()
            && rest
                .first()
                .is_some_and(|token| token.starts_with(|c: char| c.is_ascii_digit()))
        {
            time_part = Some(rest.remove(0));
        }

        let invalid = || DecodeError::InvalidReferenceDate(units.to_string());
        let mut reference = parse_date(date_part).ok_or_else(invalid)?;
        let mut zone = None;
        if let Some(time) = time_part {
            let (clock, suffix) = split_zone(time);
            let (hour, minute, second) = parse_time(clock).ok_or_else(invalid)?;
            reference.hour = hour;
            reference.minute = minute;
            reference.second = second;
            zone = suffix;
        }
        match (zone, rest.as_slice()) {
            (_, []) => {}
            (None, [designator]) => zone = Some(*designator),
            _ => return Err(invalid()),
        }
        let utc_offset_seconds = match zone {
            Some(designator) => parse_zone(designator).ok_or_else(invalid)?,
            None => 0,
        };
        Ok(TimeUnits {
            unit,
            reference,
            utc_offset_seconds,
        })
    }
}

/// Splits a trailing zone designator off a clock time.
fn split_zone(time: &str) -> (&str, Option<&str>) {
    if let Some(at) = time.find(['+', '-']) {
        return (&time[..at], Some(&time[at..]));
    }
    for suffix in ["utc", "gmt", "z"] {
        if let Some(clock) = time.strip_suffix(suffix) {
            return (clock, Some(suffix));
        }
    }
    (time, None)
}

/// Offset in seconds east of UTC.
fn parse_zone(text: &str) -> Option<i64> {
    if matches!(text, "z" | "utc" | "gmt") {
        return Some(0);
    }
    let (sign, body) = match text.split_at_checked(1)? {
        ("+", body) => (1, body),
        ("-", body) => (-1, body),
        _ => return None,
    };
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None if body.len() == 4 => body.split_at(2),
        None => (body, "0"),
    };
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

fn parse_date(text: &str) -> Option<CfDatetime> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut parts = body.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let year = if negative { -year } else { year };
    Some(CfDatetime::ymd(year, month, day))
}

fn parse_time(text: &str) -> Option<(u32, u32, u32)> {
    let mut parts = text.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    let second: f64 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0.0,
    };
    if hour > 23 || minute > 59 || !(0.0..60.0).contains(&second) {
        return None;
    }
    Some((hour, minute, second.floor() as u32))
}

/// Decodes numeric time values under a units string and calendar name.
pub trait TimeDecoder {
    fn decode(
        &self,
        values: &[f64],
        units: &str,
        calendar: &str,
    ) -> Result<Vec<CfDatetime>, DecodeError>;
}

/// The built-in CF decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct CfDecoder;

impl TimeDecoder for CfDecoder {
    fn decode(
        &self,
        values: &[f64],
        units: &str,
        calendar: &str,
    ) -> Result<Vec<CfDatetime>, DecodeError> {
        let calendar: Calendar = calendar.parse()?;
        let units = TimeUnits::parse(units)?;
        decode_with(values, &units, calendar)
    }
}

/// Decodes values with already-parsed units and calendar.
pub fn decode_with(
    values: &[f64],
    units: &TimeUnits,
    calendar: Calendar,
) -> Result<Vec<CfDatetime>, DecodeError> {
    let reference = units.reference;
    if !(1..=12).contains(&reference.month)
        || reference.day == 0
        || reference.day > calendar.days_in_month(reference.year, reference.month)
    {
        return Err(DecodeError::InvalidReferenceDate(reference.to_string()));
    }

    let origin = calendar.day_number(reference.year, reference.month, reference.day)
        * SECONDS_PER_DAY
        + reference.seconds_of_day()
        - units.utc_offset_seconds;
    let step = units.unit.seconds() as f64;

    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if !value.is_finite() {
                return Err(DecodeError::NonFiniteValue { index });
            }
            let offset = (value * step).round();
            if offset.abs() > 1.0e15 {
                return Err(DecodeError::OutOfRange { index, value });
            }
            let total = origin + offset as i64;
            let (year, month, day) = calendar.from_day_number(total.div_euclid(SECONDS_PER_DAY));
            let seconds = total.rem_euclid(SECONDS_PER_DAY);
            Ok(CfDatetime {
                year,
                month,
                day,
                hour: (seconds / 3600) as u32,
                minute: (seconds % 3600 / 60) as u32,
                second: (seconds % 60) as u32,
            })
        })
        .collect()
}

/// Shorthand for [`CfDecoder`].
pub fn decode(values: &[f64], units: &str, calendar: &str) -> Result<Vec<CfDatetime>, DecodeError> {
    CfDecoder.decode(values, units, calendar)
}
