//! Calendar values (`xs:date`, `xs:time`, `xs:dateTime`).
//!
//! Years are held astronomically (year 0 is 1 BCE), which is what `chrono` uses. The
//! lexical mapping follows XML Schema 1.0: `-0001` is 1 BCE, and `0000` is rejected.
//! Timezones are offsets in minutes, limited to -14:00..=+14:00.

use crate::engine::runtime::{Error, ErrorCode};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use core::cmp::Ordering;
use core::fmt::Write as _;

pub const MAX_TZ_MINUTES: i16 = 14 * 60;

/// Reference date used when an `xs:time` has to be placed on the timeline.
fn time_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1972, 12, 31).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XdmDateTime {
    pub value: NaiveDateTime,
    pub tz: Option<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XdmDate {
    pub date: NaiveDate,
    pub tz: Option<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XdmTime {
    pub time: NaiveTime,
    pub tz: Option<i16>,
}

/// Common view over the three calendar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarValue {
    DateTime(XdmDateTime),
    Date(XdmDate),
    Time(XdmTime),
}

impl CalendarValue {
    pub fn timezone(&self) -> Option<i16> {
        match self {
            CalendarValue::DateTime(v) => v.tz,
            CalendarValue::Date(v) => v.tz,
            CalendarValue::Time(v) => v.tz,
        }
    }

    /// Local (un-normalised) date and time. Dates start at midnight; times sit on the
    /// 1972-12-31 reference date.
    pub fn local(&self) -> NaiveDateTime {
        match self {
            CalendarValue::DateTime(v) => v.value,
            CalendarValue::Date(v) => v.date.and_time(NaiveTime::MIN),
            CalendarValue::Time(v) => time_reference_date().and_time(v.time),
        }
    }

    pub fn to_date_time(&self) -> XdmDateTime {
        XdmDateTime { value: self.local(), tz: self.timezone() }
    }

    /// Position on the UTC timeline, using `implicit_tz` when the value has no zone.
    pub fn to_utc(&self, implicit_tz: i16) -> NaiveDateTime {
        let tz = self.timezone().unwrap_or(implicit_tz);
        self.local() - TimeDelta::minutes(i64::from(tz))
    }

    /// Chronological comparison. Only values of the same calendar type are comparable.
    pub fn compare(&self, other: &CalendarValue, implicit_tz: i16) -> Option<Ordering> {
        if core::mem::discriminant(self) != core::mem::discriminant(other) {
            return None;
        }
        Some(self.to_utc(implicit_tz).cmp(&other.to_utc(implicit_tz)))
    }
}

pub fn check_timezone(minutes: i64) -> Result<i16, Error> {
    if minutes.abs() > i64::from(MAX_TZ_MINUTES) {
        return Err(Error::from_code(
            ErrorCode::FODT0003,
            format!("timezone offset {minutes} minutes is outside -14:00..+14:00"),
        ));
    }
    i16::try_from(minutes).map_err(|_| Error::from_code(ErrorCode::FODT0003, "invalid timezone"))
}

/// Apply the `adjust-*-to-timezone` rules to a local date/time.
///
/// - target `None`: strip the zone and keep the local value;
/// - value without zone: attach the target zone;
/// - otherwise: move the instant into the target zone.
pub fn adjust_local(local: NaiveDateTime, tz: Option<i16>, target: Option<i16>) -> (NaiveDateTime, Option<i16>) {
    match (tz, target) {
        (_, None) => (local, None),
        (None, Some(t)) => (local, Some(t)),
        (Some(from), Some(to)) => {
            let shifted = local + TimeDelta::minutes(i64::from(to) - i64::from(from));
            (shifted, Some(to))
        }
    }
}

fn invalid(kind: &str, s: &str) -> Error {
    Error::from_code(ErrorCode::FORG0001, format!("invalid lexical form for xs:{kind}: '{s}'"))
}

/// Split a trailing timezone (`Z` or `±hh:mm`) off a lexical value.
fn split_timezone(s: &str) -> Result<(&str, Option<i16>), ()> {
    if let Some(rest) = s.strip_suffix('Z') {
        return Ok((rest, Some(0)));
    }
    if s.len() >= 6 {
        let (head, tail) = s.split_at(s.len() - 6);
        let b = tail.as_bytes();
        if (b[0] == b'+' || b[0] == b'-') && b[3] == b':' {
            let hh: i16 = tail[1..3].parse().map_err(|_| ())?;
            let mm: i16 = tail[4..6].parse().map_err(|_| ())?;
            if !tail[1..3].bytes().all(|c| c.is_ascii_digit()) || !tail[4..6].bytes().all(|c| c.is_ascii_digit()) {
                return Err(());
            }
            if mm > 59 || hh > 14 || (hh == 14 && mm != 0) {
                return Err(());
            }
            let total = hh * 60 + mm;
            return Ok((head, Some(if b[0] == b'-' { -total } else { total })));
        }
    }
    Ok((s, None))
}

fn parse_digits<T: core::str::FromStr>(s: &str, len: usize) -> Result<T, ()> {
    if s.len() != len || !s.bytes().all(|c| c.is_ascii_digit()) {
        return Err(());
    }
    s.parse().map_err(|_| ())
}

/// Parse `-?YYYY-MM-DD` (without timezone) into an astronomical date.
fn parse_ymd(s: &str) -> Result<NaiveDate, ()> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let mut parts = body.rsplitn(3, '-');
    let day_s = parts.next().ok_or(())?;
    let month_s = parts.next().ok_or(())?;
    let year_s = parts.next().ok_or(())?;
    if year_s.len() < 4 || (year_s.len() > 4 && year_s.starts_with('0')) || !year_s.bytes().all(|c| c.is_ascii_digit()) {
        return Err(());
    }
    let lexical_year: i32 = year_s.parse().map_err(|_| ())?;
    if lexical_year == 0 {
        return Err(());
    }
    let year = if negative { 1 - lexical_year } else { lexical_year };
    let month: u32 = parse_digits(month_s, 2)?;
    let day: u32 = parse_digits(day_s, 2)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or(())
}

/// Parse `hh:mm:ss(.s+)?`. Returns the time and whether it was `24:00:00`.
fn parse_hms(s: &str) -> Result<(NaiveTime, bool), ()> {
    let mut parts = s.splitn(3, ':');
    let h: u32 = parse_digits(parts.next().ok_or(())?, 2)?;
    let m: u32 = parse_digits(parts.next().ok_or(())?, 2)?;
    let sec_s = parts.next().ok_or(())?;
    let (whole, frac) = match sec_s.split_once('.') {
        Some((w, f)) => {
            if f.is_empty() || !f.bytes().all(|c| c.is_ascii_digit()) {
                return Err(());
            }
            (w, f)
        }
        None => (sec_s, ""),
    };
    let sec: u32 = parse_digits(whole, 2)?;
    let mut micros = 0u32;
    for (i, c) in frac.bytes().take(6).enumerate() {
        micros += u32::from(c - b'0') * 10u32.pow(5 - u32::try_from(i).map_err(|_| ())?);
    }
    if h == 24 {
        if m != 0 || sec != 0 || micros != 0 || frac.bytes().any(|c| c != b'0') {
            return Err(());
        }
        return Ok((NaiveTime::MIN, true));
    }
    if m > 59 || sec > 59 {
        return Err(());
    }
    NaiveTime::from_hms_micro_opt(h, m, sec, micros).map(|t| (t, false)).ok_or(())
}

pub fn parse_date(s: &str) -> Result<XdmDate, Error> {
    let t = s.trim();
    let (body, tz) = split_timezone(t).map_err(|()| invalid("date", s))?;
    let date = parse_ymd(body).map_err(|()| invalid("date", s))?;
    Ok(XdmDate { date, tz })
}

pub fn parse_time(s: &str) -> Result<XdmTime, Error> {
    let t = s.trim();
    let (body, tz) = split_timezone(t).map_err(|()| invalid("time", s))?;
    let (time, _) = parse_hms(body).map_err(|()| invalid("time", s))?;
    Ok(XdmTime { time, tz })
}

pub fn parse_date_time(s: &str) -> Result<XdmDateTime, Error> {
    let t = s.trim();
    let (body, tz) = split_timezone(t).map_err(|()| invalid("dateTime", s))?;
    let (date_s, time_s) = body.split_once('T').ok_or_else(|| invalid("dateTime", s))?;
    let date = parse_ymd(date_s).map_err(|()| invalid("dateTime", s))?;
    let (time, end_of_day) = parse_hms(time_s).map_err(|()| invalid("dateTime", s))?;
    let mut value = date.and_time(time);
    if end_of_day {
        value = value
            .checked_add_signed(TimeDelta::days(1))
            .ok_or_else(|| Error::from_code(ErrorCode::FODT0001, "dateTime overflow"))?;
    }
    Ok(XdmDateTime { value, tz })
}

/// Lexical year for an astronomical year (`0` becomes `-0001`).
pub fn lexical_year(astronomical: i32) -> i32 {
    if astronomical > 0 { astronomical } else { astronomical - 1 }
}

pub fn format_timezone(tz: i16, out: &mut String) {
    if tz == 0 {
        out.push('Z');
    } else {
        let sign = if tz > 0 { '+' } else { '-' };
        let a = tz.abs();
        let _ = write!(out, "{sign}{:02}:{:02}", a / 60, a % 60);
    }
}

fn format_ymd(date: &NaiveDate, out: &mut String) {
    let y = lexical_year(date.year());
    if y < 0 {
        let _ = write!(out, "-{:04}", -y);
    } else {
        let _ = write!(out, "{y:04}");
    }
    let _ = write!(out, "-{:02}-{:02}", date.month(), date.day());
}

fn format_hms(time: &NaiveTime, out: &mut String) {
    let _ = write!(out, "{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second());
    let micros = time.nanosecond() / 1000;
    if micros > 0 {
        let frac = format!("{micros:06}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
}

impl XdmDate {
    pub fn canonical(&self) -> String {
        let mut s = String::with_capacity(16);
        format_ymd(&self.date, &mut s);
        if let Some(tz) = self.tz {
            format_timezone(tz, &mut s);
        }
        s
    }
}

impl XdmTime {
    pub fn canonical(&self) -> String {
        let mut s = String::with_capacity(16);
        format_hms(&self.time, &mut s);
        if let Some(tz) = self.tz {
            format_timezone(tz, &mut s);
        }
        s
    }
}

impl XdmDateTime {
    pub fn canonical(&self) -> String {
        let mut s = String::with_capacity(32);
        format_ymd(&self.value.date(), &mut s);
        s.push('T');
        format_hms(&self.value.time(), &mut s);
        if let Some(tz) = self.tz {
            format_timezone(tz, &mut s);
        }
        s
    }
}

/// Day of week, 1 = Monday .. 7 = Sunday.
pub fn day_of_week(date: &NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// ISO-style week number: week 1 contains the first Thursday of the year; days before
/// it belong to the last week of the previous year.
pub fn week_number(date: &NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Week within the month, by the same first-Thursday rule. Days before week 1 are in
/// week 0.
pub fn week_in_month(date: &NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(*date);
    let first_day = day_of_week(&first);
    let inc = u32::from(first_day < 5);
    (date.day() + first_day - 2) / 7 + inc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_years_round_trip() {
        let d = parse_date("-0001-03-01").unwrap();
        assert_eq!(d.date.year(), 0);
        assert_eq!(d.canonical(), "-0001-03-01");
        assert!(parse_date("0000-01-01").is_err());
    }

    #[test]
    fn end_of_day_rolls_over() {
        let dt = parse_date_time("1999-12-31T24:00:00Z").unwrap();
        assert_eq!(dt.canonical(), "2000-01-01T00:00:00Z");
    }

    #[test]
    fn fractional_seconds_trimmed() {
        let t = parse_time("10:00:00.500+05:30").unwrap();
        assert_eq!(t.canonical(), "10:00:00.5+05:30");
        assert_eq!(t.tz, Some(330));
    }

    #[test]
    fn timezone_range_checked() {
        assert!(parse_time("10:00:00+14:01").is_err());
        assert!(check_timezone(15 * 60).is_err());
        assert_eq!(check_timezone(-14 * 60).unwrap(), -840);
    }

    #[test]
    fn week_numbers_follow_first_thursday_rule() {
        // 2005-01-01 is a Saturday and belongs to week 53 of 2004.
        let d = NaiveDate::from_ymd_opt(2005, 1, 1).unwrap();
        assert_eq!(week_number(&d), 53);
        assert_eq!(week_in_month(&d), 0);
    }
}
