//! Duration values: `xs:duration`, `xs:dayTimeDuration`, `xs:yearMonthDuration`.
//!
//! A duration is a pair of a month count and a microsecond count. Both halves share the
//! same sign.

use crate::engine::runtime::{Error, ErrorCode};
use core::fmt::Write as _;
use rust_decimal::Decimal;

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
pub const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
pub const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct XdmDuration {
    pub months: i32,
    pub micros: i64,
}

impl XdmDuration {
    pub fn new(months: i32, micros: i64) -> Result<Self, Error> {
        if (months > 0 && micros < 0) || (months < 0 && micros > 0) {
            return Err(Error::from_code(
                ErrorCode::FORG0001,
                "duration months and seconds must have the same sign",
            ));
        }
        Ok(Self { months, micros })
    }

    pub fn years(&self) -> i32 {
        self.months / 12
    }
    pub fn month_part(&self) -> i32 {
        self.months % 12
    }
    pub fn days(&self) -> i64 {
        self.micros / MICROS_PER_DAY
    }
    pub fn hours(&self) -> i64 {
        (self.micros % MICROS_PER_DAY) / MICROS_PER_HOUR
    }
    pub fn minutes(&self) -> i64 {
        (self.micros % MICROS_PER_HOUR) / MICROS_PER_MINUTE
    }
    /// Seconds including the fractional part, as an exact decimal.
    pub fn seconds(&self) -> Decimal {
        Decimal::new(self.micros % MICROS_PER_MINUTE, 6).normalize()
    }

    pub fn canonical(&self) -> String {
        if self.months == 0 && self.micros == 0 {
            return "PT0S".to_string();
        }
        let mut out = String::new();
        if self.months < 0 || self.micros < 0 {
            out.push('-');
        }
        out.push('P');
        write_year_month(self.months.unsigned_abs(), &mut out);
        write_day_time(self.micros.unsigned_abs(), &mut out);
        out
    }
}

fn write_year_month(months: u32, out: &mut String) {
    let (y, m) = (months / 12, months % 12);
    if y != 0 {
        let _ = write!(out, "{y}Y");
    }
    if m != 0 {
        let _ = write!(out, "{m}M");
    }
}

fn write_day_time(micros: u64, out: &mut String) {
    let per_day = MICROS_PER_DAY.unsigned_abs();
    let per_hour = MICROS_PER_HOUR.unsigned_abs();
    let per_minute = MICROS_PER_MINUTE.unsigned_abs();
    let per_second = MICROS_PER_SECOND.unsigned_abs();
    let days = micros / per_day;
    let hours = (micros % per_day) / per_hour;
    let minutes = (micros % per_hour) / per_minute;
    let secs = (micros % per_minute) / per_second;
    let frac = micros % per_second;
    if days != 0 {
        let _ = write!(out, "{days}D");
    }
    if hours == 0 && minutes == 0 && secs == 0 && frac == 0 {
        return;
    }
    out.push('T');
    if hours != 0 {
        let _ = write!(out, "{hours}H");
    }
    if minutes != 0 {
        let _ = write!(out, "{minutes}M");
    }
    if secs != 0 || frac != 0 {
        let _ = write!(out, "{secs}");
        if frac != 0 {
            let f = format!("{frac:06}");
            out.push('.');
            out.push_str(f.trim_end_matches('0'));
        }
        out.push('S');
    }
}

pub fn format_year_month(months: i32) -> String {
    if months == 0 {
        return "P0M".to_string();
    }
    let mut out = String::new();
    if months < 0 {
        out.push('-');
    }
    out.push('P');
    write_year_month(months.unsigned_abs(), &mut out);
    out
}

pub fn format_day_time(micros: i64) -> String {
    if micros == 0 {
        return "PT0S".to_string();
    }
    let mut out = String::new();
    if micros < 0 {
        out.push('-');
    }
    out.push('P');
    write_day_time(micros.unsigned_abs(), &mut out);
    out
}

#[derive(Default)]
struct Parts {
    negative: bool,
    years: Option<i64>,
    months: Option<i64>,
    days: Option<i64>,
    hours: Option<i64>,
    minutes: Option<i64>,
    micros_of_seconds: Option<i64>,
    has_time: bool,
}

fn take_number(s: &str) -> (&str, &str) {
    let end = s.bytes().position(|c| !(c.is_ascii_digit() || c == b'.')).unwrap_or(s.len());
    s.split_at(end)
}

fn parse_seconds(num: &str) -> Result<i64, ()> {
    let (whole, frac) = match num.split_once('.') {
        Some((w, f)) => (w, f),
        None => (num, ""),
    };
    if whole.is_empty() || frac.contains('.') || (num.contains('.') && frac.is_empty()) {
        return Err(());
    }
    let w: i64 = whole.parse().map_err(|_| ())?;
    let mut micros = 0i64;
    let mut scale = 100_000i64;
    for c in frac.bytes() {
        if !c.is_ascii_digit() {
            return Err(());
        }
        micros += i64::from(c - b'0') * scale;
        scale /= 10;
    }
    w.checked_mul(MICROS_PER_SECOND).and_then(|v| v.checked_add(micros)).ok_or(())
}

fn parse_parts(s: &str) -> Result<Parts, ()> {
    let mut p = Parts::default();
    let mut rest = s.trim();
    if let Some(r) = rest.strip_prefix('-') {
        p.negative = true;
        rest = r;
    }
    rest = rest.strip_prefix('P').ok_or(())?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return Err(());
            }
            p.has_time = true;
            (d, Some(t))
        }
        None => (rest, None),
    };
    // Designators must appear in order: Y M D, then H M S.
    let mut cur = date_part;
    let mut stage = 0;
    while !cur.is_empty() {
        let (num, tail) = take_number(cur);
        if num.is_empty() || num.contains('.') {
            return Err(());
        }
        let n: i64 = num.parse().map_err(|_| ())?;
        let designator = tail.chars().next().ok_or(())?;
        let next_stage = match designator {
            'Y' => 1,
            'M' => 2,
            'D' => 3,
            _ => return Err(()),
        };
        if next_stage <= stage {
            return Err(());
        }
        stage = next_stage;
        match designator {
            'Y' => p.years = Some(n),
            'M' => p.months = Some(n),
            _ => p.days = Some(n),
        }
        cur = &tail[1..];
    }
    if let Some(t) = time_part {
        let mut cur = t;
        let mut stage = 0;
        while !cur.is_empty() {
            let (num, tail) = take_number(cur);
            if num.is_empty() {
                return Err(());
            }
            let designator = tail.chars().next().ok_or(())?;
            let next_stage = match designator {
                'H' => 1,
                'M' => 2,
                'S' => 3,
                _ => return Err(()),
            };
            if next_stage <= stage {
                return Err(());
            }
            stage = next_stage;
            match designator {
                'H' | 'M' if num.contains('.') => return Err(()),
                'H' => p.hours = Some(num.parse().map_err(|_| ())?),
                'M' => p.minutes = Some(num.parse().map_err(|_| ())?),
                _ => p.micros_of_seconds = Some(parse_seconds(num)?),
            }
            cur = &tail[1..];
        }
    }
    let any = [p.years, p.months, p.days, p.hours, p.minutes, p.micros_of_seconds]
        .iter()
        .any(Option::is_some);
    if !any {
        return Err(());
    }
    Ok(p)
}

impl Parts {
    fn total_months(&self) -> Result<i32, ()> {
        let total = self
            .years
            .unwrap_or(0)
            .checked_mul(12)
            .and_then(|y| y.checked_add(self.months.unwrap_or(0)))
            .ok_or(())?;
        let total = i32::try_from(total).map_err(|_| ())?;
        Ok(if self.negative { -total } else { total })
    }

    fn total_micros(&self) -> Result<i64, ()> {
        let total = self
            .days
            .unwrap_or(0)
            .checked_mul(MICROS_PER_DAY)
            .and_then(|d| d.checked_add(self.hours.unwrap_or(0).checked_mul(MICROS_PER_HOUR)?))
            .and_then(|d| d.checked_add(self.minutes.unwrap_or(0).checked_mul(MICROS_PER_MINUTE)?))
            .and_then(|d| d.checked_add(self.micros_of_seconds.unwrap_or(0)))
            .ok_or(())?;
        Ok(if self.negative { -total } else { total })
    }
}

fn invalid(kind: &str, s: &str) -> Error {
    Error::from_code(ErrorCode::FORG0001, format!("invalid lexical form for xs:{kind}: '{s}'"))
}

pub fn parse_duration(s: &str) -> Result<XdmDuration, Error> {
    let p = parse_parts(s).map_err(|()| invalid("duration", s))?;
    let months = p.total_months().map_err(|()| invalid("duration", s))?;
    let micros = p.total_micros().map_err(|()| invalid("duration", s))?;
    Ok(XdmDuration { months, micros })
}

pub fn parse_day_time_duration(s: &str) -> Result<i64, Error> {
    let p = parse_parts(s).map_err(|()| invalid("dayTimeDuration", s))?;
    if p.years.is_some() || p.months.is_some() {
        return Err(invalid("dayTimeDuration", s));
    }
    p.total_micros().map_err(|()| invalid("dayTimeDuration", s))
}

pub fn parse_year_month_duration(s: &str) -> Result<i32, Error> {
    let p = parse_parts(s).map_err(|()| invalid("yearMonthDuration", s))?;
    if p.days.is_some() || p.has_time {
        return Err(invalid("yearMonthDuration", s));
    }
    p.total_months().map_err(|()| invalid("yearMonthDuration", s))
}

/// Timezone offset in minutes from a dayTimeDuration, as used by the `adjust-*` functions.
/// The duration must be a whole number of minutes within ±14 hours.
pub fn timezone_from_duration(micros: i64) -> Result<i16, Error> {
    if micros % MICROS_PER_MINUTE != 0 {
        return Err(Error::from_code(
            ErrorCode::FODT0003,
            format!("timezone {} is not an integral number of minutes", format_day_time(micros)),
        ));
    }
    crate::xdm::temporal::check_timezone(micros / MICROS_PER_MINUTE)
}
