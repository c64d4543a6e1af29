//! `format-date`, `format-time` and `format-dateTime`.
//!
//! A picture is literal text with bracketed variable markers such as `[D01]`, `[MNn,*-3]`
//! or `[H01]:[m01]`. `[[` and `]]` stand for literal brackets.

use super::call::{Args, one, opt};
use super::numberer::{EnglishNumberer, Numberer};
use crate::engine::iter::SequenceIter;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::XdmAtomicValue;
use crate::xdm::temporal::{CalendarValue, day_of_week, format_timezone, week_in_month, week_number};
use chrono::{Datelike, Timelike};
use rust_decimal::{Decimal, RoundingStrategy};

pub(super) fn call<N: XdmNode>(_ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let Some(value) = args.atomic(0)? else {
        return opt(None::<XdmAtomicValue>);
    };
    let Some(cal) = value.as_calendar() else {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("cannot format a value of type {} as a date or time", value.type_of()),
        ));
    };
    let picture = args.string(1)?;
    let language = args.opt_string(2)?;
    let calendar = args.opt_string(3)?;
    let mut out = String::new();
    if calendar.as_deref().is_some_and(|c| c != "AD" && c != "ISO") {
        out.push_str("[Calendar: AD]");
    }
    out.push_str(&format_date(&cal, &picture, language.as_deref())?);
    one(out)
}

fn numberer_for(_language: &str) -> &'static dyn Numberer {
    static ENGLISH: EnglishNumberer = EnglishNumberer;
    &ENGLISH
}

fn picture_error(msg: impl Into<String>) -> Error {
    Error::from_code(ErrorCode::XTDE1340, msg)
}

/// Format a date, time or dateTime. Languages other than English fall back to English and
/// the output is prefixed with `[Language: en]`.
pub fn format_date(value: &CalendarValue, picture: &str, language: Option<&str>) -> Result<String, Error> {
    let numberer = numberer_for(language.unwrap_or("en"));
    let mut out = String::new();
    if language.is_some_and(|l| !l.split('-').next().is_some_and(|p| p.eq_ignore_ascii_case("en"))) {
        out.push_str("[Language: en]");
    }
    let mut chars = picture.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            ']' => {
                if chars.next_if(|&(_, c)| c == ']').is_none() {
                    return Err(picture_error("closing ']' in date picture must be written as ']]'"));
                }
                out.push(']');
            }
            '[' if chars.next_if(|&(_, c)| c == '[').is_some() => out.push('['),
            '[' => {
                let rest = &picture[i + 1..];
                let Some(close) = rest.find(']') else {
                    return Err(picture_error("date format contains a '[' with no matching ']'"));
                };
                let marker: String = rest[..close].chars().filter(|c| !c.is_whitespace()).collect();
                out.push_str(&format_component(value, &marker, numberer)?);
                while chars.next_if(|&(j, _)| j <= i + 1 + close).is_some() {}
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

fn missing(component: char, value: &CalendarValue) -> Error {
    let what = match value {
        CalendarValue::Time(_) => "an xs:time value",
        CalendarValue::Date(_) => "an xs:date value",
        CalendarValue::DateTime(_) => "an xs:dateTime value",
    };
    Error::from_code(ErrorCode::XTDE1350, format!("{what} has no component corresponding to [{component}]"))
}

fn format_component(value: &CalendarValue, marker: &str, numberer: &dyn Numberer) -> Result<String, Error> {
    let mut chars = marker.chars();
    let component = match chars.next() {
        Some(c) if "YMDdWwFHhmsfZzPCE".contains(c) => c,
        _ => return Err(picture_error(format!("unrecognized date/time component [{marker}]"))),
    };
    let mut format = chars.as_str().to_string();
    let default_format = format.is_empty() || format.starts_with(',');
    if default_format {
        let implicit = match component {
            'F' => "Nn",
            'P' => "n",
            'C' | 'E' => "N",
            'm' | 's' => "01",
            _ => "1",
        };
        format.insert_str(0, implicit);
    }

    let has_date = !matches!(value, CalendarValue::Time(_));
    let has_time = !matches!(value, CalendarValue::Date(_));
    let needs_date = "YMDdWwFE".contains(component);
    let needs_time = "HhmsfP".contains(component);
    if (needs_date && !has_date) || (needs_time && !has_time) {
        return Err(missing(component, value));
    }

    let local = value.local();
    let date = local.date();
    let n: i64 = match component {
        'Y' => {
            let y = i64::from(date.year());
            if y <= 0 { 1 - y } else { y }
        }
        'M' => i64::from(date.month()),
        'D' => i64::from(date.day()),
        'd' => i64::from(date.ordinal()),
        'W' => i64::from(week_number(&date)),
        'w' => i64::from(week_in_month(&date)),
        'F' => i64::from(day_of_week(&date)),
        'H' => i64::from(local.hour()),
        'h' => match local.hour() {
            0 => 12,
            h if h > 12 => i64::from(h) - 12,
            h => i64::from(h),
        },
        'm' => i64::from(local.minute()),
        's' => i64::from(local.second()),
        'f' => i64::from(local.nanosecond() / 1_000),
        'P' => i64::from(local.hour() * 60 + local.minute()),
        'Z' => {
            let mut s = String::new();
            if let Some(tz) = value.timezone() {
                format_timezone(tz, &mut s);
            }
            return Ok(s);
        }
        'z' => return timezone_gmt(value.timezone(), &format),
        'C' => return Ok(numberer.calendar_name("AD")),
        _ => return Ok(numberer.era_name(date.year())),
    };
    format_number(component, n, &format, default_format, numberer)
}

/// `GMT+5`, `GMT+05:30`, or plain `GMT` for UTC. A minimum width of six or more keeps the
/// minutes.
fn timezone_gmt(tz: Option<i16>, format: &str) -> Result<String, Error> {
    let Some(tz) = tz else {
        return Ok(String::new());
    };
    let min = match format.find(',') {
        Some(comma) if comma > 0 => widths(&format[comma..])?.0,
        _ => 0,
    };
    let mut s = String::from("GMT");
    if tz == 0 {
        return Ok(s);
    }
    format_timezone(tz, &mut s);
    if min < 6 && tz % 60 == 0 {
        s.truncate(s.len() - 3);
    }
    if min < s.len() - 3 && s.as_bytes()[4] == b'0' {
        s.remove(4);
    }
    Ok(s)
}

/// `,min-max` where either bound may be `*`. An absent max is unbounded.
fn widths(spec: &str) -> Result<(usize, Option<usize>), Error> {
    let bad = || picture_error(format!("unrecognized width specifier '{spec}'"));
    let body = spec.strip_prefix(',').ok_or_else(bad)?;
    let (smin, smax) = match body.split_once('-') {
        Some((a, b)) => (a, Some(b)),
        None => (body, None),
    };
    let parse = |s: &str| -> Result<Option<usize>, Error> {
        match s {
            "*" => Ok(None),
            s if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s
                .parse::<usize>()
                .map(Some)
                .map_err(|_| picture_error("invalid integer used as width in date/time picture")),
            _ => Err(bad()),
        }
    };
    let min = parse(smin)?.unwrap_or(1);
    let max = match smax {
        Some(s) => parse(s)?,
        None => None,
    };
    if max.is_some_and(|m| min > m) {
        return Err(picture_error("minimum width in date/time picture exceeds maximum width"));
    }
    Ok((min, max))
}

fn format_number(
    component: char,
    value: i64,
    format: &str,
    default_format: bool,
    numberer: &dyn Numberer,
) -> Result<String, Error> {
    let (primary, width_spec) = match format.find(',') {
        Some(i) => (&format[..i], &format[i..]),
        None => (format, ""),
    };
    let (mut primary, traditional, ordinal) = if let Some(p) = primary.strip_suffix('t') {
        (p.to_string(), true, false)
    } else if let Some(p) = primary.strip_suffix('o') {
        (p.to_string(), false, true)
    } else {
        (primary.to_string(), false, false)
    };
    if !primary.chars().all(char::is_alphanumeric) {
        return Err(picture_error(format!("in format picture at '{primary}', primary format must be alphanumeric")));
    }

    let (mut min, mut max) = (1usize, None::<usize>);
    if width_spec.is_empty() {
        let len = primary.chars().count();
        if len > 1 && primary.bytes().all(|b| b.is_ascii_digit()) {
            (min, max) = (len, Some(len));
        }
    } else if primary != "I" && primary != "i" {
        (min, max) = widths(width_spec)?;
        if default_format && primary.ends_with('1') && min != primary.len() {
            primary = format!("{}1", "0".repeat(min.saturating_sub(1)));
        }
    }

    match component {
        'P' => {
            if !matches!(primary.as_str(), "N" | "n" | "Nn") {
                primary = "n".to_string();
            }
            max = max.or(Some(4));
        }
        'f' => return Ok(fractional_seconds(value, min, max)),
        _ => {}
    }

    if matches!(primary.as_str(), "N" | "n" | "Nn") {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let v = value as u32;
        let name = match component {
            'M' => Some(numberer.month_name(v, min, max)),
            'F' => Some(numberer.day_name(v, min, max)),
            'P' => Some(numberer.half_day_name(v, max)),
            _ => None,
        };
        match (name, primary.as_str()) {
            (Some(s), "N") => return Ok(s.to_uppercase()),
            (Some(s), "n") => return Ok(s.to_lowercase()),
            (Some(s), _) => return Ok(s),
            (None, _) => primary = "1".to_string(),
        }
    }

    let mut s = numberer.format(value, &primary, traditional, ordinal);
    let len = s.chars().count();
    if len < min {
        s.insert_str(0, &"0".repeat(min - len));
    }
    if component == 'Y' {
        if let Some(max) = max.filter(|m| *m < s.chars().count()) {
            let skip = s.chars().count() - max;
            s = s.chars().skip(skip).collect();
        }
    }
    Ok(s)
}

/// Microseconds as fraction digits: rounded half-even to `max` places, zero-padded on the
/// right to `min` and stripped of trailing zeros beyond it.
fn fractional_seconds(micros: i64, min: usize, max: Option<usize>) -> String {
    let mut s = if micros == 0 { "0".to_string() } else { format!("{micros:06}") };
    if let Some(max) = max.filter(|m| micros != 0 && s.len() > *m) {
        let places = u32::try_from(max).unwrap_or(u32::MAX);
        let rounded = Decimal::new(micros, 6).round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
        s = if rounded >= Decimal::ONE {
            String::new()
        } else {
            rounded.normalize().to_string().get(2..).unwrap_or_default().to_string()
        };
    }
    while s.len() < min {
        s.push('0');
    }
    while s.len() > min && s.ends_with('0') {
        s.pop();
    }
    s
}
