use super::call::{Args, one, opt};
use super::{ComponentOp, DateTimeOp};
use crate::engine::iter::SequenceIter;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::duration::{MICROS_PER_MINUTE, timezone_from_duration};
use crate::xdm::temporal::{CalendarValue, adjust_local, lexical_year};
use crate::xdm::{XdmAtomicValue, XdmDate, XdmDateTime, XdmTime};
use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_decimal::Decimal;

/// Accessors such as `year-from-date`, `seconds-from-duration` and `prefix-from-QName`.
pub(super) fn component<N: XdmNode>(op: ComponentOp, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let Some(value) = args.atomic(0)? else {
        return opt(None::<XdmAtomicValue>);
    };
    if let XdmAtomicValue::QName { ns_uri, prefix, local } = value {
        return match op {
            ComponentOp::LocalName => one(local),
            ComponentOp::Namespace => one(XdmAtomicValue::AnyUri(ns_uri.unwrap_or_default())),
            ComponentOp::Prefix => opt(prefix.filter(|p| !p.is_empty())),
            _ => Err(unsupported(op, "xs:QName")),
        };
    }
    if let Some(cal) = value.as_calendar() {
        return opt(calendar_component(op, &cal)?);
    }
    if let Some(d) = value.as_duration() {
        let v = match op {
            ComponentOp::Year | ComponentOp::YearAllowingZero => XdmAtomicValue::Integer(i64::from(d.years())),
            ComponentOp::Month => XdmAtomicValue::Integer(i64::from(d.month_part())),
            ComponentOp::Day => XdmAtomicValue::Integer(d.days()),
            ComponentOp::Hours => XdmAtomicValue::Integer(d.hours()),
            ComponentOp::Minutes => XdmAtomicValue::Integer(d.minutes()),
            ComponentOp::Seconds => XdmAtomicValue::Decimal(d.seconds()),
            ComponentOp::WholeSeconds => XdmAtomicValue::Integer((d.micros % MICROS_PER_MINUTE) / 1_000_000),
            ComponentOp::Microseconds => XdmAtomicValue::Integer(d.micros % 1_000_000),
            _ => return Err(unsupported(op, "xs:duration")),
        };
        return one(v);
    }
    Err(Error::from_code(
        ErrorCode::XPTY0004,
        format!("cannot extract a component from a value of type {}", value.type_of()),
    ))
}

fn unsupported(op: ComponentOp, type_name: &str) -> Error {
    Error::from_code(ErrorCode::XPTY0004, format!("component {op:?} is not available for {type_name}"))
}

/// A component of a date, time or dateTime. `None` for a timezone the value does not have.
pub(crate) fn calendar_component(op: ComponentOp, cal: &CalendarValue) -> Result<Option<XdmAtomicValue>, Error> {
    let local = cal.local();
    let has_date = !matches!(cal, CalendarValue::Time(_));
    let has_time = !matches!(cal, CalendarValue::Date(_));
    let v = match op {
        ComponentOp::Year if has_date => XdmAtomicValue::Integer(i64::from(lexical_year(local.year()))),
        ComponentOp::YearAllowingZero if has_date => XdmAtomicValue::Integer(i64::from(local.year())),
        ComponentOp::Month if has_date => XdmAtomicValue::Integer(i64::from(local.month())),
        ComponentOp::Day if has_date => XdmAtomicValue::Integer(i64::from(local.day())),
        ComponentOp::Hours if has_time => XdmAtomicValue::Integer(i64::from(local.hour())),
        ComponentOp::Minutes if has_time => XdmAtomicValue::Integer(i64::from(local.minute())),
        ComponentOp::Seconds if has_time => XdmAtomicValue::Decimal(seconds_with_fraction(&local)),
        ComponentOp::WholeSeconds if has_time => XdmAtomicValue::Integer(i64::from(local.second())),
        ComponentOp::Microseconds if has_time => XdmAtomicValue::Integer(i64::from(local.nanosecond() / 1_000)),
        ComponentOp::Timezone => {
            return Ok(cal.timezone().map(|tz| XdmAtomicValue::DayTimeDuration(i64::from(tz) * MICROS_PER_MINUTE)));
        }
        _ => return Err(unsupported(op, "this calendar type")),
    };
    Ok(Some(v))
}

fn seconds_with_fraction(local: &NaiveDateTime) -> Decimal {
    let micros = i64::from(local.second()) * 1_000_000 + i64::from(local.nanosecond() / 1_000);
    Decimal::new(micros, 6).normalize()
}

fn with_local(cal: &CalendarValue, local: NaiveDateTime, tz: Option<i16>) -> XdmAtomicValue {
    match cal {
        CalendarValue::DateTime(_) => XdmAtomicValue::DateTime(XdmDateTime { value: local, tz }),
        CalendarValue::Date(_) => XdmAtomicValue::Date(XdmDate { date: local.date(), tz }),
        CalendarValue::Time(_) => XdmAtomicValue::Time(XdmTime { time: local.time(), tz }),
    }
}

pub(super) fn call<N: XdmNode>(op: DateTimeOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let now = ctx.dyn_ctx.now;
    let now_tz = i16::try_from(now.offset().local_minus_utc() / 60).unwrap_or(0);
    match op {
        DateTimeOp::CurrentDateTime => one(XdmAtomicValue::DateTime(XdmDateTime { value: now.naive_local(), tz: Some(now_tz) })),
        DateTimeOp::CurrentDate => one(XdmAtomicValue::Date(XdmDate { date: now.date_naive(), tz: Some(now_tz) })),
        DateTimeOp::CurrentTime => one(XdmAtomicValue::Time(XdmTime { time: now.time(), tz: Some(now_tz) })),
        DateTimeOp::ImplicitTimezone => {
            one(XdmAtomicValue::DayTimeDuration(i64::from(ctx.implicit_timezone()) * MICROS_PER_MINUTE))
        }
        DateTimeOp::Adjust => {
            let Some(cal) = args.atomic(0)?.and_then(|v| v.as_calendar()) else {
                return opt(None::<XdmAtomicValue>);
            };
            let target = if args.has(1) {
                match args.atomic(1)? {
                    Some(XdmAtomicValue::DayTimeDuration(m)) => Some(timezone_from_duration(m)?),
                    Some(other) => {
                        return Err(Error::from_code(
                            ErrorCode::XPTY0004,
                            format!("timezone must be an xs:dayTimeDuration, found {}", other.type_of()),
                        ));
                    }
                    None => None,
                }
            } else {
                Some(ctx.implicit_timezone())
            };
            let (local, tz) = adjust_local(cal.local(), cal.timezone(), target);
            one(with_local(&cal, local, tz))
        }
        DateTimeOp::DateTimeConstructor => {
            let date = args.atomic(0)?;
            let time = args.atomic(1)?;
            let (Some(XdmAtomicValue::Date(d)), Some(XdmAtomicValue::Time(t))) = (date, time) else {
                return opt(None::<XdmAtomicValue>);
            };
            let tz = match (d.tz, t.tz) {
                (Some(a), Some(b)) if a != b => {
                    return Err(Error::from_code(
                        ErrorCode::FORG0008,
                        "the date and time arguments of dateTime() have different timezones",
                    ));
                }
                (a, b) => a.or(b),
            };
            one(XdmAtomicValue::DateTime(XdmDateTime { value: d.date.and_time(t.time), tz }))
        }
    }
}
