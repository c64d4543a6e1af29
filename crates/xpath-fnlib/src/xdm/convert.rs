//! The atomic cast table.
//!
//! `cast` converts between primitive types following the XPath 2.0 casting rules. Casting
//! a string to `xs:QName` needs in-scope namespaces and goes through [`cast_with_namespaces`].

use super::duration;
use super::numeric::{self, Numeric};
use super::temporal::{self, XdmDate, XdmDateTime, XdmTime};
use super::{AtomicType, XdmAtomicValue};
use crate::engine::runtime::{Error, ErrorCode};
use chrono::NaiveTime;
use rust_decimal::prelude::ToPrimitive;

fn not_castable(from: AtomicType, to: AtomicType) -> Error {
    Error::from_code(ErrorCode::XPTY0004, format!("cannot cast {from} to {to}"))
}

/// Collapse whitespace the way `xs:` lexical spaces do before parsing.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_alphabetic())
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}') || is_combining(c))
}

fn is_combining(c: char) -> bool {
    unicode_normalization::char::canonical_combining_class(c) != 0
}

/// Split a lexical QName into an optional prefix and a local part.
pub fn parse_lexical_qname(s: &str) -> Option<(Option<&str>, &str)> {
    match s.split_once(':') {
        Some((p, l)) if is_ncname(p) && is_ncname(l) => Some((Some(p), l)),
        None if is_ncname(s) => Some((None, s)),
        _ => None,
    }
}

pub fn cast(value: &XdmAtomicValue, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    cast_with_namespaces(value, target, &|_| None)
}

/// Cast with a prefix resolver for string to `xs:QName` conversions. The resolver maps a
/// prefix (empty for the default element namespace) to a namespace URI.
pub fn cast_with_namespaces(
    value: &XdmAtomicValue,
    target: AtomicType,
    resolve_prefix: &dyn Fn(&str) -> Option<String>,
) -> Result<XdmAtomicValue, Error> {
    let source = value.type_of();
    if source == target {
        return Ok(value.clone());
    }
    match target {
        AtomicType::String => return Ok(XdmAtomicValue::String(value.string_value())),
        AtomicType::UntypedAtomic => return Ok(XdmAtomicValue::UntypedAtomic(value.string_value())),
        AtomicType::AnyAtomic | AtomicType::Numeric => return Err(not_castable(source, target)),
        _ => {}
    }
    if let XdmAtomicValue::String(s) | XdmAtomicValue::UntypedAtomic(s) = value {
        return cast_from_string(s, target, resolve_prefix);
    }
    if let Some(n) = value.as_numeric() {
        return cast_numeric(n, target).ok_or_else(|| not_castable(source, target))?;
    }
    match (value, target) {
        (XdmAtomicValue::Boolean(b), t) if t.is_primitive_numeric() => {
            cast_numeric(Numeric::Integer(i64::from(*b)), t).ok_or_else(|| not_castable(source, target))?
        }
        (v, AtomicType::Duration) if v.as_duration().is_some() => {
            Ok(XdmAtomicValue::Duration(v.as_duration().unwrap_or_default()))
        }
        (v, AtomicType::DayTimeDuration) if v.as_duration().is_some() => {
            Ok(XdmAtomicValue::DayTimeDuration(v.as_duration().unwrap_or_default().micros))
        }
        (v, AtomicType::YearMonthDuration) if v.as_duration().is_some() => {
            Ok(XdmAtomicValue::YearMonthDuration(v.as_duration().unwrap_or_default().months))
        }
        (XdmAtomicValue::DateTime(dt), AtomicType::Date) => {
            Ok(XdmAtomicValue::Date(XdmDate { date: dt.value.date(), tz: dt.tz }))
        }
        (XdmAtomicValue::DateTime(dt), AtomicType::Time) => {
            Ok(XdmAtomicValue::Time(XdmTime { time: dt.value.time(), tz: dt.tz }))
        }
        (XdmAtomicValue::Date(d), AtomicType::DateTime) => {
            Ok(XdmAtomicValue::DateTime(XdmDateTime { value: d.date.and_time(NaiveTime::MIN), tz: d.tz }))
        }
        _ => Err(not_castable(source, target)),
    }
}

fn cast_numeric(n: Numeric, target: AtomicType) -> Option<Result<XdmAtomicValue, Error>> {
    let out = match target {
        AtomicType::Boolean => Ok(XdmAtomicValue::Boolean(!(n.is_nan() || n.to_f64() == 0.0))),
        AtomicType::Double => Ok(XdmAtomicValue::Double(n.to_f64())),
        AtomicType::Float => Ok(XdmAtomicValue::Float(n.to_f64() as f32)),
        AtomicType::Decimal => n.to_decimal().map(XdmAtomicValue::Decimal),
        AtomicType::Integer => n.to_decimal().and_then(|d| {
            d.trunc()
                .to_i64()
                .map(XdmAtomicValue::Integer)
                .ok_or_else(|| Error::from_code(ErrorCode::FOAR0002, "value out of range for xs:integer"))
        }),
        _ => return None,
    };
    Some(out)
}

fn cast_from_string(
    raw: &str,
    target: AtomicType,
    resolve_prefix: &dyn Fn(&str) -> Option<String>,
) -> Result<XdmAtomicValue, Error> {
    let s = collapse_whitespace(raw);
    Ok(match target {
        AtomicType::AnyUri => XdmAtomicValue::AnyUri(s),
        AtomicType::Boolean => match s.as_str() {
            "true" | "1" => XdmAtomicValue::Boolean(true),
            "false" | "0" => XdmAtomicValue::Boolean(false),
            _ => {
                return Err(Error::from_code(
                    ErrorCode::FORG0001,
                    format!("invalid lexical form for xs:boolean: '{raw}'"),
                ));
            }
        },
        AtomicType::Integer => XdmAtomicValue::Integer(numeric::parse_integer(&s)?),
        AtomicType::Decimal => XdmAtomicValue::Decimal(numeric::parse_decimal(&s)?),
        AtomicType::Double => XdmAtomicValue::Double(numeric::parse_double(&s)?),
        AtomicType::Float => XdmAtomicValue::Float(numeric::parse_float(&s)?),
        AtomicType::Duration => XdmAtomicValue::Duration(duration::parse_duration(&s)?),
        AtomicType::DayTimeDuration => XdmAtomicValue::DayTimeDuration(duration::parse_day_time_duration(&s)?),
        AtomicType::YearMonthDuration => {
            XdmAtomicValue::YearMonthDuration(duration::parse_year_month_duration(&s)?)
        }
        AtomicType::DateTime => XdmAtomicValue::DateTime(temporal::parse_date_time(&s)?),
        AtomicType::Date => XdmAtomicValue::Date(temporal::parse_date(&s)?),
        AtomicType::Time => XdmAtomicValue::Time(temporal::parse_time(&s)?),
        AtomicType::QName => {
            let (prefix, local) = parse_lexical_qname(&s).ok_or_else(|| {
                Error::from_code(ErrorCode::FORG0001, format!("invalid lexical form for xs:QName: '{raw}'"))
            })?;
            let ns = match prefix {
                Some(p) => Some(resolve_prefix(p).ok_or_else(|| {
                    Error::from_code(ErrorCode::FONS0004, format!("no namespace bound to prefix '{p}'"))
                })?),
                None => resolve_prefix(""),
            };
            XdmAtomicValue::qname(ns.as_deref(), prefix, local)
        }
        AtomicType::String | AtomicType::UntypedAtomic | AtomicType::AnyAtomic | AtomicType::Numeric => {
            return Err(not_castable(AtomicType::String, target));
        }
    })
}

/// Whether `value` could be cast to `target`, without raising.
pub fn is_castable(value: &XdmAtomicValue, target: AtomicType) -> bool {
    cast(value, target).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn string_casts_collapse_whitespace() {
        let v = cast(&XdmAtomicValue::String("  12 ".into()), AtomicType::Integer).unwrap();
        assert_eq!(v, XdmAtomicValue::Integer(12));
        let b = cast(&XdmAtomicValue::UntypedAtomic("0".into()), AtomicType::Boolean).unwrap();
        assert_eq!(b, XdmAtomicValue::Boolean(false));
    }

    #[test]
    fn double_to_integer_truncates_and_rejects_nan() {
        let v = cast(&XdmAtomicValue::Double(-2.7), AtomicType::Integer).unwrap();
        assert_eq!(v, XdmAtomicValue::Integer(-2));
        let err = cast(&XdmAtomicValue::Double(f64::NAN), AtomicType::Integer).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FOCA0002);
        let d = cast(&XdmAtomicValue::Integer(3), AtomicType::Decimal).unwrap();
        assert_eq!(d, XdmAtomicValue::Decimal(Decimal::from(3)));
    }

    #[test]
    fn date_and_duration_casts() {
        let dt = cast(&XdmAtomicValue::String("2002-03-07T10:00:00Z".into()), AtomicType::DateTime).unwrap();
        let d = cast(&dt, AtomicType::Date).unwrap();
        assert_eq!(d.string_value(), "2002-03-07Z");
        let dur = cast(&XdmAtomicValue::String("P1Y2DT3H".into()), AtomicType::Duration).unwrap();
        let ym = cast(&dur, AtomicType::YearMonthDuration).unwrap();
        assert_eq!(ym.string_value(), "P1Y");
        let err = cast(&d, AtomicType::Time).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    }

    #[test]
    fn qname_needs_bound_prefix() {
        let resolve = |p: &str| (p == "a").then(|| "urn:a".to_string());
        let q = cast_with_namespaces(&XdmAtomicValue::String("a:b".into()), AtomicType::QName, &resolve).unwrap();
        assert_eq!(q, XdmAtomicValue::qname(Some("urn:a"), Some("a"), "b"));
        let err = cast_with_namespaces(&XdmAtomicValue::String("z:b".into()), AtomicType::QName, &resolve)
            .unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FONS0004);
    }
}
