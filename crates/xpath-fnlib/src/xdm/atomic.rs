use super::duration::{XdmDuration, format_day_time, format_year_month};
use super::numeric::{Numeric, format_decimal, format_double, format_float};
use super::temporal::{CalendarValue, XdmDate, XdmDateTime, XdmTime};
use super::types::AtomicType;
use core::fmt;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum XdmAtomicValue {
    Boolean(bool),
    String(String),
    AnyUri(String),
    UntypedAtomic(String),
    Integer(i64),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
    QName {
        ns_uri: Option<String>,
        prefix: Option<String>,
        local: String,
    },
    Duration(XdmDuration),
    /// Total microseconds.
    DayTimeDuration(i64),
    /// Total months.
    YearMonthDuration(i32),
    DateTime(XdmDateTime),
    Date(XdmDate),
    Time(XdmTime),
}

impl XdmAtomicValue {
    pub fn type_of(&self) -> AtomicType {
        match self {
            XdmAtomicValue::Boolean(_) => AtomicType::Boolean,
            XdmAtomicValue::String(_) => AtomicType::String,
            XdmAtomicValue::AnyUri(_) => AtomicType::AnyUri,
            XdmAtomicValue::UntypedAtomic(_) => AtomicType::UntypedAtomic,
            XdmAtomicValue::Integer(_) => AtomicType::Integer,
            XdmAtomicValue::Decimal(_) => AtomicType::Decimal,
            XdmAtomicValue::Float(_) => AtomicType::Float,
            XdmAtomicValue::Double(_) => AtomicType::Double,
            XdmAtomicValue::QName { .. } => AtomicType::QName,
            XdmAtomicValue::Duration(_) => AtomicType::Duration,
            XdmAtomicValue::DayTimeDuration(_) => AtomicType::DayTimeDuration,
            XdmAtomicValue::YearMonthDuration(_) => AtomicType::YearMonthDuration,
            XdmAtomicValue::DateTime(_) => AtomicType::DateTime,
            XdmAtomicValue::Date(_) => AtomicType::Date,
            XdmAtomicValue::Time(_) => AtomicType::Time,
        }
    }

    pub fn primitive_type(&self) -> AtomicType {
        self.type_of().primitive()
    }

    /// The value's canonical lexical representation (its `fn:string` value).
    pub fn string_value(&self) -> String {
        match self {
            XdmAtomicValue::Boolean(b) => b.to_string(),
            XdmAtomicValue::String(s) | XdmAtomicValue::AnyUri(s) | XdmAtomicValue::UntypedAtomic(s) => s.clone(),
            XdmAtomicValue::Integer(i) => i.to_string(),
            XdmAtomicValue::Decimal(d) => format_decimal(*d),
            XdmAtomicValue::Float(f) => format_float(*f),
            XdmAtomicValue::Double(d) => format_double(*d),
            XdmAtomicValue::QName { prefix: Some(p), local, .. } if !p.is_empty() => format!("{p}:{local}"),
            XdmAtomicValue::QName { local, .. } => local.clone(),
            XdmAtomicValue::Duration(d) => d.canonical(),
            XdmAtomicValue::DayTimeDuration(m) => format_day_time(*m),
            XdmAtomicValue::YearMonthDuration(m) => format_year_month(*m),
            XdmAtomicValue::DateTime(v) => v.canonical(),
            XdmAtomicValue::Date(v) => v.canonical(),
            XdmAtomicValue::Time(v) => v.canonical(),
        }
    }

    pub fn as_numeric(&self) -> Option<Numeric> {
        Some(match *self {
            XdmAtomicValue::Integer(i) => Numeric::Integer(i),
            XdmAtomicValue::Decimal(d) => Numeric::Decimal(d),
            XdmAtomicValue::Float(f) => Numeric::Float(f),
            XdmAtomicValue::Double(d) => Numeric::Double(d),
            _ => return None,
        })
    }

    pub fn as_calendar(&self) -> Option<CalendarValue> {
        Some(match *self {
            XdmAtomicValue::DateTime(v) => CalendarValue::DateTime(v),
            XdmAtomicValue::Date(v) => CalendarValue::Date(v),
            XdmAtomicValue::Time(v) => CalendarValue::Time(v),
            _ => return None,
        })
    }

    /// Duration view of any of the three duration types.
    pub fn as_duration(&self) -> Option<XdmDuration> {
        Some(match *self {
            XdmAtomicValue::Duration(d) => d,
            XdmAtomicValue::DayTimeDuration(m) => XdmDuration { months: 0, micros: m },
            XdmAtomicValue::YearMonthDuration(m) => XdmDuration { months: m, micros: 0 },
            _ => return None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            XdmAtomicValue::String(s) | XdmAtomicValue::AnyUri(s) | XdmAtomicValue::UntypedAtomic(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.as_numeric().is_some_and(|n| n.is_nan())
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, XdmAtomicValue::UntypedAtomic(_))
    }

    pub fn qname(ns_uri: Option<&str>, prefix: Option<&str>, local: impl Into<String>) -> Self {
        XdmAtomicValue::QName {
            ns_uri: ns_uri.filter(|u| !u.is_empty()).map(str::to_string),
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            local: local.into(),
        }
    }
}

impl From<Numeric> for XdmAtomicValue {
    fn from(n: Numeric) -> Self {
        match n {
            Numeric::Integer(i) => XdmAtomicValue::Integer(i),
            Numeric::Decimal(d) => XdmAtomicValue::Decimal(d),
            Numeric::Float(f) => XdmAtomicValue::Float(f),
            Numeric::Double(d) => XdmAtomicValue::Double(d),
        }
    }
}

impl From<CalendarValue> for XdmAtomicValue {
    fn from(c: CalendarValue) -> Self {
        match c {
            CalendarValue::DateTime(v) => XdmAtomicValue::DateTime(v),
            CalendarValue::Date(v) => XdmAtomicValue::Date(v),
            CalendarValue::Time(v) => XdmAtomicValue::Time(v),
        }
    }
}

impl From<bool> for XdmAtomicValue {
    fn from(b: bool) -> Self {
        XdmAtomicValue::Boolean(b)
    }
}

impl From<i64> for XdmAtomicValue {
    fn from(i: i64) -> Self {
        XdmAtomicValue::Integer(i)
    }
}

impl From<f64> for XdmAtomicValue {
    fn from(d: f64) -> Self {
        XdmAtomicValue::Double(d)
    }
}

impl From<&str> for XdmAtomicValue {
    fn from(s: &str) -> Self {
        XdmAtomicValue::String(s.to_string())
    }
}

impl From<String> for XdmAtomicValue {
    fn from(s: String) -> Self {
        XdmAtomicValue::String(s)
    }
}

impl fmt::Display for XdmAtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_value())
    }
}
