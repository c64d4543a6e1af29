//! Atomic value comparison under a collation.
//!
//! [`GenericAtomicComparer`] is used by every function that compares atomic values:
//! `distinct-values`, `index-of`, `min`/`max`, `deep-equal`, `compare` and the key index.
//! Equality and ordering are separate operations because several types (`xs:QName`,
//! `xs:duration`) support only the former. [`ComparisonKey`] is the hashable bucket used for
//! deduplication: two values that are `equals` always share a key, but values sharing a key
//! must still be checked with `equals`.

use crate::engine::collation::{Collation, CollationRegistry};
use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::{AtomicType, Numeric, XdmAtomicValue};
use chrono::NaiveDateTime;
use core::cmp::Ordering;
use std::sync::Arc;

pub trait AtomicComparer: Send + Sync {
    /// Ordering comparison. Incomparable values give `err:XPTY0004`.
    fn compare(&self, a: &XdmAtomicValue, b: &XdmAtomicValue) -> Result<Ordering, Error>;
    /// Value equality. NaN is never equal to anything.
    fn equals(&self, a: &XdmAtomicValue, b: &XdmAtomicValue) -> Result<bool, Error>;
}

#[derive(Clone)]
pub struct GenericAtomicComparer {
    collation: Arc<dyn Collation>,
    implicit_timezone: i16,
}

impl core::fmt::Debug for GenericAtomicComparer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GenericAtomicComparer")
            .field("collation", &self.collation.uri())
            .field("implicit_timezone", &self.implicit_timezone)
            .finish()
    }
}

fn incomparable(a: &XdmAtomicValue, b: &XdmAtomicValue) -> Error {
    Error::from_code(
        ErrorCode::XPTY0004,
        format!("cannot compare {} with {}", a.type_of(), b.type_of()),
    )
}

impl GenericAtomicComparer {
    pub fn new(collation: Arc<dyn Collation>, implicit_timezone: i16) -> Self {
        Self { collation, implicit_timezone }
    }

    /// Codepoint comparer with UTC as implicit timezone.
    pub fn codepoint() -> Self {
        Self::new(CollationRegistry::codepoint(), 0)
    }

    pub fn collation(&self) -> &Arc<dyn Collation> {
        &self.collation
    }

    pub fn implicit_timezone(&self) -> i16 {
        self.implicit_timezone
    }

    /// Hash bucket: values that compare equal under `equals` get equal keys. NaN gets a
    /// key of its own so that `distinct-values` keeps a single NaN.
    pub fn comparison_key(&self, v: &XdmAtomicValue) -> ComparisonKey {
        if let Some(n) = v.as_numeric() {
            return numeric_key(n);
        }
        if let Some(c) = v.as_calendar() {
            let utc = c.to_utc(self.implicit_timezone);
            return match v.type_of() {
                AtomicType::Date => ComparisonKey::Date(utc),
                AtomicType::Time => ComparisonKey::Time(utc),
                _ => ComparisonKey::DateTime(utc),
            };
        }
        if let Some(d) = v.as_duration() {
            return ComparisonKey::Duration { months: d.months, micros: d.micros };
        }
        match v {
            XdmAtomicValue::Boolean(b) => ComparisonKey::Boolean(*b),
            XdmAtomicValue::QName { ns_uri, local, .. } => {
                ComparisonKey::QName { ns_uri: ns_uri.clone(), local: local.clone() }
            }
            other => ComparisonKey::String(self.collation.key(&other.string_value())),
        }
    }
}

/// Numbers are bucketed by their value narrowed to `xs:float`, the narrowest type `equals`
/// ever promotes a pair to. Any two numbers equal after promotion narrow to the same float.
fn numeric_key(n: Numeric) -> ComparisonKey {
    if n.is_nan() {
        return ComparisonKey::NaN;
    }
    #[allow(clippy::cast_possible_truncation)]
    let narrowed = n.to_f64() as f32;
    // Adding zero folds -0.0 into 0.0.
    ComparisonKey::Numeric((narrowed + 0.0).to_bits())
}

impl AtomicComparer for GenericAtomicComparer {
    fn compare(&self, a: &XdmAtomicValue, b: &XdmAtomicValue) -> Result<Ordering, Error> {
        let (ta, tb) = (a.type_of(), b.type_of());
        if ta.is_string_like() && tb.is_string_like() {
            return Ok(self.collation.compare(&a.string_value(), &b.string_value()));
        }
        if let (Some(x), Some(y)) = (a.as_numeric(), b.as_numeric()) {
            return Ok(match (x.is_nan(), y.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => Numeric::compare(x, y).unwrap_or(Ordering::Equal),
            });
        }
        match (a, b) {
            (XdmAtomicValue::Boolean(x), XdmAtomicValue::Boolean(y)) => Ok(x.cmp(y)),
            (XdmAtomicValue::DayTimeDuration(x), XdmAtomicValue::DayTimeDuration(y)) => Ok(x.cmp(y)),
            (XdmAtomicValue::YearMonthDuration(x), XdmAtomicValue::YearMonthDuration(y)) => Ok(x.cmp(y)),
            _ => match (a.as_calendar(), b.as_calendar()) {
                (Some(x), Some(y)) => x.compare(&y, self.implicit_timezone).ok_or_else(|| incomparable(a, b)),
                _ => Err(incomparable(a, b)),
            },
        }
    }

    fn equals(&self, a: &XdmAtomicValue, b: &XdmAtomicValue) -> Result<bool, Error> {
        let (ta, tb) = (a.type_of(), b.type_of());
        if ta.is_string_like() && tb.is_string_like() {
            return Ok(self.collation.compares_equal(&a.string_value(), &b.string_value()));
        }
        if let (Some(x), Some(y)) = (a.as_numeric(), b.as_numeric()) {
            return Ok(Numeric::compare(x, y) == Some(Ordering::Equal));
        }
        if let (Some(x), Some(y)) = (a.as_duration(), b.as_duration()) {
            return Ok(x == y);
        }
        match (a, b) {
            (
                XdmAtomicValue::QName { ns_uri: n1, local: l1, .. },
                XdmAtomicValue::QName { ns_uri: n2, local: l2, .. },
            ) => Ok(n1 == n2 && l1 == l2),
            _ => Ok(self.compare(a, b)? == Ordering::Equal),
        }
    }
}

/// Reverses the ordering of another comparer; `max` is `min` under this comparer.
pub struct DescendingComparer<C>(pub C);

impl<C: AtomicComparer> AtomicComparer for DescendingComparer<C> {
    fn compare(&self, a: &XdmAtomicValue, b: &XdmAtomicValue) -> Result<Ordering, Error> {
        Ok(self.0.compare(a, b)?.reverse())
    }
    fn equals(&self, a: &XdmAtomicValue, b: &XdmAtomicValue) -> Result<bool, Error> {
        self.0.equals(a, b)
    }
}

/// Run a comparison, turning "incomparable" type errors into `false`. Every other error
/// still propagates.
pub fn mask_incomparable(result: Result<bool, Error>) -> Result<bool, Error> {
    match result {
        Err(e) if e.code_enum() == ErrorCode::XPTY0004 => Ok(false),
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComparisonKey {
    NaN,
    /// Bit pattern of the value narrowed to `f32`.
    Numeric(u32),
    String(String),
    Boolean(bool),
    Duration { months: i32, micros: i64 },
    DateTime(NaiveDateTime),
    Date(NaiveDateTime),
    Time(NaiveDateTime),
    QName { ns_uri: Option<String>, local: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collation::SimpleCaseCollation;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn numeric_keys_unify_types() {
        let c = GenericAtomicComparer::codepoint();
        let k1 = c.comparison_key(&XdmAtomicValue::Integer(1));
        let k2 = c.comparison_key(&XdmAtomicValue::Double(1.0));
        let k3 = c.comparison_key(&XdmAtomicValue::Decimal(Decimal::new(100, 2)));
        assert_eq!(k1, k2);
        assert_eq!(k2, k3);
        assert_eq!(c.comparison_key(&XdmAtomicValue::Float(f32::NAN)), ComparisonKey::NaN);
        assert_ne!(
            c.comparison_key(&XdmAtomicValue::Double(f64::INFINITY)),
            c.comparison_key(&XdmAtomicValue::Double(f64::NEG_INFINITY))
        );
    }

    #[test]
    fn float_and_decimal_that_are_equal_share_a_key() {
        let c = GenericAtomicComparer::codepoint();
        let float = XdmAtomicValue::Float(0.1);
        let decimal = XdmAtomicValue::Decimal(Decimal::from_str("0.1").unwrap());
        assert!(c.equals(&float, &decimal).unwrap());
        assert_eq!(c.comparison_key(&float), c.comparison_key(&decimal));
        assert_eq!(c.comparison_key(&XdmAtomicValue::Double(-0.0)), c.comparison_key(&XdmAtomicValue::Integer(0)));
    }

    #[test]
    fn nan_sorts_first_but_never_equals() {
        let c = GenericAtomicComparer::codepoint();
        let nan = XdmAtomicValue::Double(f64::NAN);
        let one = XdmAtomicValue::Integer(1);
        assert_eq!(c.compare(&nan, &one).unwrap(), Ordering::Less);
        assert!(!c.equals(&nan, &nan).unwrap());
    }

    #[test]
    fn string_and_number_are_incomparable() {
        let c = GenericAtomicComparer::codepoint();
        let err = c.compare(&XdmAtomicValue::from("1"), &XdmAtomicValue::Integer(1)).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
        assert!(!mask_incomparable(c.equals(&"1".into(), &XdmAtomicValue::Integer(1))).unwrap());
    }

    #[test]
    fn durations_equal_across_subtypes_but_only_order_within() {
        let c = GenericAtomicComparer::codepoint();
        let ym = XdmAtomicValue::YearMonthDuration(12);
        let d = XdmAtomicValue::Duration(crate::xdm::XdmDuration { months: 12, micros: 0 });
        assert!(c.equals(&ym, &d).unwrap());
        assert!(c.compare(&ym, &d).is_err());
        assert_eq!(c.comparison_key(&ym), c.comparison_key(&d));
    }

    #[test]
    fn collation_keys_follow_collation() {
        let c = GenericAtomicComparer::new(Arc::new(SimpleCaseCollation), 0);
        assert_eq!(c.comparison_key(&"ABC".into()), c.comparison_key(&"abc".into()));
        let desc = DescendingComparer(c);
        assert_eq!(desc.compare(&"a".into(), &"b".into()).unwrap(), Ordering::Greater);
    }
}
