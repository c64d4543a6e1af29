use super::MinimaxOp;
use super::call::{Args, opt};
use super::collating::collation_for;
use crate::engine::collation::Collation;
use crate::engine::comparer::{AtomicComparer, DescendingComparer};
use crate::engine::iter::{SequenceIter, SequenceIterator};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::convert::cast;
use crate::xdm::{AtomicType, XdmAtomicValue, XdmItem};
use core::cmp::Ordering;
use std::sync::Arc;

pub(super) fn call<N: XdmNode>(
    op: MinimaxOp,
    collation: Option<&Arc<dyn Collation>>,
    ctx: &CallCtx<N>,
    mut args: Args<N>,
) -> Result<SequenceIter<N>, Error> {
    let collation = collation_for(collation, ctx, &mut args, 1)?;
    let comparer = ctx.comparer(collation);
    let mut seq = args.take(0);
    let result = match op {
        MinimaxOp::Min => minimax(seq.as_mut(), &comparer)?,
        MinimaxOp::Max => minimax(seq.as_mut(), &DescendingComparer(comparer))?,
    };
    opt(result)
}

fn not_ordered(t: AtomicType) -> Error {
    Error::from_code(ErrorCode::FORG0006, format!("type {t} is not an ordered type"))
}

fn numeric_rank(t: AtomicType) -> Option<u8> {
    match t {
        AtomicType::Integer => Some(0),
        AtomicType::Decimal => Some(1),
        AtomicType::Float => Some(2),
        AtomicType::Double => Some(3),
        _ => None,
    }
}

/// Common type of two values seen by min/max; only numeric types widen.
fn common_type(a: AtomicType, b: AtomicType) -> AtomicType {
    match (numeric_rank(a), numeric_rank(b)) {
        (Some(x), Some(y)) if y > x => b,
        _ => a,
    }
}

fn next_value<N: XdmNode>(seq: &mut dyn SequenceIterator<N>) -> Result<Option<XdmAtomicValue>, Error> {
    Ok(match seq.next_item()? {
        Some(XdmItem::Atomic(a)) => Some(a),
        Some(XdmItem::Node(n)) => n.typed_value().into_iter().next(),
        None => None,
    })
}

/// The least value of `seq` under `comparer`; `max` passes a [`DescendingComparer`].
///
/// A double NaN makes the result NaN as soon as it is seen. A float NaN is remembered
/// until the end, since a later double promotes the whole result to `xs:double`; values
/// after it are still type-checked against it. Untyped values are read as doubles.
pub(crate) fn minimax<N: XdmNode>(
    seq: &mut dyn SequenceIterator<N>,
    comparer: &dyn AtomicComparer,
) -> Result<Option<XdmAtomicValue>, Error> {
    let mut found_double = false;
    let mut found_float = false;
    let mut found_nan = false;

    let mut min = loop {
        let Some(v) = next_value(seq)? else {
            return Ok(None);
        };
        let v = if v.is_untyped() {
            found_double = true;
            cast(&v, AtomicType::Double)?
        } else {
            match v {
                XdmAtomicValue::Double(_) => found_double = true,
                XdmAtomicValue::Float(_) => found_float = true,
                _ => {}
            }
            v
        };
        if v.is_nan() {
            if matches!(v, XdmAtomicValue::Double(_)) {
                return Ok(Some(v));
            }
            found_nan = true;
            break XdmAtomicValue::Float(f32::NAN);
        }
        if !v.type_of().is_ordered() {
            return Err(not_ordered(v.type_of()));
        }
        break v;
    };

    let mut common = min.type_of();
    while let Some(test) = next_value(seq)? {
        let test = if test.is_untyped() {
            let d = cast(&test, AtomicType::Double)?;
            if found_nan {
                return Ok(Some(XdmAtomicValue::Double(f64::NAN)));
            }
            found_double = true;
            d
        } else {
            match test {
                XdmAtomicValue::Double(_) => {
                    if found_nan {
                        return Ok(Some(XdmAtomicValue::Double(f64::NAN)));
                    }
                    found_double = true;
                }
                XdmAtomicValue::Float(_) => found_float = true,
                _ => {}
            }
            test
        };
        if !test.type_of().is_ordered() {
            return Err(not_ordered(test.type_of()));
        }
        common = common_type(common, test.type_of());
        if test.is_nan() {
            if found_double {
                return Ok(Some(XdmAtomicValue::Double(f64::NAN)));
            }
            found_nan = true;
            continue;
        }
        let ordering = comparer.compare(&test, &min).map_err(|_| {
            Error::from_code(
                ErrorCode::FORG0006,
                format!("cannot compare {} with {}", min.type_of(), test.type_of()),
            )
        })?;
        if ordering == Ordering::Less {
            min = test;
        }
    }

    if found_nan {
        return Ok(Some(XdmAtomicValue::Float(f32::NAN)));
    }
    let target = if found_double {
        AtomicType::Double
    } else if found_float {
        AtomicType::Float
    } else {
        common
    };
    if min.type_of() == target || numeric_rank(target).is_none() {
        return Ok(Some(min));
    }
    cast(&min, target).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::comparer::GenericAtomicComparer;
    use crate::engine::iter;
    use crate::simple_node::SimpleNode;
    use rust_decimal::Decimal;

    fn run(values: Vec<XdmAtomicValue>, max: bool) -> Result<Option<XdmAtomicValue>, Error> {
        let mut seq = iter::from_vec::<SimpleNode>(values.into_iter().map(XdmItem::Atomic).collect());
        if max {
            minimax(seq.as_mut(), &DescendingComparer(GenericAtomicComparer::codepoint()))
        } else {
            minimax(seq.as_mut(), &GenericAtomicComparer::codepoint())
        }
    }

    #[test]
    fn double_nan_wins() {
        let r = run(vec![1i64.into(), 2i64.into(), XdmAtomicValue::Double(f64::NAN)], true).unwrap().unwrap();
        assert!(r.is_nan());
        assert!(matches!(r, XdmAtomicValue::Double(_)));
    }

    #[test]
    fn float_nan_promotes_to_double_when_a_double_follows() {
        let r = run(vec![XdmAtomicValue::Float(f32::NAN), XdmAtomicValue::Double(1.0)], false).unwrap().unwrap();
        assert!(matches!(r, XdmAtomicValue::Double(d) if d.is_nan()));
        let r = run(vec![XdmAtomicValue::Float(f32::NAN), 3i64.into()], false).unwrap().unwrap();
        assert!(matches!(r, XdmAtomicValue::Float(f) if f.is_nan()));
    }

    #[test]
    fn values_after_a_float_nan_are_still_checked() {
        let r = run(vec![XdmAtomicValue::Float(f32::NAN), 3i64.into(), 1i64.into()], true).unwrap().unwrap();
        assert!(matches!(r, XdmAtomicValue::Float(f) if f.is_nan()));
        let err = run(vec![XdmAtomicValue::Float(f32::NAN), "a".into()], false).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FORG0006);
        let err = run(vec![XdmAtomicValue::Float(f32::NAN), XdmAtomicValue::qname(None, None, "q")], false).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FORG0006);
    }

    #[test]
    fn result_takes_widest_numeric_type() {
        let r = run(vec![1i64.into(), XdmAtomicValue::Decimal(Decimal::new(25, 1))], false).unwrap();
        assert_eq!(r, Some(XdmAtomicValue::Decimal(Decimal::ONE)));
        let r = run(vec!["b".into(), "a".into(), "c".into()], true).unwrap();
        assert_eq!(r, Some(XdmAtomicValue::String("c".into())));
    }

    #[test]
    fn unordered_types_are_rejected() {
        let q = XdmAtomicValue::qname(None, None, "a");
        assert_eq!(run(vec![q], false).unwrap_err().code_enum(), ErrorCode::FORG0006);
        let err = run(vec![1i64.into(), "a".into()], false).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FORG0006);
    }
}
