use super::AggregateOp;
use super::call::{Args, one, opt};
use crate::engine::iter::{self, SequenceIter};
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::convert::cast;
use crate::xdm::{AtomicType, Numeric, XdmAtomicValue, XdmItem};

pub(super) fn call<N: XdmNode>(op: AggregateOp, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        AggregateOp::Count => {
            let mut seq = args.take(0);
            let n = iter::count(seq.as_mut())?;
            one(i64::try_from(n).unwrap_or(i64::MAX))
        }
        AggregateOp::Sum => {
            let mut seq = args.take(0);
            match total(seq.as_mut(), "sum")? {
                Some(Total { value, .. }) => one(value),
                None if args.has(1) => opt(args.atomic(1)?),
                None => one(0i64),
            }
        }
        AggregateOp::Avg => {
            let mut seq = args.take(0);
            opt(average(seq.as_mut())?)
        }
    }
}

fn bad_mix(function: &str, detail: &str) -> Error {
    Error::from_code(ErrorCode::FORG0006, format!("input to {function}() contains {detail}"))
}

fn next_atomic<N: XdmNode>(seq: &mut dyn iter::SequenceIterator<N>) -> Result<Option<XdmAtomicValue>, Error> {
    Ok(match seq.next_item()? {
        Some(XdmItem::Atomic(a)) => Some(a),
        Some(XdmItem::Node(n)) => n.typed_value().into_iter().next(),
        None => None,
    })
}

/// Untyped values count as `xs:double` in aggregates.
fn promote_untyped(v: XdmAtomicValue) -> Result<XdmAtomicValue, Error> {
    if v.is_untyped() { cast(&v, AtomicType::Double) } else { Ok(v) }
}

#[derive(Debug)]
struct Total {
    value: XdmAtomicValue,
    count: usize,
}

/// Running sum shared by `sum` and `avg`. `None` for an empty input.
///
/// The first value decides the mode: numeric, dayTimeDuration or yearMonthDuration. Any
/// value that does not fit the mode is `err:FORG0006`. A double NaN ends the scan early.
fn total<N: XdmNode>(seq: &mut dyn iter::SequenceIterator<N>, function: &str) -> Result<Option<Total>, Error> {
    let Some(first) = next_atomic(seq)? else {
        return Ok(None);
    };
    let first = promote_untyped(first)?;
    let mut count = 1usize;
    match first {
        ref v if v.as_numeric().is_some() => {
            let mut sum = v.as_numeric().unwrap_or(Numeric::Integer(0));
            while let Some(next) = next_atomic(seq)? {
                count += 1;
                let next = promote_untyped(next)?;
                let n = next
                    .as_numeric()
                    .ok_or_else(|| bad_mix(function, "a mix of numeric and non-numeric values"))?;
                sum = Numeric::add(sum, n)?;
                if matches!(sum, Numeric::Double(d) if d.is_nan()) && function == "sum" {
                    break;
                }
            }
            Ok(Some(Total { value: sum.into(), count }))
        }
        XdmAtomicValue::DayTimeDuration(mut micros) => {
            while let Some(next) = next_atomic(seq)? {
                count += 1;
                let XdmAtomicValue::DayTimeDuration(m) = next else {
                    return Err(bad_mix(function, "a mix of duration types or non-duration values"));
                };
                micros = micros
                    .checked_add(m)
                    .ok_or_else(|| Error::from_code(ErrorCode::FODT0002, "duration overflow"))?;
            }
            Ok(Some(Total { value: XdmAtomicValue::DayTimeDuration(micros), count }))
        }
        XdmAtomicValue::YearMonthDuration(mut months) => {
            while let Some(next) = next_atomic(seq)? {
                count += 1;
                let XdmAtomicValue::YearMonthDuration(m) = next else {
                    return Err(bad_mix(function, "a mix of duration types or non-duration values"));
                };
                months = months
                    .checked_add(m)
                    .ok_or_else(|| Error::from_code(ErrorCode::FODT0002, "duration overflow"))?;
            }
            Ok(Some(Total { value: XdmAtomicValue::YearMonthDuration(months), count }))
        }
        XdmAtomicValue::Duration(_) => {
            Err(bad_mix(function, "a duration that is neither a dayTimeDuration nor a yearMonthDuration"))
        }
        other => Err(bad_mix(function, &format!("a value of type {} which is neither numeric nor a duration", other.type_of()))),
    }
}

/// `avg`: the sum divided by the count. Integer input averages to `xs:decimal`.
fn average<N: XdmNode>(seq: &mut dyn iter::SequenceIterator<N>) -> Result<Option<XdmAtomicValue>, Error> {
    let Some(Total { value, count }) = total(seq, "avg")? else {
        return Ok(None);
    };
    let n = i64::try_from(count).unwrap_or(i64::MAX);
    Ok(Some(match value {
        XdmAtomicValue::DayTimeDuration(micros) => {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let avg = round_half_up(micros as f64 / n as f64) as i64;
            XdmAtomicValue::DayTimeDuration(avg)
        }
        XdmAtomicValue::YearMonthDuration(months) => {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let avg = round_half_up(f64::from(months) / n as f64) as i32;
            XdmAtomicValue::YearMonthDuration(avg)
        }
        other => {
            let sum = other.as_numeric().unwrap_or(Numeric::Integer(0));
            Numeric::divide(sum, Numeric::Integer(n))?.into()
        }
    }))
}

/// Halves round towards positive infinity, so `-3.5` becomes `-3`.
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::SimpleNode;
    use rust_decimal::Decimal;

    fn seq(values: Vec<XdmAtomicValue>) -> iter::SequenceIter<SimpleNode> {
        iter::from_vec(values.into_iter().map(XdmItem::Atomic).collect())
    }

    #[test]
    fn average_of_integers_is_decimal() {
        let mut s = seq(vec![1i64.into(), 2i64.into()]);
        let avg = average(s.as_mut()).unwrap().unwrap();
        assert_eq!(avg, XdmAtomicValue::Decimal(Decimal::new(15, 1)));
    }

    #[test]
    fn mixed_input_is_rejected() {
        let mut s = seq(vec![1i64.into(), "x".into()]);
        assert_eq!(average(s.as_mut()).unwrap_err().code_enum(), ErrorCode::FORG0006);
        let mut s = seq(vec![XdmAtomicValue::DayTimeDuration(1), XdmAtomicValue::YearMonthDuration(1)]);
        assert_eq!(total(s.as_mut(), "sum").unwrap_err().code_enum(), ErrorCode::FORG0006);
    }

    #[test]
    fn durations_sum_and_average() {
        let mut s = seq(vec![XdmAtomicValue::YearMonthDuration(3), XdmAtomicValue::YearMonthDuration(4)]);
        assert_eq!(average(s.as_mut()).unwrap(), Some(XdmAtomicValue::YearMonthDuration(4)));
        let mut s = seq(vec![XdmAtomicValue::YearMonthDuration(-3), XdmAtomicValue::YearMonthDuration(-4)]);
        assert_eq!(average(s.as_mut()).unwrap(), Some(XdmAtomicValue::YearMonthDuration(-3)));
        let mut s = seq(vec![XdmAtomicValue::DayTimeDuration(-1), XdmAtomicValue::DayTimeDuration(-2)]);
        assert_eq!(average(s.as_mut()).unwrap(), Some(XdmAtomicValue::DayTimeDuration(-1)));
        let mut s = seq(vec![XdmAtomicValue::DayTimeDuration(10), XdmAtomicValue::DayTimeDuration(20)]);
        assert_eq!(total(s.as_mut(), "sum").unwrap().unwrap().value, XdmAtomicValue::DayTimeDuration(30));
    }
}
