use super::RoundingOp;
use super::call::{Args, one, opt};
use crate::engine::iter::SequenceIter;
use crate::engine::runtime::Error;
use crate::model::XdmNode;
use crate::xdm::numeric::parse_double;
use crate::xdm::{Numeric, XdmAtomicValue};

/// floor, ceiling, round, round-half-to-even and abs. The result keeps the numeric type of
/// the argument.
pub(super) fn rounding<N: XdmNode>(op: RoundingOp, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let Some(n) = args.atomic(0)?.and_then(|v| v.as_numeric()) else {
        return opt(None::<XdmAtomicValue>);
    };
    let result = match op {
        RoundingOp::Floor => n.floor(),
        RoundingOp::Ceiling => n.ceiling(),
        RoundingOp::Round => n.round(),
        RoundingOp::Abs => n.abs()?,
        RoundingOp::HalfEven => {
            let precision = if args.has(1) { args.integer(1)?.unwrap_or(0) } else { 0 };
            n.round_half_to_even(precision)?
        }
    };
    one(result)
}

/// `fn:number`: booleans and numerics convert to double, strings are parsed, and anything
/// else (including the empty sequence) gives NaN.
pub(super) fn number<N: XdmNode>(mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    one(to_number(args.atomic(0)?.as_ref()))
}

pub(crate) fn to_number(value: Option<&XdmAtomicValue>) -> f64 {
    match value {
        Some(XdmAtomicValue::Boolean(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(XdmAtomicValue::String(s) | XdmAtomicValue::UntypedAtomic(s)) => parse_double(s).unwrap_or(f64::NAN),
        Some(v) => v.as_numeric().map_or(f64::NAN, |n: Numeric| n.to_f64()),
        None => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_conversions() {
        assert_eq!(to_number(Some(&XdmAtomicValue::Boolean(true))), 1.0);
        assert_eq!(to_number(Some(&XdmAtomicValue::from(" 12.5 "))), 12.5);
        assert!(to_number(Some(&XdmAtomicValue::from("abc"))).is_nan());
        assert!(to_number(Some(&XdmAtomicValue::AnyUri("1".into()))).is_nan());
        assert!(to_number(None).is_nan());
        assert_eq!(to_number(Some(&XdmAtomicValue::Integer(3))), 3.0);
    }
}
