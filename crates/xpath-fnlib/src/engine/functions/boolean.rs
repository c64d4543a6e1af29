use super::BooleanOp;
use super::call::{Args, one};
use crate::engine::iter::{SequenceIter, SequenceIterator};
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem};

pub(super) fn call<N: XdmNode>(op: BooleanOp, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        BooleanOp::Boolean => one(effective_boolean_value(args.take(0).as_mut())?),
        BooleanOp::Not => one(!effective_boolean_value(args.take(0).as_mut())?),
        BooleanOp::True => one(true),
        BooleanOp::False => one(false),
    }
}

/// Effective boolean value of a sequence. Reads at most two items.
pub(crate) fn effective_boolean_value<N: XdmNode>(seq: &mut dyn SequenceIterator<N>) -> Result<bool, Error> {
    let value = match seq.next_item()? {
        None => return Ok(false),
        Some(XdmItem::Node(_)) => return Ok(true),
        Some(XdmItem::Atomic(v)) => v,
    };
    let result = match &value {
        XdmAtomicValue::Boolean(b) => *b,
        XdmAtomicValue::String(s) | XdmAtomicValue::AnyUri(s) | XdmAtomicValue::UntypedAtomic(s) => !s.is_empty(),
        v => match v.as_numeric() {
            Some(n) => !n.is_nan() && n.to_f64() != 0.0,
            None => {
                return Err(Error::from_code(
                    ErrorCode::FORG0006,
                    format!("effective boolean value is not defined for a value of type {}", value.type_of()),
                ));
            }
        },
    };
    if seq.next_item()?.is_some() {
        return Err(Error::from_code(
            ErrorCode::FORG0006,
            "effective boolean value is not defined for a sequence of two or more items starting with an atomic value",
        ));
    }
    Ok(result)
}
