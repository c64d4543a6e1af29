use super::SequenceOp;
use super::call::{Args, one};
use crate::engine::iter::{self, InsertIterator, RemoveIterator, SequenceIter, SubsequenceIterator, atomize};
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;

pub(super) fn call<N: XdmNode>(op: SequenceOp, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        SequenceOp::Exists => one(args.take(0).next_item()?.is_some()),
        SequenceOp::Empty => one(args.take(0).next_item()?.is_none()),
        SequenceOp::InsertBefore => {
            let base = args.take(0);
            let position = args.integer(1)?.unwrap_or(1);
            let insert = args.take(2);
            Ok(Box::new(InsertIterator::new(base, insert, position)))
        }
        SequenceOp::Remove => {
            let base = args.take(0);
            match args.integer(1)? {
                Some(p) if p >= 1 => Ok(Box::new(RemoveIterator::new(base, p))),
                _ => Ok(base),
            }
        }
        SequenceOp::Reverse => {
            let mut items = args.sequence(0)?;
            items.reverse();
            Ok(iter::from_vec(items))
        }
        SequenceOp::Subsequence => {
            let base = args.take(0);
            let start = args.double(1)?.unwrap_or(f64::NAN);
            let length = if args.has(2) { Some(args.double(2)?.unwrap_or(f64::NAN)) } else { None };
            Ok(match subsequence_bounds(start, length) {
                Some((min, max)) => Box::new(SubsequenceIterator::new(base, min, max)),
                None => iter::empty(),
            })
        }
        SequenceOp::Unordered => Ok(args.take(0)),
        SequenceOp::ZeroOrOne => {
            let mut seq = args.take(0);
            let first = seq.next_item()?;
            if first.is_some() && seq.next_item()?.is_some() {
                return Err(Error::from_code(
                    ErrorCode::FORG0003,
                    "a sequence of more than one item is not allowed as the first argument of zero-or-one()",
                ));
            }
            Ok(iter::from_option(first))
        }
        SequenceOp::OneOrMore => {
            let mut seq = args.take(0);
            let Some(first) = seq.next_item()? else {
                return Err(Error::from_code(
                    ErrorCode::FORG0004,
                    "an empty sequence is not allowed as the first argument of one-or-more()",
                ));
            };
            Ok(Box::new(InsertIterator::new(seq, iter::singleton(first), 1)))
        }
        SequenceOp::ExactlyOne => {
            let mut seq = args.take(0);
            let first = seq.next_item()?;
            match first {
                Some(item) if seq.next_item()?.is_none() => Ok(iter::singleton(item)),
                Some(_) => Err(Error::from_code(
                    ErrorCode::FORG0005,
                    "a sequence of more than one item is not allowed as the first argument of exactly-one()",
                )),
                None => Err(Error::from_code(
                    ErrorCode::FORG0005,
                    "an empty sequence is not allowed as the first argument of exactly-one()",
                )),
            }
        }
        SequenceOp::Data => Ok(atomize(args.take(0))),
    }
}

/// XPath `round` on a double.
fn round(d: f64) -> f64 {
    if d.is_finite() { (d + 0.5).floor() } else { d }
}

/// 1-based inclusive bounds selected by `subsequence($s, start, length)`, or `None` when
/// nothing can be selected. Out-of-range doubles saturate.
fn subsequence_bounds(start: f64, length: Option<f64>) -> Option<(usize, Option<usize>)> {
    #[allow(clippy::cast_precision_loss)]
    let limit = i64::MAX as f64;
    if start.is_nan() || start > limit {
        return None;
    }
    let start = round(start);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let min = if start <= 1.0 { 1 } else { start as usize };
    let Some(length) = length else {
        return Some((min, None));
    };
    if length.is_nan() {
        return None;
    }
    let length = round(length);
    if length <= 0.0 {
        return None;
    }
    // -INF + INF
    let end = start + length - 1.0;
    if end.is_nan() || end <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max = end as usize;
    Some((min, Some(max)))
}
