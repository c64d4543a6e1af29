use super::CollatingOp;
use super::call::{Args, one, opt};
use super::deep_equal::deep_equal;
use crate::engine::collation::{Collation, require_substring_matching};
use crate::engine::iter::{DistinctIterator, IndexIterator, SequenceIter};
use crate::engine::runtime::{CallCtx, Error};
use crate::model::XdmNode;
use core::cmp::Ordering;
use std::sync::Arc;

impl CollatingOp {
    /// Position of the optional collation argument.
    fn collation_arg(self) -> usize {
        match self {
            CollatingOp::DistinctValues => 1,
            _ => 2,
        }
    }
}

/// The collation bound at compile time, else the one named by argument `index`, else the
/// default collation.
pub(super) fn collation_for<N: XdmNode>(
    bound: Option<&Arc<dyn Collation>>,
    ctx: &CallCtx<N>,
    args: &mut Args<N>,
    index: usize,
) -> Result<Arc<dyn Collation>, Error> {
    if let Some(c) = bound {
        return Ok(c.clone());
    }
    if args.has(index) {
        let uri = args.string(index)?;
        return ctx.collation(Some(&uri));
    }
    ctx.collation(None)
}

pub(super) fn call<N: XdmNode>(
    op: CollatingOp,
    bound: Option<&Arc<dyn Collation>>,
    ctx: &CallCtx<N>,
    mut args: Args<N>,
) -> Result<SequenceIter<N>, Error> {
    let collation = collation_for(bound, ctx, &mut args, op.collation_arg())?;
    match op {
        CollatingOp::Compare => {
            let (a, b) = (args.opt_string(0)?, args.opt_string(1)?);
            opt(a.zip(b).map(|(a, b)| match collation.compare(&a, &b) {
                Ordering::Less => -1i64,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            }))
        }
        CollatingOp::Contains | CollatingOp::StartsWith | CollatingOp::EndsWith => {
            let (s, part) = (args.string(0)?, args.string(1)?);
            if part.is_empty() {
                return one(true);
            }
            require_substring_matching(collation.as_ref())?;
            one(match op {
                CollatingOp::Contains => s.contains(&part),
                CollatingOp::StartsWith => s.starts_with(&part),
                _ => s.ends_with(&part),
            })
        }
        CollatingOp::SubstringBefore | CollatingOp::SubstringAfter => {
            let (s, part) = (args.string(0)?, args.string(1)?);
            if part.is_empty() {
                return one(if op == CollatingOp::SubstringAfter { s } else { String::new() });
            }
            require_substring_matching(collation.as_ref())?;
            let result = match s.find(&part) {
                None => String::new(),
                Some(i) if op == CollatingOp::SubstringBefore => s[..i].to_string(),
                Some(i) => s[i + part.len()..].to_string(),
            };
            one(result)
        }
        CollatingOp::DistinctValues => {
            let base = args.take(0);
            Ok(Box::new(DistinctIterator::new(base, ctx.comparer(collation))))
        }
        CollatingOp::IndexOf => {
            let base = args.take(0);
            let Some(target) = args.atomic(1)? else {
                return Ok(crate::engine::iter::empty());
            };
            Ok(Box::new(IndexIterator::new(base, target, ctx.comparer(collation))))
        }
        CollatingOp::DeepEqual => {
            let (mut a, mut b) = (args.take(0), args.take(1));
            one(deep_equal(a.as_mut(), b.as_mut(), &ctx.comparer(collation))?)
        }
    }
}
