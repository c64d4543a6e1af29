use super::RegexOp;
use super::call::{Args, atomics, one};
use crate::engine::iter::{self, SequenceIter};
use crate::engine::runtime::{CallCtx, Error};
use crate::model::XdmNode;
use crate::xdm::XdmAtomicValue;

pub(super) fn call<N: XdmNode>(op: RegexOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let provider = ctx.regex();
    match op {
        RegexOp::RegexGroup => {
            let n = args.integer(0)?.unwrap_or(0);
            one(regex_group(ctx.dyn_ctx.regex_groups.as_deref(), n))
        }
        RegexOp::Matches => {
            let (input, pattern, flags) = (args.string(0)?, args.string(1)?, args.string(2)?);
            one(provider.matches(&pattern, &flags, &input)?)
        }
        RegexOp::Replace => {
            let (input, pattern) = (args.string(0)?, args.string(1)?);
            let (replacement, flags) = (args.string(2)?, args.string(3)?);
            one(provider.replace(&pattern, &flags, &input, &replacement)?)
        }
        RegexOp::Tokenize => {
            let (input, pattern, flags) = (args.string(0)?, args.string(1)?, args.string(2)?);
            if input.is_empty() {
                return Ok(iter::empty());
            }
            let tokens = provider.tokenize(&pattern, &flags, &input)?;
            atomics(tokens.into_iter().map(XdmAtomicValue::String).collect())
        }
    }
}

/// Captured group `n` of the current analyze-string match; "" outside a match or for a
/// group that did not participate.
fn regex_group(groups: Option<&[String]>, n: i64) -> String {
    let Some(groups) = groups else {
        return String::new();
    };
    usize::try_from(n).ok().and_then(|i| groups.get(i)).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_group_outside_and_inside_a_match() {
        assert_eq!(regex_group(None, 1), "");
        let groups = vec!["2024-01".to_string(), "2024".to_string(), "01".to_string()];
        assert_eq!(regex_group(Some(&groups), 0), "2024-01");
        assert_eq!(regex_group(Some(&groups), 2), "01");
        assert_eq!(regex_group(Some(&groups), 3), "");
        assert_eq!(regex_group(Some(&groups), -1), "");
    }
}
