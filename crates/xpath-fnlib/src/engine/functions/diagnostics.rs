use super::DiagnosticOp;
use super::call::Args;
use crate::engine::iter::{self, SequenceIter, TracingIterator, display_item};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{ExpandedName, XdmAtomicValue};

pub(super) fn call<N: XdmNode>(op: DiagnosticOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        DiagnosticOp::Error => Err(raise(&mut args)?),
        DiagnosticOp::Trace => {
            let value = args.take(0);
            let label = args.string(1)?;
            match &ctx.dyn_ctx.trace_listener {
                Some(listener) => {
                    let mut value = value;
                    let items = iter::collect(value.as_mut())?;
                    listener.trace(&label, &items);
                    Ok(iter::from_vec(items))
                }
                None => Ok(Box::new(TracingIterator::new(value, label))),
            }
        }
    }
}

/// Build the error `fn:error` raises. Fails only if reading the arguments fails.
fn raise<N: XdmNode>(args: &mut Args<N>) -> Result<Error, Error> {
    let code = match args.atomic(0)? {
        Some(XdmAtomicValue::QName { ns_uri, local, .. }) => ExpandedName::new(ns_uri, local),
        _ => ErrorCode::FOER0000.qname(),
    };
    let description = if args.has(1) {
        args.string(1)?
    } else {
        "Error signalled by application call on error()".to_string()
    };
    if args.has(2) {
        let object = args.sequence(2)?;
        let shown: Vec<String> = object.iter().map(display_item).collect();
        tracing::debug!(code = %code, error_object = ?shown, "fn:error called with an error object");
    }
    Ok(Error::new_qname(code, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::SimpleNode;

    fn args(values: Vec<Vec<XdmAtomicValue>>) -> Args<SimpleNode> {
        Args::new(values.into_iter().map(|v| iter::from_vec(v.into_iter().map(Into::into).collect())).collect())
    }

    #[test]
    fn default_code_and_message() {
        let e = raise(&mut args(vec![])).unwrap();
        assert_eq!(e.code_enum(), ErrorCode::FOER0000);
        assert!(e.message.contains("error()"));
    }

    #[test]
    fn user_code_is_kept() {
        let q = XdmAtomicValue::qname(Some("urn:app"), Some("app"), "E42");
        let e = raise(&mut args(vec![vec![q], vec![XdmAtomicValue::from("bad input")]])).unwrap();
        assert_eq!(e.code, ExpandedName::ns("urn:app", "E42"));
        assert_eq!(e.message, "bad input");
        assert_eq!(e.code_enum(), ErrorCode::Unknown);
    }
}
