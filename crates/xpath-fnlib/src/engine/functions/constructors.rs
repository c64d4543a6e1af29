use super::call::{Args, opt};
use crate::engine::iter::SequenceIter;
use crate::engine::runtime::{CallCtx, Error};
use crate::model::XdmNode;
use crate::xdm::AtomicType;
use crate::xdm::convert::cast_with_namespaces;

/// `xs:TYPE($arg)`: cast the single argument, or return the empty sequence for an empty one.
pub(crate) fn construct<N: XdmNode>(
    target: AtomicType,
    ctx: &CallCtx<N>,
    mut args: Args<N>,
) -> Result<SequenceIter<N>, Error> {
    let Some(value) = args.atomic(0)? else {
        return opt(None::<crate::xdm::XdmAtomicValue>);
    };
    let resolve = |prefix: &str| if prefix.is_empty() { None } else { ctx.resolve_prefix(prefix) };
    opt(Some(cast_with_namespaces(&value, target, &resolve)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter;
    use crate::engine::runtime::{DynamicContext, ErrorCode, StaticContextBuilder};
    use crate::simple_node::SimpleNode;
    use crate::xdm::{XdmAtomicValue, XdmItem};

    fn run(target: AtomicType, value: Option<XdmAtomicValue>) -> Result<Vec<XdmItem<SimpleNode>>, Error> {
        let dyn_ctx = DynamicContext::<SimpleNode>::default();
        let static_ctx = StaticContextBuilder::new().with_namespace("p", "urn:p").build();
        let ctx = CallCtx::new(&dyn_ctx, &static_ctx);
        let arg = iter::from_option(value.map(XdmItem::Atomic));
        let mut out = construct(target, &ctx, Args::new(vec![arg]))?;
        iter::collect(out.as_mut())
    }

    #[test]
    fn casts_and_passes_empty_through() {
        assert_eq!(
            run(AtomicType::Integer, Some(XdmAtomicValue::from(" 42 "))).unwrap(),
            vec![XdmItem::Atomic(XdmAtomicValue::Integer(42))]
        );
        assert!(run(AtomicType::Date, None).unwrap().is_empty());
        let err = run(AtomicType::Integer, Some(XdmAtomicValue::from("x"))).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FORG0001);
    }

    #[test]
    fn qname_uses_static_namespaces() {
        assert_eq!(
            run(AtomicType::QName, Some(XdmAtomicValue::from("p:a"))).unwrap(),
            vec![XdmItem::Atomic(XdmAtomicValue::qname(Some("urn:p"), Some("p"), "a"))]
        );
    }
}
