use super::QNameOp;
use super::call::{Args, one, opt};
use crate::engine::iter::SequenceIter;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::{XdmNode, in_scope_namespaces};
use crate::xdm::XdmAtomicValue;
use crate::xdm::convert::parse_lexical_qname;

pub(super) fn call<N: XdmNode>(op: QNameOp, _ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        QNameOp::QName => {
            let uri = args.string(0)?;
            let lexical = args.string(1)?;
            one(make_qname(&uri, &lexical)?)
        }
        QNameOp::ResolveQName => {
            let Some(lexical) = args.opt_string(0)? else {
                return opt(None::<XdmAtomicValue>);
            };
            let Some(element) = args.node(1)? else {
                return opt(None::<XdmAtomicValue>);
            };
            let (prefix, local) = split(&lexical)?;
            let bindings = in_scope_namespaces(&element);
            let uri = bindings.iter().find(|(p, _)| p == prefix.unwrap_or("")).map(|(_, u)| u.as_str());
            if prefix.is_some() && uri.is_none() {
                return Err(Error::from_code(
                    ErrorCode::FONS0004,
                    format!("namespace prefix '{}' is not in scope for the element", prefix.unwrap_or_default()),
                ));
            }
            one(XdmAtomicValue::qname(uri, prefix, local))
        }
    }
}

fn split(lexical: &str) -> Result<(Option<&str>, &str), Error> {
    parse_lexical_qname(lexical.trim())
        .ok_or_else(|| Error::from_code(ErrorCode::FOCA0002, format!("'{lexical}' is not a valid lexical QName")))
}

/// `fn:QName($uri, $lexical)`. A prefixed name needs a namespace.
pub(crate) fn make_qname(uri: &str, lexical: &str) -> Result<XdmAtomicValue, Error> {
    let (prefix, local) = split(lexical)?;
    if prefix.is_some() && uri.is_empty() {
        return Err(Error::from_code(
            ErrorCode::FOCA0002,
            format!("QName '{lexical}' has a prefix but no namespace URI"),
        ));
    }
    Ok(XdmAtomicValue::qname(Some(uri), prefix, local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_constructor_checks_prefix_and_namespace() {
        assert_eq!(
            make_qname("urn:x", "p:a").unwrap(),
            XdmAtomicValue::qname(Some("urn:x"), Some("p"), "a")
        );
        assert_eq!(make_qname("", "a").unwrap(), XdmAtomicValue::qname(None, None, "a"));
        assert_eq!(make_qname("", "p:a").unwrap_err().code_enum(), ErrorCode::FOCA0002);
        assert_eq!(make_qname("urn:x", "1a").unwrap_err().code_enum(), ErrorCode::FOCA0002);
    }
}
