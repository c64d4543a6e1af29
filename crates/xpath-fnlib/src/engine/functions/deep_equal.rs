use crate::engine::comparer::AtomicComparer;
use crate::engine::iter::SequenceIterator;
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::{NodeKind, XdmNode};
use crate::xdm::{XdmAtomicValue, XdmItem};

/// `fn:deep-equal` over two sequences, pairwise.
///
/// Comparison failures between atomic values mean "not equal". `err:FOTY0015` is the one
/// comparison error that is never masked; the built-in comparer never raises it, but host
/// comparers may. Errors raised while reading the inputs propagate.
pub(crate) fn deep_equal<N: XdmNode>(
    a: &mut dyn SequenceIterator<N>,
    b: &mut dyn SequenceIterator<N>,
    comparer: &dyn AtomicComparer,
) -> Result<bool, Error> {
    loop {
        let (x, y) = (a.next_item()?, b.next_item()?);
        let equal = match (x, y) {
            (None, None) => return Ok(true),
            (Some(XdmItem::Node(m)), Some(XdmItem::Node(n))) => nodes_equal(&m, &n, comparer)?,
            (Some(XdmItem::Atomic(p)), Some(XdmItem::Atomic(q))) => atomic_equal(&p, &q, comparer)?,
            _ => false,
        };
        if !equal {
            return Ok(false);
        }
    }
}

fn atomic_equal(a: &XdmAtomicValue, b: &XdmAtomicValue, comparer: &dyn AtomicComparer) -> Result<bool, Error> {
    if a.is_nan() && b.is_nan() {
        return Ok(true);
    }
    match comparer.equals(a, b) {
        Ok(eq) => Ok(eq),
        Err(e) if e.code_enum() == ErrorCode::FOTY0015 => Err(e),
        Err(_) => Ok(false),
    }
}

fn values_equal(a: &[XdmAtomicValue], b: &[XdmAtomicValue], comparer: &dyn AtomicComparer) -> Result<bool, Error> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b) {
        if !atomic_equal(x, y, comparer)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn same_name<N: XdmNode>(a: &N, b: &N) -> bool {
    match (a.name(), b.name()) {
        (Some(x), Some(y)) => x.matches(y.ns_uri.as_deref(), &y.local),
        (None, None) => true,
        _ => false,
    }
}

fn is_ignorable<N: XdmNode>(n: &N) -> bool {
    matches!(n.kind(), NodeKind::Comment | NodeKind::ProcessingInstruction)
}

fn nodes_equal<N: XdmNode>(a: &N, b: &N, comparer: &dyn AtomicComparer) -> Result<bool, Error> {
    if a == b {
        return Ok(true);
    }
    if a.kind() != b.kind() {
        return Ok(false);
    }
    match a.kind() {
        NodeKind::Element | NodeKind::Document => {
            if a.kind() == NodeKind::Element {
                if !same_name(a, b) {
                    return Ok(false);
                }
                let (attrs_a, attrs_b) = (a.attributes(), b.attributes());
                if attrs_a.len() != attrs_b.len() {
                    return Ok(false);
                }
                for att in &attrs_a {
                    let Some(other) = attrs_b.iter().find(|o| same_name(att, o)) else {
                        return Ok(false);
                    };
                    if !nodes_equal(att, other, comparer)? {
                        return Ok(false);
                    }
                }
            }
            let ca: Vec<N> = a.children().into_iter().filter(|c| !is_ignorable(c)).collect();
            let cb: Vec<N> = b.children().into_iter().filter(|c| !is_ignorable(c)).collect();
            if ca.len() != cb.len() {
                return Ok(false);
            }
            for (x, y) in ca.iter().zip(&cb) {
                if !nodes_equal(x, y, comparer)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(same_name(a, b) && values_equal(&a.typed_value(), &b.typed_value(), comparer)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::comparer::GenericAtomicComparer;
    use crate::engine::iter;
    use core::cmp::Ordering;
    use crate::simple_node::{SimpleNode, attr, comment, elem, text};

    fn de(a: Vec<XdmItem<SimpleNode>>, b: Vec<XdmItem<SimpleNode>>) -> bool {
        let (mut x, mut y) = (iter::from_vec(a), iter::from_vec(b));
        deep_equal(x.as_mut(), y.as_mut(), &GenericAtomicComparer::codepoint()).unwrap()
    }

    #[test]
    fn attribute_order_and_comments_are_ignored() {
        let a = elem("e").attr(attr("x", "1")).attr(attr("y", "2")).child(text("t")).build();
        let b = elem("e").attr(attr("y", "2")).attr(attr("x", "1")).child(comment("c")).child(text("t")).build();
        assert!(de(vec![XdmItem::Node(a.clone())], vec![XdmItem::Node(b)]));
        let c = elem("e").attr(attr("x", "1")).attr(attr("y", "3")).child(text("t")).build();
        assert!(!de(vec![XdmItem::Node(a)], vec![XdmItem::Node(c)]));
    }

    #[test]
    fn nan_equals_nan_and_incomparables_are_unequal() {
        let nan = XdmItem::Atomic(XdmAtomicValue::Double(f64::NAN));
        assert!(de(vec![nan.clone()], vec![nan]));
        assert!(!de(vec![XdmAtomicValue::Integer(1).into()], vec![XdmAtomicValue::from("1").into()]));
        assert!(!de(vec![XdmAtomicValue::Integer(1).into()], vec![]));
    }

    /// Refuses to compare strings with FOTY0015 and anything else with XPTY0004.
    struct Refusing;

    impl AtomicComparer for Refusing {
        fn compare(&self, _: &XdmAtomicValue, _: &XdmAtomicValue) -> Result<Ordering, Error> {
            Err(Error::from_code(ErrorCode::XPTY0004, "incomparable"))
        }
        fn equals(&self, a: &XdmAtomicValue, _: &XdmAtomicValue) -> Result<bool, Error> {
            let code = if matches!(a, XdmAtomicValue::String(_)) { ErrorCode::FOTY0015 } else { ErrorCode::XPTY0004 };
            Err(Error::from_code(code, "cannot compare"))
        }
    }

    #[test]
    fn foty0015_is_not_masked() {
        let strings = || iter::from_vec::<SimpleNode>(vec![XdmAtomicValue::from("a").into()]);
        let err = deep_equal(strings().as_mut(), strings().as_mut(), &Refusing).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FOTY0015);
        let ints = || iter::from_vec::<SimpleNode>(vec![XdmAtomicValue::Integer(1).into()]);
        assert!(!deep_equal(ints().as_mut(), ints().as_mut(), &Refusing).unwrap());
    }
}
