use super::{Entry, SystemFunction};
use crate::engine::iter::{self, ItemMapFn, SequenceIter, atomize};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::convert::cast;
use crate::xdm::{AtomicType, ExpandedName, ItemType, Occurrence, SequenceType, XdmAtomicValue, XdmItem, XdmSequence};
use std::sync::Arc;

/// Host-provided implementation registered in an executable library.
pub type ExecutableFn<N> =
    Arc<dyn Fn(&CallCtx<N>, Vec<SequenceIter<N>>) -> Result<SequenceIter<N>, Error> + Send + Sync>;

pub enum CallTarget<N> {
    System { entry: &'static Entry, function: SystemFunction },
    /// `xs:TYPE(arg)` constructor.
    Constructor(AtomicType),
    Executable(ExecutableFn<N>),
}

/// A function call bound at compile time. Immutable; one per call site.
pub struct BoundCall<N> {
    pub name: ExpandedName,
    pub arity: usize,
    target: CallTarget<N>,
    /// The call omitted its first argument and the context item stands in for it.
    context_item_argument: bool,
}

impl<N> core::fmt::Debug for BoundCall<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let target = match &self.target {
            CallTarget::System { function, .. } => format!("{function:?}"),
            CallTarget::Constructor(t) => format!("Constructor({t})"),
            CallTarget::Executable(_) => "Executable".to_string(),
        };
        f.debug_struct("BoundCall")
            .field("name", &self.name.to_string())
            .field("arity", &self.arity)
            .field("target", &target)
            .field("context_item_argument", &self.context_item_argument)
            .finish()
    }
}

impl<N: XdmNode> BoundCall<N> {
    pub fn new(name: ExpandedName, arity: usize, target: CallTarget<N>) -> Self {
        Self { name, arity, target, context_item_argument: false }
    }

    pub(crate) fn with_context_item_argument(mut self) -> Self {
        self.context_item_argument = true;
        self
    }

    pub fn target(&self) -> &CallTarget<N> {
        &self.target
    }

    /// Evaluate the call lazily. `args` holds one iterator per supplied argument.
    pub fn call(&self, ctx: &CallCtx<N>, mut args: Vec<SequenceIter<N>>) -> Result<SequenceIter<N>, Error> {
        if args.len() != self.arity {
            return Err(Error::from_code(
                ErrorCode::XPST0017,
                format!("{}() was bound with {} arguments but called with {}", self.name, self.arity, args.len()),
            ));
        }
        if self.context_item_argument {
            args.insert(0, iter::singleton(ctx.context_item()?.clone()));
        }
        match &self.target {
            CallTarget::System { entry, function } => {
                let converted = args
                    .into_iter()
                    .enumerate()
                    .map(|(i, arg)| convert_argument(arg, entry.argument_type(i), entry.name, i))
                    .collect::<Result<Vec<_>, Error>>()?;
                function.call(ctx, Args::new(converted))
            }
            CallTarget::Constructor(target) => {
                let arg = args.pop().unwrap_or_else(iter::empty);
                let required = SequenceType::atomic(AtomicType::AnyAtomic, Occurrence::ZeroOrOne);
                let arg = convert_argument(arg, required, target.local_name(), 0)?;
                super::construct(*target, ctx, Args::new(vec![arg]))
            }
            CallTarget::Executable(f) => f(ctx, args),
        }
    }

    /// Evaluate and collect the whole result.
    pub fn evaluate(&self, ctx: &CallCtx<N>, args: Vec<SequenceIter<N>>) -> Result<XdmSequence<N>, Error> {
        let mut it = self.call(ctx, args)?;
        iter::collect(it.as_mut())
    }

    /// Evaluate and return the first item of the result, if any.
    pub fn evaluate_item(&self, ctx: &CallCtx<N>, args: Vec<SequenceIter<N>>) -> Result<Option<XdmItem<N>>, Error> {
        self.call(ctx, args)?.next_item()
    }
}

fn ordinal(i: usize) -> String {
    match i + 1 {
        1 => "first".to_string(),
        2 => "second".to_string(),
        3 => "third".to_string(),
        n => format!("{n}th"),
    }
}

/// Apply the function conversion rules to one argument.
///
/// Atomic parameters atomize their input, cast untyped values (to `xs:double` for numeric
/// parameters) and promote numerics and `xs:anyURI`. Singleton parameters are read eagerly
/// so cardinality errors surface at the call; sequence parameters stay lazy.
fn convert_argument<N: XdmNode>(
    arg: SequenceIter<N>,
    required: SequenceType,
    function: &'static str,
    index: usize,
) -> Result<SequenceIter<N>, Error> {
    let converted: SequenceIter<N> = match required.item {
        ItemType::AnyItem => arg,
        ItemType::AnyNode | ItemType::Node(_) => {
            let kind = match required.item {
                ItemType::Node(k) => Some(k),
                _ => None,
            };
            let f: ItemMapFn<N> = Arc::new(move |item: XdmItem<N>| {
                if matches!(&item, XdmItem::Node(n) if kind.is_none_or(|k| n.kind() == k)) {
                    return Ok(Some(item));
                }
                Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!(
                        "required item type of {} argument of {function}() is {}; supplied value has item type {}",
                        ordinal(index),
                        SequenceType::new(required.item, Occurrence::ExactlyOne),
                        item.type_label()
                    ),
                ))
            });
            Box::new(iter::ItemMappingIterator::new(arg, f))
        }
        ItemType::Atomic(target) => {
            let f: ItemMapFn<N> = Arc::new(move |item: XdmItem<N>| {
                let XdmItem::Atomic(v) = item else { return Ok(Some(item)) };
                convert_atomic(v, target, function, index).map(|v| Some(XdmItem::Atomic(v)))
            });
            Box::new(iter::ItemMappingIterator::new(atomize(arg), f))
        }
    };
    if required.occurrence.allows_many() {
        return Ok(converted);
    }
    check_singleton(converted, required, function, index)
}

fn check_singleton<N: XdmNode>(
    mut arg: SequenceIter<N>,
    required: SequenceType,
    function: &'static str,
    index: usize,
) -> Result<SequenceIter<N>, Error> {
    let first = arg.next_item()?;
    if first.is_some() && arg.next_item()?.is_some() {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("a sequence of more than one item is not allowed as the {} argument of {function}()", ordinal(index)),
        ));
    }
    if first.is_none() && !required.occurrence.allows_zero() {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("an empty sequence is not allowed as the {} argument of {function}()", ordinal(index)),
        ));
    }
    Ok(iter::from_option(first))
}

pub(crate) fn convert_atomic(
    v: XdmAtomicValue,
    target: AtomicType,
    function: &str,
    index: usize,
) -> Result<XdmAtomicValue, Error> {
    let actual = v.type_of();
    if actual.is_subtype_of(target) {
        return Ok(v);
    }
    if v.is_untyped() {
        return match target {
            AtomicType::Numeric => cast(&v, AtomicType::Double),
            AtomicType::AnyAtomic => Ok(v),
            t => cast(&v, t),
        };
    }
    let promoted = match (target, &v) {
        (AtomicType::Double, _) if actual.is_primitive_numeric() => v.as_numeric().map(|n| XdmAtomicValue::Double(n.to_f64())),
        (AtomicType::Float, XdmAtomicValue::Integer(_) | XdmAtomicValue::Decimal(_)) => {
            #[allow(clippy::cast_possible_truncation)]
            v.as_numeric().map(|n| XdmAtomicValue::Float(n.to_f64() as f32))
        }
        (AtomicType::String, XdmAtomicValue::AnyUri(s)) => Some(XdmAtomicValue::String(s.clone())),
        _ => None,
    };
    promoted.ok_or_else(|| {
        Error::from_code(
            ErrorCode::XPTY0004,
            format!(
                "required item type of {} argument of {function}() is {target}; supplied value has item type {actual}",
                ordinal(index)
            ),
        )
    })
}

/// Converted arguments handed to an implementation.
///
/// Singleton parameters have already been checked; the accessors read their single item.
/// Optional parameters the call did not supply are out of range, see [`Args::has`].
pub struct Args<N> {
    values: Vec<Option<SequenceIter<N>>>,
}

impl<N: XdmNode> Args<N> {
    pub fn new(values: Vec<SequenceIter<N>>) -> Self {
        Self { values: values.into_iter().map(Some).collect() }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether argument `i` was supplied.
    pub fn has(&self, i: usize) -> bool {
        i < self.values.len()
    }

    /// Take argument `i` as an iterator. Absent or already taken arguments read as empty.
    pub fn take(&mut self, i: usize) -> SequenceIter<N> {
        self.values.get_mut(i).and_then(Option::take).unwrap_or_else(iter::empty)
    }

    pub fn item(&mut self, i: usize) -> Result<Option<XdmItem<N>>, Error> {
        self.take(i).next_item()
    }

    pub fn atomic(&mut self, i: usize) -> Result<Option<XdmAtomicValue>, Error> {
        Ok(match self.item(i)? {
            Some(XdmItem::Atomic(a)) => Some(a),
            Some(XdmItem::Node(n)) => n.typed_value().into_iter().next(),
            None => None,
        })
    }

    /// String value of argument `i`; the empty sequence reads as "".
    pub fn string(&mut self, i: usize) -> Result<String, Error> {
        Ok(self.opt_string(i)?.unwrap_or_default())
    }

    pub fn opt_string(&mut self, i: usize) -> Result<Option<String>, Error> {
        Ok(self.atomic(i)?.map(|a| a.string_value()))
    }

    pub fn integer(&mut self, i: usize) -> Result<Option<i64>, Error> {
        Ok(match self.atomic(i)? {
            Some(XdmAtomicValue::Integer(n)) => Some(n),
            Some(other) => match cast(&other, AtomicType::Integer)? {
                XdmAtomicValue::Integer(n) => Some(n),
                _ => None,
            },
            None => None,
        })
    }

    pub fn double(&mut self, i: usize) -> Result<Option<f64>, Error> {
        Ok(self.atomic(i)?.and_then(|a| a.as_numeric()).map(|n| n.to_f64()))
    }

    pub fn boolean(&mut self, i: usize) -> Result<Option<bool>, Error> {
        Ok(match self.atomic(i)? {
            Some(XdmAtomicValue::Boolean(b)) => Some(b),
            _ => None,
        })
    }

    pub fn node(&mut self, i: usize) -> Result<Option<N>, Error> {
        Ok(match self.item(i)? {
            Some(XdmItem::Node(n)) => Some(n),
            Some(XdmItem::Atomic(a)) => {
                return Err(Error::from_code(ErrorCode::XPTY0004, format!("expected a node, found {}", a.type_of())));
            }
            None => None,
        })
    }

    /// Argument `i` if supplied, else the context node.
    pub fn node_or_context(&mut self, i: usize, ctx: &CallCtx<N>) -> Result<N, Error> {
        if self.has(i) {
            return self
                .node(i)?
                .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "an empty sequence is not allowed here"));
        }
        ctx.context_node().cloned()
    }

    pub fn sequence(&mut self, i: usize) -> Result<XdmSequence<N>, Error> {
        iter::collect(self.take(i).as_mut())
    }

    /// All atomic values of argument `i`, atomizing nodes.
    pub fn atomics(&mut self, i: usize) -> Result<Vec<XdmAtomicValue>, Error> {
        let mut out = Vec::new();
        for item in self.sequence(i)? {
            match item {
                XdmItem::Atomic(a) => out.push(a),
                XdmItem::Node(n) => out.extend(n.typed_value()),
            }
        }
        Ok(out)
    }
}

/// Result helpers.
pub(crate) fn one<N: XdmNode>(v: impl Into<XdmAtomicValue>) -> Result<SequenceIter<N>, Error> {
    Ok(iter::singleton(XdmItem::Atomic(v.into())))
}

pub(crate) fn opt<N: XdmNode>(v: Option<impl Into<XdmAtomicValue>>) -> Result<SequenceIter<N>, Error> {
    Ok(iter::from_option(v.map(|v| XdmItem::Atomic(v.into()))))
}

pub(crate) fn nodes<N: XdmNode>(v: Vec<N>) -> Result<SequenceIter<N>, Error> {
    Ok(iter::from_vec(v.into_iter().map(XdmItem::Node).collect()))
}

pub(crate) fn atomics<N: XdmNode>(v: Vec<XdmAtomicValue>) -> Result<SequenceIter<N>, Error> {
    Ok(iter::from_vec(v.into_iter().map(XdmItem::Atomic).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::{SimpleNode, elem, text};

    fn converted(items: Vec<XdmItem<SimpleNode>>, t: SequenceType) -> Result<XdmSequence<SimpleNode>, Error> {
        let mut it = convert_argument(iter::from_vec(items), t, "f", 0)?;
        iter::collect(it.as_mut())
    }

    #[test]
    fn untyped_becomes_double_for_numeric() {
        let e = elem("e").child(text("2.5")).build();
        let t = SequenceType::atomic(AtomicType::Numeric, Occurrence::ZeroOrOne);
        let out = converted(vec![XdmItem::Node(e)], t).unwrap();
        assert_eq!(out, vec![XdmItem::Atomic(XdmAtomicValue::Double(2.5))]);
    }

    #[test]
    fn cardinality_is_checked_for_singletons() {
        let t = SequenceType::atomic(AtomicType::String, Occurrence::ExactlyOne);
        let err = converted(vec![], t).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
        let two = vec![XdmAtomicValue::from("a").into(), XdmAtomicValue::from("b").into()];
        assert!(converted(two, t).is_err());
    }

    #[test]
    fn any_uri_promotes_to_string() {
        let v = convert_atomic(XdmAtomicValue::AnyUri("u".into()), AtomicType::String, "f", 0).unwrap();
        assert_eq!(v, XdmAtomicValue::String("u".into()));
        let err = convert_atomic(XdmAtomicValue::Boolean(true), AtomicType::String, "f", 1).unwrap_err();
        assert!(err.message.contains("second argument"));
    }
}
