//! XPath data model values: items, sequences and atomic values.

mod atomic;
pub mod convert;
pub mod duration;
pub mod numeric;
pub mod temporal;
pub mod types;

pub use atomic::XdmAtomicValue;
pub use duration::XdmDuration;
pub use numeric::Numeric;
pub use temporal::{CalendarValue, XdmDate, XdmDateTime, XdmTime};
pub use types::{AtomicType, ItemType, Occurrence, SequenceType};

use crate::model::XdmNode;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self { ns_uri: ns_uri.filter(|u| !u.is_empty()), local: local.into() }
    }

    pub fn ns(ns_uri: &str, local: impl Into<String>) -> Self {
        Self::new(Some(ns_uri.to_string()), local)
    }

    pub fn local(local: impl Into<String>) -> Self {
        Self { ns_uri: None, local: local.into() }
    }

    /// Parse Clark notation (`{uri}local` or `Q{uri}local`) or a bare local name.
    pub fn parse_clark(s: &str) -> Option<Self> {
        let body = s.strip_prefix('Q').filter(|b| b.starts_with('{')).unwrap_or(s);
        if let Some(rest) = body.strip_prefix('{') {
            let (ns, local) = rest.split_once('}')?;
            return Some(Self::new(Some(ns.to_string()), local));
        }
        Some(Self::local(s))
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

pub type XdmSequence<N> = Vec<XdmItem<N>>;

#[derive(Debug, Clone, PartialEq)]
pub enum XdmItem<N> {
    Node(N),
    Atomic(XdmAtomicValue),
}

impl<N> From<XdmAtomicValue> for XdmItem<N> {
    fn from(a: XdmAtomicValue) -> Self {
        XdmItem::Atomic(a)
    }
}

impl<N: XdmNode> XdmItem<N> {
    pub fn string_value(&self) -> String {
        match self {
            XdmItem::Node(n) => n.string_value(),
            XdmItem::Atomic(a) => a.string_value(),
        }
    }

    /// Atomize a single item. Nodes yield their typed value.
    pub fn atomize(&self) -> Vec<XdmAtomicValue> {
        match self {
            XdmItem::Node(n) => n.typed_value(),
            XdmItem::Atomic(a) => vec![a.clone()],
        }
    }

    pub fn as_node(&self) -> Option<&N> {
        match self {
            XdmItem::Node(n) => Some(n),
            XdmItem::Atomic(_) => None,
        }
    }

    pub fn as_atomic(&self) -> Option<&XdmAtomicValue> {
        match self {
            XdmItem::Atomic(a) => Some(a),
            XdmItem::Node(_) => None,
        }
    }

    /// Short type label used in diagnostics and trace output.
    pub fn type_label(&self) -> String {
        match self {
            XdmItem::Node(n) => n.kind().label().to_string(),
            XdmItem::Atomic(a) => a.type_of().to_string(),
        }
    }
}

impl<N> fmt::Display for XdmItem<N>
where
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdmItem::Node(n) => write!(f, "{n:?}"),
            XdmItem::Atomic(a) => write!(f, "{a}"),
        }
    }
}
