//! Lazy, pull-based sequence iteration.
//!
//! Every function consumes its arguments and produces its result through
//! [`SequenceIterator`]. An iterator is a single-consumer cursor; `get_another` gives a fresh
//! cursor over the same sequence that shares only immutable inputs with the original. Once
//! `next_item` has returned `Ok(None)` it keeps doing so.

mod distinct;
mod doc_order;
mod index;
mod insert;
mod mapping;
mod remove;
mod subsequence;
mod trace;

pub use distinct::DistinctIterator;
pub use doc_order::DocumentOrderIterator;
pub use index::IndexIterator;
pub use insert::InsertIterator;
pub use mapping::{ItemMapFn, ItemMappingIterator, MapFn, MappingIterator, atomize};
pub use remove::RemoveIterator;
pub use subsequence::SubsequenceIterator;
pub use trace::{TracingIterator, node_path};
pub(crate) use doc_order::sort_nodes;
pub(crate) use trace::display_item;

use crate::engine::runtime::Error;
use crate::xdm::{XdmItem, XdmSequence};
use core::ops::BitOr;
use std::sync::Arc;

/// Optional capabilities an iterator may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IterProperties(u8);

impl IterProperties {
    pub const NONE: IterProperties = IterProperties(0);
    /// `last_position` answers without consuming the iterator.
    pub const LAST_POSITION_FINDER: IterProperties = IterProperties(1);
    /// The whole sequence is in memory; `materialize` returns it.
    pub const GROUNDED: IterProperties = IterProperties(2);

    pub fn contains(self, other: IterProperties) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for IterProperties {
    type Output = IterProperties;
    fn bitor(self, rhs: Self) -> Self {
        IterProperties(self.0 | rhs.0)
    }
}

pub trait SequenceIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error>;

    /// 1-based position of the item last returned; 0 before the first call. It does not
    /// move once the iterator is exhausted.
    fn position(&self) -> usize;

    /// A new cursor positioned at the start of the same sequence.
    fn get_another(&self) -> Result<SequenceIter<N>, Error>;

    fn properties(&self) -> IterProperties {
        IterProperties::NONE
    }

    /// Number of items in the sequence, when `LAST_POSITION_FINDER` is set.
    fn last_position(&mut self) -> Option<Result<usize, Error>> {
        None
    }

    /// All items of the sequence, when `GROUNDED` is set.
    fn materialize(&self) -> Option<XdmSequence<N>> {
        None
    }
}

pub type SequenceIter<N> = Box<dyn SequenceIterator<N>>;

/// Iterator over an in-memory list.
pub struct ListIter<N> {
    items: Arc<[XdmItem<N>]>,
    index: usize,
}

impl<N> ListIter<N> {
    pub fn new(items: Arc<[XdmItem<N>]>) -> Self {
        Self { items, index: 0 }
    }
}

impl<N: Clone + 'static> SequenceIterator<N> for ListIter<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        let item = self.items.get(self.index).cloned();
        if item.is_some() {
            self.index += 1;
        }
        Ok(item)
    }
    fn position(&self) -> usize {
        self.index
    }
    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(ListIter::new(self.items.clone())))
    }
    fn properties(&self) -> IterProperties {
        IterProperties::GROUNDED | IterProperties::LAST_POSITION_FINDER
    }
    fn last_position(&mut self) -> Option<Result<usize, Error>> {
        Some(Ok(self.items.len()))
    }
    fn materialize(&self) -> Option<XdmSequence<N>> {
        Some(self.items.to_vec())
    }
}

pub struct EmptyIter;

impl<N: 'static> SequenceIterator<N> for EmptyIter {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        Ok(None)
    }
    fn position(&self) -> usize {
        0
    }
    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(EmptyIter))
    }
    fn properties(&self) -> IterProperties {
        IterProperties::GROUNDED | IterProperties::LAST_POSITION_FINDER
    }
    fn last_position(&mut self) -> Option<Result<usize, Error>> {
        Some(Ok(0))
    }
    fn materialize(&self) -> Option<XdmSequence<N>> {
        Some(Vec::new())
    }
}

pub struct SingletonIter<N> {
    item: XdmItem<N>,
    taken: bool,
}

impl<N> SingletonIter<N> {
    pub fn new(item: XdmItem<N>) -> Self {
        Self { item, taken: false }
    }
}

impl<N: Clone + 'static> SequenceIterator<N> for SingletonIter<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        if self.taken {
            return Ok(None);
        }
        self.taken = true;
        Ok(Some(self.item.clone()))
    }
    fn position(&self) -> usize {
        usize::from(self.taken)
    }
    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(SingletonIter::new(self.item.clone())))
    }
    fn properties(&self) -> IterProperties {
        IterProperties::GROUNDED | IterProperties::LAST_POSITION_FINDER
    }
    fn last_position(&mut self) -> Option<Result<usize, Error>> {
        Some(Ok(1))
    }
    fn materialize(&self) -> Option<XdmSequence<N>> {
        Some(vec![self.item.clone()])
    }
}

pub fn empty<N: 'static>() -> SequenceIter<N> {
    Box::new(EmptyIter)
}

pub fn singleton<N: Clone + 'static>(item: impl Into<XdmItem<N>>) -> SequenceIter<N> {
    Box::new(SingletonIter::new(item.into()))
}

pub fn from_vec<N: Clone + 'static>(items: XdmSequence<N>) -> SequenceIter<N> {
    match items.len() {
        0 => empty(),
        _ => Box::new(ListIter::new(items.into())),
    }
}

/// Zero or one item: an empty iterator or a singleton.
pub fn from_option<N: Clone + 'static>(item: Option<XdmItem<N>>) -> SequenceIter<N> {
    match item {
        Some(i) => singleton(i),
        None => empty(),
    }
}

/// Drain the remaining items of `iter`.
pub fn collect<N>(iter: &mut dyn SequenceIterator<N>) -> Result<XdmSequence<N>, Error> {
    let mut out = Vec::new();
    while let Some(item) = iter.next_item()? {
        out.push(item);
    }
    Ok(out)
}

/// Length of the sequence. Uses `last_position` when advertised, otherwise counts a fresh
/// cursor so `iter` itself is left untouched.
pub fn count<N>(iter: &mut dyn SequenceIterator<N>) -> Result<usize, Error> {
    if iter.properties().contains(IterProperties::LAST_POSITION_FINDER)
        && let Some(n) = iter.last_position()
    {
        return n;
    }
    let mut fork = iter.get_another()?;
    let mut n = 0;
    while fork.next_item()?.is_some() {
        n += 1;
    }
    Ok(n)
}

/// Materialized form of a grounded iterator, or the collected items of a fresh cursor.
pub fn ground<N>(iter: &dyn SequenceIterator<N>) -> Result<XdmSequence<N>, Error> {
    if let Some(items) = iter.materialize() {
        return Ok(items);
    }
    let mut fork = iter.get_another()?;
    collect(fork.as_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::SimpleNode;
    use crate::xdm::XdmAtomicValue;

    fn ints(v: &[i64]) -> SequenceIter<SimpleNode> {
        from_vec(v.iter().map(|i| XdmItem::Atomic(XdmAtomicValue::Integer(*i))).collect())
    }

    #[test]
    fn list_iter_is_fused_and_forks() {
        let mut it = ints(&[1, 2]);
        assert_eq!(it.position(), 0);
        it.next_item().unwrap();
        let mut other = it.get_another().unwrap();
        it.next_item().unwrap();
        assert!(it.next_item().unwrap().is_none());
        assert!(it.next_item().unwrap().is_none());
        assert_eq!(it.position(), 2);
        assert_eq!(collect(other.as_mut()).unwrap().len(), 2);
    }

    #[test]
    fn count_uses_last_position() {
        let mut it = ints(&[1, 2, 3]);
        assert!(it.properties().contains(IterProperties::LAST_POSITION_FINDER));
        assert_eq!(count(it.as_mut()).unwrap(), 3);
        assert_eq!(it.position(), 0);
    }

    #[test]
    fn singleton_reports_position() {
        let mut it: SequenceIter<SimpleNode> = singleton(XdmAtomicValue::Boolean(true));
        assert_eq!(it.position(), 0);
        assert!(it.next_item().unwrap().is_some());
        assert_eq!(it.position(), 1);
        assert!(it.next_item().unwrap().is_none());
        assert_eq!(it.materialize().unwrap().len(), 1);
    }
}
