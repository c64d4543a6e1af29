use super::{ListIter, SequenceIter, SequenceIterator, collect};
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmItem, XdmSequence};
use core::cmp::Ordering;
use std::sync::Arc;

/// Nodes of the base sequence in document order, without duplicates.
///
/// Sorting needs the whole input, so the base is drained on construction; the result is
/// grounded.
pub struct DocumentOrderIterator<N> {
    inner: ListIter<N>,
}

impl<N: XdmNode> DocumentOrderIterator<N> {
    pub fn new(mut base: SequenceIter<N>) -> Result<Self, Error> {
        let nodes = collect(base.as_mut())?
            .into_iter()
            .map(|item| match item {
                XdmItem::Node(n) => Ok(n),
                XdmItem::Atomic(a) => Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!("expected a node, found {}", a.type_of()),
                )),
            })
            .collect::<Result<Vec<N>, Error>>()?;
        let sorted = sort_nodes(nodes)?;
        let items: XdmSequence<N> = sorted.into_iter().map(XdmItem::Node).collect();
        Ok(Self { inner: ListIter::new(Arc::from(items)) })
    }
}

/// Sort into document order and drop duplicates.
pub(crate) fn sort_nodes<N: XdmNode>(mut nodes: Vec<N>) -> Result<Vec<N>, Error> {
    let mut failure = None;
    nodes.sort_by(|a, b| {
        a.compare_document_order(b).unwrap_or_else(|e| {
            failure.get_or_insert(e);
            Ordering::Equal
        })
    });
    if let Some(e) = failure {
        return Err(e);
    }
    nodes.dedup();
    Ok(nodes)
}

impl<N: XdmNode> SequenceIterator<N> for DocumentOrderIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        self.inner.next_item()
    }
    fn position(&self) -> usize {
        self.inner.position()
    }
    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        self.inner.get_another()
    }
    fn properties(&self) -> super::IterProperties {
        self.inner.properties()
    }
    fn last_position(&mut self) -> Option<Result<usize, Error>> {
        self.inner.last_position()
    }
    fn materialize(&self) -> Option<XdmSequence<N>> {
        self.inner.materialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter::from_vec;
    use crate::simple_node::{doc, elem};

    #[test]
    fn sorts_and_dedups() {
        let d = doc().child(elem("r").child(elem("a")).child(elem("b"))).build();
        let r = d.children()[0].clone();
        let (a, b) = (r.children()[0].clone(), r.children()[1].clone());
        let base = from_vec(vec![XdmItem::Node(b.clone()), XdmItem::Node(a.clone()), XdmItem::Node(b.clone())]);
        let mut it = DocumentOrderIterator::new(base).unwrap();
        let out = collect(&mut it).unwrap();
        assert_eq!(out, vec![XdmItem::Node(a), XdmItem::Node(b)]);
    }
}
