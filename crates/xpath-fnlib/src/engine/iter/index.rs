use super::{SequenceIter, SequenceIterator};
use crate::engine::comparer::{AtomicComparer, GenericAtomicComparer, mask_incomparable};
use crate::engine::runtime::Error;
use crate::xdm::{XdmAtomicValue, XdmItem};

/// Positions (as `xs:integer`) of the items equal to `target`. Items that cannot be compared
/// with the target are skipped.
pub struct IndexIterator<N> {
    base: SequenceIter<N>,
    target: XdmAtomicValue,
    comparer: GenericAtomicComparer,
    base_position: i64,
    position: usize,
}

impl<N> IndexIterator<N> {
    pub fn new(base: SequenceIter<N>, target: XdmAtomicValue, comparer: GenericAtomicComparer) -> Self {
        Self { base, target, comparer, base_position: 0, position: 0 }
    }
}

impl<N: 'static> SequenceIterator<N> for IndexIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        while let Some(item) = self.base.next_item()? {
            self.base_position += 1;
            let XdmItem::Atomic(value) = &item else { continue };
            if mask_incomparable(self.comparer.equals(value, &self.target))? {
                self.position += 1;
                return Ok(Some(XdmItem::Atomic(XdmAtomicValue::Integer(self.base_position))));
            }
        }
        Ok(None)
    }

    fn position(&self) -> usize {
        self.position
    }

    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(IndexIterator::new(self.base.get_another()?, self.target.clone(), self.comparer.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter::{collect, from_vec};
    use crate::simple_node::SimpleNode;

    #[test]
    fn skips_incomparable_items() {
        let items: Vec<XdmItem<SimpleNode>> = vec![
            XdmAtomicValue::Integer(10).into(),
            XdmAtomicValue::from("10").into(),
            XdmAtomicValue::Double(10.0).into(),
        ];
        let mut it = IndexIterator::new(from_vec(items), XdmAtomicValue::Integer(10), GenericAtomicComparer::codepoint());
        let out = collect(&mut it).unwrap();
        assert_eq!(
            out,
            vec![XdmItem::Atomic(XdmAtomicValue::Integer(1)), XdmItem::Atomic(XdmAtomicValue::Integer(3))]
        );
    }
}
