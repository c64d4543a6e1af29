use super::{ListIter, SequenceIter, SequenceIterator};
use crate::engine::runtime::Error;
use crate::model::XdmNode;
use crate::xdm::XdmItem;
use std::sync::Arc;

pub type MapFn<N> = Arc<dyn Fn(XdmItem<N>) -> Result<SequenceIter<N>, Error>>;
pub type ItemMapFn<N> = Arc<dyn Fn(XdmItem<N>) -> Result<Option<XdmItem<N>>, Error>>;

/// Maps each base item to a sequence and concatenates the results.
pub struct MappingIterator<N> {
    base: SequenceIter<N>,
    f: MapFn<N>,
    current: Option<SequenceIter<N>>,
    position: usize,
    done: bool,
}

impl<N> MappingIterator<N> {
    pub fn new(base: SequenceIter<N>, f: MapFn<N>) -> Self {
        Self { base, f, current: None, position: 0, done: false }
    }
}

impl<N: 'static> SequenceIterator<N> for MappingIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        if self.done {
            return Ok(None);
        }
        loop {
            if let Some(cur) = self.current.as_mut() {
                if let Some(item) = cur.next_item()? {
                    self.position += 1;
                    return Ok(Some(item));
                }
                self.current = None;
            }
            match self.base.next_item()? {
                Some(item) => self.current = Some((self.f)(item)?),
                None => {
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }

    fn position(&self) -> usize {
        self.position
    }

    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(MappingIterator::new(self.base.get_another()?, self.f.clone())))
    }
}

/// Maps each base item to zero or one item.
pub struct ItemMappingIterator<N> {
    base: SequenceIter<N>,
    f: ItemMapFn<N>,
    position: usize,
    done: bool,
}

impl<N> ItemMappingIterator<N> {
    pub fn new(base: SequenceIter<N>, f: ItemMapFn<N>) -> Self {
        Self { base, f, position: 0, done: false }
    }
}

impl<N: 'static> SequenceIterator<N> for ItemMappingIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        if self.done {
            return Ok(None);
        }
        while let Some(item) = self.base.next_item()? {
            if let Some(mapped) = (self.f)(item)? {
                self.position += 1;
                return Ok(Some(mapped));
            }
        }
        self.done = true;
        Ok(None)
    }

    fn position(&self) -> usize {
        self.position
    }

    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(ItemMappingIterator::new(self.base.get_another()?, self.f.clone())))
    }
}

/// Lazily atomize a sequence: atomic items pass through, nodes expand to their typed value.
pub fn atomize<N: XdmNode>(base: SequenceIter<N>) -> SequenceIter<N> {
    let f: MapFn<N> = Arc::new(|item: XdmItem<N>| -> Result<SequenceIter<N>, Error> {
        Ok(match item {
            XdmItem::Atomic(_) => super::singleton(item),
            XdmItem::Node(n) => {
                let values: Vec<XdmItem<N>> = n.typed_value().into_iter().map(XdmItem::Atomic).collect();
                Box::new(ListIter::new(values.into()))
            }
        })
    });
    Box::new(MappingIterator::new(base, f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter::{collect, from_vec};
    use crate::simple_node::{SimpleNode, elem, text};
    use crate::xdm::XdmAtomicValue;

    #[test]
    fn mapping_flattens_and_forks() {
        let base = from_vec::<SimpleNode>(vec![XdmAtomicValue::Integer(2).into(), XdmAtomicValue::Integer(3).into()]);
        let f: MapFn<SimpleNode> = Arc::new(|item| {
            let n = match item {
                XdmItem::Atomic(XdmAtomicValue::Integer(i)) => i,
                _ => 0,
            };
            Ok(from_vec((0..n).map(|i| XdmAtomicValue::Integer(i).into()).collect()))
        });
        let mut it = MappingIterator::new(base, f);
        let mut fork = it.get_another().unwrap();
        assert_eq!(collect(&mut it).unwrap().len(), 5);
        assert_eq!(it.position(), 5);
        assert_eq!(collect(fork.as_mut()).unwrap().len(), 5);
    }

    #[test]
    fn atomize_uses_typed_value() {
        let e = elem("e").child(text("42")).build();
        let mut it = atomize(from_vec(vec![XdmItem::Node(e), XdmAtomicValue::Integer(1).into()]));
        let items = collect(it.as_mut()).unwrap();
        assert_eq!(items[0], XdmItem::Atomic(XdmAtomicValue::UntypedAtomic("42".into())));
        assert_eq!(items[1], XdmItem::Atomic(XdmAtomicValue::Integer(1)));
    }
}
