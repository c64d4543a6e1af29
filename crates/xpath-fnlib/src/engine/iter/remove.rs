use super::{SequenceIter, SequenceIterator};
use crate::engine::runtime::Error;
use crate::xdm::XdmItem;

/// Drops the base item at `remove_at` (1-based). Out-of-range positions drop nothing.
/// The base counter belongs to this cursor; `get_another` starts a new one from zero.
pub struct RemoveIterator<N> {
    base: SequenceIter<N>,
    remove_at: i64,
    base_position: i64,
    position: usize,
}

impl<N> RemoveIterator<N> {
    pub fn new(base: SequenceIter<N>, remove_at: i64) -> Self {
        Self { base, remove_at, base_position: 0, position: 0 }
    }
}

impl<N: 'static> SequenceIterator<N> for RemoveIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        while let Some(item) = self.base.next_item()? {
            self.base_position += 1;
            if self.base_position != self.remove_at {
                self.position += 1;
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    fn position(&self) -> usize {
        self.position
    }

    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(RemoveIterator::new(self.base.get_another()?, self.remove_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter::{collect, from_vec};
    use crate::simple_node::SimpleNode;
    use crate::xdm::XdmAtomicValue;

    #[test]
    fn fork_restarts_counter() {
        let base = from_vec::<SimpleNode>(["a", "b", "c"].iter().map(|s| XdmAtomicValue::from(*s).into()).collect());
        let mut it = RemoveIterator::new(base, 2);
        it.next_item().unwrap();
        it.next_item().unwrap();
        let mut fork = it.get_another().unwrap();
        let out: Vec<String> = collect(fork.as_mut()).unwrap().iter().map(XdmItem::string_value).collect();
        assert_eq!(out, ["a", "c"]);
        assert!(it.next_item().unwrap().is_none());
    }
}
