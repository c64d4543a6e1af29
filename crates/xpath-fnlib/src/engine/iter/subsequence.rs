use super::{SequenceIter, SequenceIterator};
use crate::engine::runtime::Error;
use crate::xdm::XdmItem;

/// Items of the base at positions `min..=max` (1-based). `max` of `None` means "to the end".
/// Stops pulling from the base as soon as `max` is reached.
pub struct SubsequenceIterator<N> {
    base: SequenceIter<N>,
    min: usize,
    max: Option<usize>,
    base_position: usize,
    position: usize,
    done: bool,
}

impl<N> SubsequenceIterator<N> {
    pub fn new(base: SequenceIter<N>, min: usize, max: Option<usize>) -> Self {
        let min = min.max(1);
        let done = max.is_some_and(|m| m < min);
        Self { base, min, max, base_position: 0, position: 0, done }
    }
}

impl<N: 'static> SequenceIterator<N> for SubsequenceIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        if self.done {
            return Ok(None);
        }
        while self.base_position + 1 < self.min {
            if self.base.next_item()?.is_none() {
                self.done = true;
                return Ok(None);
            }
            self.base_position += 1;
        }
        match self.base.next_item()? {
            Some(item) => {
                self.base_position += 1;
                self.position += 1;
                if self.max.is_some_and(|m| self.base_position >= m) {
                    self.done = true;
                }
                Ok(Some(item))
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    fn position(&self) -> usize {
        self.position
    }

    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(SubsequenceIterator::new(self.base.get_another()?, self.min, self.max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter::{collect, from_vec};
    use crate::simple_node::SimpleNode;
    use crate::xdm::XdmAtomicValue;

    fn run(min: usize, max: Option<usize>) -> Vec<String> {
        let base = from_vec::<SimpleNode>((1..=5).map(|i| XdmAtomicValue::Integer(i).into()).collect());
        let mut it = SubsequenceIterator::new(base, min, max);
        collect(&mut it).unwrap().iter().map(XdmItem::string_value).collect()
    }

    #[test]
    fn window_bounds() {
        assert_eq!(run(2, Some(3)), ["2", "3"]);
        assert_eq!(run(4, None), ["4", "5"]);
        assert_eq!(run(3, Some(2)), Vec::<String>::new());
        assert_eq!(run(9, None), Vec::<String>::new());
    }
}
