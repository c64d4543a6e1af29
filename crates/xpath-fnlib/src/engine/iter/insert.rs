use super::{SequenceIter, SequenceIterator};
use crate::engine::runtime::Error;
use crate::xdm::XdmItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Before,
    Inserting,
    After,
    Done,
}

/// `insert-before`: the insert sequence is spliced in before the base item at
/// `insert_position` (1-based). Positions below 1 insert at the front; positions past the
/// end append. Both inputs are read once, without buffering.
pub struct InsertIterator<N> {
    base: SequenceIter<N>,
    insert: SequenceIter<N>,
    insert_position: i64,
    base_position: i64,
    phase: Phase,
    position: usize,
}

impl<N> InsertIterator<N> {
    pub fn new(base: SequenceIter<N>, insert: SequenceIter<N>, insert_position: i64) -> Self {
        Self {
            base,
            insert,
            insert_position: insert_position.max(1),
            base_position: 0,
            phase: Phase::Before,
            position: 0,
        }
    }

    fn advance(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        loop {
            match self.phase {
                Phase::Before => {
                    if self.base_position + 1 == self.insert_position {
                        self.phase = Phase::Inserting;
                        continue;
                    }
                    match self.base.next_item()? {
                        Some(item) => {
                            self.base_position += 1;
                            return Ok(Some(item));
                        }
                        None => {
                            // Position past the end: append, then stop.
                            self.phase = Phase::Inserting;
                            self.base_position = i64::MAX;
                        }
                    }
                }
                Phase::Inserting => match self.insert.next_item()? {
                    Some(item) => return Ok(Some(item)),
                    None if self.base_position == i64::MAX => self.phase = Phase::Done,
                    None => self.phase = Phase::After,
                },
                Phase::After => match self.base.next_item()? {
                    Some(item) => return Ok(Some(item)),
                    None => self.phase = Phase::Done,
                },
                Phase::Done => return Ok(None),
            }
        }
    }
}

impl<N: 'static> SequenceIterator<N> for InsertIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        let item = self.advance()?;
        if item.is_some() {
            self.position += 1;
        }
        Ok(item)
    }

    fn position(&self) -> usize {
        self.position
    }

    fn get_another(&self) -> Result<SequenceIter<N>, Error> {
        Ok(Box::new(InsertIterator::new(
            self.base.get_another()?,
            self.insert.get_another()?,
            self.insert_position,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter::{collect, from_vec};
    use crate::simple_node::SimpleNode;
    use crate::xdm::XdmAtomicValue;

    fn strs(v: &[&str]) -> SequenceIter<SimpleNode> {
        from_vec(v.iter().map(|s| XdmAtomicValue::from(*s).into()).collect())
    }

    fn run(pos: i64) -> Vec<String> {
        let mut it = InsertIterator::new(strs(&["a", "b", "c"]), strs(&["x", "y"]), pos);
        collect(&mut it).unwrap().iter().map(XdmItem::string_value).collect()
    }

    #[test]
    fn inserts_at_position() {
        assert_eq!(run(2), ["a", "x", "y", "b", "c"]);
        assert_eq!(run(0), ["x", "y", "a", "b", "c"]);
        assert_eq!(run(4), ["a", "b", "c", "x", "y"]);
        assert_eq!(run(99), ["a", "b", "c", "x", "y"]);
    }
}
