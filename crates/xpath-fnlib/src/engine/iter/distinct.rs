use super::{SequenceIter, SequenceIterator};
use crate::engine::comparer::{AtomicComparer, ComparisonKey, GenericAtomicComparer, mask_incomparable};
use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::{XdmAtomicValue, XdmItem};
use std::collections::HashMap;

/// Yields each value of an atomized sequence once, at its first occurrence.
///
/// Values are bucketed by the comparer's [`ComparisonKey`] and then matched with `equals`
/// inside the bucket. NaN values collapse into one and strings are compared under the
/// comparer's collation.
pub struct DistinctIterator<N> {
    base: SequenceIter<N>,
    comparer: GenericAtomicComparer,
    seen: HashMap<ComparisonKey, Vec<XdmAtomicValue>>,
    position: usize,
}

impl<N> DistinctIterator<N> {
    pub fn new(base: SequenceIter<N>, comparer: GenericAtomicComparer) -> Self {
        Self { base, comparer, seen: HashMap::new(), position: 0 }
    }

    fn is_first(&mut self, value: &XdmAtomicValue) -> Result<bool, Error> {
        let key = self.comparer.comparison_key(value);
        let nan = key == ComparisonKey::NaN;
        let bucket = self.seen.entry(key).or_default();
        if nan && !bucket.is_empty() {
            return Ok(false);
        }
        for earlier in bucket.iter() {
            if mask_incomparable(self.comparer.equals(earlier, value))? {
                return Ok(false);
            }
        }
        bucket.push(value.clone());
        Ok(true)
    }
}

impl<N: 'static> SequenceIterator<N> for DistinctIterator<N> {
    fn next_item(&mut self) -> Result<Option<XdmItem<N>>, Error> {
        while let Some(item) = self.base.next_item()? {
            let XdmItem::Atomic(value) = &item else {
                return Err(Error::from_code(ErrorCode::XPTY0004, "distinct-values requires atomized input"));
            };
            if self.is_first(value)? {
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
        Ok(Box::new(DistinctIterator::new(self.base.get_another()?, self.comparer.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::iter::{collect, from_vec};
    use crate::simple_node::SimpleNode;
    use rust_decimal::Decimal;

    #[test]
    fn keeps_first_occurrence_and_one_nan() {
        let items: Vec<XdmItem<SimpleNode>> = vec![
            XdmAtomicValue::Integer(1).into(),
            XdmAtomicValue::Double(f64::NAN).into(),
            XdmAtomicValue::Double(1.0).into(),
            XdmAtomicValue::Float(f32::NAN).into(),
            XdmAtomicValue::from("a").into(),
            XdmAtomicValue::UntypedAtomic("a".into()).into(),
        ];
        let mut it = DistinctIterator::new(from_vec(items), GenericAtomicComparer::codepoint());
        let out = collect(&mut it).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], XdmItem::Atomic(XdmAtomicValue::Integer(1)));
        assert!(matches!(out[1], XdmItem::Atomic(XdmAtomicValue::Double(d)) if d.is_nan()));
    }

    #[test]
    fn float_and_decimal_duplicates_collapse() {
        let items: Vec<XdmItem<SimpleNode>> = vec![
            XdmAtomicValue::Float(0.1).into(),
            XdmAtomicValue::Decimal(Decimal::new(1, 1)).into(),
            XdmAtomicValue::Integer(16_777_217).into(),
            XdmAtomicValue::Integer(16_777_216).into(),
        ];
        let mut it = DistinctIterator::new(from_vec(items), GenericAtomicComparer::codepoint());
        let out = collect(&mut it).unwrap();
        assert_eq!(
            out,
            vec![
                XdmItem::Atomic(XdmAtomicValue::Float(0.1)),
                XdmItem::Atomic(XdmAtomicValue::Integer(16_777_217)),
                XdmItem::Atomic(XdmAtomicValue::Integer(16_777_216)),
            ]
        );
    }
}
