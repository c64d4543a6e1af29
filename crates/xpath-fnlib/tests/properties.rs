use proptest::prelude::*;
use xpath_fnlib::engine::iter;
use xpath_fnlib::{
    CallCtx, DynamicContext, Error, ExpandedName, SimpleNode, StaticArg, StaticContext, XdmAtomicValue, XdmItem,
    XdmSequence,
};

type Seq = XdmSequence<SimpleNode>;

fn eval(name: &str, args: Vec<Seq>) -> Result<Seq, Error> {
    let dc = DynamicContext::default();
    let sc = StaticContext::default();
    let statics = vec![StaticArg::Dynamic; args.len()];
    let bound = dc.functions.bind(&ExpandedName::local(name), &statics, &sc)?;
    bound.evaluate(&CallCtx::new(&dc, &sc), args.into_iter().map(iter::from_vec).collect())
}

fn atoms(values: impl IntoIterator<Item = XdmAtomicValue>) -> Seq {
    values.into_iter().map(XdmItem::Atomic).collect()
}

fn mixed_value() -> impl Strategy<Value = XdmAtomicValue> {
    prop_oneof![
        (-5i64..5).prop_map(XdmAtomicValue::Integer),
        "[a-c]{0,2}".prop_map(XdmAtomicValue::from),
        (-5i32..5).prop_map(|i| XdmAtomicValue::Double(f64::from(i))),
    ]
}

proptest! {
    #[test]
    fn distinct_values_is_idempotent(values in prop::collection::vec(mixed_value(), 0..20)) {
        let once = eval("distinct-values", vec![atoms(values.clone())]).unwrap();
        let twice = eval("distinct-values", vec![once.clone()]).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.len() <= values.len());
    }

    #[test]
    fn codepoints_round_trip(text in "[a-zA-Z0-9 \u{e0}-\u{ff}\u{3b1}-\u{3c9}\u{1F600}-\u{1F64F}]{0,24}") {
        let codepoints = eval("string-to-codepoints", vec![atoms([XdmAtomicValue::from(text.as_str())])]).unwrap();
        prop_assert_eq!(codepoints.len(), text.chars().count());
        let back = eval("codepoints-to-string", vec![codepoints]).unwrap();
        prop_assert_eq!(back, atoms([XdmAtomicValue::from(text.as_str())]));
    }

    #[test]
    fn substring_splits_partition_the_string(text in "[a-z]{0,16}", k in 0usize..20) {
        let k = k.min(text.len());
        let split = i64::try_from(k).unwrap();
        let s = || atoms([XdmAtomicValue::from(text.as_str())]);
        let head = eval("substring", vec![s(), atoms([1i64.into()]), atoms([split.into()])]).unwrap();
        let tail = eval("substring", vec![s(), atoms([(split + 1).into()])]).unwrap();
        let joined = format!("{}{}", head[0].string_value(), tail[0].string_value());
        prop_assert_eq!(joined, text);
    }

    #[test]
    fn sum_count_and_bounds_agree(values in prop::collection::vec(-1000i64..1000, 1..30)) {
        let input = || atoms(values.iter().copied().map(XdmAtomicValue::Integer));
        let expected_sum: i64 = values.iter().sum();
        prop_assert_eq!(eval("sum", vec![input()]).unwrap(), atoms([expected_sum.into()]));
        let expected_count = i64::try_from(values.len()).unwrap();
        prop_assert_eq!(eval("count", vec![input()]).unwrap(), atoms([expected_count.into()]));
        let min = values.iter().copied().min().unwrap();
        let max = values.iter().copied().max().unwrap();
        prop_assert_eq!(eval("min", vec![input()]).unwrap(), atoms([min.into()]));
        prop_assert_eq!(eval("max", vec![input()]).unwrap(), atoms([max.into()]));
    }
}
