use rstest::rstest;
use xpath_fnlib::consts::SIMPLE_CASE_URI;
use xpath_fnlib::engine::iter;
use xpath_fnlib::{
    CallCtx, DynamicContext, DynamicContextBuilder, Error, ErrorCode, ExpandedName, SimpleNode, StaticArg,
    StaticContext, XdmAtomicValue, XdmItem, XdmSequence, elem, text,
};

type Seq = XdmSequence<SimpleNode>;

fn s(v: &str) -> Seq {
    vec![XdmItem::Atomic(XdmAtomicValue::from(v))]
}

fn int(v: i64) -> Seq {
    vec![XdmItem::Atomic(XdmAtomicValue::Integer(v))]
}

fn static_arg(arg: &Seq) -> StaticArg {
    match arg.as_slice() {
        [] => StaticArg::EmptySequence,
        [XdmItem::Atomic(a)] => StaticArg::Literal(a.clone()),
        _ => StaticArg::Dynamic,
    }
}

fn eval_in(dc: &DynamicContext<SimpleNode>, name: &str, args: Vec<Seq>) -> Result<Seq, Error> {
    let sc = StaticContext::default();
    let statics: Vec<StaticArg> = args.iter().map(static_arg).collect();
    let call = dc.functions.bind(&ExpandedName::local(name), &statics, &sc)?;
    call.evaluate(&CallCtx::new(dc, &sc), args.into_iter().map(iter::from_vec).collect())
}

fn eval(name: &str, args: Vec<Seq>) -> Result<Seq, Error> {
    eval_in(&DynamicContextBuilder::new().build(), name, args)
}

fn as_string(out: &Seq) -> String {
    match out.as_slice() {
        [XdmItem::Atomic(XdmAtomicValue::String(v))] => v.clone(),
        other => panic!("expected one string, got {other:?}"),
    }
}

#[rstest]
#[case("upper-case", vec![s("abc")], "ABC")]
#[case("lower-case", vec![s("ÄBC")], "äbc")]
#[case("normalize-space", vec![s("  a \t b\n ")], "a b")]
#[case("translate", vec![s("bar"), s("abc"), s("ABC")], "BAr")]
#[case("translate", vec![s("--aaa--"), s("abc-"), s("ABC")], "AAA")]
#[case("substring", vec![s("motor car"), int(6)], " car")]
#[case("substring", vec![s("metadata"), int(4), int(3)], "ada")]
#[case("substring", vec![s("12345"), vec![XdmItem::Atomic(XdmAtomicValue::Double(1.5))], vec![XdmItem::Atomic(XdmAtomicValue::Double(2.6))]], "234")]
#[case("concat", vec![s("un"), s("grateful"), vec![], s("ly")], "ungratefully")]
#[case("string-join", vec![vec![XdmAtomicValue::from("a").into(), XdmAtomicValue::from("b").into()], s("-")], "a-b")]
#[case("codepoints-to-string", vec![vec![XdmAtomicValue::Integer(72).into(), XdmAtomicValue::Integer(105).into()]], "Hi")]
#[case("substring-before", vec![s("tattoo"), s("too")], "tat")]
#[case("substring-after", vec![s("tattoo"), s("tat")], "too")]
#[case("encode-for-uri", vec![s("100% organic")], "100%25%20organic")]
#[case("normalize-unicode", vec![s("e\u{301}")], "\u{e9}")]
fn string_results(#[case] name: &str, #[case] args: Vec<Seq>, #[case] expected: &str) {
    assert_eq!(as_string(&eval(name, args).unwrap()), expected, "{name}");
}

#[test]
fn translate_handles_supplementary_characters() {
    let out = eval("translate", vec![s("a\u{1F600}b"), s("\u{1F600}"), s("x")]).unwrap();
    assert_eq!(as_string(&out), "axb");
}

#[test]
fn string_length_defaults_to_context_item() {
    let node = elem("p").child(text("hello")).build();
    let dc = DynamicContextBuilder::new().with_context_item(XdmItem::Node(node)).build();
    let out = eval_in(&dc, "string-length", vec![]).unwrap();
    assert_eq!(out, int(5));
    let err = eval("string-length", vec![]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPDY0002);
}

#[test]
fn compare_uses_the_named_collation() {
    assert_eq!(eval("compare", vec![s("abc"), s("ABC")]).unwrap(), int(1));
    assert_eq!(eval("compare", vec![s("abc"), s("ABC"), s(SIMPLE_CASE_URI)]).unwrap(), int(0));
    assert!(eval("compare", vec![vec![], s("a")]).unwrap().is_empty());
}

#[test]
fn substring_matching_needs_codepoint_collation() {
    let ok = eval("contains", vec![s("banana"), s("nan")]).unwrap();
    assert_eq!(ok, vec![XdmItem::Atomic(XdmAtomicValue::Boolean(true))]);
    let err = eval("contains", vec![s("banana"), s("NAN"), s(SIMPLE_CASE_URI)]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FOCH0004);
    let unknown = eval("contains", vec![s("a"), s("a"), s("http://example.com/nope")]).unwrap_err();
    assert_eq!(unknown.code_enum(), ErrorCode::FOCH0002);
}

#[rstest]
#[case(0x0)]
#[case(0xFFFE)]
#[case(0x11_0000)]
fn invalid_codepoints_are_rejected(#[case] cp: i64) {
    let err = eval("codepoints-to-string", vec![int(cp)]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FOCH0001);
}

#[test]
fn regex_functions() {
    let out = eval("matches", vec![s("Abracadabra"), s("^a.*a$"), s("i")]).unwrap();
    assert_eq!(out, vec![XdmItem::Atomic(XdmAtomicValue::Boolean(true))]);
    assert_eq!(as_string(&eval("replace", vec![s("abracadabra"), s("a(.)"), s("a$1$1")]).unwrap()), "abbraccaddabbra");
    let tokens = eval("tokenize", vec![s("2006-12-25"), s("-")]).unwrap();
    assert_eq!(tokens, vec![s("2006")[0].clone(), s("12")[0].clone(), s("25")[0].clone()]);
    assert!(eval("tokenize", vec![s(""), s(",")]).unwrap().is_empty());
    let err = eval("tokenize", vec![s("abc"), s(".*")]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FORX0003);
}
