use rstest::{fixture, rstest};
use xpath_fnlib::consts::XS;
use xpath_fnlib::engine::functions::format_number::{DecimalFormatManager, DecimalSymbols};
use xpath_fnlib::engine::iter;
use xpath_fnlib::engine::runtime::HostLanguage;
use xpath_fnlib::{
    CallCtx, DynamicContextBuilder, Error, ErrorCode, ExpandedName, SimpleNode, StaticArg, StaticContext,
    StaticContextBuilder, XdmAtomicValue, XdmItem, XdmSequence,
};

type Seq = XdmSequence<SimpleNode>;

fn s(v: &str) -> Seq {
    vec![XdmItem::Atomic(XdmAtomicValue::from(v))]
}

fn dbl(v: f64) -> Seq {
    vec![XdmItem::Atomic(XdmAtomicValue::Double(v))]
}

#[fixture]
fn xslt() -> StaticContext {
    let mut formats = DecimalFormatManager::new();
    let eu = DecimalSymbols { decimal_separator: ',', grouping_separator: '.', ..DecimalSymbols::default() };
    formats.set_named(ExpandedName::local("eu"), eu, 0).unwrap();
    StaticContextBuilder::new().with_host_language(HostLanguage::Xslt).with_decimal_formats(formats).build()
}

/// Bind with every argument known only at run time unless `literal` is set.
fn eval_with(sc: &StaticContext, name: &ExpandedName, args: Vec<Seq>, literal: bool) -> Result<Seq, Error> {
    let dc = DynamicContextBuilder::new().build();
    let statics: Vec<StaticArg> = args
        .iter()
        .map(|a| match a.as_slice() {
            [XdmItem::Atomic(v)] if literal => StaticArg::Literal(v.clone()),
            [] => StaticArg::EmptySequence,
            _ => StaticArg::Dynamic,
        })
        .collect();
    let bound = dc.functions.bind(name, &statics, sc)?;
    bound.evaluate(&CallCtx::new(&dc, sc), args.into_iter().map(iter::from_vec).collect())
}

fn eval(sc: &StaticContext, name: &str, args: Vec<Seq>) -> Result<Seq, Error> {
    eval_with(sc, &ExpandedName::local(name), args, true)
}

fn xs(sc: &StaticContext, type_name: &str, lexical: &str) -> Seq {
    eval_with(sc, &ExpandedName::ns(XS, type_name), vec![s(lexical)], false).unwrap()
}

#[rstest]
#[case(1234.5, "#,##0.00", "1,234.50")]
#[case(0.25, "0%", "25%")]
#[case(-5.0, "0;(0)", "(5)")]
#[case(12.0, "0000", "0012")]
#[case(f64::NAN, "0", "NaN")]
fn format_number_default_format(xslt: StaticContext, #[case] n: f64, #[case] picture: &str, #[case] expected: &str) {
    assert_eq!(eval(&xslt, "format-number", vec![dbl(n), s(picture)]).unwrap(), s(expected));
}

#[rstest]
fn format_number_named_format(xslt: StaticContext) {
    let args = || vec![dbl(1234.5), s("#.##0,0"), s("eu")];
    assert_eq!(eval(&xslt, "format-number", args()).unwrap(), s("1.234,5"));
    // Same result when the name is only known at run time.
    let dynamic = eval_with(&xslt, &ExpandedName::local("format-number"), args(), false).unwrap();
    assert_eq!(dynamic, s("1.234,5"));
}

#[rstest]
fn format_number_errors(xslt: StaticContext) {
    let unknown = eval(&xslt, "format-number", vec![dbl(1.0), s("0"), s("nope")]).unwrap_err();
    assert_eq!(unknown.code_enum(), ErrorCode::XTDE1280);
    let bad_picture = eval(&xslt, "format-number", vec![dbl(1.0), s("0;0;0")]).unwrap_err();
    assert_eq!(bad_picture.code_enum(), ErrorCode::XTDE1310);
    let xpath = eval(&StaticContext::default(), "format-number", vec![dbl(1.0), s("0")]).unwrap_err();
    assert_eq!(xpath.code_enum(), ErrorCode::XPST0017);
}

#[rstest]
#[case("[Y0001]-[M01]-[D01]", "2002-12-31")]
#[case("[D1o] [MNn], [Y]", "31st December, 2002")]
#[case("[FNn], [D] [MNn,*-3]", "Tuesday, 31 Dec")]
#[case("[YI]", "MMII")]
#[case("[[[Y]]]", "[2002]")]
fn format_date_pictures(xslt: StaticContext, #[case] picture: &str, #[case] expected: &str) {
    let date = xs(&xslt, "date", "2002-12-31");
    assert_eq!(eval(&xslt, "format-date", vec![date, s(picture)]).unwrap(), s(expected));
}

#[rstest]
fn format_date_time_and_time(xslt: StaticContext) {
    let dt = xs(&xslt, "dateTime", "2002-12-31T15:58:45.762+02:00");
    assert_eq!(eval(&xslt, "format-dateTime", vec![dt, s("[h].[m01] [Pn] [Z]")]).unwrap(), s("3.58 p.m. +02:00"));
    let t = xs(&xslt, "time", "09:05:00");
    assert_eq!(eval(&xslt, "format-time", vec![t, s("[H01]:[m01]")]).unwrap(), s("09:05"));
}

#[rstest]
fn format_date_five_arguments(xslt: StaticContext) {
    let date = || xs(&xslt, "date", "2002-12-31");
    let out = eval(&xslt, "format-date", vec![date(), s("[D]"), s("de"), s("AD"), vec![]]).unwrap();
    assert_eq!(out, s("[Language: en]31"));
    let out = eval(&xslt, "format-date", vec![date(), s("[D]"), s("en"), s("JE"), vec![]]).unwrap();
    assert_eq!(out, s("[Calendar: AD]31"));
    let three = eval(&xslt, "format-date", vec![date(), s("[D]"), s("en")]).unwrap_err();
    assert_eq!(three.code_enum(), ErrorCode::XPST0017);
}

#[rstest]
fn format_date_errors(xslt: StaticContext) {
    let t = xs(&xslt, "time", "10:00:00");
    let err = eval(&xslt, "format-time", vec![t.clone(), s("[Y]")]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XTDE1350);
    let err = eval(&xslt, "format-time", vec![t, s("[H")]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XTDE1340);
    assert!(eval(&xslt, "format-date", vec![vec![], s("[D]")]).unwrap().is_empty());
}
