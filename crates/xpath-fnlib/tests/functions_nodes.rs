use rstest::{fixture, rstest};
use xpath_fnlib::engine::iter;
use xpath_fnlib::engine::runtime::{HostLanguage, KeyDefinition, KeyManager};
use xpath_fnlib::simple_node::id_attr;
use xpath_fnlib::{
    CallCtx, DynamicContext, DynamicContextBuilder, Error, ErrorCode, ExpandedName, SimpleNode, StaticArg,
    StaticContext, StaticContextBuilder, XdmAtomicValue, XdmItem, XdmNode, XdmSequence, attr, elem, ns, simple_doc,
    text,
};

type Seq = XdmSequence<SimpleNode>;

fn s(v: &str) -> Seq {
    vec![XdmItem::Atomic(XdmAtomicValue::from(v))]
}

fn node(n: &SimpleNode) -> Seq {
    vec![XdmItem::Node(n.clone())]
}

fn eval_full(dc: &DynamicContext<SimpleNode>, sc: &StaticContext, name: &str, args: Vec<Seq>) -> Result<Seq, Error> {
    let statics = vec![StaticArg::Dynamic; args.len()];
    let bound = dc.functions.bind(&ExpandedName::local(name), &statics, sc)?;
    bound.evaluate(&CallCtx::new(dc, sc), args.into_iter().map(iter::from_vec).collect())
}

fn eval(name: &str, args: Vec<Seq>) -> Result<Seq, Error> {
    eval_full(&DynamicContext::default(), &StaticContext::default(), name, args)
}

fn xslt() -> StaticContext {
    StaticContextBuilder::new().with_host_language(HostLanguage::Xslt).build()
}

#[fixture]
fn library() -> SimpleNode {
    let book = |id: &str, genre: &str, title: &str| {
        elem("book").attr(id_attr("id", id)).attr(attr("genre", genre)).child(text(title))
    };
    simple_doc()
        .document_uri("http://example.com/library.xml")
        .child(
            elem("library")
                .attr(attr("xml:lang", "en-GB"))
                .namespace(ns("b", "urn:books"))
                .child(book("b1", "sf", "Dune"))
                .child(book("b2", "sf", "Solaris"))
                .child(book("b3", "crime", "Rebecca")),
        )
        .build()
}

fn books(library: &SimpleNode) -> Vec<SimpleNode> {
    library.children()[0].children()
}

fn titles(seq: &Seq) -> Vec<String> {
    seq.iter().map(XdmItem::string_value).collect()
}

#[test]
fn name_accessors() {
    let e = SimpleNode::element_ns("b", "urn:books", "book").build();
    assert_eq!(eval("name", vec![node(&e)]).unwrap(), s("b:book"));
    assert_eq!(eval("local-name", vec![node(&e)]).unwrap(), s("book"));
    assert_eq!(
        eval("namespace-uri", vec![node(&e)]).unwrap(),
        vec![XdmItem::Atomic(XdmAtomicValue::AnyUri("urn:books".into()))]
    );
    assert_eq!(
        eval("node-name", vec![node(&e)]).unwrap(),
        vec![XdmItem::Atomic(XdmAtomicValue::qname(Some("urn:books"), Some("b"), "book"))]
    );
    assert_eq!(eval("name", vec![vec![]]).unwrap(), s(""));
    assert!(eval("node-name", vec![node(&text("t"))]).unwrap().is_empty());
}

#[rstest]
fn name_defaults_to_the_context_item(library: SimpleNode) {
    let first = books(&library)[0].clone();
    let dc = DynamicContextBuilder::new().with_context_item(XdmItem::Node(first)).build();
    assert_eq!(eval_full(&dc, &StaticContext::default(), "name", vec![]).unwrap(), s("book"));
    let atomic = DynamicContextBuilder::new().with_context_item(XdmAtomicValue::from("x")).build();
    let err = eval_full(&atomic, &StaticContext::default(), "name", vec![]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn root_document_uri_and_lang(library: SimpleNode) {
    let dune = books(&library)[0].clone();
    assert_eq!(eval("root", vec![node(&dune)]).unwrap(), node(&library));
    assert_eq!(
        eval("document-uri", vec![node(&library)]).unwrap(),
        vec![XdmItem::Atomic(XdmAtomicValue::AnyUri("http://example.com/library.xml".into()))]
    );
    assert!(eval("document-uri", vec![node(&dune)]).unwrap().is_empty());
    let t = vec![XdmItem::Atomic(XdmAtomicValue::Boolean(true))];
    assert_eq!(eval("lang", vec![s("en"), node(&dune)]).unwrap(), t);
    assert_ne!(eval("lang", vec![s("fr"), node(&dune)]).unwrap(), t);
}

#[rstest]
fn namespace_functions(library: SimpleNode) {
    let root = library.children()[0].clone();
    let prefixes = eval("in-scope-prefixes", vec![node(&root)]).unwrap();
    assert!(titles(&prefixes).contains(&"b".to_string()));
    assert_eq!(
        eval("namespace-uri-for-prefix", vec![s("b"), node(&root)]).unwrap(),
        vec![XdmItem::Atomic(XdmAtomicValue::AnyUri("urn:books".into()))]
    );
    assert!(eval("namespace-uri-for-prefix", vec![s("zz"), node(&root)]).unwrap().is_empty());
}

#[rstest]
fn id_lookup_is_in_document_order(library: SimpleNode) {
    let found = eval("id", vec![s("b3 b1 nope"), node(&library)]).unwrap();
    assert_eq!(titles(&found), vec!["Dune", "Rebecca"]);
    let dc = DynamicContextBuilder::new().with_context_item(XdmItem::Node(library.clone())).build();
    let from_context = eval_full(&dc, &StaticContext::default(), "id", vec![s("b2")]).unwrap();
    assert_eq!(titles(&from_context), vec!["Solaris"]);
    let orphan = elem("x").attr(id_attr("id", "b1")).build();
    let err = eval("id", vec![s("b1"), node(&orphan)]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FODC0001);
}

#[test]
fn idref_finds_referring_attributes() {
    let d = simple_doc()
        .child(
            elem("r")
                .child(elem("a").attr(id_attr("id", "x")))
                .child(elem("link").attr(SimpleNode::idrefs_attribute("to", "x y"))),
        )
        .build();
    let found = eval("idref", vec![s("x"), node(&d)]).unwrap();
    assert_eq!(titles(&found), vec!["x y"]);
}

#[rstest]
fn key_lookup(library: SimpleNode) {
    let mut keys = KeyManager::new();
    keys.add(
        ExpandedName::local("by-genre"),
        KeyDefinition::new(
            |n: &SimpleNode| n.name().is_some_and(|q| q.local == "book"),
            |n: &SimpleNode| {
                Ok(n.attributes()
                    .iter()
                    .filter(|a| a.name().is_some_and(|q| q.local == "genre"))
                    .map(|a| XdmAtomicValue::from(a.string_value()))
                    .collect())
            },
        ),
    );
    let dc = DynamicContextBuilder::new().with_keys(keys).build();
    let sc = xslt();
    let sf = eval_full(&dc, &sc, "key", vec![s("by-genre"), s("sf"), node(&library)]).unwrap();
    assert_eq!(titles(&sf), vec!["Dune", "Solaris"]);
    let both = vec![XdmItem::Atomic("crime".into()), XdmItem::Atomic("sf".into())];
    let all = eval_full(&dc, &sc, "key", vec![s("by-genre"), both, node(&library)]).unwrap();
    assert_eq!(titles(&all), vec!["Dune", "Solaris", "Rebecca"]);
    let undefined = eval_full(&dc, &sc, "key", vec![s("nope"), s("sf"), node(&library)]).unwrap_err();
    assert_eq!(undefined.code_enum(), ErrorCode::XTDE1260);
    let no_context = eval_full(&dc, &sc, "key", vec![s("by-genre"), s("sf")]).unwrap_err();
    assert_eq!(no_context.code_enum(), ErrorCode::XTDE1270);
}

#[rstest]
fn generate_id_identifies_nodes(library: SimpleNode) {
    let sc = xslt();
    let dc = DynamicContext::default();
    let [a, b, _] = <[SimpleNode; 3]>::try_from(books(&library)).unwrap();
    let id_a = eval_full(&dc, &sc, "generate-id", vec![node(&a)]).unwrap();
    let id_b = eval_full(&dc, &sc, "generate-id", vec![node(&b)]).unwrap();
    assert_ne!(id_a, id_b);
    assert_eq!(id_a, eval_full(&dc, &sc, "generate-id", vec![node(&books(&library)[0])]).unwrap());
    let id = titles(&id_a).remove(0);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(eval_full(&dc, &sc, "generate-id", vec![vec![]]).unwrap(), s(""));
}

#[test]
fn deep_equal_compares_structure() {
    let build = |title: &str| elem("book").attr(attr("genre", "sf")).child(text(title)).build();
    let t = vec![XdmItem::Atomic(XdmAtomicValue::Boolean(true))];
    let f = vec![XdmItem::Atomic(XdmAtomicValue::Boolean(false))];
    assert_eq!(eval("deep-equal", vec![node(&build("Dune")), node(&build("Dune"))]).unwrap(), t);
    assert_eq!(eval("deep-equal", vec![node(&build("Dune")), node(&build("Emma"))]).unwrap(), f);
    assert_eq!(eval("deep-equal", vec![s("a"), node(&build("a"))]).unwrap(), f);
    assert_eq!(eval("deep-equal", vec![vec![], vec![]]).unwrap(), t);
}
