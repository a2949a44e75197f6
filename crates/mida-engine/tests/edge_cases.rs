//! Edge case tests for mida-engine
//!
//! Malformed vocabulary, reference graphs that loop, writes that cannot
//! land, schemas that never load and references that cannot be fetched.

use mida_engine::dom::NodeId;
use mida_engine::net::StaticFetcher;
use mida_engine::{
    BindError, Config, FetchError, RenderError, Scope, SchemaError, SchemaKind, Source, Value,
};
use serde_json::json;
use std::rc::Rc;

fn scope_with(html: &str, fetcher: Rc<StaticFetcher>) -> Scope {
    let doc = mida_engine::html::HtmlParser::new()
        .parse_with_url(html, "https://a.test/page")
        .unwrap();
    Scope::standalone(doc, Config::default(), fetcher)
}

fn scope(html: &str) -> Scope {
    scope_with(html, Rc::new(StaticFetcher::new()))
}

fn node(scope: &Scope, id: &str) -> NodeId {
    scope.document().get_element_by_id(id).unwrap()
}

// ============================================================================
// ITEMREF GRAPHS
// ============================================================================

#[test]
fn test_itemref_cycle_terminates() {
    let s = scope(r#"
        <div id="a" itemscope itemref="b"><span itemprop="x">1</span></div>
        <div id="b" itemscope itemref="a"><span itemprop="y">2</span></div>
    "#);
    let a = s.extract(node(&s, "a")).unwrap();
    assert_eq!(a.get("x").and_then(|p| p.as_text()), Some("1"));
    assert_eq!(a.get("y").and_then(|p| p.as_text()), Some("2"));
    assert_eq!(a.get("x").map(|p| p.len()), Some(1));
}

#[test]
fn test_self_reference_terminates() {
    let s = scope(r#"<div id="a" itemscope itemref="a"><span itemprop="x">1</span></div>"#);
    let a = s.extract(node(&s, "a")).unwrap();
    assert_eq!(a.keys(), vec!["@id", "x"]);
    assert_eq!(a.get("x").map(|p| p.len()), Some(1));
}

#[test]
fn test_duplicate_and_missing_itemref_targets() {
    let s = scope(r#"
        <div id="a" itemscope itemref="enc enc nowhere"></div>
        <p id="enc" itemprop="encryption">plaintext</p>
    "#);
    let a = s.extract(node(&s, "a")).unwrap();
    assert_eq!(a.to_json(), json!({"@id": "https://a.test/page#a", "encryption": "plaintext"}));
}

#[test]
fn test_itemref_resolution_is_stable() {
    let s = scope(r#"
        <div id="a" itemscope itemref="b c"><span itemprop="x">1</span></div>
        <p id="b" itemprop="y">2</p>
        <p id="c" itemprop="y">3</p>
    "#);
    let first = s.extract(node(&s, "a")).unwrap();
    let second = s.extract(node(&s, "a")).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json()["y"], json!(["2", "3"]));
}

// ============================================================================
// MALFORMED VOCABULARY
// ============================================================================

#[test]
fn test_malformed_type_and_identity_are_omitted() {
    let s = scope(r#"
        <div id="t" itemscope itemtype="not a url"><span itemprop="n">1</span></div>
        <div id="host"><div id="i" itemprop="v" itemscope itemid="http://[::1"></div></div>
    "#);
    let t = s.extract(node(&s, "t")).unwrap();
    assert!(t.item_type().is_none());
    assert_eq!(t.keys(), vec!["@id", "n"]);

    let i = s.extract(node(&s, "i")).unwrap();
    assert_eq!(i.identity(), None);
}

#[test]
fn test_unparsable_itemid_without_id() {
    let s = scope(
        r#"<section id="s"><div itemscope itemid="http://[::1"><b itemprop="n">1</b></div></section>"#,
    );
    let host = node(&s, "s");
    let scoped = s.document().tree().first_element_child(host).unwrap();
    let item = s.extract(scoped).unwrap();
    assert_eq!(item.identity(), None);
    assert_eq!(item.to_json(), json!({"n": "1"}));
}

#[test]
fn test_empty_scope_and_plain_node() {
    let s = scope(r#"<div id="e" itemscope></div><p id="p">text</p>"#);
    assert_eq!(
        s.extract(node(&s, "e")).unwrap().to_json(),
        json!({"@id": "https://a.test/page#e"})
    );
    assert!(s.item(node(&s, "p")).is_none());
}

#[test]
fn test_properties_inside_templates_are_inert() {
    let s = scope(r#"
        <div id="a" itemscope>
          <span itemprop="live">yes</span>
          <template><span itemprop="inert">no</span></template>
        </div>
        <template><div id="ghost" itemscope></div></template>
    "#);
    assert_eq!(s.extract(node(&s, "a")).unwrap().keys(), vec!["@id", "live"]);
    assert_eq!(s.collection().keys(), vec!["a"]);
}

// ============================================================================
// WRITES
// ============================================================================

#[test]
fn test_reserved_and_unknown_keys_rejected() {
    let s = scope(r#"<div id="p" itemscope><span itemprop="name">Ada</span></div>"#);
    let item = s.item(node(&s, "p")).unwrap();
    assert!(matches!(item.set("@id", &json!("x")), Err(BindError::NotWritable { .. })));
    assert_eq!(item.set("missing", &json!("x")), Err(BindError::UnknownProperty("missing".into())));
    assert_eq!(item.get_json("name"), Some(json!("Ada")));
}

#[test]
fn test_scalar_into_nested_item_rejected() {
    let s = scope(r#"
        <div id="org" itemscope>
          <div id="f" itemprop="founder" itemscope><span itemprop="name">Ada</span></div>
        </div>
    "#);
    let org = s.item(node(&s, "org")).unwrap();
    assert!(matches!(org.set("founder", &json!("Ada")), Err(BindError::NotWritable { .. })));

    org.set("founder", &json!({"name": "Grace"})).unwrap();
    let founder = s.item(node(&s, "f")).unwrap();
    s.flush();
    assert_eq!(founder.get_json("name"), Some(json!("Grace")));
}

#[test]
fn test_object_into_text_rejected() {
    let s = scope(r#"<div id="p" itemscope><span itemprop="name">Ada</span></div>"#);
    let item = s.item(node(&s, "p")).unwrap();
    assert!(matches!(
        item.set("name", &json!({"first": "Ada"})),
        Err(BindError::NotWritable { .. })
    ));
}

#[test]
fn test_short_array_leaves_extra_nodes() {
    let s = scope(r#"
        <div id="p" itemscope>
          <span itemprop="role">a</span>
          <span itemprop="role">b</span>
        </div>
    "#);
    let item = s.item(node(&s, "p")).unwrap();
    item.set("role", &json!(["editor"])).unwrap();
    assert_eq!(item.get_json("role"), Some(json!(["editor", "b"])));

    item.set("role", &json!("solo")).unwrap();
    assert_eq!(item.get_json("role"), Some(json!(["solo", "b"])));
}

#[test]
fn test_scalar_kinds_are_written_as_text() {
    let s = scope(
        r#"<div id="p" itemscope><meta itemprop="age" content="0"><b itemprop="ok"></b></div>"#,
    );
    let item = s.item(node(&s, "p")).unwrap();
    item.set("age", &json!(36)).unwrap();
    item.set("ok", &json!(true)).unwrap();
    assert_eq!(item.get_json("age"), Some(json!("36")));
    assert_eq!(item.get_json("ok"), Some(json!("true")));
}

// ============================================================================
// OBSERVATION
// ============================================================================

#[test]
fn test_flush_without_changes() {
    let s = scope(r#"<div id="p" itemscope></div>"#);
    assert_eq!(s.pending_records(), 0);
    assert_eq!(s.flush(), 0);
    assert_eq!(s.flush(), 0);
}

#[test]
fn test_batched_writes_one_flush() {
    let s = scope(r#"<div id="p" itemscope><b itemprop="a">1</b><b itemprop="b">2</b></div>"#);
    let item = s.item(node(&s, "p")).unwrap();
    item.set("a", &json!("x")).unwrap();
    item.set("b", &json!("y")).unwrap();
    assert!(s.pending_records() >= 2);
    assert!(s.flush() >= 2);
    assert_eq!(s.pending_records(), 0);
    assert_eq!(item.to_serializable(), json!({"@id": "https://a.test/page#p", "a": "x", "b": "y"}));
}

#[test]
fn test_numeric_ids_do_not_shadow_positions() {
    let s = scope(r#"
        <div id="1" itemscope><b itemprop="n">one</b></div>
        <div id="0" itemscope><b itemprop="n">zero</b></div>
    "#);
    let at_zero = s.item_at(0).unwrap();
    let keyed_zero = s.item_by_key("0").unwrap();
    assert_eq!(at_zero.get_json("n"), Some(json!("one")));
    assert_eq!(keyed_zero.get_json("n"), Some(json!("zero")));
}

#[test]
fn test_detached_item_leaves_collection() {
    let s = scope(
        r#"<main id="m"><div id="a" itemscope></div><div id="b" itemscope></div></main>"#,
    );
    let b = node(&s, "b");
    s.with_document_mut(|d| {
        let main = d.get_element_by_id("m").unwrap();
        d.tree_mut().remove(main).unwrap();
    });
    s.flush();
    assert!(s.collection().is_empty());
    assert!(s.item_by_key("b").is_none());
    // The view still reads the detached subtree.
    assert_eq!(s.item(b).map(|i| i.node()), Some(b));
}

// ============================================================================
// SCHEMAS
// ============================================================================

#[test]
fn test_validate_before_load() {
    let s = scope("<p></p>");
    let data = json!({"name": "Ada"});
    assert_eq!(
        s.validate("https://vocab.test/Person", &Source::Object(&data), None),
        Err(SchemaError::NotLoaded { url: "https://vocab.test/Person".into() })
    );
}

#[test]
fn test_failed_schema_passes_data_through() {
    let fetcher = Rc::new(StaticFetcher::new());
    fetcher.insert("https://vocab.test/Broken", "{ not json");
    let s = scope_with("<p></p>", fetcher.clone());
    let report = smol::block_on(s.load_schemas(["https://vocab.test/Broken"]));
    assert_eq!(report.errors[0].kind(), "parse");

    let data = json!({"anything": 1});
    let result = s.validate("https://vocab.test/Broken", &Source::Object(&data), None).unwrap();
    assert!(result.is_valid());

    // The failure is cached on the instance until the registry is cleared.
    smol::block_on(s.load_schemas(["https://vocab.test/Broken"]));
    assert_eq!(fetcher.request_count("https://vocab.test/Broken"), 1);
    s.schemas().clear();
    smol::block_on(s.load_schemas(["https://vocab.test/Broken"]));
    assert_eq!(fetcher.request_count("https://vocab.test/Broken"), 2);
}

#[test]
fn test_invalid_cardinality_document() {
    let fetcher = Rc::new(StaticFetcher::new());
    fetcher.insert("https://vocab.test/Odd", r#"{"properties": {"n": {"cardinality": "3..1"}}}"#);
    let s = scope_with("<p></p>", fetcher);
    let report = smol::block_on(s.load_schemas(["https://vocab.test/Odd"]));
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors[0].kind(), "parse");
}

#[test]
fn test_registered_strategy_applies() {
    let fetcher = Rc::new(StaticFetcher::new());
    fetcher.insert("https://open.test/Thing", r#"{"properties": {"name": {"cardinality": "1"}}}"#);
    let s = scope_with("<p></p>", fetcher);
    s.schemas().register("https://open.test/", SchemaKind::Permissive);
    smol::block_on(s.load_schemas(["https://open.test/Thing"]));

    let data = json!({});
    let result = s.validate("https://open.test/Thing", &Source::Object(&data), None).unwrap();
    assert!(result.is_valid());
}

#[test]
fn test_untyped_property_accepts_nested_item() {
    let fetcher = Rc::new(StaticFetcher::new());
    fetcher.insert(
        "https://schema.org/Book",
        r#"{"properties": {"author": {"cardinality": "0..*"}}}"#,
    );
    let s = scope_with(r#"
        <div id="book" itemscope itemtype="https://schema.org/Book">
          <span itemprop="title">Notes</span>
          <div itemprop="author" itemscope itemtype="https://schema.org/Person"><span itemprop="name">Ada</span></div>
        </div>
    "#, fetcher);
    smol::block_on(s.load_schemas(["https://schema.org/Book"]));

    let result = s.validate_item("https://schema.org/Book", node(&s, "book")).unwrap().unwrap();
    assert!(result.is_valid(), "{:?}", result.violations());
}

#[test]
fn test_strict_rejects_repeated_single_value() {
    let fetcher = Rc::new(StaticFetcher::new());
    fetcher.insert("https://vocab.test/P", r#"{"properties": {"email": {"cardinality": "0..1"}}}"#);
    let s = scope_with("<p></p>", fetcher);
    smol::block_on(s.load_schemas(["https://vocab.test/P"]));

    let data = json!({"email": ["a@a.test", "b@a.test"]});
    let result = s.validate("https://vocab.test/P", &Source::Object(&data), None).unwrap();
    assert_eq!(result.violations().len(), 1);
    assert_eq!(result.violations()[0].expected, "0..1");

    let empty = json!({"email": ""});
    assert!(s.validate("https://vocab.test/P", &Source::Object(&empty), None).unwrap().is_valid());
}

// ============================================================================
// TEMPLATES
// ============================================================================

#[test]
fn test_render_rejects_non_elements() {
    let s = scope(r#"<template id="t"></template><p id="p">x</p>"#);
    let data = json!({});
    let t = node(&s, "t");
    assert_eq!(s.render(&Source::Object(&data), t), Err(RenderError::EmptyTemplate(t)));

    let text = s.document().tree().children(node(&s, "p")).next().unwrap().0;
    assert_eq!(s.render(&Source::Object(&data), text), Err(RenderError::NotAnElement(text)));
}

#[test]
fn test_auto_sync_requires_source_type() {
    let s = scope(r#"<ul id="l"><template><li></li></template></ul>"#);
    let l = node(&s, "l");
    assert_eq!(s.auto_sync(l), Err(RenderError::MissingSourceType(l)));
}

#[test]
fn test_auto_sync_ignores_its_own_output() {
    let s = scope(r#"
        <div id="ada" itemscope itemtype="https://schema.org/Person"><span itemprop="name">Ada</span></div>
        <ul id="list" data-itemtype="https://schema.org/Person">
          <template><li itemscope itemtype="https://schema.org/Person"><b itemprop="name"></b></li></template>
        </ul>
    "#);
    let list = node(&s, "list");
    assert_eq!(s.auto_sync(list).unwrap(), 1);
    let before = s.rendered(list).unwrap();

    s.with_document_mut(|d| {
        let rendered = d.tree().first_element_child(before[0]).unwrap();
        d.tree_mut().set_text_content(rendered, "edited").unwrap();
    });
    s.flush();
    assert_eq!(s.rendered(list).unwrap(), before);
}

#[test]
fn test_auto_sync_registration_replaces() {
    let s = scope(r#"
        <div id="ada" itemscope itemtype="https://schema.org/Person"><span itemprop="name">Ada</span></div>
        <ul id="list" data-itemtype="https://schema.org/Person">
          <template><li itemscope><b itemprop="name"></b></li></template>
        </ul>
    "#);
    let list = node(&s, "list");
    s.auto_sync(list).unwrap();
    s.auto_sync(list).unwrap();
    let doc = s.document();
    let items = doc
        .tree()
        .child_elements(list)
        .filter(|&n| doc.tree().is_element_named(n, "li"))
        .count();
    assert_eq!(items, 1);
}

// ============================================================================
// REFERENCES
// ============================================================================

#[test]
fn test_reference_errors() {
    let s = scope(r#"
        <div id="host">
          <div id="plain"></div>
          <div itemprop="a" itemscope></div>
          <div itemprop="b" itemscope itemid="http://[::1"></div>
          <div itemprop="c" itemscope itemid="/people"></div>
        </div>
    "#);
    let host = node(&s, "host");
    let children: Vec<NodeId> = s.document().tree().child_elements(host).collect();
    let fetch = |n| smol::block_on(s.fetch_reference(n));

    assert_eq!(fetch(children[0]), Err(FetchError::NotAnItem(children[0])));
    assert_eq!(fetch(children[1]), Err(FetchError::MissingItemId));
    assert_eq!(fetch(children[2]), Err(FetchError::InvalidItemId("http://[::1".into())));
    assert_eq!(fetch(children[3]), Err(FetchError::MissingFragment("/people".into())));
}

#[test]
fn test_reference_network_failure() {
    let fetcher = Rc::new(StaticFetcher::new());
    fetcher.insert_failure("https://b.test/people", "connection reset");
    let s = scope_with(
        r#"<div id="r" itemscope itemid="https://b.test/people#ada"></div>"#,
        fetcher,
    );
    let err = smol::block_on(s.fetch_reference(node(&s, "r"))).unwrap_err();
    assert!(matches!(err, FetchError::Net { ref url, .. } if url == "https://b.test/people"));
}

#[test]
fn test_same_document_reference() {
    let fetcher = Rc::new(StaticFetcher::new());
    let s = scope_with(r#"
        <div id="ada" itemscope><span itemprop="name">Ada</span></div>
        <div id="r" itemscope itemid="page#ada"><b itemprop="name"></b></div>
    "#, fetcher.clone());
    let items = smol::block_on(s.fetch_reference(node(&s, "r"))).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].get("name").and_then(|p| p.as_text()), Some("Ada"));
    assert_eq!(s.document().tree().text_content(node(&s, "r")), "Ada");
    assert_eq!(fetcher.total_requests(), 0);
}

#[test]
fn test_reference_to_container_of_items() {
    let fetcher = Rc::new(StaticFetcher::new());
    fetcher.insert("https://a.test/team", r#"
        <section id="all">
          <div itemscope><span itemprop="name">Ada</span></div>
          <div itemscope><span itemprop="name">Bo</span></div>
        </section>
    "#);
    let s = scope_with(
        r#"<div id="r" itemscope itemid="/team#all"><b itemprop="name"></b></div>"#,
        fetcher,
    );
    let items = smol::block_on(s.fetch_reference(node(&s, "r"))).unwrap();
    let names: Vec<Option<&str>> =
        items.iter().map(|i| i.get("name").and_then(|p| p.as_text())).collect();
    assert_eq!(names, vec![Some("Ada"), Some("Bo")]);
    assert!(matches!(items[0].get("name").and_then(|p| p.first()), Some(Value::Text(_))));
}
