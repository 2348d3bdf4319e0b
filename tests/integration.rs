//! Integration tests for the folio pagination pipeline.
//!
//! These tests exercise the public API from document tree (or JSON) to
//! rendered pages. They verify:
//! - Page breaks happen at the right places
//! - Text breaks between words without losing characters
//! - Variable edits pull content back and push it forward
//! - Unbreakable nodes are never split and no page is empty
//! - Custom estimators and the do-not-break predicate are honoured

use std::collections::{BTreeMap, HashMap};

use folio::model::{ELEMENT_ID_ATTRIBUTE, VARIABLE_ATTRIBUTE};
use folio::*;

// ─── Helpers ────────────────────────────────────────────────────

fn text(content: &str) -> Node {
    Node::text(content)
}

fn p(children: Vec<Node>) -> Node {
    Node::tag("p", children)
}

fn img(height: u32) -> Node {
    Node::tag("img", vec![]).with_attr("height", &height.to_string())
}

fn row(cells: &[&str]) -> Node {
    Node::tag(
        "tr",
        cells
            .iter()
            .map(|c| Node::tag("td", vec![text(c)]))
            .collect(),
    )
}

fn bound(name: &str, value: &str) -> Node {
    Node::tag("span", vec![text(value)]).with_attr(VARIABLE_ATTRIBUTE, name)
}

fn body(children: Vec<Node>) -> Node {
    Node::tag("body", children)
}

fn build(budget: f64, root: &Node) -> PageSet {
    PageSetBuilder::new(PageConfig::with_height(budget))
        .build(root)
        .unwrap()
}

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn normalized(node: &Node) -> Node {
    let mut node = node.clone();
    node.normalize();
    node
}

/// A contract long enough to span several small pages.
fn contract() -> Node {
    body(vec![
        Node::tag("h1", vec![text("Service Agreement")]),
        p(vec![
            text("This agreement is made between "),
            bound("party_name", "Northwind Trading LLC"),
            text(" and the Provider, who agree as follows."),
        ]),
        Node::tag("h2", vec![text("1. Subject")]),
        p(vec![
            text("The Provider renders consulting services "),
            Node::tag("em", vec![text("described in   Annex 1")]),
            text(", and the Client accepts and pays for them."),
        ]),
        Node::tag(
            "table",
            vec![row(&["Stage", "Amount"]), row(&["Analysis", "100"]), row(&["Delivery", "200"])],
        ),
        img(60),
        Node::tag(
            "div",
            vec![
                p(vec![text("Provider: ____________")]),
                p(vec![text("Client: ____________")]),
            ],
        ),
    ])
}

fn assert_no_split_unbreakables(node: &Node) {
    node.walk(&mut |n| {
        if n.kind.is_unbreakable() {
            assert!(
                n.split_watermark.is_none(),
                "<{}> was split across pages",
                n.kind
            );
        }
    });
}

// ─── Page Breaks ────────────────────────────────────────────────

#[test]
fn table_that_does_not_fit_opens_a_new_page() {
    // Paragraph: a word and a <br>, 20 + 20 = 40.
    // Table: four rows, three breaks between them, 20 * (3 + 1) = 80.
    let doc = body(vec![
        p(vec![text("Alpha"), Node::tag("br", vec![])]),
        Node::tag("table", vec![row(&["a"]), row(&["b"]), row(&["c"]), row(&["d"])]),
    ]);
    let set = build(100.0, &doc);

    assert_eq!(set.len(), 2);
    assert_eq!(set.heights(), vec![40.0, 80.0]);
    let rendered = set.render();
    assert_eq!(rendered[0].content.children.len(), 1);
    assert_eq!(rendered[0].content.children[0].kind, NodeKind::Paragraph);
    assert_eq!(rendered[1].content.children[0].kind, NodeKind::Table);
}

#[test]
fn text_run_breaks_between_words() {
    let doc = body(vec![img(65), text("The quick brown fox jumps")]);
    let set = build(100.0, &doc);

    let rendered = set.render();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].content.text_content(), "The ");
    assert_eq!(rendered[1].content.text_content(), "quick brown fox jumps");
    assert!(set.heights().iter().all(|&h| h <= 100.0));
}

#[test]
fn tall_image_gets_a_page_of_its_own() {
    let doc = body(vec![p(vec![text("Intro")]), img(400), p(vec![text("Outro")])]);
    let set = build(100.0, &doc);

    assert_eq!(set.heights(), vec![20.0, 400.0, 20.0]);
}

#[test]
fn page_containers_repeat_the_root() {
    let root = Node::tag("div", (0..10).map(|i| p(vec![text(&format!("Clause {i}"))])).collect())
        .with_attr("class", "contract");
    let set = build(100.0, &root);

    assert!(set.len() > 1);
    for page in set.render() {
        assert_eq!(page.content.kind, NodeKind::Block("div".to_string()));
        assert_eq!(page.content.attributes["class"], "contract");
    }
}

// ─── Invariants ─────────────────────────────────────────────────

#[test]
fn content_survives_pagination() {
    let doc = contract();
    for budget in [40.0, 75.0, 120.0, 1000.0] {
        let set = build(budget, &doc);
        assert_eq!(set.reassemble(), normalized(&doc), "budget {budget}");
    }
}

#[test]
fn no_page_is_empty() {
    let set = build(60.0, &contract());
    assert!(set.len() > 3);
    for page in set.render() {
        assert!(!page.content.children.is_empty(), "page {} is empty", page.index);
    }
}

#[test]
fn unbreakable_nodes_are_never_split() {
    let set = build(50.0, &contract());
    for page in set.render() {
        assert_no_split_unbreakables(&page.content);
    }
}

#[test]
fn full_pass_is_deterministic() {
    let doc = contract();
    let first = build(70.0, &doc).render();
    let second = build(70.0, &doc).render();
    assert_eq!(first, second);
}

#[test]
fn pages_are_numbered_from_one() {
    let set = build(60.0, &contract());
    let indices: Vec<usize> = set.pages().iter().map(|page| page.index).collect();
    assert_eq!(indices, (1..=set.len()).collect::<Vec<_>>());
}

#[test]
fn unknown_kinds_are_kept_whole_and_verbatim() {
    let doc = body(vec![
        img(90),
        Node::tag("w:sdt", vec![text("content control")]),
    ]);
    let set = build(100.0, &doc);

    assert_eq!(set.len(), 2);
    let moved = &set.render()[1].content.children[0];
    assert_eq!(moved.kind.tag(), "w:sdt");
    assert_eq!(set.reassemble(), normalized(&doc));
}

// ─── Variable Edits ─────────────────────────────────────────────

#[test]
fn shrinking_a_variable_pulls_the_next_page_back() {
    // Page 1: image 30 + bound paragraph 68 = 98.
    // Page 2: paragraph of 30. Page 3: image 90.
    let doc = body(vec![
        img(30),
        p(vec![bound("party", "aaa bbb ccc")]),
        p(vec![img(10), text("word")]),
        img(90),
    ]);
    let mut set = build(100.0, &doc);
    assert_eq!(set.len(), 3);
    assert_eq!(set.heights(), vec![98.0, 30.0, 90.0]);

    set.apply_variables(&values(&[("party", "a")]));

    assert_eq!(set.len(), 2);
    assert_eq!(set.heights(), vec![80.0, 90.0]);
    assert_eq!(set.pages()[1].index, 2);
    let rendered = set.render();
    assert_eq!(rendered[0].content.text_content(), "aword");
    assert_eq!(rendered[1].content.children[0].kind, NodeKind::Image);
}

#[test]
fn growing_a_variable_splits_its_paragraph() {
    // 50 + "Party: " 24 + "Acme" 20 = 94.
    let doc = body(vec![img(50), p(vec![text("Party: "), bound("party", "Acme")])]);
    let mut set = build(100.0, &doc);
    assert_eq!(set.len(), 1);

    set.apply_variables(&values(&[("party", "Northwind Trading Limited Liability Company")]));

    assert!(set.len() > 1);
    assert!(set.heights().iter().all(|&h| h <= 100.0));
    let rendered = set.render();
    let first_p = &rendered[0].content.children[1];
    let second_p = &rendered[1].content.children[0];
    assert!(first_p.split_watermark.is_some());
    assert_eq!(first_p.split_watermark, second_p.split_watermark);
    assert_eq!(
        set.reassemble().text_content(),
        "Party: Northwind Trading Limited Liability Company"
    );
}

#[test]
fn edits_that_round_trip_restore_the_layout() {
    let doc = contract();
    let mut set = build(90.0, &doc);
    let before = set.reassemble();
    let pages_before = set.len();

    set.apply_variables(&values(&[("party_name", "A Much Longer Counterparty Name Than Before Ltd")]));
    set.apply_variables(&values(&[("party_name", "Northwind Trading LLC")]));

    assert_eq!(set.reassemble(), before);
    assert_eq!(set.len(), pages_before);
}

#[test]
fn paginate_fills_variables_first() {
    let document = Document {
        root: body(vec![
            p(vec![text("Dated ${ contract_date }.")]),
            p(vec![bound("party_name", "________")]),
        ]),
        page: PageConfig::default(),
        variables: values(&[("contract_date", "19.10.2026"), ("party_name", "Acme")]),
    };
    let set = paginate(&document).unwrap();
    assert_eq!(set.reassemble().text_content(), "Dated 19.10.2026.Acme");
}

#[test]
fn variables_are_listed_in_document_order() {
    let vars = extract_variables(&body(vec![
        p(vec![text("No. ${contract_number} of ${contract_date}")]),
        p(vec![bound("total_amount", "0")]),
    ]));
    let listed: Vec<(&str, VariableType)> = vars.iter().map(|v| (v.name.as_str(), v.kind)).collect();
    assert_eq!(
        listed,
        vec![
            ("contract_number", VariableType::Number),
            ("contract_date", VariableType::Date),
            ("total_amount", VariableType::Money),
        ]
    );
}

// ─── Strategies ─────────────────────────────────────────────────

#[test]
fn predicate_keeps_signature_block_whole() {
    let signatures = Node::tag(
        "div",
        vec![p(vec![text("Provider")]), p(vec![text("Client")])],
    )
    .with_attr("class", "signatures");
    let doc = body(vec![img(80), signatures]);

    let plain = build(100.0, &doc);
    assert_eq!(plain.render()[0].content.children.len(), 2);

    let kept = PageSetBuilder::new(PageConfig::with_height(100.0))
        .with_do_not_break(|e| e.attribute("class") == Some("signatures"))
        .build(&doc)
        .unwrap();
    let rendered = kept.render();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].content.children.len(), 1);
    assert!(rendered[1].content.children[0].split_watermark.is_none());
}

#[test]
fn measured_heights_override_the_heuristic() {
    let signatures = Node::tag("div", vec![p(vec![text("Provider")])])
        .with_attr(ELEMENT_ID_ATTRIBUTE, "sig");
    let doc = body(vec![p(vec![text("Intro")]), signatures]);

    let measured = MeasuredEstimator::new(
        HashMap::from([("sig".to_string(), 90.0)]),
        HeuristicEstimator::default(),
    );
    let set = PageSetBuilder::new(PageConfig::with_height(100.0))
        .with_estimator(measured)
        .with_do_not_break(|e| e.attribute(ELEMENT_ID_ATTRIBUTE).is_some())
        .build(&doc)
        .unwrap();

    assert_eq!(set.heights(), vec![20.0, 90.0]);
}

#[test]
fn character_count_mode_budgets_characters() {
    let doc = body(vec![p(vec![text("aaaa bbbb cccc")])]);
    let set = PageSetBuilder::new(PageConfig::with_height(10.0))
        .with_estimator(CharCountEstimator)
        .build(&doc)
        .unwrap();

    let rendered = set.render();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].content.text_content(), "aaaa bbbb ");
    assert_eq!(rendered[1].content.text_content(), "cccc");
    assert_eq!(set.heights(), vec![10.0, 4.0]);
}

// ─── JSON Entry Point ───────────────────────────────────────────

#[test]
fn json_document_paginates() {
    let json = r##"{
        "page": { "pageHeight": 60 },
        "variables": { "party": "Acme" },
        "root": {
            "kind": "body",
            "children": [
                { "kind": "h1", "children": [ { "kind": "#text", "text": "Agreement" } ] },
                { "kind": "p", "children": [ { "kind": "#text", "text": "Between ${party} and the Provider." } ] }
            ]
        }
    }"##;
    let pages = paginate_json(json).unwrap();

    assert!(pages.len() >= 2);
    let all: String = pages.iter().map(|p| p.content.text_content()).collect();
    assert_eq!(all, "AgreementBetween Acme and the Provider.");

    let out = serde_json::to_value(&pages).unwrap();
    assert_eq!(out[0]["index"], 1);
    assert_eq!(out[0]["content"]["kind"], "body");
    assert_eq!(out[1]["content"]["children"][0]["kind"], "p");
    assert!(out[1]["content"]["children"][0]["splitWatermark"].is_number());
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = paginate_json(r#"{ "root": { "kind": "p", } }"#).unwrap_err();
    assert!(matches!(err, PaginateError::Parse { .. }));
    assert!(err.to_string().contains("Hint"));
}

#[test]
fn zero_budget_is_rejected_before_layout() {
    let err = paginate_json(r#"{ "page": { "pageHeight": 0 }, "root": { "kind": "body" } }"#)
        .unwrap_err();
    assert!(matches!(err, PaginateError::EstimationDegenerate { .. }));
}

#[test]
fn empty_document_has_one_empty_page() {
    let pages = paginate_json(r#"{ "root": { "kind": "body" } }"#).unwrap();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].content.children.is_empty());
    assert_eq!(pages[0].height, 0.0);
}
