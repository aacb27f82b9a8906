//! Full-pipeline properties: load/dump round trips, anchor identity,
//! per-document limits, style selection and the mark-dependent error
//! scenarios.

use pretty_assertions::assert_eq;

use libyamel::{
    compose, compose_all, dump, tag, Composer, Document, DumpSettings, Error, FlowStyle,
    LoadSettings, Node, NodeArena, NodeData, ScalarStyle, Schema,
};

fn compose_one(input: &str) -> Document {
    compose(input, &LoadSettings::default()).unwrap().unwrap()
}

fn roundtrip(input: &str) -> Document {
    let first = compose_one(input);
    let text = dump(&first, &DumpSettings::default()).unwrap();
    let second = compose(&text, &LoadSettings::default())
        .unwrap_or_else(|e| panic!("re-parse of {:?} failed: {}", text, e))
        .expect("dump produced an empty stream");
    assert!(
        first.arena.value_eq(first.root, &second.arena, second.root),
        "round trip changed the graph\n  input: {:?}\n  dumped: {:?}",
        input,
        text
    );
    second
}

#[test]
fn test_roundtrip_scalars_and_collections() {
    roundtrip("a: 1\nb: [x, y]\n");
    roundtrip("- 1\n- two\n- [3, four]\n");
    roundtrip("key:\n  nested:\n    - a\n    - b\n");
    roundtrip("{flow: {deep: [1, 2]}}\n");
    roundtrip("'quoted': \"value\"\n");
    roundtrip("|\n  line one\n  line two\n");
}

#[test]
fn test_roundtrip_preserves_shared_nodes() {
    let doc = roundtrip("- &shared {a: 1}\n- *shared\n");
    match &doc.root_node().data {
        NodeData::Sequence { items, .. } => {
            assert_eq!(items[0], items[1], "alias must stay reference-identical");
        }
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn test_roundtrip_recursive_document() {
    let doc = roundtrip("&a [*a]\n");
    assert!(doc.root_node().recursive);
    match &doc.root_node().data {
        NodeData::Sequence { items, .. } => assert_eq!(items[0], doc.root),
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn test_recursive_dump_text() {
    let doc = compose_one("&a [*a]\n");
    let text = dump(&doc, &DumpSettings::default()).unwrap();
    assert_eq!(text, "&id001 [*id001]\n");
}

#[test]
fn test_size_limit_is_per_document() {
    let long = "x".repeat(50);
    let input = format!("short\n---\n{}\n", long);

    // Generous limit: both documents load.
    let settings = LoadSettings::default().with_code_point_limit(200);
    let docs: Vec<_> = compose_all(&input, &settings).unwrap().collect();
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d.is_ok()));

    // Tight limit: the first (short) document still loads, the second
    // fails on its own length.
    let settings = LoadSettings::default().with_code_point_limit(30);
    let docs: Vec<_> = compose_all(&input, &settings).unwrap().collect();
    assert_eq!(docs.len(), 2);
    assert!(docs[0].is_ok());
    let err = docs[1].as_ref().unwrap_err();
    assert!(err.to_string().contains("exceeds the limit"));
}

#[test]
fn test_literal_newline_roundtrip() {
    let mut arena = NodeArena::new();
    let root = arena.alloc(Node::scalar(tag::STR.clone(), "\n", ScalarStyle::Literal));
    let doc = Document {
        arena,
        root,
        end_comments: Vec::new(),
    };
    let text = dump(&doc, &DumpSettings::default()).unwrap();
    let reloaded = compose(&text, &LoadSettings::default()).unwrap().unwrap();
    match &reloaded.root_node().data {
        NodeData::Scalar { value, .. } => assert_eq!(value, "\n"),
        other => panic!("expected scalar, got {:?}", other),
    }
}

#[test]
fn test_quoted_empty_and_space_roundtrip() {
    for value in ["", " "] {
        let mut arena = NodeArena::new();
        let root = arena.alloc(Node::scalar(
            tag::STR.clone(),
            value,
            ScalarStyle::SingleQuoted,
        ));
        let doc = Document {
            arena,
            root,
            end_comments: Vec::new(),
        };
        let text = dump(&doc, &DumpSettings::default()).unwrap();
        assert!(text.starts_with('\''), "expected a quoted scalar: {:?}", text);
        let reloaded = compose(&text, &LoadSettings::default()).unwrap().unwrap();
        match &reloaded.root_node().data {
            NodeData::Scalar { value: reloaded, .. } => assert_eq!(reloaded, value),
            other => panic!("expected scalar, got {:?}", other),
        }
    }
}

#[test]
fn test_json_scalar_style_quotes_misresolving_strings() {
    let mut arena = NodeArena::new();
    let items = vec![
        arena.alloc(Node::scalar(tag::INT.clone(), "17", ScalarStyle::Plain)),
        arena.alloc(Node::scalar(tag::STR.clone(), "17", ScalarStyle::Plain)),
        arena.alloc(Node::scalar(tag::BOOL.clone(), "true", ScalarStyle::Plain)),
        arena.alloc(Node::scalar(tag::STR.clone(), "true", ScalarStyle::Plain)),
        arena.alloc(Node::scalar(tag::NULL.clone(), "null", ScalarStyle::Plain)),
        arena.alloc(Node::scalar(tag::STR.clone(), "null", ScalarStyle::Plain)),
    ];
    let root = arena.alloc(Node::sequence(tag::SEQ.clone(), items, FlowStyle::Flow));
    let doc = Document {
        arena,
        root,
        end_comments: Vec::new(),
    };
    let settings = DumpSettings::default().with_default_scalar_style(ScalarStyle::Json);
    let text = dump(&doc, &settings).unwrap();
    assert_eq!(text, "[17, \"17\", true, \"true\", null, \"null\"]\n");
}

#[test]
fn test_compose_without_marks() {
    let settings = LoadSettings::default().with_use_marks(false);
    let doc = compose("{a: 4}", &settings).unwrap();
    assert!(doc.is_some());
}

#[test]
fn test_parser_error_without_marks() {
    let settings = LoadSettings::default().with_use_marks(false);
    let err = compose("{a: 4}}", &settings).unwrap_err();
    assert!(matches!(err, Error::Parser(_)));
    assert_eq!(err.to_string(), "expected '<document start>', but found '}'\n");
}

#[test]
fn test_parser_error_with_marks() {
    let settings = LoadSettings::default().with_use_marks(true);
    let err = compose("{a: 4}}", &settings).unwrap_err();
    assert!(err.to_string().contains("line 1, column 7:"));
}

#[test]
fn test_core_schema_resolution() {
    let settings = LoadSettings::default().with_schema(Schema::Core);
    let doc = compose("- 0x1F\n- .inf\n- True\n- ~\n", &settings)
        .unwrap()
        .unwrap();
    match &doc.root_node().data {
        NodeData::Sequence { items, .. } => {
            let tags: Vec<_> = items.iter().map(|&i| doc.arena.get(i).tag.clone()).collect();
            assert_eq!(tags[0], *tag::INT);
            assert_eq!(tags[1], *tag::FLOAT);
            assert_eq!(tags[2], *tag::BOOL);
            assert_eq!(tags[3], *tag::NULL);
        }
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn test_failsafe_schema_resolution() {
    let settings = LoadSettings::default().with_schema(Schema::Failsafe);
    let doc = compose("17", &settings).unwrap().unwrap();
    assert_eq!(doc.root_node().tag, *tag::STR);
}

#[test]
fn test_utf16_input() {
    let text = "a: 1\n";
    let mut bytes = vec![0xff, 0xfe];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let settings = LoadSettings::default();
    let mut composer = Composer::from_bytes(&settings, &bytes).unwrap();
    let doc = composer.compose_single().unwrap().unwrap();
    match &doc.root_node().data {
        NodeData::Mapping { entries, .. } => assert_eq!(entries.len(), 1),
        other => panic!("expected mapping, got {:?}", other),
    }
}

#[test]
fn test_multi_document_dump_and_reload() {
    let input = "one\n---\ntwo\n";
    let settings = LoadSettings::default();
    let docs: Vec<Document> = compose_all(input, &settings)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let text = libyamel::dump_all(docs.iter(), &DumpSettings::default()).unwrap();
    let reloaded: Vec<Document> = compose_all(&text, &settings)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(reloaded.len(), 2);
    for (a, b) in docs.iter().zip(reloaded.iter()) {
        assert!(a.arena.value_eq(a.root, &b.arena, b.root));
    }
}

#[test]
fn test_comment_roundtrip() {
    let load = LoadSettings::default().with_parse_comments(true);
    let dump_settings = DumpSettings::default().with_dump_comments(true);
    let mut composer = Composer::new(&load, "# heading\nkey: value\n").unwrap();
    let doc = composer.compose_single().unwrap().unwrap();
    let text = dump(&doc, &dump_settings).unwrap();
    assert!(text.contains("# heading"), "comment lost: {:?}", text);
    assert!(text.contains("key: value"));
}
