//! Event-level conformance harness.
//!
//! Each case pairs a YAML input with the textual event form used by the
//! external YAML test suite (`+STR`, `+DOC ---`, `=VAL :foo`, `=ALI *a`,
//! ...). Cases marked as errors must fail with the expected message
//! fragment. The harness reports all mismatches at once, in the style of
//! a fixture runner.

use libyamel::{events, EventId, LoadSettings};

struct SuiteCase {
    id: &'static str,
    label: &'static str,
    yaml: &'static str,
    events: &'static [&'static str],
}

struct ErrorCase {
    id: &'static str,
    label: &'static str,
    yaml: &'static str,
    message_fragment: &'static str,
}

const CASES: &[SuiteCase] = &[
    SuiteCase {
        id: "empty-stream",
        label: "Empty input produces a bare stream",
        yaml: "",
        events: &["+STR", "-STR"],
    },
    SuiteCase {
        id: "plain-scalar",
        label: "Plain scalar document",
        yaml: "foo\n",
        events: &["+STR", "+DOC", "=VAL :foo", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "multiline-plain",
        label: "Plain scalar folds across lines",
        yaml: "a\nb\nc\n",
        events: &["+STR", "+DOC", "=VAL :a b c", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "block-mapping",
        label: "Simple block mapping",
        yaml: "key: value\n",
        events: &["+STR", "+DOC", "+MAP", "=VAL :key", "=VAL :value", "-MAP", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "block-sequence",
        label: "Simple block sequence",
        yaml: "- a\n- b\n",
        events: &["+STR", "+DOC", "+SEQ", "=VAL :a", "=VAL :b", "-SEQ", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "nested-mapping",
        label: "Mapping nested under a key",
        yaml: "a:\n  b: 1\n",
        events: &[
            "+STR", "+DOC", "+MAP", "=VAL :a", "+MAP", "=VAL :b", "=VAL :1", "-MAP", "-MAP",
            "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "nested-sequence",
        label: "Sequence of sequences",
        yaml: "- - a\n",
        events: &["+STR", "+DOC", "+SEQ", "+SEQ", "=VAL :a", "-SEQ", "-SEQ", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "indentless-sequence",
        label: "Sequence at the parent mapping's indentation",
        yaml: "key:\n- a\n- b\n",
        events: &[
            "+STR", "+DOC", "+MAP", "=VAL :key", "+SEQ", "=VAL :a", "=VAL :b", "-SEQ", "-MAP",
            "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "flow-sequence",
        label: "Flow sequence",
        yaml: "[1, 2, 3]\n",
        events: &[
            "+STR", "+DOC", "+SEQ []", "=VAL :1", "=VAL :2", "=VAL :3", "-SEQ", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "flow-mapping",
        label: "Flow mapping",
        yaml: "{a: 1}\n",
        events: &[
            "+STR", "+DOC", "+MAP {}", "=VAL :a", "=VAL :1", "-MAP", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "empty-flow-collections",
        label: "Empty flow collections",
        yaml: "- []\n- {}\n",
        events: &[
            "+STR", "+DOC", "+SEQ", "+SEQ []", "-SEQ", "+MAP {}", "-MAP", "-SEQ", "-DOC",
            "-STR",
        ],
    },
    SuiteCase {
        id: "nested-flow",
        label: "Nested flow collections",
        yaml: "[a, {b: c}, [d]]\n",
        events: &[
            "+STR", "+DOC", "+SEQ []", "=VAL :a", "+MAP {}", "=VAL :b", "=VAL :c", "-MAP",
            "+SEQ []", "=VAL :d", "-SEQ", "-SEQ", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "flow-pair-in-sequence",
        label: "Implicit single-pair mapping inside a flow sequence",
        yaml: "[a: 1]\n",
        events: &[
            "+STR", "+DOC", "+SEQ []", "+MAP {}", "=VAL :a", "=VAL :1", "-MAP", "-SEQ",
            "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "single-quoted",
        label: "Single-quoted scalar with quote escape",
        yaml: "'it''s'\n",
        events: &["+STR", "+DOC", "=VAL 'it's", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "double-quoted",
        label: "Double-quoted scalar with escapes",
        yaml: "\"a\\nb\"\n",
        events: &["+STR", "+DOC", "=VAL \"a\\nb", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "literal-scalar",
        label: "Literal block scalar",
        yaml: "|\n  text\n",
        events: &["+STR", "+DOC", "=VAL |text\\n", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "literal-strip",
        label: "Literal block scalar with strip chomping",
        yaml: "|-\n  a\n  b\n",
        events: &["+STR", "+DOC", "=VAL |a\\nb", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "folded-scalar",
        label: "Folded block scalar joins lines",
        yaml: ">\n  a\n  b\n",
        events: &["+STR", "+DOC", "=VAL >a b\\n", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "explicit-documents",
        label: "Explicit document markers",
        yaml: "---\none\n...\n---\ntwo\n",
        events: &[
            "+STR", "+DOC ---", "=VAL :one", "-DOC ...", "+DOC ---", "=VAL :two", "-DOC",
            "-STR",
        ],
    },
    SuiteCase {
        id: "bare-then-explicit",
        label: "Bare document followed by an explicit one",
        yaml: "one\n---\ntwo\n",
        events: &[
            "+STR", "+DOC", "=VAL :one", "-DOC", "+DOC ---", "=VAL :two", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "anchor-alias",
        label: "Anchor and alias in a sequence",
        yaml: "- &a x\n- *a\n",
        events: &[
            "+STR", "+DOC", "+SEQ", "=VAL &a :x", "=ALI *a", "-SEQ", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "anchor-with-tag",
        label: "Anchor combined with an explicit tag",
        yaml: "&x !!str 5\n",
        events: &[
            "+STR", "+DOC", "=VAL &x <tag:yaml.org,2002:str> :5", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "secondary-tag-handle",
        label: "The !! handle resolves to the yaml.org prefix",
        yaml: "!!int 5\n",
        events: &[
            "+STR", "+DOC", "=VAL <tag:yaml.org,2002:int> :5", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "verbatim-tag",
        label: "Verbatim tag is used unchanged",
        yaml: "!<tag:example.com,2000:app/foo> bar\n",
        events: &[
            "+STR", "+DOC", "=VAL <tag:example.com,2000:app/foo> :bar", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "tag-directive",
        label: "%TAG directive declares a custom handle",
        yaml: "%TAG !e! tag:example.com,2000:\n---\n!e!foo bar\n",
        events: &[
            "+STR", "+DOC ---", "=VAL <tag:example.com,2000:foo> :bar", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "yaml-directive",
        label: "%YAML 1.2 directive is accepted",
        yaml: "%YAML 1.2\n---\nx\n",
        events: &["+STR", "+DOC ---", "=VAL :x", "-DOC", "-STR"],
    },
    SuiteCase {
        id: "explicit-key",
        label: "Explicit key indicator",
        yaml: "? key\n: value\n",
        events: &[
            "+STR", "+DOC", "+MAP", "=VAL :key", "=VAL :value", "-MAP", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "composite-key",
        label: "Flow sequence as an explicit mapping key",
        yaml: "? [a]\n: b\n",
        events: &[
            "+STR", "+DOC", "+MAP", "+SEQ []", "=VAL :a", "-SEQ", "=VAL :b", "-MAP", "-DOC",
            "-STR",
        ],
    },
    SuiteCase {
        id: "empty-mapping-value",
        label: "Missing value is an empty scalar",
        yaml: "a:\nb: 2\n",
        events: &[
            "+STR", "+DOC", "+MAP", "=VAL :a", "=VAL :", "=VAL :b", "=VAL :2", "-MAP", "-DOC",
            "-STR",
        ],
    },
    SuiteCase {
        id: "comment-ignored",
        label: "Comments are skipped by default",
        yaml: "a: 1 # trailing\n# own line\nb: 2\n",
        events: &[
            "+STR", "+DOC", "+MAP", "=VAL :a", "=VAL :1", "=VAL :b", "=VAL :2", "-MAP",
            "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "spec-example-2-1",
        label: "Sequence of scalars (ball players)",
        yaml: "- Mark McGwire\n- Sammy Sosa\n- Ken Griffey\n",
        events: &[
            "+STR", "+DOC", "+SEQ", "=VAL :Mark McGwire", "=VAL :Sammy Sosa",
            "=VAL :Ken Griffey", "-SEQ", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "spec-example-2-2",
        label: "Mapping of scalars to scalars",
        yaml: "hr:  65\navg: 0.278\nrbi: 147\n",
        events: &[
            "+STR", "+DOC", "+MAP", "=VAL :hr", "=VAL :65", "=VAL :avg", "=VAL :0.278",
            "=VAL :rbi", "=VAL :147", "-MAP", "-DOC", "-STR",
        ],
    },
    SuiteCase {
        id: "spec-example-2-4",
        label: "Sequence of mappings",
        yaml: "-\n  name: Mark McGwire\n  hr:   65\n-\n  name: Sammy Sosa\n  hr:   63\n",
        events: &[
            "+STR", "+DOC", "+SEQ", "+MAP", "=VAL :name", "=VAL :Mark McGwire", "=VAL :hr",
            "=VAL :65", "-MAP", "+MAP", "=VAL :name", "=VAL :Sammy Sosa", "=VAL :hr",
            "=VAL :63", "-MAP", "-SEQ", "-DOC", "-STR",
        ],
    },
];

const ERROR_CASES: &[ErrorCase] = &[
    ErrorCase {
        id: "content-after-flow",
        label: "Trailing content after a closed flow mapping",
        yaml: "{a: 4}}",
        message_fragment: "expected '<document start>', but found '}'",
    },
    ErrorCase {
        id: "bad-mapping-indent",
        label: "Mapping continuation indented too deep",
        yaml: "a: 1\n  b: 2\n",
        message_fragment: "expected <block end>",
    },
    ErrorCase {
        id: "bad-sequence-indent",
        label: "Sequence sibling indented too deep",
        yaml: "- a\n - b\n",
        message_fragment: "expected <block end>",
    },
    ErrorCase {
        id: "unbalanced-bracket",
        label: "Extra closing bracket",
        yaml: "key: [1, 2]]\n",
        message_fragment: "expected <block end>, but found ']'",
    },
    ErrorCase {
        id: "unterminated-quote",
        label: "Single-quoted scalar never closed",
        yaml: "'open\n",
        message_fragment: "found unexpected end of stream",
    },
    ErrorCase {
        id: "tab-indentation",
        label: "Tab used for indentation",
        yaml: "\ta: 1\n",
        message_fragment: "cannot start any token",
    },
    ErrorCase {
        id: "undefined-tag-handle",
        label: "Tag handle was never declared",
        yaml: "!u!foo bar\n",
        message_fragment: "found undefined tag handle",
    },
    ErrorCase {
        id: "content-after-directives",
        label: "Directives must be followed by ---",
        yaml: "%YAML 1.2\nx\n",
        message_fragment: "expected '<document start>', but found '<scalar>'",
    },
];

/// Conformance-suite cases this engine deliberately deviates on, kept as
/// an explicit matrix rather than silently patched over. The left column
/// is the upstream case id. When running against the external suite these
/// ids are excluded.
const KNOWN_DEVIATIONS: &[(&str, &str)] = &[
    // Accepted although the suite expects a failure.
    ("9JBA", "comment not separated from other tokens by whitespace"),
    ("CVW2", "comment not separated from other tokens by whitespace"),
    ("9C9N", "wrong indented flow sequence"),
    ("SU5Z", "comment without whitespace after double-quoted scalar"),
    ("QB6E", "wrong indented multiline quoted scalar"),
    ("Y79Y-003", "tabs in various contexts"),
    // Rejected although the suite expects a success.
    ("HWV9", "document-end marker"),
    ("NB6Z", "multiline plain value with tabs on empty lines"),
    ("VJP3-01", "flow collections over many lines"),
    ("5MUD", "colon and adjacent value on next line"),
    ("9SA2", "multiline double quoted flow mapping key"),
    ("QT73", "comment and document-end marker"),
    ("CFD4", "empty implicit key in single pair flow sequences"),
    ("NJ66", "multiline plain flow mapping key"),
    ("NKF9", "empty keys in block and flow mapping"),
    ("K3WX", "colon and adjacent value after comment on next line"),
    ("5T43", "colon at the beginning of adjacent flow scalar"),
    ("SM9W-01", "single character streams"),
    ("4MUZ-00", "flow mapping colon on line after key"),
    ("4MUZ-01", "flow mapping colon on line after key"),
    ("4MUZ-02", "flow mapping colon on line after key"),
    ("UKK6-00", "syntax character edge cases"),
    ("K54U", "tab after document header"),
    ("Y79Y-010", "tabs in various contexts"),
    ("2JQS", "block mapping with missing keys"),
    ("6M2F", "aliases in explicit block mapping"),
    ("S3PD", "implicit block mapping entries"),
    ("FRK4", "completely empty flow nodes"),
    ("NHX8", "empty lines at end of document"),
    ("M2N8-00", "question mark edge cases"),
    ("MUS6-03", "directive variants"),
    ("6BCT", "separation spaces"),
    ("Q5MG", "tab at beginning of line followed by a flow mapping"),
    ("DBG4", "plain character edge cases"),
    ("M7A3", "bare documents"),
    ("DK3J", "zero indented block scalar with line that looks like a comment"),
    ("W5VH", "allowed characters in alias"),
    ("58MP", "flow mapping edge cases"),
    ("UV7Q", "legal tab after indentation"),
    ("HM87-00", "scalars in flow start with syntax char"),
    ("DC7X", "various trailing tabs"),
    ("A2M4", "indentation indicators"),
    ("J3BT", "tabs and spaces"),
    ("HS5T", "plain lines with leading tab"),
    ("UT92", "explicit documents"),
    ("W4TN", "directives documents"),
    ("FP8R", "zero indented block scalar"),
    ("WZ62", "empty content"),
    ("7Z25", "bare document after document end marker"),
];

fn collect_events(yaml: &str) -> Result<Vec<String>, libyamel::Error> {
    let settings = LoadSettings::default().with_label("suite");
    let mut out = Vec::new();
    for event in events(yaml, &settings)? {
        let event = event?;
        out.push(event.to_string());
        if event.id() == EventId::StreamEnd {
            break;
        }
    }
    Ok(out)
}

fn run_case(case: &SuiteCase) -> Result<(), String> {
    let actual = collect_events(case.yaml)
        .map_err(|e| format!("{} ({}): unexpected error: {}", case.id, case.label, e))?;
    let expected: Vec<String> = case.events.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        return Err(format!(
            "{} ({}): event mismatch\n    expected: {:?}\n    actual:   {:?}",
            case.id, case.label, expected, actual
        ));
    }
    Ok(())
}

fn run_error_case(case: &ErrorCase) -> Result<(), String> {
    match collect_events(case.yaml) {
        Ok(events) => Err(format!(
            "{} ({}): expected an error, but got events {:?}",
            case.id, case.label, events
        )),
        Err(e) => {
            let message = e.to_string();
            if message.contains(case.message_fragment) {
                Ok(())
            } else {
                Err(format!(
                    "{} ({}): error mismatch\n    expected fragment: {}\n    actual:            {}",
                    case.id, case.label, case.message_fragment, message
                ))
            }
        }
    }
}

#[test]
fn test_event_suite() {
    let mut passed = 0;
    let mut errors: Vec<String> = Vec::new();

    for case in CASES {
        match run_case(case) {
            Ok(()) => passed += 1,
            Err(e) => errors.push(e),
        }
    }

    println!("\nResults: {} passed, {} failed", passed, errors.len());
    if !errors.is_empty() {
        println!("\nErrors:");
        for error in &errors {
            println!("  - {}", error);
        }
    }
    assert!(errors.is_empty(), "{} suite cases failed", errors.len());
}

#[test]
fn test_error_suite() {
    let mut passed = 0;
    let mut errors: Vec<String> = Vec::new();

    for case in ERROR_CASES {
        match run_error_case(case) {
            Ok(()) => passed += 1,
            Err(e) => errors.push(e),
        }
    }

    println!("\nResults: {} passed, {} failed", passed, errors.len());
    if !errors.is_empty() {
        println!("\nErrors:");
        for error in &errors {
            println!("  - {}", error);
        }
    }
    assert!(errors.is_empty(), "{} error cases failed", errors.len());
}

#[test]
fn test_deviation_matrix_is_well_formed() {
    let mut seen = std::collections::HashSet::new();
    for (id, reason) in KNOWN_DEVIATIONS {
        assert!(seen.insert(id), "duplicate deviation id {}", id);
        assert!(!reason.is_empty(), "deviation {} needs a reason", id);
    }
}
