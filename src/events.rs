//! The event vocabulary shared by the load and dump pipelines.
//!
//! Events mirror the YAML node-graph shape at stream granularity. The
//! parser produces them, the composer consumes them; the serializer
//! produces the same events and the emitter consumes them.
//!
//! `Display` renders the compact textual form used by the external
//! conformance suite: `+STR`, `+DOC ---`, `+SEQ []`, `=VAL &a <tag> :value`,
//! `=ALI *a`, and so on.

use std::fmt;

use crate::mark::Span;
use crate::style::{CommentKind, FlowStyle, ScalarStyle};

/// One parsing or serialization event.
#[derive(Debug, Clone)]
pub struct Event {
    pub data: EventData,
    pub span: Option<Span>,
}

impl Event {
    pub fn new(data: EventData, span: Option<Span>) -> Self {
        Event { data, span }
    }

    pub fn id(&self) -> EventId {
        self.data.id()
    }
}

/// Whether an implicit tag was inferred for a scalar: the pair is
/// (resolvable when plain, resolvable when non-plain).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImplicitPair {
    pub plain: bool,
    pub non_plain: bool,
}

impl ImplicitPair {
    pub fn new(plain: bool, non_plain: bool) -> Self {
        ImplicitPair { plain, non_plain }
    }

    pub fn both(value: bool) -> Self {
        ImplicitPair {
            plain: value,
            non_plain: value,
        }
    }
}

/// Payload of an event.
#[derive(Debug, Clone)]
pub enum EventData {
    StreamStart,
    StreamEnd,
    DocumentStart {
        explicit: bool,
        version: Option<(u32, u32)>,
        tags: Vec<(String, String)>,
    },
    DocumentEnd {
        explicit: bool,
    },
    Alias {
        anchor: String,
    },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: ImplicitPair,
        value: String,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow: FlowStyle,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow: FlowStyle,
    },
    MappingEnd,
    Comment {
        kind: CommentKind,
        value: String,
    },
}

impl EventData {
    pub fn id(&self) -> EventId {
        match self {
            EventData::StreamStart => EventId::StreamStart,
            EventData::StreamEnd => EventId::StreamEnd,
            EventData::DocumentStart { .. } => EventId::DocumentStart,
            EventData::DocumentEnd { .. } => EventId::DocumentEnd,
            EventData::Alias { .. } => EventId::Alias,
            EventData::Scalar { .. } => EventId::Scalar,
            EventData::SequenceStart { .. } => EventId::SequenceStart,
            EventData::SequenceEnd => EventId::SequenceEnd,
            EventData::MappingStart { .. } => EventId::MappingStart,
            EventData::MappingEnd => EventId::MappingEnd,
            EventData::Comment { .. } => EventId::Comment,
        }
    }
}

/// Event discriminant for `check_event` lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventId {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    Alias,
    Scalar,
    SequenceStart,
    SequenceEnd,
    MappingStart,
    MappingEnd,
    Comment,
}

/// Escape a scalar value for the one-line textual event form.
fn escaped(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\x08' => out.push_str("\\b"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn write_properties(
    f: &mut fmt::Formatter<'_>,
    anchor: &Option<String>,
    tag: &Option<String>,
) -> fmt::Result {
    if let Some(anchor) = anchor {
        write!(f, " &{}", anchor)?;
    }
    if let Some(tag) = tag {
        write!(f, " <{}>", tag)?;
    }
    Ok(())
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            EventData::StreamStart => f.write_str("+STR"),
            EventData::StreamEnd => f.write_str("-STR"),
            EventData::DocumentStart { explicit, .. } => {
                if *explicit {
                    f.write_str("+DOC ---")
                } else {
                    f.write_str("+DOC")
                }
            }
            EventData::DocumentEnd { explicit } => {
                if *explicit {
                    f.write_str("-DOC ...")
                } else {
                    f.write_str("-DOC")
                }
            }
            EventData::Alias { anchor } => write!(f, "=ALI *{}", anchor),
            EventData::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                f.write_str("=VAL")?;
                write_properties(f, anchor, tag)?;
                write!(f, " {}{}", style.sigil(), escaped(value))
            }
            EventData::SequenceStart { anchor, tag, flow, .. } => {
                f.write_str("+SEQ")?;
                if flow.is_flow() {
                    f.write_str(" []")?;
                }
                write_properties(f, anchor, tag)
            }
            EventData::SequenceEnd => f.write_str("-SEQ"),
            EventData::MappingStart { anchor, tag, flow, .. } => {
                f.write_str("+MAP")?;
                if flow.is_flow() {
                    f.write_str(" {}")?;
                }
                write_properties(f, anchor, tag)
            }
            EventData::MappingEnd => f.write_str("-MAP"),
            EventData::Comment { kind, value } => match kind {
                CommentKind::Block => write!(f, "=COM #{}", escaped(value)),
                CommentKind::InLine => write!(f, "=COM ~#{}", escaped(value)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: EventData) -> Event {
        Event::new(data, None)
    }

    #[test]
    fn test_stream_events() {
        assert_eq!(event(EventData::StreamStart).to_string(), "+STR");
        assert_eq!(event(EventData::StreamEnd).to_string(), "-STR");
    }

    #[test]
    fn test_document_events() {
        let start = event(EventData::DocumentStart {
            explicit: true,
            version: None,
            tags: Vec::new(),
        });
        assert_eq!(start.to_string(), "+DOC ---");
        assert_eq!(event(EventData::DocumentEnd { explicit: false }).to_string(), "-DOC");
    }

    #[test]
    fn test_scalar_with_properties() {
        let scalar = event(EventData::Scalar {
            anchor: Some("a".to_string()),
            tag: Some("ttt".to_string()),
            implicit: ImplicitPair::both(false),
            value: "v1".to_string(),
            style: ScalarStyle::Folded,
        });
        assert_eq!(scalar.to_string(), "=VAL &a <ttt> >v1");
    }

    #[test]
    fn test_scalar_escapes() {
        let scalar = event(EventData::Scalar {
            anchor: None,
            tag: None,
            implicit: ImplicitPair::both(true),
            value: "a\nb\tc\\".to_string(),
            style: ScalarStyle::Plain,
        });
        assert_eq!(scalar.to_string(), "=VAL :a\\nb\\tc\\\\");
    }

    #[test]
    fn test_flow_collection_markers() {
        let seq = event(EventData::SequenceStart {
            anchor: Some("a".to_string()),
            tag: Some("ttt".to_string()),
            implicit: false,
            flow: FlowStyle::Flow,
        });
        assert_eq!(seq.to_string(), "+SEQ [] &a <ttt>");
        let map = event(EventData::MappingStart {
            anchor: None,
            tag: None,
            implicit: true,
            flow: FlowStyle::Block,
        });
        assert_eq!(map.to_string(), "+MAP");
    }

    #[test]
    fn test_alias() {
        assert_eq!(
            event(EventData::Alias { anchor: "002".to_string() }).to_string(),
            "=ALI *002"
        );
    }
}
