//! Phase 4: Composer
//!
//! The composer assembles events into a node graph, resolving tags through
//! the active schema and anchors/aliases through a per-document table.
//!
//! Collection nodes are allocated and anchored *before* their children are
//! composed, which is what lets a child alias point back at an ancestor and
//! form a cycle. Nodes revisited during their own construction get the
//! `recursive` flag.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::events::{EventData, EventId};
use crate::mark::{Mark, Span};
use crate::nodes::{tag, Document, Node, NodeArena, NodeData, NodeId, Tag};
use crate::parser::Parser;
use crate::resolver::Schema;
use crate::settings::LoadSettings;
use crate::style::CommentKind;

fn span_start(span: &Option<Span>) -> Option<Mark> {
    span.as_ref().map(|s| s.start.clone())
}

/// Converts events into per-document node graphs.
pub struct Composer {
    parser: Parser,
    schema: Schema,
    allow_duplicate_keys: bool,
    allow_recursive_keys: bool,
    max_aliases_for_collections: usize,
    parse_comments: bool,
    stream_started: bool,
    stream_ended: bool,
    arena: NodeArena,
    anchors: HashMap<String, NodeId>,
    /// Nodes whose children are still being composed.
    open: HashSet<NodeId>,
    non_scalar_aliases: usize,
    pending_comments: Vec<String>,
    last_node: Option<NodeId>,
}

impl Composer {
    pub fn new(settings: &LoadSettings, input: &str) -> Result<Self> {
        let parser = Parser::new(settings, input)?;
        Ok(Self::with_parser(settings, parser))
    }

    pub fn from_bytes(settings: &LoadSettings, input: &[u8]) -> Result<Self> {
        let parser = Parser::from_bytes(settings, input)?;
        Ok(Self::with_parser(settings, parser))
    }

    fn with_parser(settings: &LoadSettings, parser: Parser) -> Self {
        Composer {
            parser,
            schema: settings.schema.clone(),
            allow_duplicate_keys: settings.allow_duplicate_keys,
            allow_recursive_keys: settings.allow_recursive_keys,
            max_aliases_for_collections: settings.max_aliases_for_collections,
            parse_comments: settings.parse_comments,
            stream_started: false,
            stream_ended: false,
            arena: NodeArena::new(),
            anchors: HashMap::new(),
            open: HashSet::new(),
            non_scalar_aliases: 0,
            pending_comments: Vec::new(),
            last_node: None,
        }
    }

    fn ensure_stream_started(&mut self) -> Result<()> {
        if !self.stream_started {
            self.parser.next_event()?;
            self.stream_started = true;
        }
        Ok(())
    }

    /// Whether the stream holds another document.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.stream_ended {
            return Ok(false);
        }
        self.ensure_stream_started()?;
        self.collect_comments()?;
        Ok(!self.parser.check_event(&[EventId::StreamEnd])?)
    }

    /// Compose the next document, or `None` at the end of the stream.
    pub fn compose_next(&mut self) -> Result<Option<Document>> {
        if !self.has_next()? {
            if !self.stream_ended {
                self.parser.next_event()?;
                self.stream_ended = true;
            }
            return Ok(None);
        }

        self.parser.next_event()?; // DocumentStart
        let root = self.compose_node()?;
        let end_comments = self.drain_trailing_comments()?;
        self.parser.next_event()?; // DocumentEnd

        let arena = std::mem::take(&mut self.arena);
        self.anchors.clear();
        self.open.clear();
        self.non_scalar_aliases = 0;
        self.pending_comments.clear();
        self.last_node = None;
        Ok(Some(Document {
            arena,
            root,
            end_comments,
        }))
    }

    /// Compose the only document of the stream. Fails when the stream
    /// holds more than one.
    pub fn compose_single(&mut self) -> Result<Option<Document>> {
        let document = self.compose_next()?;
        if document.is_some() && self.has_next()? {
            let context_mark = document
                .as_ref()
                .and_then(|d| d.root_node().span.as_ref().map(|s| s.start.clone()));
            let mark = span_start(&self.parser.peek_event()?.span.clone());
            return Err(Error::composer_in(
                "expected a single document in the stream",
                context_mark,
                "but found another document",
                mark,
            ));
        }
        Ok(document)
    }

    /// Buffer comment events: block comments wait for the next node,
    /// inline comments attach to the node just composed.
    fn collect_comments(&mut self) -> Result<()> {
        if !self.parse_comments {
            return Ok(());
        }
        while self.parser.check_event(&[EventId::Comment])? {
            let event = self.parser.next_event()?;
            if let EventData::Comment { kind, value } = event.data {
                match kind {
                    CommentKind::Block => self.pending_comments.push(value),
                    CommentKind::InLine => {
                        if let Some(id) = self.last_node {
                            let node = self.arena.get_mut(id);
                            node.comments
                                .get_or_insert_with(Default::default)
                                .inline = Some(value);
                        } else {
                            self.pending_comments.push(value);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn drain_trailing_comments(&mut self) -> Result<Vec<String>> {
        self.collect_comments()?;
        Ok(std::mem::take(&mut self.pending_comments))
    }

    fn take_pending_comments(&mut self, node: &mut Node) {
        if !self.pending_comments.is_empty() {
            node.comments.get_or_insert_with(Default::default).block =
                std::mem::take(&mut self.pending_comments);
        }
    }

    fn compose_node(&mut self) -> Result<NodeId> {
        self.collect_comments()?;
        if self.parser.check_event(&[EventId::Alias])? {
            return self.compose_alias();
        }
        let id = match self.parser.peek_event()?.id() {
            EventId::Scalar => self.compose_scalar()?,
            EventId::SequenceStart => self.compose_sequence()?,
            EventId::MappingStart => self.compose_mapping()?,
            _ => {
                let event = self.parser.peek_event()?;
                let mark = span_start(&event.span.clone());
                return Err(Error::composer("expected a node event", mark));
            }
        };
        self.last_node = Some(id);
        Ok(id)
    }

    fn compose_alias(&mut self) -> Result<NodeId> {
        let event = self.parser.next_event()?;
        let mark = span_start(&event.span);
        if let EventData::Alias { anchor } = event.data {
            let id = *self.anchors.get(&anchor).ok_or_else(|| {
                Error::composer(format!("found undefined alias {}", anchor), mark)
            })?;
            if self.open.contains(&id) {
                self.arena.get_mut(id).recursive = true;
            }
            if !self.arena.get(id).is_scalar() {
                self.non_scalar_aliases += 1;
                if self.non_scalar_aliases > self.max_aliases_for_collections {
                    return Err(Error::composer(
                        format!(
                            "Number of aliases for non-scalar nodes exceeds the specified max={}",
                            self.max_aliases_for_collections
                        ),
                        None,
                    ));
                }
            }
            return Ok(id);
        }
        unreachable!("alias event expected")
    }

    fn compose_scalar(&mut self) -> Result<NodeId> {
        let event = self.parser.next_event()?;
        if let EventData::Scalar {
            anchor,
            tag: event_tag,
            implicit,
            value,
            style,
        } = event.data
        {
            let (tag, resolved) = match event_tag.as_deref() {
                None | Some("!") => (
                    self.schema.resolver().resolve(&value, implicit.plain),
                    true,
                ),
                Some(explicit) => (Tag::new(explicit), false),
            };
            let mut node = Node::scalar(tag, value, style);
            node.span = event.span;
            node.resolved = resolved;
            self.take_pending_comments(&mut node);
            let id = self.arena.alloc(node);
            if let Some(anchor) = anchor {
                self.anchors.insert(anchor, id);
            }
            return Ok(id);
        }
        unreachable!("scalar event expected")
    }

    fn compose_sequence(&mut self) -> Result<NodeId> {
        let event = self.parser.next_event()?;
        if let EventData::SequenceStart {
            anchor,
            tag: event_tag,
            flow,
            ..
        } = event.data
        {
            let (node_tag, resolved) = match event_tag.as_deref() {
                None | Some("!") => (tag::SEQ.clone(), true),
                Some(explicit) => (Tag::new(explicit), false),
            };
            let mut node = Node::sequence(node_tag, Vec::new(), flow);
            node.span = event.span;
            node.resolved = resolved;
            self.take_pending_comments(&mut node);
            let id = self.arena.alloc(node);
            if let Some(anchor) = anchor {
                self.anchors.insert(anchor, id);
            }
            self.open.insert(id);

            loop {
                self.collect_comments()?;
                if self.parser.check_event(&[EventId::SequenceEnd])? {
                    break;
                }
                let child = self.compose_node()?;
                if let NodeData::Sequence { items, .. } = &mut self.arena.get_mut(id).data {
                    items.push(child);
                }
            }
            let end = self.parser.next_event()?;
            self.extend_span(id, &end.span);
            self.open.remove(&id);
            return Ok(id);
        }
        unreachable!("sequence start event expected")
    }

    fn compose_mapping(&mut self) -> Result<NodeId> {
        let event = self.parser.next_event()?;
        if let EventData::MappingStart {
            anchor,
            tag: event_tag,
            flow,
            ..
        } = event.data
        {
            let (node_tag, resolved) = match event_tag.as_deref() {
                None | Some("!") => (tag::MAP.clone(), true),
                Some(explicit) => (Tag::new(explicit), false),
            };
            let mut node = Node::mapping(node_tag, Vec::new(), flow);
            node.span = event.span;
            node.resolved = resolved;
            self.take_pending_comments(&mut node);
            let id = self.arena.alloc(node);
            if let Some(anchor) = anchor {
                self.anchors.insert(anchor, id);
            }
            self.open.insert(id);

            loop {
                self.collect_comments()?;
                if self.parser.check_event(&[EventId::MappingEnd])? {
                    break;
                }
                let key = self.compose_node()?;
                if self.arena.get(key).recursive && !self.allow_recursive_keys {
                    let mark = self
                        .arena
                        .get(key)
                        .span
                        .as_ref()
                        .map(|s| s.start.clone());
                    return Err(Error::composer(
                        "Recursive key for mapping is detected but it is not configured to be allowed.",
                        mark,
                    ));
                }
                let value = self.compose_node()?;
                if !self.allow_duplicate_keys {
                    self.check_duplicate_key(id, key)?;
                }
                if let NodeData::Mapping { entries, .. } = &mut self.arena.get_mut(id).data {
                    entries.push((key, value));
                }
            }
            let end = self.parser.next_event()?;
            self.extend_span(id, &end.span);
            self.open.remove(&id);
            return Ok(id);
        }
        unreachable!("mapping start event expected")
    }

    /// Reject a scalar key that repeats an earlier key of the same
    /// mapping, unless duplicates are allowed by policy.
    fn check_duplicate_key(&self, mapping: NodeId, key: NodeId) -> Result<()> {
        let key_node = self.arena.get(key);
        let (key_tag, key_value) = match &key_node.data {
            NodeData::Scalar { value, .. } => (&key_node.tag, value),
            _ => return Ok(()),
        };
        if let NodeData::Mapping { entries, .. } = &self.arena.get(mapping).data {
            for &(existing, _) in entries {
                let existing_node = self.arena.get(existing);
                if let NodeData::Scalar { value, .. } = &existing_node.data {
                    if &existing_node.tag == key_tag && value == key_value {
                        let mark = key_node.span.as_ref().map(|s| s.start.clone());
                        return Err(Error::composer(
                            format!("found duplicate key {}", key_value),
                            mark,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn extend_span(&mut self, id: NodeId, end: &Option<Span>) {
        let node = self.arena.get_mut(id);
        if let (Some(span), Some(end)) = (&mut node.span, end) {
            span.end = end.end.clone();
        }
    }
}

/// Lazy per-document iterator. A failing document ends the iteration but
/// does not invalidate documents already yielded.
pub struct DocumentIter {
    composer: Composer,
    failed: bool,
}

impl DocumentIter {
    pub fn new(composer: Composer) -> Self {
        DocumentIter {
            composer,
            failed: false,
        }
    }
}

impl Iterator for DocumentIter {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.composer.compose_next() {
            Ok(Some(document)) => Some(Ok(document)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::ScalarStyle;

    fn compose_one(input: &str) -> Document {
        let settings = LoadSettings::default();
        let mut composer = Composer::new(&settings, input).unwrap();
        composer.compose_single().unwrap().unwrap()
    }

    fn scalar_value(doc: &Document, id: NodeId) -> &str {
        match &doc.arena.get(id).data {
            NodeData::Scalar { value, .. } => value,
            other => panic!("expected scalar, got {:?}", other),
        }
    }

    #[test]
    fn test_compose_scalar() {
        let doc = compose_one("17\n");
        let root = doc.root_node();
        assert_eq!(root.tag, *tag::INT);
        assert_eq!(scalar_value(&doc, doc.root), "17");
    }

    #[test]
    fn test_quoted_scalar_stays_string() {
        let doc = compose_one("'17'\n");
        assert_eq!(doc.root_node().tag, *tag::STR);
    }

    #[test]
    fn test_compose_mapping() {
        let doc = compose_one("a: 1\nb: 2\n");
        match &doc.root_node().data {
            NodeData::Mapping { entries, .. } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(scalar_value(&doc, entries[0].0), "a");
                assert_eq!(scalar_value(&doc, entries[1].1), "2");
            }
            other => panic!("expected mapping, got {:?}", other),
        }
    }

    #[test]
    fn test_alias_is_same_node() {
        let doc = compose_one("- &a x\n- *a\n");
        match &doc.root_node().data {
            NodeData::Sequence { items, .. } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], items[1]);
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_sets_recursive() {
        let doc = compose_one("&a [*a]\n");
        let root = doc.root_node();
        assert!(root.recursive);
        match &root.data {
            NodeData::Sequence { items, .. } => assert_eq!(items[0], doc.root),
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_alias_fails() {
        let settings = LoadSettings::default();
        let mut composer = Composer::new(&settings, "- *nope\n").unwrap();
        let err = composer.compose_single().unwrap_err();
        assert!(matches!(err, Error::Composer(_)));
        assert!(err.to_string().contains("found undefined alias nope"));
    }

    #[test]
    fn test_alias_ceiling() {
        let settings = LoadSettings::default().with_max_aliases_for_collections(2);
        let input = "- &a [x]\n- *a\n- *a\n- *a\n";
        let mut composer = Composer::new(&settings, input).unwrap();
        let err = composer.compose_single().unwrap_err();
        assert!(err
            .to_string()
            .contains("Number of aliases for non-scalar nodes exceeds the specified max=2"));
    }

    #[test]
    fn test_scalar_aliases_not_counted() {
        let settings = LoadSettings::default().with_max_aliases_for_collections(2);
        let input = "- &a x\n- *a\n- *a\n- *a\n- *a\n";
        let mut composer = Composer::new(&settings, input).unwrap();
        assert!(composer.compose_single().is_ok());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let settings = LoadSettings::default();
        let mut composer = Composer::new(&settings, "a: 1\na: 2\n").unwrap();
        let err = composer.compose_single().unwrap_err();
        assert!(err.to_string().contains("found duplicate key a"));
    }

    #[test]
    fn test_duplicate_key_allowed_by_policy() {
        let settings = LoadSettings::default().with_allow_duplicate_keys(true);
        let mut composer = Composer::new(&settings, "a: 1\na: 2\n").unwrap();
        assert!(composer.compose_single().is_ok());
    }

    #[test]
    fn test_single_document_check() {
        let settings = LoadSettings::default();
        let mut composer = Composer::new(&settings, "a\n---\nb\n").unwrap();
        let err = composer.compose_single().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("expected a single document in the stream"));
        assert!(text.contains("but found another document"));
    }

    #[test]
    fn test_multi_document_iteration() {
        let settings = LoadSettings::default();
        let composer = Composer::new(&settings, "one\n---\ntwo\n---\nthree\n").unwrap();
        let values: Vec<String> = DocumentIter::new(composer)
            .map(|doc| {
                let doc = doc.unwrap();
                scalar_value(&doc, doc.root).to_string()
            })
            .collect();
        assert_eq!(values, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_anchors_reset_between_documents() {
        let settings = LoadSettings::default();
        let composer = Composer::new(&settings, "&a x\n---\n*a\n").unwrap();
        let results: Vec<Result<Document>> = DocumentIter::new(composer).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_comments_attached_to_nodes() {
        let settings = LoadSettings::default().with_parse_comments(true);
        let mut composer = Composer::new(&settings, "# leading\na: 1 # trailing\n").unwrap();
        let doc = composer.compose_single().unwrap().unwrap();
        let root = doc.root_node();
        let comments = root.comments.as_ref().expect("root should carry comments");
        assert_eq!(comments.block, vec![" leading".to_string()]);
        match &root.data {
            NodeData::Mapping { entries, .. } => {
                let value = doc.arena.get(entries[0].1);
                let comments = value.comments.as_ref().expect("value should carry comments");
                assert_eq!(comments.inline.as_deref(), Some(" trailing"));
            }
            other => panic!("expected mapping, got {:?}", other),
        }
    }

    #[test]
    fn test_block_style_recorded() {
        let doc = compose_one("a: 1\n");
        match &doc.root_node().data {
            NodeData::Mapping { flow, .. } => assert!(!flow.is_flow()),
            other => panic!("expected mapping, got {:?}", other),
        }
        let doc = compose_one("{a: 1}\n");
        match &doc.root_node().data {
            NodeData::Mapping { flow, .. } => assert!(flow.is_flow()),
            other => panic!("expected mapping, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_style_preserved() {
        let doc = compose_one("|\n  text\n");
        match &doc.root_node().data {
            NodeData::Scalar { style, .. } => assert_eq!(*style, ScalarStyle::Literal),
            other => panic!("expected scalar, got {:?}", other),
        }
    }
}
