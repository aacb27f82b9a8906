//! Dump side: node graph to events.
//!
//! The serializer walks a document depth-first. A first pass finds every
//! node that is referenced more than once (or from inside itself) and
//! assigns it an anchor name; the emit pass then sends the shared event
//! vocabulary to any [`Emitable`] sink, emitting an alias at the second
//! and later visits.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::events::{Event, EventData, ImplicitPair};
use crate::nodes::{Document, NodeData, NodeId};
use crate::settings::DumpSettings;
use crate::style::{CommentKind, FlowStyle, ScalarStyle};

/// Consumer of serialization events. Implemented by the emitter.
pub trait Emitable {
    fn emit(&mut self, event: Event) -> Result<()>;
}

/// Collects events into a vector. Useful for tests and low-level
/// consumers.
#[derive(Debug, Default)]
pub struct EventBuffer {
    pub events: Vec<Event>,
}

impl Emitable for EventBuffer {
    fn emit(&mut self, event: Event) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

/// Produces anchor names for shared nodes.
pub trait AnchorGenerator {
    fn next_anchor(&mut self) -> String;
}

/// The default generator: `id001`, `id002`, ...
#[derive(Debug, Default)]
pub struct NumberAnchorGenerator {
    counter: usize,
}

impl AnchorGenerator for NumberAnchorGenerator {
    fn next_anchor(&mut self) -> String {
        self.counter += 1;
        format!("id{:03}", self.counter)
    }
}

/// Converts node graphs into events.
pub struct Serializer<'a, E: Emitable> {
    emitable: &'a mut E,
    settings: DumpSettings,
    anchor_generator: Box<dyn AnchorGenerator>,
    anchors: HashMap<NodeId, Option<String>>,
    serialized: HashSet<NodeId>,
    opened: bool,
    closed: bool,
}

impl<'a, E: Emitable> Serializer<'a, E> {
    pub fn new(settings: &DumpSettings, emitable: &'a mut E) -> Self {
        Serializer {
            emitable,
            settings: settings.clone(),
            anchor_generator: Box::new(NumberAnchorGenerator::default()),
            anchors: HashMap::new(),
            serialized: HashSet::new(),
            opened: false,
            closed: false,
        }
    }

    pub fn with_anchor_generator(mut self, generator: Box<dyn AnchorGenerator>) -> Self {
        self.anchor_generator = generator;
        self
    }

    /// Emit the stream-start event. Must be called before the first
    /// document.
    pub fn open(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Serializer("serializer is closed".to_string()));
        }
        if self.opened {
            return Err(Error::Serializer("serializer is already opened".to_string()));
        }
        self.opened = true;
        self.emitable.emit(Event::new(EventData::StreamStart, None))
    }

    /// Emit the stream-end event.
    pub fn close(&mut self) -> Result<()> {
        if !self.opened {
            return Err(Error::Serializer("serializer is not opened".to_string()));
        }
        if !self.closed {
            self.emitable.emit(Event::new(EventData::StreamEnd, None))?;
            self.closed = true;
        }
        Ok(())
    }

    /// Serialize one document.
    pub fn serialize(&mut self, document: &Document) -> Result<()> {
        if !self.opened || self.closed {
            return Err(Error::Serializer(
                "serialize() must be called between open() and close()".to_string(),
            ));
        }
        self.emitable.emit(Event::new(
            EventData::DocumentStart {
                explicit: self.settings.explicit_start,
                version: self.settings.yaml_directive,
                tags: self.settings.tag_directives.clone(),
            },
            None,
        ))?;
        if self.settings.dereference_aliases {
            let mut path = HashSet::new();
            self.check_acyclic(document, document.root, &mut path)?;
        } else {
            self.anchor_node(document, document.root);
        }
        self.serialize_node(document, document.root)?;
        self.emitable.emit(Event::new(
            EventData::DocumentEnd {
                explicit: self.settings.explicit_end,
            },
            None,
        ))?;
        self.anchors.clear();
        self.serialized.clear();
        Ok(())
    }

    /// First pass: second sight of a node means it needs an anchor.
    fn anchor_node(&mut self, document: &Document, id: NodeId) {
        if let Some(anchor) = self.anchors.get_mut(&id) {
            if anchor.is_none() {
                *anchor = Some(self.anchor_generator.next_anchor());
            }
            return;
        }
        self.anchors.insert(id, None);
        match &document.arena.get(id).data {
            NodeData::Scalar { .. } => {}
            NodeData::Sequence { items, .. } => {
                for &item in items {
                    self.anchor_node(document, item);
                }
            }
            NodeData::Mapping { entries, .. } => {
                for &(key, value) in entries {
                    self.anchor_node(document, key);
                    self.anchor_node(document, value);
                }
            }
        }
    }

    /// Dereference-aliases mode cannot express cycles; fail fast.
    fn check_acyclic(
        &self,
        document: &Document,
        id: NodeId,
        path: &mut HashSet<NodeId>,
    ) -> Result<()> {
        if !path.insert(id) {
            return Err(Error::Serializer(
                "Cannot dereference aliases for recursive structures.".to_string(),
            ));
        }
        match &document.arena.get(id).data {
            NodeData::Scalar { .. } => {}
            NodeData::Sequence { items, .. } => {
                for &item in items {
                    self.check_acyclic(document, item, path)?;
                }
            }
            NodeData::Mapping { entries, .. } => {
                for &(key, value) in entries {
                    self.check_acyclic(document, key, path)?;
                    self.check_acyclic(document, value, path)?;
                }
            }
        }
        path.remove(&id);
        Ok(())
    }

    fn serialize_node(&mut self, document: &Document, id: NodeId) -> Result<()> {
        let anchor = self.anchors.get(&id).cloned().flatten();
        if !self.settings.dereference_aliases
            && anchor.is_some()
            && self.serialized.contains(&id)
        {
            return self.emitable.emit(Event::new(
                EventData::Alias {
                    anchor: anchor.unwrap(),
                },
                None,
            ));
        }
        self.serialized.insert(id);
        let node = document.arena.get(id);
        self.emit_comments(node.comments.as_deref().map(|c| c.block.as_slice()))?;
        let resolver = self.settings.schema.resolver();
        match &node.data {
            NodeData::Scalar { value, style } => {
                let detected = resolver.resolve(value, true) == node.tag;
                let default = resolver.resolve(value, false) == node.tag;
                let style = if *style == ScalarStyle::Plain
                    && self.settings.default_scalar_style != ScalarStyle::Plain
                {
                    self.settings.default_scalar_style
                } else {
                    *style
                };
                self.emitable.emit(Event::new(
                    EventData::Scalar {
                        anchor,
                        tag: Some(node.tag.value().to_string()),
                        implicit: ImplicitPair::new(detected, default),
                        value: value.clone(),
                        style,
                    },
                    None,
                ))?;
            }
            NodeData::Sequence { items, flow } => {
                let implicit = node.tag == *crate::nodes::tag::SEQ;
                self.emitable.emit(Event::new(
                    EventData::SequenceStart {
                        anchor,
                        tag: Some(node.tag.value().to_string()),
                        implicit,
                        flow: self.effective_flow(*flow),
                    },
                    None,
                ))?;
                for &item in items {
                    self.serialize_node(document, item)?;
                }
                self.emitable.emit(Event::new(EventData::SequenceEnd, None))?;
            }
            NodeData::Mapping { entries, flow } => {
                let implicit = node.tag == *crate::nodes::tag::MAP;
                self.emitable.emit(Event::new(
                    EventData::MappingStart {
                        anchor,
                        tag: Some(node.tag.value().to_string()),
                        implicit,
                        flow: self.effective_flow(*flow),
                    },
                    None,
                ))?;
                for &(key, value) in entries {
                    self.serialize_node(document, key)?;
                    self.serialize_node(document, value)?;
                }
                self.emitable.emit(Event::new(EventData::MappingEnd, None))?;
            }
        }
        if self.settings.dump_comments {
            if let Some(comments) = node.comments.as_deref() {
                if let Some(inline) = &comments.inline {
                    self.emitable.emit(Event::new(
                        EventData::Comment {
                            kind: CommentKind::InLine,
                            value: inline.clone(),
                        },
                        None,
                    ))?;
                }
            }
        }
        Ok(())
    }

    fn emit_comments(&mut self, comments: Option<&[String]>) -> Result<()> {
        if !self.settings.dump_comments {
            return Ok(());
        }
        if let Some(comments) = comments {
            for value in comments {
                self.emitable.emit(Event::new(
                    EventData::Comment {
                        kind: CommentKind::Block,
                        value: value.clone(),
                    },
                    None,
                ))?;
            }
        }
        Ok(())
    }

    /// A node pins its own style; `Auto` defers to the settings.
    fn effective_flow(&self, flow: FlowStyle) -> FlowStyle {
        match flow {
            FlowStyle::Auto => match self.settings.default_flow_style {
                FlowStyle::Flow => FlowStyle::Flow,
                _ => FlowStyle::Block,
            },
            pinned => pinned,
        }
    }
}
