//! Dump side: events to text.
//!
//! The emitter is a state machine mirroring the parser's, driving the
//! presentation decisions: per scalar, the cheapest style that survives a
//! round trip under the active schema; per collection, flow vs. block;
//! per line, folding against the preferred width. It buffers just enough
//! events to decide document framing, empty-collection short forms and
//! simple keys.

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::events::{Event, EventData, ImplicitPair};
use crate::serializer::Emitable;
use crate::settings::DumpSettings;
use crate::style::{CommentKind, FlowStyle, ScalarStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitState {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentRoot,
    DocumentEnd,
    FlowSequenceFirstItem,
    FlowSequenceItem,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    BlockSequenceFirstItem,
    BlockSequenceItem,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
    Nothing,
}

/// What a scalar's text allows, computed once per scalar.
#[derive(Debug, Clone)]
struct ScalarAnalysis {
    empty: bool,
    multiline: bool,
    allow_flow_plain: bool,
    allow_block_plain: bool,
    allow_single_quoted: bool,
    allow_block: bool,
}

fn is_break_char(c: char) -> bool {
    c == '\n'
}

fn is_special(c: char) -> bool {
    let printable = c == '\n'
        || ('\x20'..='\x7e').contains(&c)
        || ('\u{a0}'..='\u{d7ff}').contains(&c)
        || ('\u{e000}'..='\u{fffd}').contains(&c)
        || c >= '\u{10000}';
    !printable || matches!(c, '\u{feff}' | '\u{2028}' | '\u{2029}')
}

fn default_tag_prefixes() -> HashMap<String, String> {
    let mut prefixes = HashMap::new();
    prefixes.insert("!".to_string(), "!".to_string());
    prefixes.insert("tag:yaml.org,2002:".to_string(), "!!".to_string());
    prefixes
}

/// Converts events into YAML text.
pub struct Emitter {
    settings: DumpSettings,
    out: String,
    states: Vec<EmitState>,
    state: EmitState,
    events: VecDeque<Event>,
    indents: Vec<Option<isize>>,
    indent: Option<isize>,
    flow_level: usize,
    root_context: bool,
    mapping_context: bool,
    simple_key_context: bool,
    line: usize,
    column: usize,
    whitespace: bool,
    indention: bool,
    open_ended: bool,
    best_indent: usize,
    best_width: usize,
    tag_prefixes: HashMap<String, String>,
    prepared_anchor: Option<String>,
    prepared_tag: Option<String>,
    analysis: Option<ScalarAnalysis>,
    style: Option<ScalarStyle>,
}

impl Emitable for Emitter {
    fn emit(&mut self, event: Event) -> Result<()> {
        self.events.push_back(event);
        while !self.need_more_events() {
            let event = self.events.pop_front().expect("event queue is not empty");
            self.process(event)?;
        }
        Ok(())
    }
}

impl Emitter {
    pub fn new(settings: &DumpSettings) -> Result<Self> {
        settings.validate()?;
        let best_width = if settings.width > settings.indent * 2 {
            settings.width
        } else {
            80
        };
        Ok(Emitter {
            settings: settings.clone(),
            out: String::new(),
            states: Vec::new(),
            state: EmitState::StreamStart,
            events: VecDeque::new(),
            indents: Vec::new(),
            indent: None,
            flow_level: 0,
            root_context: false,
            mapping_context: false,
            simple_key_context: false,
            line: 0,
            column: 0,
            whitespace: true,
            indention: true,
            open_ended: false,
            best_indent: settings.indent,
            best_width,
            tag_prefixes: default_tag_prefixes(),
            prepared_anchor: None,
            prepared_tag: None,
            analysis: None,
            style: None,
        })
    }

    /// The text produced so far.
    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_output(self) -> String {
        self.out
    }

    // ------------------------------------------------------------------
    // Event queue
    // ------------------------------------------------------------------

    /// Document and collection starts wait for enough context to decide
    /// short forms and simple keys.
    fn need_more_events(&self) -> bool {
        let head = match self.events.front() {
            Some(event) => event,
            None => return true,
        };
        let count = match head.data {
            EventData::DocumentStart { .. } => 1,
            EventData::SequenceStart { .. } => 2,
            EventData::MappingStart { .. } => 3,
            _ => return false,
        };
        self.need_events(count)
    }

    fn need_events(&self, count: usize) -> bool {
        let mut level: isize = 0;
        for event in self.events.iter().skip(1) {
            match event.data {
                EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => level -= 1,
                EventData::StreamEnd => level = -1,
                _ => {}
            }
            if level < 0 {
                return false;
            }
        }
        self.events.len() < count + 1
    }

    fn process(&mut self, event: Event) -> Result<()> {
        if let EventData::Comment { kind, value } = &event.data {
            return self.write_comment(*kind, value);
        }
        match self.state {
            EmitState::StreamStart => self.expect_stream_start(event),
            EmitState::FirstDocumentStart => self.expect_document_start(event, true),
            EmitState::DocumentStart => self.expect_document_start(event, false),
            EmitState::DocumentRoot => self.expect_document_root(event),
            EmitState::DocumentEnd => self.expect_document_end(event),
            EmitState::FlowSequenceFirstItem => self.expect_flow_sequence_item(event, true),
            EmitState::FlowSequenceItem => self.expect_flow_sequence_item(event, false),
            EmitState::FlowMappingFirstKey => self.expect_flow_mapping_key(event, true),
            EmitState::FlowMappingKey => self.expect_flow_mapping_key(event, false),
            EmitState::FlowMappingSimpleValue => self.expect_flow_mapping_simple_value(event),
            EmitState::FlowMappingValue => self.expect_flow_mapping_value(event),
            EmitState::BlockSequenceFirstItem => self.expect_block_sequence_item(event, true),
            EmitState::BlockSequenceItem => self.expect_block_sequence_item(event, false),
            EmitState::BlockMappingFirstKey => self.expect_block_mapping_key(event, true),
            EmitState::BlockMappingKey => self.expect_block_mapping_key(event, false),
            EmitState::BlockMappingSimpleValue => self.expect_block_mapping_simple_value(event),
            EmitState::BlockMappingValue => self.expect_block_mapping_value(event),
            EmitState::Nothing => Err(Error::Emitter(format!(
                "expected nothing, but got {}",
                event
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Stream and document states
    // ------------------------------------------------------------------

    fn expect_stream_start(&mut self, event: Event) -> Result<()> {
        match event.data {
            EventData::StreamStart => {
                self.state = EmitState::FirstDocumentStart;
                Ok(())
            }
            _ => Err(Error::Emitter(format!(
                "expected StreamStart, but got {}",
                event
            ))),
        }
    }

    fn expect_document_start(&mut self, event: Event, first: bool) -> Result<()> {
        match &event.data {
            EventData::DocumentStart {
                explicit,
                version,
                tags,
            } => {
                if (version.is_some() || !tags.is_empty()) && self.open_ended {
                    self.write_indicator("...", true, false, false);
                    self.write_indent();
                }
                if let Some((major, minor)) = version {
                    self.write_version_directive(*major, *minor);
                }
                self.tag_prefixes = default_tag_prefixes();
                if !tags.is_empty() {
                    let mut sorted = tags.clone();
                    sorted.sort();
                    for (handle, prefix) in sorted {
                        self.tag_prefixes.insert(prefix.clone(), handle.clone());
                        self.write_tag_directive(&handle, &prefix);
                    }
                }
                let implicit = first
                    && !explicit
                    && !self.settings.canonical
                    && version.is_none()
                    && tags.is_empty()
                    && !self.check_empty_document();
                if !implicit {
                    self.write_indent();
                    self.write_indicator("---", true, false, false);
                    if self.settings.canonical {
                        self.write_indent();
                    }
                }
                self.state = EmitState::DocumentRoot;
                Ok(())
            }
            EventData::StreamEnd => {
                if self.open_ended {
                    self.write_indicator("...", true, false, false);
                    self.write_indent();
                }
                self.state = EmitState::Nothing;
                Ok(())
            }
            _ => Err(Error::Emitter(format!(
                "expected DocumentStart, but got {}",
                event
            ))),
        }
    }

    fn expect_document_root(&mut self, event: Event) -> Result<()> {
        self.states.push(EmitState::DocumentEnd);
        self.expect_node(event, true, false, false)
    }

    fn expect_document_end(&mut self, event: Event) -> Result<()> {
        match event.data {
            EventData::DocumentEnd { explicit } => {
                self.write_indent();
                if explicit {
                    self.write_indicator("...", true, false, false);
                    self.write_indent();
                    self.open_ended = false;
                }
                self.state = EmitState::DocumentStart;
                Ok(())
            }
            _ => Err(Error::Emitter(format!(
                "expected DocumentEnd, but got {}",
                event
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Node states
    // ------------------------------------------------------------------

    fn expect_node(
        &mut self,
        event: Event,
        root: bool,
        mapping: bool,
        simple_key: bool,
    ) -> Result<()> {
        self.root_context = root;
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;
        match &event.data {
            EventData::Alias { .. } => self.expect_alias(event),
            EventData::Scalar { .. } => {
                self.process_anchor(&event, "&")?;
                self.process_tag(&event)?;
                self.expect_scalar(event)
            }
            EventData::SequenceStart { flow, .. } => {
                self.process_anchor(&event, "&")?;
                self.process_tag(&event)?;
                if self.flow_level > 0
                    || self.settings.canonical
                    || flow.is_flow()
                    || self.check_empty_sequence()
                {
                    self.expect_flow_sequence()
                } else {
                    self.expect_block_sequence()
                }
            }
            EventData::MappingStart { flow, .. } => {
                self.process_anchor(&event, "&")?;
                self.process_tag(&event)?;
                if self.flow_level > 0
                    || self.settings.canonical
                    || flow.is_flow()
                    || self.check_empty_mapping()
                {
                    self.expect_flow_mapping()
                } else {
                    self.expect_block_mapping()
                }
            }
            _ => Err(Error::Emitter(format!(
                "expected a node event, but got {}",
                event
            ))),
        }
    }

    fn expect_alias(&mut self, event: Event) -> Result<()> {
        self.process_anchor(&event, "*")?;
        self.state = self.states.pop().unwrap_or(EmitState::Nothing);
        Ok(())
    }

    fn expect_scalar(&mut self, event: Event) -> Result<()> {
        self.increase_indent(true, false);
        self.process_scalar(&event)?;
        self.indent = self.indents.pop().unwrap_or(None);
        self.state = self.states.pop().unwrap_or(EmitState::Nothing);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Flow collections
    // ------------------------------------------------------------------

    fn expect_flow_sequence(&mut self) -> Result<()> {
        self.write_indicator("[", true, true, false);
        self.flow_level += 1;
        self.increase_indent(true, false);
        self.state = EmitState::FlowSequenceFirstItem;
        Ok(())
    }

    fn expect_flow_sequence_item(&mut self, event: Event, first: bool) -> Result<()> {
        if let EventData::SequenceEnd = event.data {
            self.indent = self.indents.pop().unwrap_or(None);
            self.flow_level -= 1;
            if self.settings.canonical && !first {
                self.write_indicator(",", false, false, false);
                self.write_indent();
            }
            self.write_indicator("]", false, false, false);
            self.state = self.states.pop().unwrap_or(EmitState::Nothing);
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false);
        }
        if self.settings.canonical
            || (self.column > self.best_width && self.settings.split_lines)
            || self.settings.multi_line_flow
        {
            self.write_indent();
        }
        self.states.push(EmitState::FlowSequenceItem);
        self.expect_node(event, false, false, false)
    }

    fn expect_flow_mapping(&mut self) -> Result<()> {
        self.write_indicator("{", true, true, false);
        self.flow_level += 1;
        self.increase_indent(true, false);
        self.state = EmitState::FlowMappingFirstKey;
        Ok(())
    }

    fn expect_flow_mapping_key(&mut self, event: Event, first: bool) -> Result<()> {
        if let EventData::MappingEnd = event.data {
            self.indent = self.indents.pop().unwrap_or(None);
            self.flow_level -= 1;
            if self.settings.canonical && !first {
                self.write_indicator(",", false, false, false);
                self.write_indent();
            }
            self.write_indicator("}", false, false, false);
            self.state = self.states.pop().unwrap_or(EmitState::Nothing);
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false);
        }
        if self.settings.canonical
            || (self.column > self.best_width && self.settings.split_lines)
            || self.settings.multi_line_flow
        {
            self.write_indent();
        }
        if !self.settings.canonical && self.check_simple_key(&event) {
            self.states.push(EmitState::FlowMappingSimpleValue);
            self.expect_node(event, false, true, true)
        } else {
            self.write_indicator("?", true, false, false);
            self.states.push(EmitState::FlowMappingValue);
            self.expect_node(event, false, true, false)
        }
    }

    fn expect_flow_mapping_simple_value(&mut self, event: Event) -> Result<()> {
        self.write_indicator(":", false, false, false);
        self.states.push(EmitState::FlowMappingKey);
        self.expect_node(event, false, true, false)
    }

    fn expect_flow_mapping_value(&mut self, event: Event) -> Result<()> {
        if self.settings.canonical
            || (self.column > self.best_width && self.settings.split_lines)
        {
            self.write_indent();
        }
        self.write_indicator(":", true, false, false);
        self.states.push(EmitState::FlowMappingKey);
        self.expect_node(event, false, true, false)
    }

    // ------------------------------------------------------------------
    // Block collections
    // ------------------------------------------------------------------

    fn expect_block_sequence(&mut self) -> Result<()> {
        let indentless = self.mapping_context && !self.indention;
        self.increase_indent(false, indentless);
        if self.settings.indent_with_indicator {
            if let Some(indent) = self.indent {
                self.indent = Some(indent + self.settings.indicator_indent as isize);
            }
        }
        self.state = EmitState::BlockSequenceFirstItem;
        Ok(())
    }

    fn expect_block_sequence_item(&mut self, event: Event, first: bool) -> Result<()> {
        if !first {
            if let EventData::SequenceEnd = event.data {
                self.indent = self.indents.pop().unwrap_or(None);
                self.state = self.states.pop().unwrap_or(EmitState::Nothing);
                return Ok(());
            }
        }
        self.write_indent();
        if self.settings.indicator_indent > 0 {
            let pad = " ".repeat(self.settings.indicator_indent);
            self.column += pad.chars().count();
            self.out.push_str(&pad);
        }
        self.write_indicator("-", true, false, true);
        self.states.push(EmitState::BlockSequenceItem);
        self.expect_node(event, false, false, false)
    }

    fn expect_block_mapping(&mut self) -> Result<()> {
        self.increase_indent(false, false);
        self.state = EmitState::BlockMappingFirstKey;
        Ok(())
    }

    fn expect_block_mapping_key(&mut self, event: Event, first: bool) -> Result<()> {
        if !first {
            if let EventData::MappingEnd = event.data {
                self.indent = self.indents.pop().unwrap_or(None);
                self.state = self.states.pop().unwrap_or(EmitState::Nothing);
                return Ok(());
            }
        }
        self.write_indent();
        if self.check_simple_key(&event) {
            self.states.push(EmitState::BlockMappingSimpleValue);
            self.expect_node(event, false, true, true)
        } else {
            self.write_indicator("?", true, false, true);
            self.states.push(EmitState::BlockMappingValue);
            self.expect_node(event, false, true, false)
        }
    }

    fn expect_block_mapping_simple_value(&mut self, event: Event) -> Result<()> {
        self.write_indicator(":", false, false, false);
        self.states.push(EmitState::BlockMappingKey);
        self.expect_node(event, false, true, false)
    }

    fn expect_block_mapping_value(&mut self, event: Event) -> Result<()> {
        self.write_indent();
        self.write_indicator(":", true, false, true);
        self.states.push(EmitState::BlockMappingKey);
        self.expect_node(event, false, true, false)
    }

    // ------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------

    fn check_empty_sequence(&self) -> bool {
        matches!(
            self.events.front().map(|e| &e.data),
            Some(EventData::SequenceEnd)
        )
    }

    fn check_empty_mapping(&self) -> bool {
        matches!(
            self.events.front().map(|e| &e.data),
            Some(EventData::MappingEnd)
        )
    }

    fn check_empty_document(&self) -> bool {
        match self.events.front().map(|e| &e.data) {
            Some(EventData::Scalar {
                anchor: None,
                tag: None,
                implicit,
                value,
                ..
            }) => implicit.plain && value.is_empty(),
            _ => false,
        }
    }

    fn check_simple_key(&mut self, event: &Event) -> bool {
        let mut length = 0;
        let (anchor, tag) = match &event.data {
            EventData::Alias { anchor } => (Some(anchor), None),
            EventData::Scalar { anchor, tag, .. } => (anchor.as_ref(), tag.as_ref()),
            EventData::SequenceStart { anchor, tag, .. }
            | EventData::MappingStart { anchor, tag, .. } => (anchor.as_ref(), tag.as_ref()),
            _ => return false,
        };
        if let Some(anchor) = anchor {
            length += anchor.chars().count() + 1;
        }
        if let Some(tag) = tag {
            length += tag.chars().count() + 2;
        }
        let scalar_ok = match &event.data {
            EventData::Scalar { value, .. } => {
                let analysis = self.analyze_or_cached(value);
                length += value.chars().count();
                !analysis.empty && !analysis.multiline
            }
            _ => false,
        };
        length <= self.settings.max_simple_key_length
            && (matches!(event.data, EventData::Alias { .. })
                || scalar_ok
                || (matches!(event.data, EventData::SequenceStart { .. })
                    && self.check_empty_sequence())
                || (matches!(event.data, EventData::MappingStart { .. })
                    && self.check_empty_mapping()))
    }

    fn analyze_or_cached(&mut self, value: &str) -> ScalarAnalysis {
        if self.analysis.is_none() {
            self.analysis = Some(analyze_scalar(value));
        }
        self.analysis.clone().expect("analysis is cached")
    }

    // ------------------------------------------------------------------
    // Anchors, tags, scalars
    // ------------------------------------------------------------------

    fn process_anchor(&mut self, event: &Event, indicator: &str) -> Result<()> {
        let anchor = match &event.data {
            EventData::Alias { anchor } => Some(anchor),
            EventData::Scalar { anchor, .. }
            | EventData::SequenceStart { anchor, .. }
            | EventData::MappingStart { anchor, .. } => anchor.as_ref(),
            _ => None,
        };
        let anchor = match anchor {
            Some(anchor) => anchor,
            None => {
                if matches!(event.data, EventData::Alias { .. }) {
                    return Err(Error::Emitter("anchor is not specified for alias".to_string()));
                }
                self.prepared_anchor = None;
                return Ok(());
            }
        };
        if self.prepared_anchor.is_none() {
            self.prepared_anchor = Some(prepare_anchor(anchor)?);
        }
        let prepared = format!("{}{}", indicator, self.prepared_anchor.take().unwrap());
        self.write_indicator(&prepared, true, false, false);
        Ok(())
    }

    fn process_tag(&mut self, event: &Event) -> Result<()> {
        let mut tag = match &event.data {
            EventData::Scalar { tag, .. }
            | EventData::SequenceStart { tag, .. }
            | EventData::MappingStart { tag, .. } => tag.clone(),
            _ => None,
        };
        match &event.data {
            EventData::Scalar {
                implicit, value, ..
            } => {
                if self.style.is_none() {
                    self.style = Some(self.choose_scalar_style(event, value)?);
                }
                let style = self.style.expect("style is chosen");
                let plain = style == ScalarStyle::Plain;
                if (!self.settings.canonical || tag.is_none())
                    && ((plain && implicit.plain) || (!plain && implicit.non_plain))
                {
                    self.prepared_tag = None;
                    return Ok(());
                }
                if implicit.plain && tag.is_none() {
                    tag = Some("!".to_string());
                    self.prepared_tag = None;
                }
            }
            EventData::SequenceStart { implicit, .. }
            | EventData::MappingStart { implicit, .. } => {
                if (!self.settings.canonical || tag.is_none()) && *implicit {
                    self.prepared_tag = None;
                    return Ok(());
                }
            }
            _ => {}
        }
        let tag = tag.ok_or_else(|| Error::Emitter("tag is not specified".to_string()))?;
        if self.prepared_tag.is_none() {
            self.prepared_tag = Some(self.prepare_tag(&tag)?);
        }
        let prepared = self.prepared_tag.take().unwrap();
        if !prepared.is_empty() {
            self.write_indicator(&prepared, true, false, false);
        }
        Ok(())
    }

    fn choose_scalar_style(&mut self, event: &Event, value: &str) -> Result<ScalarStyle> {
        let (implicit, requested) = match &event.data {
            EventData::Scalar {
                implicit, style, ..
            } => (*implicit, *style),
            _ => (ImplicitPair::both(false), ScalarStyle::Plain),
        };
        let analysis = self.analyze_or_cached(value);
        if requested == ScalarStyle::DoubleQuoted || self.settings.canonical {
            return Ok(ScalarStyle::DoubleQuoted);
        }
        if requested == ScalarStyle::Json {
            let plain_ok = self.plain_allowed(&analysis) && implicit.plain;
            return Ok(if plain_ok {
                ScalarStyle::Plain
            } else {
                ScalarStyle::DoubleQuoted
            });
        }
        if requested == ScalarStyle::Plain && implicit.plain && self.plain_allowed(&analysis) {
            return Ok(ScalarStyle::Plain);
        }
        if matches!(requested, ScalarStyle::Literal | ScalarStyle::Folded)
            && self.flow_level == 0
            && !self.simple_key_context
            && analysis.allow_block
        {
            return Ok(requested);
        }
        if matches!(requested, ScalarStyle::Plain | ScalarStyle::SingleQuoted)
            && analysis.allow_single_quoted
            && !(self.simple_key_context && analysis.multiline)
        {
            return Ok(ScalarStyle::SingleQuoted);
        }
        Ok(ScalarStyle::DoubleQuoted)
    }

    fn plain_allowed(&self, analysis: &ScalarAnalysis) -> bool {
        !(self.simple_key_context && (analysis.empty || analysis.multiline))
            && ((self.flow_level > 0 && analysis.allow_flow_plain)
                || (self.flow_level == 0 && analysis.allow_block_plain))
            && !analysis.empty
    }

    fn process_scalar(&mut self, event: &Event) -> Result<()> {
        let value = match &event.data {
            EventData::Scalar { value, .. } => value.clone(),
            _ => return Err(Error::Emitter("expected a scalar event".to_string())),
        };
        if self.style.is_none() {
            self.style = Some(self.choose_scalar_style(event, &value)?);
        }
        let style = self.style.take().expect("style is chosen");
        let split = !self.simple_key_context;
        match style {
            ScalarStyle::DoubleQuoted | ScalarStyle::Json => {
                self.write_double_quoted(&value, split)
            }
            ScalarStyle::SingleQuoted => self.write_single_quoted(&value, split),
            ScalarStyle::Folded => self.write_folded(&value),
            ScalarStyle::Literal => self.write_literal(&value),
            ScalarStyle::Plain => self.write_plain(&value, split),
        }
        self.analysis = None;
        Ok(())
    }

    fn prepare_tag(&self, tag: &str) -> Result<String> {
        if tag.is_empty() {
            return Err(Error::Emitter("tag must not be empty".to_string()));
        }
        if tag == "!" {
            return Ok(tag.to_string());
        }
        let mut handle: Option<&str> = None;
        let mut suffix = tag;
        let mut prefixes: Vec<&String> = self.tag_prefixes.keys().collect();
        prefixes.sort();
        for prefix in prefixes {
            if tag.starts_with(prefix.as_str()) && (prefix == "!" || prefix.len() < tag.len()) {
                handle = Some(self.tag_prefixes[prefix].as_str());
                suffix = &tag[prefix.len()..];
            }
        }
        let mut escaped = String::new();
        for c in suffix.chars() {
            if c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    '-' | ';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | ',' | '_' | '.'
                        | '~' | '*' | '\'' | '(' | ')' | '[' | ']'
                )
            {
                escaped.push(c);
            } else {
                let mut buffer = [0u8; 4];
                for byte in c.encode_utf8(&mut buffer).as_bytes() {
                    escaped.push_str(&format!("%{:02X}", byte));
                }
            }
        }
        Ok(match handle {
            Some(handle) => format!("{}{}", handle, escaped),
            None => format!("!<{}>", escaped),
        })
    }

    // ------------------------------------------------------------------
    // Low-level writers
    // ------------------------------------------------------------------

    fn write(&mut self, data: &str) {
        self.column += data.chars().count();
        self.out.push_str(data);
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        whitespace: bool,
        indention: bool,
    ) {
        if !self.whitespace && need_whitespace {
            self.write(" ");
        }
        self.whitespace = whitespace;
        self.indention = self.indention && indention;
        self.open_ended = false;
        self.write(indicator);
    }

    fn write_indent(&mut self) {
        let indent = self.indent.unwrap_or(0).max(0) as usize;
        if !self.indention
            || self.column > indent
            || (self.column == indent && !self.whitespace)
        {
            self.write_line_break();
        }
        if self.column < indent {
            self.whitespace = true;
            let pad = " ".repeat(indent - self.column);
            self.out.push_str(&pad);
            self.column = indent;
        }
    }

    fn write_line_break(&mut self) {
        self.whitespace = true;
        self.indention = true;
        self.line += 1;
        self.column = 0;
        let br = self.settings.best_line_break.clone();
        self.out.push_str(&br);
    }

    fn write_version_directive(&mut self, major: u32, minor: u32) {
        self.write(&format!("%YAML {}.{}", major, minor));
        self.write_line_break();
    }

    fn write_tag_directive(&mut self, handle: &str, prefix: &str) {
        self.write(&format!("%TAG {} {}", handle, prefix));
        self.write_line_break();
    }

    fn write_comment(&mut self, kind: CommentKind, value: &str) -> Result<()> {
        if !self.settings.dump_comments {
            return Ok(());
        }
        match kind {
            CommentKind::Block => {
                self.write_indent();
                self.write(&format!("#{}", value));
                self.write_line_break();
            }
            CommentKind::InLine => {
                if !self.whitespace {
                    self.write(" ");
                }
                self.write(&format!("#{}", value));
                self.whitespace = false;
                self.indention = false;
            }
        }
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        match self.indent {
            None => {
                self.indent = Some(if flow { self.best_indent as isize } else { 0 });
            }
            Some(indent) => {
                if !indentless {
                    self.indent = Some(indent + self.best_indent as isize);
                }
            }
        }
    }

    fn write_plain(&mut self, text: &str, split: bool) {
        if self.root_context {
            self.open_ended = false;
        }
        if text.is_empty() {
            return;
        }
        if !self.whitespace {
            self.write(" ");
        }
        self.whitespace = false;
        self.indention = false;
        let chars: Vec<char> = text.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.column > self.best_width
                        && split
                        && start != 0
                        && end != chars.len()
                    {
                        self.write_indent();
                        self.whitespace = false;
                        self.indention = false;
                    } else {
                        let data: String = chars[start..end].iter().collect();
                        self.write(&data);
                    }
                    start = end;
                }
            } else if breaks {
                if ch.map(is_break_char) != Some(true) {
                    if chars[start] == '\n' {
                        self.write_line_break();
                    }
                    for _ in &chars[start..end] {
                        self.write_line_break();
                    }
                    self.write_indent();
                    self.whitespace = false;
                    self.indention = false;
                    start = end;
                }
            } else if ch.is_none() || ch == Some(' ') || ch.map(is_break_char) == Some(true) {
                let data: String = chars[start..end].iter().collect();
                self.write(&data);
                start = end;
            }
            if let Some(c) = ch {
                spaces = c == ' ';
                breaks = is_break_char(c);
            }
            end += 1;
        }
    }

    fn write_single_quoted(&mut self, text: &str, split: bool) {
        self.write_indicator("'", true, false, false);
        let chars: Vec<char> = text.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.column > self.best_width
                        && split
                        && start != 0
                        && end != chars.len()
                    {
                        self.write_indent();
                        self.whitespace = false;
                        self.indention = false;
                    } else {
                        let data: String = chars[start..end].iter().collect();
                        self.write(&data);
                    }
                    start = end;
                }
            } else if breaks {
                if ch.map(is_break_char) != Some(true) {
                    if chars[start] == '\n' {
                        self.write_line_break();
                    }
                    for _ in &chars[start..end] {
                        self.write_line_break();
                    }
                    self.write_indent();
                    self.whitespace = false;
                    self.indention = false;
                    start = end;
                }
            } else if ch.is_none()
                || ch == Some(' ')
                || ch.map(is_break_char) == Some(true)
                || ch == Some('\'')
            {
                if start < end {
                    let data: String = chars[start..end].iter().collect();
                    self.write(&data);
                    start = end;
                }
            }
            if ch == Some('\'') {
                self.write("''");
                start = end + 1;
            }
            if let Some(c) = ch {
                spaces = c == ' ';
                breaks = is_break_char(c);
            }
            end += 1;
        }
        self.write_indicator("'", false, false, false);
    }

    fn write_double_quoted(&mut self, text: &str, split: bool) {
        self.write_indicator("\"", true, false, false);
        let chars: Vec<char> = text.chars().collect();
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            let needs_escape = match ch {
                None => true,
                Some(c) => c == '"' || c == '\\' || is_special(c),
            };
            if needs_escape {
                if start < end {
                    let data: String = chars[start..end].iter().collect();
                    self.write(&data);
                    start = end;
                }
                if let Some(c) = ch {
                    let data = match escape_char(c) {
                        Some(short) => format!("\\{}", short),
                        None => {
                            let code = c as u32;
                            if code <= 0xFF {
                                format!("\\x{:02X}", code)
                            } else if code <= 0xFFFF {
                                format!("\\u{:04X}", code)
                            } else {
                                format!("\\U{:08X}", code)
                            }
                        }
                    };
                    self.write(&data);
                    start = end + 1;
                }
            }
            if end > 0
                && end < chars.len() - 1
                && (ch == Some(' ') || start >= end)
                && self.column + (end - start) > self.best_width
                && split
            {
                let data: String = chars[start..end].iter().collect();
                self.write(&data);
                self.write("\\");
                start = end;
                self.write_indent();
                self.whitespace = false;
                self.indention = false;
                if chars.get(start) == Some(&' ') {
                    self.write("\\");
                }
            }
            end += 1;
        }
        self.write_indicator("\"", false, false, false);
    }

    fn determine_block_hints(&self, text: &str) -> String {
        let mut hints = String::new();
        let chars: Vec<char> = text.chars().collect();
        if let Some(&first) = chars.first() {
            if first == ' ' || first == '\n' {
                hints.push_str(&self.best_indent.to_string());
            }
        }
        match chars.last() {
            Some('\n') => {
                if chars.len() == 1 || chars[chars.len() - 2] == '\n' {
                    hints.push('+');
                }
            }
            Some(_) => hints.push('-'),
            None => {}
        }
        hints
    }

    fn write_folded(&mut self, text: &str) {
        let hints = self.determine_block_hints(text);
        self.write_indicator(&format!(">{}", hints), true, false, false);
        if hints.ends_with('+') {
            self.open_ended = true;
        }
        self.write_line_break();
        let chars: Vec<char> = text.chars().collect();
        let mut leading_space = true;
        let mut spaces = false;
        let mut breaks = true;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if breaks {
                if ch.map(is_break_char) != Some(true) {
                    if !leading_space && ch.is_some() && ch != Some(' ') && chars[start] == '\n' {
                        self.write_line_break();
                    }
                    leading_space = ch == Some(' ');
                    for _ in &chars[start..end] {
                        self.write_line_break();
                    }
                    if ch.is_some() {
                        self.write_indent();
                    }
                    start = end;
                }
            } else if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.column > self.best_width {
                        self.write_indent();
                        self.whitespace = false;
                        self.indention = false;
                    } else {
                        let data: String = chars[start..end].iter().collect();
                        self.write(&data);
                    }
                    start = end;
                }
            } else if ch.is_none() || ch == Some(' ') || ch.map(is_break_char) == Some(true) {
                let data: String = chars[start..end].iter().collect();
                self.write(&data);
                if ch.is_none() {
                    self.write_line_break();
                }
                start = end;
            }
            if let Some(c) = ch {
                breaks = is_break_char(c);
                spaces = c == ' ';
            }
            end += 1;
        }
    }

    fn write_literal(&mut self, text: &str) {
        let hints = self.determine_block_hints(text);
        self.write_indicator(&format!("|{}", hints), true, false, false);
        if hints.ends_with('+') {
            self.open_ended = true;
        }
        self.write_line_break();
        let chars: Vec<char> = text.chars().collect();
        let mut breaks = true;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if breaks {
                if ch.map(is_break_char) != Some(true) {
                    for _ in &chars[start..end] {
                        self.write_line_break();
                    }
                    if ch.is_some() {
                        self.write_indent();
                    }
                    start = end;
                }
            } else if ch.is_none() || ch.map(is_break_char) == Some(true) {
                let data: String = chars[start..end].iter().collect();
                self.write(&data);
                if ch.is_none() {
                    self.write_line_break();
                }
                start = end;
            }
            if let Some(c) = ch {
                breaks = is_break_char(c);
            }
            end += 1;
        }
    }
}

fn prepare_anchor(anchor: &str) -> Result<String> {
    if anchor.is_empty() {
        return Err(Error::Emitter("anchor must not be empty".to_string()));
    }
    for c in anchor.chars() {
        if c.is_whitespace() || matches!(c, ',' | '[' | ']' | '{' | '}' | '*' | '&') {
            return Err(Error::Emitter(format!(
                "invalid character '{}' in the anchor: {}",
                c, anchor
            )));
        }
    }
    Ok(anchor.to_string())
}

/// Short escapes for double-quoted scalars.
fn escape_char(c: char) -> Option<char> {
    Some(match c {
        '\0' => '0',
        '\x07' => 'a',
        '\x08' => 'b',
        '\t' => 't',
        '\n' => 'n',
        '\x0b' => 'v',
        '\x0c' => 'f',
        '\r' => 'r',
        '\x1b' => 'e',
        '"' => '"',
        '\\' => '\\',
        '\u{85}' => 'N',
        '\u{a0}' => '_',
        '\u{2028}' => 'L',
        '\u{2029}' => 'P',
        _ => return None,
    })
}

/// Decide which presentation styles a scalar value permits.
fn analyze_scalar(scalar: &str) -> ScalarAnalysis {
    if scalar.is_empty() {
        return ScalarAnalysis {
            empty: true,
            multiline: false,
            allow_flow_plain: false,
            allow_block_plain: true,
            allow_single_quoted: true,
            allow_block: false,
        };
    }

    let chars: Vec<char> = scalar.chars().collect();
    let mut block_indicators = false;
    let mut flow_indicators = false;
    let mut line_breaks = false;
    let mut special_characters = false;
    let mut leading_space = false;
    let mut leading_break = false;
    let mut trailing_space = false;
    let mut trailing_break = false;
    let mut break_space = false;
    let mut space_break = false;

    if scalar.starts_with("---") || scalar.starts_with("...") {
        block_indicators = true;
        flow_indicators = true;
    }

    let mut preceded_by_whitespace = true;
    let mut followed_by_whitespace =
        chars.len() == 1 || matches!(chars[1], ' ' | '\t' | '\n');
    let mut previous_space = false;
    let mut previous_break = false;

    for (index, &ch) in chars.iter().enumerate() {
        if index == 0 {
            if matches!(
                ch,
                '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"'
                    | '%' | '@' | '`'
            ) {
                flow_indicators = true;
                block_indicators = true;
            }
            if ch == '?' || ch == ':' {
                flow_indicators = true;
                if followed_by_whitespace {
                    block_indicators = true;
                }
            }
            if ch == '-' && followed_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
        } else {
            if matches!(ch, ',' | '?' | '[' | ']' | '{' | '}') {
                flow_indicators = true;
            }
            if ch == ':' {
                flow_indicators = true;
                if followed_by_whitespace {
                    block_indicators = true;
                }
            }
            if ch == '#' && preceded_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
        }

        if ch == '\n' {
            line_breaks = true;
        }
        if ch != '\n' && is_special(ch) {
            special_characters = true;
        }

        if ch == ' ' {
            if index == 0 {
                leading_space = true;
            }
            if index == chars.len() - 1 {
                trailing_space = true;
            }
            if previous_break {
                break_space = true;
            }
            previous_space = true;
            previous_break = false;
        } else if ch == '\n' {
            if index == 0 {
                leading_break = true;
            }
            if index == chars.len() - 1 {
                trailing_break = true;
            }
            if previous_space {
                space_break = true;
            }
            previous_break = true;
            previous_space = false;
        } else {
            previous_space = false;
            previous_break = false;
        }

        preceded_by_whitespace = matches!(ch, ' ' | '\t' | '\n');
        followed_by_whitespace = index + 2 >= chars.len()
            || matches!(chars[index + 2], ' ' | '\t' | '\n');
    }

    let mut allow_flow_plain = true;
    let mut allow_block_plain = true;
    let mut allow_single_quoted = true;
    let mut allow_block = true;

    if leading_space || leading_break || trailing_space || trailing_break {
        allow_flow_plain = false;
        allow_block_plain = false;
    }
    if trailing_space {
        allow_block = false;
    }
    if break_space {
        allow_flow_plain = false;
        allow_block_plain = false;
        allow_single_quoted = false;
    }
    if space_break || special_characters {
        allow_flow_plain = false;
        allow_block_plain = false;
        allow_single_quoted = false;
        allow_block = false;
    }
    if line_breaks {
        allow_flow_plain = false;
        allow_block_plain = false;
    }
    if flow_indicators {
        allow_flow_plain = false;
    }
    if block_indicators {
        allow_block_plain = false;
    }

    ScalarAnalysis {
        empty: false,
        multiline: line_breaks,
        allow_flow_plain,
        allow_block_plain,
        allow_single_quoted,
        allow_block,
    }
}
