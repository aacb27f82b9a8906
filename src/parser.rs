//! Phase 3: Parser
//!
//! The parser converts tokens into events following the YAML production
//! grammar. Instead of recursive descent it keeps an explicit state value
//! plus a stack of pending states, so document nesting depth is bounded by
//! memory, not by the call stack — nesting depth is attacker-controlled.
//!
//! Each call to [`Parser::next_event`] resolves exactly one event:
//!
//! ```text
//! StreamStart
//!   -> ImplicitDocumentStart | DocumentStart
//!   -> DocumentContent -> (node states) -> DocumentEnd
//!   -> (loop) -> StreamEnd
//! ```

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::events::{Event, EventData, EventId, ImplicitPair};
use crate::mark::{Mark, Span};
use crate::settings::{LoadSettings, VersionFn};
use crate::scanner::Scanner;
use crate::style::{FlowStyle, ScalarStyle};
use crate::tokens::{Directive, TokenData, TokenId};

/// Pending grammar production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
}

fn default_tag_handles() -> HashMap<String, String> {
    let mut handles = HashMap::new();
    handles.insert("!".to_string(), "!".to_string());
    handles.insert("!!".to_string(), "tag:yaml.org,2002:".to_string());
    handles
}

fn span_at(mark: &Option<Mark>) -> Option<Span> {
    mark.clone().map(|m| Span::new(m.clone(), m))
}

fn token_span_start(span: &Option<Span>) -> Option<Mark> {
    span.as_ref().map(|s| s.start.clone())
}

/// Converts tokens into events.
pub struct Parser {
    scanner: Scanner,
    version_fn: VersionFn,
    parse_comments: bool,
    state: Option<State>,
    states: Vec<State>,
    marks: Vec<Option<Mark>>,
    current_event: Option<Event>,
    yaml_version: Option<(u32, u32)>,
    tag_handles: HashMap<String, String>,
}

impl Parser {
    pub fn new(settings: &LoadSettings, input: &str) -> Result<Self> {
        let scanner = Scanner::new(settings, input)?;
        Ok(Self::with_scanner(settings, scanner))
    }

    pub fn from_bytes(settings: &LoadSettings, input: &[u8]) -> Result<Self> {
        let scanner = Scanner::from_bytes(settings, input)?;
        Ok(Self::with_scanner(settings, scanner))
    }

    fn with_scanner(settings: &LoadSettings, scanner: Scanner) -> Self {
        Parser {
            scanner,
            version_fn: settings.version_fn.clone(),
            parse_comments: settings.parse_comments,
            state: Some(State::StreamStart),
            states: Vec::new(),
            marks: Vec::new(),
            current_event: None,
            yaml_version: None,
            tag_handles: default_tag_handles(),
        }
    }

    /// True when the next event is one of `choices` (any event when the
    /// slice is empty).
    pub fn check_event(&mut self, choices: &[EventId]) -> Result<bool> {
        if self.current_event.is_none() && self.state.is_some() {
            self.current_event = Some(self.produce()?);
        }
        match &self.current_event {
            Some(event) => Ok(choices.is_empty() || choices.contains(&event.id())),
            None => Ok(false),
        }
    }

    /// The next event without consuming it.
    pub fn peek_event(&mut self) -> Result<&Event> {
        if self.current_event.is_none() && self.state.is_some() {
            self.current_event = Some(self.produce()?);
        }
        self.current_event
            .as_ref()
            .ok_or_else(|| Error::parser("no more events in the stream", None))
    }

    /// Consume and return the next event.
    pub fn next_event(&mut self) -> Result<Event> {
        if self.current_event.is_none() && self.state.is_some() {
            self.current_event = Some(self.produce()?);
        }
        self.current_event
            .take()
            .ok_or_else(|| Error::parser("no more events in the stream", None))
    }

    /// Whether the stream still has events.
    pub fn has_next(&mut self) -> Result<bool> {
        Ok(self.current_event.is_some() || self.state.is_some())
    }

    fn produce(&mut self) -> Result<Event> {
        // Comment tokens pass straight through in any state.
        if self.parse_comments && self.scanner.check_token(&[TokenId::Comment])? {
            let token = self.scanner.next_token()?;
            if let TokenData::Comment { kind, value } = token.data {
                return Ok(Event::new(EventData::Comment { kind, value }, token.span));
            }
        }
        let state = self
            .state
            .take()
            .ok_or_else(|| Error::parser("no more events in the stream", None))?;
        match state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_implicit_document_start(),
            State::DocumentStart => self.parse_document_start(),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => self.parse_block_sequence_first_entry(),
            State::BlockSequenceEntry => self.parse_block_sequence_entry(),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.parse_block_mapping_first_key(),
            State::BlockMappingKey => self.parse_block_mapping_key(),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event> {
        let token = self.scanner.next_token()?;
        self.state = Some(State::ImplicitDocumentStart);
        Ok(Event::new(EventData::StreamStart, token.span))
    }

    fn parse_implicit_document_start(&mut self) -> Result<Event> {
        if self.scanner.check_token(&[
            TokenId::Directive,
            TokenId::DocumentStart,
            TokenId::StreamEnd,
        ])? {
            return self.parse_document_start();
        }
        self.scanner.reset_document_index();
        self.tag_handles = default_tag_handles();
        self.yaml_version = None;
        let span = span_at(&token_span_start(&self.scanner.peek_token()?.span.clone()));
        self.states.push(State::DocumentEnd);
        self.state = Some(State::BlockNode);
        Ok(Event::new(
            EventData::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            },
            span,
        ))
    }

    fn parse_document_start(&mut self) -> Result<Event> {
        // Stray document-end markers before the next document.
        while self.scanner.check_token(&[TokenId::DocumentEnd])? {
            self.scanner.next_token()?;
        }
        self.scanner.reset_document_index();
        if self.scanner.check_token(&[TokenId::StreamEnd])? {
            let token = self.scanner.next_token()?;
            self.state = None;
            if !self.states.is_empty() || !self.marks.is_empty() {
                return Err(Error::parser("unexpected end of the event stream", None));
            }
            return Ok(Event::new(EventData::StreamEnd, token.span));
        }
        let start = token_span_start(&self.scanner.peek_token()?.span.clone());
        let (version, tags) = self.process_directives()?;
        if !self.scanner.check_token(&[TokenId::DocumentStart])? {
            let token = self.scanner.peek_token()?;
            let problem = format!("expected '<document start>', but found '{}'", token.id());
            let mark = token_span_start(&token.span.clone());
            return Err(Error::parser(problem, mark));
        }
        let token = self.scanner.next_token()?;
        let span = match (start, token.span.map(|s| s.end)) {
            (Some(start), Some(end)) => Some(Span::new(start, end)),
            _ => None,
        };
        self.states.push(State::DocumentEnd);
        self.state = Some(State::DocumentContent);
        Ok(Event::new(
            EventData::DocumentStart {
                explicit: true,
                version,
                tags,
            },
            span,
        ))
    }

    fn parse_document_content(&mut self) -> Result<Event> {
        if self.scanner.check_token(&[
            TokenId::Directive,
            TokenId::DocumentStart,
            TokenId::DocumentEnd,
            TokenId::StreamEnd,
        ])? {
            let mark = token_span_start(&self.scanner.peek_token()?.span.clone());
            self.state = self.states.pop();
            Ok(Self::empty_scalar(&mark))
        } else {
            self.parse_node(true, false)
        }
    }

    fn parse_document_end(&mut self) -> Result<Event> {
        let mut span = span_at(&token_span_start(&self.scanner.peek_token()?.span.clone()));
        let mut explicit = false;
        if self.scanner.check_token(&[TokenId::DocumentEnd])? {
            let token = self.scanner.next_token()?;
            span = token.span;
            explicit = true;
        }
        self.scanner.reset_document_index();
        self.state = Some(State::DocumentStart);
        Ok(Event::new(EventData::DocumentEnd { explicit }, span))
    }

    fn process_directives(&mut self) -> Result<(Option<(u32, u32)>, Vec<(String, String)>)> {
        self.yaml_version = None;
        self.tag_handles = HashMap::new();
        let mut user_tags = Vec::new();
        while self.scanner.check_token(&[TokenId::Directive])? {
            let token = self.scanner.next_token()?;
            let mark = token_span_start(&token.span);
            if let TokenData::Directive(directive) = token.data {
                match directive {
                    Directive::Yaml { major, minor } => {
                        if self.yaml_version.is_some() {
                            return Err(Error::parser("found duplicate YAML directive", mark));
                        }
                        let accepted = (self.version_fn)((major, minor))?;
                        self.yaml_version = Some(accepted);
                    }
                    Directive::Tag { handle, prefix } => {
                        if self.tag_handles.contains_key(&handle) {
                            return Err(Error::parser(
                                format!("duplicate tag handle '{}'", handle),
                                mark,
                            ));
                        }
                        self.tag_handles.insert(handle.clone(), prefix.clone());
                        user_tags.push((handle, prefix));
                    }
                    Directive::Reserved { .. } => {
                        // Reserved directives are ignored.
                    }
                }
            }
        }
        for (handle, prefix) in default_tag_handles() {
            self.tag_handles.entry(handle).or_insert(prefix);
        }
        Ok((self.yaml_version, user_tags))
    }

    /// Parse one node. `block` allows block collections; `indentless`
    /// allows a sequence of `- ` entries at the parent's indentation.
    fn parse_node(&mut self, block: bool, indentless: bool) -> Result<Event> {
        if self.scanner.check_token(&[TokenId::Alias])? {
            let token = self.scanner.next_token()?;
            self.state = self.states.pop();
            if let TokenData::Alias(anchor) = token.data {
                return Ok(Event::new(EventData::Alias { anchor }, token.span));
            }
            unreachable!("alias token expected");
        }

        let mut anchor: Option<String> = None;
        let mut tag: Option<String> = None;
        let mut start: Option<Mark> = None;
        let mut tag_mark: Option<Mark> = None;
        if self.scanner.check_token(&[TokenId::Anchor])? {
            let token = self.scanner.next_token()?;
            start = token_span_start(&token.span);
            if let TokenData::Anchor(name) = token.data {
                anchor = Some(name);
            }
            if self.scanner.check_token(&[TokenId::Tag])? {
                let token = self.scanner.next_token()?;
                tag_mark = token_span_start(&token.span);
                tag = Some(self.resolve_tag(token.data, &start, &tag_mark)?);
            }
        } else if self.scanner.check_token(&[TokenId::Tag])? {
            let token = self.scanner.next_token()?;
            start = token_span_start(&token.span);
            tag_mark = start.clone();
            tag = Some(self.resolve_tag(token.data, &start, &tag_mark)?);
            if self.scanner.check_token(&[TokenId::Anchor])? {
                let token = self.scanner.next_token()?;
                if let TokenData::Anchor(name) = token.data {
                    anchor = Some(name);
                }
            }
        }

        // A missing or non-specific `!` tag means the resolver decides.
        let implicit = tag.is_none() || tag.as_deref() == Some("!");

        if indentless && self.scanner.check_token(&[TokenId::BlockEntry])? {
            let span = span_at(&token_span_start(&self.scanner.peek_token()?.span.clone()));
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(Event::new(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow: FlowStyle::Block,
                },
                span,
            ));
        }

        if self.scanner.check_token(&[TokenId::Scalar])? {
            let token = self.scanner.next_token()?;
            if let TokenData::Scalar { value, style } = token.data {
                let implicit_pair = if (style == ScalarStyle::Plain && tag.is_none())
                    || tag.as_deref() == Some("!")
                {
                    ImplicitPair::new(true, false)
                } else if tag.is_none() {
                    ImplicitPair::new(false, true)
                } else {
                    ImplicitPair::new(false, false)
                };
                let span = match (start, token.span) {
                    (Some(start), Some(span)) => Some(Span::new(start, span.end)),
                    (None, span) => span,
                    _ => None,
                };
                self.state = self.states.pop();
                return Ok(Event::new(
                    EventData::Scalar {
                        anchor,
                        tag,
                        implicit: implicit_pair,
                        value,
                        style,
                    },
                    span,
                ));
            }
            unreachable!("scalar token expected");
        }

        if self.scanner.check_token(&[TokenId::FlowSequenceStart])? {
            let span = self.scanner.peek_token()?.span.clone();
            self.state = Some(State::FlowSequenceFirstEntry);
            return Ok(Event::new(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow: FlowStyle::Flow,
                },
                span,
            ));
        }
        if self.scanner.check_token(&[TokenId::FlowMappingStart])? {
            let span = self.scanner.peek_token()?.span.clone();
            self.state = Some(State::FlowMappingFirstKey);
            return Ok(Event::new(
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    flow: FlowStyle::Flow,
                },
                span,
            ));
        }
        if block && self.scanner.check_token(&[TokenId::BlockSequenceStart])? {
            let span = self.scanner.peek_token()?.span.clone();
            self.state = Some(State::BlockSequenceFirstEntry);
            return Ok(Event::new(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow: FlowStyle::Block,
                },
                span,
            ));
        }
        if block && self.scanner.check_token(&[TokenId::BlockMappingStart])? {
            let span = self.scanner.peek_token()?.span.clone();
            self.state = Some(State::BlockMappingFirstKey);
            return Ok(Event::new(
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    flow: FlowStyle::Block,
                },
                span,
            ));
        }
        if anchor.is_some() || tag.is_some() {
            // Properties with no content: an empty scalar node.
            self.state = self.states.pop();
            return Ok(Event::new(
                EventData::Scalar {
                    anchor,
                    tag,
                    implicit: ImplicitPair::new(implicit, false),
                    value: String::new(),
                    style: ScalarStyle::Plain,
                },
                span_at(&start),
            ));
        }

        let context = if block {
            "while parsing a block node"
        } else {
            "while parsing a flow node"
        };
        let token = self.scanner.peek_token()?;
        let problem = format!("expected the node content, but found '{}'", token.id());
        let mark = token_span_start(&token.span.clone());
        Err(Error::parser_in(context, start, problem, mark))
    }

    fn resolve_tag(
        &self,
        data: TokenData,
        start: &Option<Mark>,
        tag_mark: &Option<Mark>,
    ) -> Result<String> {
        if let TokenData::Tag { handle, suffix } = data {
            match handle {
                Some(handle) => match self.tag_handles.get(&handle) {
                    Some(prefix) => Ok(format!("{}{}", prefix, suffix)),
                    None => Err(Error::parser_in(
                        "while parsing a node",
                        start.clone(),
                        format!("found undefined tag handle '{}'", handle),
                        tag_mark.clone(),
                    )),
                },
                None => Ok(suffix),
            }
        } else {
            unreachable!("tag token expected")
        }
    }

    fn empty_scalar(mark: &Option<Mark>) -> Event {
        Event::new(
            EventData::Scalar {
                anchor: None,
                tag: None,
                implicit: ImplicitPair::new(true, false),
                value: String::new(),
                style: ScalarStyle::Plain,
            },
            span_at(mark),
        )
    }

    fn parse_block_sequence_first_entry(&mut self) -> Result<Event> {
        let token = self.scanner.next_token()?;
        self.marks.push(token_span_start(&token.span));
        self.parse_block_sequence_entry()
    }

    fn parse_block_sequence_entry(&mut self) -> Result<Event> {
        if self.scanner.check_token(&[TokenId::BlockEntry])? {
            let token = self.scanner.next_token()?;
            if !self
                .scanner
                .check_token(&[TokenId::BlockEntry, TokenId::BlockEnd])?
            {
                self.states.push(State::BlockSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Some(State::BlockSequenceEntry);
            return Ok(Self::empty_scalar(&token.span.map(|s| s.end)));
        }
        if !self.scanner.check_token(&[TokenId::BlockEnd])? {
            let token = self.scanner.peek_token()?;
            let problem = format!("expected <block end>, but found '{}'", token.id());
            let mark = token_span_start(&token.span.clone());
            let context_mark = self.marks.last().cloned().flatten();
            return Err(Error::parser_in(
                "while parsing a block collection",
                context_mark,
                problem,
                mark,
            ));
        }
        let token = self.scanner.next_token()?;
        self.state = self.states.pop();
        self.marks.pop();
        Ok(Event::new(EventData::SequenceEnd, token.span))
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event> {
        if self.scanner.check_token(&[TokenId::BlockEntry])? {
            let token = self.scanner.next_token()?;
            if !self.scanner.check_token(&[
                TokenId::BlockEntry,
                TokenId::Key,
                TokenId::Value,
                TokenId::BlockEnd,
            ])? {
                self.states.push(State::IndentlessSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(Self::empty_scalar(&token.span.map(|s| s.end)));
        }
        let span = span_at(&token_span_start(&self.scanner.peek_token()?.span.clone()));
        self.state = self.states.pop();
        Ok(Event::new(EventData::SequenceEnd, span))
    }

    fn parse_block_mapping_first_key(&mut self) -> Result<Event> {
        let token = self.scanner.next_token()?;
        self.marks.push(token_span_start(&token.span));
        self.parse_block_mapping_key()
    }

    fn parse_block_mapping_key(&mut self) -> Result<Event> {
        if self.scanner.check_token(&[TokenId::Key])? {
            let token = self.scanner.next_token()?;
            if !self.scanner.check_token(&[
                TokenId::Key,
                TokenId::Value,
                TokenId::BlockEnd,
            ])? {
                self.states.push(State::BlockMappingValue);
                return self.parse_node(true, true);
            }
            self.state = Some(State::BlockMappingValue);
            return Ok(Self::empty_scalar(&token.span.map(|s| s.end)));
        }
        if !self.scanner.check_token(&[TokenId::BlockEnd])? {
            let token = self.scanner.peek_token()?;
            let problem = format!("expected <block end>, but found '{}'", token.id());
            let mark = token_span_start(&token.span.clone());
            let context_mark = self.marks.last().cloned().flatten();
            return Err(Error::parser_in(
                "while parsing a block mapping",
                context_mark,
                problem,
                mark,
            ));
        }
        let token = self.scanner.next_token()?;
        self.state = self.states.pop();
        self.marks.pop();
        Ok(Event::new(EventData::MappingEnd, token.span))
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event> {
        if self.scanner.check_token(&[TokenId::Value])? {
            let token = self.scanner.next_token()?;
            if !self.scanner.check_token(&[
                TokenId::Key,
                TokenId::Value,
                TokenId::BlockEnd,
            ])? {
                self.states.push(State::BlockMappingKey);
                return self.parse_node(true, true);
            }
            self.state = Some(State::BlockMappingKey);
            return Ok(Self::empty_scalar(&token.span.map(|s| s.end)));
        }
        self.state = Some(State::BlockMappingKey);
        let mark = token_span_start(&self.scanner.peek_token()?.span.clone());
        Ok(Self::empty_scalar(&mark))
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event> {
        if first {
            let token = self.scanner.next_token()?;
            self.marks.push(token_span_start(&token.span));
        }
        if !self.scanner.check_token(&[TokenId::FlowSequenceEnd])? {
            if !first {
                if self.scanner.check_token(&[TokenId::FlowEntry])? {
                    self.scanner.next_token()?;
                } else {
                    let token = self.scanner.peek_token()?;
                    let problem = format!("expected ',' or ']', but got '{}'", token.id());
                    let mark = token_span_start(&token.span.clone());
                    let context_mark = self.marks.last().cloned().flatten();
                    return Err(Error::parser_in(
                        "while parsing a flow sequence",
                        context_mark,
                        problem,
                        mark,
                    ));
                }
            }
            if self.scanner.check_token(&[TokenId::Key])? {
                // A single `k: v` pair inside a flow sequence is an
                // implicit one-entry mapping.
                let span = self.scanner.peek_token()?.span.clone();
                self.state = Some(State::FlowSequenceEntryMappingKey);
                return Ok(Event::new(
                    EventData::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        flow: FlowStyle::Flow,
                    },
                    span,
                ));
            }
            if !self.scanner.check_token(&[TokenId::FlowSequenceEnd])? {
                self.states.push(State::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let token = self.scanner.next_token()?;
        self.state = self.states.pop();
        self.marks.pop();
        Ok(Event::new(EventData::SequenceEnd, token.span))
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event> {
        let token = self.scanner.next_token()?;
        if !self.scanner.check_token(&[
            TokenId::Value,
            TokenId::FlowEntry,
            TokenId::FlowSequenceEnd,
        ])? {
            self.states.push(State::FlowSequenceEntryMappingValue);
            return self.parse_node(false, false);
        }
        self.state = Some(State::FlowSequenceEntryMappingValue);
        Ok(Self::empty_scalar(&token.span.map(|s| s.end)))
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event> {
        if self.scanner.check_token(&[TokenId::Value])? {
            let token = self.scanner.next_token()?;
            if !self
                .scanner
                .check_token(&[TokenId::FlowEntry, TokenId::FlowSequenceEnd])?
            {
                self.states.push(State::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
            self.state = Some(State::FlowSequenceEntryMappingEnd);
            return Ok(Self::empty_scalar(&token.span.map(|s| s.end)));
        }
        self.state = Some(State::FlowSequenceEntryMappingEnd);
        let mark = token_span_start(&self.scanner.peek_token()?.span.clone());
        Ok(Self::empty_scalar(&mark))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event> {
        self.state = Some(State::FlowSequenceEntry);
        let span = span_at(&token_span_start(&self.scanner.peek_token()?.span.clone()));
        Ok(Event::new(EventData::MappingEnd, span))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event> {
        if first {
            let token = self.scanner.next_token()?;
            self.marks.push(token_span_start(&token.span));
        }
        if !self.scanner.check_token(&[TokenId::FlowMappingEnd])? {
            if !first {
                if self.scanner.check_token(&[TokenId::FlowEntry])? {
                    self.scanner.next_token()?;
                } else {
                    let token = self.scanner.peek_token()?;
                    let problem = format!("expected ',' or '}}', but got '{}'", token.id());
                    let mark = token_span_start(&token.span.clone());
                    let context_mark = self.marks.last().cloned().flatten();
                    return Err(Error::parser_in(
                        "while parsing a flow mapping",
                        context_mark,
                        problem,
                        mark,
                    ));
                }
            }
            if self.scanner.check_token(&[TokenId::Key])? {
                let token = self.scanner.next_token()?;
                if !self.scanner.check_token(&[
                    TokenId::Value,
                    TokenId::FlowEntry,
                    TokenId::FlowMappingEnd,
                ])? {
                    self.states.push(State::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                self.state = Some(State::FlowMappingValue);
                return Ok(Self::empty_scalar(&token.span.map(|s| s.end)));
            }
            if !self.scanner.check_token(&[TokenId::FlowMappingEnd])? {
                self.states.push(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let token = self.scanner.next_token()?;
        self.state = self.states.pop();
        self.marks.pop();
        Ok(Event::new(EventData::MappingEnd, token.span))
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event> {
        if empty {
            self.state = Some(State::FlowMappingKey);
            let mark = token_span_start(&self.scanner.peek_token()?.span.clone());
            return Ok(Self::empty_scalar(&mark));
        }
        if self.scanner.check_token(&[TokenId::Value])? {
            let token = self.scanner.next_token()?;
            if !self
                .scanner
                .check_token(&[TokenId::FlowEntry, TokenId::FlowMappingEnd])?
            {
                self.states.push(State::FlowMappingKey);
                return self.parse_node(false, false);
            }
            self.state = Some(State::FlowMappingKey);
            return Ok(Self::empty_scalar(&token.span.map(|s| s.end)));
        }
        self.state = Some(State::FlowMappingKey);
        let mark = token_span_start(&self.scanner.peek_token()?.span.clone());
        Ok(Self::empty_scalar(&mark))
    }
}
