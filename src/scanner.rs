//! Phase 2: Scanner
//!
//! The scanner converts the reader's code points into tokens, enforcing
//! YAML's indentation-sensitive lexical rules. It owns:
//! - the indentation stack: deeper indentation after an entry/key/value
//!   indicator opens a block collection, shallower indentation closes as
//!   many levels as it passed
//! - the simple-key table: at each position where a scalar could turn out
//!   to be a mapping key, a candidate is recorded per flow level; a later
//!   `:` promotes the buffered token into a key, and candidates go stale
//!   after 1024 code points or a line break
//! - the flow-level counter: inside `[]`/`{}` the indentation rules are
//!   suspended entirely
//!
//! Tokens are produced lazily; the scanner may buffer ahead internally to
//! resolve simple keys, but consumers see a single-pass stream.

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::mark::{Mark, Span};
use crate::reader::{Reader, EOF};
use crate::settings::LoadSettings;
use crate::style::{CommentKind, ScalarStyle};
use crate::tokens::{Directive, Token, TokenData, TokenId};

/// A candidate position that may become the key of an implicit mapping
/// entry.
#[derive(Debug, Clone)]
struct SimpleKey {
    /// Position of the would-be key in the overall token stream.
    token_number: usize,
    /// A required key cannot be abandoned without error (it follows an
    /// entry indicator on the same line).
    required: bool,
    index: usize,
    line: usize,
    column: usize,
    mark: Option<Mark>,
}

/// Simple keys are abandoned after this many code points.
const MAX_SIMPLE_KEY_SPAN: usize = 1024;

/// Block scalar chomping: what happens to trailing line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomping {
    Strip,
    Clip,
    Keep,
}

fn is_break(c: char) -> bool {
    c == '\r' || c == '\n'
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_blank_or_break_or_eof(c: char) -> bool {
    is_blank(c) || is_break(c) || c == EOF
}

fn span(start: Option<Mark>, end: Option<Mark>) -> Option<Span> {
    match (start, end) {
        (Some(start), Some(end)) => Some(Span::new(start, end)),
        _ => None,
    }
}

/// Converts code points into tokens.
pub struct Scanner {
    reader: Reader,
    parse_comments: bool,
    done: bool,
    /// Depth of nested `[]`/`{}` collections.
    flow_level: usize,
    tokens: VecDeque<Token>,
    /// Number of tokens already handed to the consumer.
    tokens_taken: usize,
    /// Current block indentation column, -1 before the first node.
    indent: isize,
    indents: Vec<isize>,
    /// Whether a simple key may start at the current position.
    allow_simple_key: bool,
    /// Simple-key candidates keyed by flow level.
    possible_simple_keys: HashMap<usize, SimpleKey>,
    /// Line on which the previous token ended, for comment placement.
    last_token_line: Option<usize>,
}

impl Scanner {
    pub fn new(settings: &LoadSettings, input: &str) -> Result<Self> {
        let reader = Reader::from_str(settings, input)?;
        Ok(Self::with_reader(settings, reader))
    }

    pub fn from_bytes(settings: &LoadSettings, input: &[u8]) -> Result<Self> {
        let reader = Reader::from_bytes(settings, input)?;
        Ok(Self::with_reader(settings, reader))
    }

    fn with_reader(settings: &LoadSettings, reader: Reader) -> Self {
        let mut scanner = Scanner {
            reader,
            parse_comments: settings.parse_comments,
            done: false,
            flow_level: 0,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: Vec::new(),
            allow_simple_key: true,
            possible_simple_keys: HashMap::new(),
            last_token_line: None,
        };
        let mark = scanner.reader.mark();
        scanner.push_token(Token::new(TokenData::StreamStart, span(mark.clone(), mark)));
        // The synthetic stream-start token must not make a first-line
        // comment look like it trails real content.
        scanner.last_token_line = None;
        scanner
    }

    /// True when the next token is one of `choices` (any token when the
    /// slice is empty).
    pub fn check_token(&mut self, choices: &[TokenId]) -> Result<bool> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        match self.tokens.front() {
            Some(token) => {
                Ok(choices.is_empty() || choices.contains(&token.id()))
            }
            None => Ok(false),
        }
    }

    /// The next token without consuming it.
    pub fn peek_token(&mut self) -> Result<&Token> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        self.tokens
            .front()
            .ok_or_else(|| Error::scanner("no more tokens in the stream", None))
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        match self.tokens.pop_front() {
            Some(token) => {
                self.tokens_taken += 1;
                Ok(token)
            }
            None => Err(Error::scanner("no more tokens in the stream", None)),
        }
    }

    /// Restart the per-document code-point budget.
    pub fn reset_document_index(&mut self) {
        self.reader.reset_document_index();
    }

    fn push_token(&mut self, token: Token) {
        if let Some(span) = &token.span {
            self.last_token_line = Some(span.end.line);
        } else {
            self.last_token_line = Some(self.reader.line());
        }
        self.tokens.push_back(token);
    }

    fn need_more_tokens(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if self.tokens.is_empty() {
            return Ok(true);
        }
        // The head token may still be promoted to a key.
        self.stale_possible_simple_keys()?;
        Ok(self.next_possible_simple_key() == Some(self.tokens_taken))
    }

    fn fetch_more_tokens(&mut self) -> Result<()> {
        self.scan_to_next_token()?;
        self.stale_possible_simple_keys()?;
        self.unwind_indent(self.reader.column() as isize)?;

        let c = self.reader.peek();
        if c == EOF {
            return self.fetch_stream_end();
        }
        if c == '%' && self.check_directive() {
            return self.fetch_directive();
        }
        if c == '-' && self.check_document_start() {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if c == '.' && self.check_document_end() {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        match c {
            '[' => return self.fetch_flow_collection_start(TokenData::FlowSequenceStart),
            '{' => return self.fetch_flow_collection_start(TokenData::FlowMappingStart),
            ']' => return self.fetch_flow_collection_end(TokenData::FlowSequenceEnd),
            '}' => return self.fetch_flow_collection_end(TokenData::FlowMappingEnd),
            ',' => return self.fetch_flow_entry(),
            '-' if self.check_block_entry() => return self.fetch_block_entry(),
            '?' if self.check_key() => return self.fetch_key(),
            ':' if self.check_value() => return self.fetch_value(),
            '*' => return self.fetch_anchor(false),
            '&' => return self.fetch_anchor(true),
            '!' => return self.fetch_tag(),
            '|' if self.flow_level == 0 => return self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level == 0 => return self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => return self.fetch_flow_scalar(ScalarStyle::SingleQuoted),
            '"' => return self.fetch_flow_scalar(ScalarStyle::DoubleQuoted),
            _ => {}
        }
        if self.check_plain() {
            return self.fetch_plain();
        }
        let mark = self.reader.mark();
        let problem = if c == '\t' {
            "found character '\\t(TAB)' that cannot start any token. \
             (Do not use \\t(TAB) for indentation)"
            .to_string()
        } else {
            format!("found character '{}' that cannot start any token", c)
        };
        Err(Error::scanner_in(
            "while scanning for the next token",
            None,
            problem,
            mark,
        ))
    }

    // ------------------------------------------------------------------
    // Simple keys
    // ------------------------------------------------------------------

    fn next_possible_simple_key(&self) -> Option<usize> {
        self.possible_simple_keys
            .values()
            .map(|key| key.token_number)
            .min()
    }

    /// Drop candidates that can no longer become keys: the position moved
    /// to another line, or more than 1024 code points went by.
    fn stale_possible_simple_keys(&mut self) -> Result<()> {
        let line = self.reader.line();
        let index = self.reader.index();
        let mut failed: Option<SimpleKey> = None;
        self.possible_simple_keys.retain(|_, key| {
            let stale = key.line != line || index - key.index > MAX_SIMPLE_KEY_SPAN;
            if stale && key.required && failed.is_none() {
                failed = Some(key.clone());
            }
            !stale
        });
        if let Some(key) = failed {
            return Err(Error::scanner_in(
                "while scanning a simple key",
                key.mark,
                "could not find expected ':'",
                self.reader.mark(),
            ));
        }
        Ok(())
    }

    /// Record the position right before the next token as a possible
    /// simple key.
    fn save_possible_simple_key(&mut self) -> Result<()> {
        let required = self.flow_level == 0 && self.indent == self.reader.column() as isize;
        if self.allow_simple_key {
            self.remove_possible_simple_key()?;
            let token_number = self.tokens_taken + self.tokens.len();
            let key = SimpleKey {
                token_number,
                required,
                index: self.reader.index(),
                line: self.reader.line(),
                column: self.reader.column(),
                mark: self.reader.mark(),
            };
            self.possible_simple_keys.insert(self.flow_level, key);
        }
        Ok(())
    }

    fn remove_possible_simple_key(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            if key.required {
                return Err(Error::scanner_in(
                    "while scanning a simple key",
                    key.mark,
                    "could not find expected ':'",
                    self.reader.mark(),
                ));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Indentation
    // ------------------------------------------------------------------

    /// Pop indentation levels deeper than `column`, closing their block
    /// collections. No effect inside flow collections.
    fn unwind_indent(&mut self, column: isize) -> Result<()> {
        if self.flow_level > 0 {
            return Ok(());
        }
        while self.indent > column {
            let mark = self.reader.mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.push_token(Token::new(TokenData::BlockEnd, span(mark.clone(), mark)));
        }
        Ok(())
    }

    /// Push a new indentation level if `column` is deeper than the
    /// current one.
    fn add_indent(&mut self, column: isize) -> bool {
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Fetchers
    // ------------------------------------------------------------------

    fn fetch_stream_end(&mut self) -> Result<()> {
        self.unwind_indent(-1)?;
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.possible_simple_keys.clear();
        let mark = self.reader.mark();
        self.push_token(Token::new(TokenData::StreamEnd, span(mark.clone(), mark)));
        self.done = true;
        Ok(())
    }

    fn check_directive(&self) -> bool {
        self.reader.column() == 0
    }

    fn fetch_directive(&mut self) -> Result<()> {
        self.unwind_indent(-1)?;
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_directive()?;
        self.push_token(token);
        Ok(())
    }

    fn check_document_start(&self) -> bool {
        self.reader.column() == 0
            && self.reader.prefix(3) == "---"
            && is_blank_or_break_or_eof(self.reader.peek_at(3))
    }

    fn check_document_end(&self) -> bool {
        self.reader.column() == 0
            && self.reader.prefix(3) == "..."
            && is_blank_or_break_or_eof(self.reader.peek_at(3))
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<()> {
        self.unwind_indent(-1)?;
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward_by(3)?;
        let end = self.reader.mark();
        self.push_token(Token::new(data, span(start, end)));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<()> {
        self.save_possible_simple_key()?;
        self.flow_level += 1;
        self.allow_simple_key = true;
        let start = self.reader.mark();
        self.reader.forward()?;
        let end = self.reader.mark();
        self.push_token(Token::new(data, span(start, end)));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<()> {
        self.remove_possible_simple_key()?;
        self.flow_level = self.flow_level.saturating_sub(1);
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward()?;
        let end = self.reader.mark();
        self.push_token(Token::new(data, span(start, end)));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward()?;
        let end = self.reader.mark();
        self.push_token(Token::new(TokenData::FlowEntry, span(start, end)));
        Ok(())
    }

    fn check_block_entry(&self) -> bool {
        is_blank_or_break_or_eof(self.reader.peek_at(1))
    }

    fn fetch_block_entry(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(Error::scanner(
                    "sequence entries are not allowed here",
                    self.reader.mark(),
                ));
            }
            if self.add_indent(self.reader.column() as isize) {
                let mark = self.reader.mark();
                self.push_token(Token::new(
                    TokenData::BlockSequenceStart,
                    span(mark.clone(), mark),
                ));
            }
        }
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward()?;
        let end = self.reader.mark();
        self.push_token(Token::new(TokenData::BlockEntry, span(start, end)));
        Ok(())
    }

    fn check_key(&self) -> bool {
        self.flow_level > 0 || is_blank_or_break_or_eof(self.reader.peek_at(1))
    }

    fn fetch_key(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(Error::scanner(
                    "mapping keys are not allowed here",
                    self.reader.mark(),
                ));
            }
            if self.add_indent(self.reader.column() as isize) {
                let mark = self.reader.mark();
                self.push_token(Token::new(
                    TokenData::BlockMappingStart,
                    span(mark.clone(), mark),
                ));
            }
        }
        self.allow_simple_key = self.flow_level == 0;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward()?;
        let end = self.reader.mark();
        self.push_token(Token::new(TokenData::Key, span(start, end)));
        Ok(())
    }

    fn check_value(&self) -> bool {
        if self.flow_level > 0 {
            return true;
        }
        is_blank_or_break_or_eof(self.reader.peek_at(1))
    }

    fn fetch_value(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            // Promote the buffered token into a mapping key.
            let insert_at = key.token_number - self.tokens_taken;
            let key_span = span(key.mark.clone(), key.mark.clone());
            self.tokens
                .insert(insert_at, Token::new(TokenData::Key, key_span));
            if self.flow_level == 0 && self.add_indent(key.column as isize) {
                let start_span = span(key.mark.clone(), key.mark);
                self.tokens
                    .insert(insert_at, Token::new(TokenData::BlockMappingStart, start_span));
            }
            self.allow_simple_key = false;
        } else {
            if self.flow_level == 0 {
                if !self.allow_simple_key {
                    return Err(Error::scanner(
                        "mapping values are not allowed here",
                        self.reader.mark(),
                    ));
                }
                if self.add_indent(self.reader.column() as isize) {
                    let mark = self.reader.mark();
                    self.push_token(Token::new(
                        TokenData::BlockMappingStart,
                        span(mark.clone(), mark),
                    ));
                }
            }
            self.allow_simple_key = self.flow_level == 0;
        }
        let start = self.reader.mark();
        self.reader.forward()?;
        let end = self.reader.mark();
        self.push_token(Token::new(TokenData::Value, span(start, end)));
        Ok(())
    }

    fn fetch_anchor(&mut self, is_anchor: bool) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(is_anchor)?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let token = self.scan_block_scalar(style)?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(style)?;
        self.push_token(token);
        Ok(())
    }

    fn check_plain(&self) -> bool {
        let c = self.reader.peek();
        let next = self.reader.peek_at(1);
        // A plain scalar may not start with an indicator, except `-?:`
        // when followed by a non-space (and not a flow indicator in flow
        // context).
        !is_blank_or_break_or_eof(c)
            && !matches!(
                c,
                '-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>'
                    | '\'' | '"' | '%' | '@' | '`'
            )
            || (!is_blank_or_break_or_eof(next)
                && (c == '-'
                    || (self.flow_level == 0 && matches!(c, '?' | ':'))))
    }

    fn fetch_plain(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_plain()?;
        self.push_token(token);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Whitespace, comments
    // ------------------------------------------------------------------

    fn scan_to_next_token(&mut self) -> Result<()> {
        loop {
            // Tabs may separate tokens wherever a simple key can no longer
            // start; as indentation they are rejected at the fetch stage.
            while self.reader.peek() == ' '
                || (self.reader.peek() == '\t'
                    && (self.flow_level > 0 || !self.allow_simple_key))
            {
                self.reader.forward()?;
            }
            if self.reader.peek() == '#' {
                self.scan_comment()?;
            }
            if is_break(self.reader.peek()) {
                self.scan_line_break()?;
                if self.flow_level == 0 {
                    self.allow_simple_key = true;
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_comment(&mut self) -> Result<()> {
        let kind = if self.last_token_line == Some(self.reader.line()) {
            CommentKind::InLine
        } else {
            CommentKind::Block
        };
        let start = self.reader.mark();
        self.reader.forward()?;
        let mut value = String::new();
        while !is_break(self.reader.peek()) && self.reader.peek() != EOF {
            value.push(self.reader.peek());
            self.reader.forward()?;
        }
        if self.parse_comments {
            let end = self.reader.mark();
            // Comments never participate in simple keys, so bypass
            // `push_token` to keep `last_token_line` on real tokens.
            self.tokens
                .push_back(Token::new(TokenData::Comment { kind, value }, span(start, end)));
        }
        Ok(())
    }

    /// Consume one line break, folding `\r\n` into `\n`.
    fn scan_line_break(&mut self) -> Result<String> {
        let c = self.reader.peek();
        if c == '\r' && self.reader.peek_at(1) == '\n' {
            self.reader.forward_by(2)?;
            return Ok("\n".to_string());
        }
        if is_break(c) {
            self.reader.forward()?;
            return Ok("\n".to_string());
        }
        Ok(String::new())
    }

    // ------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------

    fn scan_directive(&mut self) -> Result<Token> {
        let start = self.reader.mark();
        self.reader.forward()?;
        let name = self.scan_directive_name(&start)?;
        let directive = match name.as_str() {
            "YAML" => {
                let (major, minor) = self.scan_yaml_directive_value(&start)?;
                Directive::Yaml { major, minor }
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(&start)?;
                Directive::Tag { handle, prefix }
            }
            _ => {
                // Reserved directive: skip the rest of the line.
                while !is_break(self.reader.peek()) && self.reader.peek() != EOF {
                    self.reader.forward()?;
                }
                Directive::Reserved { name }
            }
        };
        self.scan_directive_ignored_line(&start)?;
        let end = self.reader.mark();
        Ok(Token::new(TokenData::Directive(directive), span(start, end)))
    }

    fn scan_directive_name(&mut self, start: &Option<Mark>) -> Result<String> {
        let mut name = String::new();
        while self.reader.peek().is_ascii_alphanumeric()
            || matches!(self.reader.peek(), '-' | '_')
        {
            name.push(self.reader.peek());
            self.reader.forward()?;
        }
        if name.is_empty() {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start.clone(),
                format!(
                    "expected alphabetic or numeric character, but found '{}'",
                    self.reader.peek()
                ),
                self.reader.mark(),
            ));
        }
        if !is_blank_or_break_or_eof(self.reader.peek()) {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start.clone(),
                format!(
                    "expected alphabetic or numeric character, but found '{}'",
                    self.reader.peek()
                ),
                self.reader.mark(),
            ));
        }
        Ok(name)
    }

    fn scan_yaml_directive_value(&mut self, start: &Option<Mark>) -> Result<(u32, u32)> {
        while self.reader.peek() == ' ' {
            self.reader.forward()?;
        }
        let major = self.scan_directive_number(start)?;
        if self.reader.peek() != '.' {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start.clone(),
                format!("expected a digit or '.', but found '{}'", self.reader.peek()),
                self.reader.mark(),
            ));
        }
        self.reader.forward()?;
        let minor = self.scan_directive_number(start)?;
        if !is_blank_or_break_or_eof(self.reader.peek()) {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start.clone(),
                format!("expected a digit or ' ', but found '{}'", self.reader.peek()),
                self.reader.mark(),
            ));
        }
        Ok((major, minor))
    }

    fn scan_directive_number(&mut self, start: &Option<Mark>) -> Result<u32> {
        let mut digits = String::new();
        while self.reader.peek().is_ascii_digit() {
            digits.push(self.reader.peek());
            self.reader.forward()?;
        }
        if digits.is_empty() {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start.clone(),
                format!("expected a digit, but found '{}'", self.reader.peek()),
                self.reader.mark(),
            ));
        }
        digits.parse().map_err(|_| {
            Error::scanner_in(
                "while scanning a directive",
                start.clone(),
                "found a version number that is too long",
                self.reader.mark(),
            )
        })
    }

    fn scan_tag_directive_value(&mut self, start: &Option<Mark>) -> Result<(String, String)> {
        while self.reader.peek() == ' ' {
            self.reader.forward()?;
        }
        let handle = self.scan_tag_handle("directive", start)?;
        while self.reader.peek() == ' ' {
            self.reader.forward()?;
        }
        let prefix = self.scan_tag_uri("directive", start)?;
        if !is_blank_or_break_or_eof(self.reader.peek()) {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start.clone(),
                format!("expected ' ', but found '{}'", self.reader.peek()),
                self.reader.mark(),
            ));
        }
        Ok((handle, prefix))
    }

    fn scan_directive_ignored_line(&mut self, start: &Option<Mark>) -> Result<()> {
        while self.reader.peek() == ' ' {
            self.reader.forward()?;
        }
        if self.reader.peek() == '#' {
            self.scan_comment()?;
        }
        if !is_break(self.reader.peek()) && self.reader.peek() != EOF {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start.clone(),
                format!(
                    "expected a comment or a line break, but found '{}'",
                    self.reader.peek()
                ),
                self.reader.mark(),
            ));
        }
        self.scan_line_break()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Anchors, aliases, tags
    // ------------------------------------------------------------------

    fn scan_anchor(&mut self, is_anchor: bool) -> Result<Token> {
        let start = self.reader.mark();
        let context = if is_anchor {
            "while scanning an anchor"
        } else {
            "while scanning an alias"
        };
        self.reader.forward()?;
        let mut name = String::new();
        loop {
            let c = self.reader.peek();
            if is_blank_or_break_or_eof(c) || matches!(c, ',' | '[' | ']' | '{' | '}') {
                break;
            }
            name.push(c);
            self.reader.forward()?;
        }
        if name.is_empty() || matches!(self.reader.peek(), '[' | '{') {
            return Err(Error::scanner_in(
                context,
                start,
                format!(
                    "expected alphabetic or numeric character, but found '{}'",
                    self.reader.peek()
                ),
                self.reader.mark(),
            ));
        }
        let end = self.reader.mark();
        let data = if is_anchor {
            TokenData::Anchor(name)
        } else {
            TokenData::Alias(name)
        };
        Ok(Token::new(data, span(start, end)))
    }

    fn scan_tag(&mut self) -> Result<Token> {
        let start = self.reader.mark();
        let next = self.reader.peek_at(1);
        let (handle, suffix) = if next == '<' {
            // Verbatim tag `!<...>`.
            self.reader.forward_by(2)?;
            let suffix = self.scan_tag_uri("tag", &start)?;
            if self.reader.peek() != '>' {
                return Err(Error::scanner_in(
                    "while scanning a tag",
                    start,
                    format!("expected '>', but found '{}'", self.reader.peek()),
                    self.reader.mark(),
                ));
            }
            self.reader.forward()?;
            (None, suffix)
        } else if is_blank_or_break_or_eof(next) {
            // The non-specific tag `!`.
            self.reader.forward()?;
            (None, "!".to_string())
        } else {
            // Shorthand: `!suffix` or `!handle!suffix`. Look ahead for a
            // second `!` to tell the two apart.
            let mut length = 1;
            let mut uses_handle = false;
            loop {
                let c = self.reader.peek_at(length);
                if is_blank_or_break_or_eof(c) {
                    break;
                }
                if c == '!' {
                    uses_handle = true;
                    break;
                }
                length += 1;
            }
            let handle = if uses_handle {
                self.scan_tag_handle("tag", &start)?
            } else {
                self.reader.forward()?;
                "!".to_string()
            };
            let suffix = self.scan_tag_uri("tag", &start)?;
            (Some(handle), suffix)
        };
        let c = self.reader.peek();
        if !is_blank_or_break_or_eof(c) && !(self.flow_level > 0 && matches!(c, ',' | ']' | '}')) {
            return Err(Error::scanner_in(
                "while scanning a tag",
                start,
                format!("expected ' ', but found '{}'", c),
                self.reader.mark(),
            ));
        }
        let end = self.reader.mark();
        Ok(Token::new(TokenData::Tag { handle, suffix }, span(start, end)))
    }

    fn scan_tag_handle(&mut self, context: &str, start: &Option<Mark>) -> Result<String> {
        let full_context = format!("while scanning a {}", context);
        if self.reader.peek() != '!' {
            return Err(Error::scanner_in(
                full_context,
                start.clone(),
                format!("expected '!', but found '{}'", self.reader.peek()),
                self.reader.mark(),
            ));
        }
        let mut handle = String::from("!");
        self.reader.forward()?;
        if !is_blank_or_break_or_eof(self.reader.peek()) {
            while self.reader.peek().is_ascii_alphanumeric()
                || matches!(self.reader.peek(), '-' | '_')
            {
                handle.push(self.reader.peek());
                self.reader.forward()?;
            }
            if self.reader.peek() != '!' {
                return Err(Error::scanner_in(
                    full_context,
                    start.clone(),
                    format!("expected '!', but found '{}'", self.reader.peek()),
                    self.reader.mark(),
                ));
            }
            handle.push('!');
            self.reader.forward()?;
        }
        Ok(handle)
    }

    fn scan_tag_uri(&mut self, context: &str, start: &Option<Mark>) -> Result<String> {
        let mut uri = String::new();
        loop {
            let c = self.reader.peek();
            if c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    '-' | ';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | ',' | '_' | '.'
                        | '!' | '~' | '*' | '\'' | '(' | ')' | '[' | ']'
                )
            {
                uri.push(c);
                self.reader.forward()?;
            } else if c == '%' {
                uri.push_str(&self.scan_uri_escapes(context, start)?);
            } else {
                break;
            }
        }
        if uri.is_empty() {
            return Err(Error::scanner_in(
                format!("while scanning a {}", context),
                start.clone(),
                format!("expected a URI, but found '{}'", self.reader.peek()),
                self.reader.mark(),
            ));
        }
        Ok(uri)
    }

    /// Decode a run of `%xx` escapes as UTF-8 bytes.
    fn scan_uri_escapes(&mut self, context: &str, start: &Option<Mark>) -> Result<String> {
        let full_context = format!("while scanning a {}", context);
        let mut bytes = Vec::new();
        while self.reader.peek() == '%' {
            self.reader.forward()?;
            let hex = self.reader.prefix(2);
            if hex.chars().count() != 2 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::scanner_in(
                    full_context,
                    start.clone(),
                    format!(
                        "expected URI escape sequence of 2 hexadecimal numbers, but found '{}'",
                        hex
                    ),
                    self.reader.mark(),
                ));
            }
            bytes.push(u8::from_str_radix(&hex, 16).unwrap());
            self.reader.forward_by(2)?;
        }
        String::from_utf8(bytes).map_err(|_| {
            Error::scanner_in(
                full_context,
                start.clone(),
                "found an invalid UTF-8 sequence in a URI escape",
                self.reader.mark(),
            )
        })
    }

    // ------------------------------------------------------------------
    // Block scalars
    // ------------------------------------------------------------------

    fn scan_block_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let folded = style == ScalarStyle::Folded;
        let start = self.reader.mark();
        self.reader.forward()?;
        let (chomping, increment) = self.scan_block_scalar_header(&start)?;
        self.scan_block_scalar_ignored_line(&start)?;

        let min_indent = (self.indent + 1).max(1);
        let mut chunks = String::new();
        let mut breaks;
        let indent;
        if let Some(increment) = increment {
            indent = min_indent + increment as isize - 1;
            let (b, _) = self.scan_block_scalar_breaks(indent)?;
            breaks = b;
        } else {
            let (b, max_indent) = self.scan_block_scalar_indentation()?;
            breaks = b;
            indent = min_indent.max(max_indent);
        }
        let mut end = self.reader.mark();
        let mut line_break = String::new();

        while self.reader.column() as isize == indent && self.reader.peek() != EOF {
            chunks.push_str(&breaks);
            let leading_non_space = !is_blank(self.reader.peek());
            let mut line = String::new();
            while !is_break(self.reader.peek()) && self.reader.peek() != EOF {
                line.push(self.reader.peek());
                self.reader.forward()?;
            }
            chunks.push_str(&line);
            end = self.reader.mark();
            line_break = self.scan_line_break()?;
            let (b, e) = self.scan_block_scalar_breaks(indent)?;
            breaks = b;
            if let Some(e) = e {
                end = Some(e);
            }
            if self.reader.column() as isize == indent && self.reader.peek() != EOF {
                // Folded scalars join lines with a space unless the fold
                // is adjacent to a more-indented or blank line.
                if folded
                    && line_break == "\n"
                    && leading_non_space
                    && !is_blank(self.reader.peek())
                {
                    if breaks.is_empty() {
                        chunks.push(' ');
                    } else {
                        chunks.push_str(&breaks);
                        breaks = String::new();
                    }
                } else {
                    chunks.push_str(&line_break);
                }
            } else {
                break;
            }
        }

        match chomping {
            Chomping::Strip => {}
            Chomping::Clip => {
                chunks.push_str(&line_break);
            }
            Chomping::Keep => {
                chunks.push_str(&line_break);
                chunks.push_str(&breaks);
            }
        }

        Ok(Token::new(
            TokenData::Scalar {
                value: chunks,
                style,
            },
            span(start, end),
        ))
    }

    fn scan_block_scalar_header(
        &mut self,
        start: &Option<Mark>,
    ) -> Result<(Chomping, Option<u32>)> {
        let mut chomping = Chomping::Clip;
        let mut increment = None;
        let c = self.reader.peek();
        if c == '+' || c == '-' {
            chomping = if c == '+' { Chomping::Keep } else { Chomping::Strip };
            self.reader.forward()?;
            let c = self.reader.peek();
            if c.is_ascii_digit() {
                if c == '0' {
                    return Err(Error::scanner_in(
                        "while scanning a block scalar",
                        start.clone(),
                        "expected indentation indicator in the range 1-9, but found 0",
                        self.reader.mark(),
                    ));
                }
                increment = Some(c.to_digit(10).unwrap());
                self.reader.forward()?;
            }
        } else if c.is_ascii_digit() {
            if c == '0' {
                return Err(Error::scanner_in(
                    "while scanning a block scalar",
                    start.clone(),
                    "expected indentation indicator in the range 1-9, but found 0",
                    self.reader.mark(),
                ));
            }
            increment = Some(c.to_digit(10).unwrap());
            self.reader.forward()?;
            let c = self.reader.peek();
            if c == '+' || c == '-' {
                chomping = if c == '+' { Chomping::Keep } else { Chomping::Strip };
                self.reader.forward()?;
            }
        }
        let c = self.reader.peek();
        if !is_blank_or_break_or_eof(c) && c != '#' {
            return Err(Error::scanner_in(
                "while scanning a block scalar",
                start.clone(),
                format!("expected chomping or indentation indicators, but found '{}'", c),
                self.reader.mark(),
            ));
        }
        Ok((chomping, increment))
    }

    fn scan_block_scalar_ignored_line(&mut self, start: &Option<Mark>) -> Result<()> {
        while self.reader.peek() == ' ' {
            self.reader.forward()?;
        }
        if self.reader.peek() == '#' {
            self.scan_comment()?;
        }
        if !is_break(self.reader.peek()) && self.reader.peek() != EOF {
            return Err(Error::scanner_in(
                "while scanning a block scalar",
                start.clone(),
                format!(
                    "expected a comment or a line break, but found '{}'",
                    self.reader.peek()
                ),
                self.reader.mark(),
            ));
        }
        self.scan_line_break()?;
        Ok(())
    }

    /// Measure the indentation of the first non-blank content line.
    fn scan_block_scalar_indentation(&mut self) -> Result<(String, isize)> {
        let mut breaks = String::new();
        let mut max_indent: isize = 0;
        loop {
            let c = self.reader.peek();
            if is_break(c) {
                breaks.push_str(&self.scan_line_break()?);
            } else if c == ' ' {
                self.reader.forward()?;
                if self.reader.column() as isize > max_indent {
                    max_indent = self.reader.column() as isize;
                }
            } else {
                break;
            }
        }
        Ok((breaks, max_indent))
    }

    /// Consume blank lines inside a block scalar, up to `indent` spaces
    /// per line.
    fn scan_block_scalar_breaks(&mut self, indent: isize) -> Result<(String, Option<Mark>)> {
        let mut breaks = String::new();
        let mut end = self.reader.mark();
        while (self.reader.column() as isize) < indent && self.reader.peek() == ' ' {
            self.reader.forward()?;
        }
        while is_break(self.reader.peek()) {
            breaks.push_str(&self.scan_line_break()?);
            end = self.reader.mark();
            while (self.reader.column() as isize) < indent && self.reader.peek() == ' ' {
                self.reader.forward()?;
            }
        }
        Ok((breaks, end))
    }

    // ------------------------------------------------------------------
    // Flow scalars
    // ------------------------------------------------------------------

    fn scan_flow_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let double = style == ScalarStyle::DoubleQuoted;
        let start = self.reader.mark();
        let quote = self.reader.peek();
        self.reader.forward()?;
        let mut chunks = String::new();
        self.scan_flow_scalar_non_spaces(double, &start, &mut chunks)?;
        while self.reader.peek() != quote {
            self.scan_flow_scalar_spaces(&start, &mut chunks)?;
            self.scan_flow_scalar_non_spaces(double, &start, &mut chunks)?;
        }
        self.reader.forward()?;
        let end = self.reader.mark();
        Ok(Token::new(
            TokenData::Scalar {
                value: chunks,
                style,
            },
            span(start, end),
        ))
    }

    fn scan_flow_scalar_non_spaces(
        &mut self,
        double: bool,
        start: &Option<Mark>,
        chunks: &mut String,
    ) -> Result<()> {
        loop {
            loop {
                let c = self.reader.peek();
                if matches!(c, '\'' | '"' | '\\') || is_blank_or_break_or_eof(c) {
                    break;
                }
                chunks.push(c);
                self.reader.forward()?;
            }
            let c = self.reader.peek();
            if !double && c == '\'' && self.reader.peek_at(1) == '\'' {
                chunks.push('\'');
                self.reader.forward_by(2)?;
            } else if (double && c == '\'') || (!double && matches!(c, '"' | '\\')) {
                chunks.push(c);
                self.reader.forward()?;
            } else if double && c == '\\' {
                self.reader.forward()?;
                let c = self.reader.peek();
                if let Some(replacement) = escape_replacement(c) {
                    chunks.push(replacement);
                    self.reader.forward()?;
                } else if let Some(length) = escape_code_length(c) {
                    self.reader.forward()?;
                    let hex = self.reader.prefix(length);
                    if hex.chars().count() != length
                        || !hex.chars().all(|h| h.is_ascii_hexdigit())
                    {
                        return Err(Error::scanner_in(
                            "while scanning a double-quoted scalar",
                            start.clone(),
                            format!(
                                "expected escape sequence of {} hexadecimal numbers, but found '{}'",
                                length, hex
                            ),
                            self.reader.mark(),
                        ));
                    }
                    let code = u32::from_str_radix(&hex, 16).unwrap();
                    let decoded = char::from_u32(code).ok_or_else(|| {
                        Error::scanner_in(
                            "while scanning a double-quoted scalar",
                            start.clone(),
                            format!("found an invalid escaped code point 0x{:X}", code),
                            self.reader.mark(),
                        )
                    })?;
                    chunks.push(decoded);
                    self.reader.forward_by(length)?;
                } else if is_break(c) {
                    // Escaped line break: fold away the break and any
                    // following indentation.
                    self.scan_line_break()?;
                    self.scan_flow_scalar_breaks(start, chunks)?;
                } else {
                    return Err(Error::scanner_in(
                        "while scanning a double-quoted scalar",
                        start.clone(),
                        format!("found unknown escape character '{}'", c),
                        self.reader.mark(),
                    ));
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_flow_scalar_spaces(
        &mut self,
        start: &Option<Mark>,
        chunks: &mut String,
    ) -> Result<()> {
        let mut whitespaces = String::new();
        while is_blank(self.reader.peek()) {
            whitespaces.push(self.reader.peek());
            self.reader.forward()?;
        }
        let c = self.reader.peek();
        if c == EOF {
            return Err(Error::scanner_in(
                "while scanning a quoted scalar",
                start.clone(),
                "found unexpected end of stream",
                self.reader.mark(),
            ));
        }
        if is_break(c) {
            self.scan_line_break()?;
            let mut breaks = String::new();
            self.scan_flow_scalar_breaks(start, &mut breaks)?;
            if breaks.is_empty() {
                chunks.push(' ');
            } else {
                chunks.push_str(&breaks);
            }
        } else {
            chunks.push_str(&whitespaces);
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(
        &mut self,
        start: &Option<Mark>,
        chunks: &mut String,
    ) -> Result<()> {
        loop {
            let prefix = self.reader.prefix(3);
            if (prefix == "---" || prefix == "...")
                && self.reader.column() == 0
                && is_blank_or_break_or_eof(self.reader.peek_at(3))
            {
                return Err(Error::scanner_in(
                    "while scanning a quoted scalar",
                    start.clone(),
                    "found unexpected document separator",
                    self.reader.mark(),
                ));
            }
            while is_blank(self.reader.peek()) {
                self.reader.forward()?;
            }
            if is_break(self.reader.peek()) {
                chunks.push_str(&self.scan_line_break()?);
            } else {
                return Ok(());
            }
        }
    }

    // ------------------------------------------------------------------
    // Plain scalars
    // ------------------------------------------------------------------

    fn scan_plain(&mut self) -> Result<Token> {
        let start = self.reader.mark();
        let mut end = self.reader.mark();
        let indent = self.indent + 1;
        let mut chunks = String::new();
        let mut spaces = String::new();
        loop {
            if self.reader.peek() == '#' {
                break;
            }
            let mut length = 0;
            loop {
                let c = self.reader.peek_at(length);
                if is_blank_or_break_or_eof(c) {
                    break;
                }
                if c == ':' {
                    let next = self.reader.peek_at(length + 1);
                    let ends = is_blank_or_break_or_eof(next)
                        || (self.flow_level > 0 && matches!(next, ',' | '[' | ']' | '{' | '}'));
                    if ends {
                        break;
                    }
                }
                if self.flow_level > 0 && matches!(c, ',' | '[' | ']' | '{' | '}') {
                    break;
                }
                length += 1;
            }
            if length == 0 {
                break;
            }
            self.allow_simple_key = false;
            chunks.push_str(&spaces);
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward_by(length)?;
            end = self.reader.mark();
            spaces = self.scan_plain_spaces()?;
            if spaces.is_empty()
                || self.reader.peek() == '#'
                || (self.flow_level == 0 && (self.reader.column() as isize) < indent)
            {
                break;
            }
        }
        Ok(Token::new(
            TokenData::Scalar {
                value: chunks,
                style: ScalarStyle::Plain,
            },
            span(start, end),
        ))
    }

    /// Consume spaces and folds between plain-scalar lines. Returns the
    /// replacement text, or empty when the scalar ends here.
    fn scan_plain_spaces(&mut self) -> Result<String> {
        let mut whitespaces = String::new();
        while self.reader.peek() == ' ' {
            whitespaces.push(' ');
            self.reader.forward()?;
        }
        let c = self.reader.peek();
        if is_break(c) {
            self.scan_line_break()?;
            self.allow_simple_key = true;
            if self.at_document_boundary() {
                return Ok(String::new());
            }
            let mut breaks = String::new();
            loop {
                let c = self.reader.peek();
                if c == ' ' {
                    self.reader.forward()?;
                } else if is_break(c) {
                    breaks.push_str(&self.scan_line_break()?);
                    if self.at_document_boundary() {
                        return Ok(String::new());
                    }
                } else {
                    break;
                }
            }
            let mut chunks = String::new();
            if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
            Ok(chunks)
        } else {
            Ok(whitespaces)
        }
    }

    fn at_document_boundary(&self) -> bool {
        let prefix = self.reader.prefix(3);
        (prefix == "---" || prefix == "...")
            && self.reader.column() == 0
            && is_blank_or_break_or_eof(self.reader.peek_at(3))
    }
}

/// Single-character escapes in double-quoted scalars.
fn escape_replacement(c: char) -> Option<char> {
    Some(match c {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0b',
        'f' => '\x0c',
        'r' => '\r',
        'e' => '\x1b',
        ' ' => ' ',
        '"' => '"',
        '\\' => '\\',
        '/' => '/',
        'N' => '\u{85}',
        '_' => '\u{a0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

/// Hex-digit counts for `\x`, `\u`, `\U` escapes.
fn escape_code_length(c: char) -> Option<usize> {
    match c {
        'x' => Some(2),
        'u' => Some(4),
        'U' => Some(8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(input: &str) -> Vec<TokenId> {
        let settings = LoadSettings::default();
        let mut scanner = Scanner::new(&settings, input).unwrap();
        let mut ids = Vec::new();
        loop {
            let token = scanner.next_token().unwrap();
            let id = token.id();
            ids.push(id);
            if id == TokenId::StreamEnd {
                break;
            }
        }
        ids
    }

    fn scalar_values(input: &str) -> Vec<String> {
        let settings = LoadSettings::default();
        let mut scanner = Scanner::new(&settings, input).unwrap();
        let mut values = Vec::new();
        loop {
            let token = scanner.next_token().unwrap();
            match token.data {
                TokenData::Scalar { value, .. } => values.push(value),
                TokenData::StreamEnd => break,
                _ => {}
            }
        }
        values
    }

    #[test]
    fn test_scan_plain_scalar() {
        assert_eq!(
            tokens_of("hello"),
            vec![TokenId::StreamStart, TokenId::Scalar, TokenId::StreamEnd]
        );
    }

    #[test]
    fn test_scan_block_mapping() {
        assert_eq!(
            tokens_of("a: 1\nb: 2\n"),
            vec![
                TokenId::StreamStart,
                TokenId::BlockMappingStart,
                TokenId::Key,
                TokenId::Scalar,
                TokenId::Value,
                TokenId::Scalar,
                TokenId::Key,
                TokenId::Scalar,
                TokenId::Value,
                TokenId::Scalar,
                TokenId::BlockEnd,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_scan_block_sequence() {
        assert_eq!(
            tokens_of("- a\n- b\n"),
            vec![
                TokenId::StreamStart,
                TokenId::BlockSequenceStart,
                TokenId::BlockEntry,
                TokenId::Scalar,
                TokenId::BlockEntry,
                TokenId::Scalar,
                TokenId::BlockEnd,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_scan_nested_block_collections() {
        assert_eq!(
            tokens_of("a:\n  - 1\n"),
            vec![
                TokenId::StreamStart,
                TokenId::BlockMappingStart,
                TokenId::Key,
                TokenId::Scalar,
                TokenId::Value,
                TokenId::BlockSequenceStart,
                TokenId::BlockEntry,
                TokenId::Scalar,
                TokenId::BlockEnd,
                TokenId::BlockEnd,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_scan_flow_mapping() {
        assert_eq!(
            tokens_of("{a: 1}"),
            vec![
                TokenId::StreamStart,
                TokenId::FlowMappingStart,
                TokenId::Key,
                TokenId::Scalar,
                TokenId::Value,
                TokenId::Scalar,
                TokenId::FlowMappingEnd,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_scan_flow_sequence_entries() {
        assert_eq!(
            tokens_of("[1, 2]"),
            vec![
                TokenId::StreamStart,
                TokenId::FlowSequenceStart,
                TokenId::Scalar,
                TokenId::FlowEntry,
                TokenId::Scalar,
                TokenId::FlowSequenceEnd,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_scan_document_markers() {
        assert_eq!(
            tokens_of("---\nfoo\n...\n"),
            vec![
                TokenId::StreamStart,
                TokenId::DocumentStart,
                TokenId::Scalar,
                TokenId::DocumentEnd,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_scan_anchor_and_alias() {
        assert_eq!(
            tokens_of("- &a x\n- *a\n"),
            vec![
                TokenId::StreamStart,
                TokenId::BlockSequenceStart,
                TokenId::BlockEntry,
                TokenId::Anchor,
                TokenId::Scalar,
                TokenId::BlockEntry,
                TokenId::Alias,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_scan_directive() {
        assert_eq!(
            tokens_of("%YAML 1.2\n---\nx\n"),
            vec![
                TokenId::StreamStart,
                TokenId::Directive,
                TokenId::DocumentStart,
                TokenId::Scalar,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_single_quoted_escapes() {
        assert_eq!(scalar_values("'it''s'"), vec!["it's"]);
    }

    #[test]
    fn test_double_quoted_escapes() {
        assert_eq!(scalar_values(r#""a\nb\tc\u263A""#), vec!["a\nb\tc\u{263a}"]);
    }

    #[test]
    fn test_plain_multiline_folds() {
        assert_eq!(scalar_values("a\n b\n"), vec!["a b"]);
    }

    #[test]
    fn test_literal_block_scalar() {
        assert_eq!(scalar_values("|\n  a\n  b\n"), vec!["a\nb\n"]);
    }

    #[test]
    fn test_literal_strip_chomping() {
        assert_eq!(scalar_values("|-\n  a\n  b\n"), vec!["a\nb"]);
    }

    #[test]
    fn test_literal_keep_chomping() {
        assert_eq!(scalar_values("|+\n  a\n\n"), vec!["a\n\n"]);
    }

    #[test]
    fn test_folded_block_scalar() {
        assert_eq!(scalar_values(">\n  a\n  b\n"), vec!["a b\n"]);
    }

    #[test]
    fn test_unterminated_quote_errors() {
        let settings = LoadSettings::default();
        let mut scanner = Scanner::new(&settings, "'open").unwrap();
        let mut result = Ok(());
        loop {
            match scanner.next_token() {
                Ok(token) => {
                    if token.id() == TokenId::StreamEnd {
                        break;
                    }
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        assert!(matches!(result, Err(Error::Scanner(_))));
    }

    #[test]
    fn test_tab_indentation_errors() {
        let settings = LoadSettings::default();
        let mut scanner = Scanner::new(&settings, "a: 1\n\tb: 2\n").unwrap();
        let mut failed = false;
        loop {
            match scanner.next_token() {
                Ok(token) => {
                    if token.id() == TokenId::StreamEnd {
                        break;
                    }
                }
                Err(e) => {
                    assert!(e.to_string().contains("\\t(TAB)"));
                    failed = true;
                    break;
                }
            }
        }
        assert!(failed);
    }

    #[test]
    fn test_comment_tokens_when_enabled() {
        let settings = LoadSettings::default().with_parse_comments(true);
        let mut scanner = Scanner::new(&settings, "# hi\na: 1 # inline\n").unwrap();
        let mut comments = Vec::new();
        loop {
            let token = scanner.next_token().unwrap();
            match token.data {
                TokenData::Comment { kind, value } => comments.push((kind, value)),
                TokenData::StreamEnd => break,
                _ => {}
            }
        }
        assert_eq!(
            comments,
            vec![
                (CommentKind::Block, " hi".to_string()),
                (CommentKind::InLine, " inline".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_skipped_by_default() {
        assert_eq!(
            tokens_of("# hi\na: 1\n"),
            vec![
                TokenId::StreamStart,
                TokenId::BlockMappingStart,
                TokenId::Key,
                TokenId::Scalar,
                TokenId::Value,
                TokenId::Scalar,
                TokenId::BlockEnd,
                TokenId::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_tag_shorthand() {
        let settings = LoadSettings::default();
        let mut scanner = Scanner::new(&settings, "!!str x").unwrap();
        loop {
            let token = scanner.next_token().unwrap();
            if let TokenData::Tag { handle, suffix } = &token.data {
                assert_eq!(handle.as_deref(), Some("!!"));
                assert_eq!(suffix, "str");
                return;
            }
            if token.id() == TokenId::StreamEnd {
                panic!("no tag token found");
            }
        }
    }

    #[test]
    fn test_verbatim_tag() {
        let settings = LoadSettings::default();
        let mut scanner = Scanner::new(&settings, "!<tag:example.com,2000:app/foo> x").unwrap();
        loop {
            let token = scanner.next_token().unwrap();
            if let TokenData::Tag { handle, suffix } = &token.data {
                assert_eq!(handle.as_deref(), None);
                assert_eq!(suffix, "tag:example.com,2000:app/foo");
                return;
            }
            if token.id() == TokenId::StreamEnd {
                panic!("no tag token found");
            }
        }
    }
}
