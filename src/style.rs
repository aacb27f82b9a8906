//! Shared presentation vocabulary: scalar styles, flow styles, comment kinds.

use std::fmt;

/// The style a scalar was written in, or should be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    /// Unquoted scalar.
    Plain,
    /// `'...'` scalar.
    SingleQuoted,
    /// `"..."` scalar.
    DoubleQuoted,
    /// `|` block scalar.
    Literal,
    /// `>` block scalar.
    Folded,
    /// Dump-only style: double-quote exactly the strings whose plain form
    /// would resolve to a non-string type.
    Json,
}

impl ScalarStyle {
    /// The sigil used by the textual event representation.
    pub fn sigil(self) -> char {
        match self {
            ScalarStyle::Plain => ':',
            ScalarStyle::SingleQuoted => '\'',
            ScalarStyle::DoubleQuoted | ScalarStyle::Json => '"',
            ScalarStyle::Literal => '|',
            ScalarStyle::Folded => '>',
        }
    }
}

impl fmt::Display for ScalarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sigil())
    }
}

/// Block vs. flow collection syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStyle {
    /// `[a, b]` / `{a: b}`.
    Flow,
    /// Indentation-delimited.
    Block,
    /// Decide per node while dumping. Never produced by the parser.
    Auto,
}

impl FlowStyle {
    pub fn is_flow(self) -> bool {
        matches!(self, FlowStyle::Flow)
    }
}

/// Where a comment sits relative to the surrounding content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// A comment alone on its line.
    Block,
    /// A comment trailing other content on the same line.
    InLine,
}
