//! Source positions for diagnostics.
//!
//! A [`Mark`] pins a code-point position in the input together with a shared
//! snapshot of the decoded buffer, so error messages can show the offending
//! line with a caret. Marks are only materialized when `use_marks` is on;
//! with marks off the engine carries no positions and errors print the bare
//! problem text.

use std::fmt;
use std::sync::Arc;

/// An immutable position in the input stream.
#[derive(Debug, Clone)]
pub struct Mark {
    /// Label of the input source, used in messages (`settings.label`).
    pub name: Arc<str>,
    /// Absolute code-point index from the start of the stream.
    pub index: usize,
    /// Zero-based line.
    pub line: usize,
    /// Zero-based column, in code points.
    pub column: usize,
    buffer: Arc<[char]>,
    pointer: usize,
}

impl Mark {
    pub(crate) fn new(
        name: Arc<str>,
        index: usize,
        line: usize,
        column: usize,
        buffer: Arc<[char]>,
        pointer: usize,
    ) -> Self {
        Mark {
            name,
            index,
            line,
            column,
            buffer,
            pointer,
        }
    }

    /// Render the surrounding line trimmed to `max_length` code points, with
    /// a caret under the marked position.
    pub fn get_snippet(&self, indent: usize, max_length: usize) -> String {
        let half = max_length / 2 - 1;
        let mut start = self.pointer.min(self.buffer.len());
        let mut head = "";
        while start > 0 && !matches!(self.buffer[start - 1], '\0' | '\r' | '\n') {
            start -= 1;
            if self.pointer - start > half {
                head = " ... ";
                start += 5;
                break;
            }
        }
        let mut end = self.pointer.min(self.buffer.len());
        let mut tail = "";
        while end < self.buffer.len() && !matches!(self.buffer[end], '\0' | '\r' | '\n') {
            end += 1;
            if end - self.pointer > half {
                tail = " ... ";
                end -= 5;
                break;
            }
        }
        let text: String = self.buffer[start..end].iter().collect();
        let pad = " ".repeat(indent);
        let caret_pad = " ".repeat(indent + self.pointer - start + head.chars().count());
        format!("{}{}{}{}\n{}^", pad, head, text, tail, caret_pad)
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " in \"{}\", line {}, column {}:\n{}",
            self.name,
            self.line + 1,
            self.column + 1,
            self.get_snippet(4, 75)
        )
    }
}

/// A start/end mark pair. Tokens, events and nodes carry `Option<Span>`,
/// which keeps the both-marks-or-neither rule by construction.
#[derive(Debug, Clone)]
pub struct Span {
    pub start: Mark,
    pub end: Mark,
}

impl Span {
    pub fn new(start: Mark, end: Mark) -> Self {
        Span { start, end }
    }
}
