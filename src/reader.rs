//! Phase 1: Reader
//!
//! The reader decodes raw input into a code-point buffer and hands single
//! code points to the scanner. It performs:
//! - UTF-8/16/32 decoding with BOM autodetection (byte input)
//! - printable-character validation per YAML 1.2 chapter 5.1
//! - line/column/index tracking for marks
//! - the per-document code-point budget

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mark::Mark;
use crate::settings::LoadSettings;

/// Code point returned at end of stream.
pub const EOF: char = '\0';

/// Whether a code point may appear in a YAML stream.
/// Tab, line breaks and NEL are allowed on top of the printable ranges.
pub fn is_printable(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\x20'..='\x7e'
        | '\u{85}'
        | '\u{a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
}

/// A stream of code points over a fully decoded input.
pub struct Reader {
    name: Arc<str>,
    buffer: Arc<[char]>,
    pointer: usize,
    index: usize,
    line: usize,
    column: usize,
    use_marks: bool,
    code_point_limit: usize,
    document_index: usize,
}

impl Reader {
    /// Build a reader over string input. A leading BOM is stripped; any
    /// non-printable code point is rejected up front.
    pub fn from_str(settings: &LoadSettings, input: &str) -> Result<Self> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let buffer: Vec<char> = input.chars().collect();
        Self::from_chars(settings, buffer)
    }

    /// Build a reader over byte input, autodetecting UTF-8/16/32 by BOM.
    pub fn from_bytes(settings: &LoadSettings, input: &[u8]) -> Result<Self> {
        let decoded = decode(input)?;
        let decoded = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);
        Self::from_chars(settings, decoded.chars().collect())
    }

    fn from_chars(settings: &LoadSettings, buffer: Vec<char>) -> Result<Self> {
        let name: Arc<str> = settings.label.as_str().into();
        let buffer: Arc<[char]> = buffer.into();
        let reader = Reader {
            name,
            buffer,
            pointer: 0,
            index: 0,
            line: 0,
            column: 0,
            use_marks: settings.use_marks,
            code_point_limit: settings.code_point_limit,
            document_index: 0,
        };
        reader.check_printable()?;
        Ok(reader)
    }

    fn check_printable(&self) -> Result<()> {
        let mut line = 0;
        let mut column = 0;
        for (i, &c) in self.buffer.iter().enumerate() {
            if !is_printable(c) {
                let mark = self.use_marks.then(|| {
                    Mark::new(self.name.clone(), i, line, column, self.buffer.clone(), i)
                });
                return Err(Error::reader(
                    format!(
                        "unacceptable character '{}' (0x{:X}) special characters are not allowed",
                        c.escape_default(),
                        c as u32
                    ),
                    mark,
                ));
            }
            if c == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        Ok(())
    }

    /// The code point at the current position, or [`EOF`].
    pub fn peek(&self) -> char {
        self.peek_at(0)
    }

    /// The code point `k` positions ahead, or [`EOF`].
    pub fn peek_at(&self, k: usize) -> char {
        self.buffer.get(self.pointer + k).copied().unwrap_or(EOF)
    }

    /// The next `n` code points without consuming them (short at EOF).
    pub fn prefix(&self, n: usize) -> String {
        let end = (self.pointer + n).min(self.buffer.len());
        self.buffer[self.pointer..end].iter().collect()
    }

    /// Consume one code point.
    pub fn forward(&mut self) -> Result<()> {
        self.forward_by(1)
    }

    /// Consume `n` code points, tracking line/column and the document
    /// budget.
    pub fn forward_by(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            if self.pointer >= self.buffer.len() {
                break;
            }
            let c = self.buffer[self.pointer];
            self.pointer += 1;
            self.index += 1;
            self.document_index += 1;
            if c == '\n' || (c == '\r' && self.peek() != '\n') {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
            if self.document_index > self.code_point_limit {
                return Err(Error::Limit(self.code_point_limit));
            }
        }
        Ok(())
    }

    /// Position marker for the current code point, when marks are enabled.
    pub fn mark(&self) -> Option<Mark> {
        self.use_marks.then(|| {
            Mark::new(
                self.name.clone(),
                self.index,
                self.line,
                self.column,
                self.buffer.clone(),
                self.pointer,
            )
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn is_eof(&self) -> bool {
        self.pointer >= self.buffer.len()
    }

    /// Restart the per-document budget. Called by the parser at document
    /// boundaries so each document is measured on its own.
    pub fn reset_document_index(&mut self) {
        self.document_index = 0;
    }
}

/// Decode bytes into a string, autodetecting the encoding from the BOM.
/// Defaults to UTF-8 when no BOM is present.
fn decode(input: &[u8]) -> Result<String> {
    match input {
        [0x00, 0x00, 0xfe, 0xff, rest @ ..] => decode_utf32(rest, true),
        [0xff, 0xfe, 0x00, 0x00, rest @ ..] => decode_utf32(rest, false),
        [0xef, 0xbb, 0xbf, rest @ ..] => decode_utf8(rest),
        [0xfe, 0xff, rest @ ..] => decode_utf16(rest, true),
        [0xff, 0xfe, rest @ ..] => decode_utf16(rest, false),
        _ => decode_utf8(input),
    }
}

fn decode_utf8(input: &[u8]) -> Result<String> {
    String::from_utf8(input.to_vec())
        .map_err(|e| Error::reader(format!("malformed UTF-8 input: {}", e), None))
}

fn decode_utf16(input: &[u8], big_endian: bool) -> Result<String> {
    if input.len() % 2 != 0 {
        return Err(Error::reader("truncated UTF-16 input", None));
    }
    let units: Vec<u16> = input
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units)
        .map_err(|e| Error::reader(format!("malformed UTF-16 input: {}", e), None))
}

fn decode_utf32(input: &[u8], big_endian: bool) -> Result<String> {
    if input.len() % 4 != 0 {
        return Err(Error::reader("truncated UTF-32 input", None));
    }
    input
        .chunks_exact(4)
        .map(|quad| {
            let value = if big_endian {
                u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]])
            } else {
                u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]])
            };
            char::from_u32(value).ok_or_else(|| {
                Error::reader(format!("invalid UTF-32 code point 0x{:X}", value), None)
            })
        })
        .collect()
}
