//! Error types for the YAML engine.
//!
//! Every stage reports through the one [`Error`] enum. Errors raised while
//! a document is being loaded carry a [`Problem`]: the problem text, an
//! optional surrounding-context text, and optional marks for both. The
//! rendered message reproduces the layout of the reference YAML engines:
//!
//! ```text
//! while parsing a flow mapping
//!  in "input", line 1, column 1:
//!     {a: 4}}
//!     ^
//! expected ',' or '}', but got '}'
//!  in "input", line 1, column 7:
//!     {a: 4}}
//!           ^
//! ```
//!
//! With marks disabled the message reduces to the problem text alone,
//! terminated by a newline.

use std::fmt;

use thiserror::Error;

use crate::mark::Mark;

/// Result type for all engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Problem description with optional context and positions.
#[derive(Debug, Clone)]
pub struct Problem {
    pub context: Option<String>,
    pub context_mark: Option<Mark>,
    pub problem: String,
    pub problem_mark: Option<Mark>,
}

impl Problem {
    /// A bare problem with no context and no position.
    pub fn new(problem: impl Into<String>) -> Self {
        Problem {
            context: None,
            context_mark: None,
            problem: problem.into(),
            problem_mark: None,
        }
    }

    /// A problem at a position.
    pub fn at(problem: impl Into<String>, mark: Option<Mark>) -> Self {
        Problem {
            context: None,
            context_mark: None,
            problem: problem.into(),
            problem_mark: mark,
        }
    }

    /// A problem inside a named construct (`while scanning a ...`).
    pub fn in_context(
        context: impl Into<String>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Problem {
            context: Some(context.into()),
            context_mark,
            problem: problem.into(),
            problem_mark,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            writeln!(f, "{}", context)?;
        }
        if let Some(mark) = &self.context_mark {
            // Skip the context mark when it would repeat the problem mark.
            let repeated = self
                .problem_mark
                .as_ref()
                .map(|p| p.line == mark.line && p.column == mark.column)
                .unwrap_or(false);
            if !repeated {
                writeln!(f, "{}", mark)?;
            }
        }
        writeln!(f, "{}", self.problem)?;
        if let Some(mark) = &self.problem_mark {
            writeln!(f, "{}", mark)?;
        }
        Ok(())
    }
}

/// Error type for the engine. All variants are fatal for the current
/// document; the pipeline never retries.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Invalid or non-printable input code points, or a decode failure.
    #[error("{0}")]
    Reader(Problem),

    /// Lexical violation: bad indentation, tab misuse, unterminated
    /// construct, character that cannot start a token.
    #[error("{0}")]
    Scanner(Problem),

    /// Token sequence violating the grammar.
    #[error("{0}")]
    Parser(Problem),

    /// Unresolved alias, disallowed recursive key, duplicate key, alias
    /// ceiling exceeded.
    #[error("{0}")]
    Composer(Problem),

    /// Unsupported `%YAML` version directive.
    #[error("{0}")]
    Resolver(Problem),

    /// The per-document code-point budget was exceeded.
    #[error("The incoming YAML document exceeds the limit: {0} code points.")]
    Limit(usize),

    /// Invalid emitter settings or an event sequence the emitter cannot
    /// render.
    #[error("{0}")]
    Emitter(String),

    /// Dump-side graph problem, e.g. a cycle under dereference-aliases mode.
    #[error("{0}")]
    Serializer(String),
}

impl Error {
    pub fn reader(problem: impl Into<String>, mark: Option<Mark>) -> Self {
        Error::Reader(Problem::at(problem, mark))
    }

    pub fn scanner(problem: impl Into<String>, mark: Option<Mark>) -> Self {
        Error::Scanner(Problem::at(problem, mark))
    }

    pub fn scanner_in(
        context: impl Into<String>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Error::Scanner(Problem::in_context(context, context_mark, problem, problem_mark))
    }

    pub fn parser(problem: impl Into<String>, mark: Option<Mark>) -> Self {
        Error::Parser(Problem::at(problem, mark))
    }

    pub fn parser_in(
        context: impl Into<String>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Error::Parser(Problem::in_context(context, context_mark, problem, problem_mark))
    }

    pub fn composer(problem: impl Into<String>, mark: Option<Mark>) -> Self {
        Error::Composer(Problem::at(problem, mark))
    }

    pub fn composer_in(
        context: impl Into<String>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Error::Composer(Problem::in_context(context, context_mark, problem, problem_mark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_without_marks() {
        let err = Error::parser("expected '<document start>', but found '}'", None);
        assert_eq!(err.to_string(), "expected '<document start>', but found '}'\n");
    }

    #[test]
    fn test_limit_message() {
        let err = Error::Limit(7);
        assert_eq!(
            err.to_string(),
            "The incoming YAML document exceeds the limit: 7 code points."
        );
    }
}
