//! YAML 1.2 processing engine.
//!
//! Turns a stream of Unicode text into a structured document model and
//! back, reproducing the grammar, scalar-style and anchor/alias semantics
//! of the YAML specification.
//!
//! # Load Pipeline
//!
//! Loading operates in four pull-based phases; every stage is advanced
//! only when its consumer asks for the next element, so arbitrarily large
//! documents are processed in one bounded-memory pass:
//!
//! 1. **Reader**: decodes raw input into a code-point stream, enforcing
//!    printable-character and document-size limits.
//!
//! 2. **Scanner**: converts code points into tokens, tracking indentation
//!    levels and simple-key candidates.
//!
//! 3. **Parser**: converts tokens into events through an explicit state
//!    machine mirroring the YAML grammar.
//!
//! 4. **Composer**: assembles events into a node graph, resolving anchors,
//!    aliases and implicit tags.
//!
//! # Dump Pipeline
//!
//! Dumping is symmetric: the **Serializer** walks a node graph and
//! produces the same event vocabulary, and the **Emitter** renders events
//! as text with style, width and indentation decisions.
//!
//! # Example
//!
//! ```
//! use libyamel::{compose, LoadSettings};
//!
//! let settings = LoadSettings::default();
//! let document = compose("answer: 42", &settings).unwrap().unwrap();
//! assert!(document.root_node().tag.is_global());
//! ```

mod composer;
mod emitter;
mod error;
mod events;
mod mark;
mod nodes;
mod parser;
mod reader;
mod resolver;
mod scanner;
mod serializer;
mod settings;
mod style;
mod tokens;

pub use composer::{Composer, DocumentIter};
pub use emitter::Emitter;
pub use error::{Error, Problem, Result};
pub use events::{Event, EventData, EventId, ImplicitPair};
pub use mark::{Mark, Span};
pub use nodes::{tag, Document, Node, NodeArena, NodeComments, NodeData, NodeId, Tag, TAG_PREFIX};
pub use parser::Parser;
pub use reader::Reader;
pub use resolver::{
    CoreScalarResolver, FailsafeScalarResolver, JsonScalarResolver, ScalarResolver, Schema,
};
pub use scanner::Scanner;
pub use serializer::{
    AnchorGenerator, Emitable, EventBuffer, NumberAnchorGenerator, Serializer,
};
pub use settings::{DumpSettings, LoadSettings, SpecVersion, VersionFn};
pub use style::{CommentKind, FlowStyle, ScalarStyle};
pub use tokens::{Directive, Token, TokenData, TokenId};

/// Lazy event stream over a parsed input.
pub struct EventIter {
    parser: Parser,
    done: bool,
}

impl Iterator for EventIter {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.next_event() {
            Ok(event) => {
                if event.id() == EventId::StreamEnd {
                    self.done = true;
                }
                Some(Ok(event))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse the input lazily into events.
pub fn events(input: &str, settings: &LoadSettings) -> Result<EventIter> {
    Ok(EventIter {
        parser: Parser::new(settings, input)?,
        done: false,
    })
}

/// Parse the whole input into events.
pub fn parse(input: &str, settings: &LoadSettings) -> Result<Vec<Event>> {
    events(input, settings)?.collect()
}

/// Compose the single document of the input, or `None` when the input is
/// empty. Fails when the input holds more than one document.
pub fn compose(input: &str, settings: &LoadSettings) -> Result<Option<Document>> {
    Composer::new(settings, input)?.compose_single()
}

/// Compose all documents of the input lazily. A failing document does not
/// invalidate documents already yielded.
pub fn compose_all(input: &str, settings: &LoadSettings) -> Result<DocumentIter> {
    Ok(DocumentIter::new(Composer::new(settings, input)?))
}

/// Render a stream of events as YAML text.
pub fn emit(events: impl IntoIterator<Item = Event>, settings: &DumpSettings) -> Result<String> {
    let mut emitter = Emitter::new(settings)?;
    for event in events {
        emitter.emit(event)?;
    }
    Ok(emitter.into_output())
}

/// Dump one document as YAML text.
pub fn dump(document: &Document, settings: &DumpSettings) -> Result<String> {
    dump_all(std::iter::once(document), settings)
}

/// Dump several documents into one multi-document stream.
pub fn dump_all<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    settings: &DumpSettings,
) -> Result<String> {
    let mut emitter = Emitter::new(settings)?;
    {
        let mut serializer = Serializer::new(settings, &mut emitter);
        serializer.open()?;
        for document in documents {
            serializer.serialize(document)?;
        }
        serializer.close()?;
    }
    Ok(emitter.into_output())
}
