//! Configuration for the load and dump pipelines.
//!
//! Plain data structs with chainable `with_*` setters. A fresh
//! `LoadSettings::default()` matches the reference engine's defaults: JSON
//! schema, marks on, comments off, duplicate and recursive keys rejected,
//! 50-alias ceiling, 3 MiB code-point budget per document.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::resolver::Schema;
use crate::style::{FlowStyle, ScalarStyle};

/// A `%YAML` directive version, e.g. `(1, 2)`.
pub type SpecVersion = (u32, u32);

/// Hook deciding what to do with a `%YAML` version directive. The default
/// accepts any 1.x and treats it as 1.2.
pub type VersionFn = Arc<dyn Fn(SpecVersion) -> Result<SpecVersion> + Send + Sync>;

fn default_version_fn() -> VersionFn {
    Arc::new(|version: SpecVersion| {
        if version.0 != 1 {
            return Err(Error::Resolver(crate::error::Problem::new(format!(
                "found incompatible YAML document (version {}.{} is not supported)",
                version.0, version.1
            ))));
        }
        Ok(version)
    })
}

/// Settings consumed by the load pipeline.
#[derive(Clone)]
pub struct LoadSettings {
    /// Label for the input, used in error messages.
    pub label: String,
    /// Active schema for implicit tag resolution.
    pub schema: Schema,
    /// Keep marks for error messages. Costs memory; on by default.
    pub use_marks: bool,
    /// Allow non-unique mapping keys (last one wins). Off by default.
    pub allow_duplicate_keys: bool,
    /// Allow self-referential nodes as mapping keys. Off by default.
    pub allow_recursive_keys: bool,
    /// Produce comment tokens/events and attach comments to nodes.
    pub parse_comments: bool,
    /// Ceiling on aliases that target collection nodes, per document.
    pub max_aliases_for_collections: usize,
    /// Per-document code-point budget.
    pub code_point_limit: usize,
    /// `%YAML` version negotiation hook.
    pub version_fn: VersionFn,
}

impl Default for LoadSettings {
    fn default() -> Self {
        LoadSettings {
            label: "reader".to_string(),
            schema: Schema::Json,
            use_marks: true,
            allow_duplicate_keys: false,
            allow_recursive_keys: false,
            parse_comments: false,
            max_aliases_for_collections: 50,
            code_point_limit: 3 * 1024 * 1024,
            version_fn: default_version_fn(),
        }
    }
}

impl LoadSettings {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_use_marks(mut self, use_marks: bool) -> Self {
        self.use_marks = use_marks;
        self
    }

    pub fn with_allow_duplicate_keys(mut self, allow: bool) -> Self {
        self.allow_duplicate_keys = allow;
        self
    }

    pub fn with_allow_recursive_keys(mut self, allow: bool) -> Self {
        self.allow_recursive_keys = allow;
        self
    }

    pub fn with_parse_comments(mut self, parse_comments: bool) -> Self {
        self.parse_comments = parse_comments;
        self
    }

    pub fn with_max_aliases_for_collections(mut self, max: usize) -> Self {
        self.max_aliases_for_collections = max;
        self
    }

    pub fn with_code_point_limit(mut self, limit: usize) -> Self {
        self.code_point_limit = limit;
        self
    }

    pub fn with_version_fn(mut self, version_fn: VersionFn) -> Self {
        self.version_fn = version_fn;
        self
    }
}

impl std::fmt::Debug for LoadSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSettings")
            .field("label", &self.label)
            .field("schema", &self.schema)
            .field("use_marks", &self.use_marks)
            .field("allow_duplicate_keys", &self.allow_duplicate_keys)
            .field("allow_recursive_keys", &self.allow_recursive_keys)
            .field("parse_comments", &self.parse_comments)
            .field("max_aliases_for_collections", &self.max_aliases_for_collections)
            .field("code_point_limit", &self.code_point_limit)
            .finish()
    }
}

/// Settings consumed by the dump pipeline.
#[derive(Debug, Clone)]
pub struct DumpSettings {
    /// Write `---` before each document.
    pub explicit_start: bool,
    /// Write `...` after each document.
    pub explicit_end: bool,
    /// Collection style when the node does not pin one.
    pub default_flow_style: FlowStyle,
    /// Scalar style when the node does not pin one.
    pub default_scalar_style: ScalarStyle,
    /// Canonical form: explicit tags, flow collections, quoted scalars.
    pub canonical: bool,
    /// Put each flow entry on its own line.
    pub multi_line_flow: bool,
    /// Indentation step, valid range 1..=10.
    pub indent: usize,
    /// Extra indent for `-` indicators, valid range 0..indent.
    pub indicator_indent: usize,
    /// Count the `- ` indicator toward a sequence entry's indentation.
    pub indent_with_indicator: bool,
    /// Preferred line width for folding; non-positive disables folding.
    pub width: usize,
    /// Line break to use: `\n`, `\r` or `\r\n`.
    pub best_line_break: String,
    /// Split long scalars across lines at all.
    pub split_lines: bool,
    /// Keys longer than this are written with an explicit `? `.
    pub max_simple_key_length: usize,
    /// Emit full content at every reference instead of anchors/aliases.
    /// Incompatible with cyclic graphs.
    pub dereference_aliases: bool,
    /// Schema used to decide when plain scalars must be quoted.
    pub schema: Schema,
    /// Re-emit comments attached to nodes.
    pub dump_comments: bool,
    /// Emit a `%YAML` directive with this version.
    pub yaml_directive: Option<SpecVersion>,
    /// `%TAG` handle/prefix pairs to declare.
    pub tag_directives: Vec<(String, String)>,
}

impl Default for DumpSettings {
    fn default() -> Self {
        DumpSettings {
            explicit_start: false,
            explicit_end: false,
            default_flow_style: FlowStyle::Auto,
            default_scalar_style: ScalarStyle::Plain,
            canonical: false,
            multi_line_flow: false,
            indent: 2,
            indicator_indent: 0,
            indent_with_indicator: false,
            width: 80,
            best_line_break: "\n".to_string(),
            split_lines: true,
            max_simple_key_length: 128,
            dereference_aliases: false,
            schema: Schema::Json,
            dump_comments: false,
            yaml_directive: None,
            tag_directives: Vec::new(),
        }
    }
}

impl DumpSettings {
    pub fn with_explicit_start(mut self, explicit: bool) -> Self {
        self.explicit_start = explicit;
        self
    }

    pub fn with_explicit_end(mut self, explicit: bool) -> Self {
        self.explicit_end = explicit;
        self
    }

    pub fn with_default_flow_style(mut self, style: FlowStyle) -> Self {
        self.default_flow_style = style;
        self
    }

    pub fn with_default_scalar_style(mut self, style: ScalarStyle) -> Self {
        self.default_scalar_style = style;
        self
    }

    pub fn with_canonical(mut self, canonical: bool) -> Self {
        self.canonical = canonical;
        self
    }

    pub fn with_multi_line_flow(mut self, multi_line_flow: bool) -> Self {
        self.multi_line_flow = multi_line_flow;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_indicator_indent(mut self, indicator_indent: usize) -> Self {
        self.indicator_indent = indicator_indent;
        self
    }

    pub fn with_indent_with_indicator(mut self, flag: bool) -> Self {
        self.indent_with_indicator = flag;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_best_line_break(mut self, line_break: impl Into<String>) -> Self {
        self.best_line_break = line_break.into();
        self
    }

    pub fn with_split_lines(mut self, split_lines: bool) -> Self {
        self.split_lines = split_lines;
        self
    }

    pub fn with_max_simple_key_length(mut self, length: usize) -> Self {
        self.max_simple_key_length = length;
        self
    }

    pub fn with_dereference_aliases(mut self, dereference: bool) -> Self {
        self.dereference_aliases = dereference;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_dump_comments(mut self, dump_comments: bool) -> Self {
        self.dump_comments = dump_comments;
        self
    }

    pub fn with_yaml_directive(mut self, version: SpecVersion) -> Self {
        self.yaml_directive = Some(version);
        self
    }

    pub fn with_tag_directive(mut self, handle: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.tag_directives.push((handle.into(), prefix.into()));
        self
    }

    /// Check the ranges the emitter depends on. Called by the emitter at
    /// construction.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.indent < 1 || self.indent > 10 {
            return Err(Error::Emitter(format!(
                "indent must be in range 1..10, but was {}",
                self.indent
            )));
        }
        if self.indicator_indent >= self.indent {
            return Err(Error::Emitter(format!(
                "indicator indent must be smaller than indent, but was {}",
                self.indicator_indent
            )));
        }
        match self.best_line_break.as_str() {
            "\n" | "\r" | "\r\n" => {}
            other => {
                return Err(Error::Emitter(format!(
                    "line break must be one of \\n, \\r or \\r\\n, but was {:?}",
                    other
                )));
            }
        }
        Ok(())
    }
}
