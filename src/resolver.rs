//! Implicit tag resolution.
//!
//! A schema decides which plain scalars auto-resolve to which standard
//! tags. Quoted and block scalars never get a numeric/bool/null implicit
//! tag; they resolve to `str` unconditionally.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::nodes::{tag, Tag};

/// Maps a scalar's textual value and context to a tag.
pub trait ScalarResolver: Send + Sync {
    /// Resolve the tag for `value`. `implicit` is true for plain scalars;
    /// non-plain scalars must resolve to `str`.
    fn resolve(&self, value: &str, implicit: bool) -> Tag;
}

/// The failsafe schema: everything is a string.
pub struct FailsafeScalarResolver;

impl ScalarResolver for FailsafeScalarResolver {
    fn resolve(&self, _value: &str, _implicit: bool) -> Tag {
        tag::STR.clone()
    }
}

static JSON_BOOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:true|false)$").unwrap());
static JSON_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(?:0|[1-9][0-9]*)$").unwrap());
static JSON_FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:0|[1-9][0-9]*)(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?$").unwrap());

/// The JSON schema: only the exact JSON spellings resolve.
pub struct JsonScalarResolver;

impl ScalarResolver for JsonScalarResolver {
    fn resolve(&self, value: &str, implicit: bool) -> Tag {
        if !implicit {
            return tag::STR.clone();
        }
        if value.is_empty() || value == "null" {
            tag::NULL.clone()
        } else if JSON_BOOL.is_match(value) {
            tag::BOOL.clone()
        } else if JSON_INT.is_match(value) {
            tag::INT.clone()
        } else if JSON_FLOAT.is_match(value) {
            tag::FLOAT.clone()
        } else {
            tag::STR.clone()
        }
    }
}

static CORE_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:~|null|Null|NULL)$").unwrap());
static CORE_BOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:true|True|TRUE|false|False|FALSE)$").unwrap());
static CORE_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$").unwrap());
static CORE_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
    )
    .unwrap()
});

/// The YAML 1.2 core schema: the JSON spellings plus the relaxed forms
/// (`~`, capitalized booleans, octal/hex integers, `.inf`/`.nan`).
pub struct CoreScalarResolver;

impl ScalarResolver for CoreScalarResolver {
    fn resolve(&self, value: &str, implicit: bool) -> Tag {
        if !implicit {
            return tag::STR.clone();
        }
        if value.is_empty() || CORE_NULL.is_match(value) {
            tag::NULL.clone()
        } else if CORE_BOOL.is_match(value) {
            tag::BOOL.clone()
        } else if CORE_INT.is_match(value) {
            tag::INT.clone()
        } else if CORE_FLOAT.is_match(value) {
            tag::FLOAT.clone()
        } else {
            tag::STR.clone()
        }
    }
}

static FAILSAFE: FailsafeScalarResolver = FailsafeScalarResolver;
static JSON: JsonScalarResolver = JsonScalarResolver;
static CORE: CoreScalarResolver = CoreScalarResolver;

/// A named bundle of implicit-resolution rules, injected at construction
/// of the composer and the emitter.
#[derive(Clone)]
pub enum Schema {
    Failsafe,
    Json,
    Core,
    Custom(Arc<dyn ScalarResolver>),
}

impl Schema {
    pub fn resolver(&self) -> &dyn ScalarResolver {
        match self {
            Schema::Failsafe => &FAILSAFE,
            Schema::Json => &JSON,
            Schema::Core => &CORE,
            Schema::Custom(resolver) => resolver.as_ref(),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Failsafe => f.write_str("Schema::Failsafe"),
            Schema::Json => f.write_str("Schema::Json"),
            Schema::Core => f.write_str("Schema::Core"),
            Schema::Custom(_) => f.write_str("Schema::Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(value: &str) -> Tag {
        JsonScalarResolver.resolve(value, true)
    }

    fn core(value: &str) -> Tag {
        CoreScalarResolver.resolve(value, true)
    }

    #[test]
    fn test_json_spellings() {
        assert_eq!(json("null"), *tag::NULL);
        assert_eq!(json(""), *tag::NULL);
        assert_eq!(json("true"), *tag::BOOL);
        assert_eq!(json("false"), *tag::BOOL);
        assert_eq!(json("17"), *tag::INT);
        assert_eq!(json("-0"), *tag::INT);
        assert_eq!(json("3.14"), *tag::FLOAT);
        assert_eq!(json("1e3"), *tag::FLOAT);
    }

    #[test]
    fn test_json_rejects_relaxed_forms() {
        assert_eq!(json("True"), *tag::STR);
        assert_eq!(json("~"), *tag::STR);
        assert_eq!(json("007"), *tag::STR);
        assert_eq!(json("0x1f"), *tag::STR);
        assert_eq!(json(".inf"), *tag::STR);
        assert_eq!(json("+1"), *tag::STR);
    }

    #[test]
    fn test_core_relaxed_forms() {
        assert_eq!(core("~"), *tag::NULL);
        assert_eq!(core("NULL"), *tag::NULL);
        assert_eq!(core("True"), *tag::BOOL);
        assert_eq!(core("0o17"), *tag::INT);
        assert_eq!(core("0x1F"), *tag::INT);
        assert_eq!(core("+12"), *tag::INT);
        assert_eq!(core(".inf"), *tag::FLOAT);
        assert_eq!(core("-.Inf"), *tag::FLOAT);
        assert_eq!(core(".NaN"), *tag::FLOAT);
        assert_eq!(core("1."), *tag::FLOAT);
    }

    #[test]
    fn test_core_strings() {
        assert_eq!(core("yes"), *tag::STR);
        assert_eq!(core("0b101"), *tag::STR);
        assert_eq!(core("1.2.3"), *tag::STR);
    }

    #[test]
    fn test_non_plain_never_resolves() {
        assert_eq!(JsonScalarResolver.resolve("17", false), *tag::STR);
        assert_eq!(CoreScalarResolver.resolve("true", false), *tag::STR);
    }

    #[test]
    fn test_failsafe() {
        assert_eq!(FailsafeScalarResolver.resolve("17", true), *tag::STR);
    }
}
