#![deny(missing_docs)]

//! # Type Mapping
//!
//! Converts tinyspec type tokens (`i`, `datetime`, `User[]`, `(a|b)`, `{x: s}`)
//! into typed descriptors.
//! Handles primitives and their aliases, model references, enums,
//! nested anonymous objects and collections.

use crate::error::{AppError, AppResult};
use crate::parser::{parse_object_schema, ObjectSchema};
use serde_json::Value;
use std::fmt::Display;

/// Suffix turning any type into an array of that type.
pub const COLLECTION_MARKER: &str = "[]";

/// The fixed primitive symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `integer` / `i`
    Integer,
    /// `number` / `n`
    Number,
    /// `float` / `f`, emitted as `number`.
    Float,
    /// `string` / `s`
    String,
    /// `boolean` / `b`
    Boolean,
    /// `date`, emitted as `string` + `date`.
    Date,
    /// `datetime` / `d`, emitted as `string` + `date-time`.
    DateTime,
    /// `text` / `t`, emitted as `string`.
    Text,
    /// `json` / `j`, emitted as `string`.
    Json,
    /// `object` / `o`
    Object,
    /// `hash` / `h`, emitted as `object`.
    Hash,
}

const PRIMITIVES: [Primitive; 11] = [
    Primitive::Integer,
    Primitive::Number,
    Primitive::Float,
    Primitive::String,
    Primitive::Boolean,
    Primitive::Date,
    Primitive::DateTime,
    Primitive::Text,
    Primitive::Json,
    Primitive::Object,
    Primitive::Hash,
];

impl Primitive {
    /// Canonical long-form name.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Integer => "integer",
            Primitive::Number => "number",
            Primitive::Float => "float",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Date => "date",
            Primitive::DateTime => "datetime",
            Primitive::Text => "text",
            Primitive::Json => "json",
            Primitive::Object => "object",
            Primitive::Hash => "hash",
        }
    }

    /// Short alias, if the primitive has one.
    pub fn alias(self) -> Option<&'static str> {
        match self {
            Primitive::Integer => Some("i"),
            Primitive::Number => Some("n"),
            Primitive::Float => Some("f"),
            Primitive::String => Some("s"),
            Primitive::Boolean => Some("b"),
            Primitive::DateTime => Some("d"),
            Primitive::Text => Some("t"),
            Primitive::Json => Some("j"),
            Primitive::Object => Some("o"),
            Primitive::Hash => Some("h"),
            Primitive::Date => None,
        }
    }

    /// Resolves an alias or a canonical name.
    pub fn lookup(token: &str) -> Option<Self> {
        PRIMITIVES
            .iter()
            .copied()
            .find(|p| p.alias() == Some(token) || p.name() == token)
    }

    /// The `(type, format)` pair written into the schema.
    pub fn wire(self) -> (&'static str, Option<&'static str>) {
        match self {
            Primitive::Integer => ("integer", None),
            Primitive::Number | Primitive::Float => ("number", None),
            Primitive::String | Primitive::Text | Primitive::Json => ("string", None),
            Primitive::Boolean => ("boolean", None),
            Primitive::Date => ("string", Some("date")),
            Primitive::DateTime => ("string", Some("date-time")),
            Primitive::Object | Primitive::Hash => ("object", None),
        }
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a type token denotes, before collection wrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// One of the fixed primitives.
    Primitive(Primitive),
    /// A capitalized model name, compiled to `$ref`.
    Reference(String),
    /// Ordered enum literals; JSON literals keep their JSON type.
    Enum(Vec<Value>),
    /// An anonymous nested object.
    Object(ObjectSchema),
}

/// A fully parsed type token.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// The element type.
    pub kind: TypeKind,
    /// Whether the token carried the `[]` collection marker.
    pub is_collection: bool,
}

impl TypeDescriptor {
    /// A non-collection descriptor.
    pub fn single(kind: TypeKind) -> Self {
        Self {
            kind,
            is_collection: false,
        }
    }

    /// The descriptor for a bare property name with no type.
    pub fn default_string() -> Self {
        Self::single(TypeKind::Primitive(Primitive::String))
    }

    /// Referenced model name, if the element type is a reference.
    pub fn reference_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Reference(name) => Some(name),
            _ => None,
        }
    }
}

/// Lexical class of a type token, decided without recursing into nested objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenClass {
    Reference,
    Primitive(Primitive),
    Enum,
    Object,
}

/// Returns true for `^[A-Z]\w+$`.
pub fn is_reference_token(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    let rest = chars.as_str();
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits off a trailing collection marker.
pub(crate) fn strip_collection(token: &str) -> (&str, bool) {
    let token = token.trim();
    match token.strip_suffix(COLLECTION_MARKER) {
        Some(inner) => (inner.trim_end(), true),
        None => (token, false),
    }
}

/// Classifies a type token following the grammar precedence.
pub(crate) fn classify(token: &str) -> Option<TokenClass> {
    let (base, _) = strip_collection(token);
    if is_reference_token(base) {
        Some(TokenClass::Reference)
    } else if let Some(primitive) = Primitive::lookup(base) {
        Some(TokenClass::Primitive(primitive))
    } else if base.starts_with('(') {
        Some(TokenClass::Enum)
    } else if base.starts_with('{') || base.starts_with("!{") {
        Some(TokenClass::Object)
    } else {
        None
    }
}

/// Parses a type token into a descriptor.
///
/// # Examples
/// ```
/// use tinyspec_core::type_mapping::{parse_type, Primitive, TypeKind};
///
/// let ty = parse_type("d[]").unwrap();
/// assert!(ty.is_collection);
/// assert_eq!(ty.kind, TypeKind::Primitive(Primitive::DateTime));
/// ```
pub fn parse_type(token: &str) -> AppResult<TypeDescriptor> {
    let class = classify(token).ok_or_else(|| AppError::invalid_property(token))?;
    let (base, is_collection) = strip_collection(token);

    let kind = match class {
        TokenClass::Reference => TypeKind::Reference(base.to_string()),
        TokenClass::Primitive(primitive) => TypeKind::Primitive(primitive),
        TokenClass::Enum => TypeKind::Enum(parse_enum_literals(base)),
        TokenClass::Object => TypeKind::Object(parse_object_schema(base)?),
    };

    Ok(TypeDescriptor {
        kind,
        is_collection,
    })
}

/// Splits `(a|b|c)` into its literals.
pub fn parse_enum_literals(token: &str) -> Vec<Value> {
    token
        .trim()
        .trim_matches(|c| c == '(' || c == ')')
        .split('|')
        .map(parse_enum_value)
        .collect()
}

/// A literal is JSON when it parses as JSON, otherwise its trimmed text.
fn parse_enum_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aliases_match_canonical_wire_pairs() {
        for primitive in PRIMITIVES {
            let long = parse_type(primitive.name()).unwrap();
            assert_eq!(long.kind, TypeKind::Primitive(primitive));
            if let Some(alias) = primitive.alias() {
                let short = parse_type(alias).unwrap();
                assert_eq!(short, long, "alias {}", alias);
            }
        }
    }

    #[test]
    fn test_wire_pairs() {
        assert_eq!(Primitive::Float.wire(), ("number", None));
        assert_eq!(Primitive::DateTime.wire(), ("string", Some("date-time")));
        assert_eq!(Primitive::Date.wire(), ("string", Some("date")));
        assert_eq!(Primitive::Json.wire(), ("string", None));
        assert_eq!(Primitive::Hash.wire(), ("object", None));
    }

    #[test]
    fn test_reference_predicate() {
        assert!(is_reference_token("User"));
        assert!(is_reference_token("User_2"));
        assert!(!is_reference_token("U"));
        assert!(!is_reference_token("user"));
        assert!(!is_reference_token("User-x"));
    }

    #[test]
    fn test_collection_marker() {
        let ty = parse_type("User[]").unwrap();
        assert!(ty.is_collection);
        assert_eq!(ty.reference_name(), Some("User"));
        assert_eq!(parse_type("User").unwrap().reference_name(), Some("User"));
    }

    #[test]
    fn test_enum_literals_keep_json_types() {
        let ty = parse_type(r#"(1|2|"three"|four | true)"#).unwrap();
        assert_eq!(
            ty.kind,
            TypeKind::Enum(vec![
                json!(1),
                json!(2),
                json!("three"),
                json!("four"),
                json!(true)
            ])
        );
    }

    #[test]
    fn test_nested_object_token() {
        let ty = parse_type("!{a: i}[]").unwrap();
        assert!(ty.is_collection);
        match ty.kind {
            TypeKind::Object(schema) => {
                assert!(!schema.additional_properties);
                assert_eq!(schema.required, vec!["a".to_string()]);
            }
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let err = parse_type("nope").unwrap_err();
        assert!(matches!(err, AppError::Grammar(_)));
        assert!(err.to_string().contains("`nope`"));
    }
}
