#![deny(missing_docs)]

//! # Parser Module
//!
//! Parses property specifiers (`name?: type`) and brace-delimited property
//! lists (`!{id: i, tags: s[], owner: {name: s}}`) into typed structures.

use crate::error::{AppError, AppResult};
use crate::options::CompileOptions;
use crate::type_mapping::{classify, parse_type, TokenClass, TypeDescriptor};
use indexmap::IndexMap;

/// Characters separating sibling properties.
const DELIMITERS: [char; 3] = [',', ';', '&'];

/// Trailing marker making a property optional.
const OPTIONAL_MARKER: char = '?';

/// Represents one parsed `name: type` specifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    /// The property name. Empty for the bare-type form (`User`, `(a|b)`).
    pub name: String,
    /// False when either segment carried a trailing `?`.
    pub is_required: bool,
    /// The parsed type.
    pub ty: TypeDescriptor,
}

/// An assembled object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    /// Properties in declaration order.
    pub properties: IndexMap<String, PropertySpec>,
    /// Required names in declaration order.
    pub required: Vec<String>,
    /// False when the list was opened with `!{`.
    pub additional_properties: bool,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self {
            properties: IndexMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }
}

impl ObjectSchema {
    /// Assembles a schema from properties in declaration order.
    pub fn from_properties(props: Vec<PropertySpec>) -> Self {
        let mut schema = Self::default();
        for prop in props {
            if prop.is_required {
                schema.required.push(prop.name.clone());
            }
            schema.properties.insert(prop.name.clone(), prop);
        }
        schema
    }

    /// Returns true when the schema declares no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Result of [`parse_props_string`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedProps {
    /// A brace list assembled into an object schema.
    Schema(ObjectSchema),
    /// A brace list returned flat (`no_schema`).
    List(Vec<PropertySpec>),
    /// A single specifier outside braces.
    Single(PropertySpec),
}

/// Entry point of the object schema builder.
///
/// Brace text (`{...}` or `!{...}`) becomes an object schema, or the flat
/// property list when `options.no_schema` is set. Anything else is parsed
/// as a single property specifier.
///
/// # Examples
/// ```
/// use tinyspec_core::parser::{parse_props_string, ParsedProps};
/// use tinyspec_core::CompileOptions;
///
/// let opts = CompileOptions::default().with_no_schema(true);
/// match parse_props_string("{page?: i, q: s}", &opts).unwrap() {
///     ParsedProps::List(props) => {
///         assert_eq!(props[0].name, "page");
///         assert!(!props[0].is_required);
///     }
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn parse_props_string(text: &str, options: &CompileOptions) -> AppResult<ParsedProps> {
    let text = text.trim();
    if !is_object_token(text) {
        return parse_property(text).map(ParsedProps::Single);
    }

    if options.no_schema {
        let (_, interior) = object_interior(text);
        let props = split_props(interior)
            .iter()
            .map(|spec| parse_property(spec))
            .collect::<AppResult<Vec<_>>>()?;
        return Ok(ParsedProps::List(props));
    }

    parse_object_schema(text).map(ParsedProps::Schema)
}

/// Parses `{...}` / `!{...}` into an object schema.
pub fn parse_object_schema(text: &str) -> AppResult<ObjectSchema> {
    let (additional_properties, interior) = object_interior(text);
    let props = split_props(interior)
        .iter()
        .map(|spec| parse_property(spec))
        .collect::<AppResult<Vec<_>>>()?;

    let mut schema = ObjectSchema::from_properties(props);
    schema.additional_properties = additional_properties;
    Ok(schema)
}

fn is_object_token(text: &str) -> bool {
    text.starts_with('{') || text.starts_with("!{")
}

/// Strips the suppression marker and the outer braces.
fn object_interior(text: &str) -> (bool, &str) {
    let text = text.trim();
    let (additional, rest) = match text.strip_prefix('!') {
        Some(rest) => (false, rest.trim_start()),
        None => (true, text),
    };
    let rest = rest.strip_prefix('{').unwrap_or(rest);
    let rest = rest.strip_suffix('}').unwrap_or(rest);
    (additional, rest.trim())
}

/// Splits a brace interior into sibling specifiers.
///
/// Delimiters only split at the top level; anything inside nested `{}` or
/// `()` stays with its owning specifier. Empty pieces are dropped.
pub fn split_props(interior: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut open: Vec<char> = Vec::new();
    let mut current = String::new();

    for c in interior.chars() {
        match c {
            '{' | '(' => open.push(c),
            '}' | ')' => {
                open.pop();
            }
            _ => {}
        }

        if open.is_empty() && DELIMITERS.contains(&c) {
            push_piece(&mut pieces, &current);
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_piece(&mut pieces, &current);

    pieces
}

fn push_piece(pieces: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        pieces.push(piece.to_string());
    }
}

/// Parses `name[?]: type[?]` or a bare `type` / `name`.
///
/// - A bare reference or enum token is type-only and gets an empty name.
/// - Any other bare token is a name with the default `string` type.
/// - A present but unknown type is an error naming the whole specifier.
pub fn parse_property(text: &str) -> AppResult<PropertySpec> {
    let text = text.trim();
    let (name_part, type_part) = match text.split_once(':') {
        Some((name, ty)) if !ty.trim().is_empty() => (name.trim(), Some(ty.trim())),
        Some((name, _)) => (name.trim(), None),
        None => (text, None),
    };

    let (name_part, name_optional) = strip_optional(name_part);
    let (type_part, type_optional) = match type_part {
        Some(ty) => {
            let (ty, optional) = strip_optional(ty);
            (Some(ty), optional)
        }
        None => (None, false),
    };
    let is_required = !(name_optional || type_optional);

    let (name, ty) = match type_part {
        Some(ty) => {
            if classify(ty).is_none() {
                return Err(AppError::invalid_property(text));
            }
            (name_part.to_string(), parse_type(ty)?)
        }
        None => match classify(name_part) {
            Some(TokenClass::Reference) | Some(TokenClass::Enum) => {
                (String::new(), parse_type(name_part)?)
            }
            _ => (name_part.to_string(), TypeDescriptor::default_string()),
        },
    };

    Ok(PropertySpec {
        name,
        is_required,
        ty,
    })
}

fn strip_optional(segment: &str) -> (&str, bool) {
    match segment.strip_suffix(OPTIONAL_MARKER) {
        Some(stripped) => (stripped.trim_end(), true),
        None => (segment, false),
    }
}
