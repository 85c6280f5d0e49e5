#![deny(missing_docs)]

//! # Model Compiler
//!
//! Compiles model declarations into `definitions`:
//!
//! ```text
//! // A registered user
//! User {id: i, name: s, email?: s}
//! Admin < User {-email, permissions: s[]}
//! Role (admin|editor|viewer)
//! ```
//!
//! Declarations are compiled strictly in source order. A parent must be
//! declared (and be an object model) before any child inheriting from it.

use crate::error::{AppError, AppResult};
use crate::options::CompileOptions;
use crate::parser::{parse_object_schema, ObjectSchema};
use crate::schema_generator::definitions_value;
use crate::type_mapping::parse_enum_literals;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Prefix of a property name that removes an inherited property.
pub const REMOVAL_MARKER: char = '-';

/// Line prefix of a description comment.
const DESCRIPTION_PREFIX: &str = "//";

/// Start of an ignored comment.
const IGNORED_COMMENT: char = '#';

/// Body used when a declaration has none.
const DEFAULT_DEFINITION: &str = "{}";

/// The schema body of a model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelBody {
    /// An object schema.
    Object(ObjectSchema),
    /// An enum of literals.
    Enum(Vec<Value>),
}

/// A compiled model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    /// Capitalized model name.
    pub name: String,
    /// The compiled body, already merged with its parent.
    pub body: ModelBody,
    /// The parent the model inherits from.
    pub parent: Option<String>,
    /// First preceding description comment line.
    pub title: Option<String>,
    /// All preceding description comment lines.
    pub description: Option<String>,
}

/// Compiled models keyed by name, in declaration order.
pub type ModelSet = IndexMap<String, ModelEntry>;

/// Parses model text into typed entries.
pub fn parse_models(text: &str) -> AppResult<ModelSet> {
    static DECL_RE: OnceLock<Regex> = OnceLock::new();
    let decl_re = DECL_RE.get_or_init(|| {
        Regex::new(r"^([A-Z]\w*)(?:\s*<\s*([A-Z]\w*))?\s*(.*)$").expect("Invalid regex")
    });

    let source = collapse_bodies(&strip_ignored_comments(text))?;
    let mut models = ModelSet::new();
    let mut pending_description: Vec<String> = Vec::new();

    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix(DESCRIPTION_PREFIX) {
            pending_description.push(comment.trim().to_string());
            continue;
        }

        let caps = decl_re
            .captures(line)
            .ok_or_else(|| AppError::invalid_definition(line))?;
        let name = caps[1].to_string();
        let parent = caps.get(2).map(|m| m.as_str().to_string());
        let definition = match caps[3].trim() {
            "" => DEFAULT_DEFINITION,
            body => body,
        };

        if models.contains_key(&name) {
            return Err(AppError::Grammar(format!(
                "Model `{}` is declared more than once",
                name
            )));
        }

        let mut body = parse_body(definition, line)?;
        if let Some(parent_name) = &parent {
            body = match body {
                ModelBody::Object(child) => {
                    let parent_schema = object_parent(&models, &name, parent_name)?;
                    ModelBody::Object(inherit(child, parent_schema))
                }
                ModelBody::Enum(_) => return Err(AppError::invalid_definition(line)),
            };
        }

        let (title, description) = take_description(&mut pending_description);
        debug!(model = %name, parent = ?parent, "compiled model");

        models.insert(
            name.clone(),
            ModelEntry {
                name,
                body,
                parent,
                title,
                description,
            },
        );
    }

    info!(count = models.len(), "compiled models");
    Ok(models)
}

/// Compiles model text into the `definitions` map.
///
/// # Examples
/// ```
/// use tinyspec_core::{compile_models, CompileOptions};
/// use serde_json::json;
///
/// let defs = compile_models("Widget {name: s, count?: i}", &CompileOptions::default()).unwrap();
/// assert_eq!(defs["Widget"]["required"], json!(["name"]));
/// ```
pub fn compile_models(text: &str, options: &CompileOptions) -> AppResult<Value> {
    let models = parse_models(text)?;
    Ok(definitions_value(&models, options))
}

fn parse_body(definition: &str, line: &str) -> AppResult<ModelBody> {
    if (definition.starts_with('{') || definition.starts_with("!{")) && definition.ends_with('}') {
        return parse_object_schema(definition).map(ModelBody::Object);
    }
    if definition.starts_with('(') && definition.ends_with(')') {
        return Ok(ModelBody::Enum(parse_enum_literals(definition)));
    }
    Err(AppError::invalid_definition(line))
}

fn object_parent<'a>(
    models: &'a ModelSet,
    child: &str,
    parent: &str,
) -> AppResult<&'a ObjectSchema> {
    match models.get(parent).map(|entry| &entry.body) {
        Some(ModelBody::Object(schema)) => Ok(schema),
        _ => Err(AppError::Reference {
            child: child.to_string(),
            parent: parent.to_string(),
        }),
    }
}

fn take_description(lines: &mut Vec<String>) -> (Option<String>, Option<String>) {
    if lines.is_empty() {
        return (None, None);
    }
    let title = lines.first().cloned();
    let description = lines.join("\n\n");
    lines.clear();
    (title, Some(description))
}

/// Merges a child object with its parent.
///
/// Child properties replace same-named parent properties, `-name` removes an
/// inherited property, and `required` lists the parent's surviving names
/// (parent order) before the child's own (child order).
pub fn inherit(child: ObjectSchema, parent: &ObjectSchema) -> ObjectSchema {
    let removed: HashSet<&str> = child
        .properties
        .keys()
        .filter_map(|name| name.strip_prefix(REMOVAL_MARKER))
        .collect();

    let inherited: Vec<&String> = parent
        .properties
        .keys()
        .filter(|name| !removed.contains(name.as_str()) && !child.properties.contains_key(*name))
        .collect();

    let mut properties = IndexMap::new();
    for name in &inherited {
        if let Some(prop) = parent.properties.get(*name) {
            properties.insert((*name).clone(), prop.clone());
        }
    }
    for (name, prop) in &child.properties {
        if !name.starts_with(REMOVAL_MARKER) {
            properties.insert(name.clone(), prop.clone());
        }
    }

    let mut required: Vec<String> = parent
        .required
        .iter()
        .filter(|name| inherited.contains(name))
        .cloned()
        .collect();
    required.extend(
        child
            .required
            .iter()
            .filter(|name| !name.starts_with(REMOVAL_MARKER))
            .cloned(),
    );

    ObjectSchema {
        properties,
        required,
        additional_properties: child.additional_properties,
    }
}

/// Drops `#` comments up to the end of their line.
fn strip_ignored_comments(text: &str) -> String {
    text.lines()
        .map(|line| match line.find(IGNORED_COMMENT) {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Joins multi-line `{...}` / `(...)` bodies into their declaration line.
///
/// Inside a body, whitespace runs collapse to one space and `//` comments
/// are dropped. Outside a body, `//` comments are copied through verbatim
/// and their brackets are not tracked. A body left open at the end of the
/// text is an error.
fn collapse_bodies(text: &str) -> AppResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut open: Vec<char> = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if open.is_empty() {
            match c {
                '/' if chars.peek() == Some(&'/') => {
                    out.push(c);
                    while let Some(next) = chars.next_if(|next| *next != '\n') {
                        out.push(next);
                    }
                }
                '{' | '(' => {
                    open.push(c);
                    out.push(c);
                }
                c => out.push(c),
            }
            continue;
        }

        match c {
            '{' | '(' => {
                open.push(c);
                out.push(c);
            }
            '}' | ')' => {
                open.pop();
                trim_trailing_space(&mut out);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|next| *next != '\n') {
                    chars.next();
                }
            }
            c if c.is_whitespace() => {
                let last = out.chars().last();
                if !matches!(last, Some(' ') | Some('{') | Some('(')) {
                    out.push(' ');
                }
            }
            c => out.push(c),
        }
    }

    match open.first() {
        Some(opener) => Err(AppError::Grammar(format!(
            "Unclosed `{}` in model definitions",
            opener
        ))),
        None => Ok(out),
    }
}

fn trim_trailing_space(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_mapping::{Primitive, TypeKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(models: &ModelSet, name: &str) -> ObjectSchema {
        match &models[name].body {
            ModelBody::Object(schema) => schema.clone(),
            other => panic!("Expected object for {}, got {:?}", name, other),
        }
    }

    fn keys(schema: &ObjectSchema) -> Vec<&str> {
        schema.properties.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_inheritance_overrides_by_replacement() {
        let models = parse_models("A {x: i, y: s}\nB < A {y: b, z: s}").unwrap();
        let b = object(&models, "B");
        assert_eq!(keys(&b), vec!["x", "y", "z"]);
        assert_eq!(
            b.properties["y"].ty.kind,
            TypeKind::Primitive(Primitive::Boolean)
        );
        assert_eq!(b.required, vec!["x", "y", "z"]);
        assert_eq!(models["B"].parent.as_deref(), Some("A"));
    }

    #[test]
    fn test_removal_marker() {
        let models = parse_models("A {x: i?, y: s}\nB < A {-y}").unwrap();
        let b = object(&models, "B");
        assert_eq!(keys(&b), vec!["x"]);
        assert!(b.required.is_empty());
    }

    #[test]
    fn test_required_order_parent_then_child() {
        let models = parse_models("A {b: s, a: s, c?: s}\nB < A {z: s, -a, y: s}").unwrap();
        let b = object(&models, "B");
        assert_eq!(b.required, vec!["b", "z", "y"]);
    }

    #[test]
    fn test_forward_parent_is_rejected() {
        let err = parse_models("B < A {y: s}\nA {x: i}").unwrap_err();
        assert!(matches!(
            err,
            AppError::Reference { ref child, ref parent } if child == "B" && parent == "A"
        ));
    }

    #[test]
    fn test_enum_parent_is_rejected() {
        let err = parse_models("Role (a|b)\nAdmin < Role {x: s}").unwrap_err();
        assert!(matches!(err, AppError::Reference { .. }));
    }

    #[test]
    fn test_undeclared_parent_is_rejected() {
        let err = parse_models("Admin < Ghost {x: s}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Reference Error: Parent model object not found for `Admin < Ghost`"
        );
    }

    #[test]
    fn test_comments_become_title_and_description() {
        let text = "# ignored\n// Person\n// Somebody we know\nUser {name: s} # trailing\nPlain {}";
        let models = parse_models(text).unwrap();
        assert_eq!(models["User"].title.as_deref(), Some("Person"));
        assert_eq!(
            models["User"].description.as_deref(),
            Some("Person\n\nSomebody we know")
        );
        assert_eq!(models["Plain"].title, None);
    }

    #[test]
    fn test_multiline_bodies() {
        let text = "User {\n  id: i,\n  // the address\n  address: {\n    city: s\n  }\n}\n\
                    Role (\n  a |\n  b\n)";
        let models = parse_models(text).unwrap();
        let user = object(&models, "User");
        assert_eq!(keys(&user), vec!["id", "address"]);
        assert_eq!(models["Role"].body, ModelBody::Enum(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn test_brackets_in_description_comments_are_plain_text() {
        let models = parse_models("// Widget (v2\nWidget {name: s}\nGadget {id: i}").unwrap();
        assert_eq!(models.keys().collect::<Vec<_>>(), vec!["Widget", "Gadget"]);
        assert_eq!(models["Widget"].title.as_deref(), Some("Widget (v2"));
        assert_eq!(keys(&object(&models, "Gadget")), vec!["id"]);
    }

    #[test]
    fn test_unclosed_body_is_rejected() {
        let err = parse_models("Widget {\n  name: s\nGadget {id: i}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Grammar Error: Unclosed `{` in model definitions"
        );
        assert!(matches!(parse_models("Role (a | b"), Err(AppError::Grammar(_))));
    }

    #[test]
    fn test_empty_body_and_invalid_line() {
        let models = parse_models("Empty").unwrap();
        assert!(object(&models, "Empty").is_empty());

        let err = parse_models("Invalid definition").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Grammar Error: Invalid definition: `Invalid definition`"
        );

        let err = parse_models("lower {x: s}").unwrap_err();
        assert!(matches!(err, AppError::Grammar(_)));
    }

    #[test]
    fn test_duplicate_model_is_rejected() {
        assert!(parse_models("A {x: s}\nA {y: s}").is_err());
    }

    #[test]
    fn test_compile_models_renders_definitions() {
        let defs =
            compile_models("Widget {name: s, count?: i}", &CompileOptions::default()).unwrap();
        assert_eq!(
            defs,
            json!({
                "Widget": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "count": { "type": "integer" }
                    },
                    "required": ["name"]
                }
            })
        );
    }
}
