#![deny(missing_docs)]

//! # CRUDL Macro Expander
//!
//! Rewrites bulk-endpoint shorthand into ordinary endpoint declarations
//! before endpoint compilation:
//!
//! ```text
//! @token $CRUDL /widgets
//! $LR /catalog/items#public items:Product
//! ```
//!
//! Each requested action becomes one declaration (description comment,
//! operation line, response line). Actions are always emitted in the order
//! `L C R U D` regardless of how they were written.
//!
//! Without a `key:Model` override, create and update take per-action
//! sub-models (`<Model>New`, `<Model>Update`); with one, every action uses
//! the given model.

use crate::error::{AppError, AppResult};
use crate::naming::{model_name, singularize};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Path segment placeholder used for single-resource actions.
const ID_PARAM: &str = ":id";

/// One of the five CRUDL actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CrudlAction {
    /// `L`: `GET /resources`
    List,
    /// `C`: `POST /resources`
    Create,
    /// `R`: `GET /resources/:id`
    Retrieve,
    /// `U`: `PATCH /resources/:id`
    Update,
    /// `D`: `DELETE /resources/:id`
    Delete,
}

impl CrudlAction {
    /// Canonical emission order.
    pub const CANONICAL: [CrudlAction; 5] = [
        CrudlAction::List,
        CrudlAction::Create,
        CrudlAction::Retrieve,
        CrudlAction::Update,
        CrudlAction::Delete,
    ];

    /// Parses an action letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'L' => Some(CrudlAction::List),
            'C' => Some(CrudlAction::Create),
            'R' => Some(CrudlAction::Retrieve),
            'U' => Some(CrudlAction::Update),
            'D' => Some(CrudlAction::Delete),
            _ => None,
        }
    }

    fn method(self) -> &'static str {
        match self {
            CrudlAction::List | CrudlAction::Retrieve => "GET",
            CrudlAction::Create => "POST",
            CrudlAction::Update => "PATCH",
            CrudlAction::Delete => "DELETE",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            CrudlAction::List => "List",
            CrudlAction::Create => "Create",
            CrudlAction::Retrieve => "Retrieve",
            CrudlAction::Update => "Update",
            CrudlAction::Delete => "Delete",
        }
    }

    fn targets_single(self) -> bool {
        !matches!(self, CrudlAction::List | CrudlAction::Create)
    }
}

/// How payload models are named for each action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelNaming {
    /// Derived name; create and update use `<base>New` / `<base>Update`.
    PerAction(String),
    /// Explicit override used by every action.
    Fixed(String),
}

impl ModelNaming {
    /// The model returned in responses.
    pub fn base(&self) -> &str {
        match self {
            ModelNaming::PerAction(name) | ModelNaming::Fixed(name) => name,
        }
    }

    /// The model accepted as the request payload of an action.
    pub fn payload(&self, action: CrudlAction) -> String {
        match (self, action) {
            (ModelNaming::PerAction(base), CrudlAction::Create) => format!("{}New", base),
            (ModelNaming::PerAction(base), CrudlAction::Update) => format!("{}Update", base),
            _ => self.base().to_string(),
        }
    }
}

/// A parsed macro line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudlMacro {
    /// Security scheme from a leading `@scheme`.
    pub auth: Option<String>,
    /// Requested actions, deduplicated, in canonical order.
    pub actions: Vec<CrudlAction>,
    /// Collection path without trailing slash.
    pub path: String,
    /// Group suffix including its `#`.
    pub group: Option<String>,
    /// Response key for collections.
    pub plural_key: String,
    /// Response and payload key for single resources.
    pub singular_key: String,
    /// Model naming.
    pub model: ModelNaming,
}

fn macro_prefix_re() -> &'static Regex {
    static PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    PREFIX_RE.get_or_init(|| Regex::new(r"^(?:@\w+\s+)?\$").expect("Invalid regex"))
}

fn macro_re() -> &'static Regex {
    static MACRO_RE: OnceLock<Regex> = OnceLock::new();
    MACRO_RE.get_or_init(|| {
        Regex::new(
            r"^(?:@(\w+)\s+)?\$([CRUDL]+)\s+(/[\w/:.\-]*?)(#\w+)?(?:\s+(\w+):([A-Z]\w*))?$",
        )
        .expect("Invalid regex")
    })
}

/// Returns true when the line is meant as a macro (whether or not it is well formed).
pub fn is_macro_line(line: &str) -> bool {
    macro_prefix_re().is_match(line.trim())
}

/// Parses a macro line.
pub fn parse_macro_line(line: &str) -> AppResult<CrudlMacro> {
    let trimmed = line.trim();
    let caps = macro_re()
        .captures(trimmed)
        .ok_or_else(|| AppError::Macro(trimmed.to_string()))?;

    let mut actions: Vec<CrudlAction> = caps[2]
        .chars()
        .filter_map(CrudlAction::from_letter)
        .collect();
    actions.sort();
    actions.dedup();

    let path = match caps[3].trim_end_matches('/') {
        "" => "/".to_string(),
        path => path.to_string(),
    };

    let (plural_key, model) = match (caps.get(5), caps.get(6)) {
        (Some(key), Some(model)) => (
            key.as_str().to_string(),
            Some(model.as_str().to_string()),
        ),
        _ => {
            let last = path
                .rsplit('/')
                .find(|segment| !segment.is_empty() && !segment.starts_with(':'))
                .ok_or_else(|| AppError::Macro(trimmed.to_string()))?;
            (last.to_string(), None)
        }
    };
    let singular_key = singularize(&plural_key);
    let model = match model {
        Some(name) => ModelNaming::Fixed(name),
        None => ModelNaming::PerAction(model_name(&singular_key)),
    };

    Ok(CrudlMacro {
        auth: caps.get(1).map(|m| m.as_str().to_string()),
        actions,
        path,
        group: caps.get(4).map(|m| m.as_str().to_string()),
        plural_key,
        singular_key,
        model,
    })
}

impl CrudlMacro {
    /// Emits the endpoint declarations, one block per action.
    pub fn expand(&self) -> Vec<String> {
        let prefix = self
            .auth
            .as_ref()
            .map(|scheme| format!("@{} ", scheme))
            .unwrap_or_default();
        let group = self.group.as_deref().unwrap_or("");
        let base = self.model.base();

        let mut lines = Vec::new();
        for &action in &self.actions {
            let path = if action.targets_single() {
                format!("{}/{}", self.path.trim_end_matches('/'), ID_PARAM)
            } else {
                self.path.clone()
            };
            let noun = if action == CrudlAction::List {
                &self.plural_key
            } else {
                &self.singular_key
            };
            lines.push(format!("// {} {}", action.verb(), noun));

            let body = match action {
                CrudlAction::Create | CrudlAction::Update => format!(
                    " {{{}: {}}}",
                    self.singular_key,
                    self.model.payload(action)
                ),
                _ => String::new(),
            };
            lines.push(format!(
                "{}{} {}{}{}",
                prefix,
                action.method(),
                path,
                group,
                body
            ));

            match action {
                CrudlAction::List => {
                    lines.push(format!("=> {{{}: {}[]}}", self.plural_key, base));
                }
                CrudlAction::Create | CrudlAction::Retrieve | CrudlAction::Update => {
                    lines.push(format!("=> {{{}: {}}}", self.singular_key, base));
                }
                CrudlAction::Delete => {}
            }
        }
        lines
    }
}

/// Expands every macro line in endpoint text, leaving other lines untouched.
pub fn expand_crudl(text: &str) -> AppResult<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        if is_macro_line(line) {
            let crudl = parse_macro_line(line)?;
            debug!(path = %crudl.path, actions = ?crudl.actions, "expanded CRUDL macro");
            out.extend(crudl.expand());
        } else {
            out.push(line.to_string());
        }
    }
    Ok(out.join("\n"))
}
