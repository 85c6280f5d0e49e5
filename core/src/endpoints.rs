#![deny(missing_docs)]

//! # Endpoint Compiler
//!
//! Compiles endpoint declarations into the Swagger `paths` map.
//!
//! ```text
//! Widgets:
//!     // Fetch one widget
//!     @token GET /widgets/:id:i?expand?:b
//!     => {widget: Widget}
//!     => 404 {error: s}
//!     POST /widgets {widget: WidgetNew}
//! ```
//!
//! Lines are processed in order by folding one explicit [`ParserState`] over
//! them: a line ending in `:` opens a tag scope, `//` lines accumulate a
//! description for the next operation or response, and `=>` lines attach
//! responses to the most recent operation (a single response may also trail
//! the operation on the same line). CRUDL macros are expanded first.

use crate::crudl::expand_crudl;
use crate::error::{AppError, AppResult};
use crate::naming::derive_operation_id;
use crate::options::CompileOptions;
use crate::parser::{parse_object_schema, parse_props_string, ParsedProps};
use crate::schema_generator::paths_value;
use crate::type_mapping::{classify, parse_type, Primitive, TypeDescriptor, TypeKind};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Status used when a response line carries no code, and for the synthesized response.
pub const DEFAULT_STATUS: &str = "200";

/// Schema of the response synthesized for every operation.
const DEFAULT_RESPONSE_SCHEMA: &str = "{success: b}";

/// Opens a response, on its own line or trailing an operation.
const RESPONSE_MARKER: &str = "=>";

/// Characters that cannot end a complete query string.
const QUERY_CONTINUATIONS: [char; 4] = [':', ',', ';', '&'];

/// Name of the single body parameter.
const BODY_PARAM: &str = "body";

/// HTTP methods accepted on operation lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Parses an upper-case method token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Upper-case form used in summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Lower-case form used as the path item key.
    pub fn key(self) -> String {
        self.as_str().to_lowercase()
    }
}

/// The source location of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    /// URL Path parameter (e.g. /users/{id})
    Path,
    /// URL Query parameter (e.g. /users?page=1)
    Query,
    /// The request body.
    Body,
}

impl ParamLocation {
    /// Value of the `in` field.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Body => "body",
        }
    }
}

/// A compiled operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointParam {
    /// Parameter name.
    pub name: String,
    /// Where the parameter is read from.
    pub location: ParamLocation,
    /// Whether the parameter must be present.
    pub required: bool,
    /// Optional description (set for degraded model references).
    pub description: Option<String>,
    /// Parameter type.
    pub ty: TypeDescriptor,
}

/// A compiled response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEntry {
    /// Response description.
    pub description: String,
    /// Response body schema, if any.
    pub schema: Option<TypeDescriptor>,
}

/// A compiled operation.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointEntry {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template with `{param}` placeholders and group suffix.
    pub path: String,
    /// Short summary.
    pub summary: String,
    /// Full description.
    pub description: String,
    /// Unique operation ID.
    pub operation_id: String,
    /// Tags assigned from the enclosing tag scope.
    pub tags: Vec<String>,
    /// Security scheme required by the operation.
    pub security: Option<String>,
    /// Path, query and body parameters in declaration order.
    pub parameters: Vec<EndpointParam>,
    /// Responses keyed by status code.
    pub responses: IndexMap<String, ResponseEntry>,
    /// False while only the synthesized default response is present.
    pub has_explicit_response: bool,
}

/// Compiled endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointSet {
    /// Path template -> lower-case method -> operation.
    pub paths: IndexMap<String, IndexMap<String, EndpointEntry>>,
    /// Every tag used by an operation, first-seen order.
    pub tags: Vec<String>,
}

impl EndpointSet {
    /// Looks up one operation.
    pub fn get(&self, path: &str, method: HttpMethod) -> Option<&EndpointEntry> {
        self.paths.get(path)?.get(&method.key())
    }

    /// Number of compiled operations.
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(IndexMap::len).sum()
    }
}

/// State carried from line to line.
#[derive(Debug, Default)]
pub struct ParserState {
    endpoints: EndpointSet,
    current_tag: Option<String>,
    pending_description: Vec<String>,
    open_operation: Option<(String, String)>,
}

fn operation_re() -> &'static Regex {
    static OPERATION_RE: OnceLock<Regex> = OnceLock::new();
    OPERATION_RE.get_or_init(|| {
        Regex::new(
            r"^(?:@(\w+)\s+)?([A-Z]+)\s+(/[\w/:.\-]*?)(#\w+)?(\?\S+)?(?:\s+(\S.*))?$",
        )
        .expect("Invalid regex")
    })
}

fn response_re() -> &'static Regex {
    static RESPONSE_RE: OnceLock<Regex> = OnceLock::new();
    RESPONSE_RE
        .get_or_init(|| Regex::new(r"^=>\s*(?:(\d{3})(?:\s+|$))?(.*)$").expect("Invalid regex"))
}

impl ParserState {
    /// Consumes one source line.
    pub fn apply(mut self, line: &str) -> AppResult<Self> {
        let line = line.trim();

        if line.is_empty() {
            return Ok(self);
        }
        if let Some(comment) = line.strip_prefix("//") {
            self.pending_description.push(comment.trim().to_string());
            return Ok(self);
        }
        if line.starts_with(RESPONSE_MARKER) {
            self.apply_response(line)?;
            return Ok(self);
        }

        let (operation, inline_response) = match line.find(RESPONSE_MARKER) {
            Some(idx) => (line[..idx].trim_end(), Some(&line[idx..])),
            None => (line, None),
        };
        if operation_re().is_match(operation) {
            self.apply_operation(operation)?;
            if let Some(response) = inline_response {
                self.apply_response(response)?;
            }
            return Ok(self);
        }
        if let Some(tag) = line.strip_suffix(':') {
            self.current_tag = Some(tag.trim().to_string());
            return Ok(self);
        }

        Err(AppError::invalid_definition(line))
    }

    /// Returns the compiled endpoints.
    pub fn finish(self) -> EndpointSet {
        self.endpoints
    }

    fn take_description(&mut self) -> Option<Vec<String>> {
        if self.pending_description.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending_description))
        }
    }

    fn apply_operation(&mut self, line: &str) -> AppResult<()> {
        let caps = operation_re()
            .captures(line)
            .ok_or_else(|| AppError::invalid_definition(line))?;

        let method = HttpMethod::parse(&caps[2]).ok_or_else(|| {
            AppError::Grammar(format!("Unknown HTTP method `{}` in `{}`", &caps[2], line))
        })?;
        let group = caps.get(4).map_or("", |m| m.as_str());

        let mut parameters = Vec::new();
        let template = compile_path(&caps[3], line, &mut parameters)?;
        let path = format!("{}{}", template, group);

        if let Some(query) = caps.get(5) {
            parameters.extend(compile_query(&query.as_str()[1..], line)?);
        }
        if let Some(body) = caps.get(6) {
            parameters.push(compile_body(body.as_str().trim(), line)?);
        }

        let default_summary = format!("{} {}", method.as_str(), path);
        let (summary, description) = match self.take_description() {
            Some(lines) => (lines[0].clone(), lines.join("\n")),
            None => (default_summary.clone(), default_summary),
        };

        let tags = match &self.current_tag {
            Some(tag) => {
                if !self.endpoints.tags.contains(tag) {
                    self.endpoints.tags.push(tag.clone());
                }
                vec![tag.clone()]
            }
            None => Vec::new(),
        };

        let operation_id = self.operation_id(method, &path);
        let mut responses = IndexMap::new();
        responses.insert(
            DEFAULT_STATUS.to_string(),
            ResponseEntry {
                description: String::new(),
                schema: Some(TypeDescriptor::single(TypeKind::Object(parse_object_schema(
                    DEFAULT_RESPONSE_SCHEMA,
                )?))),
            },
        );

        debug!(
            method = method.as_str(),
            path = %path,
            operation_id = %operation_id,
            "compiled operation"
        );

        let entry = EndpointEntry {
            method,
            path: path.clone(),
            summary,
            description,
            operation_id,
            tags,
            security: caps.get(1).map(|m| m.as_str().to_string()),
            parameters,
            responses,
            has_explicit_response: false,
        };

        self.endpoints
            .paths
            .entry(path.clone())
            .or_default()
            .insert(method.key(), entry);
        self.open_operation = Some((path, method.key()));
        Ok(())
    }

    /// Reuses the ID of a redefined operation, otherwise derives a fresh one
    /// and suffixes it until no other operation carries it.
    fn operation_id(&self, method: HttpMethod, path: &str) -> String {
        if let Some(existing) = self.endpoints.get(path, method) {
            return existing.operation_id.clone();
        }

        let base = derive_operation_id(method.as_str(), path);
        let taken = |candidate: &str| {
            self.endpoints
                .paths
                .values()
                .flat_map(IndexMap::values)
                .any(|entry| entry.operation_id == candidate)
        };

        let mut candidate = base.clone();
        let mut n = 2;
        while taken(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        candidate
    }

    fn apply_response(&mut self, line: &str) -> AppResult<()> {
        let caps = response_re()
            .captures(line)
            .ok_or_else(|| AppError::invalid_definition(line))?;
        let status = caps
            .get(1)
            .map_or(DEFAULT_STATUS, |m| m.as_str())
            .to_string();
        let schema_text = caps[2].trim();

        let schema = if schema_text.is_empty() {
            None
        } else {
            if classify(schema_text).is_none() {
                return Err(AppError::invalid_definition(line));
            }
            Some(parse_type(schema_text)?)
        };

        let description = self
            .take_description()
            .map(|lines| lines.join("\n"))
            .unwrap_or_default();

        let (path, method) = self.open_operation.clone().ok_or_else(|| {
            AppError::Grammar(format!("Response `{}` has no preceding operation", line))
        })?;
        let entry = self
            .endpoints
            .paths
            .get_mut(&path)
            .and_then(|methods| methods.get_mut(&method))
            .ok_or_else(|| AppError::invalid_definition(line))?;

        if !entry.has_explicit_response {
            entry.responses.clear();
            entry.has_explicit_response = true;
        }
        entry
            .responses
            .insert(status, ResponseEntry { description, schema });
        Ok(())
    }
}

/// Replaces `:name[:type]` segments with `{name}` and records path parameters.
fn compile_path(raw: &str, line: &str, parameters: &mut Vec<EndpointParam>) -> AppResult<String> {
    let mut segments = Vec::new();
    for segment in raw.split('/') {
        let Some(spec) = segment.strip_prefix(':') else {
            segments.push(segment.to_string());
            continue;
        };

        let (name, ty) = match spec.split_once(':') {
            Some((name, ty)) => {
                if classify(ty).is_none() {
                    return Err(AppError::invalid_definition(line));
                }
                (name, parse_type(ty)?)
            }
            None => (spec, TypeDescriptor::default_string()),
        };
        if name.is_empty() {
            return Err(AppError::invalid_definition(line));
        }

        parameters.push(inline_param(name, ParamLocation::Path, true, ty, line)?);
        segments.push(format!("{{{}}}", name));
    }
    Ok(segments.join("/"))
}

/// Compiles `a:i&b?:s` into query parameters.
///
/// The query ends at the first space. A query cut off mid-specifier (a
/// trailing delimiter or an unclosed bracket) is an error rather than a
/// query followed by a body.
fn compile_query(query: &str, line: &str) -> AppResult<Vec<EndpointParam>> {
    if query.ends_with(&QUERY_CONTINUATIONS[..]) || !brackets_balanced(query) {
        return Err(AppError::Grammar(format!(
            "Query string must not contain spaces in `{}`",
            line
        )));
    }

    let options = CompileOptions::default().with_no_schema(true);
    let props = match parse_props_string(&format!("{{{}}}", query), &options)? {
        ParsedProps::List(props) => props,
        ParsedProps::Schema(_) | ParsedProps::Single(_) => {
            return Err(AppError::invalid_definition(line))
        }
    };

    props
        .into_iter()
        .map(|prop| {
            if prop.name.is_empty() {
                return Err(AppError::Grammar(format!(
                    "Query parameter without a name in `{}`",
                    line
                )));
            }
            inline_param(&prop.name, ParamLocation::Query, prop.is_required, prop.ty, line)
        })
        .collect()
}

fn brackets_balanced(text: &str) -> bool {
    let mut depth: i32 = 0;
    for c in text.chars() {
        match c {
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

/// Compiles the trailing body schema into the single `body` parameter.
fn compile_body(token: &str, line: &str) -> AppResult<EndpointParam> {
    if classify(token).is_none() {
        return Err(AppError::invalid_definition(line));
    }
    Ok(EndpointParam {
        name: BODY_PARAM.to_string(),
        location: ParamLocation::Body,
        required: true,
        description: None,
        ty: parse_type(token)?,
    })
}

/// Builds a path or query parameter.
///
/// References cannot be expressed there, so they degrade to strings whose
/// description names the model. Nested objects are rejected.
fn inline_param(
    name: &str,
    location: ParamLocation,
    required: bool,
    ty: TypeDescriptor,
    line: &str,
) -> AppResult<EndpointParam> {
    let (ty, description) = match ty.kind {
        TypeKind::Reference(model) => (
            TypeDescriptor {
                kind: TypeKind::Primitive(Primitive::String),
                is_collection: ty.is_collection,
            },
            Some(format!("Reference to `{}`", model)),
        ),
        TypeKind::Object(_) => {
            return Err(AppError::Grammar(format!(
                "Parameter `{}` in `{}` cannot be an object",
                name, line
            )))
        }
        kind => (
            TypeDescriptor {
                kind,
                is_collection: ty.is_collection,
            },
            None,
        ),
    };

    Ok(EndpointParam {
        name: name.to_string(),
        location,
        required,
        description,
        ty,
    })
}

/// Parses endpoint text (CRUDL macros included) into typed operations.
pub fn parse_endpoints(text: &str) -> AppResult<EndpointSet> {
    let expanded = expand_crudl(text)?;
    let state = expanded
        .lines()
        .try_fold(ParserState::default(), |state, line| state.apply(line))?;
    let endpoints = state.finish();

    info!(
        paths = endpoints.paths.len(),
        operations = endpoints.operation_count(),
        tags = endpoints.tags.len(),
        "compiled endpoints"
    );
    Ok(endpoints)
}

/// Compiles endpoint text into the `paths` map.
pub fn compile_endpoints(text: &str) -> AppResult<Value> {
    let endpoints = parse_endpoints(text)?;
    Ok(paths_value(&endpoints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn only(text: &str, path: &str, method: HttpMethod) -> EndpointEntry {
        parse_endpoints(text)
            .unwrap()
            .get(path, method)
            .cloned()
            .unwrap_or_else(|| panic!("missing {} {}", method.as_str(), path))
    }

    #[test]
    fn test_path_params_with_inline_types() {
        let op = only(
            "GET /users/:id:i/posts/:slug",
            "/users/{id}/posts/{slug}",
            HttpMethod::Get,
        );
        assert_eq!(op.parameters.len(), 2);
        assert_eq!(op.parameters[0].name, "id");
        assert_eq!(
            op.parameters[0].ty.kind,
            TypeKind::Primitive(Primitive::Integer)
        );
        assert!(op.parameters[0].required);
        assert_eq!(op.parameters[1].ty, TypeDescriptor::default_string());
        assert_eq!(op.summary, "GET /users/{id}/posts/{slug}");
        assert_eq!(op.operation_id, "get_users_id_posts_slug");
    }

    #[test]
    fn test_query_params() {
        let op = only("GET /search?q&page?:i&owner:User", "/search", HttpMethod::Get);
        let names: Vec<_> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["q", "page", "owner"]);
        assert!(op.parameters[0].required);
        assert!(!op.parameters[1].required);
        assert_eq!(
            op.parameters[2].description.as_deref(),
            Some("Reference to `User`")
        );
        assert_eq!(op.parameters[2].ty, TypeDescriptor::default_string());
    }

    #[test]
    fn test_object_query_param_is_rejected() {
        let err = parse_endpoints("GET /search?filter:{a: s}").unwrap_err();
        assert!(matches!(err, AppError::Grammar(_)));
    }

    #[test]
    fn test_query_with_spaces_is_rejected() {
        for text in [
            "GET /search?q: i",
            "GET /search?a:i, b:s",
            "GET /search?kind:(a | b)",
        ] {
            let err = parse_endpoints(text).unwrap_err();
            assert!(matches!(err, AppError::Grammar(_)), "{}", text);
        }

        let op = only("GET /search?q:i {filter: s}", "/search", HttpMethod::Get);
        let locations: Vec<_> = op.parameters.iter().map(|p| p.location).collect();
        assert_eq!(locations, vec![ParamLocation::Query, ParamLocation::Body]);
        assert_eq!(
            op.parameters[0].ty.kind,
            TypeKind::Primitive(Primitive::Integer)
        );
    }

    #[test]
    fn test_body_param() {
        let op = only("POST /widgets {widget: WidgetNew}", "/widgets", HttpMethod::Post);
        assert_eq!(op.parameters.len(), 1);
        let body = &op.parameters[0];
        assert_eq!(body.name, "body");
        assert_eq!(body.location, ParamLocation::Body);
        assert!(body.required);
        assert!(matches!(body.ty.kind, TypeKind::Object(_)));
    }

    #[test]
    fn test_default_response_dropped_on_first_explicit() {
        let text = "GET /a\nPOST /a\n=> 201 {id: i}\n// Not found\n=> 404";
        let set = parse_endpoints(text).unwrap();

        let get = set.get("/a", HttpMethod::Get).unwrap();
        assert_eq!(get.responses.keys().collect::<Vec<_>>(), vec!["200"]);
        assert!(!get.has_explicit_response);

        let post = set.get("/a", HttpMethod::Post).unwrap();
        assert_eq!(post.responses.keys().collect::<Vec<_>>(), vec!["201", "404"]);
        assert_eq!(post.responses["404"].description, "Not found");
        assert_eq!(post.responses["404"].schema, None);
    }

    #[test]
    fn test_tag_scope_and_registry() {
        let text = "Users:\nGET /users\nGET /users/:id\n\
                    Admin:\nDELETE /users/:id\nUsers:\nPUT /users/:id";
        let set = parse_endpoints(text).unwrap();
        assert_eq!(set.tags, vec!["Users", "Admin"]);
        assert_eq!(
            set.get("/users/{id}", HttpMethod::Delete).unwrap().tags,
            vec!["Admin"]
        );
        assert_eq!(
            set.get("/users/{id}", HttpMethod::Put).unwrap().tags,
            vec!["Users"]
        );
    }

    #[test]
    fn test_description_lines_feed_summary() {
        let op = only("// Lists users\n// Paged.\n@token GET /users", "/users", HttpMethod::Get);
        assert_eq!(op.summary, "Lists users");
        assert_eq!(op.description, "Lists users\nPaged.");
        assert_eq!(op.security.as_deref(), Some("token"));
    }

    #[test]
    fn test_group_suffix() {
        let set = parse_endpoints("GET /users#admin\nGET /users").unwrap();
        let admin = set.get("/users#admin", HttpMethod::Get).unwrap();
        assert_eq!(admin.operation_id, "get_users_admin");
        assert_eq!(
            set.get("/users", HttpMethod::Get).unwrap().operation_id,
            "get_users"
        );
    }

    #[test]
    fn test_operation_ids_never_collide() {
        let set = parse_endpoints("GET /users/:id\nGET /users_id\nGET /users/:id").unwrap();
        assert_eq!(
            set.get("/users/{id}", HttpMethod::Get).unwrap().operation_id,
            "get_users_id"
        );
        assert_eq!(
            set.get("/users_id", HttpMethod::Get).unwrap().operation_id,
            "get_users_id_2"
        );
        assert_eq!(set.operation_count(), 2);
    }

    #[test]
    fn test_inline_response() {
        let op = only(
            "GET /widgets/:id => {widget: Widget}\n=> 404",
            "/widgets/{id}",
            HttpMethod::Get,
        );
        assert_eq!(op.responses.keys().collect::<Vec<_>>(), vec!["200", "404"]);
        assert_eq!(
            op.responses["200"].schema.as_ref().map(|ty| ty.is_collection),
            Some(false)
        );
        assert!(op.parameters.is_empty());
    }

    #[test]
    fn test_invalid_lines_fail() {
        let err = parse_endpoints("GET /ok\nInvalid definition").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Grammar Error: Invalid definition: `Invalid definition`"
        );
        assert!(parse_endpoints("FETCH /users").is_err());
        assert!(parse_endpoints("=> {a: s}").is_err());
        assert!(parse_endpoints("POST /users nope").is_err());
    }

    #[test]
    fn test_crudl_lines_compile() {
        let set = parse_endpoints("$CRUDL /widgets").unwrap();
        assert_eq!(set.operation_count(), 5);
        let list = set.get("/widgets", HttpMethod::Get).unwrap();
        assert_eq!(list.summary, "List widgets");
        assert_eq!(
            paths_value(&set)["/widgets/{id}"]["delete"]["responses"]["200"]["schema"],
            json!({
                "type": "object",
                "properties": { "success": { "type": "boolean" } },
                "required": ["success"]
            })
        );
    }
}
