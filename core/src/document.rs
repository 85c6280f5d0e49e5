#![deny(missing_docs)]

//! # Document Assembly
//!
//! Combines a static header document with compiled endpoints and models
//! into one Swagger document, and renders it as YAML or JSON.

use crate::endpoints::{parse_endpoints, EndpointSet};
use crate::error::{AppError, AppResult};
use crate::models::{parse_models, ModelSet};
use crate::options::CompileOptions;
use crate::schema_generator::{definitions_value, paths_value, tags_value};
use serde_json::{Map, Value};
use tracing::info;

/// A compiled document before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Top-level keys from the header (`swagger`, `info`, `host`, ...).
    pub header: Map<String, Value>,
    /// Compiled models.
    pub models: ModelSet,
    /// Compiled endpoints.
    pub endpoints: EndpointSet,
    /// Options used when rendering models.
    pub options: CompileOptions,
}

impl Document {
    /// Compiles both notations against a header.
    ///
    /// # Arguments
    ///
    /// * `header_yaml` - YAML mapping with the static top-level keys.
    /// * `models_text` - Model notation (several files may be concatenated).
    /// * `endpoints_text` - Endpoint notation, CRUDL macros included.
    /// * `options` - Compile options.
    pub fn compile(
        header_yaml: &str,
        models_text: &str,
        endpoints_text: &str,
        options: &CompileOptions,
    ) -> AppResult<Self> {
        let header = parse_header(header_yaml)?;
        let endpoints = parse_endpoints(endpoints_text)?;
        let models = parse_models(models_text)?;

        info!(
            models = models.len(),
            paths = endpoints.paths.len(),
            "compiled document"
        );

        Ok(Self {
            header,
            models,
            endpoints,
            options: *options,
        })
    }

    /// Renders the document as a JSON value.
    ///
    /// Header keys come first; `tags`, `paths` and `definitions` replace any
    /// same-named header keys.
    pub fn to_value(&self) -> Value {
        let mut root = self.header.clone();
        if !self.endpoints.tags.is_empty() {
            root.insert("tags".to_string(), tags_value(&self.endpoints.tags));
        }
        root.insert("paths".to_string(), paths_value(&self.endpoints));
        root.insert(
            "definitions".to_string(),
            definitions_value(&self.models, &self.options),
        );
        Value::Object(root)
    }

    /// Renders the document as YAML.
    pub fn to_yaml(&self) -> AppResult<String> {
        to_yaml(&self.to_value())
    }

    /// Renders the document as pretty-printed JSON.
    pub fn to_json(&self) -> AppResult<String> {
        to_json(&self.to_value())
    }
}

/// Compiles a whole document into a JSON value.
pub fn compile_document(
    header_yaml: &str,
    models_text: &str,
    endpoints_text: &str,
    options: &CompileOptions,
) -> AppResult<Value> {
    Document::compile(header_yaml, models_text, endpoints_text, options).map(|doc| doc.to_value())
}

/// Serializes a compiled value as YAML.
pub fn to_yaml(value: &Value) -> AppResult<String> {
    serde_yaml::to_string(value)
        .map_err(|e| AppError::General(format!("Failed to render YAML: {}", e)))
}

/// Serializes a compiled value as pretty-printed JSON.
pub fn to_json(value: &Value) -> AppResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::General(format!("Failed to render JSON: {}", e)))
}

fn parse_header(header_yaml: &str) -> AppResult<Map<String, Value>> {
    let value: Value = serde_yaml::from_str(header_yaml)
        .map_err(|e| AppError::General(format!("Failed to parse header YAML: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(AppError::General(
            "Header document must be a YAML mapping".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const HEADER: &str = "swagger: '2.0'\ninfo:\n  title: Demo\n  version: 1.0.0\n";

    #[test]
    fn test_header_keys_come_first() {
        let value = compile_document(HEADER, "", "", &CompileOptions::default()).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["swagger", "info", "paths", "definitions"]);
        assert_eq!(value["swagger"], json!("2.0"));
    }

    #[test]
    fn test_tags_registry_is_emitted() {
        let value = compile_document(
            HEADER,
            "",
            "Users:\nGET /users\nGET /users/:id",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(value["tags"], json!([{ "name": "Users" }]));
    }

    #[test]
    fn test_invalid_header() {
        let err = compile_document("- a\n- b", "", "", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::General(_)));
    }

    #[test]
    fn test_errors_abort_compilation() {
        let err = compile_document(HEADER, "Bad < Ghost {}", "GET /ok", &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Reference { .. }));
    }

    #[test]
    fn test_yaml_and_json_rendering() {
        let doc = Document::compile(
            HEADER,
            "Widget {name: s}",
            "GET /widgets",
            &CompileOptions::default(),
        )
        .unwrap();

        let yaml = doc.to_yaml().unwrap();
        assert!(yaml.contains("Widget:"));
        let reparsed: Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reparsed, doc.to_value());

        let json_text = doc.to_json().unwrap();
        let reparsed: Value = serde_json::from_str(&json_text).unwrap();
        assert_eq!(reparsed, doc.to_value());
    }
}
