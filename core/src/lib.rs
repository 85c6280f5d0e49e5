#![deny(missing_docs)]

//! # Tinyspec Core
//!
//! Compiles the tinyspec model and endpoint notations into a Swagger 2
//! document (`definitions` + `paths`).
//!
//! Model text flows through the model compiler; endpoint text is first
//! expanded by the CRUDL macro expander and then compiled by the endpoint
//! compiler. Both share the property grammar and object schema builder.

/// Shared error types.
pub mod error;

/// Compile options.
pub mod options;

/// Type token grammar (primitives, references, enums, nested objects).
pub mod type_mapping;

/// Property specifiers and brace-delimited property lists.
pub mod parser;

/// Rendering of typed schemas into JSON values.
pub mod schema_generator;

/// Model declarations and inheritance.
pub mod models;

/// CRUDL macro expansion.
pub mod crudl;

/// Endpoint declarations.
pub mod endpoints;

/// Operation ID and model naming helpers.
pub mod naming;

/// Document assembly and rendering.
pub mod document;

pub use crudl::{expand_crudl, CrudlAction, CrudlMacro};
pub use document::{compile_document, to_json, to_yaml, Document};
pub use endpoints::{
    compile_endpoints, parse_endpoints, EndpointEntry, EndpointParam, EndpointSet, HttpMethod,
    ParamLocation, ParserState, ResponseEntry,
};
pub use error::{AppError, AppResult};
pub use models::{compile_models, parse_models, ModelBody, ModelEntry, ModelSet};
pub use options::CompileOptions;
pub use parser::{
    parse_object_schema, parse_property, parse_props_string, ObjectSchema, ParsedProps,
    PropertySpec,
};
pub use type_mapping::{parse_type, Primitive, TypeDescriptor, TypeKind};
