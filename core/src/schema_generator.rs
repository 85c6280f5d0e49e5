#![deny(missing_docs)]

//! # Schema Generator
//!
//! Renders the typed descriptors produced by the parsers into the
//! JSON-Schema-like values of a Swagger 2 document: `definitions` entries,
//! operation objects, parameters and responses.

use crate::endpoints::{EndpointEntry, EndpointParam, EndpointSet, ParamLocation, ResponseEntry};
use crate::models::{ModelBody, ModelEntry};
use crate::options::CompileOptions;
use crate::parser::{ObjectSchema, PropertySpec};
use crate::type_mapping::{TypeDescriptor, TypeKind};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// Prefix of every `$ref` pointer.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Builds the `$ref` pointer for a model name.
pub fn definition_ref(name: &str) -> String {
    format!("{}{}", DEFINITIONS_PREFIX, name)
}

/// Renders a type descriptor, wrapping collections as `array` of the element.
pub fn type_schema(ty: &TypeDescriptor, options: &CompileOptions) -> Value {
    let element = match &ty.kind {
        TypeKind::Primitive(primitive) => {
            let (wire_type, format) = primitive.wire();
            let mut obj = Map::new();
            obj.insert("type".to_string(), json!(wire_type));
            if let Some(format) = format {
                obj.insert("format".to_string(), json!(format));
            }
            Value::Object(obj)
        }
        TypeKind::Reference(name) => json!({ "$ref": definition_ref(name) }),
        TypeKind::Enum(values) => json!({ "enum": values }),
        TypeKind::Object(schema) => object_schema_value(schema, options),
    };

    if ty.is_collection {
        json!({ "type": "array", "items": element })
    } else {
        element
    }
}

/// Renders one property, widening optional properties when `add_nulls` is set.
pub fn property_schema(prop: &PropertySpec, options: &CompileOptions) -> Value {
    let schema = type_schema(&prop.ty, options);
    if prop.is_required || !options.add_nulls {
        return schema;
    }

    let widen_type = matches!(prop.ty.kind, TypeKind::Primitive(_)) && !prop.ty.is_collection;
    make_nullable_schema(schema, widen_type)
}

/// Admits `null` either by widening `type` into a list or through `anyOf`.
fn make_nullable_schema(schema: Value, widen_type: bool) -> Value {
    if widen_type {
        if let Value::Object(mut obj) = schema {
            let types = match obj.remove("type") {
                Some(Value::String(s)) => vec![Value::String(s), json!("null")],
                Some(Value::Array(mut arr)) => {
                    if !arr.iter().any(|t| t == "null") {
                        arr.push(json!("null"));
                    }
                    arr
                }
                _ => vec![json!("null")],
            };
            obj.insert("type".to_string(), Value::Array(types));
            return Value::Object(obj);
        }
        return schema;
    }

    json!({ "anyOf": [schema, { "type": "null" }] })
}

/// Renders an object schema with `properties`, `required` and `additionalProperties`.
pub fn object_schema_value(schema: &ObjectSchema, options: &CompileOptions) -> Value {
    let mut obj = Map::new();
    insert_object_fields(&mut obj, schema, options);
    Value::Object(obj)
}

fn insert_object_fields(
    obj: &mut Map<String, Value>,
    schema: &ObjectSchema,
    options: &CompileOptions,
) {
    obj.insert("type".to_string(), json!("object"));

    if !schema.properties.is_empty() {
        let properties: Map<String, Value> = schema
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), property_schema(prop, options)))
            .collect();
        obj.insert("properties".to_string(), Value::Object(properties));
    }
    if !schema.required.is_empty() {
        obj.insert("required".to_string(), json!(schema.required));
    }
    if !schema.additional_properties {
        obj.insert("additionalProperties".to_string(), json!(false));
    }
}

/// Renders a compiled model as a `definitions` entry.
pub fn model_schema_value(model: &ModelEntry, options: &CompileOptions) -> Value {
    let mut obj = Map::new();
    if let Some(title) = &model.title {
        obj.insert("title".to_string(), json!(title));
    }
    if let Some(description) = &model.description {
        obj.insert("description".to_string(), json!(description));
    }

    match &model.body {
        ModelBody::Object(schema) => insert_object_fields(&mut obj, schema, options),
        ModelBody::Enum(values) => {
            obj.insert("enum".to_string(), json!(values));
        }
    }

    Value::Object(obj)
}

/// Renders every compiled model, keeping declaration order.
pub fn definitions_value(
    models: &IndexMap<String, ModelEntry>,
    options: &CompileOptions,
) -> Value {
    let definitions: Map<String, Value> = models
        .iter()
        .map(|(name, model)| (name.clone(), model_schema_value(model, options)))
        .collect();
    Value::Object(definitions)
}

/// Renders the path map: path template -> method -> operation.
pub fn paths_value(endpoints: &EndpointSet) -> Value {
    let paths: Map<String, Value> = endpoints
        .paths
        .iter()
        .map(|(path, methods)| {
            let operations: Map<String, Value> = methods
                .iter()
                .map(|(method, entry)| (method.clone(), build_operation(entry)))
                .collect();
            (path.clone(), Value::Object(operations))
        })
        .collect();
    Value::Object(paths)
}

/// Renders the registry of tags as `[{name}]`.
pub fn tags_value(tags: &[String]) -> Value {
    Value::Array(tags.iter().map(|tag| json!({ "name": tag })).collect())
}

/// Renders a single operation object.
pub fn build_operation(entry: &EndpointEntry) -> Value {
    let mut obj = Map::new();
    obj.insert("summary".to_string(), json!(entry.summary));
    obj.insert("description".to_string(), json!(entry.description));
    obj.insert("operationId".to_string(), json!(entry.operation_id));

    if !entry.tags.is_empty() {
        obj.insert("tags".to_string(), json!(entry.tags));
    }
    if let Some(scheme) = &entry.security {
        obj.insert("security".to_string(), json!([{ scheme.as_str(): [] }]));
    }
    if !entry.parameters.is_empty() {
        let params: Vec<Value> = entry.parameters.iter().map(build_parameter).collect();
        obj.insert("parameters".to_string(), Value::Array(params));
    }

    let responses: Map<String, Value> = entry
        .responses
        .iter()
        .map(|(status, response)| (status.clone(), build_response(response)))
        .collect();
    obj.insert("responses".to_string(), Value::Object(responses));

    Value::Object(obj)
}

/// Renders a parameter.
///
/// Body parameters nest their schema under `schema`; path and query
/// parameters carry `type`/`format`/`items`/`enum` inline.
pub fn build_parameter(param: &EndpointParam) -> Value {
    let options = CompileOptions::default();
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(param.name));
    obj.insert("in".to_string(), json!(param.location.as_str()));
    obj.insert("required".to_string(), json!(param.required));

    if let Some(desc) = &param.description {
        obj.insert("description".to_string(), json!(desc));
    }

    match param.location {
        ParamLocation::Body => {
            obj.insert("schema".to_string(), type_schema(&param.ty, &options));
        }
        ParamLocation::Path | ParamLocation::Query => {
            if let Value::Object(inline) = inline_parameter_schema(&param.ty, &options) {
                obj.extend(inline);
            }
        }
    }

    Value::Object(obj)
}

/// Non-body parameters need an explicit `type`, including enums.
fn inline_parameter_schema(ty: &TypeDescriptor, options: &CompileOptions) -> Value {
    let mut element = type_schema(&TypeDescriptor::single(ty.kind.clone()), options);
    if let (TypeKind::Enum(values), Value::Object(obj)) = (&ty.kind, &mut element) {
        obj.insert("type".to_string(), json!(enum_wire_type(values)));
    }

    if ty.is_collection {
        json!({ "type": "array", "items": element })
    } else {
        element
    }
}

/// The narrowest wire type covering every enum literal.
fn enum_wire_type(values: &[Value]) -> &'static str {
    if !values.is_empty() && values.iter().all(|v| v.is_i64() || v.is_u64()) {
        "integer"
    } else if !values.is_empty() && values.iter().all(Value::is_number) {
        "number"
    } else if !values.is_empty() && values.iter().all(Value::is_boolean) {
        "boolean"
    } else {
        "string"
    }
}

fn build_response(response: &ResponseEntry) -> Value {
    let mut obj = Map::new();
    obj.insert("description".to_string(), json!(response.description));
    if let Some(schema) = &response.schema {
        obj.insert(
            "schema".to_string(),
            type_schema(schema, &CompileOptions::default()),
        );
    }
    Value::Object(obj)
}
