#![deny(missing_docs)]

//! # Compile Options
//!
//! Flags recognised by the compilation passes.

use serde::Deserialize;

/// Options shared by the model compiler and the object schema builder.
///
/// Deserializable so callers can keep it next to their header document.
///
/// # Examples
/// ```
/// use tinyspec_core::CompileOptions;
///
/// let opts: CompileOptions = serde_json::from_str(r#"{"addNulls": true}"#).unwrap();
/// assert!(opts.add_nulls);
/// assert!(!opts.no_schema);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Widen every optional property's schema so it also admits `null`.
    pub add_nulls: bool,
    /// Make the object schema builder return the flat property list
    /// instead of an assembled object schema.
    pub no_schema: bool,
}

impl CompileOptions {
    /// Sets the `add_nulls` flag.
    pub fn with_add_nulls(mut self, add_nulls: bool) -> Self {
        self.add_nulls = add_nulls;
        self
    }

    /// Sets the `no_schema` flag.
    pub fn with_no_schema(mut self, no_schema: bool) -> Self {
        self.no_schema = no_schema;
        self
    }
}
