//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace.
//!
//! Every compilation error is fatal: a malformed line aborts the whole
//! compilation and no partial document is produced.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// A property, type, model or operation line does not match its grammar.
    /// Carries the offending literal text inside the message.
    #[from(ignore)]
    #[display("Grammar Error: {_0}")]
    Grammar(String),

    /// A model inherits from a parent that is undeclared, not yet compiled,
    /// or not an object schema.
    #[from(ignore)]
    #[display("Reference Error: Parent model object not found for `{child} < {parent}`")]
    Reference {
        /// The inheriting model.
        child: String,
        /// The requested parent model.
        parent: String,
    },

    /// A CRUDL macro line does not match the macro grammar.
    #[from(ignore)]
    #[display("Macro Error: Invalid CRUDL macro: `{_0}`")]
    Macro(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Builds the error raised for a definition line that matches no grammar rule.
    pub fn invalid_definition(line: &str) -> Self {
        AppError::Grammar(format!("Invalid definition: `{}`", line.trim()))
    }

    /// Builds the error raised for a property specifier with an unknown type.
    pub fn invalid_property(spec: &str) -> Self {
        AppError::Grammar(format!("Definition `{}` is invalid", spec.trim()))
    }
}
