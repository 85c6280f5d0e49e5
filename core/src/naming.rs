#![deny(missing_docs)]

//! # Naming Utilities
//!
//! Helper functions for deriving operation IDs from methods and paths, and
//! model names from resource keys.

use heck::ToUpperCamelCase;

/// Separator replacing every run of non-identifier characters in operation IDs.
const SEPARATOR: char = '_';

/// Derives the base operation ID from method, path and group suffix.
///
/// e.g. `GET /users/{id}#admin` -> `get_users_id_admin`
pub fn derive_operation_id(method: &str, path: &str) -> String {
    let raw = format!("{} {}", method.to_lowercase(), path);
    let mut result = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == SEPARATOR {
            result.push(c);
        } else if !result.ends_with(SEPARATOR) {
            result.push(SEPARATOR);
        }
    }
    result.trim_matches(SEPARATOR).to_string()
}

/// Simple English singularization for resource keys.
///
/// Inverse of the usual `s` / `es` / `ies` plural endings.
pub fn singularize(word: &str) -> String {
    if word.len() > 3 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Converts a resource key (`order_items`, `line-item`) into a model name.
pub fn model_name(key: &str) -> String {
    key.to_upper_camel_case()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_operation_id() {
        assert_eq!(derive_operation_id("GET", "/users"), "get_users");
        assert_eq!(
            derive_operation_id("POST", "/users/{id}/activate"),
            "post_users_id_activate"
        );
        assert_eq!(
            derive_operation_id("GET", "/users/{id}#admin"),
            "get_users_id_admin"
        );
        assert_eq!(derive_operation_id("DELETE", "/"), "delete");
        assert_eq!(derive_operation_id("GET", "/a--b//c/"), "get_a_b_c");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("widgets"), "widget");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("branches"), "branch");
        assert_eq!(singularize("glass"), "glass");
        assert_eq!(singularize("staff"), "staff");
        assert_eq!(singularize("s"), "s");
    }

    #[test]
    fn test_model_name() {
        assert_eq!(model_name("order_item"), "OrderItem");
        assert_eq!(model_name("line-item"), "LineItem");
        assert_eq!(model_name("user"), "User");
    }
}
