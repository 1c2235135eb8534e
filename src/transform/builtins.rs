//! Ready-made transform constructors for common derivations.
//!
//! Each constructor returns a [`TransformFn`] to be registered under an
//! identifier of the caller's choosing:
//!
//! ```ignore
//! registry.register_arc("full_name", builtins::concat_fields(&["firstName", "lastName"], " "))?;
//! ```

use super::registry::TransformFn;
use crate::core::Document;
use serde_json::Value;
use std::sync::Arc;

/// Joins the string form of each field with `separator`.
///
/// Yields no value unless every field is present and non-null, so re-running
/// the rule on an already migrated document leaves the derived field alone.
pub fn concat_fields(fields: &[&str], separator: &str) -> TransformFn {
    let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    let separator = separator.to_string();
    Arc::new(move |doc: &Document| {
        let mut parts = Vec::with_capacity(fields.len());
        for field in &fields {
            match doc.get(field)? {
                Value::Null => return None,
                Value::String(s) => parts.push(s.clone()),
                other => parts.push(other.to_string()),
            }
        }
        Some(Value::String(parts.join(&separator)))
    })
}

/// Applies `f` to the value at `field`, if present.
pub fn map_field<F>(field: &str, f: F) -> TransformFn
where
    F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
{
    let field = field.to_string();
    Arc::new(move |doc: &Document| doc.get(&field).and_then(|value| f(value)))
}

/// Always yields `value`.
pub fn constant(value: Value) -> TransformFn {
    Arc::new(move |_doc: &Document| Some(value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DocumentId;
    use serde_json::{Map, json};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => Document::new(DocumentId::new(), map),
            _ => Document::new(DocumentId::new(), Map::new()),
        }
    }

    #[test]
    fn test_concat_fields() {
        let full_name = concat_fields(&["firstName", "lastName"], " ");
        assert_eq!(
            full_name(&doc(json!({"firstName": "John", "lastName": "Doe"}))),
            Some(json!("John Doe"))
        );
        assert_eq!(full_name(&doc(json!({"firstName": "John"}))), None);
        assert_eq!(full_name(&doc(json!({"firstName": "John", "lastName": null}))), None);

        let label = concat_fields(&["name", "info.age"], "/");
        assert_eq!(
            label(&doc(json!({"name": "ann", "info": {"age": 7}}))),
            Some(json!("ann/7"))
        );
    }

    #[test]
    fn test_map_field_and_constant() {
        let doubled = map_field("age", |v| v.as_i64().map(|n| json!(n * 2)));
        assert_eq!(doubled(&doc(json!({"age": 21}))), Some(json!(42)));
        assert_eq!(doubled(&doc(json!({"age": "old"}))), None);
        assert_eq!(doubled(&doc(json!({}))), None);

        let version = constant(json!(2));
        assert_eq!(version(&doc(json!({}))), Some(json!(2)));
    }
}
