//! Translation of the vendor-neutral, JSON-schema-like tool input schema
//! into the object-shaped dialect the vendors accept.
//!
//! Both supported vendors only take object-typed tool inputs, and both want
//! `additionalProperties: false` as a literal boolean. Some schema dialects
//! spell that boolean as the sentinel `{"not": {}}`, which is rewritten
//! recursively here.

use serde_json::{Map, Value};

use crate::error::Error;

/// An input schema decomposed into the fields vendors treat specially plus
/// an opaque bucket for everything else.
///
/// Unknown top-level keys ride along in `extra` so forward-compatible
/// schema extensions are not silently dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ObjectSchema {
    pub properties: Option<Value>,
    pub required: Option<Value>,
    pub extra: Map<String, Value>,
}

impl ObjectSchema {
    /// Reassemble into the vendor wire form: a JSON object with
    /// `"type": "object"` plus the translated fields.
    pub fn into_json(self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String("object".to_string()));

        if let Some(properties) = self.properties {
            map.insert("properties".to_string(), properties);
        }
        if let Some(required) = self.required {
            map.insert("required".to_string(), required);
        }
        for (key, value) in self.extra {
            map.insert(key, value);
        }

        Value::Object(map)
    }
}

/// Translate a tool input schema, verifying it is object-shaped.
///
/// A missing `type` defaults to object. A non-object type and a union
/// (array-valued) type are both rejected: neither vendor can express them
/// for tool inputs.
pub(crate) fn translate_object_schema(schema: &Value) -> crate::Result<ObjectSchema> {
    let Value::Object(schema) = schema else {
        return Err(Error::InvalidToolSchema(format!(
            "input schema must be a JSON object, got {schema}"
        )));
    };

    match schema.get("type") {
        None => {}
        Some(Value::String(ty)) if ty == "object" => {}
        Some(Value::String(ty)) => {
            return Err(Error::InvalidToolSchema(format!(
                "unsupported schema type: {ty}, only 'object' is supported"
            )));
        }
        Some(Value::Array(types)) => {
            return Err(Error::InvalidToolSchema(format!(
                "unsupported schema with multiple types: {types:?}, only single type 'object' is supported"
            )));
        }
        Some(other) => {
            return Err(Error::InvalidToolSchema(format!("malformed schema type: {other}")));
        }
    }

    let mut translated = ObjectSchema::default();

    for (key, value) in schema {
        let mut value = value.clone();
        normalize_not_sentinels(&mut value);

        match key.as_str() {
            "type" => {}
            "properties" => translated.properties = Some(value),
            "required" => translated.required = Some(value),
            _ => {
                translated.extra.insert(key.clone(), value);
            }
        }
    }

    Ok(translated)
}

/// Recursively rewrite every `additionalProperties: {"not": {}}` to
/// `additionalProperties: false`, at any nesting depth.
pub(crate) fn normalize_not_sentinels(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if key == "additionalProperties" && is_not_empty_sentinel(entry) {
                    *entry = Value::Bool(false);
                    continue;
                }
                normalize_not_sentinels(entry);
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_not_sentinels(item);
            }
        }
        _ => {}
    }
}

/// `{"not": {}}` exactly: a single-key object whose `not` is an empty object.
fn is_not_empty_sentinel(value: &Value) -> bool {
    let Value::Object(map) = value else {
        return false;
    };
    if map.len() != 1 {
        return false;
    }
    matches!(map.get("not"), Some(Value::Object(inner)) if inner.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_type_defaults_to_object() {
        let schema = json!({"properties": {"a": {"type": "string"}}});
        let translated = translate_object_schema(&schema).unwrap();
        assert_eq!(translated.properties, Some(json!({"a": {"type": "string"}})));
    }

    #[test]
    fn non_object_and_union_types_are_rejected() {
        let err = translate_object_schema(&json!({"type": "string"})).unwrap_err();
        assert!(err.to_string().contains("only 'object' is supported"));

        let err = translate_object_schema(&json!({"type": ["object", "null"]})).unwrap_err();
        assert!(err.to_string().contains("multiple types"));
    }

    #[test]
    fn not_sentinel_normalizes_at_every_depth() {
        let schema = json!({
            "type": "object",
            "additionalProperties": {"not": {}},
            "properties": {
                "nested": {
                    "type": "object",
                    "additionalProperties": {"not": {}}
                },
                "items_case": {
                    "type": "array",
                    "items": {"type": "object", "additionalProperties": {"not": {}}}
                }
            },
            "allOf": [
                {"type": "object", "additionalProperties": {"not": {}}}
            ]
        });

        let translated = translate_object_schema(&schema).unwrap();
        let wire = translated.into_json();

        assert_eq!(wire["additionalProperties"], json!(false));
        assert_eq!(wire["properties"]["nested"]["additionalProperties"], json!(false));
        assert_eq!(wire["properties"]["items_case"]["items"]["additionalProperties"], json!(false));
        assert_eq!(wire["allOf"][0]["additionalProperties"], json!(false));
    }

    #[test]
    fn non_empty_not_is_left_untouched() {
        let schema = json!({
            "type": "object",
            "additionalProperties": {"not": {"type": "string"}}
        });

        let wire = translate_object_schema(&schema).unwrap().into_json();
        assert_eq!(wire["additionalProperties"], json!({"not": {"type": "string"}}));
    }

    #[test]
    fn unknown_keys_pass_through_the_extra_bucket() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "number"}},
            "required": ["a"],
            "$defs": {"shared": {"type": "string"}},
            "description": "a tool"
        });

        let translated = translate_object_schema(&schema).unwrap();
        assert_eq!(translated.extra.get("$defs"), Some(&json!({"shared": {"type": "string"}})));
        assert_eq!(translated.extra.get("description"), Some(&json!("a tool")));

        let wire = translated.into_json();
        assert_eq!(wire["type"], json!("object"));
        assert_eq!(wire["required"], json!(["a"]));
    }
}
