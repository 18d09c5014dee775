//! The restricted function-declaration dialect.
//!
//! Live conversational runtimes accept a closed subset of JSON Schema:
//! uppercase type tags, enums on STRING fields only, no union types, and
//! a 64-character name alphabet. [`RestrictedSchema`] models that subset;
//! everything the projector emits is one of these.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type tags accepted by the restricted dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Type {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl Type {
    /// Map a JSON-Schema `type` keyword onto a dialect tag.
    ///
    /// Unrecognized types fall back to [`Type::String`], the dialect's
    /// catch-all.
    pub fn from_json_type(json_type: &str) -> Self {
        match json_type {
            "string" => Type::String,
            "number" => Type::Number,
            "integer" => Type::Integer,
            "boolean" => Type::Boolean,
            "array" => Type::Array,
            "object" => Type::Object,
            "null" => Type::Null,
            _ => Type::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Type::String => "STRING",
            Type::Number => "NUMBER",
            Type::Integer => "INTEGER",
            Type::Boolean => "BOOLEAN",
            Type::Array => "ARRAY",
            Type::Object => "OBJECT",
            Type::Null => "NULL",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `additionalProperties` in the restricted dialect: either an open/closed
/// marker or a schema every extra property must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Open(bool),
    Schema(Box<RestrictedSchema>),
}

/// A schema node in the restricted dialect.
///
/// Length and size bounds are strings on the wire (int64-as-string), so
/// the projector stringifies them; numeric `minimum`/`maximum` stay
/// numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictedSchema {
    #[serde(rename = "type")]
    pub schema_type: Type,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Allowed values; only meaningful with [`Type::String`].
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, RestrictedSchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<RestrictedSchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<String>,
}

impl RestrictedSchema {
    pub fn new(schema_type: Type) -> Self {
        Self {
            schema_type,
            description: None,
            enum_values: None,
            properties: None,
            required: None,
            items: None,
            additional_properties: None,
            nullable: None,
            default: None,
            minimum: None,
            maximum: None,
            pattern: None,
            min_length: None,
            max_length: None,
            min_items: None,
            max_items: None,
            min_properties: None,
            max_properties: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = Some(values);
        self
    }
}

/// A handler surfaced to the AI runtime: name, description, parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub parameters: RestrictedSchema,
}

/// Structural classification of a provider schema node.
///
/// Projection and mapping recurse over the same shapes; classifying once
/// keeps both matches exhaustive.
#[derive(Debug)]
pub(crate) enum SchemaKind<'a> {
    /// `oneOf`/`anyOf` with at least one alternative.
    Union(&'a [Value]),
    Object(&'a Map<String, Value>),
    Array(&'a Map<String, Value>),
    /// Declared scalar type keyword.
    Primitive(&'a str),
    /// No recognizable type marker.
    Untyped,
}

pub(crate) fn classify(schema: &Map<String, Value>) -> SchemaKind<'_> {
    if let Some(alternatives) = schema
        .get("oneOf")
        .or_else(|| schema.get("anyOf"))
        .and_then(Value::as_array)
    {
        if !alternatives.is_empty() {
            return SchemaKind::Union(alternatives);
        }
    }

    match effective_type(schema) {
        Some("object") => SchemaKind::Object(schema),
        Some("array") => SchemaKind::Array(schema),
        Some(t) => SchemaKind::Primitive(t),
        None => {
            // Schemas often omit `type` but still declare structure.
            if schema.contains_key("properties") {
                SchemaKind::Object(schema)
            } else if schema.contains_key("items") {
                SchemaKind::Array(schema)
            } else {
                SchemaKind::Untyped
            }
        }
    }
}

/// Resolve the declared `type`, treating `["string", "null"]` style
/// arrays as their first non-null entry.
pub(crate) fn effective_type(schema: &Map<String, Value>) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(entries) => entries
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_tags_serialize_uppercase() {
        assert_eq!(serde_json::to_value(Type::String).unwrap(), json!("STRING"));
        assert_eq!(serde_json::to_value(Type::Integer).unwrap(), json!("INTEGER"));
        let parsed: Type = serde_json::from_value(json!("BOOLEAN")).unwrap();
        assert_eq!(parsed, Type::Boolean);
    }

    #[test]
    fn unknown_json_type_falls_back_to_string() {
        assert_eq!(Type::from_json_type("uuid"), Type::String);
        assert_eq!(Type::from_json_type("integer"), Type::Integer);
    }

    #[test]
    fn schema_serializes_camel_case_and_skips_empty() {
        let mut schema = RestrictedSchema::new(Type::String).with_description("a name");
        schema.min_length = Some("2".to_string());

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "STRING",
                "description": "a name",
                "minLength": "2"
            })
        );
    }

    #[test]
    fn enum_field_uses_wire_name() {
        let schema =
            RestrictedSchema::new(Type::String).with_enum_values(vec!["a".into(), "b".into()]);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["enum"], json!(["a", "b"]));
    }

    #[test]
    fn additional_properties_round_trips_both_forms() {
        let mut open = RestrictedSchema::new(Type::Object);
        open.additional_properties = Some(AdditionalProperties::Open(true));
        assert_eq!(
            serde_json::to_value(&open).unwrap()["additionalProperties"],
            json!(true)
        );

        let mut typed = RestrictedSchema::new(Type::Object);
        typed.additional_properties = Some(AdditionalProperties::Schema(Box::new(
            RestrictedSchema::new(Type::Number),
        )));
        assert_eq!(
            serde_json::to_value(&typed).unwrap()["additionalProperties"],
            json!({ "type": "NUMBER" })
        );
    }

    #[test]
    fn classify_prefers_unions_over_declared_type() {
        let schema = json!({
            "type": "string",
            "oneOf": [{ "type": "string" }, { "type": "object" }]
        });
        let map = schema.as_object().unwrap();
        assert!(matches!(classify(map), SchemaKind::Union(alts) if alts.len() == 2));
    }

    #[test]
    fn classify_infers_structure_without_type() {
        let object = json!({ "properties": { "a": { "type": "string" } } });
        assert!(matches!(
            classify(object.as_object().unwrap()),
            SchemaKind::Object(_)
        ));

        let array = json!({ "items": { "type": "string" } });
        assert!(matches!(
            classify(array.as_object().unwrap()),
            SchemaKind::Array(_)
        ));

        let bare = json!({ "description": "anything" });
        assert!(matches!(
            classify(bare.as_object().unwrap()),
            SchemaKind::Untyped
        ));
    }

    #[test]
    fn effective_type_resolves_nullable_arrays() {
        let schema = json!({ "type": ["null", "integer"] });
        assert_eq!(effective_type(schema.as_object().unwrap()), Some("integer"));
    }
}
