//! Reverse-transformation plans.
//!
//! Projection loses information; a [`ParameterMapping`] records, per
//! argument key, which loss happened so [`crate::transform`] can undo it
//! at call time. Built once per tool at registration, immutable after.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::schema::{classify, effective_type, SchemaKind};

/// How one argument key is reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Enum was coerced to STRING; parse back to the original numeric type.
    EnumTypeConversion,
    /// Union-typed in the source; pass through unchanged.
    Flexible,
    /// Array of objects; map elements through the item mapping.
    ObjectArray,
}

/// Numeric type an enum was coerced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Number,
    Integer,
}

/// Parse-back details for one coerced enum.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumConversion {
    pub original: NumericKind,
    /// Original (pre-stringification) allowed values.
    pub values: Vec<Value>,
}

/// Element plan for an [`TransformKind::ObjectArray`] key.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemMapping {
    /// Object elements with their own plan.
    Mapped(ParameterMapping),
    /// Union elements; passed through unchanged.
    Flexible,
}

/// Plan for an object key that accepts undeclared properties.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMapping {
    /// Schema for extra properties, when `additionalProperties` was
    /// object-shaped. Kept raw; a plan is built from it at call time.
    pub additional_schema: Option<Value>,
    /// Plan for the explicitly declared properties, if any.
    pub base: Option<ParameterMapping>,
}

/// Per-key reversal plan for one tool's arguments.
///
/// Every declared property lands in exactly one category; keys absent
/// from all categories are unknown to the tool and dropped at call time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMapping {
    /// Copied as-is when present and non-null.
    pub direct: BTreeSet<String>,
    pub transforms: BTreeMap<String, TransformKind>,
    pub conversions: BTreeMap<String, EnumConversion>,
    /// Fixed-shape object properties, recursed into.
    pub nested: BTreeMap<String, ParameterMapping>,
    pub items: BTreeMap<String, ItemMapping>,
    pub dynamic: BTreeMap<String, DynamicMapping>,
}

impl ParameterMapping {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty()
            && self.transforms.is_empty()
            && self.nested.is_empty()
            && self.dynamic.is_empty()
    }

    /// Whether this plan accounts for `key` in any category.
    pub(crate) fn covers(&self, key: &str) -> bool {
        self.direct.contains(key)
            || self.transforms.contains_key(key)
            || self.nested.contains_key(key)
            || self.dynamic.contains_key(key)
    }
}

/// Build the reversal plan for one provider schema.
pub fn build_mapping(schema: &Value) -> ParameterMapping {
    schema
        .as_object()
        .map(build_from_map)
        .unwrap_or_default()
}

fn build_from_map(schema: &Map<String, Value>) -> ParameterMapping {
    let mut mapping = ParameterMapping::default();
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return mapping;
    };

    for (key, descriptor) in properties {
        let Some(property) = descriptor.as_object() else {
            // Bare boolean descriptors carry nothing to reverse.
            mapping.direct.insert(key.clone());
            continue;
        };

        if let Some(conversion) = numeric_enum_conversion(property) {
            mapping
                .transforms
                .insert(key.clone(), TransformKind::EnumTypeConversion);
            mapping.conversions.insert(key.clone(), conversion);
            continue;
        }

        match classify(property) {
            SchemaKind::Union(_) => {
                mapping.transforms.insert(key.clone(), TransformKind::Flexible);
            }
            SchemaKind::Array(array) => plan_array(&mut mapping, key, array),
            SchemaKind::Object(object) => plan_object(&mut mapping, key, object),
            SchemaKind::Primitive(_) | SchemaKind::Untyped => {
                mapping.direct.insert(key.clone());
            }
        }
    }
    mapping
}

/// Enums only need reversing when the source type was numeric; string
/// enums survive projection intact.
fn numeric_enum_conversion(property: &Map<String, Value>) -> Option<EnumConversion> {
    let values = property.get("enum").and_then(Value::as_array)?;
    let original = match effective_type(property)? {
        "integer" => NumericKind::Integer,
        "number" => NumericKind::Number,
        _ => return None,
    };
    Some(EnumConversion {
        original,
        values: values.clone(),
    })
}

fn plan_array(mapping: &mut ParameterMapping, key: &str, array: &Map<String, Value>) {
    let Some(items) = array.get("items").and_then(Value::as_object) else {
        mapping.direct.insert(key.to_string());
        return;
    };

    match classify(items) {
        SchemaKind::Union(_) => {
            mapping
                .transforms
                .insert(key.to_string(), TransformKind::ObjectArray);
            mapping.items.insert(key.to_string(), ItemMapping::Flexible);
        }
        SchemaKind::Object(object) => {
            mapping
                .transforms
                .insert(key.to_string(), TransformKind::ObjectArray);
            mapping
                .items
                .insert(key.to_string(), ItemMapping::Mapped(build_from_map(object)));
        }
        _ => {
            mapping.direct.insert(key.to_string());
        }
    }
}

fn plan_object(mapping: &mut ParameterMapping, key: &str, object: &Map<String, Value>) {
    let declared = object
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| !props.is_empty());

    match object.get("additionalProperties") {
        // Open objects get dynamic handling; `false` is a closed object
        // and falls through to the fixed-shape path.
        Some(additional @ (Value::Bool(true) | Value::Object(_))) => {
            let additional_schema = match additional {
                Value::Object(_) => Some(additional.clone()),
                _ => None,
            };
            let base = declared.then(|| build_from_map(object));
            mapping.dynamic.insert(
                key.to_string(),
                DynamicMapping {
                    additional_schema,
                    base,
                },
            );
        }
        _ if declared => {
            mapping
                .nested
                .insert(key.to_string(), build_from_map(object));
        }
        _ => {
            mapping.direct.insert(key.to_string());
        }
    }
}
