//! Lossy projection of provider JSON Schemas into the restricted dialect.
//!
//! Providers describe tool inputs in full JSON Schema; the live runtime
//! accepts only [`RestrictedSchema`]. Projection is deliberately lossy
//! (unions collapse, formats drop) and every loss here has a matching
//! reversal rule in [`crate::transform`] so arguments round-trip.

use serde_json::{Map, Value};

use crate::normalizer::{NormalizerSet, PolymorphicRef};
use crate::schema::{classify, AdditionalProperties, RestrictedSchema, SchemaKind, Type};

/// Project one provider schema into the restricted dialect.
///
/// Never fails: unrecognizable nodes become STRING, the dialect's
/// catch-all. Ends with a defensive recursive pass that re-applies the
/// enum coercion rule; type tags are already uppercase by construction.
pub fn project_schema(schema: &Value, normalizers: &NormalizerSet) -> RestrictedSchema {
    let mut projected = project_node(schema, normalizers);
    validate_node(&mut projected);
    projected
}

fn project_node(schema: &Value, normalizers: &NormalizerSet) -> RestrictedSchema {
    let Some(map) = schema.as_object() else {
        // Bare boolean schemas ("anything goes") and other non-object
        // nodes have no structure to keep.
        return RestrictedSchema::new(Type::String);
    };

    let enum_values = map.get("enum").and_then(Value::as_array);
    match (classify(map), enum_values) {
        (SchemaKind::Union(alternatives), _) => {
            project_union(map, alternatives, normalizers)
        }
        (_, Some(values)) => project_enum(map, values),
        (SchemaKind::Object(map), None) => project_object(map, normalizers),
        (SchemaKind::Array(map), None) => project_array(map, normalizers),
        (SchemaKind::Primitive(json_type), None) => project_primitive(map, json_type),
        (SchemaKind::Untyped, None) => project_primitive(map, "string"),
    }
}

/// Unions flatten to their first alternative. The runtime cannot express
/// them, and the first alternative is the provider's primary shape; the
/// other shapes stay reachable because the matching argument key is
/// passed through unchanged at call time.
fn project_union(
    map: &Map<String, Value>,
    alternatives: &[Value],
    normalizers: &NormalizerSet,
) -> RestrictedSchema {
    let mut projected = match alternatives.first() {
        Some(first) => project_node(first, normalizers),
        None => RestrictedSchema::new(Type::String),
    };

    projected.description = match map.get("description").and_then(Value::as_str) {
        Some(description) => Some(description.to_string()),
        None => {
            let tags: Vec<&str> = alternatives
                .iter()
                .map(|alt| project_node(alt, normalizers).schema_type.as_str())
                .collect();
            Some(format!("Supports multiple types: {}", tags.join("/")))
        }
    };
    projected
}

/// Enums force STRING regardless of the declared type; values are
/// stringified to match. The reverse parse lives in the mapping built
/// beside this projection.
fn project_enum(map: &Map<String, Value>, values: &[Value]) -> RestrictedSchema {
    let mut projected = RestrictedSchema::new(Type::String);
    projected.description = description_of(map);
    projected.enum_values = Some(values.iter().map(stringify_enum_value).collect());
    copy_constraints(map, &mut projected);
    projected
}

fn stringify_enum_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn project_primitive(map: &Map<String, Value>, json_type: &str) -> RestrictedSchema {
    let mut projected = RestrictedSchema::new(Type::from_json_type(json_type));
    projected.description = description_of(map);
    copy_constraints(map, &mut projected);
    projected
}

fn project_array(map: &Map<String, Value>, normalizers: &NormalizerSet) -> RestrictedSchema {
    let mut projected = RestrictedSchema::new(Type::Array);
    projected.description = description_of(map);
    projected.items = map
        .get("items")
        .map(|items| Box::new(project_node(items, normalizers)));
    copy_constraints(map, &mut projected);
    projected
}

fn project_object(map: &Map<String, Value>, normalizers: &NormalizerSet) -> RestrictedSchema {
    let mut projected = RestrictedSchema::new(Type::Object);
    projected.description = description_of(map);
    copy_constraints(map, &mut projected);

    let mut properties: Vec<(String, RestrictedSchema)> = map
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, schema)| (name.clone(), project_node(schema, normalizers)))
                .collect()
        })
        .unwrap_or_default();

    let mut required: Vec<String> = map
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    match map.get("additionalProperties") {
        Some(Value::Bool(true)) => {
            projected.additional_properties = Some(AdditionalProperties::Open(true));
            // An open object whose only declared property is a known
            // discriminant is a collapsed polymorphic reference; declare
            // the sibling variants so the runtime can pick any of them.
            let collapsed = match properties.as_slice() {
                [(name, _)] => normalizers
                    .synthesis_pattern(name)
                    .map(|pattern| (name.clone(), pattern)),
                _ => None,
            };
            if let Some((declared, pattern)) = collapsed {
                synthesize_variants(&mut properties, pattern, &declared);
                required.retain(|name| *name != declared);
            }
        }
        Some(additional @ Value::Object(_)) => {
            projected.additional_properties = Some(AdditionalProperties::Schema(Box::new(
                project_node(additional, normalizers),
            )));
        }
        _ => {}
    }

    if !properties.is_empty() {
        projected.properties = Some(properties.into_iter().collect());
    }
    if !required.is_empty() {
        projected.required = Some(required);
    }
    projected
}

/// Declare the missing discriminants and the companion tag field for a
/// collapsed polymorphic reference.
fn synthesize_variants(
    properties: &mut Vec<(String, RestrictedSchema)>,
    pattern: &PolymorphicRef,
    declared: &str,
) {
    for discriminant in &pattern.discriminants {
        if discriminant.name == declared {
            continue;
        }
        let schema = if discriminant.flag {
            RestrictedSchema::new(Type::Boolean)
                .with_description(format!("Set true to select the '{}' variant", discriminant.name))
        } else {
            RestrictedSchema::new(Type::String)
                .with_description(format!("Identifier for the '{}' variant", discriminant.name))
        };
        properties.push((discriminant.name.clone(), schema));
    }

    let names: Vec<String> = pattern
        .discriminants
        .iter()
        .map(|d| d.name.clone())
        .collect();
    properties.push((
        pattern.tag_field.clone(),
        RestrictedSchema::new(Type::String)
            .with_description("Names which variant is supplied")
            .with_enum_values(names),
    ));
}

fn description_of(map: &Map<String, Value>) -> Option<String> {
    map.get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Constraint carry-over. Numeric bounds and `default` copy as-is;
/// length and size bounds are int64-as-string on the wire, so they
/// stringify; `format` has no slot in the dialect and is dropped.
fn copy_constraints(map: &Map<String, Value>, out: &mut RestrictedSchema) {
    out.default = map.get("default").cloned();
    out.nullable = nullable_of(map);
    out.minimum = map.get("minimum").cloned();
    out.maximum = map.get("maximum").cloned();
    out.pattern = map
        .get("pattern")
        .and_then(Value::as_str)
        .map(str::to_string);
    out.min_length = stringified(map.get("minLength"));
    out.max_length = stringified(map.get("maxLength"));
    out.min_items = stringified(map.get("minItems"));
    out.max_items = stringified(map.get("maxItems"));
    out.min_properties = stringified(map.get("minProperties"));
    out.max_properties = stringified(map.get("maxProperties"));
}

fn stringified(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn nullable_of(map: &Map<String, Value>) -> Option<bool> {
    if let Some(explicit) = map.get("nullable").and_then(Value::as_bool) {
        return Some(explicit);
    }
    // JSON-Schema spellings like `"type": ["string", "null"]`.
    if let Some(Value::Array(entries)) = map.get("type") {
        if entries.iter().any(|entry| entry.as_str() == Some("null")) {
            return Some(true);
        }
    }
    None
}

/// Defensive recursive pass: enums are STRING, everywhere. Idempotent.
fn validate_node(node: &mut RestrictedSchema) {
    if node.enum_values.is_some() {
        node.schema_type = Type::String;
    }
    if let Some(properties) = node.properties.as_mut() {
        for child in properties.values_mut() {
            validate_node(child);
        }
    }
    if let Some(items) = node.items.as_mut() {
        validate_node(items);
    }
    if let Some(AdditionalProperties::Schema(inner)) = node.additional_properties.as_mut() {
        validate_node(inner);
    }
}
