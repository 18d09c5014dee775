//! Call-time reversal of projected arguments.
//!
//! The AI runtime produces arguments shaped like the projected schema;
//! providers expect the original shape. This walks the arguments once,
//! applying the tool's [`ParameterMapping`] per key. Nulls are never
//! forwarded, and keys the plan does not cover are dropped.

use serde_json::{Map, Value};

use crate::mapping::{
    DynamicMapping, EnumConversion, ItemMapping, NumericKind, ParameterMapping, TransformKind,
};
use crate::normalizer::NormalizerSet;

/// Reverse one argument object into provider shape.
pub fn transform_arguments(
    args: &Map<String, Value>,
    mapping: &ParameterMapping,
    normalizers: &NormalizerSet,
) -> Map<String, Value> {
    let mut out = Map::new();

    for (key, value) in args {
        if value.is_null() {
            continue;
        }

        if let Some(kind) = mapping.transforms.get(key) {
            let transformed = match kind {
                TransformKind::EnumTypeConversion => match mapping.conversions.get(key) {
                    Some(conversion) => convert_enum(key, value, conversion),
                    None => value.clone(),
                },
                TransformKind::Flexible => value.clone(),
                TransformKind::ObjectArray => {
                    transform_items(key, value, mapping, normalizers)
                }
            };
            out.insert(key.clone(), transformed);
        } else if let Some(nested) = mapping.nested.get(key) {
            // Normalizers win over the generic nested recursion.
            let transformed = match normalizers.normalize(key, value) {
                Some(normalized) => normalized,
                None => match value.as_object() {
                    Some(object) => {
                        Value::Object(transform_arguments(object, nested, normalizers))
                    }
                    None => value.clone(),
                },
            };
            out.insert(key.clone(), transformed);
        } else if let Some(dynamic) = mapping.dynamic.get(key) {
            let transformed = match normalizers.normalize(key, value) {
                Some(normalized) => normalized,
                None => transform_dynamic(value, dynamic, normalizers),
            };
            out.insert(key.clone(), transformed);
        } else if mapping.direct.contains(key) {
            out.insert(key.clone(), value.clone());
        } else {
            tracing::debug!(key, "argument key not in mapping; dropping");
        }
    }

    out
}

/// Parse a stringified enum back into its original numeric type. Parse
/// failures are non-fatal: warn and pass the string through so the
/// provider can reject it with a real error.
fn convert_enum(key: &str, value: &Value, conversion: &EnumConversion) -> Value {
    let Some(text) = value.as_str() else {
        // Already numeric (the runtime ignored the STRING coercion).
        return value.clone();
    };

    let parsed = match conversion.original {
        NumericKind::Integer => text.parse::<i64>().ok().map(Value::from),
        NumericKind::Number => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
    };

    match parsed {
        Some(number) => number,
        None => {
            tracing::warn!(key, value = %text, "enum value failed numeric parse; passing through");
            value.clone()
        }
    }
}

fn transform_items(
    key: &str,
    value: &Value,
    mapping: &ParameterMapping,
    normalizers: &NormalizerSet,
) -> Value {
    let Some(elements) = value.as_array() else {
        return value.clone();
    };

    let item_mapping = mapping.items.get(key);
    let transformed = elements
        .iter()
        .map(|element| match (item_mapping, element.as_object()) {
            (Some(ItemMapping::Mapped(plan)), Some(object)) => {
                Value::Object(transform_arguments(object, plan, normalizers))
            }
            // Flexible items, and stray non-object elements, pass through.
            _ => element.clone(),
        })
        .collect();
    Value::Array(transformed)
}

/// Open objects: declared properties go through the base plan, every
/// other key passes through, recursively re-planned when the extra
/// properties have a schema of their own.
fn transform_dynamic(
    value: &Value,
    dynamic: &DynamicMapping,
    normalizers: &NormalizerSet,
) -> Value {
    let Some(object) = value.as_object() else {
        return value.clone();
    };

    let mut out = match &dynamic.base {
        Some(base) => transform_arguments(object, base, normalizers),
        None => Map::new(),
    };

    let additional_plan = dynamic
        .additional_schema
        .as_ref()
        .map(crate::mapping::build_mapping)
        .filter(|plan| !plan.is_empty());

    for (key, extra) in object {
        if extra.is_null() {
            continue;
        }
        if dynamic.base.as_ref().is_some_and(|base| base.covers(key)) {
            continue;
        }
        let transformed = match (&additional_plan, extra.as_object()) {
            (Some(plan), Some(inner)) => {
                Value::Object(transform_arguments(inner, plan, normalizers))
            }
            _ => extra.clone(),
        };
        out.insert(key.clone(), transformed);
    }

    Value::Object(out)
}
