//! Normalizers for known-ambiguous argument shapes.
//!
//! Some providers model a reference as an object carrying exactly one of
//! several mutually exclusive discriminant keys plus a companion tag
//! field, e.g. a Notion-style parent that is a `page_id`, a
//! `database_id`, or the `workspace` flag. AI runtimes routinely fill in
//! more than one. The normalizer repairs those objects at call time and
//! tells the projector which discriminants to advertise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One discriminant of a polymorphic reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminant {
    /// Property name, e.g. `page_id`.
    pub name: String,

    /// Presence-only discriminant: carries `true` instead of an id.
    #[serde(default)]
    pub flag: bool,
}

impl Discriminant {
    pub fn id(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flag: false,
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flag: true,
        }
    }
}

/// A polymorphic reference shape, keyed by the argument name it repairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymorphicRef {
    /// Argument key this normalizer handles, e.g. `parent`.
    pub key: String,

    /// Known discriminants. Order matters only for documentation; when
    /// several arrive at once, source order of the arguments wins.
    pub discriminants: Vec<Discriminant>,

    /// Tag field the provider expects beside the discriminant.
    #[serde(default = "default_tag_field")]
    pub tag_field: String,
}

fn default_tag_field() -> String {
    "type".to_string()
}

impl PolymorphicRef {
    pub fn is_discriminant(&self, name: &str) -> bool {
        self.discriminants.iter().any(|d| d.name == name)
    }

    pub fn discriminant(&self, name: &str) -> Option<&Discriminant> {
        self.discriminants.iter().find(|d| d.name == name)
    }

    /// Repair one reference object.
    ///
    /// Nulls are stripped first. Zero discriminants left: warn and pass
    /// the rest through. Exactly one: already well-formed. More than one:
    /// keep the first in source order, drop the rest, and synthesize the
    /// companion tag the provider expects.
    pub fn normalize(&self, object: &Map<String, Value>) -> Map<String, Value> {
        let mut kept: Map<String, Value> = object
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let present: Vec<String> = kept
            .keys()
            .filter(|key| self.is_discriminant(key))
            .cloned()
            .collect();

        match present.as_slice() {
            [] => {
                tracing::warn!(
                    key = %self.key,
                    "no discriminant present after null stripping; passing through"
                );
                kept
            }
            [_single] => kept,
            [winner, losers @ ..] => {
                tracing::warn!(
                    key = %self.key,
                    kept = %winner,
                    dropped = ?losers,
                    "multiple discriminants supplied; keeping the first"
                );
                for loser in losers {
                    kept.remove(loser);
                }
                if self.discriminant(winner).is_some_and(|d| d.flag) {
                    kept.insert(winner.clone(), Value::Bool(true));
                }
                kept.insert(self.tag_field.clone(), Value::String(winner.clone()));
                kept
            }
        }
    }
}

/// The configured normalizer table, consulted by key at transform time
/// and by shape during projection.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerSet {
    patterns: Vec<PolymorphicRef>,
}

impl Default for NormalizerSet {
    fn default() -> Self {
        Self {
            patterns: vec![parent_reference()],
        }
    }
}

impl NormalizerSet {
    pub fn new(patterns: Vec<PolymorphicRef>) -> Self {
        Self { patterns }
    }

    /// An empty table; arguments pass through untouched.
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn for_key(&self, key: &str) -> Option<&PolymorphicRef> {
        self.patterns.iter().find(|p| p.key == key)
    }

    /// The pattern to synthesize from when a schema object declares
    /// exactly one property and that property is a known discriminant.
    pub fn synthesis_pattern(&self, sole_property: &str) -> Option<&PolymorphicRef> {
        self.patterns
            .iter()
            .find(|p| p.is_discriminant(sole_property))
    }

    /// Normalize a value by argument key. `None` means this key is not
    /// registered (or the value is not an object) and generic transform
    /// rules apply.
    pub fn normalize(&self, key: &str, value: &Value) -> Option<Value> {
        let pattern = self.for_key(key)?;
        let object = value.as_object()?;
        Some(Value::Object(pattern.normalize(object)))
    }
}

/// The built-in table entry: Notion-style parent references. Page and
/// database parents carry an id; the workspace parent is a flag.
pub fn parent_reference() -> PolymorphicRef {
    PolymorphicRef {
        key: "parent".to_string(),
        discriminants: vec![
            Discriminant::id("page_id"),
            Discriminant::id("database_id"),
            Discriminant::flag("workspace"),
        ],
        tag_field: "type".to_string(),
    }
}
