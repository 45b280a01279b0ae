use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Which kind of record an id was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Room,
    Object,
}

impl EntityKind {
    /// Prefix used by index-fallback ids: `room-12`, `object-3`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Object => "object",
        }
    }
}

/// How an id was produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdBase {
    /// Derived from the entity's name.
    Slug(String),
    /// No usable name; derived from the raw record index.
    Index { kind: EntityKind, index: usize },
}

/// Canonical entity id. Stays structured until serialization, where it
/// becomes a plain string such as `west-of-house`, `room-12` or `kitchen-2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub base: IdBase,
    /// Collision counter; `None` for the first holder of a base.
    pub suffix: Option<u32>,
}

impl EntityId {
    pub fn slug(slug: impl Into<String>) -> Self {
        Self {
            base: IdBase::Slug(slug.into()),
            suffix: None,
        }
    }

    pub fn fallback(kind: EntityKind, index: usize) -> Self {
        Self {
            base: IdBase::Index { kind, index },
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: u32) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.base, IdBase::Index { .. })
    }

    /// The id without any collision suffix.
    pub fn base_str(&self) -> String {
        match &self.base {
            IdBase::Slug(s) => s.clone(),
            IdBase::Index { kind, index } => format!("{}-{}", kind.prefix(), index),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suffix {
            Some(n) => write!(f, "{}-{}", self.base_str(), n),
            None => f.write_str(&self.base_str()),
        }
    }
}

impl From<&str> for EntityId {
    /// Reinterpret a serialized id. Index-shaped strings come back as
    /// fallback ids; anything else is a slug with its suffix folded in.
    fn from(s: &str) -> Self {
        for kind in [EntityKind::Room, EntityKind::Object] {
            if let Some(rest) = s
                .strip_prefix(kind.prefix())
                .and_then(|r| r.strip_prefix('-'))
            {
                if let Ok(index) = rest.parse::<usize>() {
                    return Self::fallback(kind, index);
                }
            }
        }
        Self::slug(s)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EntityId::from(s.as_str()))
    }
}

/// A dynamic value stored in an entity's property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<String>),
}

pub type Properties = BTreeMap<String, Value>;

/// Where a canonical record came from, so it can be re-checked against
/// the data file without parsing it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traceability {
    pub index: usize,
    pub message_index: Option<usize>,
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub name_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRoom {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub exits: BTreeMap<String, EntityId>,
    pub properties: Properties,
    pub source: Traceability,
}

/// Where an object starts the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLocation {
    Void,
    Inventory,
    Room(EntityId),
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Inventory => f.write_str("inventory"),
            Self::Room(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for ObjectLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectLocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "void" => Self::Void,
            "inventory" => Self::Inventory,
            other => Self::Room(EntityId::from(other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalObject {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub location: ObjectLocation,
    pub aliases: Vec<String>,
    pub properties: Properties,
    pub source: Traceability,
}

fn flag(properties: &Properties, key: &str) -> bool {
    matches!(properties.get(key), Some(Value::Bool(true)))
}

impl CanonicalRoom {
    /// Returns true if the named boolean property is set.
    pub fn has(&self, key: &str) -> bool {
        flag(&self.properties, key)
    }
}

impl CanonicalObject {
    pub fn has(&self, key: &str) -> bool {
        flag(&self.properties, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_rendering() {
        assert_eq!(EntityId::slug("kitchen").to_string(), "kitchen");
        assert_eq!(EntityId::slug("kitchen").with_suffix(2).to_string(), "kitchen-2");
        assert_eq!(
            EntityId::fallback(EntityKind::Room, 12).to_string(),
            "room-12"
        );
        assert!(EntityId::fallback(EntityKind::Object, 1).is_fallback());
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = EntityId::slug("west-of-house");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"west-of-house\"");
        let back: EntityId = serde_json::from_str("\"object-7\"").unwrap();
        assert_eq!(back, EntityId::fallback(EntityKind::Object, 7));
        let slug: EntityId = serde_json::from_str("\"room-with-a-view\"").unwrap();
        assert!(!slug.is_fallback());
    }

    #[test]
    fn location_strings() {
        let loc = ObjectLocation::Room(EntityId::slug("attic"));
        assert_eq!(serde_json::to_string(&loc).unwrap(), "\"attic\"");
        let void: ObjectLocation = serde_json::from_str("\"void\"").unwrap();
        assert_eq!(void, ObjectLocation::Void);
        assert_eq!(ObjectLocation::Inventory.to_string(), "inventory");
    }

    #[test]
    fn property_values_untagged() {
        let mut props = Properties::new();
        props.insert("isDark".to_string(), Value::Bool(true));
        props.insert("value".to_string(), Value::Int(10));
        props.insert("npcState".to_string(), Value::String("idle".to_string()));
        let json = serde_json::to_string(&props).unwrap();
        assert_eq!(json, r#"{"isDark":true,"npcState":"idle","value":10}"#);
        let back: Properties = serde_json::from_str(&json).unwrap();
        assert_eq!(back, props);
    }

    #[test]
    fn traceability_omits_false_truncation() {
        let t = Traceability {
            index: 3,
            message_index: None,
            flags: vec!["lit".to_string()],
            name_truncated: false,
        };
        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("nameTruncated"));
    }
}
