use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::Value;

/// Attribute names the engine stamps itself.
pub mod fields {
    pub const CREATED_AT: &str = "created_at";
    pub const CREATED_BY: &str = "created_by";
    pub const MODIFIED_AT: &str = "modified_at";
    pub const MODIFIED_BY: &str = "modified_by";
    pub const OWNER_ID: &str = "owner_id";
    pub const OWNING_UNIT: &str = "owning_unit";
    pub const STATE: &str = "state";
    pub const STATUS: &str = "status";
    pub const DISABLED: &str = "disabled";
}

static NULL_VALUE: Value = Value::Null;

/// Pointer to a record: logical type name plus 128-bit identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub entity: String,
    pub id: Uuid,
}

impl RecordRef {
    pub fn new(entity: impl Into<String>, id: Uuid) -> Self {
        Self {
            entity: entity.into(),
            id,
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.entity, self.id)
    }
}

/// A typed record: logical name, identity and a named attribute map.
///
/// A nil identity means the record has not been saved yet; the store assigns
/// one on create. `related` carries child records keyed by relationship name,
/// consumed when the record is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub entity: String,
    pub id: Uuid,
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub related: BTreeMap<String, Vec<Record>>,
}

impl Record {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: Uuid::nil(),
            attributes: BTreeMap::new(),
            related: BTreeMap::new(),
        }
    }

    pub fn with_id(entity: impl Into<String>, id: Uuid) -> Self {
        Self {
            entity: entity.into(),
            id,
            attributes: BTreeMap::new(),
            related: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter for fixture construction.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attribute lookup where absence reads as null.
    pub fn attribute(&self, name: &str) -> &Value {
        self.attributes.get(name).unwrap_or(&NULL_VALUE)
    }

    pub fn get_reference(&self, name: &str) -> Option<&RecordRef> {
        match self.attributes.get(name) {
            Some(Value::Reference(r)) => Some(r),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn is_unsaved(&self) -> bool {
        self.id.is_nil()
    }

    pub fn reference(&self) -> RecordRef {
        RecordRef::new(self.entity.clone(), self.id)
    }

    pub fn add_related(&mut self, relationship: impl Into<String>, record: Record) {
        self.related
            .entry(relationship.into())
            .or_default()
            .push(record);
    }
}
