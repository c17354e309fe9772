use serde::{Deserialize, Serialize};

/// One half of a many-to-many link: the participating type and the
/// intersect attribute holding its reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSide {
    pub entity: String,
    pub field: String,
}

impl RelationshipSide {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
        }
    }
}

/// A registered relationship between two record types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationshipDef {
    /// The many side carries a reference attribute pointing at the one side.
    OneToMany {
        name: String,
        one_entity: String,
        many_entity: String,
        reference_field: String,
    },
    /// Links are rows of a dedicated intersect type, one per pair.
    ManyToMany {
        name: String,
        intersect: String,
        side_a: RelationshipSide,
        side_b: RelationshipSide,
    },
}

impl RelationshipDef {
    pub fn one_to_many(
        name: impl Into<String>,
        one_entity: impl Into<String>,
        many_entity: impl Into<String>,
        reference_field: impl Into<String>,
    ) -> Self {
        Self::OneToMany {
            name: name.into(),
            one_entity: one_entity.into(),
            many_entity: many_entity.into(),
            reference_field: reference_field.into(),
        }
    }

    pub fn many_to_many(
        name: impl Into<String>,
        intersect: impl Into<String>,
        side_a: RelationshipSide,
        side_b: RelationshipSide,
    ) -> Self {
        Self::ManyToMany {
            name: name.into(),
            intersect: intersect.into(),
            side_a,
            side_b,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::OneToMany { name, .. } => name,
            Self::ManyToMany { name, .. } => name,
        }
    }
}
