use std::fmt;

use uuid::Uuid;

// Hand-written Display/Error impls: `#[derive(thiserror::Error)]` treats any
// field literally named `source` as the error source and requires it to be an
// `std::error::Error`, which the `Uuid` fields below are not.
#[derive(Debug)]
pub enum ServiceError {
    NotFound {
        entity: String,
        id: Uuid,
    },

    DuplicateIdentity {
        entity: String,
        id: Uuid,
    },

    EntityNotRegistered(String),

    AttributeNotFound {
        entity: String,
        attribute: String,
    },

    RelationshipNotFound(String),

    ChoicesNotFound(String),

    AssociationExists {
        relationship: String,
        source: Uuid,
        target: Uuid,
    },

    AssociationNotFound {
        relationship: String,
        source: Uuid,
        target: Uuid,
    },

    TypeMismatch(String),

    Malformed {
        node: String,
        reason: String,
    },

    UnsupportedCommand(String),

    PrerequisiteLoop {
        chain: Vec<String>,
    },

    InvalidBatch(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => {
                write!(f, "Record '{entity}' with id '{id}' not found")
            }
            Self::DuplicateIdentity { entity, id } => {
                write!(f, "Record '{entity}' with id '{id}' already exists")
            }
            Self::EntityNotRegistered(name) => {
                write!(f, "Record type '{name}' is not registered")
            }
            Self::AttributeNotFound { entity, attribute } => {
                write!(f, "Attribute '{attribute}' not found on record type '{entity}'")
            }
            Self::RelationshipNotFound(name) => {
                write!(f, "Relationship '{name}' is not registered")
            }
            Self::ChoicesNotFound(name) => {
                write!(f, "Choice list '{name}' is not registered")
            }
            Self::AssociationExists {
                relationship,
                source,
                target,
            } => {
                write!(
                    f,
                    "Association '{relationship}' between '{source}' and '{target}' already exists"
                )
            }
            Self::AssociationNotFound {
                relationship,
                source,
                target,
            } => {
                write!(
                    f,
                    "Association '{relationship}' between '{source}' and '{target}' not found"
                )
            }
            Self::TypeMismatch(detail) => write!(f, "Type mismatch: {detail}"),
            Self::Malformed { node, reason } => {
                write!(f, "Malformed input at '{node}': {reason}")
            }
            Self::UnsupportedCommand(name) => write!(f, "Unsupported command: {name}"),
            Self::PrerequisiteLoop { chain } => {
                write!(f, "Prerequisite loop: {}", chain.join(" -> "))
            }
            Self::InvalidBatch(detail) => write!(f, "Invalid batch: {detail}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Shorthand for a malformed-input error naming the offending fragment.
    pub fn malformed(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
