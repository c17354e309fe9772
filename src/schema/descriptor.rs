use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Result, ServiceError, Value};

/// Declared kind of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    Text,
    Integer,
    Float,
    Boolean,
    Money,
    Choice,
    MultiChoice,
    Timestamp,
    Id,
    /// Pointer to another record type.
    Reference { target: String },
}

impl AttributeKind {
    pub fn reference(target: impl Into<String>) -> Self {
        Self::Reference {
            target: target.into(),
        }
    }

    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Money, Value::Money(_)) => true,
            (Self::Money, Value::Float(_)) => true,
            (Self::Money, Value::Integer(_)) => true,
            (Self::Choice, Value::Choice(_)) => true,
            (Self::Choice, Value::Integer(_)) => true,
            (Self::MultiChoice, Value::MultiChoice(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Id, Value::Id(_)) => true,
            (Self::Reference { target }, Value::Reference(r)) => r.entity == *target,
            _ => false,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "TEXT"),
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Money => write!(f, "MONEY"),
            Self::Choice => write!(f, "CHOICE"),
            Self::MultiChoice => write!(f, "MULTICHOICE"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Id => write!(f, "ID"),
            Self::Reference { target } => write!(f, "REFERENCE({})", target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: AttributeKind,
    pub required: bool,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            if self.required {
                return Err(ServiceError::malformed(
                    self.name.clone(),
                    "required attribute cannot be null",
                ));
            }
            return Ok(());
        }

        if !self.kind.is_compatible(value) {
            return Err(ServiceError::TypeMismatch(format!(
                "Attribute '{}' expects {}, got {}",
                self.name,
                self.kind,
                value.type_name()
            )));
        }

        Ok(())
    }
}

/// How a type models being switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActiveStatePolicy {
    /// The type has no lifecycle state at all.
    #[default]
    None,
    /// A boolean `disabled` attribute, false on create.
    DisabledFlag,
    /// A `state`/`status` code pair, 0/1 on create.
    StateStatus,
}

/// Opt-in composite display-name derivation from two name parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamePartsSpec {
    pub first: String,
    pub last: String,
    pub target: String,
}

impl Default for NamePartsSpec {
    fn default() -> Self {
        Self {
            first: "first_name".to_string(),
            last: "last_name".to_string(),
            target: "full_name".to_string(),
        }
    }
}

/// Everything the engine knows about one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub logical_name: String,
    pub primary_key: String,
    pub attributes: Vec<AttributeDescriptor>,
    pub active_state: ActiveStatePolicy,
    pub name_parts: Option<NamePartsSpec>,
    pub alternate_key: Option<Vec<String>>,
}

impl EntityDescriptor {
    pub fn new(logical_name: impl Into<String>) -> Self {
        let logical_name = logical_name.into();
        let primary_key = format!("{}_id", logical_name);
        Self {
            logical_name,
            primary_key,
            attributes: Vec::new(),
            active_state: ActiveStatePolicy::None,
            name_parts: None,
            alternate_key: None,
        }
    }

    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    pub fn attribute(mut self, descriptor: AttributeDescriptor) -> Self {
        self.attributes.push(descriptor);
        self
    }

    pub fn active_state(mut self, policy: ActiveStatePolicy) -> Self {
        self.active_state = policy;
        self
    }

    pub fn name_parts(mut self, spec: NamePartsSpec) -> Self {
        self.name_parts = Some(spec);
        self
    }

    pub fn alternate_key(mut self, attributes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.alternate_key = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Declared reference attributes as (field name, target type) pairs.
    pub fn reference_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|a| match &a.kind {
            AttributeKind::Reference { target } => Some((a.name.as_str(), target.as_str())),
            _ => None,
        })
    }
}

/// A named option set: codes with display labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceList {
    pub name: String,
    pub options: Vec<(i64, String)>,
}

impl ChoiceList {
    pub fn new(
        name: impl Into<String>,
        options: impl IntoIterator<Item = (i64, impl Into<String>)>,
    ) -> Self {
        Self {
            name: name.into(),
            options: options
                .into_iter()
                .map(|(code, label)| (code, label.into()))
                .collect(),
        }
    }

    pub fn label_of(&self, code: i64) -> Option<&str> {
        self.options
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, l)| l.as_str())
    }
}
