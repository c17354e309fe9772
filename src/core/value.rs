use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::record::RecordRef;
use crate::core::{Result, ServiceError};

/// A single attribute value. Everything a record can hold is one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Currency amount. Kept separate from Float so metadata can tell them apart.
    Money(f64),
    /// Code from a registered choice list.
    Choice(i64),
    MultiChoice(Vec<i64>),
    Timestamp(DateTime<Utc>),
    Id(Uuid),
    Reference(RecordRef),
}

impl Value {
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            // ========================================
            // NULL handling: NULL sorts after all values (NULL LAST)
            // ========================================
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Greater),
            (_, Value::Null) => Ok(Ordering::Less),

            // ========================================
            // Same type comparisons
            // ========================================
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Choice(a), Value::Choice(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Ok(a.cmp(b)),
            (Value::Id(a), Value::Id(b)) => Ok(a.cmp(b)),
            (Value::Reference(a), Value::Reference(b)) => Ok(a.id.cmp(&b.id)),
            (Value::MultiChoice(a), Value::MultiChoice(b)) => Ok(a.cmp(b)),

            // References and plain identifiers are interchangeable in
            // comparisons: both resolve to the 128-bit identity.
            (Value::Id(a), Value::Reference(b)) => Ok(a.cmp(&b.id)),
            (Value::Reference(a), Value::Id(b)) => Ok(a.id.cmp(b)),

            // ========================================
            // Numeric family (implicit coercion)
            // ========================================
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => Ok(cmp_f64(x, y)),
                    _ => Err(ServiceError::TypeMismatch(format!(
                        "Cannot compare incompatible types: {} and {}",
                        a.type_name(),
                        b.type_name()
                    ))),
                }
            }

            // ========================================
            // Text operands coerce against the other side's kind. Query
            // documents carry literals as text; the stored value decides
            // how they are read.
            // ========================================
            (Value::Text(s), b) => coerce_text(s, b)?.compare(b),
            (a, Value::Text(s)) => a.compare(&coerce_text(s, a)?),

            _ => Err(ServiceError::TypeMismatch(format!(
                "Cannot compare incompatible types: {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Money(_) => "MONEY",
            Self::Choice(_) => "CHOICE",
            Self::MultiChoice(_) => "MULTICHOICE",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Id(_) => "ID",
            Self::Reference(_) => "REFERENCE",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Choice(c) => Some(*c),
            Self::Float(f) | Self::Money(f) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) | Self::Money(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            Self::Choice(c) => Some(*c as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Reference(r) => Some(r.id),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Integer(_) | Self::Float(_) | Self::Money(_) | Self::Choice(_)
        )
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    // NaN is considered equal to NaN, greater than all other values
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Reads a text literal in the shape of `template`'s kind.
fn coerce_text(s: &str, template: &Value) -> Result<Value> {
    let mismatch = |expected: &str| {
        ServiceError::TypeMismatch(format!("Cannot read '{}' as {}", s, expected))
    };
    match template {
        Value::Integer(_) => s
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| mismatch("INTEGER")),
        Value::Float(_) => s
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| mismatch("FLOAT")),
        Value::Money(_) => s
            .parse::<f64>()
            .map(Value::Money)
            .map_err(|_| mismatch("MONEY")),
        Value::Choice(_) => s
            .parse::<i64>()
            .map(Value::Choice)
            .map_err(|_| mismatch("CHOICE")),
        Value::Boolean(_) => match s {
            "true" | "1" => Ok(Value::Boolean(true)),
            "false" | "0" => Ok(Value::Boolean(false)),
            _ => Err(mismatch("BOOLEAN")),
        },
        Value::Timestamp(_) => DateTime::parse_from_rfc3339(s)
            .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
            .map_err(|_| mismatch("TIMESTAMP")),
        Value::Id(_) | Value::Reference(_) => Uuid::parse_str(s)
            .map(Value::Id)
            .map_err(|_| mismatch("ID")),
        other => Err(mismatch(other.type_name())),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Choice(a), Self::Choice(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Id(a), Self::Id(b)) => a == b,
            (Self::Reference(a), Self::Reference(b)) => a == b,
            (Self::MultiChoice(a), Self::MultiChoice(b)) => a == b,
            (Self::Id(a), Self::Reference(b)) | (Self::Reference(b), Self::Id(a)) => *a == b.id,
            (Self::Float(a), Self::Float(b)) | (Self::Money(a), Self::Money(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            // Numeric family equality follows the comparison coercion
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
                _ => false,
            },
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            Self::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Self::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Self::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
            Self::Text(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Self::Money(m) => {
                5u8.hash(state);
                m.to_bits().hash(state);
            }
            Self::Choice(c) => {
                6u8.hash(state);
                c.hash(state);
            }
            Self::MultiChoice(cs) => {
                7u8.hash(state);
                cs.hash(state);
            }
            Self::Timestamp(t) => {
                8u8.hash(state);
                t.hash(state);
            }
            Self::Id(id) => {
                9u8.hash(state);
                id.hash(state);
            }
            Self::Reference(r) => {
                10u8.hash(state);
                r.entity.hash(state);
                r.id.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) | Self::Money(fl) => {
                if fl.is_nan() {
                    write!(f, "NaN")
                } else if fl.is_infinite() {
                    if *fl > 0.0 {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else {
                    write!(f, "{}", fl)
                }
            }
            Self::Text(s) => write!(f, "{}", s),
            Self::Choice(c) => write!(f, "{}", c),
            Self::MultiChoice(cs) => {
                let parts: Vec<String> = cs.iter().map(|c| c.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Id(id) => write!(f, "{}", id),
            Self::Reference(r) => write!(f, "{}({})", r.entity, r.id),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

impl From<RecordRef> for Value {
    fn from(r: RecordRef) -> Self {
        Self::Reference(r)
    }
}
