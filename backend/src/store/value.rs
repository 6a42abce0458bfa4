//! Computed property values

use crate::schema::DataType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One computed value: a scalar, or a list of scalars for multi-value instances
///
/// Serialised untagged, so a stored value reads as plain JSON
/// (`42`, `"Busy"`, `["sales", "support"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Parse a schema-declared enum value as the given data type
    pub fn parse(raw: &str, data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Boolean => raw.parse().ok().map(PropertyValue::Bool),
            DataType::Integer => raw.parse().ok().map(PropertyValue::Int),
            DataType::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(PropertyValue::Number),
            DataType::String => Some(PropertyValue::Text(raw.to_string())),
        }
    }

    /// Numeric view used by influence math; `None` for text, booleans and lists
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(n) => Some(*n as f64),
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Int(n) => Value::from(*n),
            PropertyValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropertyValue::Text(s) => Value::String(s.clone()),
            PropertyValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(n) => write!(f, "{}", n),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&PropertyValue> for Value {
    fn from(value: &PropertyValue) -> Self {
        value.to_json()
    }
}
