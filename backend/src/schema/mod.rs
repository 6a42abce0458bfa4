//! Property schema: the declarative description of every simulated quantity
//!
//! A schema is a list of [`PropertyDefinition`]s. Each definition declares
//! zero or more instances; an instance pins the definition to one entity
//! class and one lifecycle phase. The [`InstanceRegistry`] flattens the
//! schema, resolves influence factors and orders the instances so that every
//! factor is computed before the instances it influences.
//!
//! # Critical Invariants
//!
//! 1. Enum instances always carry at least one value, with one portion per value
//! 2. Range instances always satisfy `min < max`
//! 3. Every influence factor resolves to a range instance of the same entity
//! 4. The sorted instance list never places an instance before one of its factors

mod hash;
pub mod instance;
pub mod registry;
mod sort;

pub use hash::compute_schema_hash;
pub use instance::{
    EnumChoice, Influence, InstanceDecl, PropertyDefinition, PropertyInstance, ValueKind,
    ValueProp,
};
pub use registry::{InstanceRegistry, ResolvedInfluence};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Simulated subject class a value applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    System,
    Tasks,
    Workers,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::System => "system",
            Entity::Tasks => "tasks",
            Entity::Workers => "workers",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage at which a value is computed
///
/// Variant order is the simulated temporal order and drives dependency
/// resolution: an instance may only be influenced by instances of the same
/// or an earlier phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Deploy,
    Activity,
    Arrive,
    Assign,
    Complete,
}

impl Phase {
    /// All phases in temporal order
    pub const ALL: [Phase; 5] = [
        Phase::Deploy,
        Phase::Activity,
        Phase::Arrive,
        Phase::Assign,
        Phase::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Deploy => "deploy",
            Phase::Activity => "activity",
            Phase::Arrive => "arrive",
            Phase::Assign => "assign",
            Phase::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a computed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Integer,
    Number,
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Number => "number",
            DataType::String => "string",
        };
        f.write_str(s)
    }
}

/// Raw expression kind as written in schema documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expr {
    Enum,
    Range,
}

/// Shape of a continuous distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    #[default]
    Uniform,
    Bell,
}

/// How an influence factor alters the influenced distribution
///
/// Only `Shift` has defined semantics. `Skew` and `Focus` are accepted in
/// schema documents and contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Shift,
    Skew,
    Focus,
}

/// Fatal schema errors, raised while building the [`InstanceRegistry`]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Enum property '{name}' declares no values")]
    MissingValues { name: String },

    #[error("Range property '{name}' is missing its min/max bounds")]
    MissingBounds { name: String },

    #[error("Range property '{name}' has min {min} not below max {max}")]
    InvalidRange { name: String, min: f64, max: f64 },

    #[error("Property '{name}' has {values} values but {portions} value props")]
    PortionMismatch {
        name: String,
        values: usize,
        portions: usize,
    },

    #[error("Property '{name}' value '{value}' is not a valid {data_type}")]
    InvalidEnumValue {
        name: String,
        value: String,
        data_type: DataType,
    },

    #[error("Range property '{name}' cannot produce {data_type} values")]
    IncompatibleDataType { name: String, data_type: DataType },

    #[error("Property '{name}' requests zero values")]
    ZeroValueCount { name: String },

    #[error("Duplicate instance '{inst_name}' for {entity} in phase {phase}")]
    DuplicateInstance {
        inst_name: String,
        entity: Entity,
        phase: Phase,
    },

    #[error("Unknown instance '{inst_name}'")]
    UnknownInstance { inst_name: String },

    #[error("Instance '{instance}' has malformed factor '{factor}' (expected '<property>.<instance>')")]
    MalformedFactor { instance: String, factor: String },

    #[error("Instance '{instance}' references unknown factor '{factor}'")]
    UnknownFactor { instance: String, factor: String },

    #[error("Instance '{instance}' factor '{factor}' is not a range instance")]
    NonRangeFactor { instance: String, factor: String },

    #[error("Instance '{instance}' factor '{factor}' produces a list of values")]
    MultiValueFactor { instance: String, factor: String },

    #[error("Instance '{instance}' factor '{factor}' belongs to another entity")]
    CrossEntityFactor { instance: String, factor: String },

    #[error("Circular or missing dependency in phase {phase}: {}", .unplaced.join(", "))]
    CircularDependency { phase: Phase, unplaced: Vec<String> },
}
