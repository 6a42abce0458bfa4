//! Property definitions and their computable instances
//!
//! Schema documents are camelCase JSON. A definition carries the shared
//! fields (data type, expression, values, bounds) and a list of instance
//! declarations; each declaration may override the curve, bounds, value
//! count, attribute flag, value props and influences of its definition.
//!
//! # Example
//!
//! ```
//! use contact_simulator_core_rs::schema::{PropertyDefinition, ValueKind};
//!
//! let json = r#"{
//!   "name": "talkTime",
//!   "dataType": "integer",
//!   "expr": "range",
//!   "min": 60,
//!   "max": 600,
//!   "instances": [
//!     { "instName": "talkTime", "entity": "tasks", "phase": "assign", "curve": "bell" }
//!   ]
//! }"#;
//! let def: PropertyDefinition = serde_json::from_str(json).unwrap();
//! let instances = def.flatten().unwrap();
//! assert!(matches!(instances[0].kind, ValueKind::Range { min, .. } if min == 60.0));
//! ```

use crate::schema::{ConfigError, Curve, DataType, Effect, Entity, Expr, Phase};
use crate::store::PropertyValue;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Typed instance
// ============================================================================

/// One weighted choice of an enum instance
#[derive(Debug, Clone, PartialEq)]
pub struct EnumChoice {
    pub value: PropertyValue,
    /// Selection weight in [0, 1]; weights of one instance should sum to 1
    pub portion: f64,
    /// Base dwell time in seconds, used by activity transitions
    pub base_dur: Option<f64>,
}

/// How an instance produces values
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Discrete weighted choice
    Enum { choices: Vec<EnumChoice> },
    /// Continuous value bounded by `min`/`max`
    Range {
        min: f64,
        max: f64,
        curve: Curve,
        /// Skew-normal shape parameter for bell curves; 0 means symmetric
        skew: f64,
    },
}

/// A declared statistical dependency on another instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    /// `"<property name>.<instance name>"`
    pub factor: String,
    #[serde(default)]
    pub effect: Effect,
    #[serde(deserialize_with = "number_or_string")]
    pub amount: f64,
}

/// One concrete, computable occurrence of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInstance", into = "RawInstance")]
pub struct PropertyInstance {
    /// Owning property name
    pub name: String,
    /// Dotted instance path, e.g. `routing.level`
    pub inst_name: String,
    pub data_type: DataType,
    pub entity: Entity,
    pub phase: Phase,
    pub kind: ValueKind,
    /// 1 for a scalar, more for a deduplicated list
    pub value_cnt: usize,
    /// Exported as an entity attribute
    pub is_attribute: bool,
    pub influences: Vec<Influence>,
}

impl PropertyInstance {
    /// Midpoint of a range instance's bounds
    pub fn midpoint(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Range { min, max, .. } => Some((min + max) / 2.0),
            ValueKind::Enum { .. } => None,
        }
    }

    /// Enum choices, empty for range instances
    pub fn choices(&self) -> &[EnumChoice] {
        match &self.kind {
            ValueKind::Enum { choices } => choices,
            ValueKind::Range { .. } => &[],
        }
    }

    /// `"<name>.<inst_name>"`, the form used by influence factors
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.name, self.inst_name)
    }
}

// ============================================================================
// Raw (document) form
// ============================================================================

/// Per-value parameters of an enum property, parallel to `values`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueProp {
    pub portion: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dur: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstance {
    #[serde(default)]
    name: Option<String>,
    inst_name: String,
    data_type: DataType,
    expr: Expr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    entity: Entity,
    phase: Phase,
    #[serde(default)]
    curve: Curve,
    #[serde(default)]
    skew: f64,
    #[serde(default)]
    is_attribute: bool,
    #[serde(default)]
    influences: Vec<Influence>,
    #[serde(default = "default_value_cnt")]
    value_cnt: usize,
    #[serde(default, alias = "valueParams", skip_serializing_if = "Option::is_none")]
    value_props: Option<Vec<ValueProp>>,
}

fn default_value_cnt() -> usize {
    1
}

impl TryFrom<RawInstance> for PropertyInstance {
    type Error = ConfigError;

    fn try_from(raw: RawInstance) -> Result<Self, Self::Error> {
        let name = raw.name.unwrap_or_else(|| raw.inst_name.clone());

        if raw.value_cnt == 0 {
            return Err(ConfigError::ZeroValueCount { name });
        }

        let kind = match raw.expr {
            Expr::Enum => {
                if raw.values.is_empty() {
                    return Err(ConfigError::MissingValues { name });
                }
                let props = match raw.value_props {
                    Some(props) => {
                        if props.len() != raw.values.len() {
                            return Err(ConfigError::PortionMismatch {
                                name,
                                values: raw.values.len(),
                                portions: props.len(),
                            });
                        }
                        props
                    }
                    // Missing props: equal weights
                    None => {
                        let portion = 1.0 / raw.values.len() as f64;
                        vec![
                            ValueProp {
                                portion,
                                base_dur: None
                            };
                            raw.values.len()
                        ]
                    }
                };
                let mut choices = Vec::with_capacity(raw.values.len());
                for (value, prop) in raw.values.iter().zip(props) {
                    let parsed = PropertyValue::parse(value, raw.data_type).ok_or_else(|| {
                        ConfigError::InvalidEnumValue {
                            name: name.clone(),
                            value: value.clone(),
                            data_type: raw.data_type,
                        }
                    })?;
                    choices.push(EnumChoice {
                        value: parsed,
                        portion: prop.portion,
                        base_dur: prop.base_dur,
                    });
                }
                ValueKind::Enum { choices }
            }
            Expr::Range => {
                if matches!(raw.data_type, DataType::String | DataType::Boolean) {
                    return Err(ConfigError::IncompatibleDataType {
                        name,
                        data_type: raw.data_type,
                    });
                }
                let (min, max) = match (raw.min, raw.max) {
                    (Some(min), Some(max)) => (min, max),
                    _ => return Err(ConfigError::MissingBounds { name }),
                };
                if !(min < max) {
                    return Err(ConfigError::InvalidRange { name, min, max });
                }
                ValueKind::Range {
                    min,
                    max,
                    curve: raw.curve,
                    skew: raw.skew,
                }
            }
        };

        Ok(PropertyInstance {
            name,
            inst_name: raw.inst_name,
            data_type: raw.data_type,
            entity: raw.entity,
            phase: raw.phase,
            kind,
            value_cnt: raw.value_cnt,
            is_attribute: raw.is_attribute,
            influences: raw.influences,
        })
    }
}

impl From<PropertyInstance> for RawInstance {
    fn from(inst: PropertyInstance) -> Self {
        let (expr, values, value_props, min, max, curve, skew) = match inst.kind {
            ValueKind::Enum { choices } => {
                let values = choices.iter().map(|c| c.value.to_string()).collect();
                let props = choices
                    .into_iter()
                    .map(|c| ValueProp {
                        portion: c.portion,
                        base_dur: c.base_dur,
                    })
                    .collect();
                (Expr::Enum, values, Some(props), None, None, Curve::Uniform, 0.0)
            }
            ValueKind::Range {
                min,
                max,
                curve,
                skew,
            } => (Expr::Range, Vec::new(), None, Some(min), Some(max), curve, skew),
        };
        RawInstance {
            name: Some(inst.name),
            inst_name: inst.inst_name,
            data_type: inst.data_type,
            expr,
            values,
            min,
            max,
            entity: inst.entity,
            phase: inst.phase,
            curve,
            skew,
            is_attribute: inst.is_attribute,
            influences: inst.influences,
            value_cnt: inst.value_cnt,
            value_props,
        }
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Instance declaration nested in a [`PropertyDefinition`]
///
/// Every optional field falls back to the owning definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inst_name: Option<String>,
    pub entity: Entity,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skew: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_cnt: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_attribute: Option<bool>,
    #[serde(default, alias = "valueParams", skip_serializing_if = "Option::is_none")]
    pub value_props: Option<Vec<ValueProp>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influences: Option<Vec<Influence>>,
}

/// Declarative description of one measurable quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub name: String,
    pub data_type: DataType,
    pub expr: Expr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skew: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_cnt: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_attribute: Option<bool>,
    #[serde(default, alias = "valueParams", skip_serializing_if = "Option::is_none")]
    pub value_props: Option<Vec<ValueProp>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influences: Option<Vec<Influence>>,
    #[serde(default)]
    pub instances: Vec<InstanceDecl>,
}

impl PropertyDefinition {
    /// Merge each instance declaration with this definition
    ///
    /// Instance fields take precedence over definition fields. An instance
    /// without `instName` takes the definition name.
    pub fn flatten(&self) -> Result<Vec<PropertyInstance>, ConfigError> {
        self.instances
            .iter()
            .map(|decl| {
                let raw = RawInstance {
                    name: Some(self.name.clone()),
                    inst_name: decl.inst_name.clone().unwrap_or_else(|| self.name.clone()),
                    data_type: self.data_type,
                    expr: self.expr,
                    values: self.values.clone(),
                    min: decl.min.or(self.min),
                    max: decl.max.or(self.max),
                    entity: decl.entity,
                    phase: decl.phase,
                    curve: decl.curve.or(self.curve).unwrap_or_default(),
                    skew: decl.skew.or(self.skew).unwrap_or(0.0),
                    is_attribute: decl.is_attribute.or(self.is_attribute).unwrap_or(false),
                    influences: decl
                        .influences
                        .clone()
                        .or_else(|| self.influences.clone())
                        .unwrap_or_default(),
                    value_cnt: decl.value_cnt.or(self.value_cnt).unwrap_or(1),
                    value_props: decl.value_props.clone().or_else(|| self.value_props.clone()),
                };
                PropertyInstance::try_from(raw)
            })
            .collect()
    }
}

/// Influence amounts appear both as numbers and as numeric strings ("0.20")
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid influence amount '{}'", s))),
    }
}
