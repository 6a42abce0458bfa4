//! Value Calculator
//!
//! Samples one value for one property instance:
//!
//! - **Enum**: weighted first-match over the declared portions
//! - **Range / uniform**: `min + u * (max - min)`
//! - **Range / bell**: normal around the midpoint plus the influence shift,
//!   standard deviation half the interval width, optional skew
//!
//! Integer instances are rounded to the nearest integer. Instances with
//! `valueCnt > 1` draw exactly `valueCnt` samples and keep the distinct ones
//! in first-drawn order; the list may come out shorter than `valueCnt`.

mod influence;
pub(crate) mod sampling;

use crate::rng::RngManager;
use crate::schema::{Curve, DataType, Entity, InstanceRegistry, Phase, ValueKind};
use crate::store::{PropertyValue, ValueStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request for one calculation batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuesDescriptor {
    pub entity: Entity,
    pub phase: Phase,
    /// Caller-chosen key of the simulated subject (customer name, worker id)
    pub id: String,
}

impl ValuesDescriptor {
    pub fn new(entity: Entity, phase: Phase, id: impl Into<String>) -> Self {
        Self {
            entity,
            phase,
            id: id.into(),
        }
    }
}

/// Errors raised while calculating a value
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    #[error("Unknown instance: {0}")]
    UnknownInstance(String),

    #[error("Enum instance '{0}' has no choices")]
    EmptyEnum(String),

    #[error("Factor '{factor}' has no computed value for '{id}'")]
    MissingFactorValue { factor: String, id: String },

    #[error("Factor '{factor}' value for '{id}' is not numeric")]
    NonNumericFactorValue { factor: String, id: String },
}

/// Calculate the value of the instance at `index` for `descriptor`
///
/// Reads factor values from `store` but does not write to it.
pub fn calculate(
    registry: &InstanceRegistry,
    index: usize,
    store: &ValueStore,
    descriptor: &ValuesDescriptor,
    rng: &mut RngManager,
) -> Result<PropertyValue, CalcError> {
    let instance = registry
        .get(index)
        .ok_or_else(|| CalcError::UnknownInstance(format!("#{}", index)))?;

    if instance.value_cnt > 1 {
        let mut values: Vec<PropertyValue> = Vec::with_capacity(instance.value_cnt);
        for _ in 0..instance.value_cnt {
            let value = calculate_scalar(registry, index, store, descriptor, rng)?;
            if !values.contains(&value) {
                values.push(value);
            }
        }
        return Ok(PropertyValue::List(values));
    }

    calculate_scalar(registry, index, store, descriptor, rng)
}

fn calculate_scalar(
    registry: &InstanceRegistry,
    index: usize,
    store: &ValueStore,
    descriptor: &ValuesDescriptor,
    rng: &mut RngManager,
) -> Result<PropertyValue, CalcError> {
    let instance = registry
        .get(index)
        .ok_or_else(|| CalcError::UnknownInstance(format!("#{}", index)))?;

    match &instance.kind {
        ValueKind::Enum { choices } => sampling::pick_weighted(choices, rng.next_f64())
            .map(|choice| choice.value.clone())
            .ok_or_else(|| CalcError::EmptyEnum(instance.qualified_name())),
        ValueKind::Range {
            min,
            max,
            curve,
            skew,
        } => {
            let raw = match curve {
                Curve::Uniform => sampling::sample_uniform(*min, *max, rng),
                Curve::Bell => {
                    let shift = influence::mean_shift(registry, index, store, descriptor)?;
                    let mean = (min + max) / 2.0 + shift;
                    let std_dev = (max - min) / 2.0;
                    sampling::sample_bell(mean, std_dev, *skew, rng)
                }
            };
            Ok(match instance.data_type {
                DataType::Integer => PropertyValue::Int(raw.round() as i64),
                _ => PropertyValue::Number(raw),
            })
        }
    }
}
