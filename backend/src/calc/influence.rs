//! Influence Resolver
//!
//! A shift influence moves the mean of a bell-curve instance by
//! `(observed - factor midpoint) * amount`, summed over all shift
//! influences. The observed value is read from the store for the same
//! entity and id, so the factor must already have been computed.

use crate::calc::{CalcError, ValuesDescriptor};
use crate::schema::{Effect, InstanceRegistry};
use crate::store::ValueStore;

/// Total mean shift for the instance at `index`
pub(crate) fn mean_shift(
    registry: &InstanceRegistry,
    index: usize,
    store: &ValueStore,
    descriptor: &ValuesDescriptor,
) -> Result<f64, CalcError> {
    let mut shift = 0.0;

    for influence in registry.influences_of(index) {
        if influence.effect != Effect::Shift {
            continue;
        }

        let factor = registry
            .get(influence.factor)
            .ok_or_else(|| CalcError::UnknownInstance(format!("#{}", influence.factor)))?;
        let midpoint = factor
            .midpoint()
            .ok_or_else(|| CalcError::NonNumericFactorValue {
                factor: factor.qualified_name(),
                id: descriptor.id.clone(),
            })?;

        let observed = store
            .get(descriptor.entity, &descriptor.id, &factor.inst_name)
            .ok_or_else(|| CalcError::MissingFactorValue {
                factor: factor.qualified_name(),
                id: descriptor.id.clone(),
            })?
            .as_f64()
            .ok_or_else(|| CalcError::NonNumericFactorValue {
                factor: factor.qualified_name(),
                id: descriptor.id.clone(),
            })?;

        shift += (observed - midpoint) * influence.amount;
    }

    Ok(shift)
}
