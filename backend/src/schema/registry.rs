//! Instance Registry
//!
//! Flattens a schema into one list of [`PropertyInstance`]s, resolves every
//! influence factor to a direct index and keeps the list in dependency order.
//! Built once per simulation run; read-only afterwards.

use crate::schema::hash::compute_schema_hash;
use crate::schema::sort::sort_by_dependencies;
use crate::schema::{
    ConfigError, Effect, Entity, Phase, PropertyDefinition, PropertyInstance, ValueKind,
};
use std::collections::HashSet;
use tracing::{info, warn};

/// An influence whose factor has been resolved to a registry index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedInfluence {
    /// Index of the factor instance in [`InstanceRegistry::instances`]
    pub factor: usize,
    pub effect: Effect,
    pub amount: f64,
}

/// Dependency-ordered list of property instances
///
/// # Example
///
/// ```
/// use contact_simulator_core_rs::schema::{InstanceRegistry, PropertyInstance};
///
/// let instances: Vec<PropertyInstance> = serde_json::from_str(r#"[
///   { "instName": "wrapTime", "dataType": "integer", "expr": "range", "min": 0, "max": 60,
///     "entity": "tasks", "phase": "complete", "curve": "bell",
///     "influences": [{ "factor": "talkTime.talkTime", "effect": "shift", "amount": 0.5 }] },
///   { "instName": "talkTime", "dataType": "integer", "expr": "range", "min": 60, "max": 600,
///     "entity": "tasks", "phase": "complete", "curve": "bell" }
/// ]"#).unwrap();
///
/// let registry = InstanceRegistry::new(instances).unwrap();
/// let names: Vec<&str> = registry.instances().iter().map(|i| i.inst_name.as_str()).collect();
/// assert_eq!(names, vec!["talkTime", "wrapTime"]);
/// ```
#[derive(Debug, Clone)]
pub struct InstanceRegistry {
    /// Instances in computation order
    instances: Vec<PropertyInstance>,

    /// Resolved influences, parallel to `instances`
    influences: Vec<Vec<ResolvedInfluence>>,
}

impl InstanceRegistry {
    /// Build a registry from already-flattened instances
    pub fn new(instances: Vec<PropertyInstance>) -> Result<Self, ConfigError> {
        check_duplicates(&instances)?;

        let mut resolved = Vec::with_capacity(instances.len());
        for inst in &instances {
            resolved.push(resolve_influences(inst, &instances)?);
        }

        let deps: Vec<Vec<usize>> = resolved
            .iter()
            .map(|infs| infs.iter().map(|r| r.factor).collect())
            .collect();
        let order = sort_by_dependencies(&instances, &deps)?;

        // Old index -> position in the sorted list
        let mut position = vec![0usize; instances.len()];
        for (pos, &old) in order.iter().enumerate() {
            position[old] = pos;
        }

        let mut slots: Vec<Option<PropertyInstance>> = instances.into_iter().map(Some).collect();
        let mut sorted = Vec::with_capacity(order.len());
        let mut sorted_influences = Vec::with_capacity(order.len());
        for &old in &order {
            if let Some(inst) = slots[old].take() {
                sorted.push(inst);
            }
            let remapped = resolved[old]
                .iter()
                .map(|r| ResolvedInfluence {
                    factor: position[r.factor],
                    ..*r
                })
                .collect();
            sorted_influences.push(remapped);
        }

        info!(
            instances = sorted.len(),
            influences = deps.iter().map(Vec::len).sum::<usize>(),
            "instance registry built"
        );

        Ok(Self {
            instances: sorted,
            influences: sorted_influences,
        })
    }

    /// Flatten definitions and build a registry from their instances
    pub fn from_definitions(definitions: &[PropertyDefinition]) -> Result<Self, ConfigError> {
        let mut instances = Vec::new();
        for def in definitions {
            instances.extend(def.flatten()?);
        }
        Self::new(instances)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// All instances in computation order
    pub fn instances(&self) -> &[PropertyInstance] {
        &self.instances
    }

    pub fn get(&self, index: usize) -> Option<&PropertyInstance> {
        self.instances.get(index)
    }

    /// Resolved influences of the instance at `index`
    pub fn influences_of(&self, index: usize) -> &[ResolvedInfluence] {
        self.influences.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Index of the first instance (in computation order) named `inst_name`
    pub fn position(&self, inst_name: &str) -> Option<usize> {
        self.instances.iter().position(|i| i.inst_name == inst_name)
    }

    /// Index of the first instance of `entity` named `inst_name`
    pub fn position_for(&self, entity: Entity, inst_name: &str) -> Option<usize> {
        self.instances
            .iter()
            .position(|i| i.entity == entity && i.inst_name == inst_name)
    }

    /// First instance named `inst_name`
    pub fn find(&self, inst_name: &str) -> Option<&PropertyInstance> {
        self.position(inst_name).map(|idx| &self.instances[idx])
    }

    /// First instance of `entity` named `inst_name`
    pub fn find_for(&self, entity: Entity, inst_name: &str) -> Option<&PropertyInstance> {
        self.position_for(entity, inst_name)
            .map(|idx| &self.instances[idx])
    }

    /// Like [`InstanceRegistry::find`], but a missing instance is an error
    pub fn require(&self, inst_name: &str) -> Result<&PropertyInstance, ConfigError> {
        self.find(inst_name)
            .ok_or_else(|| ConfigError::UnknownInstance {
                inst_name: inst_name.to_string(),
            })
    }

    /// SHA-256 of the sorted instance list, used to match snapshots to schemas
    pub fn schema_hash(&self) -> Result<String, serde_json::Error> {
        compute_schema_hash(&self.instances)
    }

    /// Indices of the instances computed for `entity` at `phase`, in order
    pub fn matching(&self, entity: Entity, phase: Phase) -> impl Iterator<Item = usize> + '_ {
        self.instances
            .iter()
            .enumerate()
            .filter(move |(_, i)| i.entity == entity && i.phase == phase)
            .map(|(idx, _)| idx)
    }
}

fn check_duplicates(instances: &[PropertyInstance]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for inst in instances {
        if !seen.insert((inst.entity, inst.phase, inst.inst_name.as_str())) {
            return Err(ConfigError::DuplicateInstance {
                inst_name: inst.inst_name.clone(),
                entity: inst.entity,
                phase: inst.phase,
            });
        }
    }
    Ok(())
}

/// Resolve `"<property>.<instance>"` factors to indices into `all`
///
/// Instance names may themselves contain dots, so the factor is split at
/// the first dot only.
fn resolve_influences(
    inst: &PropertyInstance,
    all: &[PropertyInstance],
) -> Result<Vec<ResolvedInfluence>, ConfigError> {
    let mut resolved = Vec::with_capacity(inst.influences.len());

    for influence in &inst.influences {
        let (prop_name, inst_name) = influence
            .factor
            .split_once('.')
            .filter(|(p, i)| !p.is_empty() && !i.is_empty())
            .ok_or_else(|| ConfigError::MalformedFactor {
                instance: inst.qualified_name(),
                factor: influence.factor.clone(),
            })?;

        let candidates: Vec<usize> = all
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name == prop_name && c.inst_name == inst_name)
            .map(|(idx, _)| idx)
            .collect();

        if candidates.is_empty() {
            return Err(ConfigError::UnknownFactor {
                instance: inst.qualified_name(),
                factor: influence.factor.clone(),
            });
        }

        let same_entity: Vec<usize> = candidates
            .into_iter()
            .filter(|&idx| all[idx].entity == inst.entity)
            .collect();
        // Prefer a factor computed no later than the dependent
        let factor = same_entity
            .iter()
            .copied()
            .find(|&idx| all[idx].phase <= inst.phase)
            .or_else(|| same_entity.first().copied())
            .ok_or_else(|| ConfigError::CrossEntityFactor {
                instance: inst.qualified_name(),
                factor: influence.factor.clone(),
            })?;

        if !matches!(all[factor].kind, ValueKind::Range { .. }) {
            return Err(ConfigError::NonRangeFactor {
                instance: inst.qualified_name(),
                factor: influence.factor.clone(),
            });
        }

        if all[factor].value_cnt > 1 {
            return Err(ConfigError::MultiValueFactor {
                instance: inst.qualified_name(),
                factor: influence.factor.clone(),
            });
        }

        if influence.effect != Effect::Shift {
            warn!(
                instance = %inst.qualified_name(),
                factor = %influence.factor,
                effect = ?influence.effect,
                "influence effect has no implementation and is ignored"
            );
        }

        resolved.push(ResolvedInfluence {
            factor,
            effect: influence.effect,
            amount: influence.amount,
        });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Curve, DataType, Influence};

    fn range(name: &str, entity: Entity, phase: Phase) -> PropertyInstance {
        PropertyInstance {
            name: name.to_string(),
            inst_name: name.to_string(),
            data_type: DataType::Integer,
            entity,
            phase,
            kind: ValueKind::Range {
                min: 0.0,
                max: 100.0,
                curve: Curve::Bell,
                skew: 0.0,
            },
            value_cnt: 1,
            is_attribute: false,
            influences: Vec::new(),
        }
    }

    fn influenced(mut inst: PropertyInstance, factor: &str) -> PropertyInstance {
        inst.influences.push(Influence {
            factor: factor.to_string(),
            effect: Effect::Shift,
            amount: 0.2,
        });
        inst
    }

    #[test]
    fn test_factor_indices_follow_sorting() {
        let dependent = influenced(range("wrap", Entity::Tasks, Phase::Complete), "talk.talk");
        let registry = InstanceRegistry::new(vec![
            dependent,
            range("talk", Entity::Tasks, Phase::Complete),
        ])
        .unwrap();

        let wrap = registry.position("wrap").unwrap();
        let talk = registry.position("talk").unwrap();
        assert!(talk < wrap);
        assert_eq!(registry.influences_of(wrap)[0].factor, talk);
    }

    #[test]
    fn test_duplicate_instance_rejected() {
        let err = InstanceRegistry::new(vec![
            range("talk", Entity::Tasks, Phase::Assign),
            range("talk", Entity::Tasks, Phase::Assign),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateInstance { .. }));
    }

    #[test]
    fn test_same_name_in_other_entity_is_not_duplicate() {
        let registry = InstanceRegistry::new(vec![
            range("skill", Entity::Tasks, Phase::Arrive),
            range("skill", Entity::Workers, Phase::Arrive),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.find_for(Entity::Workers, "skill").unwrap().entity,
            Entity::Workers
        );
    }

    #[test]
    fn test_cross_entity_factor_rejected() {
        let err = InstanceRegistry::new(vec![
            influenced(range("wrap", Entity::Tasks, Phase::Complete), "level.level"),
            range("level", Entity::Workers, Phase::Deploy),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::CrossEntityFactor { .. }));
    }

    #[test]
    fn test_malformed_factor_rejected() {
        let err = InstanceRegistry::new(vec![influenced(
            range("wrap", Entity::Tasks, Phase::Complete),
            "talk",
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedFactor { .. }));
    }

    #[test]
    fn test_require_reports_unknown_instance() {
        let registry = InstanceRegistry::new(vec![range("talk", Entity::Tasks, Phase::Assign)])
            .unwrap();
        assert_eq!(registry.require("talk").unwrap().phase, Phase::Assign);
        assert_eq!(
            registry.require("hold").unwrap_err(),
            ConfigError::UnknownInstance {
                inst_name: "hold".to_string()
            }
        );
    }

    #[test]
    fn test_schema_hash_follows_content() {
        let a = InstanceRegistry::new(vec![range("talk", Entity::Tasks, Phase::Assign)]).unwrap();
        let b = InstanceRegistry::new(vec![range("talk", Entity::Tasks, Phase::Assign)]).unwrap();
        let c = InstanceRegistry::new(vec![range("talk", Entity::Tasks, Phase::Complete)]).unwrap();
        assert_eq!(a.schema_hash().unwrap(), b.schema_hash().unwrap());
        assert_ne!(a.schema_hash().unwrap(), c.schema_hash().unwrap());
    }

    #[test]
    fn test_matching_filters_entity_and_phase() {
        let registry = InstanceRegistry::new(vec![
            range("gap", Entity::Tasks, Phase::Arrive),
            range("talk", Entity::Tasks, Phase::Assign),
            range("level", Entity::Workers, Phase::Arrive),
        ])
        .unwrap();
        let names: Vec<&str> = registry
            .matching(Entity::Tasks, Phase::Arrive)
            .map(|idx| registry.instances()[idx].inst_name.as_str())
            .collect();
        assert_eq!(names, vec!["gap"]);
    }
}
