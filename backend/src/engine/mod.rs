//! Batch Calculation API
//!
//! The [`Engine`] owns everything one simulation run needs: the sorted
//! instance registry, the random source and the value store. Nothing is
//! process-global, so independent runs (e.g. in parallel tests) never share
//! state.
//!
//! # Example
//!
//! ```
//! use contact_simulator_core_rs::{Engine, RngManager, ValuesDescriptor};
//! use contact_simulator_core_rs::schema::{Entity, InstanceRegistry, Phase, PropertyInstance};
//!
//! let instances: Vec<PropertyInstance> = serde_json::from_str(r#"[
//!   { "instName": "routing.level", "dataType": "integer", "expr": "range",
//!     "min": 1, "max": 5, "entity": "tasks", "phase": "arrive" }
//! ]"#).unwrap();
//! let registry = InstanceRegistry::new(instances).unwrap();
//! let mut engine = Engine::new(registry, RngManager::new(42));
//!
//! let desc = ValuesDescriptor::new(Entity::Tasks, Phase::Arrive, "Jane Doe");
//! let values = engine.calculate_batch(&desc).unwrap();
//! assert!(values["routing"]["level"].is_i64());
//! ```

pub mod checkpoint;

pub use checkpoint::RunSnapshot;

use crate::calc::{self, sampling, CalcError, ValuesDescriptor};
use crate::rng::RngManager;
use crate::schema::{ConfigError, Entity, InstanceRegistry, ValueKind};
use crate::store::{nest_values, PropertyValue, ValueStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Instance consulted by [`Engine::activity_transition`]
pub const ACTIVITY_INSTANCE: &str = "activity";

/// Activity proposed for workers whose current activity is unknown
pub const FALLBACK_ACTIVITY: &str = "Available";

/// Delay (ms) used when the current activity has no base duration
pub const FALLBACK_DELAY_MS: u64 = 2000;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid schema: {0}")]
    Config(#[from] ConfigError),

    #[error("Calculation failed: {0}")]
    Calc(#[from] CalcError),

    #[error("Unknown instance: {0}")]
    UnknownInstance(String),

    #[error("Instance '{0}' is not an enum instance")]
    NotAnEnum(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot schema hash {found} does not match registry hash {expected}")]
    SchemaMismatch { expected: String, found: String },
}

/// Proposed next activity and the delay before it should be evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTransition {
    pub next: String,
    pub delay_ms: u64,
}

/// One simulation run's calculation context
#[derive(Debug, Clone)]
pub struct Engine {
    registry: InstanceRegistry,
    rng: RngManager,
    store: ValueStore,
}

impl Engine {
    pub fn new(registry: InstanceRegistry, rng: RngManager) -> Self {
        Self {
            registry,
            rng,
            store: ValueStore::new(),
        }
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    /// Mutable store access, e.g. to seed values computed elsewhere
    pub fn store_mut(&mut self) -> &mut ValueStore {
        &mut self.store
    }

    pub fn rng_mut(&mut self) -> &mut RngManager {
        &mut self.rng
    }

    /// Compute every instance matching the descriptor's entity and phase
    ///
    /// Instances run in dependency order; each result is written to the
    /// store before the next instance is calculated. Returns only the values
    /// computed by this call, as a nested object.
    ///
    /// # Errors
    ///
    /// Fails on the first instance that cannot be calculated. Values
    /// written before the failure stay in the store.
    pub fn calculate_batch(
        &mut self,
        descriptor: &ValuesDescriptor,
    ) -> Result<Map<String, Value>, EngineError> {
        let mut computed: Vec<(usize, PropertyValue)> = Vec::new();

        for index in self.registry.matching(descriptor.entity, descriptor.phase) {
            let value = calc::calculate(
                &self.registry,
                index,
                &self.store,
                descriptor,
                &mut self.rng,
            )?;
            let inst_name = &self.registry.instances()[index].inst_name;
            self.store
                .set(descriptor.entity, &descriptor.id, inst_name, value.clone());
            computed.push((index, value));
        }

        debug!(
            entity = %descriptor.entity,
            phase = %descriptor.phase,
            id = %descriptor.id,
            values = computed.len(),
            "calculated batch"
        );

        let instances = self.registry.instances();
        Ok(nest_values(
            computed
                .iter()
                .map(|(index, value)| (instances[*index].inst_name.as_str(), value)),
        ))
    }

    /// Calculate one instance without recording the result
    pub fn calculate_value(
        &mut self,
        index: usize,
        descriptor: &ValuesDescriptor,
    ) -> Result<PropertyValue, EngineError> {
        Ok(calc::calculate(
            &self.registry,
            index,
            &self.store,
            descriptor,
            &mut self.rng,
        )?)
    }

    /// Propose a worker's next activity
    ///
    /// Samples the next activity from the workers `activity` instance and
    /// returns it with the current activity's base duration in
    /// milliseconds. An activity the instance does not declare yields
    /// `("Available", 2000)`.
    pub fn activity_transition(&mut self, current: &str) -> Result<ActivityTransition, EngineError> {
        let index = self
            .registry
            .position_for(Entity::Workers, ACTIVITY_INSTANCE)
            .ok_or_else(|| EngineError::UnknownInstance(ACTIVITY_INSTANCE.to_string()))?;

        let instance = &self.registry.instances()[index];
        let choices = match &instance.kind {
            ValueKind::Enum { choices } => choices,
            ValueKind::Range { .. } => {
                return Err(EngineError::NotAnEnum(instance.qualified_name()))
            }
        };

        let next = sampling::pick_weighted(choices, self.rng.next_f64())
            .map(|choice| choice.value.to_string())
            .ok_or_else(|| EngineError::NotAnEnum(instance.qualified_name()))?;

        let current_choice = choices.iter().find(|c| c.value.to_string() == current);
        let transition = match current_choice {
            Some(choice) => ActivityTransition {
                next,
                delay_ms: choice
                    .base_dur
                    .map(|secs| (secs.max(0.0) * 1000.0).round() as u64)
                    .unwrap_or(FALLBACK_DELAY_MS),
            },
            None => {
                warn!(activity = current, "unknown current activity, using fallback");
                ActivityTransition {
                    next: FALLBACK_ACTIVITY.to_string(),
                    delay_ms: FALLBACK_DELAY_MS,
                }
            }
        };

        Ok(transition)
    }

    /// Previously computed value of one instance for one subject
    pub fn value(&self, entity: Entity, id: &str, inst_name: &str) -> Option<&PropertyValue> {
        self.store.get(entity, id, inst_name)
    }

    /// All values recorded for a subject, as a nested object
    pub fn values(&self, entity: Entity, id: &str) -> Map<String, Value> {
        match self.store.values_for(entity, id) {
            Some(bucket) => nest_values(bucket.iter().map(|(k, v)| (k.as_str(), v))),
            None => Map::new(),
        }
    }

    /// Recorded values of instances flagged `isAttribute`, as a nested object
    pub fn attributes(&self, entity: Entity, id: &str) -> Map<String, Value> {
        let bucket = match self.store.values_for(entity, id) {
            Some(bucket) => bucket,
            None => return Map::new(),
        };
        nest_values(
            self.registry
                .instances()
                .iter()
                .filter(|inst| inst.entity == entity && inst.is_attribute)
                .filter_map(|inst| {
                    bucket
                        .get(&inst.inst_name)
                        .map(|value| (inst.inst_name.as_str(), value))
                }),
        )
    }

    /// Drop everything recorded for a subject
    pub fn forget(&mut self, entity: Entity, id: &str) {
        self.store.remove_id(entity, id);
    }

    /// Capture RNG state and stored values
    pub fn snapshot(&self) -> Result<RunSnapshot, EngineError> {
        Ok(RunSnapshot {
            rng_state: self.rng.get_state(),
            values: self.store.clone(),
            schema_hash: self.registry.schema_hash()?,
        })
    }

    pub fn snapshot_json(&self) -> Result<String, EngineError> {
        self.snapshot()?.to_json()
    }

    /// Resume a run from a snapshot taken with the same schema
    pub fn restore(registry: InstanceRegistry, snapshot: RunSnapshot) -> Result<Self, EngineError> {
        let expected = registry.schema_hash()?;
        if expected != snapshot.schema_hash {
            return Err(EngineError::SchemaMismatch {
                expected,
                found: snapshot.schema_hash,
            });
        }
        Ok(Self {
            registry,
            rng: RngManager::from_state(snapshot.rng_state),
            store: snapshot.values,
        })
    }
}
