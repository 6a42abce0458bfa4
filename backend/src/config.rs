//! Run configuration
//!
//! A run is described by one JSON document: the seed, the normalized
//! property schema and the driver parameters.
//!
//! ```json
//! {
//!   "seed": "predictable",
//!   "properties": [ { "name": "arrivalGap", "dataType": "integer", "expr": "range",
//!                     "min": 10, "max": 20,
//!                     "instances": [ { "entity": "tasks", "phase": "arrive" } ] } ],
//!   "driver": { "durationSecs": 3600, "workerCount": 15 }
//! }
//! ```

use crate::driver::DriverConfig;
use crate::engine::{Engine, EngineError};
use crate::rng::RngManager;
use crate::schema::{InstanceRegistry, PropertyDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Seed given either as a number or as a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    Number(u64),
    Name(String),
}

impl Default for SeedSpec {
    fn default() -> Self {
        SeedSpec::Name("predictable".to_string())
    }
}

impl SeedSpec {
    /// Numbers are used as-is; anything else is a named seed
    pub fn parse(raw: &str) -> Self {
        match raw.parse() {
            Ok(n) => SeedSpec::Number(n),
            Err(_) => SeedSpec::Name(raw.to_string()),
        }
    }

    pub fn to_rng(&self) -> RngManager {
        match self {
            SeedSpec::Number(n) => RngManager::new(*n),
            SeedSpec::Name(name) => RngManager::from_seed_str(name),
        }
    }
}

impl fmt::Display for SeedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedSpec::Number(n) => write!(f, "{}", n),
            SeedSpec::Name(name) => f.write_str(name),
        }
    }
}

/// Complete configuration of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    #[serde(default)]
    pub seed: SeedSpec,

    pub properties: Vec<PropertyDefinition>,

    #[serde(default)]
    pub driver: DriverConfig,
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Flatten and sort the schema, then seed a fresh engine
    pub fn build_engine(&self) -> Result<Engine, EngineError> {
        let registry = InstanceRegistry::from_definitions(&self.properties)?;
        Ok(Engine::new(registry, self.seed.to_rng()))
    }
}
