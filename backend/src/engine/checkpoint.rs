//! Checkpoint - Save/Load Run State
//!
//! A snapshot holds the RNG state and every stored value, which is enough to
//! resume a run and reproduce the exact values an uninterrupted run would
//! have produced.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored engine continues the snapshotted random sequence
//! - **Schema Matching**: a snapshot only loads against the schema it was taken with
//!   (see [`InstanceRegistry::schema_hash`](crate::schema::InstanceRegistry::schema_hash))

use crate::engine::EngineError;
use crate::store::ValueStore;
use serde::{Deserialize, Serialize};

/// Engine state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// RNG state at time of snapshot
    pub rng_state: u64,

    /// Every value recorded so far
    pub values: ValueStore,

    /// SHA256 hash of the sorted instance list
    pub schema_hash: String,
}

impl RunSnapshot {
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}
