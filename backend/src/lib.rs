//! Contact Center Simulator Core - Rust Engine
//!
//! Stochastic property-value calculation for a contact-center load
//! simulator, with deterministic execution.
//!
//! # Architecture
//!
//! - **rng**: Deterministic random number generation
//! - **schema**: Property definitions, instance registry, dependency ordering
//! - **calc**: Value sampling (enum, uniform, bell) and influence shifts
//! - **store**: Per-run record of computed values
//! - **engine**: Batch calculation API, activity transitions, checkpoints
//! - **config**: JSON run configuration
//! - **driver**: Virtual-time simulation of task arrivals and worker activity
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (seeded RNG)
//! 2. Every influence factor is computed before the instances it influences
//! 3. Run state lives in one [`Engine`]; there is no global state

// Module declarations
pub mod calc;
pub mod config;
pub mod driver;
pub mod engine;
pub mod rng;
pub mod schema;
pub mod store;

// Re-exports for convenience
pub use calc::{CalcError, ValuesDescriptor};
pub use config::{SeedSpec, SimulationConfig};
pub use driver::{ActivityChange, DriverConfig, RunReport, TaskRecord};
pub use engine::{ActivityTransition, Engine, EngineError, RunSnapshot};
pub use rng::RngManager;
pub use schema::{
    ConfigError, Curve, DataType, Effect, Entity, InstanceRegistry, Phase, PropertyDefinition,
    PropertyInstance, ValueKind,
};
pub use store::{PropertyValue, ValueStore};
