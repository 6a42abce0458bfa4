//! Tests for engine snapshots

use contact_simulator_core_rs::{
    Engine, EngineError, Entity, InstanceRegistry, Phase, PropertyInstance, RngManager,
    RunSnapshot, ValuesDescriptor,
};
use serde_json::{json, Value};

fn registry(max: f64) -> InstanceRegistry {
    let instances: Vec<PropertyInstance> = serde_json::from_value(json!([
        {
            "instName": "talkTime", "dataType": "integer", "expr": "range",
            "min": 60, "max": max, "entity": "tasks", "phase": "assign", "curve": "bell"
        },
        {
            "instName": "wrapTime", "dataType": "integer", "expr": "range",
            "min": 10, "max": 120, "entity": "tasks", "phase": "complete", "curve": "bell",
            "influences": [{ "factor": "talkTime.talkTime", "amount": 0.2 }]
        }
    ]))
    .unwrap();
    InstanceRegistry::new(instances).unwrap()
}

fn step(engine: &mut Engine, i: usize) -> Vec<Value> {
    let id = format!("task-{}", i);
    [Phase::Assign, Phase::Complete]
        .into_iter()
        .map(|phase| {
            Value::Object(
                engine
                    .calculate_batch(&ValuesDescriptor::new(Entity::Tasks, phase, id.as_str()))
                    .unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_restored_run_matches_uninterrupted_run() {
    let mut uninterrupted = Engine::new(registry(600.0), RngManager::new(555));
    let expected: Vec<Vec<Value>> = (0..20).map(|i| step(&mut uninterrupted, i)).collect();

    let mut first_half = Engine::new(registry(600.0), RngManager::new(555));
    let mut actual: Vec<Vec<Value>> = (0..10).map(|i| step(&mut first_half, i)).collect();

    let json = first_half.snapshot_json().unwrap();
    let snapshot = RunSnapshot::from_json(&json).unwrap();
    let mut resumed = Engine::restore(registry(600.0), snapshot).unwrap();
    actual.extend((10..20).map(|i| step(&mut resumed, i)));

    assert_eq!(actual, expected);
    assert_eq!(resumed.store(), uninterrupted.store());
}

#[test]
fn test_snapshot_carries_stored_values() {
    let mut engine = Engine::new(registry(600.0), RngManager::new(1));
    step(&mut engine, 0);
    let snapshot = engine.snapshot().unwrap();
    assert!(snapshot
        .values
        .get(Entity::Tasks, "task-0", "wrapTime")
        .is_some());
}

#[test]
fn test_restore_rejects_different_schema() {
    let engine = Engine::new(registry(600.0), RngManager::new(1));
    let snapshot = engine.snapshot().unwrap();

    let result = Engine::restore(registry(900.0), snapshot);
    assert!(matches!(result, Err(EngineError::SchemaMismatch { .. })));
}

#[test]
fn test_schema_hash_is_stable() {
    let a = Engine::new(registry(600.0), RngManager::new(1)).snapshot().unwrap();
    let b = Engine::new(registry(600.0), RngManager::new(2)).snapshot().unwrap();
    assert_eq!(a.schema_hash, b.schema_hash);
    assert_ne!(a.rng_state, b.rng_state);
}
