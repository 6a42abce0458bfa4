//! Tests for the instance registry and dependency ordering

use contact_simulator_core_rs::schema::{Effect, PropertyDefinition};
use contact_simulator_core_rs::{ConfigError, InstanceRegistry, Phase, PropertyInstance};
use serde_json::{json, Value};

fn range_instance(inst_name: &str, phase: &str, influences: Value) -> Value {
    json!({
        "name": inst_name,
        "instName": inst_name,
        "dataType": "integer",
        "expr": "range",
        "min": 0,
        "max": 100,
        "entity": "tasks",
        "phase": phase,
        "curve": "bell",
        "influences": influences
    })
}

fn shift(factor: &str) -> Value {
    json!([{ "factor": factor, "effect": "shift", "amount": 0.2 }])
}

fn build(docs: Vec<Value>) -> Result<InstanceRegistry, ConfigError> {
    let instances: Vec<PropertyInstance> = docs
        .into_iter()
        .map(|doc| serde_json::from_value(doc).unwrap())
        .collect();
    InstanceRegistry::new(instances)
}

fn names(registry: &InstanceRegistry) -> Vec<String> {
    registry
        .instances()
        .iter()
        .map(|i| i.inst_name.clone())
        .collect()
}

#[test]
fn test_sorted_by_phase_then_dependencies() {
    let registry = build(vec![
        range_instance("wrap", "complete", shift("talk.talk")),
        range_instance("talk", "complete", json!([])),
        range_instance("bellShift", "assign", shift("prereq1.prereq1")),
        range_instance("prereq1", "arrive", json!([])),
        range_instance("level", "deploy", json!([])),
    ])
    .unwrap();

    assert_eq!(
        names(&registry),
        vec!["level", "prereq1", "bellShift", "talk", "wrap"]
    );
}

#[test]
fn test_every_factor_precedes_its_dependent() {
    // d <- c <- b <- a, declared in reverse dependency order
    let registry = build(vec![
        range_instance("a", "assign", shift("b.b")),
        range_instance("b", "assign", shift("c.c")),
        range_instance("c", "assign", shift("d.d")),
        range_instance("d", "assign", json!([])),
    ])
    .unwrap();

    for (idx, _) in registry.instances().iter().enumerate() {
        for influence in registry.influences_of(idx) {
            assert!(influence.factor < idx);
        }
    }
    assert_eq!(names(&registry), vec!["d", "c", "b", "a"]);
}

#[test]
fn test_cycle_within_phase_fails() {
    let err = build(vec![
        range_instance("x", "assign", shift("y.y")),
        range_instance("y", "assign", shift("x.x")),
        range_instance("z", "assign", json!([])),
    ])
    .unwrap_err();

    match err {
        ConfigError::CircularDependency { phase, unplaced } => {
            assert_eq!(phase, Phase::Assign);
            assert_eq!(unplaced, vec!["x.x".to_string(), "y.y".to_string()]);
        }
        other => panic!("expected circular dependency, got {:?}", other),
    }
}

#[test]
fn test_self_influence_fails() {
    let err = build(vec![range_instance("x", "assign", shift("x.x"))]).unwrap_err();
    assert!(matches!(err, ConfigError::CircularDependency { .. }));
}

#[test]
fn test_dependency_on_later_phase_fails() {
    let err = build(vec![
        range_instance("early", "arrive", shift("late.late")),
        range_instance("late", "complete", json!([])),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::CircularDependency {
            phase: Phase::Arrive,
            ..
        }
    ));
}

#[test]
fn test_unknown_factor_fails() {
    let err = build(vec![range_instance("wrap", "complete", shift("tlak.tlak"))]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownFactor {
            instance: "wrap.wrap".to_string(),
            factor: "tlak.tlak".to_string(),
        }
    );
}

#[test]
fn test_enum_factor_fails() {
    let err = build(vec![
        range_instance("wrap", "complete", shift("channel.channel")),
        json!({
            "instName": "channel",
            "dataType": "string",
            "expr": "enum",
            "values": ["voice", "chat"],
            "entity": "tasks",
            "phase": "arrive"
        }),
    ])
    .unwrap_err();
    assert!(matches!(err, ConfigError::NonRangeFactor { .. }));
}

#[test]
fn test_multi_value_factor_fails() {
    let mut talk = range_instance("talk", "assign", json!([]));
    talk["valueCnt"] = json!(3);
    let err = build(vec![
        talk,
        range_instance("wrap", "complete", shift("talk.talk")),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        ConfigError::MultiValueFactor {
            instance: "wrap.wrap".to_string(),
            factor: "talk.talk".to_string(),
        }
    );
}

#[test]
fn test_factor_with_dotted_instance_name() {
    let registry = build(vec![
        json!({
            "name": "level",
            "instName": "routing.level",
            "dataType": "integer",
            "expr": "range",
            "min": 1,
            "max": 5,
            "entity": "tasks",
            "phase": "arrive"
        }),
        range_instance("talk", "assign", shift("level.routing.level")),
    ])
    .unwrap();

    let talk = registry.position("talk").unwrap();
    let factor = registry.influences_of(talk)[0].factor;
    assert_eq!(registry.instances()[factor].inst_name, "routing.level");
}

#[test]
fn test_unimplemented_effects_are_kept() {
    let registry = build(vec![
        range_instance("talk", "assign", json!([])),
        range_instance(
            "wrap",
            "complete",
            json!([{ "factor": "talk.talk", "effect": "focus", "amount": 1 }]),
        ),
    ])
    .unwrap();
    let wrap = registry.position("wrap").unwrap();
    assert_eq!(registry.influences_of(wrap)[0].effect, Effect::Focus);
}

#[test]
fn test_from_definitions_flattens_instances() {
    let defs: Vec<PropertyDefinition> = serde_json::from_value(json!([
        {
            "name": "talkTime",
            "dataType": "integer",
            "expr": "range",
            "min": 60,
            "max": 600,
            "curve": "bell",
            "instances": [
                { "entity": "tasks", "phase": "assign" },
                { "instName": "shortTalk", "entity": "tasks", "phase": "assign", "max": 120 }
            ]
        },
        {
            "name": "unused",
            "dataType": "integer",
            "expr": "range",
            "min": 0,
            "max": 1
        }
    ]))
    .unwrap();

    let registry = InstanceRegistry::from_definitions(&defs).unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.find("shortTalk").unwrap().name, "talkTime");
    assert!(registry.find("unused").is_none());
}

#[test]
fn test_definition_missing_enum_values_fails() {
    let defs: Vec<PropertyDefinition> = serde_json::from_value(json!([{
        "name": "channel",
        "dataType": "string",
        "expr": "enum",
        "instances": [{ "entity": "tasks", "phase": "arrive" }]
    }]))
    .unwrap();

    let err = InstanceRegistry::from_definitions(&defs).unwrap_err();
    assert_eq!(
        err,
        ConfigError::MissingValues {
            name: "channel".to_string()
        }
    );
}
