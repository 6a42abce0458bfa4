//! Virtual-time driver
//!
//! Runs a whole contact-center day against an [`Engine`] without any I/O:
//! customers arrive separated by the `arrivalGap` value of the previous
//! task, each task runs its arrive/assign/complete batches, and every worker
//! moves between activities as proposed by [`Engine::activity_transition`].
//!
//! Task buckets are dropped from the store once their [`TaskRecord`] is
//! built; worker buckets live for the whole run.
//!
//! # Determinism
//!
//! Events are ordered by (time, sequence number) and task ids are minted
//! from the run's RNG, so the same seed and schema always produce the same
//! [`RunReport`].

mod queue;

use crate::calc::ValuesDescriptor;
use crate::engine::{Engine, EngineError, ACTIVITY_INSTANCE, FALLBACK_ACTIVITY};
use crate::schema::{Entity, Phase};
use crate::store::PropertyValue;
use queue::{EventKind, EventQueue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Instance whose value (seconds) separates consecutive task arrivals
pub const ARRIVAL_GAP_INSTANCE: &str = "arrivalGap";

/// Id used for the single `system` deploy batch
pub const SYSTEM_ID: &str = "system";

/// Driver parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverConfig {
    /// Simulated length of the run
    pub duration_secs: f64,
    pub worker_count: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            duration_secs: 3600.0,
            worker_count: 15,
        }
    }
}

/// One simulated task with every value computed for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub arrived_at_ms: u64,
    pub values: Map<String, Value>,
    pub attributes: Map<String, Value>,
}

/// A worker moving from one activity to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityChange {
    pub worker: String,
    pub at_ms: u64,
    pub from: String,
    pub to: String,
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub system: Map<String, Value>,
    pub workers: Vec<Map<String, Value>>,
    pub tasks: Vec<TaskRecord>,
    pub activity_changes: Vec<ActivityChange>,
    pub end_ms: u64,
}

/// `Agent_000`, `Agent_001`, ...
pub fn worker_name(index: usize) -> String {
    format!("Agent_{:03}", index)
}

/// Run the simulation until `duration_secs` of virtual time have elapsed
pub fn run(engine: &mut Engine, config: &DriverConfig) -> Result<RunReport, EngineError> {
    let end_ms = (config.duration_secs.max(0.0) * 1000.0).round() as u64;

    let system =
        engine.calculate_batch(&ValuesDescriptor::new(Entity::System, Phase::Deploy, SYSTEM_ID))?;

    let names: Vec<String> = (0..config.worker_count).map(worker_name).collect();
    let mut workers = Vec::with_capacity(names.len());
    let mut current = Vec::with_capacity(names.len());
    for name in &names {
        engine.calculate_batch(&ValuesDescriptor::new(Entity::Workers, Phase::Deploy, name.as_str()))?;
        workers.push(engine.values(Entity::Workers, name));
        let activity = engine
            .value(Entity::Workers, name, ACTIVITY_INSTANCE)
            .map(PropertyValue::to_string)
            .unwrap_or_else(|| FALLBACK_ACTIVITY.to_string());
        current.push(activity);
    }

    let mut queue = EventQueue::new();

    if engine
        .registry()
        .find_for(Entity::Tasks, ARRIVAL_GAP_INSTANCE)
        .is_some()
    {
        queue.push(0, EventKind::TaskArrival);
    } else {
        warn!("no tasks '{}' instance, no tasks will arrive", ARRIVAL_GAP_INSTANCE);
    }

    if engine
        .registry()
        .find_for(Entity::Workers, ACTIVITY_INSTANCE)
        .is_some()
    {
        for worker in 0..names.len() {
            queue.push(0, EventKind::ActivityCheck { worker });
        }
    }

    let mut tasks = Vec::new();
    let mut activity_changes = Vec::new();

    while let Some(event) = queue.pop() {
        if event.at_ms >= end_ms {
            break;
        }
        let now = event.at_ms;

        match event.kind {
            EventKind::TaskArrival => {
                let bytes = engine.rng_mut().next_bytes16();
                let id = uuid::Builder::from_random_bytes(bytes)
                    .into_uuid()
                    .to_string();

                for phase in [Phase::Arrive, Phase::Assign, Phase::Complete] {
                    engine.calculate_batch(&ValuesDescriptor::new(Entity::Tasks, phase, id.as_str()))?;
                }

                let gap = engine
                    .value(Entity::Tasks, &id, ARRIVAL_GAP_INSTANCE)
                    .and_then(PropertyValue::as_f64);
                let values = engine.values(Entity::Tasks, &id);
                let attributes = engine.attributes(Entity::Tasks, &id);
                engine.forget(Entity::Tasks, &id);
                tasks.push(TaskRecord {
                    arrived_at_ms: now,
                    values,
                    attributes,
                    id,
                });

                match gap {
                    Some(secs) => {
                        let gap_ms = ((secs.max(0.0) * 1000.0).round() as u64).max(1);
                        queue.push(now.saturating_add(gap_ms), EventKind::TaskArrival);
                    }
                    None => warn!("arrival gap is not numeric, stopping arrivals"),
                }
            }
            EventKind::ActivityCheck { worker } => {
                schedule_transition(engine, &mut queue, now, worker, &current[worker])?;
            }
            EventKind::ActivitySwitch { worker, to } => {
                if current[worker] != to {
                    debug!(worker = %names[worker], from = %current[worker], to = %to, "activity change");
                    engine.store_mut().set(
                        Entity::Workers,
                        &names[worker],
                        ACTIVITY_INSTANCE,
                        PropertyValue::Text(to.clone()),
                    );
                    activity_changes.push(ActivityChange {
                        worker: names[worker].clone(),
                        at_ms: now,
                        from: std::mem::replace(&mut current[worker], to.clone()),
                        to,
                    });
                }
                schedule_transition(engine, &mut queue, now, worker, &current[worker])?;
            }
        }
    }

    info!(
        tasks = tasks.len(),
        activity_changes = activity_changes.len(),
        end_ms,
        "simulation finished"
    );

    Ok(RunReport {
        system,
        workers,
        tasks,
        activity_changes,
        end_ms,
    })
}

/// The worker stays in `current` for its base duration, then switches
fn schedule_transition(
    engine: &mut Engine,
    queue: &mut EventQueue,
    now: u64,
    worker: usize,
    current: &str,
) -> Result<(), EngineError> {
    let transition = engine.activity_transition(current)?;
    queue.push(
        now.saturating_add(transition.delay_ms.max(1)),
        EventKind::ActivitySwitch {
            worker,
            to: transition.next,
        },
    );
    Ok(())
}
