//! Value Store
//!
//! Per-run record of every computed value: `entity → id → instName → value`.
//! Buckets are created on first write and only removed by the caller
//! ([`ValueStore::remove_id`]). Influence resolution reads factor values
//! from here, so the order in which batches run is part of correctness.
//!
//! Values are stored under their flat dotted instance name; the nested
//! object shape (`routing.level` → `{ "routing": { "level": .. } }`) is only
//! built at the API boundary by [`nest_values`].

mod value;

pub use value::PropertyValue;

use crate::schema::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Values computed for one subject, keyed by dotted instance name
pub type ValueBucket = BTreeMap<String, PropertyValue>;

/// Per-run store of computed values
///
/// Ordered maps keep snapshots byte-stable across runs.
///
/// # Example
///
/// ```
/// use contact_simulator_core_rs::schema::Entity;
/// use contact_simulator_core_rs::store::{PropertyValue, ValueStore};
///
/// let mut store = ValueStore::new();
/// store.set(Entity::Tasks, "Jane Doe", "talkTime", PropertyValue::Int(240));
/// assert_eq!(
///     store.get(Entity::Tasks, "Jane Doe", "talkTime"),
///     Some(&PropertyValue::Int(240))
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueStore {
    buckets: BTreeMap<Entity, BTreeMap<String, ValueBucket>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value, replacing any earlier value for the same instance
    pub fn set(&mut self, entity: Entity, id: &str, inst_name: &str, value: PropertyValue) {
        self.buckets
            .entry(entity)
            .or_default()
            .entry(id.to_string())
            .or_default()
            .insert(inst_name.to_string(), value);
    }

    pub fn get(&self, entity: Entity, id: &str, inst_name: &str) -> Option<&PropertyValue> {
        self.values_for(entity, id)?.get(inst_name)
    }

    /// Every value recorded for one subject
    pub fn values_for(&self, entity: Entity, id: &str) -> Option<&ValueBucket> {
        self.buckets.get(&entity)?.get(id)
    }

    /// Drop a subject's bucket; returns it if one existed
    pub fn remove_id(&mut self, entity: Entity, id: &str) -> Option<ValueBucket> {
        self.buckets.get_mut(&entity)?.remove(id)
    }

    /// Ids with at least one recorded value, in sorted order
    pub fn ids(&self, entity: Entity) -> impl Iterator<Item = &str> {
        self.buckets
            .get(&entity)
            .into_iter()
            .flat_map(|ids| ids.keys().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(BTreeMap::is_empty)
    }
}

/// Expand `(dotted name, value)` pairs into a nested JSON object
///
/// A later path that runs through an earlier scalar replaces that scalar
/// with an object.
pub fn nest_values<'a, I>(values: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (&'a str, &'a PropertyValue)>,
{
    let mut root = Map::new();
    for (path, value) in values {
        insert_path(&mut root, path, Value::from(value));
    }
    root
}

fn insert_path(root: &mut Map<String, Value>, path: &str, leaf: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = match segments.pop() {
        Some(last) => last,
        None => return,
    };

    let mut node = root;
    for segment in segments {
        let slot = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        node = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
    node.insert(last.to_string(), leaf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nest_dotted_paths() {
        let level = PropertyValue::Int(3);
        let channel = PropertyValue::Text("voice".to_string());
        let skills = PropertyValue::List(vec![PropertyValue::Text("sales".to_string())]);
        let nested = nest_values(vec![
            ("routing.level", &level),
            ("channel", &channel),
            ("routing.skills", &skills),
        ]);
        assert_eq!(
            Value::Object(nested),
            json!({ "routing": { "level": 3, "skills": ["sales"] }, "channel": "voice" })
        );
    }

    #[test]
    fn test_path_through_scalar_replaces_it() {
        let a = PropertyValue::Int(1);
        let b = PropertyValue::Int(2);
        let nested = nest_values(vec![("routing", &a), ("routing.level", &b)]);
        assert_eq!(Value::Object(nested), json!({ "routing": { "level": 2 } }));
    }

    #[test]
    fn test_buckets_are_isolated_per_entity_and_id() {
        let mut store = ValueStore::new();
        store.set(Entity::Tasks, "a", "x", PropertyValue::Int(1));
        store.set(Entity::Workers, "a", "x", PropertyValue::Int(2));
        store.set(Entity::Tasks, "b", "x", PropertyValue::Int(3));

        assert_eq!(store.get(Entity::Tasks, "a", "x"), Some(&PropertyValue::Int(1)));
        assert_eq!(store.get(Entity::Workers, "a", "x"), Some(&PropertyValue::Int(2)));
        assert_eq!(store.ids(Entity::Tasks).collect::<Vec<_>>(), vec!["a", "b"]);

        assert!(store.remove_id(Entity::Tasks, "a").is_some());
        assert_eq!(store.get(Entity::Tasks, "a", "x"), None);
        assert_eq!(store.get(Entity::Workers, "a", "x"), Some(&PropertyValue::Int(2)));
    }

    #[test]
    fn test_snapshot_shape_uses_entity_names() {
        let mut store = ValueStore::new();
        store.set(Entity::Workers, "Agent_000", "activity", PropertyValue::Text("Busy".into()));
        let text = serde_json::to_string(&store).unwrap();
        assert_eq!(text, r#"{"buckets":{"workers":{"Agent_000":{"activity":"Busy"}}}}"#);
        let back: ValueStore = serde_json::from_str(&text).unwrap();
        assert_eq!(back, store);
    }
}
