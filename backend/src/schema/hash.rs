//! Schema fingerprinting
//!
//! Uses canonical JSON serialization with sorted keys so the hash does not
//! depend on map iteration order.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Compute deterministic SHA256 hash of a schema
pub fn compute_schema_hash<T: Serialize + ?Sized>(schema: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(schema)?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
