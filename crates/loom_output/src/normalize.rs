//! Normalization of the compiled-world payload.
//!
//! The compiler emits entity, location and exit collections as objects keyed
//! by id (`{"tavern": {...}}`) and a location's exits as objects keyed by
//! direction (`{"east": {"to": "market"}}`). Consumers want arrays, so each
//! keyed collection becomes an array of records carrying their own `id`, and
//! each exit map becomes an array of `{direction, target}` pairs. Input that
//! is already array-shaped passes through unchanged, which makes
//! [`normalize_world`] idempotent.

use serde_json::{Map, Value};

/// Top-level world collections keyed by id on the wire.
pub const KEYED_COLLECTIONS: [&str; 3] = ["entities", "locations", "exits"];

/// Normalizes a raw world payload. Non-object payloads are returned as-is.
pub fn normalize_world(raw: &Value) -> Value {
    let Value::Object(fields) = raw else {
        return raw.clone();
    };

    let mut world = fields.clone();
    for key in KEYED_COLLECTIONS {
        if let Some(collection) = world.get_mut(key) {
            *collection = keyed_to_records(collection.take());
        }
    }

    if let Some(Value::Array(locations)) = world.get_mut("locations") {
        for location in locations.iter_mut() {
            if let Some(exits) = location.get_mut("exits") {
                *exits = exits_to_pairs(exits.take());
            }
        }
    }

    Value::Object(world)
}

/// Converts an id-keyed object into an array of records, each starting with
/// an `id` field taken from its key. Any other shape is returned unchanged.
///
/// Records keep the key order of the input object.
pub fn keyed_to_records(collection: Value) -> Value {
    match collection {
        Value::Object(entries) => Value::Array(
            entries
                .into_iter()
                .map(|(id, record)| record_with_id(id, record))
                .collect(),
        ),
        other => other,
    }
}

/// Converts a direction-keyed exit object into an array of
/// `{direction, target, ...}` records. Any other shape is returned unchanged.
///
/// An exit value may be `{"to": id}`, `{"target": id}` or a bare id string.
/// Remaining fields of an exit object are kept after `direction` and `target`.
pub fn exits_to_pairs(exits: Value) -> Value {
    match exits {
        Value::Object(entries) => Value::Array(
            entries
                .into_iter()
                .map(|(direction, exit)| exit_pair(direction, exit))
                .collect(),
        ),
        other => other,
    }
}

fn record_with_id(id: String, record: Value) -> Value {
    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id));
    match record {
        Value::Object(fields) => {
            for (key, value) in fields {
                if key != "id" {
                    out.insert(key, value);
                }
            }
        }
        Value::Null => {}
        other => {
            out.insert("value".to_string(), other);
        }
    }
    Value::Object(out)
}

fn exit_pair(direction: String, exit: Value) -> Value {
    let mut out = Map::new();
    out.insert("direction".to_string(), Value::String(direction));
    match exit {
        Value::Object(mut fields) => {
            let target = fields.remove("target").or_else(|| fields.remove("to"));
            fields.remove("to");
            fields.remove("direction");
            if let Some(target) = target {
                out.insert("target".to_string(), target);
            }
            out.extend(fields);
        }
        other => {
            out.insert("target".to_string(), other);
        }
    }
    Value::Object(out)
}
