//! Compile metadata carried at the head of every compiler output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Metadata describing one run of the external compiler.
///
/// Every field defaults when absent so partially filled headers from
/// short-circuited compiles still decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileHeader {
    /// The compiler's own identifier for this run.
    #[serde(deserialize_with = "string_or_number")]
    pub compile_id: String,
    /// When the compile ran, as epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Total time the compiler spent, in milliseconds.
    pub duration_ms: f64,
    /// Time spent in each compiler phase, in execution order.
    pub phase_timings: Vec<PhaseTiming>,
    /// Aggregate counts over the compiled world.
    pub world_counts: WorldCounts,
    /// Number of source files the compiler received.
    pub input_file_count: usize,
}

/// Duration of a single compiler phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseTiming {
    /// Phase name (e.g. "parse", "resolve", "emit").
    pub phase: String,
    /// Time spent in the phase, in milliseconds.
    pub duration_ms: f64,
}

/// Aggregate counts over the compiled world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldCounts {
    /// Number of entities.
    pub entities: usize,
    /// Number of locations.
    pub locations: usize,
    /// Number of exits.
    pub exits: usize,
    /// Number of properties.
    pub properties: usize,
    /// Number of rules.
    pub rules: usize,
}

/// Accepts a compile id written either as a string or as a number.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
