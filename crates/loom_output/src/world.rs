//! Typed view of the compiled world.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::chunk::ChunkName;
use crate::error::ChunkError;
use crate::normalize::normalize_world;
use crate::schema::ChunkPayload;

/// The compiled world in normalized, array-of-records form.
///
/// The default is an empty but well-formed world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompiledWorld {
    /// Every entity, in emission order.
    pub entities: Vec<Entity>,
    /// Every location, in emission order.
    pub locations: Vec<Location>,
    /// Free-standing exits, in emission order.
    pub exits: Vec<Exit>,
    /// Property declarations, kept opaque.
    pub properties: Vec<Value>,
    /// Rule declarations, kept opaque.
    pub rules: Vec<Value>,
    /// Id of the starting location, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Any other fields the compiler emitted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An entity record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    /// Entity id.
    pub id: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Id of the location holding the entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A location record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    /// Location id.
    pub id: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Prose description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Exits leaving this location.
    pub exits: Vec<LocationExit>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An exit leaving a location in a given direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationExit {
    /// Direction name (e.g. "east", "down").
    pub direction: String,
    /// Id of the destination location.
    pub target: String,
    /// Remaining fields (e.g. `locked`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A free-standing exit record from the world's `exits` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exit {
    /// Exit id.
    pub id: String,
    /// Origin location id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination location id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompiledWorld {
    /// Looks up a location by id.
    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Looks up an entity by id.
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Counts every exit: free-standing records plus those nested in locations.
    pub fn exit_count(&self) -> usize {
        self.exits.len()
            + self
                .locations
                .iter()
                .map(|location| location.exits.len())
                .sum::<usize>()
    }

    /// Returns `true` if the world has no entities, locations or exits.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.locations.is_empty() && self.exits.is_empty()
    }
}

/// The resolved compiled-world chunk.
///
/// Holds both the normalized typed form and the unmodified raw payload, so a
/// consumer needing either shape never triggers recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWorld {
    /// Normalized, typed world.
    pub world: CompiledWorld,
    /// The payload exactly as the compiler emitted it.
    pub raw: Value,
}

impl Default for ResolvedWorld {
    fn default() -> Self {
        Self {
            world: CompiledWorld::default(),
            raw: Value::Object(Map::new()),
        }
    }
}

impl ChunkPayload for ResolvedWorld {
    const CHUNK: ChunkName = ChunkName::CompiledWorld;

    fn decode(raw: &RawValue) -> Result<Self, ChunkError> {
        let malformed = |source| ChunkError::Malformed {
            chunk: Self::CHUNK,
            source,
        };
        let raw: Value = serde_json::from_str(raw.get()).map_err(malformed)?;
        let world = serde_json::from_value(normalize_world(&raw)).map_err(malformed)?;
        Ok(Self { world, raw })
    }
}
