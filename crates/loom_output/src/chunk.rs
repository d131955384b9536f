//! Chunk names and raw, unparsed chunk payloads.

use std::fmt;
use std::str::FromStr;

use loom_common::ContentHash;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// The closed set of logical chunks a compile can emit.
///
/// Serialized in camelCase (`syntaxTree`, `compiledWorld`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChunkName {
    /// Parsed syntax tree of every input file.
    SyntaxTree,
    /// Declared symbols and their kinds.
    SymbolTable,
    /// Facts asserted by the story.
    FactSet,
    /// Which properties depend on which others.
    PropertyDependencyIndex,
    /// Where each named thing is defined.
    DefinitionIndex,
    /// The compiled world: entities, locations, exits, properties, rules.
    CompiledWorld,
    /// Compiler diagnostics.
    Diagnostics,
}

impl ChunkName {
    /// Every chunk name, in a fixed order.
    pub const ALL: [ChunkName; 7] = [
        ChunkName::SyntaxTree,
        ChunkName::SymbolTable,
        ChunkName::FactSet,
        ChunkName::PropertyDependencyIndex,
        ChunkName::DefinitionIndex,
        ChunkName::CompiledWorld,
        ChunkName::Diagnostics,
    ];

    /// Returns the wire name of this chunk.
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkName::SyntaxTree => "syntaxTree",
            ChunkName::SymbolTable => "symbolTable",
            ChunkName::FactSet => "factSet",
            ChunkName::PropertyDependencyIndex => "propertyDependencyIndex",
            ChunkName::DefinitionIndex => "definitionIndex",
            ChunkName::CompiledWorld => "compiledWorld",
            ChunkName::Diagnostics => "diagnostics",
        }
    }
}

impl fmt::Display for ChunkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a string that is not a known chunk name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chunk name '{0}'")]
pub struct UnknownChunkName(pub String);

impl FromStr for ChunkName {
    type Err = UnknownChunkName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChunkName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownChunkName(s.to_string()))
    }
}

/// One named, content-hashed unit of compiler output.
///
/// The payload stays unparsed JSON until the cache decides it needs it, so a
/// chunk whose hash is unchanged is never materialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChunk {
    /// Which logical chunk this is.
    pub name: ChunkName,
    /// The unparsed payload.
    pub data: Box<RawValue>,
    /// Opaque fingerprint of `data`.
    pub content_hash: ContentHash,
}

impl RawChunk {
    /// Creates a chunk from an already-serialized JSON payload.
    pub fn from_json(
        name: ChunkName,
        json: impl Into<String>,
        content_hash: impl Into<ContentHash>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name,
            data: RawValue::from_string(json.into())?,
            content_hash: content_hash.into(),
        })
    }

    /// Creates a chunk by serializing `data`.
    pub fn from_value<T: Serialize + ?Sized>(
        name: ChunkName,
        data: &T,
        content_hash: impl Into<ContentHash>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name,
            data: serde_json::value::to_raw_value(data)?,
            content_hash: content_hash.into(),
        })
    }

    /// Creates a chunk by serializing `data` and hashing the serialized text.
    pub fn hashed<T: Serialize + ?Sized>(
        name: ChunkName,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        let data = serde_json::value::to_raw_value(data)?;
        let content_hash = ContentHash::of(data.get().as_bytes());
        Ok(Self {
            name,
            data,
            content_hash,
        })
    }
}
