//! Typed schemas for every chunk, with their empty defaults.
//!
//! Each schema's [`Default`] is the documented empty value substituted for a
//! chunk that has never been seen: no nodes, no symbols, no facts, empty
//! indexes, no diagnostics. Records keep unrecognized fields in a flattened
//! `extra` map so nothing the compiler emits is dropped.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::chunk::ChunkName;
use crate::error::ChunkError;

/// A typed chunk value that can be decoded from a raw payload.
pub trait ChunkPayload: Default + Sized {
    /// The chunk this type decodes.
    const CHUNK: ChunkName;

    /// Decodes (and, where needed, normalizes) a raw payload.
    fn decode(raw: &RawValue) -> Result<Self, ChunkError>;
}

/// Decodes a payload that needs no normalization.
pub(crate) fn decode_json<T: DeserializeOwned>(
    chunk: ChunkName,
    raw: &RawValue,
) -> Result<T, ChunkError> {
    serde_json::from_str(raw.get()).map_err(|source| ChunkError::Malformed { chunk, source })
}

/// The parsed syntax tree of all input files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxTree {
    /// Top-level nodes, one or more per file.
    pub nodes: Vec<SyntaxNode>,
}

/// A node in the syntax tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxNode {
    /// Node kind (e.g. "location", "rule", "property").
    pub kind: String,
    /// Declared name, if the node declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source file the node came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-indexed source line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Child nodes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SyntaxNode>,
    /// Any other fields the compiler emitted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SyntaxTree {
    /// Counts every node in the tree, children included.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[SyntaxNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.nodes)
    }
}

impl ChunkPayload for SyntaxTree {
    const CHUNK: ChunkName = ChunkName::SyntaxTree;

    fn decode(raw: &RawValue) -> Result<Self, ChunkError> {
        decode_json(Self::CHUNK, raw)
    }
}

/// Every symbol the compiler declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolTable {
    /// Declared symbols, in declaration order.
    pub symbols: Vec<Symbol>,
}

/// A declared symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symbol {
    /// Symbol name.
    pub name: String,
    /// Symbol kind (e.g. "entity", "location", "property").
    pub kind: String,
    /// Declaring file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Declaring line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Any other fields the compiler emitted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SymbolTable {
    /// Looks up a symbol by name.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }
}

impl ChunkPayload for SymbolTable {
    const CHUNK: ChunkName = ChunkName::SymbolTable;

    fn decode(raw: &RawValue) -> Result<Self, ChunkError> {
        decode_json(Self::CHUNK, raw)
    }
}

/// Facts asserted by the story.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactSet {
    /// Asserted facts.
    pub facts: Vec<Fact>,
}

/// A subject–predicate–object fact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fact {
    /// What the fact is about.
    pub subject: String,
    /// The relation asserted.
    pub predicate: String,
    /// The asserted value.
    pub object: Value,
    /// Any other fields the compiler emitted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FactSet {
    /// Returns every fact about `subject`.
    pub fn about<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a Fact> + 'a {
        self.facts.iter().filter(move |f| f.subject == subject)
    }
}

impl ChunkPayload for FactSet {
    const CHUNK: ChunkName = ChunkName::FactSet;

    fn decode(raw: &RawValue) -> Result<Self, ChunkError> {
        decode_json(Self::CHUNK, raw)
    }
}

/// Maps each property to the properties or rules that depend on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDependencyIndex {
    /// Property name → dependents.
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl PropertyDependencyIndex {
    /// Returns the dependents of `property`, or an empty slice.
    pub fn dependents(&self, property: &str) -> &[String] {
        self.dependencies
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl ChunkPayload for PropertyDependencyIndex {
    const CHUNK: ChunkName = ChunkName::PropertyDependencyIndex;

    fn decode(raw: &RawValue) -> Result<Self, ChunkError> {
        decode_json(Self::CHUNK, raw)
    }
}

/// Where each named thing is defined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionIndex {
    /// Name → definition site.
    pub definitions: BTreeMap<String, DefinitionSite>,
}

/// A definition's location in source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionSite {
    /// Defining file.
    pub file: String,
    /// 1-indexed line.
    pub line: u32,
    /// 1-indexed column.
    pub column: u32,
}

impl ChunkPayload for DefinitionIndex {
    const CHUNK: ChunkName = ChunkName::DefinitionIndex;

    fn decode(raw: &RawValue) -> Result<Self, ChunkError> {
        decode_json(Self::CHUNK, raw)
    }
}

/// Diagnostics reported by the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    /// Reported diagnostics, in report order.
    #[serde(alias = "diagnostics")]
    pub items: Vec<Diagnostic>,
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The compile could not produce a usable world.
    Error,
    /// Suspicious but not fatal.
    Warning,
    /// Informational.
    #[default]
    Info,
    /// Style or improvement suggestion.
    Hint,
}

/// A single compiler diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostic {
    /// How serious the problem is.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Stable diagnostic code, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// File the diagnostic points at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-indexed line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 1-indexed column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Diagnostics {
    /// Returns the number of error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

impl ChunkPayload for Diagnostics {
    const CHUNK: ChunkName = ChunkName::Diagnostics;

    fn decode(raw: &RawValue) -> Result<Self, ChunkError> {
        decode_json(Self::CHUNK, raw)
    }
}
