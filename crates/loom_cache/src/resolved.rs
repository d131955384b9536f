//! The typed result of resolving one compiler output.

use std::collections::BTreeMap;
use std::sync::Arc;

use loom_output::{
    ChunkName, CompileHeader, DefinitionIndex, Diagnostics, FactSet, PropertyDependencyIndex,
    ResolvedWorld, SymbolTable, SyntaxTree, WorldCounts,
};
use serde::{Deserialize, Serialize};

use crate::value::{CachedPayload, ChunkValue};

/// How a chunk's resolved value was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// The chunk was present with an unchanged hash; the cached value was reused.
    Reused,
    /// The chunk was present with a new hash and was decoded afresh.
    Resolved,
    /// The chunk was absent (or undecodable); the last good value was kept.
    Retained,
    /// The chunk has never been seen; the empty default was used.
    Defaulted,
}

/// A compiler output with every chunk resolved to its typed form.
///
/// A fresh `ResolvedOutput` is produced by every resolution, but fields whose
/// chunk was reused or retained share their allocation with earlier results.
/// Compare fields with [`Arc::ptr_eq`] to detect that nothing changed.
#[derive(Debug, Clone)]
pub struct ResolvedOutput {
    /// Header of the output this was resolved from.
    pub header: CompileHeader,
    /// Resolved `syntaxTree` chunk.
    pub syntax_tree: Arc<SyntaxTree>,
    /// Resolved `symbolTable` chunk.
    pub symbol_table: Arc<SymbolTable>,
    /// Resolved `factSet` chunk.
    pub fact_set: Arc<FactSet>,
    /// Resolved `propertyDependencyIndex` chunk.
    pub property_dependencies: Arc<PropertyDependencyIndex>,
    /// Resolved `definitionIndex` chunk.
    pub definition_index: Arc<DefinitionIndex>,
    /// Resolved `compiledWorld` chunk, normalized and raw.
    pub world: Arc<ResolvedWorld>,
    /// Resolved `diagnostics` chunk.
    pub diagnostics: Arc<Diagnostics>,
    /// How each chunk was obtained.
    pub provenance: BTreeMap<ChunkName, Provenance>,
}

impl ResolvedOutput {
    /// Returns the resolved value for `name` in type-erased form.
    pub fn value(&self, name: ChunkName) -> ChunkValue {
        match name {
            ChunkName::SyntaxTree => SyntaxTree::wrap(Arc::clone(&self.syntax_tree)),
            ChunkName::SymbolTable => SymbolTable::wrap(Arc::clone(&self.symbol_table)),
            ChunkName::FactSet => FactSet::wrap(Arc::clone(&self.fact_set)),
            ChunkName::PropertyDependencyIndex => {
                PropertyDependencyIndex::wrap(Arc::clone(&self.property_dependencies))
            }
            ChunkName::DefinitionIndex => DefinitionIndex::wrap(Arc::clone(&self.definition_index)),
            ChunkName::CompiledWorld => ResolvedWorld::wrap(Arc::clone(&self.world)),
            ChunkName::Diagnostics => Diagnostics::wrap(Arc::clone(&self.diagnostics)),
        }
    }

    /// Returns how the chunk `name` was obtained.
    pub fn provenance(&self, name: ChunkName) -> Provenance {
        self.provenance
            .get(&name)
            .copied()
            .unwrap_or(Provenance::Defaulted)
    }

    /// Counts taken from the resolved world.
    ///
    /// These reflect the world actually held, so a retained world reports its
    /// retained counts rather than whatever the header claims.
    pub fn world_counts(&self) -> WorldCounts {
        let world = &self.world.world;
        WorldCounts {
            entities: world.entities.len(),
            locations: world.locations.len(),
            exits: world.exit_count(),
            properties: world.properties.len(),
            rules: world.rules.len(),
        }
    }

    /// Returns `true` if the resolved diagnostics contain an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}
