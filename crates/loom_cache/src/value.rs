//! Type-erased resolved chunk values.

use std::sync::Arc;

use loom_output::{
    ChunkError, ChunkName, ChunkPayload, DefinitionIndex, Diagnostics, FactSet,
    PropertyDependencyIndex, ResolvedWorld, SymbolTable, SyntaxTree,
};
use serde_json::value::RawValue;

/// A resolved chunk value of any kind, shared by reference.
///
/// Cloning only bumps the reference count, so a value reused across
/// resolutions stays pointer-identical.
#[derive(Debug, Clone)]
pub enum ChunkValue {
    /// Resolved `syntaxTree` chunk.
    SyntaxTree(Arc<SyntaxTree>),
    /// Resolved `symbolTable` chunk.
    SymbolTable(Arc<SymbolTable>),
    /// Resolved `factSet` chunk.
    FactSet(Arc<FactSet>),
    /// Resolved `propertyDependencyIndex` chunk.
    PropertyDependencyIndex(Arc<PropertyDependencyIndex>),
    /// Resolved `definitionIndex` chunk.
    DefinitionIndex(Arc<DefinitionIndex>),
    /// Resolved `compiledWorld` chunk.
    CompiledWorld(Arc<ResolvedWorld>),
    /// Resolved `diagnostics` chunk.
    Diagnostics(Arc<Diagnostics>),
}

impl ChunkValue {
    /// Returns the chunk this value belongs to.
    pub fn name(&self) -> ChunkName {
        match self {
            ChunkValue::SyntaxTree(_) => ChunkName::SyntaxTree,
            ChunkValue::SymbolTable(_) => ChunkName::SymbolTable,
            ChunkValue::FactSet(_) => ChunkName::FactSet,
            ChunkValue::PropertyDependencyIndex(_) => ChunkName::PropertyDependencyIndex,
            ChunkValue::DefinitionIndex(_) => ChunkName::DefinitionIndex,
            ChunkValue::CompiledWorld(_) => ChunkName::CompiledWorld,
            ChunkValue::Diagnostics(_) => ChunkName::Diagnostics,
        }
    }

    /// Returns the empty default for `name`.
    pub fn empty(name: ChunkName) -> Self {
        match name {
            ChunkName::SyntaxTree => SyntaxTree::wrap(Arc::default()),
            ChunkName::SymbolTable => SymbolTable::wrap(Arc::default()),
            ChunkName::FactSet => FactSet::wrap(Arc::default()),
            ChunkName::PropertyDependencyIndex => PropertyDependencyIndex::wrap(Arc::default()),
            ChunkName::DefinitionIndex => DefinitionIndex::wrap(Arc::default()),
            ChunkName::CompiledWorld => ResolvedWorld::wrap(Arc::default()),
            ChunkName::Diagnostics => Diagnostics::wrap(Arc::default()),
        }
    }

    /// Decodes a raw payload for `name`.
    pub fn decode(name: ChunkName, raw: &RawValue) -> Result<Self, ChunkError> {
        fn typed<T: CachedPayload>(raw: &RawValue) -> Result<ChunkValue, ChunkError> {
            T::decode(raw).map(|value| T::wrap(Arc::new(value)))
        }
        match name {
            ChunkName::SyntaxTree => typed::<SyntaxTree>(raw),
            ChunkName::SymbolTable => typed::<SymbolTable>(raw),
            ChunkName::FactSet => typed::<FactSet>(raw),
            ChunkName::PropertyDependencyIndex => typed::<PropertyDependencyIndex>(raw),
            ChunkName::DefinitionIndex => typed::<DefinitionIndex>(raw),
            ChunkName::CompiledWorld => typed::<ResolvedWorld>(raw),
            ChunkName::Diagnostics => typed::<Diagnostics>(raw),
        }
    }

    /// Returns `true` if both values share the same allocation.
    pub fn ptr_eq(&self, other: &ChunkValue) -> bool {
        match (self, other) {
            (ChunkValue::SyntaxTree(a), ChunkValue::SyntaxTree(b)) => Arc::ptr_eq(a, b),
            (ChunkValue::SymbolTable(a), ChunkValue::SymbolTable(b)) => Arc::ptr_eq(a, b),
            (ChunkValue::FactSet(a), ChunkValue::FactSet(b)) => Arc::ptr_eq(a, b),
            (ChunkValue::PropertyDependencyIndex(a), ChunkValue::PropertyDependencyIndex(b)) => {
                Arc::ptr_eq(a, b)
            }
            (ChunkValue::DefinitionIndex(a), ChunkValue::DefinitionIndex(b)) => Arc::ptr_eq(a, b),
            (ChunkValue::CompiledWorld(a), ChunkValue::CompiledWorld(b)) => Arc::ptr_eq(a, b),
            (ChunkValue::Diagnostics(a), ChunkValue::Diagnostics(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A chunk payload that can be stored in a [`ChunkValue`].
pub trait CachedPayload: ChunkPayload {
    /// Wraps a shared value.
    fn wrap(value: Arc<Self>) -> ChunkValue;

    /// Borrows the shared value if `value` holds this payload type.
    fn unwrap(value: &ChunkValue) -> Option<&Arc<Self>>;
}

macro_rules! cached_payload {
    ($ty:ty, $variant:ident) => {
        impl CachedPayload for $ty {
            fn wrap(value: Arc<Self>) -> ChunkValue {
                ChunkValue::$variant(value)
            }

            fn unwrap(value: &ChunkValue) -> Option<&Arc<Self>> {
                match value {
                    ChunkValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

cached_payload!(SyntaxTree, SyntaxTree);
cached_payload!(SymbolTable, SymbolTable);
cached_payload!(FactSet, FactSet);
cached_payload!(PropertyDependencyIndex, PropertyDependencyIndex);
cached_payload!(DefinitionIndex, DefinitionIndex);
cached_payload!(ResolvedWorld, CompiledWorld);
cached_payload!(Diagnostics, Diagnostics);
