//! Content-hash memoization of resolved chunks.
//!
//! Each chunk name has at most one [`CacheEntry`]. On every resolution a
//! chunk is reused when its hash matches the entry, decoded and stored when
//! the hash is new, and retained from the entry when the compile omitted it.
//! Only a chunk that has never decoded successfully falls back to its empty
//! default. Malformed payloads are never an error: they are logged and handled
//! exactly like an omitted chunk.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use loom_common::ContentHash;
use loom_output::{
    ChunkName, CompilerOutput, DefinitionIndex, Diagnostics, FactSet, PropertyDependencyIndex,
    ResolvedWorld, SymbolTable, SyntaxTree,
};

use crate::resolved::{Provenance, ResolvedOutput};
use crate::value::{CachedPayload, ChunkValue};

/// The last good resolution of one chunk.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Hash of the payload `value` was decoded from.
    pub content_hash: ContentHash,
    /// The resolved value, shared with every output that used it.
    pub value: ChunkValue,
}

/// Per-chunk cache turning raw compiler output into [`ResolvedOutput`].
///
/// The cache is plain owned state; whoever assembles the pipeline constructs
/// one and hands it in. It is never updated from a failed compile because it
/// only ever sees outputs the compiler actually returned.
#[derive(Debug)]
pub struct CompilerOutputCache {
    /// Last good entry per chunk name.
    entries: HashMap<ChunkName, CacheEntry>,
    /// Empty defaults, created once so defaulted fields stay pointer-stable.
    defaults: HashMap<ChunkName, ChunkValue>,
}

impl CompilerOutputCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            defaults: ChunkName::ALL
                .into_iter()
                .map(|name| (name, ChunkValue::empty(name)))
                .collect(),
        }
    }

    /// Resolves every chunk of `output` into its typed form.
    ///
    /// Resolving the same output twice yields pointer-identical fields.
    pub fn resolve(&mut self, output: &CompilerOutput) -> ResolvedOutput {
        let mut provenance = BTreeMap::new();
        let mut track = |name, how| {
            provenance.insert(name, how);
        };

        let (syntax_tree, how) = self.resolve_chunk::<SyntaxTree>(output);
        track(ChunkName::SyntaxTree, how);
        let (symbol_table, how) = self.resolve_chunk::<SymbolTable>(output);
        track(ChunkName::SymbolTable, how);
        let (fact_set, how) = self.resolve_chunk::<FactSet>(output);
        track(ChunkName::FactSet, how);
        let (property_dependencies, how) = self.resolve_chunk::<PropertyDependencyIndex>(output);
        track(ChunkName::PropertyDependencyIndex, how);
        let (definition_index, how) = self.resolve_chunk::<DefinitionIndex>(output);
        track(ChunkName::DefinitionIndex, how);
        let (world, how) = self.resolve_chunk::<ResolvedWorld>(output);
        track(ChunkName::CompiledWorld, how);
        let (diagnostics, how) = self.resolve_chunk::<Diagnostics>(output);
        track(ChunkName::Diagnostics, how);

        tracing::debug!(
            compile_id = %output.header.compile_id,
            cached = self.entries.len(),
            "resolved compiler output"
        );

        ResolvedOutput {
            header: output.header.clone(),
            syntax_tree,
            symbol_table,
            fact_set,
            property_dependencies,
            definition_index,
            world,
            diagnostics,
            provenance,
        }
    }

    fn resolve_chunk<T: CachedPayload>(&mut self, output: &CompilerOutput) -> (Arc<T>, Provenance) {
        let name = T::CHUNK;
        let cached = self.entries.get(&name).and_then(|entry| {
            T::unwrap(&entry.value).map(|value| (entry.content_hash.clone(), Arc::clone(value)))
        });

        if let Some(chunk) = output.chunk(name) {
            if let Some((hash, value)) = &cached {
                if *hash == chunk.content_hash {
                    return (Arc::clone(value), Provenance::Reused);
                }
            }
            match T::decode(&chunk.data) {
                Ok(decoded) => {
                    let value = Arc::new(decoded);
                    self.entries.insert(
                        name,
                        CacheEntry {
                            content_hash: chunk.content_hash.clone(),
                            value: T::wrap(Arc::clone(&value)),
                        },
                    );
                    return (value, Provenance::Resolved);
                }
                Err(err) => {
                    tracing::warn!(
                        chunk = %name,
                        hash = %chunk.content_hash,
                        error = %err,
                        "ignoring malformed chunk"
                    );
                }
            }
        }

        match cached {
            Some((_, value)) => (value, Provenance::Retained),
            None => (self.default_value::<T>(), Provenance::Defaulted),
        }
    }

    fn default_value<T: CachedPayload>(&self) -> Arc<T> {
        self.defaults
            .get(&T::CHUNK)
            .and_then(T::unwrap)
            .cloned()
            .unwrap_or_default()
    }

    /// Drops every entry. Until chunks are seen again, omitted chunks resolve
    /// to their defaults.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of distinct chunk names currently cached.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for `name`, if any.
    pub fn entry(&self, name: ChunkName) -> Option<&CacheEntry> {
        self.entries.get(&name)
    }

    /// Names of every cached chunk, sorted.
    pub fn cached_names(&self) -> Vec<ChunkName> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort();
        names
    }
}

impl Default for CompilerOutputCache {
    fn default() -> Self {
        Self::new()
    }
}
