//! The complete result of one compiler run.

use std::collections::BTreeMap;

use loom_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkName, RawChunk};
use crate::header::CompileHeader;

/// Raw compiler output: a header plus whatever chunks the compiler emitted.
///
/// A compile that stopped early (for instance after a parse failure) emits
/// only a subset of chunks; the missing ones are filled in by the cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerOutput {
    /// Compile metadata.
    #[serde(default)]
    pub header: CompileHeader,
    /// Emitted chunks, in emission order.
    #[serde(default)]
    pub chunks: Vec<RawChunk>,
}

impl CompilerOutput {
    /// Creates an output with the given header and no chunks.
    pub fn new(header: CompileHeader) -> Self {
        Self {
            header,
            chunks: Vec::new(),
        }
    }

    /// Appends a chunk, returning the output for chaining.
    pub fn with_chunk(mut self, chunk: RawChunk) -> Self {
        self.chunks.push(chunk);
        self
    }

    /// Parses an output from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Parses an output from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns the chunk with the given name. If the compiler emitted the
    /// name more than once, the last occurrence wins.
    pub fn chunk(&self, name: ChunkName) -> Option<&RawChunk> {
        self.chunks.iter().rev().find(|chunk| chunk.name == name)
    }

    /// Returns the content hash of every emitted chunk, keyed by name.
    pub fn chunk_hashes(&self) -> BTreeMap<ChunkName, ContentHash> {
        self.chunks
            .iter()
            .map(|chunk| (chunk.name, chunk.content_hash.clone()))
            .collect()
    }

    /// Returns the number of distinct chunk names emitted.
    pub fn distinct_chunk_count(&self) -> usize {
        self.chunk_hashes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRE: &str = r#"{
        "header": {"compileId": "7", "inputFileCount": 1},
        "chunks": [
            {"name": "diagnostics", "data": {"items": []}, "contentHash": "d1"},
            {"name": "symbolTable", "data": {"symbols": []}, "contentHash": "s1"},
            {"name": "diagnostics", "data": {"items": []}, "contentHash": "d2"}
        ]
    }"#;

    #[test]
    fn parse_wire_output() {
        let output = CompilerOutput::from_json(WIRE).unwrap();
        assert_eq!(output.header.compile_id, "7");
        assert_eq!(output.chunks.len(), 3);
    }

    #[test]
    fn last_duplicate_wins() {
        let output = CompilerOutput::from_json(WIRE).unwrap();
        let diag = output.chunk(ChunkName::Diagnostics).unwrap();
        assert_eq!(diag.content_hash, ContentHash::new("d2"));
        assert_eq!(
            output.chunk_hashes()[&ChunkName::Diagnostics],
            ContentHash::new("d2")
        );
        assert_eq!(output.distinct_chunk_count(), 2);
    }

    #[test]
    fn missing_chunk_is_none() {
        let output = CompilerOutput::from_json(WIRE).unwrap();
        assert!(output.chunk(ChunkName::CompiledWorld).is_none());
    }

    #[test]
    fn chunk_hashes_serialize_with_wire_names() {
        let output = CompilerOutput::from_json(WIRE).unwrap();
        let json = serde_json::to_value(output.chunk_hashes()).unwrap();
        assert_eq!(json["symbolTable"], "s1");
    }
}
