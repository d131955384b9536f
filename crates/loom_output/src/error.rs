//! Error types for chunk decoding.

use crate::chunk::ChunkName;

/// Errors produced while decoding a chunk payload into its typed schema.
///
/// These never escape the cache: a chunk that fails to decode is treated as
/// if it had been omitted from the output.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The payload is not valid JSON for the chunk's schema.
    #[error("malformed {chunk} payload: {source}")]
    Malformed {
        /// The chunk whose payload failed to decode.
        chunk: ChunkName,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

impl ChunkError {
    /// Returns the chunk the error refers to.
    pub fn chunk(&self) -> ChunkName {
        match self {
            ChunkError::Malformed { chunk, .. } => *chunk,
        }
    }
}
