//! Snapshot of a single in-memory source buffer.

use std::path::PathBuf;

/// A source buffer held by the [`BufferMap`](crate::BufferMap).
///
/// Buffers created by `load` start clean; buffers created or changed by
/// `set` are dirty until explicitly marked clean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    /// The buffer's path. Need not exist on disk.
    pub path: PathBuf,
    /// The full text content.
    pub content: String,
    /// Whether the content changed since it was last marked clean.
    pub dirty: bool,
}
