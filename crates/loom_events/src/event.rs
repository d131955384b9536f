//! Event types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use loom_common::ContentHash;
use loom_output::{ChunkName, WorldCounts};
use serde::{Deserialize, Serialize};

/// Events flowing over the [`EventBus`](crate::EventBus).
///
/// The three `compiler.*` events for one compile id are always published in
/// order (started, then exactly one of completed or error) and never
/// interleave with another compile's events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoomEvent {
    /// A compile is about to call the external compiler.
    #[serde(rename = "compiler.started", rename_all = "camelCase")]
    CompilerStarted {
        /// Pipeline-assigned compile id.
        compile_id: u64,
        /// When the compile started, as epoch milliseconds.
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        /// Number of buffers sent to the compiler.
        input_file_count: usize,
    },

    /// A compile finished and its output was resolved.
    #[serde(rename = "compiler.completed", rename_all = "camelCase")]
    CompilerCompleted {
        /// Pipeline-assigned compile id.
        compile_id: u64,
        /// Wall-clock time of the compiler call, in milliseconds.
        duration_ms: f64,
        /// Content hash of every chunk the compiler emitted.
        chunk_hashes: BTreeMap<ChunkName, ContentHash>,
        /// Summary counts of the resolved world.
        world_counts: WorldSummary,
    },

    /// The compiler call failed. Nothing was resolved.
    #[serde(rename = "compiler.error", rename_all = "camelCase")]
    CompilerError {
        /// Pipeline-assigned compile id.
        compile_id: u64,
        /// Description of the failure.
        error: String,
    },

    /// The editor focused a different file.
    #[serde(rename = "editor.activeFileChanged")]
    ActiveFileChanged {
        /// Path of the newly active file.
        path: PathBuf,
    },
}

impl LoomEvent {
    /// Builds a `compiler.started` event stamped with the current time.
    pub fn started(compile_id: u64, input_file_count: usize) -> Self {
        LoomEvent::CompilerStarted {
            compile_id,
            timestamp: Utc::now(),
            input_file_count,
        }
    }

    /// Builds an `editor.activeFileChanged` event.
    pub fn active_file_changed(path: impl Into<PathBuf>) -> Self {
        LoomEvent::ActiveFileChanged { path: path.into() }
    }

    /// Returns the dotted event name used as the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            LoomEvent::CompilerStarted { .. } => "compiler.started",
            LoomEvent::CompilerCompleted { .. } => "compiler.completed",
            LoomEvent::CompilerError { .. } => "compiler.error",
            LoomEvent::ActiveFileChanged { .. } => "editor.activeFileChanged",
        }
    }

    /// Returns the compile id for `compiler.*` events.
    pub fn compile_id(&self) -> Option<u64> {
        match self {
            LoomEvent::CompilerStarted { compile_id, .. }
            | LoomEvent::CompilerCompleted { compile_id, .. }
            | LoomEvent::CompilerError { compile_id, .. } => Some(*compile_id),
            LoomEvent::ActiveFileChanged { .. } => None,
        }
    }

    /// Returns `true` for events raised by the editor rather than the compiler.
    pub fn is_editor(&self) -> bool {
        matches!(self, LoomEvent::ActiveFileChanged { .. })
    }

    /// Returns `true` for `compiler.completed` and `compiler.error`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoomEvent::CompilerCompleted { .. } | LoomEvent::CompilerError { .. }
        )
    }
}

/// The world counts carried by `compiler.completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSummary {
    /// Number of entities.
    pub entities: usize,
    /// Number of locations.
    pub locations: usize,
    /// Number of exits.
    pub exits: usize,
}

impl From<WorldCounts> for WorldSummary {
    fn from(counts: WorldCounts) -> Self {
        Self {
            entities: counts.entities,
            locations: counts.locations,
            exits: counts.exits,
        }
    }
}
