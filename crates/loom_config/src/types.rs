//! Configuration types deserialized from `loom.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default debounce period in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Default event bus capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// The top-level project configuration parsed from `loom.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Where source files live.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Recompile pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// The external compiler to run.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Event bus settings.
    #[serde(default)]
    pub events: EventsConfig,
}

/// Core project metadata required in every `loom.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: Option<String>,
    /// Entry file passed to the compiler when no file is active.
    #[serde(default)]
    pub entry: Option<String>,
}

/// Source discovery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Directory holding source files, relative to the project root.
    #[serde(default = "default_source_dir")]
    pub dir: String,
    /// Recognized source file extensions, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            dir: default_source_dir(),
            extensions: default_extensions(),
        }
    }
}

/// Recompile pipeline settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// Quiet period after the last change before compiling.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl PipelineSettings {
    /// The debounce period as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// The external compiler command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerConfig {
    /// Program to run. Required by commands that compile.
    pub command: Option<String>,
    /// Arguments passed before the request is written to stdin.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Event bus settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Events buffered per subscriber before the oldest are dropped.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ProjectConfig {
    /// Absolute source directory for a project rooted at `root`.
    pub fn source_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.sources.dir)
    }

    /// The configured entry file, if any.
    pub fn entry(&self) -> Option<PathBuf> {
        self.project.entry.as_ref().map(PathBuf::from)
    }
}

fn default_source_dir() -> String {
    "src".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["loom".to_string()]
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}
