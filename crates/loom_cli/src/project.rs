//! Shared project helpers for CLI commands.
//!
//! Contains the steps every compiling command repeats: project root
//! resolution, configuration loading, source discovery, hydrating a
//! [`BufferMap`] from disk, and building the compiler and pipeline settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use loom_config::{ConfigError, ProjectConfig, CONFIG_FILE_NAME};
use loom_pipeline::{PipelineConfig, ProcessCompiler};
use loom_source::{is_source_path, BufferMap};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `loom.toml`.
///
/// Returns the directory containing `loom.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `loom.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(|parent| parent.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Loads the project configuration, honoring an explicit `--config` file.
pub fn load_project_config(
    global: &GlobalArgs,
    project_dir: &Path,
) -> Result<ProjectConfig, ConfigError> {
    match global.config.as_deref().map(Path::new) {
        Some(path) if path.is_file() => loom_config::load_config_from_path(path),
        _ => loom_config::load_config(project_dir),
    }
}

/// Discovers source files in the given directory (recursive).
///
/// Returns files whose extension is one of `extensions`, sorted by path.
pub fn discover_source_files(
    dir: &Path,
    extensions: &[String],
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    walk_dir(dir, extensions, &mut files)?;
    files.sort();
    Ok(files)
}

/// Recursively walks a directory collecting source files.
fn walk_dir(
    dir: &Path,
    extensions: &[String],
    files: &mut Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // Symlinked directories are not followed.
        if entry.file_type()?.is_dir() {
            walk_dir(&path, extensions, files)?;
        } else if is_source_path(&path, extensions) {
            files.push(path);
        }
    }
    Ok(())
}

/// Loads every source file of the project into a fresh [`BufferMap`].
///
/// Buffers are keyed by their path relative to `project_dir` and start clean.
/// A missing source directory yields an empty map.
pub fn load_buffers(
    project_dir: &Path,
    config: &ProjectConfig,
) -> Result<Arc<BufferMap>, Box<dyn std::error::Error>> {
    let buffers = Arc::new(BufferMap::new());
    let src_dir = config.source_dir(project_dir);
    if !src_dir.is_dir() {
        tracing::warn!(dir = %src_dir.display(), "source directory does not exist");
        return Ok(buffers);
    }
    for path in discover_source_files(&src_dir, &config.sources.extensions)? {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let key = path
            .strip_prefix(project_dir)
            .map(Path::to_path_buf)
            .unwrap_or(path);
        tracing::debug!(path = %key.display(), bytes = content.len(), "loaded source");
        buffers.load(key, content);
    }
    Ok(buffers)
}

/// Builds the external compiler from the `[compiler]` section.
///
/// The compiler runs from the project root so relative paths resolve.
pub fn build_compiler(
    project_dir: &Path,
    config: &ProjectConfig,
) -> Result<ProcessCompiler, ConfigError> {
    let command = config
        .compiler
        .command
        .as_deref()
        .ok_or_else(|| ConfigError::MissingField("compiler.command".to_string()))?;
    Ok(ProcessCompiler::new(command)
        .with_args(config.compiler.args.iter().cloned())
        .with_working_dir(project_dir))
}

/// Derives pipeline settings from the project configuration.
pub fn pipeline_config(config: &ProjectConfig) -> PipelineConfig {
    PipelineConfig {
        debounce: config.pipeline.debounce(),
        entry: config.entry(),
        source_extensions: config.sources.extensions.clone(),
    }
}

/// Builds the tokio runtime the async commands run on.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
