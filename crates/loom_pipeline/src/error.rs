//! Error types for compiling and driving the pipeline.

use std::process::ExitStatus;

/// Errors produced by a [`Compiler`](crate::Compiler) invocation.
///
/// The pipeline never propagates these; it reports them as
/// `compiler.error` events and [`CompileOutcome::Failed`](crate::CompileOutcome::Failed).
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The compiler process could not be started.
    #[error("failed to start compiler '{command}': {source}")]
    Spawn {
        /// The command that was run.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Communicating with the compiler process failed.
    #[error("compiler i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The compiler process exited unsuccessfully.
    #[error("compiler failed ({status}): {stderr}")]
    ExitStatus {
        /// Exit status of the process.
        status: ExitStatus,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The compile request could not be serialized.
    #[error("failed to encode compile request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The compiler's output was not a valid compiler output document.
    #[error("failed to decode compiler output: {0}")]
    Decode(#[source] serde_json::Error),

    /// Any other failure reported by a compiler implementation.
    #[error("{0}")]
    Failed(String),
}

/// Errors returned by [`RecompilePipeline`](crate::RecompilePipeline) handle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The pipeline task has exited.
    #[error("recompile pipeline is closed")]
    Closed,
}
