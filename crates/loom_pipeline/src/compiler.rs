//! The external compiler collaborator.

use std::collections::BTreeMap;
use std::path::PathBuf;

use futures::future::BoxFuture;
use loom_output::CompilerOutput;

use crate::error::CompileError;

/// Everything the compiler receives for one compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileRequest {
    /// Snapshot of every buffer, keyed by path.
    pub buffers: BTreeMap<PathBuf, String>,
    /// Preferred entry file, if one is known.
    pub entry_hint: Option<PathBuf>,
}

impl CompileRequest {
    /// Number of input files in the request.
    pub fn input_file_count(&self) -> usize {
        self.buffers.len()
    }
}

/// An asynchronous compiler.
///
/// Each call is an independent unit of work; no purity or idempotence is
/// assumed. The returned future must not borrow from `self` so the pipeline
/// can hold it across other work while it runs.
pub trait Compiler: Send + Sync {
    /// Compiles the request.
    fn compile(&self, request: CompileRequest) -> BoxFuture<'static, Result<CompilerOutput, CompileError>>;
}
