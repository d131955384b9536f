//! The recompile pipeline.
//!
//! [`RecompilePipeline`] watches a [`BufferMap`](loom_source::BufferMap) and
//! the editor's active-file signal, debounces changes, and runs the external
//! [`Compiler`] at most once at a time. Each successful output is resolved
//! through a [`CompilerOutputCache`](loom_cache::CompilerOutputCache) and
//! handed downstream; every compile publishes `compiler.*` lifecycle events
//! on the [`EventBus`](loom_events::EventBus).

#![warn(missing_docs)]

pub mod compiler;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod state;

pub use compiler::{CompileRequest, Compiler};
pub use config::PipelineConfig;
pub use error::{CompileError, PipelineError};
pub use pipeline::{CompileOutcome, PipelineStatus, RecompilePipeline};
pub use process::ProcessCompiler;
pub use state::{PipelineState, Schedule, Trigger};
