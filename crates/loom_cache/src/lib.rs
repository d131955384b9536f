//! Per-chunk resolution cache for compiler output.
//!
//! [`CompilerOutputCache`] turns a raw [`CompilerOutput`](loom_output::CompilerOutput)
//! into a fully typed [`ResolvedOutput`], memoizing each chunk by its content
//! hash and retaining the last good value of any chunk a compile omits.

#![warn(missing_docs)]

pub mod cache;
pub mod resolved;
pub mod value;

pub use cache::{CacheEntry, CompilerOutputCache};
pub use resolved::{Provenance, ResolvedOutput};
pub use value::{CachedPayload, ChunkValue};
