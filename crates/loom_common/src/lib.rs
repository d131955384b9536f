//! Shared foundational types used across the Loom workbench.
//!
//! Currently this is the opaque [`ContentHash`] token that compiler outputs
//! attach to every chunk they emit.

#![warn(missing_docs)]

pub mod hash;

pub use hash::ContentHash;
