//! In-memory source buffers for a compilation session.
//!
//! This crate provides the [`BufferMap`], the authoritative store of every
//! file the recompile pipeline compiles, together with per-path dirty
//! tracking and change notification through [`Subscription`] guards.

#![warn(missing_docs)]

pub mod buffer;
pub mod buffer_map;
pub mod language;
pub mod listeners;

pub use buffer::Buffer;
pub use buffer_map::BufferMap;
pub use language::{is_source_path, DEFAULT_SOURCE_EXTENSIONS};
pub use listeners::Subscription;
