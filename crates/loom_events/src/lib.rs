//! Lifecycle events published by the recompile pipeline, and the bus that
//! carries them.
//!
//! Events serialize with a `type` tag holding the dotted event name
//! (`compiler.started`, `compiler.completed`, `compiler.error`,
//! `editor.activeFileChanged`) and camelCase fields, so they can be written
//! straight to an editor or UI as JSON lines.

#![warn(missing_docs)]

pub mod bus;
pub mod event;

pub use bus::EventBus;
pub use event::{LoomEvent, WorldSummary};
