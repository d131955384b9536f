//! The shape of what the external Loom compiler produces.
//!
//! A [`CompilerOutput`] is a [`CompileHeader`] plus a list of [`RawChunk`]s,
//! each a named, independently hashed payload kept as unparsed JSON. This
//! crate also defines the typed schema every [`ChunkName`] decodes into (see
//! [`ChunkPayload`]), the empty default used when a chunk has never been
//! seen, and the normalization that turns the compiler's id-keyed world
//! collections into order-stable record arrays.

#![warn(missing_docs)]

pub mod chunk;
pub mod error;
pub mod header;
pub mod normalize;
pub mod output;
pub mod schema;
pub mod world;

pub use chunk::{ChunkName, RawChunk, UnknownChunkName};
pub use error::ChunkError;
pub use header::{CompileHeader, PhaseTiming, WorldCounts};
pub use output::CompilerOutput;
pub use schema::{
    ChunkPayload, DefinitionIndex, DefinitionSite, Diagnostic, Diagnostics, Fact, FactSet,
    PropertyDependencyIndex, Severity, Symbol, SymbolTable, SyntaxNode, SyntaxTree,
};
pub use world::{CompiledWorld, Entity, Exit, Location, LocationExit, ResolvedWorld};
