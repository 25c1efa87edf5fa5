//! Stagegraph core types.
//!
//! Shared foundation of the stage-graph compiler:
//!
//! - [`ast`]: declarations, members, statements, expressions and the visitor
//! - [`SourceSet`]: arena of input declarations addressed by [`DeclId`]
//! - [`SymbolHash`]: deterministic identity of types, fields and methods
//! - [`naming`]: lifecycle member naming conventions
//! - [`CompilationError`]: the single error type of a compilation run

pub mod ast;
mod error;
mod ids;
pub mod naming;
mod source_set;
mod span;
mod symbol_hash;

pub use error::{CompilationError, Result};
pub use ids::{CompositionId, DeclId, DependencyId, MemberLoc};
pub use source_set::SourceSet;
pub use span::Span;
pub use symbol_hash::{SymbolHash, hash_constants};
