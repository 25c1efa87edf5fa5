//! Stagegraph Compiler
//!
//! Merges a composition tree of participating declarations into one
//! flattened type, wiring lazily initialized stages through a dependency
//! graph.
//!
//! ## Architecture
//!
//! - **Analysis**: bind reference fields, discover stages and method nodes,
//!   check stage field writes, link dependencies, order them topologically
//! - **Transformation**: synthesize guarded accesses and lifecycle methods,
//!   merge extension chains and compositions, rename, lay out and emit
//!
//! ## Modules
//!
//! - [`compiler`]: the [`Compiler`] entry point
//! - [`context`]: state shared by the passes
//! - [`graph`]: dependency graph over stages and method nodes
//! - [`merge`]: extension-chain and composition merging
//! - [`passes`]: the pipeline
//! - [`synthesis`]: lifecycle member synthesis

pub mod compiler;
pub mod context;
pub mod graph;
pub mod memo;
pub mod merge;
pub mod method_node;
pub mod options;
pub mod passes;
pub mod stage;
pub mod synthesis;

#[cfg(test)]
mod testing;

pub use compiler::{CompilationOutput, Compiler};
pub use context::CompileContext;
pub use graph::{DependencyGraph, DependencyNode, Route};
pub use method_node::MethodNode;
pub use options::{CompilerOptions, DEFAULT_CLOSE_INTERFACE};
pub use stage::Stage;

pub use stagegraph_core::{CompilationError, Result};
