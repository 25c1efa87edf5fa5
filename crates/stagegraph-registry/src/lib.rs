//! Stagegraph registry crate.
//!
//! - [`CompositionTree`]: the tree of output types and cross-node access paths
//! - [`CompilationRegistry`]: per-run member bindings and layout ordering keys

mod composition;
mod registry;

pub use composition::{CompositionNode, CompositionTree};
pub use registry::{CompilationRegistry, LAYOUT_STRIDE, LayoutCategory, MemberRole};
