//! Structural merging of declarations into output types.
//!
//! - [`chain`]: folding an extension chain into its leaf declaration
//! - [`composition`]: combining the declarations of a composition node and
//!   nesting child nodes

pub mod chain;
pub mod composition;

pub use chain::merge_chain;
pub use composition::{merge_declarations, nest_child};
