//! Stagegraph
//!
//! Compiles a tree of participating declarations into one merged type whose
//! members are partitioned into lazily initialized stages.
//!
//! - [`core`]: the tree model, symbol hashing and the error type
//! - [`registry`]: the composition tree and per-run bindings
//! - [`compiler`]: the dependency graph, lifecycle synthesis and pipeline
//!
//! ## Example
//!
//! ```
//! use stagegraph::prelude::*;
//!
//! let mut sources = SourceSet::new();
//! let part = sources
//!     .add(
//!         TypeDecl::participating("Part")
//!             .with_field(
//!                 FieldDecl::new("a", TypeRef::int())
//!                     .in_stage("A")
//!                     .with_init(Expr::int(-1)),
//!             )
//!             .with_method(MethodDecl::new("initA", TypeRef::void())),
//!     )
//!     .unwrap();
//! let mut tree = CompositionTree::new();
//! let root = tree.root();
//! tree.add_declaration(root, part, &sources).unwrap();
//!
//! let output = Compiler::new(sources, tree).compile().unwrap();
//! assert_eq!(output.order, ["A"]);
//! assert!(output.merged.has_method_named("close"));
//! ```

pub use stagegraph_compiler as compiler;
pub use stagegraph_core as core;
pub use stagegraph_registry as registry;

pub use stagegraph_compiler::{CompilationOutput, Compiler, CompilerOptions};
pub use stagegraph_core::{CompilationError, Result, SourceSet};
pub use stagegraph_registry::CompositionTree;

pub mod prelude {
    pub use stagegraph_compiler::{CompilationOutput, Compiler, CompilerOptions};
    pub use stagegraph_core::ast::{
        Block, ConstructorDecl, Expr, FieldDecl, FieldRef, Marked, Marker, MethodDecl, MethodRef,
        Modifiers, Param, Stmt, TypeDecl, TypeRef,
    };
    pub use stagegraph_core::{CompilationError, DeclId, Result, SourceSet};
    pub use stagegraph_registry::CompositionTree;
}
