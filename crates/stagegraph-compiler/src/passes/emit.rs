//! Emit Pass - detach the finished declaration from the composition tree.
//!
//! Compiler markers are stripped from the type and all of its members,
//! nested types included. `Override` survives. Fields and methods are then
//! sorted by their layout key.

use tracing::debug;

use stagegraph_core::ast::{Marked, TypeDecl};
use stagegraph_core::{CompilationError, Result};

use crate::context::CompileContext;

pub struct EmitPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> EmitPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<TypeDecl> {
        let root = self.cx.tree.root();
        let mut merged = self.cx.tree.node_mut(root).merged.take().ok_or_else(|| {
            CompilationError::EmptyComposition {
                node: root.to_string(),
            }
        })?;
        strip_markers(&mut merged);
        merged.sort_members();
        debug!(name = %merged.name, "merged declaration emitted");
        Ok(merged)
    }
}

fn strip_markers(decl: &mut TypeDecl) {
    decl.strip_compiler_markers();
    for field in &mut decl.fields {
        field.strip_compiler_markers();
    }
    for method in &mut decl.methods {
        method.strip_compiler_markers();
    }
    decl.nested.iter_mut().for_each(strip_markers);
}
