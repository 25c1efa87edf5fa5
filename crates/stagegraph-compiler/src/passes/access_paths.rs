//! Access Path Pass - resolve reference fields and parent-access fields.
//!
//! Every reference field in a composite declaration's extension chain must be
//! assignable from exactly one composite declaration. The field is bound to
//! it, and if that declaration's composition node is a direct child of the
//! referencing node, the first such field becomes the child's parent-access
//! field. Root access paths are computed last, so every non-root node must
//! have gained a parent-access field by then.
//!
//! ## Example
//!
//! ```text
//! class Outer { @Reference Inner inner; }    node(Outer) ── inner ──> node(Inner)
//! class Inner { @Reference Outer outer; }    Inner.outer: bound, not a parent field
//! ```

use tracing::debug;

use stagegraph_core::ast::Marked;
use stagegraph_core::{CompilationError, DeclId, Result};

use crate::context::CompileContext;

/// Output of the access path pass.
#[derive(Debug, Default)]
pub struct AccessPathOutput {
    /// Number of reference fields bound to a declaration.
    pub references_bound: usize,
    /// Number of reference fields that became parent-access fields.
    pub parent_access_fields: usize,
}

pub struct AccessPathPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> AccessPathPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<AccessPathOutput> {
        let mut output = AccessPathOutput::default();
        let leaves: Vec<DeclId> = self.cx.tree.leaves().to_vec();

        for (leaf, chain) in self.cx.chains() {
            let Some(referencing) = self.cx.tree.node_of_leaf(leaf) else {
                continue;
            };
            for decl in chain {
                let declaration = self.cx.sources.get(decl);
                let references: Vec<_> = declaration
                    .fields
                    .iter()
                    .filter(|f| f.is_reference())
                    .map(|f| (f.id, f.as_ref(&declaration.name), f.ty.clone()))
                    .collect();

                for (id, field, ty) in references {
                    let candidates: Vec<DeclId> = leaves
                        .iter()
                        .copied()
                        .filter(|&c| self.cx.sources.is_assignable(&ty, c))
                        .collect();
                    let [referenced] = candidates[..] else {
                        return Err(CompilationError::AmbiguousReference {
                            declaration: field.owner.clone(),
                            field: field.name.clone(),
                            candidates: candidates
                                .iter()
                                .map(|&c| self.cx.sources.name(c).to_string())
                                .collect(),
                        });
                    };
                    self.cx.registry.bind_reference(id, referenced);
                    output.references_bound += 1;

                    let Some(referenced_node) = self.cx.tree.node_of_leaf(referenced) else {
                        continue;
                    };
                    if self.cx.tree.parent(referenced_node) == Some(referencing)
                        && self.cx.tree.offer_parent_access_field(referenced_node, field)
                    {
                        output.parent_access_fields += 1;
                    }
                }
            }
        }

        self.cx.tree.compute_root_access_paths(&self.cx.sources)?;
        debug!(
            references = output.references_bound,
            parent_fields = output.parent_access_fields,
            "access paths computed"
        );
        Ok(output)
    }
}
