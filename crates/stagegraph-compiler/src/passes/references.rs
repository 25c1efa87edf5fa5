//! Reference Pass - replace reference fields with nesting-aware accesses.
//!
//! Reference fields only exist to let separately written declarations name
//! each other. Once merged, the referenced declaration is either the same
//! type, an enclosing type or a nested type reached through parent-access
//! fields, so every read or write of a reference field is replaced with the
//! access expression from the referencing composition node to the
//! referenced one. Only the outermost reference access of an expression is
//! replaced; the inner ones are discarded with it.
//!
//! Reference fields that are not a parent-access field are then removed.
//! Field locations recorded before this pass are stale afterwards.
//!
//! ## Example
//!
//! ```text
//! // in Inner, nested in Outer        // after
//! outer.total                          Outer.this.total
//! // in Outer
//! inner.count                          Outer.this.inner.count
//! ```

use rustc_hash::FxHashSet;
use tracing::debug;

use stagegraph_core::ast::visitor::{VisitorMut, walk_expr_mut};
use stagegraph_core::ast::{Expr, Marked};
use stagegraph_core::{CompositionId, DeclId, Result, SymbolHash};

use crate::context::CompileContext;

/// Output of the reference pass.
#[derive(Debug, Default)]
pub struct ReferenceOutput {
    pub accesses_replaced: usize,
    pub fields_removed: usize,
}

pub struct ReferencePass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> ReferencePass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> Result<ReferenceOutput> {
        let mut output = ReferenceOutput::default();
        let mut rewritten = FxHashSet::default();

        for (leaf, chain) in self.cx.chains() {
            let Some(referencing) = self.cx.tree.node_of_leaf(leaf) else {
                continue;
            };
            for decl in chain {
                if !rewritten.insert(decl) {
                    continue;
                }
                output.accesses_replaced += self.replace_accesses(decl, referencing);
            }
        }
        for decl in rewritten {
            output.fields_removed += self.remove_extra_fields(decl);
        }

        debug!(
            replaced = output.accesses_replaced,
            removed = output.fields_removed,
            "reference fields resolved"
        );
        Ok(output)
    }

    fn replace_accesses(&mut self, decl: DeclId, referencing: CompositionId) -> usize {
        let mut declaration = self.cx.sources.get(decl).clone();
        let mut replacer = AccessReplacer {
            cx: &*self.cx,
            referencing,
            replaced: 0,
        };
        replacer.visit_type_decl_mut(&mut declaration);
        let replaced = replacer.replaced;
        *self.cx.sources.get_mut(decl) = declaration;
        replaced
    }

    fn remove_extra_fields(&mut self, decl: DeclId) -> usize {
        let kept: Vec<bool> = self
            .cx
            .sources
            .get(decl)
            .fields
            .iter()
            .map(|f| !f.is_reference() || self.is_parent_access_field(f.id))
            .collect();
        let fields = &mut self.cx.sources.get_mut(decl).fields;
        let before = fields.len();
        let mut keep = kept.into_iter();
        fields.retain(|_| keep.next().unwrap_or(true));
        before - fields.len()
    }

    fn is_parent_access_field(&self, field: SymbolHash) -> bool {
        self.cx
            .registry
            .referenced_decl(field)
            .and_then(|decl| self.cx.tree.node_of(decl))
            .and_then(|node| self.cx.tree.node(node).parent_access_field())
            .is_some_and(|parent_access| parent_access.hash() == field)
    }
}

struct AccessReplacer<'a> {
    cx: &'a CompileContext,
    referencing: CompositionId,
    replaced: usize,
}

impl VisitorMut for AccessReplacer<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        let referenced = match expr {
            Expr::Field { field, .. } => self
                .cx
                .registry
                .referenced_decl(field.hash())
                .and_then(|decl| self.cx.tree.node_of(decl)),
            _ => None,
        };
        match referenced {
            Some(referenced) => {
                *expr = self
                    .cx
                    .tree
                    .access(self.referencing, referenced, &self.cx.sources);
                self.replaced += 1;
            }
            None => walk_expr_mut(self, expr),
        }
    }
}
