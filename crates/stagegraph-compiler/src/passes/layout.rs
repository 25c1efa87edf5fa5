//! Layout Pass - assign ordering keys to every member of the output.
//!
//! A member bound to a dependency node is keyed by the node's topological
//! position times [`LAYOUT_STRIDE`](stagegraph_registry::LAYOUT_STRIDE), plus
//! the category of its role for methods:
//!
//! ```text
//! node 1:  10 fields, body   11 predicate   12 init   13 access   14 close   15 close-dependants
//! node 2:  20 fields, body   21 predicate   ...
//! ```
//!
//! Members outside the graph get key 0 and so come first.

use tracing::debug;

use stagegraph_core::ast::TypeDecl;
use stagegraph_core::{CompilationError, Result};
use stagegraph_registry::CompilationRegistry;

use crate::context::CompileContext;

/// Output of the layout pass.
#[derive(Debug, Default)]
pub struct LayoutOutput {
    /// Members that received a non-zero key.
    pub members_placed: usize,
}

pub struct LayoutPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> LayoutPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<LayoutOutput> {
        let root = self.cx.tree.root();
        let registry = &self.cx.registry;
        let merged = self.cx.tree.node_mut(root).merged.as_mut().ok_or_else(|| {
            CompilationError::EmptyComposition {
                node: root.to_string(),
            }
        })?;

        let mut output = LayoutOutput::default();
        assign(registry, merged, &mut output);
        debug!(placed = output.members_placed, "member layout assigned");
        Ok(output)
    }
}

fn assign(registry: &CompilationRegistry, decl: &mut TypeDecl, output: &mut LayoutOutput) {
    for field in &mut decl.fields {
        field.layout = registry.field_layout(field.id);
        output.members_placed += usize::from(field.layout != 0);
    }
    for method in &mut decl.methods {
        method.layout = registry.method_layout(method.id);
        output.members_placed += usize::from(method.layout != 0);
    }
    for nested in &mut decl.nested {
        assign(registry, nested, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{Block, Expr, FieldDecl, FieldRef, MethodDecl, Stmt, TypeRef};
    use stagegraph_registry::LAYOUT_STRIDE;

    use crate::passes::{GuardingPass, LifecyclePass, MergePass};
    use crate::testing::{analyze, flat_context, node};

    #[test]
    fn members_follow_their_node() {
        let part = TypeDecl::participating("Part")
            .with_field(FieldDecl::new("b", TypeRef::int()).with_init(Expr::int(-1)))
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(-1)))
            .with_method(MethodDecl::new("initB", TypeRef::void()).with_body(Block::new(vec![
                Stmt::expr(Expr::assign(
                    Expr::field(FieldRef::new("Part", "b")),
                    Expr::field(FieldRef::new("Part", "a")),
                )),
            ])));
        let mut cx = flat_context(vec![part], &["Part"]);
        analyze(&mut cx).unwrap();
        GuardingPass::new(&mut cx).run().unwrap();
        LifecyclePass::new(&mut cx).run().unwrap();
        MergePass::new(&mut cx).run().unwrap();
        LayoutPass::new(&mut cx).run().unwrap();

        let a_slot = cx.registry.node_order(node(&cx, "A")).unwrap() * LAYOUT_STRIDE;
        let b_slot = cx.registry.node_order(node(&cx, "B")).unwrap() * LAYOUT_STRIDE;
        assert!(a_slot < b_slot);

        let merged = cx.tree.node(cx.tree.root()).merged.as_ref().unwrap();
        assert_eq!(merged.field("a").unwrap().layout, a_slot);
        assert_eq!(merged.field("b").unwrap().layout, b_slot);
        let layout_of = |name: &str| merged.methods.iter().find(|m| m.name == name).unwrap().layout;
        assert_eq!(layout_of("aInit"), a_slot + 1);
        assert_eq!(layout_of("initB"), b_slot + 2);
        assert_eq!(layout_of("a"), a_slot + 3);
        assert_eq!(layout_of("closeA"), a_slot + 4);
        assert_eq!(layout_of("closeADependants"), a_slot + 5);
    }
}
