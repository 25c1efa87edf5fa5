//! Global Close Pass - one `close()` for the whole merged type.
//!
//! Closes every stage without touching dependants (`doCloseX()`), dependants
//! first: stages are visited in reverse topological order of the full
//! dependency graph. The method is added to the first declaration of the
//! root composition node, which also gains the configured close interface.
//!
//! ## Example
//!
//! ```text
//! public void close() {
//!     Outer.this.inner.doCloseCount();
//!     Outer.this.doCloseTotal();
//! }
//! ```

use tracing::debug;

use stagegraph_core::ast::{Block, Expr, MethodDecl, Stmt, TypeRef};
use stagegraph_core::{CompilationError, Result};

use crate::context::CompileContext;

/// Name of the generated global close method.
pub const GLOBAL_CLOSE: &str = "close";

/// Output of the global close pass.
#[derive(Debug, Default)]
pub struct GlobalCloseOutput {
    /// Stages closed by the generated method.
    pub stages_closed: usize,
}

pub struct GlobalClosePass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> GlobalClosePass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<GlobalCloseOutput> {
        let root = self.cx.tree.root();
        let Some(&root_decl) = self.cx.tree.node(root).decls().first() else {
            return Err(CompilationError::EmptyComposition {
                node: root.to_string(),
            });
        };

        let mut body = Block::empty();
        for node in self.cx.graph.topological_order().into_iter().rev() {
            let Some(stage) = self.cx.graph.node(node).as_stage() else {
                continue;
            };
            let Some(&do_close) = stage.do_close.get() else {
                continue;
            };
            let target = self
                .cx
                .tree
                .access(root, self.cx.composition_node_of(node), &self.cx.sources);
            body.push(Stmt::expr(Expr::call_on(
                Some(target),
                self.cx.method_ref(do_close),
                Vec::new(),
            )));
        }
        let stages_closed = body.stmts.len();

        let interface = self.cx.options.close_interface.clone();
        let declaration = self.cx.sources.get_mut(root_decl);
        if let Some(interface) = interface {
            if !declaration.interfaces.contains(&interface) {
                declaration.interfaces.push(interface);
            }
        }
        declaration.add_method(MethodDecl::simple(GLOBAL_CLOSE, TypeRef::void()).with_body(body));

        debug!(stages = stages_closed, "global close generated");
        Ok(GlobalCloseOutput { stages_closed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{FieldDecl, FieldRef, TypeDecl};

    use crate::options::CompilerOptions;
    use crate::passes::{GuardingPass, LifecyclePass};
    use crate::testing::{analyze, flat_context};

    fn compiled(options: CompilerOptions) -> CompileContext {
        let part = TypeDecl::participating("Part")
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(-1)))
            .with_field(FieldDecl::new("b", TypeRef::int()).with_init(Expr::int(-1)))
            .with_method(MethodDecl::new("initB", TypeRef::void()).with_body(Block::new(vec![
                Stmt::expr(Expr::assign(
                    Expr::field(FieldRef::new("Part", "b")),
                    Expr::field(FieldRef::new("Part", "a")),
                )),
            ])));
        let mut cx = flat_context(vec![part], &["Part"]);
        cx.options = options;
        analyze(&mut cx).unwrap();
        GuardingPass::new(&mut cx).run().unwrap();
        LifecyclePass::new(&mut cx).run().unwrap();
        GlobalClosePass::new(&mut cx).run().unwrap();
        cx
    }

    #[test]
    fn dependants_close_first() {
        let cx = compiled(CompilerOptions::default());
        let part = cx.sources.get(cx.sources.resolve("Part").unwrap());
        let close = part.methods.iter().find(|m| m.name == GLOBAL_CLOSE).unwrap();
        let calls: Vec<String> = close
            .body
            .as_ref()
            .unwrap()
            .stmts
            .iter()
            .map(|s| match s {
                Stmt::Expr(Expr::Call { method, .. }) => method.name.clone(),
                other => panic!("unexpected statement {other:?}"),
            })
            .collect();
        assert_eq!(calls, ["doCloseB", "doCloseA"]);
        assert_eq!(part.interfaces, vec![TypeRef::named("AutoCloseable")]);
    }

    #[test]
    fn close_interface_is_optional() {
        let cx = compiled(CompilerOptions::default().with_close_interface(None));
        let part = cx.sources.get(cx.sources.resolve("Part").unwrap());
        assert!(part.interfaces.is_empty());
        assert!(part.has_method_named(GLOBAL_CLOSE));
    }
}
