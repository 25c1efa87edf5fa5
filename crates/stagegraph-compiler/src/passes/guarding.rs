//! Guarding Pass - route cross-node accesses through guarded members.
//!
//! Every stage first gets a concrete close method, so that generated close
//! bodies are guarded like any other. Then, in the bodies of each node:
//!
//! - a read of a field owned by another stage becomes a call of that
//!   field's accessor on the same target,
//! - a call of a stage method owned by another stage is redirected to the
//!   method's guarded wrapper, with the same target and arguments.
//!
//! Accesses within a node's own stage are left alone. Rewriting is
//! post-order, so nested accesses are guarded before the access containing
//! them.
//!
//! ## Example
//!
//! ```text
//! // before, in initB()            // after
//! b = a + 1;                       b = a() + 1;
//! ```

use tracing::debug;

use stagegraph_core::ast::Expr;
use stagegraph_core::ast::visitor::{VisitorMut, walk_expr_mut};
use stagegraph_core::{CompilationError, DependencyId, MemberLoc, Result};

use crate::context::CompileContext;
use crate::synthesis::Synthesizer;

/// Output of the guarding pass.
#[derive(Debug, Default)]
pub struct GuardingOutput {
    pub field_reads_guarded: usize,
    pub calls_guarded: usize,
}

pub struct GuardingPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> GuardingPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<GuardingOutput> {
        let nodes: Vec<DependencyId> = self.cx.graph.ids().collect();
        let mut synth = Synthesizer::new(self.cx);
        for &node in &nodes {
            if synth.context().graph.node(node).is_stage() {
                synth.close(node)?;
            }
        }

        let mut output = GuardingOutput::default();
        for &node in &nodes {
            for loc in synth.context().body_locations(node) {
                let mut guard = BodyGuard {
                    synth: &mut synth,
                    node,
                    field_reads: 0,
                    calls: 0,
                    error: None,
                };
                guard.rewrite(loc)?;
                output.field_reads_guarded += guard.field_reads;
                output.calls_guarded += guard.calls;
            }
        }

        debug!(
            field_reads = output.field_reads_guarded,
            calls = output.calls_guarded,
            "cross-node accesses guarded"
        );
        Ok(output)
    }
}

struct BodyGuard<'s, 'cx> {
    synth: &'s mut Synthesizer<'cx>,
    node: DependencyId,
    field_reads: usize,
    calls: usize,
    error: Option<CompilationError>,
}

impl BodyGuard<'_, '_> {
    /// Rewrite the body of the method at `loc`. The body is detached while
    /// it is rewritten, so synthesis may add members to the same declaration.
    fn rewrite(&mut self, loc: MemberLoc) -> Result<()> {
        let Some(mut body) = self.synth.context_mut().method_mut(loc).body.take() else {
            return Ok(());
        };
        self.visit_block_mut(&mut body);
        self.synth.context_mut().method_mut(loc).body = Some(body);
        self.error.take().map_or(Ok(()), Err)
    }

    fn owner_stage(&self, expr: &Expr) -> Option<DependencyId> {
        let registry = &self.synth.context().registry;
        let owner = match expr {
            Expr::Field { field, .. } => registry.stage_of_field(field.hash()),
            Expr::Call { method, .. } => registry.stage_of_stage_method(method.hash()),
            _ => None,
        };
        owner.filter(|&stage| stage != self.node)
    }

    fn guard(&mut self, expr: &mut Expr, stage: DependencyId) -> Result<()> {
        match expr {
            Expr::Field { target, field } => {
                let accessor = self.synth.accessor(stage, field.hash())?;
                *expr = Expr::Call {
                    target: target.take(),
                    method: accessor,
                    args: Vec::new(),
                };
                self.field_reads += 1;
            }
            Expr::Call { method, .. } => {
                *method = self.synth.guarded(stage, method.hash())?;
                self.calls += 1;
            }
            _ => {}
        }
        Ok(())
    }
}

impl VisitorMut for BodyGuard<'_, '_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
        if self.error.is_some() {
            return;
        }
        if let Some(stage) = self.owner_stage(expr) {
            if let Err(err) = self.guard(expr, stage) {
                self.error = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{
        BinaryOp, Block, FieldDecl, FieldRef, MethodDecl, MethodRef, Stmt, TypeDecl, TypeRef,
    };

    use crate::testing::{analyze, flat_context, node};

    fn a() -> Expr {
        Expr::field(FieldRef::new("Part", "a"))
    }

    fn part() -> TypeDecl {
        TypeDecl::participating("Part")
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(-1)))
            .with_field(FieldDecl::new("b", TypeRef::int()).with_init(Expr::int(-1)))
            .with_method(MethodDecl::new("initA", TypeRef::void()).with_body(Block::new(vec![
                Stmt::expr(Expr::assign(a(), Expr::int(1))),
            ])))
            .with_method(MethodDecl::new("twice", TypeRef::int()).in_stage("A").with_body(
                Block::new(vec![Stmt::ret(Expr::binary(BinaryOp::Mul, a(), Expr::int(2)))]),
            ))
            .with_method(MethodDecl::new("initB", TypeRef::void()).with_body(Block::new(vec![
                Stmt::expr(Expr::assign(
                    Expr::field(FieldRef::new("Part", "b")),
                    Expr::binary(
                        BinaryOp::Add,
                        a(),
                        Expr::call(MethodRef::new("Part", "twice", vec![]), vec![]),
                    ),
                )),
            ])))
    }

    fn method<'a>(cx: &'a CompileContext, name: &str) -> &'a MethodDecl {
        let decl = cx.sources.resolve("Part").unwrap();
        cx.sources
            .get(decl)
            .methods
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("no method {name}"))
    }

    #[test]
    fn cross_stage_accesses_are_guarded() {
        let mut cx = flat_context(vec![part()], &["Part"]);
        analyze(&mut cx).unwrap();
        let output = GuardingPass::new(&mut cx).run().unwrap();
        assert_eq!(output.field_reads_guarded, 1);
        assert_eq!(output.calls_guarded, 1);

        let init_b = method(&cx, "initB");
        let Some(Stmt::Expr(Expr::Assign { value, .. })) =
            init_b.body.as_ref().map(|b| &b.stmts[0])
        else {
            panic!("unexpected initB body");
        };
        let Expr::Binary { lhs, rhs, .. } = value.as_ref() else {
            panic!("unexpected initB value");
        };
        assert!(matches!(
            lhs.as_ref(),
            Expr::Call { method, args, .. } if method.name == "a" && args.is_empty()
        ));
        assert!(matches!(rhs.as_ref(), Expr::Call { method, .. } if method.name == "twiceGuarded"));

        // own-stage reads stay direct
        let twice = method(&cx, "twice");
        assert!(matches!(
            &twice.body.as_ref().unwrap().stmts[0],
            Stmt::Return(Some(Expr::Binary { lhs, .. }))
                if matches!(lhs.as_ref(), Expr::Field { .. })
        ));
    }

    #[test]
    fn accessor_initializes_through_no_arg_init() {
        let mut cx = flat_context(vec![part()], &["Part"]);
        analyze(&mut cx).unwrap();
        GuardingPass::new(&mut cx).run().unwrap();

        let accessor = method(&cx, "a");
        let body = accessor.body.as_ref().unwrap();
        assert_eq!(body.stmts.len(), 2);
        assert!(matches!(&body.stmts[0], Stmt::If { .. }));
        let stage_a = node(&cx, "A");
        assert!(cx.stage(stage_a).unwrap().predicate.is_done());
    }

    #[test]
    fn closes_exist_for_every_stage() {
        let mut cx = flat_context(vec![part()], &["Part"]);
        analyze(&mut cx).unwrap();
        GuardingPass::new(&mut cx).run().unwrap();
        for name in ["closeA", "closeB"] {
            let close = method(&cx, name);
            assert!(close.body.is_some());
        }
    }
}
