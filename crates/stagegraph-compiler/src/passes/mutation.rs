//! Mutation Check Pass - stage fields are only written by their own stage.
//!
//! A stage field may be assigned (or incremented/decremented) only inside an
//! init method, the close method or a stage-tagged method of the stage that
//! owns it. Assignments anywhere else, including constructors and field
//! initializers, fail with `IllegalMutation`.

use tracing::debug;

use stagegraph_core::ast::visitor::{Visitor, walk_expr};
use stagegraph_core::ast::{Expr, FieldRef};
use stagegraph_core::{CompilationError, DependencyId, Result, Span};
use stagegraph_registry::MemberRole;

use crate::context::CompileContext;

/// Output of the mutation check pass.
#[derive(Debug, Default)]
pub struct MutationCheckOutput {
    /// Number of writes to stage fields checked.
    pub writes_checked: usize,
}

#[derive(Default)]
struct MutatedFields {
    fields: Vec<FieldRef>,
}

impl Visitor for MutatedFields {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { target, .. } => self.fields.extend(target.as_field().cloned()),
            Expr::Unary { op, operand } if op.is_mutation() => {
                self.fields.extend(operand.as_field().cloned())
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

fn mutated_fields(visit: impl FnOnce(&mut MutatedFields)) -> Vec<FieldRef> {
    let mut visitor = MutatedFields::default();
    visit(&mut visitor);
    visitor.fields
}

pub struct MutationCheckPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> MutationCheckPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<MutationCheckOutput> {
        let mut output = MutationCheckOutput::default();

        for (_, chain) in self.cx.chains() {
            for decl in chain {
                let declaration = self.cx.sources.get(decl);

                for method in &declaration.methods {
                    let owner = self
                        .cx
                        .registry
                        .method_role(method.id)
                        .filter(|(_, role)| {
                            matches!(
                                role,
                                MemberRole::Init | MemberRole::Close | MemberRole::StageMethod
                            )
                        })
                        .map(|(node, _)| node);
                    let location = format!("{}.{}", declaration.name, method.name);
                    for field in mutated_fields(|v| v.visit_method_decl(method)) {
                        self.check(&field, owner, &location, method.span, &mut output)?;
                    }
                }

                for constructor in &declaration.constructors {
                    let location = format!("{}.<init>", declaration.name);
                    for field in mutated_fields(|v| v.visit_constructor_decl(constructor)) {
                        self.check(&field, None, &location, constructor.span, &mut output)?;
                    }
                }

                for initialized in &declaration.fields {
                    let location = format!("{}.{}", declaration.name, initialized.name);
                    for field in mutated_fields(|v| v.visit_field_decl(initialized)) {
                        self.check(&field, None, &location, initialized.span, &mut output)?;
                    }
                }
            }
        }

        debug!(writes = output.writes_checked, "stage field writes checked");
        Ok(output)
    }

    fn check(
        &self,
        field: &FieldRef,
        owner: Option<DependencyId>,
        location: &str,
        span: Span,
        output: &mut MutationCheckOutput,
    ) -> Result<()> {
        let Some(stage) = self.cx.registry.stage_of_field(field.hash()) else {
            return Ok(());
        };
        output.writes_checked += 1;
        if owner == Some(stage) {
            return Ok(());
        }
        Err(CompilationError::IllegalMutation {
            field: field.to_string(),
            location: location.to_string(),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{Block, FieldDecl, MethodDecl, Stmt, TypeDecl, TypeRef};

    use crate::passes::{AccessPathPass, NodeDiscoveryPass};
    use crate::testing::flat_context;

    fn assign(owner: &str, field: &str, value: i64) -> Stmt {
        Stmt::expr(Expr::assign(
            Expr::field(FieldRef::new(owner, field)),
            Expr::int(value),
        ))
    }

    fn run(decl: TypeDecl) -> Result<MutationCheckOutput> {
        let mut cx = flat_context(vec![decl], &["Part"]);
        AccessPathPass::new(&mut cx).run()?;
        NodeDiscoveryPass::new(&mut cx).run()?;
        MutationCheckPass::new(&mut cx).run()
    }

    fn part() -> TypeDecl {
        TypeDecl::participating("Part")
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(-1)))
            .with_field(FieldDecl::new("b", TypeRef::int()).with_init(Expr::int(-1)))
            .with_method(
                MethodDecl::new("initA", TypeRef::void())
                    .with_body(Block::new(vec![assign("Part", "a", 1)])),
            )
    }

    #[test]
    fn own_init_may_assign() {
        let output = run(part()).unwrap();
        assert_eq!(output.writes_checked, 1);
    }

    #[test]
    fn own_close_may_assign() {
        let decl = part().with_method(
            MethodDecl::new("closeA", TypeRef::void())
                .with_body(Block::new(vec![assign("Part", "a", -1)])),
        );
        let output = run(decl).unwrap();
        assert_eq!(output.writes_checked, 2);
    }

    #[test]
    fn stage_tagged_method_may_assign() {
        let decl = part().with_method(
            MethodDecl::new("rewind", TypeRef::void())
                .in_stage("A")
                .with_body(Block::new(vec![assign("Part", "a", 0)])),
        );
        let output = run(decl).unwrap();
        assert_eq!(output.writes_checked, 2);
    }

    #[test]
    fn other_stage_may_not_assign() {
        let decl = part().with_method(
            MethodDecl::new("initB", TypeRef::void())
                .with_body(Block::new(vec![assign("Part", "a", 2)]))
                .with_span(Span::new(12, 5)),
        );
        let err = run(decl).unwrap_err();
        assert_eq!(
            err,
            CompilationError::IllegalMutation {
                field: "Part.a".into(),
                location: "Part.initB".into(),
                span: Span::new(12, 5),
            }
        );
    }

    #[test]
    fn plain_methods_may_not_increment() {
        let increment = Stmt::expr(Expr::Unary {
            op: stagegraph_core::ast::UnaryOp::PostInc,
            operand: Box::new(Expr::field(FieldRef::new("Part", "b"))),
        });
        let decl = part().with_method(
            MethodDecl::new("bump", TypeRef::void()).with_body(Block::new(vec![increment])),
        );
        let err = run(decl).unwrap_err();
        assert!(matches!(
            err,
            CompilationError::IllegalMutation { ref location, .. } if location == "Part.bump"
        ));
    }
}
