//! Linking Pass - discover dependency edges.
//!
//! Scans the bodies of every node (init, stage-tagged and close methods of a
//! stage, the grouped methods of a method node) for field reads and method
//! calls whose target is implicit self, a self reference, or a chain of
//! reference fields. A stage whose close is still to be generated counts its
//! sentinel's default value as part of its close body.
//!
//! | Access | Dependency |
//! |---|---|
//! | read of a stage field | the owning stage |
//! | call of a grouped method | its method node |
//! | call of a super-interface method bound in the target's composition node | that method node |
//! | call of a stage-tagged method | the owning stage |
//!
//! Self-dependencies are ignored. The reference fields dereferenced on the
//! way form the edge's route; see [`Route`].

use tracing::debug;

use stagegraph_core::ast::visitor::{Visitor, walk_expr};
use stagegraph_core::ast::{Expr, FieldRef, MethodRef};
use stagegraph_core::{CompositionId, DependencyId, Result};

use crate::context::CompileContext;
use crate::graph::Route;

/// Output of the linking pass.
#[derive(Debug, Default)]
pub struct LinkingOutput {
    /// Number of distinct dependency edges.
    pub edges: usize,
}

enum Access {
    Field {
        target: Option<Expr>,
        field: FieldRef,
    },
    Call {
        target: Option<Expr>,
        method: MethodRef,
    },
}

impl Access {
    fn target(&self) -> Option<&Expr> {
        match self {
            Access::Field { target, .. } | Access::Call { target, .. } => target.as_ref(),
        }
    }
}

#[derive(Default)]
struct AccessCollector {
    accesses: Vec<Access>,
}

impl Visitor for AccessCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Field { target, field } => self.accesses.push(Access::Field {
                target: target.as_deref().cloned(),
                field: field.clone(),
            }),
            Expr::Call { target, method, .. } => self.accesses.push(Access::Call {
                target: target.as_deref().cloned(),
                method: method.clone(),
            }),
            _ => {}
        }
        walk_expr(self, expr);
    }
}

pub struct LinkingPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> LinkingPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<LinkingOutput> {
        let mut output = LinkingOutput::default();
        let nodes: Vec<DependencyId> = self.cx.graph.ids().collect();

        for node in nodes {
            for access in self.collect_accesses(node) {
                let Some((route, referenced)) = self.route(node, access.target()) else {
                    continue;
                };
                let dependency = match &access {
                    Access::Field { field, .. } => self.cx.registry.stage_of_field(field.hash()),
                    Access::Call { method, .. } => self.called_node(node, method, referenced),
                };
                let Some(dependency) = dependency.filter(|&d| d != node) else {
                    continue;
                };
                if self.cx.graph.add_dependency(node, dependency, route)? {
                    output.edges += 1;
                }
            }
        }

        debug!(
            nodes = self.cx.graph.len(),
            edges = output.edges,
            "dependency graph linked"
        );
        Ok(output)
    }

    fn collect_accesses(&self, node: DependencyId) -> Vec<Access> {
        let mut collector = AccessCollector::default();
        for loc in self.cx.body_locations(node) {
            collector.visit_method_decl(self.cx.method(loc));
        }
        if let Some(stage) = self.cx.graph.node(node).as_stage() {
            if !stage.has_concrete_close(&self.cx.sources) {
                if let Some(default) = stage
                    .sentinel()
                    .and_then(|f| self.cx.field(f.loc).init.as_ref())
                {
                    collector.visit_expr(default);
                }
            }
        }
        collector.accesses
    }

    /// The node a call resolves to: a grouped method, an interface method
    /// bound in the target's composition node, or a stage-tagged method.
    fn called_node(
        &self,
        node: DependencyId,
        method: &MethodRef,
        referenced: CompositionId,
    ) -> Option<DependencyId> {
        let hash = method.hash();
        let method_node = self
            .cx
            .registry
            .method_node(hash)
            .or_else(|| self.cx.tree.node(referenced).interface_method(hash));
        match method_node {
            Some(dependency) if dependency != node => Some(dependency),
            _ => self.cx.registry.stage_of_stage_method(hash),
        }
    }

    /// Route of a target made only of self references and reference fields,
    /// with the composition node it designates. `None` for any other target.
    fn route(&self, node: DependencyId, target: Option<&Expr>) -> Option<(Route, CompositionId)> {
        match target {
            None | Some(Expr::This { .. }) => {
                Some((Route::this(), self.cx.composition_node_of(node)))
            }
            Some(Expr::Field { target, field }) => {
                let referenced = self.cx.registry.referenced_decl(field.hash())?;
                let referenced = self.cx.tree.node_of(referenced)?;
                let (mut route, _) = self.route(node, target.as_deref())?;
                route.push(field.name.clone(), referenced);
                Some((route, referenced))
            }
            Some(_) => None,
        }
    }
}
