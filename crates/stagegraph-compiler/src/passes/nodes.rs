//! Node Discovery Pass - create stages and method nodes.
//!
//! Runs in two sweeps over every extension chain:
//!
//! 1. Each mutable instance field (not static, not final, not a reference)
//!    not yet bound to a stage seeds a new [`Stage`], which binds all of its
//!    fields and lifecycle methods.
//! 2. Each concrete instance method still unbound after the first sweep
//!    seeds a [`MethodNode`], which binds the methods sharing its signature
//!    along the chain and the super-interface methods it implements.

use tracing::debug;

use stagegraph_core::ast::Marked;
use stagegraph_core::naming;
use stagegraph_core::{DependencyId, MemberLoc, Result};
use stagegraph_registry::MemberRole;

use crate::context::CompileContext;
use crate::graph::DependencyNode;
use crate::method_node::MethodNode;
use crate::stage::Stage;

/// Output of the node discovery pass.
#[derive(Debug, Default)]
pub struct NodeDiscoveryOutput {
    pub stages: usize,
    pub method_nodes: usize,
}

pub struct NodeDiscoveryPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> NodeDiscoveryPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> Result<NodeDiscoveryOutput> {
        let mut output = NodeDiscoveryOutput::default();
        let chains = self.cx.chains();

        for (leaf, chain) in &chains {
            for &decl in chain {
                for index in 0..self.cx.sources.get(decl).fields.len() {
                    let field = &self.cx.sources.get(decl).fields[index];
                    if field.is_static()
                        || field.is_final()
                        || field.is_reference()
                        || self.cx.registry.stage_of_field(field.id).is_some()
                    {
                        continue;
                    }
                    let loc = MemberLoc::new(decl, index);
                    let stage = Stage::discover(&self.cx.sources, *leaf, loc)?;
                    let id = self.cx.graph.add_node(DependencyNode::stage(stage));
                    self.bind_stage(id)?;
                    output.stages += 1;
                }
            }
        }

        for (leaf, chain) in &chains {
            for &decl in chain {
                for index in 0..self.cx.sources.get(decl).methods.len() {
                    let method = &self.cx.sources.get(decl).methods[index];
                    if method.is_static()
                        || method.is_abstract()
                        || self.cx.registry.method_role(method.id).is_some()
                    {
                        continue;
                    }
                    let name = naming::method_node_name(self.cx.sources.name(*leaf), &method.name);
                    let node = MethodNode::discover(&self.cx.sources, *leaf, method);
                    let id = self.cx.graph.add_node(DependencyNode::method(name, node));
                    self.bind_method_node(id)?;
                    output.method_nodes += 1;
                }
            }
        }

        debug!(
            stages = output.stages,
            method_nodes = output.method_nodes,
            "dependency nodes discovered"
        );
        Ok(output)
    }

    fn bind_stage(&mut self, id: DependencyId) -> Result<()> {
        let cx = &mut *self.cx;
        let Some(stage) = cx.graph.node(id).as_stage() else {
            return Ok(());
        };
        let method_id = |loc: MemberLoc| cx.sources.get(loc.decl).methods[loc.index].id;

        let mut methods = Vec::new();
        if let Some(loc) = stage.declared_predicate {
            methods.push((method_id(loc), MemberRole::Predicate));
        }
        methods.extend(stage.init_methods.iter().map(|&loc| (method_id(loc), MemberRole::Init)));
        if let Some(loc) = stage.declared_close {
            methods.push((method_id(loc), MemberRole::Close));
        }
        methods.extend(stage.stage_methods.iter().map(|m| (m.id, MemberRole::StageMethod)));
        let fields: Vec<_> = stage.fields.iter().map(|f| f.id).collect();

        for field in fields {
            cx.registry.bind_field(field, id)?;
        }
        for (method, role) in methods {
            cx.registry.bind_method(method, id, role)?;
        }
        Ok(())
    }

    fn bind_method_node(&mut self, id: DependencyId) -> Result<()> {
        let cx = &mut *self.cx;
        let node = cx.graph.node(id);
        let name = node.name.clone();
        let Some(method_node) = node.as_method() else {
            return Ok(());
        };
        let methods: Vec<_> = method_node
            .methods
            .iter()
            .map(|loc| cx.sources.get(loc.decl).methods[loc.index].id)
            .collect();
        let interface_methods = method_node.interface_methods.clone();
        let composition = cx.composition_node_of(id);

        for method in methods {
            cx.registry.bind_method(method, id, MemberRole::MethodNode)?;
        }
        for (method, method_name) in interface_methods {
            cx.tree
                .bind_interface_method(composition, method, &method_name, id, &name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{Expr, FieldDecl, MethodDecl, Modifiers, TypeDecl, TypeRef};
    use stagegraph_core::{CompilationError, SymbolHash};

    use crate::testing;

    #[test]
    fn stages_and_method_nodes() {
        let part = TypeDecl::participating("Part")
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(-1)))
            .with_field(
                FieldDecl::new("LIMIT", TypeRef::int())
                    .with_modifiers(Modifiers::STATIC | Modifiers::FINAL),
            )
            .with_method(MethodDecl::new("initA", TypeRef::void()))
            .with_method(MethodDecl::new("run", TypeRef::void()))
            .with_method(MethodDecl::new("describe", TypeRef::named("String")).into_abstract());
        let mut cx = testing::flat_context(vec![part], &["Part"]);
        let output = NodeDiscoveryPass::new(&mut cx).run().unwrap();

        assert_eq!(output.stages, 1);
        assert_eq!(output.method_nodes, 1);
        let names: Vec<_> = cx.graph.ids().map(|n| cx.graph.name(n).to_string()).collect();
        assert_eq!(names, ["A", "PartRun"]);

        let a = SymbolHash::from_field("Part", "a");
        assert_eq!(cx.registry.stage_of_field(a), Some(DependencyId::new(0)));
        let init = SymbolHash::from_method("Part", "initA", &[]);
        assert_eq!(
            cx.registry.method_role(init),
            Some((DependencyId::new(0), MemberRole::Init))
        );
    }

    #[test]
    fn method_node_spans_chain() {
        let base =
            TypeDecl::participating("Base").with_method(MethodDecl::new("run", TypeRef::void()));
        let derived = TypeDecl::participating("Derived")
            .extends(TypeRef::named("Base"))
            .with_method(MethodDecl::new("run", TypeRef::void()));
        let mut cx = testing::flat_context(vec![base, derived], &["Derived"]);
        let output = NodeDiscoveryPass::new(&mut cx).run().unwrap();
        assert_eq!(output.method_nodes, 1);
        assert_eq!(cx.graph.name(DependencyId::new(0)), "DerivedRun");
        let base_run = SymbolHash::from_method("Base", "run", &[]);
        assert_eq!(cx.registry.method_node(base_run), Some(DependencyId::new(0)));
    }

    #[test]
    fn stage_errors_abort() {
        let part = TypeDecl::participating("Part").with_field(FieldDecl::new("a", TypeRef::int()));
        let mut cx = testing::flat_context(vec![part], &["Part"]);
        let err = NodeDiscoveryPass::new(&mut cx).run().unwrap_err();
        assert!(matches!(err, CompilationError::LifecycleDeclarationConflict { .. }));
    }
}
