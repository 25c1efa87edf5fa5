//! Fixtures shared by unit tests.

use stagegraph_core::ast::TypeDecl;
use stagegraph_core::{DependencyId, Result, SourceSet};
use stagegraph_registry::CompositionTree;

use crate::context::CompileContext;
use crate::options::CompilerOptions;
use crate::passes::{
    AccessPathPass, LinkingPass, MutationCheckPass, NodeDiscoveryPass, OrderingPass,
};

fn sources(decls: Vec<TypeDecl>) -> SourceSet {
    let mut sources = SourceSet::new();
    for decl in decls {
        sources.add(decl).unwrap();
    }
    sources
}

/// Context with the named declarations in the root node.
pub(crate) fn flat_context(decls: Vec<TypeDecl>, root: &[&str]) -> CompileContext {
    nested_context(decls, root, &[])
}

/// Context with `root` declarations in the root node and `child`
/// declarations in one child node.
pub(crate) fn nested_context(
    decls: Vec<TypeDecl>,
    root: &[&str],
    child: &[&str],
) -> CompileContext {
    let sources = sources(decls);
    let mut tree = CompositionTree::new();
    let root_node = tree.root();
    for name in root {
        let decl = sources.resolve(name).unwrap();
        tree.add_declaration(root_node, decl, &sources).unwrap();
    }
    if !child.is_empty() {
        let child_node = tree.create_child(root_node);
        for name in child {
            let decl = sources.resolve(name).unwrap();
            tree.add_declaration(child_node, decl, &sources).unwrap();
        }
    }
    CompileContext::new(sources, tree, CompilerOptions::default())
}

/// Run every analysis pass.
pub(crate) fn analyze(cx: &mut CompileContext) -> Result<()> {
    AccessPathPass::new(cx).run()?;
    NodeDiscoveryPass::new(cx).run()?;
    MutationCheckPass::new(cx).run()?;
    LinkingPass::new(cx).run()?;
    OrderingPass::new(cx).run()?;
    Ok(())
}

pub(crate) fn node(cx: &CompileContext, name: &str) -> DependencyId {
    cx.graph
        .ids()
        .find(|&n| cx.graph.name(n) == name)
        .unwrap_or_else(|| panic!("no node named {name}"))
}
