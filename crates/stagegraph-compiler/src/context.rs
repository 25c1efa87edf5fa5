//! CompileContext - state shared by every pass of one compilation run.

use stagegraph_core::ast::{FieldDecl, MethodDecl, MethodRef};
use stagegraph_core::{
    CompilationError, CompositionId, DeclId, DependencyId, MemberLoc, Result, SourceSet,
};
use stagegraph_registry::{CompilationRegistry, CompositionTree};

use crate::graph::DependencyGraph;
use crate::options::CompilerOptions;
use crate::stage::Stage;

/// Declarations, composition tree, bindings and dependency graph of one run.
#[derive(Debug)]
pub struct CompileContext {
    pub sources: SourceSet,
    pub tree: CompositionTree,
    pub registry: CompilationRegistry,
    pub graph: DependencyGraph,
    pub options: CompilerOptions,
}

impl CompileContext {
    pub fn new(sources: SourceSet, tree: CompositionTree, options: CompilerOptions) -> Self {
        Self {
            sources,
            tree,
            registry: CompilationRegistry::new(),
            graph: DependencyGraph::new(),
            options,
        }
    }

    /// Every leaf declaration with its extension chain, derived to base.
    pub fn chains(&self) -> Vec<(DeclId, Vec<DeclId>)> {
        self.tree
            .leaves()
            .iter()
            .map(|&leaf| (leaf, self.sources.extension_chain(leaf)))
            .collect()
    }

    /// Composition node of the leaf declaration `node` was discovered in.
    pub fn composition_node_of(&self, node: DependencyId) -> CompositionId {
        let decl = self.graph.node(node).decl;
        self.tree.node_of(decl).unwrap_or_else(|| self.tree.root())
    }

    pub fn stage(&self, node: DependencyId) -> Result<&Stage> {
        self.graph
            .node(node)
            .as_stage()
            .ok_or_else(|| self.not_a_stage(node))
    }

    pub fn stage_mut(&mut self, node: DependencyId) -> Result<&mut Stage> {
        let name = self.graph.name(node).to_string();
        self.graph
            .node_mut(node)
            .as_stage_mut()
            .ok_or(CompilationError::ForeignMember {
                member: name,
                stage: "stage".to_string(),
            })
    }

    fn not_a_stage(&self, node: DependencyId) -> CompilationError {
        CompilationError::ForeignMember {
            member: self.graph.name(node).to_string(),
            stage: "stage".to_string(),
        }
    }

    pub fn field(&self, loc: MemberLoc) -> &FieldDecl {
        &self.sources.get(loc.decl).fields[loc.index]
    }

    pub fn method(&self, loc: MemberLoc) -> &MethodDecl {
        &self.sources.get(loc.decl).methods[loc.index]
    }

    pub fn method_mut(&mut self, loc: MemberLoc) -> &mut MethodDecl {
        &mut self.sources.get_mut(loc.decl).methods[loc.index]
    }

    /// Resolved reference to the method at `loc`.
    pub fn method_ref(&self, loc: MemberLoc) -> MethodRef {
        self.method(loc).as_ref(self.sources.name(loc.decl))
    }

    /// Locations of the methods whose bodies belong to `node`: init, stage
    /// and close methods of a stage, or the grouped methods of a method node.
    ///
    /// A stage's close is only listed once it exists as a concrete method.
    pub fn body_locations(&self, node: DependencyId) -> Vec<MemberLoc> {
        let data = self.graph.node(node);
        match data.as_stage() {
            Some(stage) => {
                let mut locs = stage.init_methods.clone();
                locs.extend(stage.stage_methods.iter().map(|m| m.loc));
                let close = stage.close.get().copied().or_else(|| {
                    stage
                        .declared_close
                        .filter(|&loc| !self.method(loc).is_abstract())
                });
                locs.extend(close);
                locs
            }
            None => data
                .as_method()
                .map(|m| m.methods.clone())
                .unwrap_or_default(),
        }
    }
}
