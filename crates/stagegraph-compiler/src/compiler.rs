//! Compiler - runs the analysis and transformation passes end to end.
//!
//! Analysis completes before any declaration is rewritten. The first failure
//! aborts the run; nothing is emitted.

use tracing::debug;

use stagegraph_core::ast::TypeDecl;
use stagegraph_core::{Result, SourceSet};
use stagegraph_registry::CompositionTree;

use crate::context::CompileContext;
use crate::options::CompilerOptions;
use crate::passes::{
    AccessPathPass, EmitPass, FinalsPass, GlobalClosePass, GuardingPass, LayoutPass,
    LifecyclePass, LinkingPass, MergePass, MutationCheckPass, NodeDiscoveryPass, OrderingPass,
    ReferencePass, RenamePass,
};

/// Result of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationOutput {
    /// The root merged type, child nodes nested inside it.
    pub merged: TypeDecl,
    pub stages: usize,
    pub method_nodes: usize,
    /// Names of the dependency nodes, dependencies first.
    pub order: Vec<String>,
}

/// Stage-graph compiler for one composition tree.
///
/// # Example
///
/// ```text
/// let output = Compiler::new(sources, tree)
///     .with_options(CompilerOptions::new().with_merged_name("Engine"))
///     .compile()?;
/// ```
#[derive(Debug)]
pub struct Compiler {
    sources: SourceSet,
    tree: CompositionTree,
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(sources: SourceSet, tree: CompositionTree) -> Self {
        Self {
            sources,
            tree,
            options: CompilerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(self) -> Result<CompilationOutput> {
        let mut cx = CompileContext::new(self.sources, self.tree, self.options);

        AccessPathPass::new(&mut cx).run()?;
        let nodes = NodeDiscoveryPass::new(&mut cx).run()?;
        MutationCheckPass::new(&mut cx).run()?;
        LinkingPass::new(&mut cx).run()?;
        let ordering = OrderingPass::new(&mut cx).run()?;
        debug!(
            stages = nodes.stages,
            method_nodes = nodes.method_nodes,
            edges = cx.graph.edge_count(),
            "analysis complete"
        );

        GuardingPass::new(&mut cx).run()?;
        LifecyclePass::new(&mut cx).run()?;
        ReferencePass::new(&mut cx).run()?;
        GlobalClosePass::new(&mut cx).run()?;
        MergePass::new(&mut cx).run()?;
        RenamePass::new(&mut cx).run()?;
        LayoutPass::new(&mut cx).run()?;
        FinalsPass::new(&mut cx).run()?;
        let merged = EmitPass::new(&mut cx).run()?;
        debug!(name = %merged.name, "compilation complete");

        Ok(CompilationOutput {
            merged,
            stages: nodes.stages,
            method_nodes: nodes.method_nodes,
            order: ordering
                .order
                .iter()
                .map(|&node| cx.graph.name(node).to_string())
                .collect(),
        })
    }
}
