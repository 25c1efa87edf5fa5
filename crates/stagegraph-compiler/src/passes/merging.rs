//! Merge Pass - fold declarations into the output type tree.
//!
//! 1. Every leaf declaration absorbs its extension chain
//!    ([`merge_chain`]); the result replaces the leaf in the source set.
//! 2. Every composition node combines its leaves into one type
//!    ([`merge_declarations`]), children are nested into their parent
//!    ([`nest_child`]), and the merged name and package options are applied
//!    to the root type.
//!
//! The root type, holding every other merged type as a nested type, is
//! stored in the root composition node.

use tracing::debug;

use stagegraph_core::ast::TypeDecl;
use stagegraph_core::{CompilationError, CompositionId, Result};

use crate::context::CompileContext;
use crate::merge::{merge_chain, merge_declarations, nest_child};

/// Output of the merge pass.
#[derive(Debug, Default)]
pub struct MergeOutput {
    /// Extension chains longer than one declaration.
    pub chains_merged: usize,
    /// Merged types, nested ones included.
    pub types: usize,
}

pub struct MergePass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> MergePass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<MergeOutput> {
        let mut output = MergeOutput::default();

        for (leaf, chain) in self.cx.chains() {
            let merged = merge_chain(&self.cx.sources, &chain)?;
            *self.cx.sources.get_mut(leaf) = merged;
            if chain.len() > 1 {
                output.chains_merged += 1;
            }
        }

        let root = self.cx.tree.root();
        let mut merged = self.merge_node(root, &mut output)?;
        if let Some(name) = &self.cx.options.merged_name {
            merged.name = name.clone();
        }
        if let Some(package) = &self.cx.options.merged_package {
            merged.package = Some(package.clone());
        }
        debug!(
            chains = output.chains_merged,
            types = output.types,
            root = %merged.name,
            "declarations merged"
        );
        self.cx.tree.node_mut(root).merged = Some(merged);
        Ok(output)
    }

    fn merge_node(&self, node: CompositionId, output: &mut MergeOutput) -> Result<TypeDecl> {
        let data = self.cx.tree.node(node);
        if data.decls().is_empty() {
            return Err(CompilationError::EmptyComposition {
                node: node.to_string(),
            });
        }
        let decls = data
            .decls()
            .iter()
            .map(|&d| self.cx.sources.get(d).clone())
            .collect();
        let mut merged = merge_declarations(decls, data.erases_type_parameters())?;
        output.types += 1;

        for child in self.cx.tree.children(node) {
            let parent_access = self
                .cx
                .tree
                .node(child)
                .parent_access_field()
                .cloned()
                .ok_or_else(|| CompilationError::UnboundParent {
                    declarations: self
                        .cx
                        .tree
                        .node(child)
                        .decls()
                        .iter()
                        .map(|&d| self.cx.sources.name(d).to_string())
                        .collect(),
                })?;
            let nested = self.merge_node(child, output)?;
            nest_child(&mut merged, nested, &parent_access);
        }
        Ok(merged)
    }
}
