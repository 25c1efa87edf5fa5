//! Renaming Pass - point every reference at the merged types.
//!
//! Any type reference, field or method owner, or qualified self reference
//! naming a declaration of some composition node is rewritten to name that
//! node's merged type. Type arguments are dropped for nodes erasing their
//! type parameters; otherwise non-empty argument lists are replaced with the
//! merged type's formal parameters.

use rustc_hash::FxHashMap;
use tracing::debug;

use stagegraph_core::ast::visitor::{VisitorMut, walk_expr_mut, walk_type_ref_mut};
use stagegraph_core::ast::{Expr, TypeDecl, TypeRef};
use stagegraph_core::{CompilationError, Result};

use crate::context::CompileContext;

/// Output of the renaming pass.
#[derive(Debug, Default)]
pub struct RenameOutput {
    pub type_refs: usize,
    pub owners: usize,
}

#[derive(Debug, Clone)]
struct MergedType {
    name: String,
    erase: bool,
    type_params: Vec<String>,
}

pub struct RenamePass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> RenamePass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<RenameOutput> {
        let root = self.cx.tree.root();
        let mut merged = self.cx.tree.node_mut(root).merged.take().ok_or_else(|| {
            CompilationError::EmptyComposition {
                node: root.to_string(),
            }
        })?;

        let mut renamer = Renamer {
            targets: self.targets(&merged),
            output: RenameOutput::default(),
        };
        renamer.visit_type_decl_mut(&mut merged);
        let output = renamer.output;

        debug!(
            type_refs = output.type_refs,
            owners = output.owners,
            "references renamed to merged types"
        );
        self.cx.tree.node_mut(root).merged = Some(merged);
        Ok(output)
    }

    /// Merged type of every declaration taking part in some composition node.
    fn targets(&self, root_type: &TypeDecl) -> FxHashMap<String, MergedType> {
        let cx = &*self.cx;
        let root = cx.tree.root();
        let mut by_node = FxHashMap::default();
        for node in cx.tree.node_ids() {
            let merged = if node == root {
                Some(root_type)
            } else {
                root_type.find_nested(&cx.tree.merged_name(node, &cx.sources))
            };
            if let Some(merged) = merged {
                by_node.insert(
                    node,
                    MergedType {
                        name: merged.name.clone(),
                        erase: cx.tree.node(node).erases_type_parameters(),
                        type_params: merged.type_params.clone(),
                    },
                );
            }
        }

        cx.sources
            .ids()
            .filter_map(|decl| {
                let target = by_node.get(&cx.tree.node_of(decl)?)?;
                Some((cx.sources.name(decl).to_string(), target.clone()))
            })
            .collect()
    }
}

struct Renamer {
    targets: FxHashMap<String, MergedType>,
    output: RenameOutput,
}

impl Renamer {
    fn rename_owner(&mut self, owner: &mut String) {
        if let Some(target) = self.targets.get(owner.as_str()) {
            if *owner != target.name {
                *owner = target.name.clone();
                self.output.owners += 1;
            }
        }
    }
}

impl VisitorMut for Renamer {
    fn visit_type_ref_mut(&mut self, ty: &mut TypeRef) {
        if ty.is_type_param {
            return;
        }
        let Some(target) = self.targets.get(&ty.name) else {
            walk_type_ref_mut(self, ty);
            return;
        };
        ty.name = target.name.clone();
        if target.erase {
            ty.args.clear();
        } else if !ty.args.is_empty() {
            ty.args = target.type_params.iter().map(TypeRef::type_param).collect();
        }
        self.output.type_refs += 1;
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Field { field, .. } => self.rename_owner(&mut field.owner),
            Expr::Call { method, .. } => self.rename_owner(&mut method.owner),
            Expr::This {
                qualifier: Some(qualifier),
            } => self.rename_owner(qualifier),
            _ => {}
        }
        walk_expr_mut(self, expr);
    }
}
