//! Per-run bindings of source members to dependency nodes.
//!
//! The [`CompilationRegistry`] records which stage owns each field, which role
//! each method plays for its stage or method node, which declaration each
//! reference field resolves to, and the topological order of every node. It
//! answers the ordering-key queries of the final layout pass.
//!
//! All maps are keyed by [`SymbolHash`], so bindings survive members being
//! moved or renamed by the merge passes.

use num_enum::IntoPrimitive;
use rustc_hash::FxHashMap;
use tracing::trace;

use stagegraph_core::{CompilationError, DeclId, DependencyId, Result, SymbolHash};

/// Position of a member within its node's block of the final layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive)]
#[repr(u8)]
pub enum LayoutCategory {
    /// Plain methods of method nodes and stage-tagged methods.
    Body = 0,
    Predicate = 1,
    Init = 2,
    /// Field accessors and guarded wrappers.
    Access = 3,
    Close = 4,
    CloseDependants = 5,
}

/// Role a method plays for the dependency node it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRole {
    /// One of the methods wrapped by a method node.
    MethodNode,
    /// A stage-tagged method.
    StageMethod,
    /// The initialization predicate of a stage.
    Predicate,
    /// An init method of a stage.
    Init,
    /// A guarded field accessor.
    Accessor,
    /// A guarded wrapper of a stage-tagged method.
    Guarded,
    /// The close method of a stage.
    Close,
    /// The close variant that skips dependants.
    DoClose,
    /// The close-dependants method of a stage or method node.
    CloseDependants,
}

impl MemberRole {
    pub fn category(self) -> LayoutCategory {
        match self {
            MemberRole::MethodNode | MemberRole::StageMethod => LayoutCategory::Body,
            MemberRole::Predicate => LayoutCategory::Predicate,
            MemberRole::Init => LayoutCategory::Init,
            MemberRole::Accessor | MemberRole::Guarded => LayoutCategory::Access,
            MemberRole::Close | MemberRole::DoClose => LayoutCategory::Close,
            MemberRole::CloseDependants => LayoutCategory::CloseDependants,
        }
    }
}

/// Layout slots reserved per node; categories are offsets inside a slot.
pub const LAYOUT_STRIDE: i64 = 10;

/// Registry of bindings for one compilation run.
#[derive(Debug, Default)]
pub struct CompilationRegistry {
    field_to_stage: FxHashMap<SymbolHash, DependencyId>,
    method_roles: FxHashMap<SymbolHash, (DependencyId, MemberRole)>,
    referenced: FxHashMap<SymbolHash, DeclId>,
    node_order: FxHashMap<DependencyId, i64>,
}

impl CompilationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a stage field to its stage.
    pub fn bind_field(&mut self, field: SymbolHash, stage: DependencyId) -> Result<()> {
        if let Some(existing) = self.field_to_stage.get(&field) {
            return Err(CompilationError::DuplicateBinding {
                item: format!("field {field}"),
                existing: existing.to_string(),
            });
        }
        trace!(%field, %stage, "field bound");
        self.field_to_stage.insert(field, stage);
        Ok(())
    }

    /// Bind a method to a node with the given role.
    pub fn bind_method(
        &mut self,
        method: SymbolHash,
        node: DependencyId,
        role: MemberRole,
    ) -> Result<()> {
        if let Some((existing, existing_role)) = self.method_roles.get(&method) {
            return Err(CompilationError::DuplicateBinding {
                item: format!("method {method} as {role:?}"),
                existing: format!("{existing} as {existing_role:?}"),
            });
        }
        trace!(%method, %node, ?role, "method bound");
        self.method_roles.insert(method, (node, role));
        Ok(())
    }

    pub fn stage_of_field(&self, field: SymbolHash) -> Option<DependencyId> {
        self.field_to_stage.get(&field).copied()
    }

    pub fn method_role(&self, method: SymbolHash) -> Option<(DependencyId, MemberRole)> {
        self.method_roles.get(&method).copied()
    }

    /// The node bound to `method` with exactly `role`.
    pub fn node_with_role(&self, method: SymbolHash, role: MemberRole) -> Option<DependencyId> {
        match self.method_roles.get(&method) {
            Some(&(node, r)) if r == role => Some(node),
            _ => None,
        }
    }

    /// The method node wrapping `method`, if any.
    pub fn method_node(&self, method: SymbolHash) -> Option<DependencyId> {
        self.node_with_role(method, MemberRole::MethodNode)
    }

    /// The stage owning the stage-tagged `method`, if any.
    pub fn stage_of_stage_method(&self, method: SymbolHash) -> Option<DependencyId> {
        self.node_with_role(method, MemberRole::StageMethod)
    }

    /// Record the declaration a reference field resolves to.
    pub fn bind_reference(&mut self, field: SymbolHash, decl: DeclId) {
        self.referenced.insert(field, decl);
    }

    pub fn referenced_decl(&self, field: SymbolHash) -> Option<DeclId> {
        self.referenced.get(&field).copied()
    }

    pub fn is_reference(&self, field: SymbolHash) -> bool {
        self.referenced.contains_key(&field)
    }

    /// Assign the topological order of a node (1-based).
    pub fn set_node_order(&mut self, node: DependencyId, order: i64) {
        self.node_order.insert(node, order);
    }

    pub fn node_order(&self, node: DependencyId) -> Option<i64> {
        self.node_order.get(&node).copied()
    }

    /// Layout key of a field: its stage's slot, or 0 outside the graph.
    pub fn field_layout(&self, field: SymbolHash) -> i64 {
        self.field_to_stage
            .get(&field)
            .and_then(|stage| self.node_order(*stage))
            .map_or(0, |order| order * LAYOUT_STRIDE)
    }

    /// Layout key of a method: its node's slot plus its role's category, or 0
    /// outside the graph.
    pub fn method_layout(&self, method: SymbolHash) -> i64 {
        self.method_roles
            .get(&method)
            .and_then(|&(node, role)| {
                let category: u8 = role.category().into();
                self.node_order(node)
                    .map(|order| order * LAYOUT_STRIDE + i64::from(category))
            })
            .unwrap_or(0)
    }
}
