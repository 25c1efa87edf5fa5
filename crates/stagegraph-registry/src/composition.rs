//! Composition tree - one node per merged output type.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`CompositionNode`] (declarations to merge, access path, merged output)
//! - Edges: parent → child nesting
//!
//! A child node is reached from its parent through a *parent-access field*: a
//! reference field declared in the parent's extension chain whose type resolves
//! to the child. The chain of parent-access fields from the root down to a node
//! is its *root access path*; access expressions between two nodes are built
//! from the suffix of the target's path below their nearest common ancestor.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use tracing::trace;

use stagegraph_core::ast::{Expr, FieldRef, Marked, TypeDecl};
use stagegraph_core::{
    CompilationError, CompositionId, DeclId, DependencyId, Result, SourceSet, SymbolHash,
};

/// Data stored in each composition node.
#[derive(Debug, Default)]
pub struct CompositionNode {
    /// Leaf declarations merged into this node, in insertion order.
    decls: Vec<DeclId>,
    /// Drop formal type parameters from the merged type.
    erase_type_parameters: bool,
    /// Reference field in the parent's declarations that leads to this node.
    parent_access_field: Option<FieldRef>,
    /// Parent-access fields from the root down to this node.
    root_access_path: Vec<FieldRef>,
    /// Interface methods bound to method nodes at this node's level.
    interface_methods: FxHashMap<SymbolHash, (DependencyId, String)>,
    /// The merged output type, once built.
    pub merged: Option<TypeDecl>,
}

impl CompositionNode {
    pub fn decls(&self) -> &[DeclId] {
        &self.decls
    }

    pub fn erases_type_parameters(&self) -> bool {
        self.erase_type_parameters
    }

    pub fn parent_access_field(&self) -> Option<&FieldRef> {
        self.parent_access_field.as_ref()
    }

    pub fn root_access_path(&self) -> &[FieldRef] {
        &self.root_access_path
    }

    /// The method node bound to an interface method at this node.
    pub fn interface_method(&self, method: SymbolHash) -> Option<DependencyId> {
        self.interface_methods.get(&method).map(|(dep, _)| *dep)
    }
}

/// The tree of composition nodes, plus the binding of declarations to nodes.
#[derive(Debug)]
pub struct CompositionTree {
    graph: DiGraph<CompositionNode, ()>,
    root: NodeIndex,
    /// Leaf declaration → node it was added to.
    leaf_to_node: FxHashMap<DeclId, CompositionId>,
    /// Any declaration of an added extension chain → node.
    chain_to_node: FxHashMap<DeclId, CompositionId>,
    /// Leaf declarations in insertion order.
    leaves: Vec<DeclId>,
}

impl Default for CompositionTree {
    fn default() -> Self {
        Self::new()
    }
}

fn ix(id: CompositionId) -> NodeIndex {
    NodeIndex::new(id.index())
}

fn id(ix: NodeIndex) -> CompositionId {
    CompositionId::from(ix.index())
}

impl CompositionTree {
    /// Create a tree holding only an empty root node.
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(CompositionNode::default());
        Self {
            graph,
            root,
            leaf_to_node: FxHashMap::default(),
            chain_to_node: FxHashMap::default(),
            leaves: Vec::new(),
        }
    }

    pub fn root(&self) -> CompositionId {
        id(self.root)
    }

    /// Create a child node nested in `parent`.
    pub fn create_child(&mut self, parent: CompositionId) -> CompositionId {
        let child = self.graph.add_node(CompositionNode::default());
        self.graph.add_edge(ix(parent), child, ());
        id(child)
    }

    /// Request erasure of the merged type's formal type parameters.
    pub fn erase_type_parameters(&mut self, node: CompositionId) {
        self.node_mut(node).erase_type_parameters = true;
    }

    /// Add a declaration to merge into `node`.
    ///
    /// The declaration and its whole extension chain become bound to the node.
    pub fn add_declaration(
        &mut self,
        node: CompositionId,
        decl: DeclId,
        sources: &SourceSet,
    ) -> Result<()> {
        let declaration = sources.get(decl);
        if !declaration.is_participating() {
            return Err(CompilationError::NotParticipating {
                declaration: declaration.name.clone(),
            });
        }
        if let Some(existing) = self.leaf_to_node.get(&decl) {
            return Err(CompilationError::DuplicateBinding {
                item: declaration.name.clone(),
                existing: existing.to_string(),
            });
        }
        let chain = sources.extension_chain(decl);
        for &link in &chain {
            if let Some(existing) = self.chain_to_node.get(&link) {
                return Err(CompilationError::DuplicateBinding {
                    item: sources.name(link).to_string(),
                    existing: existing.to_string(),
                });
            }
        }
        for link in chain {
            self.chain_to_node.insert(link, node);
        }
        self.leaf_to_node.insert(decl, node);
        self.leaves.push(decl);
        self.node_mut(node).decls.push(decl);
        trace!(%node, decl = %declaration.name, "declaration added to composition node");
        Ok(())
    }

    pub fn node(&self, node: CompositionId) -> &CompositionNode {
        &self.graph[ix(node)]
    }

    pub fn node_mut(&mut self, node: CompositionId) -> &mut CompositionNode {
        &mut self.graph[ix(node)]
    }

    pub fn parent(&self, node: CompositionId) -> Option<CompositionId> {
        self.graph
            .neighbors_directed(ix(node), Direction::Incoming)
            .next()
            .map(id)
    }

    /// Children of `node` in creation order.
    pub fn children(&self, node: CompositionId) -> Vec<CompositionId> {
        let mut children: Vec<CompositionId> = self
            .graph
            .neighbors_directed(ix(node), Direction::Outgoing)
            .map(id)
            .collect();
        children.sort();
        children
    }

    /// All nodes, in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = CompositionId> + '_ {
        self.graph.node_indices().map(id)
    }

    /// All leaf declarations, in insertion order.
    pub fn leaves(&self) -> &[DeclId] {
        &self.leaves
    }

    /// The node a leaf declaration was added to.
    pub fn node_of_leaf(&self, decl: DeclId) -> Option<CompositionId> {
        self.leaf_to_node.get(&decl).copied()
    }

    /// The node any declaration of an added extension chain belongs to.
    pub fn node_of(&self, decl: DeclId) -> Option<CompositionId> {
        self.chain_to_node.get(&decl).copied()
    }

    /// Record `field` as the parent-access field of `child`, unless one is
    /// already recorded. Returns whether it was recorded.
    pub fn offer_parent_access_field(&mut self, child: CompositionId, field: FieldRef) -> bool {
        let node = self.node_mut(child);
        if node.parent_access_field.is_some() {
            return false;
        }
        trace!(%child, field = %field, "parent access field bound");
        node.parent_access_field = Some(field);
        true
    }

    /// Compute the root access path of every node.
    ///
    /// Fails with `UnboundParent` if a non-root node has no parent-access field.
    pub fn compute_root_access_paths(&mut self, sources: &SourceSet) -> Result<()> {
        let mut stack = vec![(self.root(), Vec::new())];
        while let Some((node, path)) = stack.pop() {
            self.node_mut(node).root_access_path = path.clone();
            for child in self.children(node).into_iter().rev() {
                let field = self.node(child).parent_access_field.clone().ok_or_else(|| {
                    CompilationError::UnboundParent {
                        declarations: self
                            .node(child)
                            .decls
                            .iter()
                            .map(|&d| sources.name(d).to_string())
                            .collect(),
                    }
                })?;
                let mut child_path = path.clone();
                child_path.push(field);
                stack.push((child, child_path));
            }
        }
        Ok(())
    }

    /// The reference fields leading from `from` to `to`: the suffix of `to`'s
    /// root access path below their nearest common ancestor.
    pub fn access_path(&self, from: CompositionId, to: CompositionId) -> &[FieldRef] {
        let from_path = &self.node(from).root_access_path;
        let to_path = &self.node(to).root_access_path;
        let common = from_path
            .iter()
            .zip(to_path)
            .take_while(|(a, b)| a == b)
            .count();
        &to_path[common..]
    }

    /// The nearest ancestor-or-self of `from` whose root access path is a
    /// prefix of `to`'s.
    pub fn nearest_enclosing(&self, from: CompositionId, to: CompositionId) -> CompositionId {
        let target = &self.node(to).root_access_path;
        let mut current = from;
        loop {
            if target.starts_with(&self.node(current).root_access_path) {
                return current;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Build the expression that reaches node `to` from code inside node `from`.
    ///
    /// The expression starts from the qualified self reference of the nearest
    /// enclosing node and dereferences the remaining parent-access fields.
    pub fn access(&self, from: CompositionId, to: CompositionId, sources: &SourceSet) -> Expr {
        let enclosing = self.nearest_enclosing(from, to);
        let qualifier = self
            .node(enclosing)
            .decls
            .first()
            .map(|&d| sources.name(d).to_string());
        let start = self.node(enclosing).root_access_path.len();
        self.node(to).root_access_path[start..]
            .iter()
            .fold(Expr::This { qualifier }, |target, field| {
                Expr::field_of(target, field.clone())
            })
    }

    /// Bind an interface method to a method node at `node`'s level.
    pub fn bind_interface_method(
        &mut self,
        node: CompositionId,
        method: SymbolHash,
        method_name: &str,
        dependency: DependencyId,
        dependency_name: &str,
    ) -> Result<()> {
        let methods = &mut self.node_mut(node).interface_methods;
        match methods.get(&method) {
            Some((existing, _)) if *existing == dependency => Ok(()),
            Some((_, existing_name)) => Err(CompilationError::InterfaceBindingConflict {
                method: method_name.to_string(),
                existing: existing_name.clone(),
                attempted: dependency_name.to_string(),
            }),
            None => {
                methods.insert(method, (dependency, dependency_name.to_string()));
                Ok(())
            }
        }
    }

    /// Simple name of the merged type of `node`: the names of its declarations
    /// joined with `_`, unless the merged type already exists.
    pub fn merged_name(&self, node: CompositionId, sources: &SourceSet) -> String {
        let data = self.node(node);
        if let Some(merged) = &data.merged {
            return merged.name.clone();
        }
        data.decls
            .iter()
            .map(|&d| sources.name(d))
            .collect::<Vec<_>>()
            .join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{FieldDecl, TypeDecl, TypeRef};

    fn sources() -> SourceSet {
        let mut set = SourceSet::new();
        set.add(
            TypeDecl::participating("Outer")
                .with_field(FieldDecl::new("inner", TypeRef::named("Inner")).reference()),
        )
        .unwrap();
        set.add(
            TypeDecl::participating("Inner")
                .with_field(FieldDecl::new("deep", TypeRef::named("Deep")).reference()),
        )
        .unwrap();
        set.add(TypeDecl::participating("Other")).unwrap();
        set.add(TypeDecl::participating("Deep")).unwrap();
        set.add(TypeDecl::class("Plain")).unwrap();
        set
    }

    fn tree(set: &SourceSet) -> (CompositionTree, CompositionId, CompositionId) {
        let mut tree = CompositionTree::new();
        let root = tree.root();
        tree.add_declaration(root, set.resolve("Outer").unwrap(), set)
            .unwrap();
        let child = tree.create_child(root);
        tree.add_declaration(child, set.resolve("Inner").unwrap(), set)
            .unwrap();
        tree.add_declaration(child, set.resolve("Other").unwrap(), set)
            .unwrap();
        let grandchild = tree.create_child(child);
        tree.add_declaration(grandchild, set.resolve("Deep").unwrap(), set)
            .unwrap();
        tree.offer_parent_access_field(child, FieldRef::new("Outer", "inner"));
        tree.offer_parent_access_field(grandchild, FieldRef::new("Inner", "deep"));
        tree.compute_root_access_paths(set).unwrap();
        (tree, child, grandchild)
    }

    #[test]
    fn non_participating_declarations_are_rejected() {
        let set = sources();
        let mut tree = CompositionTree::new();
        let err = tree
            .add_declaration(tree.root(), set.resolve("Plain").unwrap(), &set)
            .unwrap_err();
        assert!(matches!(err, CompilationError::NotParticipating { .. }));
    }

    #[test]
    fn declarations_bind_once() {
        let set = sources();
        let mut tree = CompositionTree::new();
        let root = tree.root();
        let outer = set.resolve("Outer").unwrap();
        tree.add_declaration(root, outer, &set).unwrap();
        let child = tree.create_child(root);
        let err = tree.add_declaration(child, outer, &set).unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateBinding { .. }));
    }

    #[test]
    fn access_path_to_self_is_empty() {
        let set = sources();
        let (tree, child, grandchild) = tree(&set);
        assert!(tree.access_path(child, child).is_empty());
        assert!(tree.access_path(tree.root(), tree.root()).is_empty());
        assert_eq!(tree.access_path(child, grandchild).len(), 1);
        assert_eq!(tree.access_path(tree.root(), child).len(), 1);
    }

    #[test]
    fn access_from_root_walks_down() {
        let set = sources();
        let (tree, _, grandchild) = tree(&set);
        let expr = tree.access(tree.root(), grandchild, &set);
        assert_eq!(expr.to_string(), "Outer.this.inner.deep");
    }

    #[test]
    fn access_upwards_uses_qualified_self() {
        let set = sources();
        let (tree, child, grandchild) = tree(&set);
        assert_eq!(tree.access(grandchild, tree.root(), &set).to_string(), "Outer.this");
        assert_eq!(tree.access(grandchild, child, &set).to_string(), "Inner.this");
        assert_eq!(tree.access(child, child, &set).to_string(), "Inner.this");
    }

    #[test]
    fn unbound_parent_is_reported() {
        let set = sources();
        let mut tree = CompositionTree::new();
        let root = tree.root();
        tree.add_declaration(root, set.resolve("Outer").unwrap(), &set)
            .unwrap();
        let child = tree.create_child(root);
        tree.add_declaration(child, set.resolve("Other").unwrap(), &set)
            .unwrap();
        let err = tree.compute_root_access_paths(&set).unwrap_err();
        assert_eq!(
            err,
            CompilationError::UnboundParent {
                declarations: vec!["Other".into()]
            }
        );
    }

    #[test]
    fn merged_name_joins_declarations() {
        let set = sources();
        let (tree, child, _) = tree(&set);
        assert_eq!(tree.merged_name(child, &set), "Inner_Other");
        assert_eq!(tree.merged_name(tree.root(), &set), "Outer");
    }

    #[test]
    fn interface_bindings_conflict() {
        let set = sources();
        let (mut tree, child, _) = tree(&set);
        let method = SymbolHash::from_method("Api", "run", &[]);
        tree.bind_interface_method(child, method, "run", DependencyId::new(0), "InnerRun")
            .unwrap();
        tree.bind_interface_method(child, method, "run", DependencyId::new(0), "InnerRun")
            .unwrap();
        let err = tree
            .bind_interface_method(child, method, "run", DependencyId::new(1), "OtherRun")
            .unwrap_err();
        assert!(matches!(err, CompilationError::InterfaceBindingConflict { .. }));
        assert_eq!(
            tree.node(child).interface_method(method),
            Some(DependencyId::new(0))
        );
    }
}
