//! Dependency graph of stages and method nodes.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`DependencyNode`] (a [`Stage`] or a [`MethodNode`])
//! - Edges: dependant → dependency, weighted by the [`Route`] of reference
//!   fields the dependant uses to reach the dependency
//!
//! A dependant must reach a given dependency through one route only; a
//! second, different route is an `InconsistentAccessPath` error. Routes are
//! compared by the composition nodes they pass through, so two same-typed
//! reference fields declared in different links of one extension chain are
//! the same route.
//!
//! Traversals visit neighbours in ascending id order, so orders derived from
//! the graph are deterministic for a given input.

use std::collections::VecDeque;
use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use stagegraph_core::{CompilationError, CompositionId, DeclId, DependencyId, MemberLoc, Result};

use crate::memo::Memo;
use crate::method_node::MethodNode;
use crate::stage::Stage;

fn ix(id: DependencyId) -> NodeIndex {
    NodeIndex::new(id.index())
}

fn id(ix: NodeIndex) -> DependencyId {
    DependencyId::from(ix.index())
}

/// One reference field dereferenced on the way to a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStep {
    pub field: String,
    /// Composition node the field leads to.
    pub node: CompositionId,
}

/// The reference fields a dependant dereferences to reach a dependency,
/// outermost first. Empty for the dependant's own composition node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    steps: Vec<RouteStep>,
}

impl Route {
    pub fn this() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, node: CompositionId) {
        self.steps.push(RouteStep {
            field: field.into(),
            node,
        });
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    /// Whether both routes pass through the same composition nodes.
    pub fn same_as(&self, other: &Route) -> bool {
        self.steps.len() == other.steps.len()
            && self
                .steps
                .iter()
                .zip(&other.steps)
                .all(|(a, b)| a.node == b.node)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "this")?;
        for step in &self.steps {
            write!(f, ".{}", step.field)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Stage(Stage),
    Method(MethodNode),
}

/// A node of the dependency graph.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub name: String,
    /// Leaf declaration the node was discovered in; synthesized members are
    /// added to it.
    pub decl: DeclId,
    pub kind: NodeKind,
    /// `None` once built means no dependant has a close method.
    pub close_dependants: Memo<Option<MemberLoc>>,
}

impl DependencyNode {
    pub fn stage(stage: Stage) -> Self {
        Self {
            name: stage.name.clone(),
            decl: stage.decl,
            kind: NodeKind::Stage(stage),
            close_dependants: Memo::NotStarted,
        }
    }

    pub fn method(name: impl Into<String>, node: MethodNode) -> Self {
        Self {
            name: name.into(),
            decl: node.decl,
            kind: NodeKind::Method(node),
            close_dependants: Memo::NotStarted,
        }
    }

    pub fn is_stage(&self) -> bool {
        matches!(self.kind, NodeKind::Stage(_))
    }

    pub fn as_stage(&self) -> Option<&Stage> {
        match &self.kind {
            NodeKind::Stage(stage) => Some(stage),
            NodeKind::Method(_) => None,
        }
    }

    pub fn as_stage_mut(&mut self) -> Option<&mut Stage> {
        match &mut self.kind {
            NodeKind::Stage(stage) => Some(stage),
            NodeKind::Method(_) => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodNode> {
        match &self.kind {
            NodeKind::Method(node) => Some(node),
            NodeKind::Stage(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// The dependency graph of one compilation run.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, Route>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: DependencyNode) -> DependencyId {
        let name = node.name.clone();
        let node_id = id(self.graph.add_node(node));
        trace!(node = %name, id = %node_id, "dependency node created");
        node_id
    }

    pub fn node(&self, node: DependencyId) -> &DependencyNode {
        &self.graph[ix(node)]
    }

    pub fn node_mut(&mut self, node: DependencyId) -> &mut DependencyNode {
        &mut self.graph[ix(node)]
    }

    pub fn name(&self, node: DependencyId) -> &str {
        &self.node(node).name
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn ids(&self) -> impl Iterator<Item = DependencyId> + '_ {
        self.graph.node_indices().map(id)
    }

    pub fn stages(&self) -> Vec<DependencyId> {
        self.ids().filter(|&n| self.node(n).is_stage()).collect()
    }

    /// Record that `dependant` depends on `dependency` through `route`.
    ///
    /// Returns whether a new edge was added.
    pub fn add_dependency(
        &mut self,
        dependant: DependencyId,
        dependency: DependencyId,
        route: Route,
    ) -> Result<bool> {
        if let Some(edge) = self.graph.find_edge(ix(dependant), ix(dependency)) {
            let existing = &self.graph[edge];
            if !existing.same_as(&route) {
                return Err(CompilationError::InconsistentAccessPath {
                    dependant: self.name(dependant).to_string(),
                    dependency: self.name(dependency).to_string(),
                    first: existing.to_string(),
                    second: route.to_string(),
                });
            }
            return Ok(false);
        }
        trace!(
            dependant = self.name(dependant),
            dependency = self.name(dependency),
            %route,
            "dependency edge"
        );
        self.graph.add_edge(ix(dependant), ix(dependency), route);
        Ok(true)
    }

    fn neighbors(&self, node: DependencyId, direction: Direction) -> Vec<DependencyId> {
        let mut out: Vec<DependencyId> = self
            .graph
            .neighbors_directed(ix(node), direction)
            .map(id)
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Nodes `node` depends on.
    pub fn dependencies(&self, node: DependencyId) -> Vec<DependencyId> {
        self.neighbors(node, Direction::Outgoing)
    }

    /// Nodes depending on `node`.
    pub fn dependants(&self, node: DependencyId) -> Vec<DependencyId> {
        self.neighbors(node, Direction::Incoming)
    }

    pub fn route(&self, dependant: DependencyId, dependency: DependencyId) -> Option<&Route> {
        self.graph
            .find_edge(ix(dependant), ix(dependency))
            .map(|edge| &self.graph[edge])
    }

    fn roots(&self) -> Vec<DependencyId> {
        self.ids()
            .filter(|&n| self.dependencies(n).is_empty())
            .collect()
    }

    /// Fail with `CyclicDependency` naming the nodes of one cycle, each once,
    /// every node followed by one of its dependants.
    pub fn check_acyclic(&self) -> Result<()> {
        let mut state = FxHashMap::default();
        let mut chain = Vec::new();
        for root in self.roots() {
            self.visit_for_cycles(root, &mut state, &mut chain)?;
        }
        match self.ids().find(|n| !state.contains_key(n)) {
            Some(start) => Err(self.cycle_error(&self.cycle_through_dependencies(start))),
            None => Ok(()),
        }
    }

    fn visit_for_cycles(
        &self,
        node: DependencyId,
        state: &mut FxHashMap<DependencyId, Visit>,
        chain: &mut Vec<DependencyId>,
    ) -> Result<()> {
        match state.get(&node) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                let start = chain.iter().position(|&n| n == node).unwrap_or(0);
                return Err(self.cycle_error(&chain[start..]));
            }
            None => {}
        }
        state.insert(node, Visit::InProgress);
        chain.push(node);
        for dependant in self.dependants(node) {
            self.visit_for_cycles(dependant, state, chain)?;
        }
        chain.pop();
        state.insert(node, Visit::Done);
        Ok(())
    }

    /// Walk dependencies from a node unreachable from any dependency-free
    /// node. Every such node has a dependency that is unreachable too, so the
    /// walk must revisit a node.
    fn cycle_through_dependencies(&self, start: DependencyId) -> Vec<DependencyId> {
        let mut path = Vec::new();
        let mut position = FxHashMap::default();
        let mut current = start;
        loop {
            if let Some(&i) = position.get(&current) {
                let mut cycle: Vec<DependencyId> = path[i..].to_vec();
                cycle.reverse();
                return cycle;
            }
            position.insert(current, path.len());
            path.push(current);
            match self.dependencies(current).first() {
                Some(&next) => current = next,
                None => return path,
            }
        }
    }

    fn cycle_error(&self, cycle: &[DependencyId]) -> CompilationError {
        CompilationError::CyclicDependency {
            cycle: cycle.iter().map(|&n| self.name(n).to_string()).collect(),
        }
    }

    /// All nodes, every dependency before its dependants.
    pub fn topological_order(&self) -> Vec<DependencyId> {
        let mut visited = FxHashSet::default();
        let mut order = VecDeque::new();
        for root in self.roots() {
            self.visit_topologically(root, &mut visited, &mut order);
        }
        order.into()
    }

    fn visit_topologically(
        &self,
        node: DependencyId,
        visited: &mut FxHashSet<DependencyId>,
        order: &mut VecDeque<DependencyId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        for dependant in self.dependants(node) {
            self.visit_topologically(dependant, visited, order);
        }
        order.push_front(node);
    }

    /// Direct dependants of `node`, each after its own dependencies among them.
    pub fn sorted_dependants(&self, node: DependencyId) -> Vec<DependencyId> {
        let direct: FxHashSet<DependencyId> = self.dependants(node).into_iter().collect();
        let mut visited = FxHashSet::default();
        let mut order = VecDeque::new();
        self.visit_topologically(node, &mut visited, &mut order);
        order.into_iter().filter(|n| direct.contains(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(names: &[&str]) -> (DependencyGraph, Vec<DependencyId>) {
        let mut graph = DependencyGraph::new();
        let ids = names
            .iter()
            .map(|name| {
                graph.add_node(DependencyNode::method(
                    *name,
                    MethodNode {
                        decl: DeclId::new(0),
                        methods: Vec::new(),
                        interface_methods: Vec::new(),
                    },
                ))
            })
            .collect();
        (graph, ids)
    }

    fn position(order: &[DependencyId], n: DependencyId) -> usize {
        order.iter().position(|&x| x == n).unwrap()
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let (mut g, n) = graph(&["A", "B", "C", "D"]);
        // D -> C -> A, D -> B -> A
        g.add_dependency(n[2], n[0], Route::this()).unwrap();
        g.add_dependency(n[1], n[0], Route::this()).unwrap();
        g.add_dependency(n[3], n[2], Route::this()).unwrap();
        g.add_dependency(n[3], n[1], Route::this()).unwrap();
        g.check_acyclic().unwrap();

        let order = g.topological_order();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], n[0]);
        assert!(position(&order, n[1]) < position(&order, n[3]));
        assert!(position(&order, n[2]) < position(&order, n[3]));
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let (mut g, n) = graph(&["A", "B"]);
        assert!(g.add_dependency(n[1], n[0], Route::this()).unwrap());
        assert!(!g.add_dependency(n[1], n[0], Route::this()).unwrap());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn inconsistent_routes() {
        let (mut g, n) = graph(&["A", "B"]);
        let mut via_p1 = Route::this();
        via_p1.push("p1", CompositionId::new(1));
        g.add_dependency(n[1], n[0], via_p1).unwrap();

        let err = g.add_dependency(n[1], n[0], Route::this()).unwrap_err();
        assert_eq!(
            err,
            CompilationError::InconsistentAccessPath {
                dependant: "B".into(),
                dependency: "A".into(),
                first: "this.p1".into(),
                second: "this".into(),
            }
        );

        let mut shadowing = Route::this();
        shadowing.push("other", CompositionId::new(1));
        assert!(!g.add_dependency(n[1], n[0], shadowing).unwrap());
    }

    #[test]
    fn cycle_reachable_from_root() {
        // A <- B <- C <- B
        let (mut g, n) = graph(&["A", "B", "C"]);
        g.add_dependency(n[1], n[0], Route::this()).unwrap();
        g.add_dependency(n[2], n[1], Route::this()).unwrap();
        g.add_dependency(n[1], n[2], Route::this()).unwrap();
        let err = g.check_acyclic().unwrap_err();
        assert_eq!(
            err,
            CompilationError::CyclicDependency {
                cycle: vec!["B".into(), "C".into()]
            }
        );
    }

    #[test]
    fn cycle_without_roots() {
        // X -> Y -> Z -> X
        let (mut g, n) = graph(&["X", "Y", "Z"]);
        g.add_dependency(n[0], n[1], Route::this()).unwrap();
        g.add_dependency(n[1], n[2], Route::this()).unwrap();
        g.add_dependency(n[2], n[0], Route::this()).unwrap();
        match g.check_acyclic().unwrap_err() {
            CompilationError::CyclicDependency { cycle } => {
                let mut sorted = cycle.clone();
                sorted.sort();
                assert_eq!(sorted, ["X", "Y", "Z"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn sorted_dependants_respect_their_own_order() {
        // B and C depend on A; C also depends on B.
        let (mut g, n) = graph(&["A", "B", "C"]);
        g.add_dependency(n[1], n[0], Route::this()).unwrap();
        g.add_dependency(n[2], n[0], Route::this()).unwrap();
        g.add_dependency(n[2], n[1], Route::this()).unwrap();
        assert_eq!(g.sorted_dependants(n[0]), vec![n[1], n[2]]);
        assert_eq!(g.sorted_dependants(n[2]), Vec::<DependencyId>::new());
    }
}
