//! Ordering Pass - reject cycles and number the nodes.
//!
//! Every node gets its 1-based position in a topological order of the
//! dependency graph (dependencies first). The position drives the layout of
//! the members each node contributes to the merged output.

use tracing::debug;

use stagegraph_core::{DependencyId, Result};

use crate::context::CompileContext;

/// Output of the ordering pass.
#[derive(Debug, Default)]
pub struct OrderingOutput {
    /// Every node, dependencies before dependants.
    pub order: Vec<DependencyId>,
}

pub struct OrderingPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> OrderingPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<OrderingOutput> {
        self.cx.graph.check_acyclic()?;

        let order = self.cx.graph.topological_order();
        for (position, &node) in order.iter().enumerate() {
            self.cx.registry.set_node_order(node, position as i64 + 1);
        }

        debug!(nodes = order.len(), "dependency graph ordered");
        Ok(OrderingOutput { order })
    }
}
