//! Lifecycle Pass - declare every node's lifecycle members.
//!
//! Runs [`Synthesizer::prepare`] on each node. Afterwards every stage has a
//! predicate, a close and a `doClose`; nodes with closable dependants have a
//! close-dependants method, called on entry to the close and after any init
//! that re-initialized the stage.
//!
//! Must follow the guarding pass.

use tracing::debug;

use stagegraph_core::{DependencyId, Result};

use crate::context::CompileContext;
use crate::synthesis::Synthesizer;

/// Output of the lifecycle pass.
#[derive(Debug, Default)]
pub struct LifecycleOutput {
    pub stages: usize,
    /// Stages whose close was generated from the sentinel field.
    pub closes_generated: usize,
    /// Nodes that got a close-dependants method.
    pub close_dependants: usize,
}

pub struct LifecyclePass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> LifecyclePass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<LifecycleOutput> {
        let nodes: Vec<DependencyId> = self.cx.graph.ids().collect();
        let mut synth = Synthesizer::new(self.cx);
        for &node in &nodes {
            synth.prepare(node)?;
        }

        let mut output = LifecycleOutput::default();
        let cx = synth.context();
        for &node in &nodes {
            let data = cx.graph.node(node);
            if data.close_dependants.get().is_some_and(Option::is_some) {
                output.close_dependants += 1;
            }
            if let Some(stage) = data.as_stage() {
                output.stages += 1;
                if stage.close_generated {
                    output.closes_generated += 1;
                }
            }
        }

        debug!(
            stages = output.stages,
            closes_generated = output.closes_generated,
            close_dependants = output.close_dependants,
            "lifecycle members declared"
        );
        Ok(output)
    }
}
