use crate::pipeline::id::NodeId;

/// The nodes one update of `target` touches, in dependency order.
///
/// Built by [`PipelineCompiler`](crate::pipeline::compiler::PipelineCompiler)
/// and reused until the graph topology changes.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    pub target: NodeId,

    /// Upstream closure of `target`, sources first and `target` last
    pub order: Vec<usize>,

    /// (from_idx, to_idx) for every edge inside the closure
    pub edges: Vec<(usize, usize)>,

    /// Graph generation the plan was compiled against
    pub generation: u64,

    pub stats: PlanStats,
}

#[derive(Debug, Clone, Default)]
pub struct PlanStats {
    pub total_nodes: usize,

    /// Nodes in the upstream closure, target included
    pub upstream_nodes: usize,

    /// Nodes the update does not touch
    pub outside_nodes: usize,

    pub source_nodes: usize,

    pub compile_time_us: u64,
}

impl CompiledPlan {
    /// Order of the information phase.
    pub fn sources_first(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }

    /// Order of update-extent propagation.
    pub fn target_first(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().rev().copied()
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.order.contains(&idx)
    }

    /// Whether the plan still matches a graph at `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}
