use super::compiled_plan::{CompiledPlan, PlanStats};
use super::error::{PipelineError, PipelineResult};
use super::executor::NodeSlot;
use super::id::NodeId;
use super::port::{ports_in, PortDirection};
use std::collections::VecDeque;

/// Compiles the part of a pipeline graph an update touches into an ordered plan
pub struct PipelineCompiler;

impl PipelineCompiler {
    /// Compile the upstream closure of `target` into an execution plan.
    ///
    /// Every node in the closure must have all of its input ports connected;
    /// port arity is checked here, before any request phase runs.
    ///
    /// # Arguments
    /// * `nodes` - All nodes in the graph
    /// * `target` - Node whose output is being requested
    /// * `generation` - Generation counter for cache invalidation
    ///
    /// # Returns
    /// A `CompiledPlan` with the closure in topological order, target last
    pub fn compile(
        nodes: &[NodeSlot],
        target: NodeId,
        generation: u64,
    ) -> PipelineResult<CompiledPlan> {
        let start_time = std::time::Instant::now();

        if target.index() >= nodes.len() {
            return Err(PipelineError::UnknownNode(target));
        }

        // Upstream closure of the target
        let active_set = Self::upstream_closure(nodes, target)?;

        // Topological sort of the closure
        let order = Self::topological_sort_active(nodes, &active_set);
        let closure_size = active_set.iter().filter(|&&a| a).count();
        if order.len() != closure_size {
            tracing::warn!(
                "Pipeline graph has a cycle! Only {} of {} nodes upstream of {:?} scheduled.",
                order.len(),
                closure_size,
                target
            );
            return Err(PipelineError::CycleDetected);
        }

        let edges = Self::active_edges(nodes, &active_set);

        let source_nodes = order
            .iter()
            .filter(|&&idx| nodes[idx].inputs.is_empty())
            .count();

        let compile_time_us = start_time.elapsed().as_micros() as u64;
        let total_nodes = nodes.len();
        let upstream_nodes = order.len();

        let stats = PlanStats {
            total_nodes,
            upstream_nodes,
            outside_nodes: total_nodes.saturating_sub(upstream_nodes),
            source_nodes,
            compile_time_us,
        };

        Ok(CompiledPlan {
            target,
            order,
            edges,
            generation,
            stats,
        })
    }

    /// Mark every node the target depends on, checking input arity on the way
    fn upstream_closure(nodes: &[NodeSlot], target: NodeId) -> PipelineResult<Vec<bool>> {
        let n = nodes.len();
        let mut active = vec![false; n];
        let mut stack = vec![target.index()];

        while let Some(idx) = stack.pop() {
            if active[idx] {
                continue;
            }
            active[idx] = true;

            let slot = &nodes[idx];
            for (port, upstream) in slot.inputs.iter().enumerate() {
                match upstream {
                    Some(from) if from.node().index() < n => stack.push(from.node().index()),
                    Some(from) => return Err(PipelineError::UnknownNode(from.node())),
                    None => {
                        let port_name = ports_in(slot.node.ports(), PortDirection::Input)
                            .nth(port)
                            .map(|p| p.name)
                            .unwrap_or("?");
                        return Err(PipelineError::PortArity {
                            node: slot.node.name().to_string(),
                            message: format!("input port {} '{}' is not connected", port, port_name),
                        });
                    }
                }
            }
        }

        Ok(active)
    }

    /// Topological sort of active nodes using Kahn's algorithm
    fn topological_sort_active(nodes: &[NodeSlot], active_set: &[bool]) -> Vec<usize> {
        let n = nodes.len();

        // Build adjacency list for active nodes only
        let mut adj = vec![Vec::new(); n];
        let mut in_degree = vec![0; n];

        for (to, from) in Self::edges_in(nodes, active_set) {
            adj[from].push(to);
            in_degree[to] += 1;
        }

        // Kahn's algorithm
        let mut queue = VecDeque::new();
        let mut result = Vec::new();

        // Add all active nodes with in-degree 0
        for i in 0..n {
            if active_set[i] && in_degree[i] == 0 {
                queue.push_back(i);
            }
        }

        while let Some(node) = queue.pop_front() {
            result.push(node);

            for &neighbor in &adj[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        result
    }

    /// Pre-compute (from_idx, to_idx) routing for edges inside the closure
    fn active_edges(nodes: &[NodeSlot], active_set: &[bool]) -> Vec<(usize, usize)> {
        Self::edges_in(nodes, active_set)
            .map(|(to, from)| (from, to))
            .collect()
    }

    /// (to_idx, from_idx) for every connected input of an active node
    fn edges_in<'a>(
        nodes: &'a [NodeSlot],
        active_set: &'a [bool],
    ) -> impl Iterator<Item = (usize, usize)> + 'a {
        nodes
            .iter()
            .enumerate()
            .filter(move |(idx, _)| active_set[*idx])
            .flat_map(|(idx, slot)| {
                slot.inputs
                    .iter()
                    .flatten()
                    .map(move |from| (idx, from.node().index()))
            })
            .filter(move |&(_, from)| from < active_set.len() && active_set[from])
    }
}
