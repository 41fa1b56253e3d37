//! Pipeline executor: the node graph and the demand-driven update driver.
//!
//! An update of one output port runs three phases over the target's upstream
//! closure:
//! 1. Information: each node derives output metadata, sources first.
//! 2. Update extent: the request walks back from the target, each node
//!    writing what it needs from its inputs.
//! 3. Data: starting at the target, each node asks its executive whether it
//!    must run; if so its inputs are brought up to date first (post-order) and
//!    it executes, repeating while it asks to continue.
//!
//! Node execution works on staged copies of the output information. They
//! replace the node's outputs only when `request_data` succeeds, so a failed
//! update leaves the previous output in place.

use crate::config::{EdgeDescription, ExecutionSettings, NodeDescription, PipelineFile};
use crate::pipeline::cache::CachedExecutive;
use crate::pipeline::compiled_plan::CompiledPlan;
use crate::pipeline::compiler::PipelineCompiler;
use crate::pipeline::data_object::{DataHandle, DataObject};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::executive::{ExecContext, ExecutiveKind};
use crate::pipeline::id::{EdgeId, NodeId, PortId};
use crate::pipeline::information::keys::*;
use crate::pipeline::information::Information;
use crate::pipeline::node::AnyNode;
use crate::pipeline::node_type::{NodeFactory, ParamValue};
use crate::pipeline::port::{input_count, output_count, ports_in, DataKind, PortDirection};
use crate::types::{Extent, ExtentType, PieceRequest, UpdateRequest};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// A connection from an output port of one node to an input port of another.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from: PortId,
    pub to_node: NodeId,
    pub to_port: u16,
}

/// A slot holding a node, its executive and the information of its ports.
pub struct NodeSlot {
    pub node: AnyNode,
    pub executive: ExecutiveKind,
    /// Upstream output feeding each input port.
    pub inputs: Vec<Option<PortId>>,
    /// Information of each output port, including its data object.
    pub outputs: Vec<Information>,
    /// Max mtime over this node and its upstream closure, as of the last
    /// information phase.
    pub pipeline_mtime: u64,
    /// Successful `request_data` invocations.
    pub execution_count: u64,
}

impl NodeSlot {
    pub fn new(node: AnyNode) -> Self {
        let inputs = vec![None; input_count(node.ports())];
        let outputs = vec![Information::new(); output_count(node.ports())];
        Self {
            node,
            executive: ExecutiveKind::default(),
            inputs,
            outputs,
            pipeline_mtime: 0,
            execution_count: 0,
        }
    }

    fn output_kind(&self, port: usize) -> Option<DataKind> {
        ports_in(self.node.ports(), PortDirection::Output)
            .nth(port)
            .map(|p| p.kind)
    }

    fn input_kind(&self, port: usize) -> Option<DataKind> {
        ports_in(self.node.ports(), PortDirection::Input)
            .nth(port)
            .map(|p| p.kind)
    }
}

/// What one call to [`Pipeline::update`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// `request_data` invocations, continued passes included.
    pub nodes_executed: usize,
    /// Nodes whose request a cache slot answered.
    pub cache_hits: usize,
    /// Nodes whose existing output already satisfied the request.
    pub nodes_reused: usize,
}

/// The pipeline graph and update driver.
pub struct Pipeline {
    nodes: Vec<NodeSlot>,
    edges: Vec<Edge>,
    next_edge_id: u32,
    /// Compiled plans keyed by update target, valid for `graph_generation`.
    compiled_plans: HashMap<NodeId, CompiledPlan>,
    /// Generation counter for plan invalidation
    graph_generation: u64,
    settings: ExecutionSettings,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("generation", &self.graph_generation)
            .finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ExecutionSettings::default())
    }
}

impl Pipeline {
    pub fn new(settings: ExecutionSettings) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_edge_id: 0,
            compiled_plans: HashMap::new(),
            graph_generation: 0,
            settings,
        }
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    // ── Graph building ──

    /// Add a node to the pipeline. Returns its NodeId.
    pub fn add_node(&mut self, node: AnyNode) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        tracing::debug!("Added node {:?} '{}'", id, node.name());
        self.nodes.push(NodeSlot::new(node));
        self.invalidate_compiled_plan();
        id
    }

    /// Connect output 0 of `from` to input 0 of `to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> PipelineResult<EdgeId> {
        self.connect(from, 0, to, 0)
    }

    /// Connect an output port of `from` to an input port of `to`, replacing
    /// any connection that input already had.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_port: usize,
        to: NodeId,
        to_port: usize,
    ) -> PipelineResult<EdgeId> {
        let from_slot = self.slot(from)?;
        let to_slot = self.slot(to)?;

        let produced = from_slot.output_kind(from_port).ok_or_else(|| PipelineError::PortArity {
            node: from_slot.node.name().to_string(),
            message: format!("no output port {}", from_port),
        })?;
        let accepted = to_slot.input_kind(to_port).ok_or_else(|| PipelineError::PortArity {
            node: to_slot.node.name().to_string(),
            message: format!("no input port {}", to_port),
        })?;
        if !accepted.accepts(produced) {
            return Err(PipelineError::DataKindMismatch(format!(
                "'{}' output {} produces {:?} but '{}' input {} accepts {:?}",
                from_slot.node.name(),
                from_port,
                produced,
                to_slot.node.name(),
                to_port,
                accepted
            )));
        }

        if from == to || self.would_create_cycle(from, to) {
            tracing::warn!(
                "Rejected edge {:?} -> {:?}: it would create a cycle",
                from,
                to
            );
            return Err(PipelineError::CycleDetected);
        }

        let replaced = self.remove_input_edge(to, to_port);
        let port_id = PortId::new(from, from_port as u16);
        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.push(Edge {
            id,
            from: port_id,
            to_node: to,
            to_port: to_port as u16,
        });
        self.nodes[to.index()].inputs[to_port] = Some(port_id);
        self.invalidate_compiled_plan();

        tracing::info!(
            "Added edge {:?}: {:?} -> {:?} input {}{}",
            id,
            port_id,
            to,
            to_port,
            if replaced.is_some() { " (replaced previous)" } else { "" }
        );
        Ok(id)
    }

    /// Remove the connection feeding an input port. Returns the removed edge.
    pub fn disconnect(&mut self, to: NodeId, to_port: usize) -> PipelineResult<Option<EdgeId>> {
        let slot = self.slot(to)?;
        if to_port >= slot.inputs.len() {
            return Err(PipelineError::PortArity {
                node: slot.node.name().to_string(),
                message: format!("no input port {}", to_port),
            });
        }
        let removed = self.remove_input_edge(to, to_port);
        if let Some(id) = removed {
            self.invalidate_compiled_plan();
            tracing::info!("Removed edge {:?}", id);
        }
        Ok(removed)
    }

    fn remove_input_edge(&mut self, to: NodeId, to_port: usize) -> Option<EdgeId> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.to_node == to && e.to_port as usize == to_port)?;
        let edge = self.edges.remove(pos);
        self.nodes[to.index()].inputs[to_port] = None;
        Some(edge.id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&AnyNode> {
        self.nodes.get(id.index()).map(|slot| &slot.node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut AnyNode> {
        self.nodes.get_mut(id.index()).map(|slot| &mut slot.node)
    }

    /// First node with the given name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|slot| slot.node.name() == name)
            .map(NodeId::from_index)
    }

    /// Set a node parameter. Built-in nodes bump their mtime on change.
    pub fn set_parameter(&mut self, id: NodeId, key: &str, value: &ParamValue) -> PipelineResult<()> {
        self.slot_mut(id)?.node.set_parameter(key, value)
    }

    /// Mark a node modified so everything downstream of it is re-executed on
    /// the next update.
    pub fn mark_modified(&mut self, id: NodeId) -> PipelineResult<()> {
        self.slot_mut(id)?.node.modified();
        Ok(())
    }

    // ── Cache configuration ──

    /// Put a cache layer with `size` slots in front of a node. Any previous
    /// cache contents are discarded.
    pub fn set_cache_size(&mut self, id: NodeId, size: u32) -> PipelineResult<()> {
        let slot = self.slot_mut(id)?;
        match slot.executive.as_cached_mut() {
            Some(cache) => cache.set_cache_size(size),
            None => {
                tracing::debug!("Caching '{}' with {} slots", slot.node.name(), size);
                slot.executive = ExecutiveKind::Cached(CachedExecutive::new(size));
            }
        }
        Ok(())
    }

    /// Cache a node with the configured default size.
    pub fn enable_cache(&mut self, id: NodeId) -> PipelineResult<()> {
        self.set_cache_size(id, self.settings.default_cache_size)
    }

    /// Slot count of a cached node, `None` if the node is not cached.
    pub fn cache_size(&self, id: NodeId) -> Option<u32> {
        self.nodes
            .get(id.index())
            .and_then(|slot| slot.executive.as_cached())
            .map(CachedExecutive::cache_size)
    }

    pub fn cache(&self, id: NodeId) -> Option<&CachedExecutive> {
        self.nodes
            .get(id.index())
            .and_then(|slot| slot.executive.as_cached())
    }

    // ── Outputs ──

    pub fn output_information(&self, id: NodeId, port: usize) -> Option<&Information> {
        self.nodes.get(id.index())?.outputs.get(port)
    }

    /// The data object currently held on an output port.
    pub fn output_data(&self, id: NodeId, port: usize) -> Option<DataHandle> {
        self.output_information(id, port)?.data_object().cloned()
    }

    pub fn execution_count(&self, id: NodeId) -> u64 {
        self.nodes
            .get(id.index())
            .map(|slot| slot.execution_count)
            .unwrap_or(0)
    }

    /// Max modification time over `id` and everything upstream of it, computed
    /// from the current node mtimes.
    pub fn pipeline_mtime(&self, id: NodeId) -> PipelineResult<u64> {
        let plan = PipelineCompiler::compile(&self.nodes, id, self.graph_generation)?;
        let mut mtimes = vec![0u64; self.nodes.len()];
        for idx in plan.sources_first() {
            let slot = &self.nodes[idx];
            let upstream = slot
                .inputs
                .iter()
                .flatten()
                .map(|from| mtimes[from.node().index()])
                .max()
                .unwrap_or(0);
            mtimes[idx] = slot.node.mtime().max(upstream);
        }
        Ok(mtimes[id.index()])
    }

    // ── Plan compilation ──

    /// Invalidate compiled plans (called when graph topology changes).
    fn invalidate_compiled_plan(&mut self) {
        self.compiled_plans.clear();
        self.graph_generation += 1;
    }

    /// The plan for `target`, compiled lazily per graph generation.
    fn plan_for(&mut self, target: NodeId) -> PipelineResult<CompiledPlan> {
        if let Some(plan) = self.compiled_plans.get(&target) {
            if plan.is_current(self.graph_generation) {
                return Ok(plan.clone());
            }
        }

        let plan = PipelineCompiler::compile(&self.nodes, target, self.graph_generation)?;
        tracing::info!(
            "Pipeline compiled for {:?}: {} upstream / {} total (gen {}, {} us)",
            target,
            plan.stats.upstream_nodes,
            plan.stats.total_nodes,
            plan.generation,
            plan.stats.compile_time_us,
        );
        self.compiled_plans.insert(target, plan.clone());
        Ok(plan)
    }

    /// Check if adding an edge from `from` to `to` would create a cycle.
    fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        // If `to` is upstream of `from`, adding from->to closes a loop.
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let idx = current.index();
            if idx >= self.nodes.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.extend(self.nodes[idx].inputs.iter().flatten().map(|p| p.node()));
        }
        false
    }

    fn slot(&self, id: NodeId) -> PipelineResult<&NodeSlot> {
        self.nodes
            .get(id.index())
            .ok_or(PipelineError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> PipelineResult<&mut NodeSlot> {
        self.nodes
            .get_mut(id.index())
            .ok_or(PipelineError::UnknownNode(id))
    }

    // ── Update ──

    /// Produce `request` on output `port` of `id`.
    ///
    /// Only the target's upstream closure takes part. Errors abort the update
    /// and leave every node's previous data object in place.
    pub fn update(
        &mut self,
        id: NodeId,
        port: usize,
        request: impl Into<UpdateRequest>,
    ) -> PipelineResult<UpdateStats> {
        let request = request.into();
        let start = Instant::now();
        let plan = self.plan_for(id)?;
        let idx = id.index();

        let slot = &self.nodes[idx];
        if port >= slot.outputs.len() {
            return Err(PipelineError::PortArity {
                node: slot.node.name().to_string(),
                message: format!("no output port {}", port),
            });
        }

        // Phase 1: information, upstream to downstream
        for node in plan.sources_first() {
            self.information_pass(node)?;
        }

        self.apply_request(idx, port, request);
        self.verify_output(idx, port)?;

        // Phase 2: update extents, downstream to upstream
        self.propagate_update_extents(&plan, idx, port)?;

        // Phase 3: data
        let mut stats = UpdateStats::default();
        self.update_data(idx, port, &mut stats)?;

        tracing::info!(
            "Updated '{}' port {} with {:?}: {} executed, {} cache hits, {} reused in {:?}",
            self.nodes[idx].node.name(),
            port,
            request,
            stats.nodes_executed,
            stats.cache_hits,
            stats.nodes_reused,
            start.elapsed()
        );
        Ok(stats)
    }

    /// Information of every upstream output feeding `idx`, one per input port.
    fn gather_inputs(&self, idx: usize) -> Vec<Information> {
        self.nodes[idx]
            .inputs
            .iter()
            .map(|from| match from {
                Some(p) => self.nodes[p.node().index()].outputs[p.port_index() as usize].clone(),
                None => Information::new(),
            })
            .collect()
    }

    fn information_pass(&mut self, idx: usize) -> PipelineResult<()> {
        let inputs = self.gather_inputs(idx);
        let upstream_mtime = self.nodes[idx]
            .inputs
            .iter()
            .flatten()
            .map(|p| self.nodes[p.node().index()].pipeline_mtime)
            .max()
            .unwrap_or(0);

        let slot = &mut self.nodes[idx];
        slot.pipeline_mtime = slot.node.mtime().max(upstream_mtime);

        let kinds: Vec<ExtentType> = ports_in(slot.node.ports(), PortDirection::Output)
            .map(|p| p.kind.extent_type())
            .collect();

        for (info, &kind) in slot.outputs.iter_mut().zip(&kinds) {
            if info.data_object().is_none() {
                info.set(DATA_OBJECT, Arc::new(DataObject::new(kind)));
            }
            info.remove(WHOLE_EXTENT);
            info.remove(ORIGIN);
            info.remove(SPACING);
            if let Some(first) = inputs.first() {
                info.copy_entry(first, WHOLE_EXTENT);
                info.copy_entry(first, ORIGIN);
                info.copy_entry(first, SPACING);
            }
        }

        tracing::trace!("request_information on '{}'", slot.node.name());
        slot.node.request_information(&inputs, &mut slot.outputs)?;

        for (info, &kind) in slot.outputs.iter_mut().zip(&kinds) {
            if kind != ExtentType::Structured {
                continue;
            }
            let whole = match info.whole_extent() {
                Some(whole) => whole,
                None => {
                    info.set(WHOLE_EXTENT, Extent::EMPTY);
                    Extent::EMPTY
                }
            };
            if !info.has(UPDATE_EXTENT) {
                info.set(UPDATE_EXTENT, whole);
            }
        }
        Ok(())
    }

    fn apply_request(&mut self, idx: usize, port: usize, request: UpdateRequest) {
        let info = &mut self.nodes[idx].outputs[port];
        let pieces = info
            .data_object()
            .is_some_and(|d| d.extent_type() == ExtentType::Pieces);
        match request {
            UpdateRequest::WholeExtent if pieces => info.set_piece_request(PieceRequest::default()),
            UpdateRequest::WholeExtent => {
                let whole = info.whole_extent().unwrap_or(Extent::EMPTY);
                info.set(UPDATE_EXTENT, whole);
            }
            UpdateRequest::Extent(extent) => info.set(UPDATE_EXTENT, extent),
            UpdateRequest::Piece(piece) => info.set_piece_request(piece),
        }
    }

    /// Reject a structured request outside the whole extent; default a missing
    /// piece request to the whole data set.
    fn verify_output(&mut self, idx: usize, port: usize) -> PipelineResult<()> {
        let slot = &mut self.nodes[idx];
        let name = slot.node.name().to_string();
        let info = &mut slot.outputs[port];
        let extent_type = info
            .data_object()
            .map(|d| d.extent_type())
            .unwrap_or(ExtentType::Structured);

        match extent_type {
            ExtentType::Structured => {
                let whole = *info.require(WHOLE_EXTENT, &name)?;
                let update = *info.require(UPDATE_EXTENT, &name)?;
                if !update.is_empty() && !whole.contains(&update) {
                    return Err(PipelineError::InvalidUpdateExtent {
                        node: name,
                        update,
                        whole,
                    });
                }
            }
            ExtentType::Pieces => {
                if info.piece_request().is_none() {
                    info.set_piece_request(PieceRequest::default());
                }
            }
        }
        Ok(())
    }

    /// Walk the plan backwards from `target`, letting each node turn the
    /// request on its output into requests on its inputs.
    fn propagate_update_extents(
        &mut self,
        plan: &CompiledPlan,
        target: usize,
        port: usize,
    ) -> PipelineResult<()> {
        let mut requested: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.nodes.len()];
        requested[target].insert(port);
        let mut seen = HashSet::new();

        for idx in plan.target_first() {
            let ports = std::mem::take(&mut requested[idx]);
            for port in ports {
                self.update_extent_pass(idx, port, &mut requested, &mut seen)?;
            }
        }
        Ok(())
    }

    fn update_extent_pass(
        &mut self,
        idx: usize,
        port: usize,
        requested: &mut [BTreeSet<usize>],
        seen: &mut HashSet<PortId>,
    ) -> PipelineResult<()> {
        let mut inputs = self.gather_inputs(idx);

        {
            let slot = &mut self.nodes[idx];
            let request = &slot.outputs[port];
            for input in inputs.iter_mut() {
                if let Some(whole) = input.whole_extent() {
                    input.set(UPDATE_EXTENT, whole);
                }
                if let Some(extent) = request.update_extent() {
                    input.set(UPDATE_EXTENT, extent);
                }
                if let Some(piece) = request.piece_request() {
                    input.set_piece_request(piece);
                }
            }

            tracing::trace!("request_update_extent on '{}'", slot.node.name());
            slot.node.request_update_extent(&mut inputs, &slot.outputs)?;
        }

        let connections = self.nodes[idx].inputs.clone();
        for (input, from) in inputs.iter().zip(connections) {
            let Some(from) = from else {
                continue;
            };
            let upstream = &mut self.nodes[from.node().index()].outputs[from.port_index() as usize];

            // A second consumer in the same update widens the request.
            let merged = if seen.contains(&from) {
                match (upstream.update_extent(), input.update_extent()) {
                    (Some(a), Some(b)) => Some(a.union(&b)),
                    _ => None,
                }
            } else {
                None
            };
            upstream.copy_request_from(input);
            if let Some(extent) = merged {
                upstream.set(UPDATE_EXTENT, extent);
            }

            seen.insert(from);
            requested[from.node().index()].insert(from.port_index() as usize);
        }
        Ok(())
    }

    /// A structured output asked for an empty extent needs no data.
    fn trivially_satisfied(&self, idx: usize, port: usize) -> bool {
        let info = &self.nodes[idx].outputs[port];
        let structured = info
            .data_object()
            .is_some_and(|d| d.extent_type() == ExtentType::Structured);
        structured && info.update_extent().is_some_and(|e| e.is_empty())
    }

    fn update_data(&mut self, idx: usize, port: usize, stats: &mut UpdateStats) -> PipelineResult<()> {
        if self.trivially_satisfied(idx, port) {
            tracing::trace!(
                "'{}' port {}: empty update extent, nothing to do",
                self.nodes[idx].node.name(),
                port
            );
            return Ok(());
        }

        let inputs = self.gather_inputs(idx);
        if !self.decide(idx, port, &inputs, stats)? {
            return Ok(());
        }

        loop {
            // Inputs first (post-order)
            let connections = self.nodes[idx].inputs.clone();
            for from in connections.into_iter().flatten() {
                self.update_data(from.node().index(), from.port_index() as usize, stats)?;
            }

            let inputs = self.gather_inputs(idx);
            self.execute(idx, port, &inputs)?;
            stats.nodes_executed += 1;

            if !self.nodes[idx].outputs[port].continue_executing() {
                break;
            }
            tracing::debug!("'{}' asked for another pass", self.nodes[idx].node.name());
            let plan = self.plan_for(NodeId::from_index(idx))?;
            self.propagate_update_extents(&plan, idx, port)?;
        }
        Ok(())
    }

    /// Ask the node's executive whether it must run. A cache hit commits the
    /// aliased output.
    fn decide(
        &mut self,
        idx: usize,
        port: usize,
        inputs: &[Information],
        stats: &mut UpdateStats,
    ) -> PipelineResult<bool> {
        let slot = &mut self.nodes[idx];
        let name = slot.node.name().to_string();
        let input_ports = slot.inputs.len();
        let output_ports = slot.outputs.len();
        let mut staged = slot.outputs.clone();

        let mut ctx = ExecContext {
            node_name: &name,
            port,
            inputs,
            outputs: &mut staged,
            pipeline_mtime: slot.pipeline_mtime,
            input_ports,
            output_ports,
            cache_hit: false,
        };
        let need = slot.executive.need_to_execute(&mut ctx)?;
        let cache_hit = ctx.cache_hit;

        if need {
            tracing::debug!("'{}' port {} needs to execute", name, port);
            return Ok(true);
        }
        if cache_hit {
            slot.outputs = staged;
            stats.cache_hits += 1;
        } else {
            tracing::debug!("'{}' port {} is up to date", name, port);
            stats.nodes_reused += 1;
        }
        Ok(false)
    }

    /// Run the node on staged outputs and commit them on success.
    fn execute(&mut self, idx: usize, port: usize, inputs: &[Information]) -> PipelineResult<()> {
        let slot = &mut self.nodes[idx];
        let name = slot.node.name().to_string();
        let input_ports = slot.inputs.len();
        let output_ports = slot.outputs.len();
        let mut staged = slot.outputs.clone();

        let mut ctx = ExecContext {
            node_name: &name,
            port,
            inputs,
            outputs: &mut staged,
            pipeline_mtime: slot.pipeline_mtime,
            input_ports,
            output_ports,
            cache_hit: false,
        };
        match slot.executive.execute_data(&mut slot.node, &mut ctx) {
            Ok(()) => {
                slot.outputs = staged;
                slot.execution_count += 1;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("'{}' failed, keeping its previous output: {}", name, e);
                Err(e)
            }
        }
    }
}

/// Name → id of every node a [`PipelineBuilder`] created.
pub type PipelineNodeIds = BTreeMap<String, NodeId>;

/// Builds a pipeline from node and edge descriptions.
pub struct PipelineBuilder {
    settings: ExecutionSettings,
}

impl PipelineBuilder {
    pub fn new(settings: ExecutionSettings) -> Self {
        Self { settings }
    }

    /// Build the nodes and edges of a description with its settings.
    pub fn from_file(file: &PipelineFile) -> PipelineResult<(Pipeline, PipelineNodeIds)> {
        Self::new(file.settings.clone()).build(&file.nodes, &file.edges)
    }

    /// Create every described node, cache the ones that ask for it, then wire
    /// the edges by node name.
    pub fn build(
        self,
        nodes: &[NodeDescription],
        edges: &[EdgeDescription],
    ) -> PipelineResult<(Pipeline, PipelineNodeIds)> {
        let factory = NodeFactory::new(&self.settings);
        let mut pipeline = Pipeline::new(self.settings.clone());
        let mut ids = PipelineNodeIds::new();

        for desc in nodes {
            if ids.contains_key(&desc.name) {
                return Err(PipelineError::node(&desc.name, "duplicate node name"));
            }
            let node = factory.create(desc.node_type, &desc.name, &desc.params)?;
            let id = pipeline.add_node(node);
            if let Some(size) = desc.cached {
                pipeline.set_cache_size(id, size)?;
            }
            ids.insert(desc.name.clone(), id);
        }

        for edge in edges {
            let lookup = |name: &str| {
                ids.get(name)
                    .copied()
                    .ok_or_else(|| PipelineError::InvalidEdge(format!("unknown node '{}'", name)))
            };
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;
            pipeline.connect(from, edge.from_port, to, edge.to_port)?;
        }

        tracing::info!(
            "Built pipeline with {} nodes and {} edges",
            pipeline.node_count(),
            pipeline.edges().len()
        );
        Ok((pipeline, ids))
    }
}
