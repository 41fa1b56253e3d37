//! Cache layer: an executive that keeps earlier outputs of a node in a bounded
//! slot table and serves later requests from them.
//!
//! Only nodes with exactly one input and one output can be cached; anything
//! else fails with `UnsupportedTopology` when the data phase reaches it.
//!
//! A slot's `time` is the modification time of the output at the moment it was
//! stored (its production time). Slots older than the node's pipeline
//! modification time are stale and evicted before every lookup. When a fresh
//! result needs a slot, the first empty slot is used, else the slot with the
//! oldest production time. Hits never refresh a slot's time.

use crate::pipeline::data_object::{DataHandle, DataObject};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::executive::{data_is_stale, request_satisfied, run_request_data, ExecContext, Executive};
use crate::pipeline::information::Information;
use crate::pipeline::node::AnyNode;
use crate::types::ExtentType;
use std::sync::Arc;

/// Slot count used when a node is cached without an explicit size.
pub const DEFAULT_CACHE_SIZE: u32 = 10;

/// One cached result.
#[derive(Debug, Clone, Default)]
pub struct CacheSlot {
    pub data: Option<DataHandle>,
    pub time: u64,
}

impl CacheSlot {
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    fn evict(&mut self) {
        self.data = None;
        self.time = 0;
    }
}

#[derive(Debug, Clone)]
pub struct CachedExecutive {
    slots: Vec<CacheSlot>,
}

impl Default for CachedExecutive {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl CachedExecutive {
    pub fn new(size: u32) -> Self {
        Self {
            slots: vec![CacheSlot::default(); size as usize],
        }
    }

    pub fn cache_size(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Discard every cached entry and reallocate the table. Size 0 disables
    /// caching.
    pub fn set_cache_size(&mut self, size: u32) {
        tracing::debug!(
            "Cache resized from {} to {} slots, entries discarded",
            self.slots.len(),
            size
        );
        self.slots = vec![CacheSlot::default(); size as usize];
    }

    pub fn slots(&self) -> &[CacheSlot] {
        &self.slots
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    fn check_topology(ctx: &ExecContext<'_>) -> PipelineResult<()> {
        if ctx.input_ports != 1 || ctx.output_ports != 1 {
            return Err(PipelineError::UnsupportedTopology {
                node: ctx.node_name.to_string(),
                inputs: ctx.input_ports,
                outputs: ctx.output_ports,
            });
        }
        Ok(())
    }

    /// Drop every slot produced before `pipeline_mtime`.
    fn evict_stale(&mut self, pipeline_mtime: u64) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if !slot.is_empty() && slot.time < pipeline_mtime {
                tracing::debug!(
                    "Evicting stale cache slot {} (time {} < pipeline {})",
                    idx,
                    slot.time,
                    pipeline_mtime
                );
                slot.evict();
            }
        }
    }

    /// Index of a slot that can answer the request on `ctx`'s output.
    fn find_hit(&self, ctx: &ExecContext<'_>) -> Option<usize> {
        let info = ctx.requested()?;
        let extent_type = info.data_object()?.extent_type();
        match extent_type {
            ExtentType::Structured => {
                let requested = info.update_extent()?;
                self.slots.iter().position(|slot| {
                    slot.data.as_ref().is_some_and(|data| {
                        data.extent_type() == ExtentType::Structured
                            && data.extent().contains(&requested)
                    })
                })
            }
            ExtentType::Pieces => {
                let requested = info.piece_request().unwrap_or_default();
                self.slots.iter().position(|slot| {
                    slot.data.as_ref().is_some_and(|data| {
                        data.extent_type() == ExtentType::Pieces && data.piece() == Some(requested)
                    })
                })
            }
        }
    }

    /// Slot to receive a fresh result: first empty, else oldest time.
    fn victim(&self) -> Option<usize> {
        if let Some(idx) = self.slots.iter().position(CacheSlot::is_empty) {
            return Some(idx);
        }
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.time)
            .map(|(idx, _)| idx)
    }
}

impl Executive for CachedExecutive {
    fn need_to_execute(&mut self, ctx: &mut ExecContext<'_>) -> PipelineResult<bool> {
        Self::check_topology(ctx)?;

        // An unfinished multi-pass run resumes before any lookup.
        if ctx.requested().is_some_and(Information::continue_executing) {
            tracing::trace!("'{}': continuing a multi-pass execution", ctx.node_name);
            return Ok(true);
        }
        if !data_is_stale(ctx) && request_satisfied(ctx) {
            return Ok(false);
        }
        if self.slots.is_empty() {
            return Ok(true);
        }

        self.evict_stale(ctx.pipeline_mtime);

        let Some(idx) = self.find_hit(ctx) else {
            tracing::debug!("Cache miss on '{}'", ctx.node_name);
            return Ok(true);
        };
        let Some(cached) = self.slots[idx].data.clone() else {
            return Ok(true);
        };

        let port = ctx.port;
        let Some(handle) = ctx.outputs[port].data_object_mut() else {
            return Ok(true);
        };
        let output = Arc::make_mut(handle);
        output.alias_from(&cached);
        output.data_has_been_generated();
        ctx.outputs[port].set_continue_executing(false);
        ctx.cache_hit = true;

        tracing::debug!(
            "Cache hit on '{}' from slot {} ({})",
            ctx.node_name,
            idx,
            describe(&cached)
        );
        Ok(false)
    }

    fn execute_data(&mut self, node: &mut AnyNode, ctx: &mut ExecContext<'_>) -> PipelineResult<()> {
        Self::check_topology(ctx)?;
        run_request_data(node, ctx)?;

        if ctx.requested().is_some_and(Information::continue_executing) {
            tracing::trace!("'{}': pass result not cached, more passes follow", ctx.node_name);
            return Ok(());
        }
        let Some(idx) = self.victim() else {
            return Ok(());
        };
        let Some(produced) = ctx.requested().and_then(|info| info.data_object()) else {
            return Ok(());
        };

        let slot = &mut self.slots[idx];
        if let Some(previous) = &slot.data {
            tracing::debug!(
                "Cache slot {} on '{}' replaces {} (time {})",
                idx,
                ctx.node_name,
                describe(previous),
                slot.time
            );
        }

        // Reuse the slot's object when nothing else references it; its
        // arrays are released by the shallow copy either way.
        let mut stored = slot
            .data
            .take()
            .filter(|handle| Arc::strong_count(handle) == 1)
            .unwrap_or_else(|| Arc::new(DataObject::new(produced.extent_type())));
        let entry = Arc::make_mut(&mut stored);
        entry.alias_from(produced);
        entry.data_has_been_generated();

        slot.time = produced.mtime();
        slot.data = Some(stored);
        tracing::debug!("Cached {} of '{}' in slot {}", describe(produced), ctx.node_name, idx);
        Ok(())
    }
}

fn describe(data: &DataObject) -> String {
    match data.extent_type() {
        ExtentType::Structured => format!("extent {}", data.extent()),
        ExtentType::Pieces => match data.piece() {
            Some(p) => format!("piece {}/{} ghost {}", p.piece, p.pieces, p.ghost_levels),
            None => "unassigned piece".to_string(),
        },
    }
}
