//! Transfer of pass-through attributes from a node's input to its output.
//!
//! A node that computes one array (its active scalars) calls
//! [`AttributeReconciler::reconcile`] from `request_data` to carry every other
//! input array over to the output:
//!
//! - **pass** when input and output extents are equal: the output shares the
//!   input's arrays.
//! - **copy** when the output is a proper sub-region of the input and the input
//!   has more than one array: fresh arrays sized to the output receive the
//!   overlapping values. Cell arrays use cell extents.
//! - otherwise nothing is transferred.
//!
//! In both transferring branches the array the node produced is held by a
//! [`ProducedArrayGuard`] and restored as the active scalars when the guard
//! drops, on error paths included.

use crate::pipeline::data_object::{try_zeroed, ArrayHandle, AttributeSet, DataArray, DataObject};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::types::{Extent, ExtentType};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Explicit configuration for one reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Always allocate fresh output arrays in the copy branch, dropping the
    /// previous ones. When false, previous output arrays of matching name and
    /// shape that nothing else references are overwritten in place.
    ///
    /// A [`Pipeline`](crate::pipeline::Pipeline) runs nodes on staged copies of
    /// their outputs, so the committed previous arrays are always still
    /// referenced there and are never overwritten. Reuse only happens when a
    /// node is driven directly with uniquely owned outputs.
    pub release_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Origin or spacing differ between input and output.
    IncompatibleTransform,
    /// The input holds at most one array, which the node replaces anyway.
    SingleArray,
    /// The output is neither equal to nor inside the input extent.
    NotSubRegion,
    /// Piece data has no extent to reconcile against.
    Unstructured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Passed,
    Copied,
    Skipped(SkipReason),
}

/// Holds the array a node produced while the rest of an attribute set is
/// replaced, and reinstates it as the active scalars on drop.
pub struct ProducedArrayGuard<'a> {
    set: &'a mut AttributeSet,
    produced: Option<ArrayHandle>,
}

impl<'a> ProducedArrayGuard<'a> {
    pub fn new(set: &'a mut AttributeSet) -> Self {
        let produced = set.scalars().cloned();
        Self { set, produced }
    }

    pub fn produced_name(&self) -> Option<&str> {
        self.produced.as_deref().map(DataArray::name)
    }
}

impl Deref for ProducedArrayGuard<'_> {
    type Target = AttributeSet;

    fn deref(&self) -> &AttributeSet {
        self.set
    }
}

impl DerefMut for ProducedArrayGuard<'_> {
    fn deref_mut(&mut self) -> &mut AttributeSet {
        self.set
    }
}

impl Drop for ProducedArrayGuard<'_> {
    fn drop(&mut self) {
        let Some(produced) = self.produced.take() else {
            return;
        };
        // The produced array replaces whatever became the active scalars.
        if let Some(active) = self.set.scalars_name().map(str::to_string) {
            if active != produced.name() {
                self.set.remove(&active);
            }
        }
        self.set.set_scalars(produced);
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributeReconciler {
    options: ReconcileOptions,
}

impl AttributeReconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ReconcileOptions {
        self.options
    }

    /// Carry the input's pass-through arrays over to `output`. See the module
    /// docs for the branch rules.
    pub fn reconcile(
        &self,
        node: &str,
        input: &DataObject,
        output: &mut DataObject,
    ) -> PipelineResult<ReconcileOutcome> {
        if input.extent_type() != ExtentType::Structured
            || output.extent_type() != ExtentType::Structured
        {
            return Ok(ReconcileOutcome::Skipped(SkipReason::Unstructured));
        }

        if input.origin() != output.origin() || input.spacing() != output.spacing() {
            let err = PipelineError::IncompatibleTransform {
                node: node.to_string(),
                input_origin: input.origin(),
                output_origin: output.origin(),
                input_spacing: input.spacing(),
                output_spacing: output.spacing(),
            };
            tracing::warn!("{}; attributes not transferred", err);
            return Ok(ReconcileOutcome::Skipped(SkipReason::IncompatibleTransform));
        }

        let in_ext = input.extent();
        let out_ext = output.extent();

        if in_ext == out_ext {
            tracing::debug!("'{}': passing attributes over {}", node, out_ext);
            ProducedArrayGuard::new(output.point_data_mut()).pass_from(input.point_data());
            ProducedArrayGuard::new(output.cell_data_mut()).pass_from(input.cell_data());
            return Ok(ReconcileOutcome::Passed);
        }

        if out_ext.is_empty() || !in_ext.contains(&out_ext) {
            tracing::debug!(
                "'{}': output {} is not inside input {}, nothing transferred",
                node,
                out_ext,
                in_ext
            );
            return Ok(ReconcileOutcome::Skipped(SkipReason::NotSubRegion));
        }

        if input.point_data().len() + input.cell_data().len() <= 1 {
            return Ok(ReconcileOutcome::Skipped(SkipReason::SingleArray));
        }

        tracing::debug!("'{}': copying attributes {} -> {}", node, in_ext, out_ext);
        self.copy_region(input, output)?;
        Ok(ReconcileOutcome::Copied)
    }

    /// Copy the part of every input array that overlaps `output`'s extent,
    /// keeping the output's produced array. `output` must lie inside `input`.
    pub fn copy_region(&self, input: &DataObject, output: &mut DataObject) -> PipelineResult<()> {
        let in_ext = input.extent();
        let out_ext = output.extent();
        self.copy_set(
            input.point_data(),
            &mut ProducedArrayGuard::new(output.point_data_mut()),
            in_ext,
            out_ext,
        )?;
        self.copy_set(
            input.cell_data(),
            &mut ProducedArrayGuard::new(output.cell_data_mut()),
            in_ext.cell_extent(),
            out_ext.cell_extent(),
        )
    }

    fn copy_set(
        &self,
        source: &AttributeSet,
        target: &mut ProducedArrayGuard<'_>,
        in_ext: Extent,
        out_ext: Extent,
    ) -> PipelineResult<()> {
        let skip = target.produced_name().map(str::to_string);
        let mut previous = std::mem::take(&mut **target);
        let tuples = out_ext.num_points();

        for array in source.iter() {
            if skip.as_deref() == Some(array.name()) {
                continue;
            }
            let mut handle = match self.reusable(&mut previous, array, tuples) {
                Some(handle) => handle,
                None => {
                    let len = tuples.checked_mul(array.components()).ok_or_else(|| {
                        PipelineError::AllocationFailure(format!(
                            "array '{}' size overflows",
                            array.name()
                        ))
                    })?;
                    let values = try_zeroed(len, array.name())?;
                    Arc::new(DataArray::new(array.name(), array.components(), values))
                }
            };
            let dest = Arc::make_mut(&mut handle);
            for [i, j, k] in out_ext.indices() {
                let (Some(from), Some(to)) = (in_ext.offset_of(i, j, k), out_ext.offset_of(i, j, k))
                else {
                    continue;
                };
                dest.tuple_mut(to).copy_from_slice(array.tuple(from));
            }
            target.insert(handle);
        }

        if let Some(active) = source.scalars_name() {
            if target.get(active).is_some() {
                target.set_active_scalars(Some(active));
            }
        }
        Ok(())
    }

    /// An array from the previous output that can be overwritten in place.
    fn reusable(
        &self,
        previous: &mut AttributeSet,
        like: &DataArray,
        tuples: usize,
    ) -> Option<ArrayHandle> {
        if self.options.release_data {
            return None;
        }
        let mut handle = previous.remove(like.name())?;
        let fits = Arc::get_mut(&mut handle)
            .is_some_and(|a| a.components() == like.components() && a.num_tuples() == tuples);
        fits.then_some(handle)
    }
}
