//! Built-in pipeline node implementations.

pub mod box_smooth;
pub mod extract_region;
pub mod image_source;
pub mod piece_source;
pub mod shift_scale;

pub use box_smooth::BoxSmoothNode;
pub use extract_region::ExtractRegionNode;
pub use image_source::ImageSourceNode;
pub use piece_source::PieceSourceNode;
pub use shift_scale::ShiftScaleNode;

use crate::pipeline::data_object::{DataHandle, DataObject};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::information::keys::DataObjectKey;
use crate::pipeline::information::{Information, InformationKey};
use crate::pipeline::reconcile::ReconcileOutcome;
use std::sync::Arc;

/// The data object on input port 0.
pub(crate) fn input_data<'a>(node: &str, inputs: &'a [Information]) -> PipelineResult<&'a DataHandle> {
    inputs
        .first()
        .and_then(Information::data_object)
        .ok_or_else(|| PipelineError::missing(node, DataObjectKey::ID))
}

/// Writable data object on output port 0. Copy-on-write: a version still
/// referenced elsewhere is cloned first.
pub(crate) fn output_data<'a>(
    node: &str,
    outputs: &'a mut [Information],
) -> PipelineResult<&'a mut DataObject> {
    outputs
        .first_mut()
        .and_then(Information::data_object_mut)
        .map(Arc::make_mut)
        .ok_or_else(|| PipelineError::missing(node, DataObjectKey::ID))
}

/// After a reconcile that transferred nothing, drop leftovers of the previous
/// execution so only the produced scalars remain.
pub(crate) fn drop_stale_attributes(output: &mut DataObject, outcome: ReconcileOutcome) {
    if !matches!(outcome, ReconcileOutcome::Skipped(_)) {
        return;
    }
    let produced = output.point_data().scalars_name().map(str::to_string);
    output
        .point_data_mut()
        .retain(|a| produced.as_deref() == Some(a.name()));
    output.cell_data_mut().clear();
}
