//! ExtractRegion node: restricts an image to a volume of interest.
//!
//! The output whole extent is the input whole extent clipped to the VOI, so
//! downstream requests never reach outside it. The node computes no array of
//! its own; all attributes come from the reconciler.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::information::keys::*;
use crate::pipeline::information::Information;
use crate::pipeline::mtime::TimeStamp;
use crate::pipeline::node::Algorithm;
use crate::pipeline::node_type::{bad_param, ParamValue};
use crate::pipeline::nodes::{input_data, output_data};
use crate::pipeline::port::{DataKind, PortDescriptor};
use crate::pipeline::reconcile::{
    AttributeReconciler, ReconcileOptions, ReconcileOutcome, SkipReason,
};
use crate::types::Extent;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", DataKind::Image),
    PortDescriptor::output("out", DataKind::Image),
];

pub struct ExtractRegionNode {
    name: String,
    voi: Extent,
    reconciler: AttributeReconciler,
    mtime: TimeStamp,
}

impl ExtractRegionNode {
    /// A VOI that clips nothing.
    pub const UNBOUNDED: Extent =
        Extent::new(i64::MIN / 2, i64::MAX / 2, i64::MIN / 2, i64::MAX / 2, i64::MIN / 2, i64::MAX / 2);

    pub fn new(name: impl Into<String>, voi: Extent, options: ReconcileOptions) -> Self {
        Self {
            name: name.into(),
            voi,
            reconciler: AttributeReconciler::new(options),
            mtime: TimeStamp::new(),
        }
    }

    pub fn voi(&self) -> Extent {
        self.voi
    }

    pub fn set_voi(&mut self, voi: Extent) {
        if self.voi != voi {
            self.voi = voi;
            self.mtime.modified();
        }
    }
}

impl Algorithm for ExtractRegionNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn mtime(&self) -> u64 {
        self.mtime.get()
    }

    fn modified(&mut self) {
        self.mtime.modified();
    }

    fn set_parameter(&mut self, key: &str, value: &ParamValue) -> PipelineResult<()> {
        match key {
            "voi" => {
                let voi = value
                    .as_extent()
                    .ok_or_else(|| bad_param(&self.name, key, "six integers"))?;
                self.set_voi(voi);
            }
            "release_data" => {
                let release_data = value
                    .as_bool()
                    .ok_or_else(|| bad_param(&self.name, key, "a boolean"))?;
                self.reconciler = AttributeReconciler::new(ReconcileOptions { release_data });
                self.mtime.modified();
            }
            _ => return Err(bad_param(&self.name, key, "a known parameter name")),
        }
        Ok(())
    }

    fn request_information(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let whole = *inputs[0].require(WHOLE_EXTENT, &self.name)?;
        outputs[0].set(WHOLE_EXTENT, whole.intersection(&self.voi));
        Ok(())
    }

    fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let input = input_data(&self.name, inputs)?;
        let update = outputs[0].update_extent().unwrap_or(input.extent());

        let out = output_data(&self.name, outputs)?;
        out.set_extent(update);
        out.set_origin(input.origin());
        out.set_spacing(input.spacing());
        // Nothing here is produced by this node.
        out.point_data_mut().set_active_scalars(None);
        out.cell_data_mut().set_active_scalars(None);

        match self.reconciler.reconcile(&self.name, input, out)? {
            ReconcileOutcome::Passed | ReconcileOutcome::Copied => Ok(()),
            ReconcileOutcome::Skipped(SkipReason::SingleArray) => {
                self.reconciler.copy_region(input, out)
            }
            ReconcileOutcome::Skipped(reason) => Err(PipelineError::node(
                &self.name,
                format!(
                    "cannot extract {} from input {} ({:?})",
                    update,
                    input.extent(),
                    reason
                ),
            )),
        }
    }
}
