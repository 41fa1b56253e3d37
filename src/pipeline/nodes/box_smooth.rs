//! BoxSmooth node: box-average of the active scalars with a stencil radius.
//!
//! Each output point averages the input points within `radius` along every
//! axis, clipped to the data the input holds. The node asks its input for the
//! output request grown by the radius, clipped to the input whole extent.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::information::keys::*;
use crate::pipeline::information::Information;
use crate::pipeline::mtime::TimeStamp;
use crate::pipeline::node::Algorithm;
use crate::pipeline::node_type::{bad_param, ParamValue};
use crate::pipeline::nodes::{drop_stale_attributes, input_data, output_data};
use crate::pipeline::port::{DataKind, PortDescriptor};
use crate::pipeline::reconcile::{AttributeReconciler, ReconcileOptions};
use crate::types::Extent;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", DataKind::Image),
    PortDescriptor::output("out", DataKind::Image),
];

pub struct BoxSmoothNode {
    name: String,
    radius: i64,
    reconciler: AttributeReconciler,
    mtime: TimeStamp,
}

impl BoxSmoothNode {
    pub fn new(name: impl Into<String>, radius: i64, options: ReconcileOptions) -> Self {
        Self {
            name: name.into(),
            radius: radius.max(0),
            reconciler: AttributeReconciler::new(options),
            mtime: TimeStamp::new(),
        }
    }

    pub fn radius(&self) -> i64 {
        self.radius
    }

    /// Input region needed to produce `output` from an input whose whole
    /// extent is `whole`.
    pub fn input_extent_for(&self, output: Extent, whole: Extent) -> Extent {
        if output.is_empty() {
            return Extent::EMPTY;
        }
        output.grow(self.radius).intersection(&whole)
    }
}

impl Algorithm for BoxSmoothNode {
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
            "radius" => {
                self.radius = value
                    .as_int()
                    .filter(|r| *r >= 0)
                    .ok_or_else(|| bad_param(&self.name, key, "a non-negative integer"))?;
            }
            "release_data" => {
                let release_data = value
                    .as_bool()
                    .ok_or_else(|| bad_param(&self.name, key, "a boolean"))?;
                self.reconciler = AttributeReconciler::new(ReconcileOptions { release_data });
            }
            _ => return Err(bad_param(&self.name, key, "a known parameter name")),
        }
        self.mtime.modified();
        Ok(())
    }

    fn request_update_extent(
        &mut self,
        inputs: &mut [Information],
        outputs: &[Information],
    ) -> PipelineResult<()> {
        let requested = *outputs[0].require(UPDATE_EXTENT, &self.name)?;
        let whole = *inputs[0].require(WHOLE_EXTENT, &self.name)?;
        let needed = self.input_extent_for(requested, whole);
        tracing::trace!("'{}' needs {} for {}", self.name, needed, requested);
        inputs[0].set(UPDATE_EXTENT, needed);
        Ok(())
    }

    fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let input = input_data(&self.name, inputs)?;
        let in_ext = input.extent();
        let in_scalars = input
            .point_data()
            .scalars()
            .ok_or_else(|| PipelineError::node(&self.name, "input has no active point scalars"))?;
        let update = outputs[0].update_extent().unwrap_or(in_ext);
        if !in_ext.contains(&update) {
            return Err(PipelineError::node(
                &self.name,
                format!("input {} does not cover requested {}", in_ext, update),
            ));
        }

        let components = in_scalars.components();
        let radius = self.radius;
        let out = output_data(&self.name, outputs)?;
        out.set_extent(update);
        out.set_origin(input.origin());
        out.set_spacing(input.spacing());
        // Only point scalars are produced here.
        out.cell_data_mut().set_active_scalars(None);

        let result = out.allocate_scalars(in_scalars.name(), components)?;
        let mut sum = vec![0.0; components];
        for (n, [i, j, k]) in update.indices().enumerate() {
            let stencil = Extent::new(i, i, j, j, k, k).grow(radius).intersection(&in_ext);
            sum.iter_mut().for_each(|s| *s = 0.0);
            let mut count = 0usize;
            for [si, sj, sk] in stencil.indices() {
                let Some(from) = in_ext.offset_of(si, sj, sk) else {
                    continue;
                };
                for (s, v) in sum.iter_mut().zip(in_scalars.tuple(from)) {
                    *s += v;
                }
                count += 1;
            }
            if count > 0 {
                for (dst, s) in result.tuple_mut(n).iter_mut().zip(&sum) {
                    *dst = s / count as f64;
                }
            }
        }

        let outcome = self.reconciler.reconcile(&self.name, input, out)?;
        drop_stale_attributes(out, outcome);
        Ok(())
    }
}
