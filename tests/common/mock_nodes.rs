//! Instrumented plugin nodes

use extent_pipeline::pipeline::information::Information;
use extent_pipeline::pipeline::mtime::TimeStamp;
use extent_pipeline::pipeline::{
    Algorithm, AnyNode, DataKind, PipelineError, PipelineResult, PortDescriptor,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

static IMAGE_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", DataKind::Image),
    PortDescriptor::output("out", DataKind::Image),
];

static PIECE_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", DataKind::Pieces),
    PortDescriptor::output("out", DataKind::Pieces),
];

static BLEND_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("a", DataKind::Image),
    PortDescriptor::input("b", DataKind::Image),
    PortDescriptor::output("out", DataKind::Image),
];

static SPLIT_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", DataKind::Image),
    PortDescriptor::output("first", DataKind::Image),
    PortDescriptor::output("second", DataKind::Image),
];

/// Shared view of a [`PassNode`] after it moved into a pipeline.
#[derive(Clone, Default)]
pub struct RunTally {
    runs: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    /// 1-based run that fails once; 0 for none.
    fail_run: Arc<AtomicUsize>,
}

impl RunTally {
    /// `request_data` invocations so far, failed ones included.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Make every following `request_data` fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make only the `run`-th `request_data` (counting from 1) fail.
    pub fn fail_on_run(&self, run: usize) {
        self.fail_run.store(run, Ordering::SeqCst);
    }
}

/// Forwards its input unchanged, counting executions.
pub struct PassNode {
    name: String,
    ports: &'static [PortDescriptor],
    tally: RunTally,
    /// Passes per execution; more than one sets `CONTINUE_EXECUTING`.
    passes: usize,
    pass: usize,
    mtime: TimeStamp,
}

impl PassNode {
    fn with_ports(name: &str, ports: &'static [PortDescriptor]) -> (Self, RunTally) {
        let tally = RunTally::default();
        let node = Self {
            name: name.to_string(),
            ports,
            tally: tally.clone(),
            passes: 1,
            pass: 0,
            mtime: TimeStamp::new(),
        };
        (node, tally)
    }

    pub fn image(name: &str) -> (Self, RunTally) {
        Self::with_ports(name, IMAGE_PORTS)
    }

    pub fn pieces(name: &str) -> (Self, RunTally) {
        Self::with_ports(name, PIECE_PORTS)
    }

    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes.max(1);
        self
    }

    pub fn into_node(self) -> AnyNode {
        AnyNode::plugin(self)
    }
}

impl Algorithm for PassNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDescriptor] {
        self.ports
    }

    fn mtime(&self) -> u64 {
        self.mtime.get()
    }

    fn modified(&mut self) {
        self.mtime.modified();
    }

    fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let run = self.tally.runs.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tally.fail.load(Ordering::SeqCst)
            || run == self.tally.fail_run.load(Ordering::SeqCst)
        {
            return Err(PipelineError::node(&self.name, "failure requested by test"));
        }

        let input = inputs[0]
            .data_object()
            .ok_or_else(|| PipelineError::node(&self.name, "no input data"))?
            .clone();
        let output = outputs[0]
            .data_object_mut()
            .ok_or_else(|| PipelineError::node(&self.name, "no output data"))?;
        Arc::make_mut(output).alias_from(&input);

        self.pass += 1;
        if self.pass < self.passes {
            outputs[0].set_continue_executing(true);
        } else {
            self.pass = 0;
        }
        Ok(())
    }
}

/// Two image inputs, forwarding the first one.
pub struct BlendNode {
    name: String,
    mtime: TimeStamp,
}

impl BlendNode {
    pub fn new(name: &str) -> AnyNode {
        AnyNode::plugin(Self {
            name: name.to_string(),
            mtime: TimeStamp::new(),
        })
    }
}

impl Algorithm for BlendNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDescriptor] {
        BLEND_PORTS
    }

    fn mtime(&self) -> u64 {
        self.mtime.get()
    }

    fn modified(&mut self) {
        self.mtime.modified();
    }

    fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let first = inputs[0]
            .data_object()
            .ok_or_else(|| PipelineError::node(&self.name, "no data on input a"))?
            .clone();
        if inputs[1].data_object().is_none() {
            return Err(PipelineError::node(&self.name, "no data on input b"));
        }
        let output = outputs[0]
            .data_object_mut()
            .ok_or_else(|| PipelineError::node(&self.name, "no output data"))?;
        Arc::make_mut(output).alias_from(&first);
        Ok(())
    }
}

/// One image input forwarded to two outputs.
pub struct SplitNode {
    name: String,
    mtime: TimeStamp,
}

impl SplitNode {
    pub fn new(name: &str) -> AnyNode {
        AnyNode::plugin(Self {
            name: name.to_string(),
            mtime: TimeStamp::new(),
        })
    }
}

impl Algorithm for SplitNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDescriptor] {
        SPLIT_PORTS
    }

    fn mtime(&self) -> u64 {
        self.mtime.get()
    }

    fn modified(&mut self) {
        self.mtime.modified();
    }

    fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let input = inputs[0]
            .data_object()
            .ok_or_else(|| PipelineError::node(&self.name, "no input data"))?
            .clone();
        for info in outputs.iter_mut() {
            let output = info
                .data_object_mut()
                .ok_or_else(|| PipelineError::node(&self.name, "no output data"))?;
            Arc::make_mut(output).alias_from(&input);
        }
        Ok(())
    }
}
