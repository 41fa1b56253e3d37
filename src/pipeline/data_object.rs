//! Produced artifacts: structured regions and pieces with attribute arrays.
//!
//! A [`DataObject`] is shared through [`DataHandle`] (`Arc<DataObject>`)
//! between the node that produced it, downstream consumers and cache slots.
//! Its attribute arrays are themselves `Arc`-shared, so cloning a data object
//! is a shallow copy: the arrays are referenced, not duplicated. Producers
//! write through `Arc::make_mut`, which reallocates instead of mutating when
//! another holder still references the previous version.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::mtime::TimeStamp;
use crate::types::{Extent, ExtentType, PieceRequest};
use std::sync::Arc;

/// Shared handle to a produced data object.
pub type DataHandle = Arc<DataObject>;

/// Shared handle to an attribute array.
pub type ArrayHandle = Arc<DataArray>;

/// Allocate a zeroed buffer, reporting failure instead of aborting.
pub(crate) fn try_zeroed(len: usize, what: &str) -> PipelineResult<Vec<f64>> {
    let mut values = Vec::new();
    values.try_reserve_exact(len).map_err(|e| {
        PipelineError::AllocationFailure(format!("{} ({} values): {}", what, len, e))
    })?;
    values.resize(len, 0.0);
    Ok(values)
}

/// A named array of tuples, one tuple per point or cell.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    name: String,
    components: usize,
    values: Vec<f64>,
}

impl DataArray {
    /// Wrap existing values. `values.len()` must be a multiple of `components`.
    pub fn new(name: impl Into<String>, components: usize, values: Vec<f64>) -> Self {
        let components = components.max(1);
        debug_assert_eq!(values.len() % components, 0);
        Self {
            name: name.into(),
            components,
            values,
        }
    }

    /// A zero-filled array with `tuples` tuples.
    pub fn zeros(name: impl Into<String>, components: usize, tuples: usize) -> PipelineResult<Self> {
        let name = name.into();
        let components = components.max(1);
        let len = tuples.checked_mul(components).ok_or_else(|| {
            PipelineError::AllocationFailure(format!("array '{}' size overflows", name))
        })?;
        let values = try_zeroed(len, &name)?;
        Ok(Self {
            name,
            components,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn num_tuples(&self) -> usize {
        self.values.len() / self.components
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn tuple(&self, index: usize) -> &[f64] {
        let start = index * self.components;
        &self.values[start..start + self.components]
    }

    pub fn tuple_mut(&mut self, index: usize) -> &mut [f64] {
        let start = index * self.components;
        &mut self.values[start..start + self.components]
    }
}

/// Named attribute arrays for points or cells, with an optional active
/// scalar array.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    arrays: Vec<ArrayHandle>,
    active_scalars: Option<String>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArrayHandle> {
        self.arrays.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ArrayHandle> {
        self.arrays.iter().find(|a| a.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ArrayHandle> {
        self.arrays.iter_mut().find(|a| a.name() == name)
    }

    /// Insert an array, replacing any array with the same name.
    pub fn insert(&mut self, array: ArrayHandle) {
        match self.arrays.iter_mut().find(|a| a.name() == array.name()) {
            Some(slot) => *slot = array,
            None => self.arrays.push(array),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ArrayHandle> {
        let idx = self.arrays.iter().position(|a| a.name() == name)?;
        if self.active_scalars.as_deref() == Some(name) {
            self.active_scalars = None;
        }
        Some(self.arrays.remove(idx))
    }

    /// The active scalar array, if one is set and present.
    pub fn scalars(&self) -> Option<&ArrayHandle> {
        self.active_scalars.as_deref().and_then(|name| self.get(name))
    }

    pub fn scalars_name(&self) -> Option<&str> {
        self.active_scalars.as_deref()
    }

    /// Insert `array` and make it the active scalars.
    pub fn set_scalars(&mut self, array: ArrayHandle) {
        self.active_scalars = Some(array.name().to_string());
        self.insert(array);
    }

    pub fn set_active_scalars(&mut self, name: Option<&str>) {
        self.active_scalars = name.map(str::to_string);
    }

    /// Drop every array. The arrays themselves live on while other holders
    /// reference them.
    pub fn clear(&mut self) {
        self.arrays.clear();
        self.active_scalars = None;
    }

    /// Keep only the arrays for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&DataArray) -> bool) {
        self.arrays.retain(|a| keep(a));
        if let Some(active) = self.active_scalars.as_deref() {
            if !self.arrays.iter().any(|a| a.name() == active) {
                self.active_scalars = None;
            }
        }
    }

    /// Share every array of `other` into `self` (reference, not duplicate).
    pub fn pass_from(&mut self, other: &AttributeSet) {
        self.arrays = other.arrays.clone();
        self.active_scalars = other.active_scalars.clone();
    }
}

/// The concrete artifact a node produces on one output port.
#[derive(Debug, Clone)]
pub struct DataObject {
    extent_type: ExtentType,
    extent: Extent,
    piece: Option<PieceRequest>,
    origin: [f64; 3],
    spacing: [f64; 3],
    point_data: AttributeSet,
    cell_data: AttributeSet,
    mtime: TimeStamp,
    generated: bool,
}

impl DataObject {
    /// An empty, not yet generated data object.
    pub fn new(extent_type: ExtentType) -> Self {
        Self {
            extent_type,
            extent: Extent::EMPTY,
            piece: None,
            origin: [0.0; 3],
            spacing: [1.0; 3],
            point_data: AttributeSet::new(),
            cell_data: AttributeSet::new(),
            mtime: TimeStamp::default(),
            generated: false,
        }
    }

    /// An empty structured region with the given geometry.
    pub fn image(extent: Extent, origin: [f64; 3], spacing: [f64; 3]) -> Self {
        let mut data = Self::new(ExtentType::Structured);
        data.extent = extent;
        data.origin = origin;
        data.spacing = spacing;
        data
    }

    pub fn extent_type(&self) -> ExtentType {
        self.extent_type
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn set_extent(&mut self, extent: Extent) {
        self.extent = extent;
    }

    pub fn piece(&self) -> Option<PieceRequest> {
        self.piece
    }

    pub fn set_piece(&mut self, piece: Option<PieceRequest>) {
        self.piece = piece;
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn set_origin(&mut self, origin: [f64; 3]) {
        self.origin = origin;
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn set_spacing(&mut self, spacing: [f64; 3]) {
        self.spacing = spacing;
    }

    pub fn point_data(&self) -> &AttributeSet {
        &self.point_data
    }

    pub fn point_data_mut(&mut self) -> &mut AttributeSet {
        &mut self.point_data
    }

    pub fn cell_data(&self) -> &AttributeSet {
        &self.cell_data
    }

    pub fn cell_data_mut(&mut self) -> &mut AttributeSet {
        &mut self.cell_data
    }

    pub fn mtime(&self) -> u64 {
        self.mtime.get()
    }

    pub fn modified(&mut self) {
        self.mtime.modified();
    }

    /// Whether a node (or a cache hit) has produced content for this object.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Stamp the object as freshly produced.
    pub fn data_has_been_generated(&mut self) {
        self.generated = true;
        self.mtime.modified();
    }

    /// Release all content. The object must be produced again before use.
    pub fn initialize(&mut self) {
        self.extent = Extent::EMPTY;
        self.piece = None;
        self.point_data.clear();
        self.cell_data.clear();
        self.generated = false;
    }

    /// Number of points the attribute arrays must cover.
    pub fn num_points(&self) -> usize {
        match self.extent_type {
            ExtentType::Structured => self.extent.num_points(),
            ExtentType::Pieces => self
                .point_data
                .iter()
                .next()
                .map(|a| a.num_tuples())
                .unwrap_or(0),
        }
    }

    pub fn num_cells(&self) -> usize {
        match self.extent_type {
            ExtentType::Structured => self.extent.num_cells(),
            ExtentType::Pieces => self
                .cell_data
                .iter()
                .next()
                .map(|a| a.num_tuples())
                .unwrap_or(0),
        }
    }

    /// Allocate a zeroed point array sized to the current extent and make it
    /// the active scalars.
    pub fn allocate_scalars(&mut self, name: &str, components: usize) -> PipelineResult<&mut DataArray> {
        let tuples = self.extent.checked_num_points().ok_or_else(|| {
            PipelineError::AllocationFailure(format!("extent {} is too large", self.extent))
        })?;
        let array = DataArray::zeros(name, components, tuples)?;
        self.point_data.set_scalars(Arc::new(array));
        let handle = self
            .point_data
            .get_mut(name)
            .ok_or_else(|| PipelineError::AllocationFailure(format!("array '{}' vanished", name)))?;
        Ok(Arc::make_mut(handle))
    }

    /// Array lengths agree with the element counts of the extent.
    pub fn is_consistent(&self) -> bool {
        if self.extent_type != ExtentType::Structured {
            let n = self.num_points();
            return self.point_data.iter().all(|a| a.num_tuples() == n);
        }
        let points = self.extent.num_points();
        let cells = self.extent.num_cells();
        self.point_data.iter().all(|a| a.num_tuples() == points)
            && self.cell_data.iter().all(|a| a.num_tuples() == cells)
    }

    /// Alias `other`'s region and attribute arrays into `self` without
    /// duplicating array storage.
    pub fn alias_from(&mut self, other: &DataObject) {
        self.extent_type = other.extent_type;
        self.extent = other.extent;
        self.piece = other.piece;
        self.origin = other.origin;
        self.spacing = other.spacing;
        self.point_data.pass_from(&other.point_data);
        self.cell_data.pass_from(&other.cell_data);
    }
}
