//! Value types shared by the pipeline, the configuration layer and the CLI.
//!
//! # Main Types
//!
//! - [`Extent`] - inclusive six-integer index box over a structured grid
//! - [`PieceRequest`] - piece/ghost descriptor used for unstructured data
//! - [`ExtentType`] - how a data object describes the region it covers
//! - [`UpdateRequest`] - what a consumer asks an output port to produce

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive structured region `[x_lo, x_hi, y_lo, y_hi, z_lo, z_hi]`.
///
/// An extent is empty when any axis has `lo > hi`. Points are laid out with
/// the x index varying fastest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extent(pub [i64; 6]);

impl Extent {
    /// Canonical empty extent.
    pub const EMPTY: Extent = Extent([0, -1, 0, -1, 0, -1]);

    pub const fn new(x_lo: i64, x_hi: i64, y_lo: i64, y_hi: i64, z_lo: i64, z_hi: i64) -> Self {
        Self([x_lo, x_hi, y_lo, y_hi, z_lo, z_hi])
    }

    /// Extent starting at the origin with the given number of points per axis.
    pub fn from_dimensions(dims: [usize; 3]) -> Self {
        Self([
            0,
            dims[0] as i64 - 1,
            0,
            dims[1] as i64 - 1,
            0,
            dims[2] as i64 - 1,
        ])
    }

    #[inline]
    pub fn lo(&self, axis: usize) -> i64 {
        self.0[axis * 2]
    }

    #[inline]
    pub fn hi(&self, axis: usize) -> i64 {
        self.0[axis * 2 + 1]
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.lo(axis) > self.hi(axis))
    }

    /// True if `other` lies entirely inside `self`. The empty extent is
    /// contained in everything.
    pub fn contains(&self, other: &Extent) -> bool {
        if other.is_empty() {
            return true;
        }
        (0..3).all(|axis| other.lo(axis) >= self.lo(axis) && other.hi(axis) <= self.hi(axis))
    }

    /// Componentwise overlap, normalised to [`Extent::EMPTY`] when disjoint.
    pub fn intersection(&self, other: &Extent) -> Extent {
        let mut out = [0i64; 6];
        for axis in 0..3 {
            out[axis * 2] = self.lo(axis).max(other.lo(axis));
            out[axis * 2 + 1] = self.hi(axis).min(other.hi(axis));
        }
        let ext = Extent(out);
        if ext.is_empty() {
            Extent::EMPTY
        } else {
            ext
        }
    }

    /// Smallest extent containing both. An empty side is ignored.
    pub fn union(&self, other: &Extent) -> Extent {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let mut out = [0i64; 6];
        for axis in 0..3 {
            out[axis * 2] = self.lo(axis).min(other.lo(axis));
            out[axis * 2 + 1] = self.hi(axis).max(other.hi(axis));
        }
        Extent(out)
    }

    /// Grow every non-empty axis by `radius` points on both sides, saturating
    /// at the `i64` range.
    pub fn grow(&self, radius: i64) -> Extent {
        if self.is_empty() {
            return *self;
        }
        let mut out = self.0;
        for axis in 0..3 {
            out[axis * 2] = out[axis * 2].saturating_sub(radius);
            out[axis * 2 + 1] = out[axis * 2 + 1].saturating_add(radius);
        }
        Extent(out)
    }

    /// Number of points along each axis (all zero when empty).
    pub fn dimensions(&self) -> [usize; 3] {
        if self.is_empty() {
            return [0; 3];
        }
        [
            (self.hi(0) - self.lo(0) + 1) as usize,
            (self.hi(1) - self.lo(1) + 1) as usize,
            (self.hi(2) - self.lo(2) + 1) as usize,
        ]
    }

    /// Point count, or `None` if it does not fit in `usize`.
    pub fn checked_num_points(&self) -> Option<usize> {
        let [nx, ny, nz] = self.dimensions();
        nx.checked_mul(ny)?.checked_mul(nz)
    }

    pub fn num_points(&self) -> usize {
        self.checked_num_points().unwrap_or(usize::MAX)
    }

    /// The extent of cells spanned by this point extent.
    ///
    /// Cell extents are one less than point extents on every axis with
    /// nonzero length; collapsed axes keep their single index.
    pub fn cell_extent(&self) -> Extent {
        if self.is_empty() {
            return Extent::EMPTY;
        }
        let mut out = self.0;
        for axis in 0..3 {
            if out[axis * 2] < out[axis * 2 + 1] {
                out[axis * 2 + 1] -= 1;
            }
        }
        Extent(out)
    }

    pub fn num_cells(&self) -> usize {
        self.cell_extent().num_points()
    }

    /// Linear offset of `(i, j, k)` within this extent, x fastest.
    pub fn offset_of(&self, i: i64, j: i64, k: i64) -> Option<usize> {
        if i < self.lo(0) || i > self.hi(0) || j < self.lo(1) || j > self.hi(1) {
            return None;
        }
        if k < self.lo(2) || k > self.hi(2) {
            return None;
        }
        let [nx, ny, _] = self.dimensions();
        let (di, dj, dk) = (
            (i - self.lo(0)) as usize,
            (j - self.lo(1)) as usize,
            (k - self.lo(2)) as usize,
        );
        Some(di + nx * (dj + ny * dk))
    }

    /// Iterate over every `(i, j, k)` index in the extent, x fastest.
    pub fn indices(&self) -> impl Iterator<Item = [i64; 3]> + '_ {
        let empty = self.is_empty();
        let ext = *self;
        (ext.lo(2)..=ext.hi(2))
            .flat_map(move |k| (ext.lo(1)..=ext.hi(1)).map(move |j| (j, k)))
            .flat_map(move |(j, k)| (ext.lo(0)..=ext.hi(0)).map(move |i| [i, j, k]))
            .filter(move |_| !empty)
    }
}

impl Default for Extent {
    fn default() -> Self {
        Extent::EMPTY
    }
}

impl fmt::Debug for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.0;
        write!(
            f,
            "[{},{}]x[{},{}]x[{},{}]",
            e[0], e[1], e[2], e[3], e[4], e[5]
        )
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<[i64; 6]> for Extent {
    fn from(value: [i64; 6]) -> Self {
        Extent(value)
    }
}

/// Piece/ghost descriptor for piece-based (unstructured) data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceRequest {
    pub piece: u32,
    pub pieces: u32,
    #[serde(default)]
    pub ghost_levels: u32,
}

impl PieceRequest {
    pub const fn new(piece: u32, pieces: u32, ghost_levels: u32) -> Self {
        Self {
            piece,
            pieces,
            ghost_levels,
        }
    }
}

impl Default for PieceRequest {
    fn default() -> Self {
        Self::new(0, 1, 0)
    }
}

/// How a data object describes the region it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtentType {
    /// Structured grid addressed by a 3D [`Extent`].
    Structured,
    /// Unstructured data addressed by a [`PieceRequest`].
    Pieces,
}

/// What a consumer asks an output port to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRequest {
    /// Everything the port advertises as its whole extent.
    WholeExtent,
    /// A structured sub-region.
    Extent(Extent),
    /// A piece of piece-based data.
    Piece(PieceRequest),
}

impl From<Extent> for UpdateRequest {
    fn from(value: Extent) -> Self {
        UpdateRequest::Extent(value)
    }
}

impl From<PieceRequest> for UpdateRequest {
    fn from(value: PieceRequest) -> Self {
        UpdateRequest::Piece(value)
    }
}
