//! Information objects: typed metadata attached to every pipeline port.
//!
//! An [`Information`] is an ordered key → value map over a small closed
//! registry of keys ([`KeyId`]). Each key is also a zero-sized marker type
//! implementing [`InformationKey`], which fixes the value type at compile
//! time:
//!
//! ```
//! use extent_pipeline::pipeline::information::{Information, keys::*};
//! use extent_pipeline::types::Extent;
//!
//! let mut info = Information::new();
//! info.set(WHOLE_EXTENT, Extent::new(0, 9, 0, 9, 0, 0));
//! assert_eq!(info.get(WHOLE_EXTENT), Some(&Extent::new(0, 9, 0, 9, 0, 0)));
//! assert!(!info.has(UPDATE_EXTENT));
//! ```
//!
//! A key that is absent is a distinct state from a key present with a
//! default value.

use crate::pipeline::data_object::DataHandle;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::types::{Extent, PieceRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed registry of metadata keys, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyId {
    WholeExtent,
    UpdateExtent,
    UpdatePieceNumber,
    UpdateNumberOfPieces,
    UpdateNumberOfGhostLevels,
    Origin,
    Spacing,
    DataObject,
    ContinueExecuting,
}

/// A stored value. The variant is fixed per key by [`InformationKey`].
#[derive(Debug, Clone)]
pub enum InfoValue {
    Extent(Extent),
    Int(i64),
    Vector([f64; 3]),
    Flag(bool),
    Data(DataHandle),
}

/// Typed access to one registry key.
pub trait InformationKey: Copy {
    const ID: KeyId;
    type Value;

    fn wrap(value: Self::Value) -> InfoValue;
    fn unwrap(value: &InfoValue) -> Option<&Self::Value>;
    fn unwrap_mut(value: &mut InfoValue) -> Option<&mut Self::Value>;
    fn into_inner(value: InfoValue) -> Option<Self::Value>;
}

macro_rules! information_key {
    ($(#[$meta:meta])* $name:ident, $konst:ident, $id:ident, $variant:ident, $ty:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        pub const $konst: $name = $name;

        impl InformationKey for $name {
            const ID: KeyId = KeyId::$id;
            type Value = $ty;

            fn wrap(value: $ty) -> InfoValue {
                InfoValue::$variant(value)
            }

            fn unwrap(value: &InfoValue) -> Option<&$ty> {
                match value {
                    InfoValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn unwrap_mut(value: &mut InfoValue) -> Option<&mut $ty> {
                match value {
                    InfoValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_inner(value: InfoValue) -> Option<$ty> {
                match value {
                    InfoValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

/// Marker types and constants for every registry key.
pub mod keys {
    use super::*;

    information_key!(
        /// Whole-domain extent a structured output can produce.
        WholeExtent, WHOLE_EXTENT, WholeExtent, Extent, Extent
    );
    information_key!(
        /// Extent requested from a structured output.
        UpdateExtent, UPDATE_EXTENT, UpdateExtent, Extent, Extent
    );
    information_key!(UpdatePieceNumber, UPDATE_PIECE_NUMBER, UpdatePieceNumber, Int, i64);
    information_key!(
        UpdateNumberOfPieces,
        UPDATE_NUMBER_OF_PIECES,
        UpdateNumberOfPieces,
        Int,
        i64
    );
    information_key!(
        UpdateNumberOfGhostLevels,
        UPDATE_NUMBER_OF_GHOST_LEVELS,
        UpdateNumberOfGhostLevels,
        Int,
        i64
    );
    information_key!(Origin, ORIGIN, Origin, Vector, [f64; 3]);
    information_key!(Spacing, SPACING, Spacing, Vector, [f64; 3]);
    information_key!(
        /// The data object produced on this port.
        DataObjectKey, DATA_OBJECT, DataObject, Data, DataHandle
    );
    information_key!(
        /// Set by a node during `request_data` to ask for another pass.
        ContinueExecuting, CONTINUE_EXECUTING, ContinueExecuting, Flag, bool
    );
}

use keys::*;

/// Ordered, typed metadata map for one port.
#[derive(Debug, Clone, Default)]
pub struct Information {
    entries: BTreeMap<KeyId, InfoValue>,
}

impl Information {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Present keys, in registry order.
    pub fn keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.entries.keys().copied()
    }

    pub fn has<K: InformationKey>(&self, _key: K) -> bool {
        self.entries.contains_key(&K::ID)
    }

    pub fn get<K: InformationKey>(&self, _key: K) -> Option<&K::Value> {
        self.entries.get(&K::ID).and_then(K::unwrap)
    }

    pub fn get_mut<K: InformationKey>(&mut self, _key: K) -> Option<&mut K::Value> {
        self.entries.get_mut(&K::ID).and_then(K::unwrap_mut)
    }

    pub fn set<K: InformationKey>(&mut self, _key: K, value: K::Value) {
        self.entries.insert(K::ID, K::wrap(value));
    }

    pub fn remove<K: InformationKey>(&mut self, _key: K) -> Option<K::Value> {
        self.entries.remove(&K::ID).and_then(K::into_inner)
    }

    /// Copy one entry from `from`, removing it here if `from` lacks it.
    pub fn copy_entry<K: InformationKey>(&mut self, from: &Information, _key: K) {
        match from.entries.get(&K::ID) {
            Some(value) => {
                self.entries.insert(K::ID, value.clone());
            }
            None => {
                self.entries.remove(&K::ID);
            }
        }
    }

    /// Like [`get`](Self::get), but a missing key is a `MissingMetadata` error
    /// attributed to `node`.
    pub fn require<K: InformationKey>(&self, key: K, node: &str) -> PipelineResult<&K::Value> {
        self.get(key)
            .ok_or_else(|| PipelineError::missing(node, K::ID))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // ── Convenience accessors ──

    pub fn whole_extent(&self) -> Option<Extent> {
        self.get(WHOLE_EXTENT).copied()
    }

    pub fn update_extent(&self) -> Option<Extent> {
        self.get(UPDATE_EXTENT).copied()
    }

    pub fn origin(&self) -> Option<[f64; 3]> {
        self.get(ORIGIN).copied()
    }

    pub fn spacing(&self) -> Option<[f64; 3]> {
        self.get(SPACING).copied()
    }

    /// The requested piece, if piece number and piece count are both present
    /// and non-negative. Ghost levels default to zero.
    pub fn piece_request(&self) -> Option<PieceRequest> {
        let piece = u32::try_from(*self.get(UPDATE_PIECE_NUMBER)?).ok()?;
        let pieces = u32::try_from(*self.get(UPDATE_NUMBER_OF_PIECES)?).ok()?;
        let ghost_levels = self
            .get(UPDATE_NUMBER_OF_GHOST_LEVELS)
            .and_then(|g| u32::try_from(*g).ok())
            .unwrap_or(0);
        Some(PieceRequest::new(piece, pieces, ghost_levels))
    }

    pub fn set_piece_request(&mut self, request: PieceRequest) {
        self.set(UPDATE_PIECE_NUMBER, i64::from(request.piece));
        self.set(UPDATE_NUMBER_OF_PIECES, i64::from(request.pieces));
        self.set(UPDATE_NUMBER_OF_GHOST_LEVELS, i64::from(request.ghost_levels));
    }

    pub fn data_object(&self) -> Option<&DataHandle> {
        self.get(DATA_OBJECT)
    }

    pub fn data_object_mut(&mut self) -> Option<&mut DataHandle> {
        self.get_mut(DATA_OBJECT)
    }

    pub fn continue_executing(&self) -> bool {
        self.get(CONTINUE_EXECUTING).copied().unwrap_or(false)
    }

    pub fn set_continue_executing(&mut self, value: bool) {
        self.set(CONTINUE_EXECUTING, value);
    }

    /// Copy the request keys (update extent and piece descriptor) from
    /// `other`, mirroring absence as well as presence.
    pub fn copy_request_from(&mut self, other: &Information) {
        self.copy_entry(other, UPDATE_EXTENT);
        self.copy_entry(other, UPDATE_PIECE_NUMBER);
        self.copy_entry(other, UPDATE_NUMBER_OF_PIECES);
        self.copy_entry(other, UPDATE_NUMBER_OF_GHOST_LEVELS);
    }
}
