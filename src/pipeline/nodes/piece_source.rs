//! PieceSource node: a point set split into pieces on request.
//!
//! Piece `p` of `n` covers points `[total * p / n, total * (p + 1) / n)`.
//! Each ghost level adds one point on either side, flagged in the `ghost`
//! array.

use crate::pipeline::data_object::DataArray;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::information::Information;
use crate::pipeline::mtime::TimeStamp;
use crate::pipeline::node::Algorithm;
use crate::pipeline::node_type::{bad_param, ParamValue};
use crate::pipeline::nodes::output_data;
use crate::pipeline::port::{DataKind, PortDescriptor};
use std::ops::Range;
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[PortDescriptor::output("out", DataKind::Pieces)];

pub const POINT_ID_ARRAY: &str = "point_id";
pub const GHOST_ARRAY: &str = "ghost";

pub struct PieceSourceNode {
    name: String,
    total_points: usize,
    mtime: TimeStamp,
}

impl PieceSourceNode {
    pub const DEFAULT_TOTAL_POINTS: usize = 1000;

    pub fn new(name: impl Into<String>, total_points: usize) -> Self {
        Self {
            name: name.into(),
            total_points,
            mtime: TimeStamp::new(),
        }
    }

    pub fn total_points(&self) -> usize {
        self.total_points
    }

    /// Points owned by `piece` of `pieces`, ghosts excluded. `None` when the
    /// bounds overflow.
    pub fn piece_range(total: usize, piece: u32, pieces: u32) -> Option<Range<usize>> {
        let (piece, pieces) = (piece as usize, pieces.max(1) as usize);
        let start = total.checked_mul(piece)? / pieces;
        let end = total.checked_mul(piece + 1)? / pieces;
        Some(start..end)
    }
}

impl Algorithm for PieceSourceNode {
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
            "total_points" => {
                let total = value
                    .as_int()
                    .and_then(|v| usize::try_from(v).ok())
                    .ok_or_else(|| bad_param(&self.name, key, "a non-negative integer"))?;
                self.total_points = total;
                self.mtime.modified();
                Ok(())
            }
            _ => Err(bad_param(&self.name, key, "a known parameter name")),
        }
    }

    fn request_data(
        &mut self,
        _inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let request = outputs[0].piece_request().unwrap_or_default();
        if request.pieces == 0 || request.piece >= request.pieces {
            return Err(PipelineError::node(
                &self.name,
                format!("piece {} of {} does not exist", request.piece, request.pieces),
            ));
        }

        let owned = Self::piece_range(self.total_points, request.piece, request.pieces)
            .ok_or_else(|| {
                PipelineError::AllocationFailure(format!(
                    "'{}': piece bounds of {} points overflow",
                    self.name, self.total_points
                ))
            })?;
        let ghosts = request.ghost_levels as usize;
        let start = owned.start.saturating_sub(ghosts);
        let end = owned.end.saturating_add(ghosts).min(self.total_points);

        let mut ids = DataArray::zeros(POINT_ID_ARRAY, 1, end - start)?;
        let mut flags = DataArray::zeros(GHOST_ARRAY, 1, end - start)?;
        for (n, i) in (start..end).enumerate() {
            ids.values_mut()[n] = i as f64;
            if !owned.contains(&i) {
                flags.values_mut()[n] = 1.0;
            }
        }

        let out = output_data(&self.name, outputs)?;
        out.initialize();
        out.set_piece(Some(request));
        out.point_data_mut()
            .set_scalars(Arc::new(ids));
        out.point_data_mut().insert(Arc::new(flags));

        tracing::debug!(
            "'{}' generated piece {}/{} ({} points, {} ghost levels)",
            self.name,
            request.piece,
            request.pieces,
            end - start,
            request.ghost_levels
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::data_object::DataObject;
    use crate::pipeline::information::keys::DATA_OBJECT;
    use crate::types::{ExtentType, PieceRequest};

    fn run(node: &mut PieceSourceNode, request: PieceRequest) -> PipelineResult<Vec<Information>> {
        let mut info = Information::new();
        info.set(DATA_OBJECT, Arc::new(DataObject::new(ExtentType::Pieces)));
        info.set_piece_request(request);
        let mut outputs = vec![info];
        node.request_data(&[], &mut outputs)?;
        Ok(outputs)
    }

    #[test]
    fn test_pieces_partition_points() {
        let covered: usize = (0..3)
            .map(|p| PieceSourceNode::piece_range(10, p, 3).unwrap().len())
            .sum();
        assert_eq!(covered, 10);
        assert_eq!(PieceSourceNode::piece_range(10, 0, 3), Some(0..3));
        assert_eq!(PieceSourceNode::piece_range(10, 2, 3), Some(6..10));
        assert_eq!(PieceSourceNode::piece_range(usize::MAX, 1, 2), None);
    }

    #[test]
    fn test_ghost_levels_add_flagged_points() {
        let mut node = PieceSourceNode::new("pieces", 100);
        let outputs = run(&mut node, PieceRequest::new(1, 4, 2)).unwrap();
        let data = outputs[0].data_object().unwrap();
        assert_eq!(data.piece(), Some(PieceRequest::new(1, 4, 2)));

        let ids = data.point_data().scalars().unwrap();
        assert_eq!(ids.num_tuples(), 29);
        assert_eq!(ids.values()[0], 23.0);

        let ghost = data.point_data().get(GHOST_ARRAY).unwrap();
        let flagged = ghost.values().iter().filter(|&&g| g == 1.0).count();
        assert_eq!(flagged, 4);
    }

    #[test]
    fn test_first_piece_ghosts_are_clamped() {
        let mut node = PieceSourceNode::new("pieces", 10);
        let outputs = run(&mut node, PieceRequest::new(0, 2, 3)).unwrap();
        let data = outputs[0].data_object().unwrap();
        assert_eq!(data.num_points(), 8);
    }

    #[test]
    fn test_huge_point_count_is_an_allocation_failure() {
        let mut node = PieceSourceNode::new("pieces", 10);
        node.set_parameter("total_points", &ParamValue::Int(1 << 61)).unwrap();
        let err = run(&mut node, PieceRequest::new(0, 1, 0)).unwrap_err();
        assert!(matches!(err, PipelineError::AllocationFailure(_)));

        node.set_parameter("total_points", &ParamValue::Int(i64::MAX)).unwrap();
        let err = run(&mut node, PieceRequest::new(1, 2, 0)).unwrap_err();
        assert!(matches!(err, PipelineError::AllocationFailure(_)));
    }

    #[test]
    fn test_invalid_piece_is_an_error() {
        let mut node = PieceSourceNode::new("pieces", 10);
        assert!(run(&mut node, PieceRequest::new(2, 2, 0)).is_err());
        assert!(run(&mut node, PieceRequest::new(0, 0, 0)).is_err());
    }
}
