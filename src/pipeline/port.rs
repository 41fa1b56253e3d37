//! Port descriptors for the node system.
//!
//! Each node declares its ports (inputs/outputs) via static `PortDescriptor` arrays.
//! The pipeline uses these to validate edge connections and port arity before
//! any request phase runs.

use crate::types::ExtentType;

/// The kind of data flowing through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Structured regions addressed by extents.
    Image,
    /// Piece-based (unstructured) data.
    Pieces,
    /// Accepts either kind. Only meaningful on input ports.
    Any,
}

impl DataKind {
    /// Whether an output of kind `produced` may feed an input of this kind.
    pub fn accepts(self, produced: DataKind) -> bool {
        matches!(
            (self, produced),
            (DataKind::Any, _) | (DataKind::Image, DataKind::Image) | (DataKind::Pieces, DataKind::Pieces)
        )
    }

    /// Extent type of data objects created for an output of this kind.
    pub fn extent_type(self) -> ExtentType {
        match self {
            DataKind::Pieces => ExtentType::Pieces,
            DataKind::Image | DataKind::Any => ExtentType::Structured,
        }
    }
}

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Static descriptor for a node's port.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
    pub kind: DataKind,
}

impl PortDescriptor {
    pub const fn input(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            kind,
        }
    }

    pub const fn output(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
            kind,
        }
    }
}

/// Ports of one direction, in declaration order.
pub fn ports_in(ports: &[PortDescriptor], direction: PortDirection) -> impl Iterator<Item = &PortDescriptor> {
    ports.iter().filter(move |p| p.direction == direction)
}

pub fn input_count(ports: &[PortDescriptor]) -> usize {
    ports_in(ports, PortDirection::Input).count()
}

pub fn output_count(ports: &[PortDescriptor]) -> usize {
    ports_in(ports, PortDirection::Output).count()
}
