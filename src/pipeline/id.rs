//! Handles for nodes, output ports and edges of a pipeline.
//!
//! Node ids are positions in the pipeline's node table and stay valid for the
//! pipeline's lifetime; nodes are never removed.

use std::fmt;

/// Position of a node in `Pipeline::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An output port of a node: the producing end of every edge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId {
    node: NodeId,
    port: u16,
}

impl PortId {
    pub fn new(node: NodeId, port: u16) -> Self {
        Self { node, port }
    }

    #[inline]
    pub fn node(self) -> NodeId {
        self.node
    }

    #[inline]
    pub fn port_index(self) -> u16 {
        self.port
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

/// Identifier of a pipeline edge, allocated in connection order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}
