use super::hex::TopologyError;
use super::node::{compute_key, Node};
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

/// Node count of a quadrilateral face
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuadOrder {
    /// 4 corners
    Quad4,
    /// 4 corners and 4 edge midpoints
    Quad8,
    /// 4 corners, 4 edge midpoints and a center node
    Quad9,
}

impl QuadOrder {
    pub fn from_n_nodes(n_nodes: usize) -> Option<Self> {
        match n_nodes {
            4 => Some(Self::Quad4),
            8 => Some(Self::Quad8),
            9 => Some(Self::Quad9),
            _ => None,
        }
    }

    pub fn n_nodes(&self) -> usize {
        match self {
            Self::Quad4 => 4,
            Self::Quad8 => 8,
            Self::Quad9 => 9,
        }
    }
}

/// A standalone quadrilateral cell, usually the side of a [`HexCell`](super::hex::HexCell)
///
/// The face references (does not copy) the `Node`s it is built from.
///
/// ## Layout
/// ```text
///     3 ---- 6 ---- 2
///     |             |
///     7      8      5
///     |             |
///     0 ---- 4 ---- 1
/// ```
#[derive(Debug, Clone)]
pub struct QuadFace<'a> {
    order: QuadOrder,
    nodes: SmallVec<[&'a Node; 9]>,
}

impl<'a> QuadFace<'a> {
    /// Build a face from 4, 8 or 9 nodes given in the layout order
    pub fn new(nodes: &[&'a Node]) -> Result<Self, TopologyError> {
        match QuadOrder::from_n_nodes(nodes.len()) {
            Some(order) => Ok(Self {
                order,
                nodes: SmallVec::from_slice(nodes),
            }),
            None => Err(TopologyError::NodeCount {
                shape: "Quad",
                n_nodes: nodes.len(),
            }),
        }
    }

    /// Build a face whose node count is already known to match `order`
    pub(crate) fn from_checked_parts(order: QuadOrder, nodes: SmallVec<[&'a Node; 9]>) -> Self {
        debug_assert_eq!(nodes.len(), order.n_nodes());
        Self { order, nodes }
    }

    pub fn order(&self) -> QuadOrder {
        self.order
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, node: usize) -> &'a Node {
        assert!(node < self.nodes.len(), "Node {} does not exist on this Quad!", node);
        self.nodes[node]
    }

    pub fn node_id(&self, node: usize) -> usize {
        self.node(node).id
    }

    pub fn point(&self, node: usize) -> &'a Point3<f64> {
        &self.node(node).coords
    }

    /// Global ids of the 4 corner nodes
    pub fn corner_ids(&self) -> [usize; 4] {
        [0, 1, 2, 3].map(|n| self.nodes[n].id)
    }

    /// Order-independent key of the corner nodes; matches [`HexCell::key`](super::hex::HexCell::key) of the side it came from
    pub fn key(&self) -> u64 {
        compute_key(&self.corner_ids())
    }

    pub fn centroid(&self) -> Point3<f64> {
        let sum = (0..4).fold(Vector3::zeros(), |acc, n| acc + self.point(n).coords);
        Point3::from(sum / 4.0)
    }

    /// Area of the two (0, 1, 2) and (0, 2, 3) triangles spanned by the corners
    pub fn area(&self) -> f64 {
        let [p0, p1, p2, p3] = [0, 1, 2, 3].map(|n| self.point(n));
        let first = (p1 - p0).cross(&(p2 - p0)).norm() / 2.0;
        let second = (p2 - p0).cross(&(p3 - p0)).norm() / 2.0;
        first + second
    }

    /// Unit normal following the right-hand rule over the corner ordering
    ///
    /// `None` on a degenerate face
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let [p0, p1, p2, p3] = [0, 1, 2, 3].map(|n| self.point(n));
        (p2 - p0).cross(&(p3 - p1)).try_normalize(f64::EPSILON)
    }
}
