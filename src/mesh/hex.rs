/// Constant combinatorial tables of the hexahedron: master points, side/edge node maps, opposite
/// sides and nodes, and the child-to-lattice lookup used by h-refinement
pub mod tables;

use super::node::{compute_key, Node};
use super::quad::{QuadFace, QuadOrder};
use super::quality::{self, ElemQuality, GenericQuality, HexQuality, QualityError, ShapeQuality};
#[cfg(feature = "json_export")]
use json::{object, JsonValue};
use nalgebra::{distance, Point3, Vector3};
use smallvec::SmallVec;
use tables::{N_CHILDREN, N_EDGES, N_SIDES, N_VERTICES};
use thiserror::Error;

/// Contract violations of topology queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("{kind} index {index} is out of range (expected less than {bound})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        bound: usize,
    },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("a {shape} cannot be built from {n_nodes} nodes")]
    NodeCount { shape: &'static str, n_nodes: usize },
}

/// Node count (and polynomial order) of a hexahedron
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HexOrder {
    /// 8 corner nodes
    Linear,
    /// corners and 12 edge midpoints (20 nodes)
    Serendipity,
    /// corners, edge midpoints, 6 face centers and an interior node (27 nodes)
    Quadratic,
}

impl HexOrder {
    pub fn from_n_nodes(n_nodes: usize) -> Option<Self> {
        match n_nodes {
            8 => Some(Self::Linear),
            20 => Some(Self::Serendipity),
            27 => Some(Self::Quadratic),
            _ => None,
        }
    }

    pub fn n_nodes(&self) -> usize {
        match self {
            Self::Linear => 8,
            Self::Serendipity => 20,
            Self::Quadratic => 27,
        }
    }

    pub fn n_side_nodes(&self) -> usize {
        match self {
            Self::Linear => 4,
            Self::Serendipity => 8,
            Self::Quadratic => 9,
        }
    }

    pub fn n_edge_nodes(&self) -> usize {
        match self {
            Self::Linear => 2,
            Self::Serendipity | Self::Quadratic => 3,
        }
    }

    /// Order of the quadrilateral faces
    pub fn side_order(&self) -> QuadOrder {
        match self {
            Self::Linear => QuadOrder::Quad4,
            Self::Serendipity => QuadOrder::Quad8,
            Self::Quadratic => QuadOrder::Quad9,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "HEX8",
            Self::Serendipity => "HEX20",
            Self::Quadratic => "HEX27",
        }
    }
}

/// A hexahedral cell bound to the `Node`s of its owning mesh
///
/// `HexCell`s borrow their `Node`s, so coordinates cannot change while a query is running.
/// Nothing is cached: every query reads the current node positions.
///
/// ## Layout
/// Local node, side and edge indices follow the master element in [tables::MASTER_POINTS]:
/// * Sides: 0 (ζ = -1), 1 (η = -1), 2 (ξ = 1), 3 (η = 1), 4 (ξ = -1), 5 (ζ = 1)
/// * Edges: 0-3 around the bottom, 4-7 vertical, 8-11 around the top
/// * Children: child `c` fills octant `(c & 1, c >> 1 & 1, c >> 2 & 1)` of the master element
#[derive(Debug, Clone)]
pub struct HexCell<'a> {
    pub id: usize,
    order: HexOrder,
    nodes: SmallVec<[&'a Node; 27]>,
}

impl<'a> HexCell<'a> {
    /// Bind a cell to 8, 20 or 27 nodes given in master element order
    pub fn new(id: usize, nodes: &[&'a Node]) -> Result<Self, TopologyError> {
        match HexOrder::from_n_nodes(nodes.len()) {
            Some(order) => Ok(Self {
                id,
                order,
                nodes: SmallVec::from_slice(nodes),
            }),
            None => Err(TopologyError::NodeCount {
                shape: "Hex",
                n_nodes: nodes.len(),
            }),
        }
    }

    /// Bind nodes whose count is already known to match `order`
    pub(crate) fn from_checked_parts(id: usize, order: HexOrder, nodes: SmallVec<[&'a Node; 27]>) -> Self {
        debug_assert_eq!(nodes.len(), order.n_nodes());
        Self { id, order, nodes }
    }

    pub fn order(&self) -> HexOrder {
        self.order
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_sides(&self) -> usize {
        N_SIDES
    }

    pub fn n_edges(&self) -> usize {
        N_EDGES
    }

    pub fn n_children(&self) -> usize {
        N_CHILDREN
    }

    pub fn node(&self, node: usize) -> &'a Node {
        assert!(
            node < self.nodes.len(),
            "Node {} does not exist on {} {}!",
            node,
            self.order.name(),
            self.id
        );
        self.nodes[node]
    }

    pub fn node_id(&self, node: usize) -> usize {
        self.node(node).id
    }

    pub fn node_ids(&self) -> SmallVec<[usize; 27]> {
        self.nodes.iter().map(|node| node.id).collect()
    }

    pub fn point(&self, node: usize) -> &'a Point3<f64> {
        &self.node(node).coords
    }

    pub fn contains_node_id(&self, id: usize) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    /// Distance between two local nodes
    pub fn length(&self, a: usize, b: usize) -> f64 {
        distance(self.point(a), self.point(b))
    }

    pub fn corner_points(&self) -> [Point3<f64>; 8] {
        [0, 1, 2, 3, 4, 5, 6, 7].map(|n| *self.point(n))
    }

    // ----------------------------------------------------------------------------------------------------
    // Topology
    // ----------------------------------------------------------------------------------------------------

    /// Order-independent key of the 4 corner nodes on a side
    ///
    /// Two cells sharing a face produce the same key regardless of their local numbering.
    pub fn key(&self, side: usize) -> u64 {
        compute_key(&self.side_corner_ids(side))
    }

    /// [Self::key] for a side index that has not been validated
    pub fn try_key(&self, side: usize) -> Result<u64, TopologyError> {
        tables::check_index("side", side, N_SIDES)?;
        Ok(self.key(side))
    }

    /// Order-independent key of the 2 corner nodes on an edge
    pub fn edge_key(&self, edge: usize) -> u64 {
        let [a, b] = tables::edge_nodes(edge);
        compute_key(&[self.node_id(a), self.node_id(b)])
    }

    /// Global ids of the 4 corners of a side, in side order
    pub fn side_corner_ids(&self, side: usize) -> [usize; 4] {
        assert!(side < N_SIDES, "Side {} does not exist on Hex {}!", side, self.id);
        [0, 1, 2, 3].map(|n| self.node_id(tables::SIDE_NODES_MAP[side][n]))
    }

    /// Local node indices on a side for this cell's order
    pub fn side_nodes(&self, side: usize) -> SmallVec<[usize; 9]> {
        tables::side_nodes(side, self.order)
    }

    /// Build a standalone face from the nodes of a side
    pub fn side_face(&self, side: usize) -> QuadFace<'a> {
        let nodes: SmallVec<[&'a Node; 9]> = self
            .side_nodes(side)
            .iter()
            .map(|n| self.nodes[*n])
            .collect();

        QuadFace::from_checked_parts(self.order.side_order(), nodes)
    }

    /// Local index of the node at position `side_node` on `side`
    pub fn which_node_am_i(&self, side: usize, side_node: usize) -> usize {
        assert!(side < N_SIDES, "Side {} does not exist on Hex {}!", side, self.id);
        assert!(
            side_node < self.order.n_side_nodes(),
            "Side node {} does not exist on a {} side!",
            side_node,
            self.order.name()
        );
        tables::SIDE_NODES_MAP[side][side_node]
    }

    pub fn is_node_on_side(&self, node: usize, side: usize) -> bool {
        tables::is_node_on_side(node, side, self.order)
    }

    pub fn is_node_on_edge(&self, node: usize, edge: usize) -> bool {
        tables::is_node_on_edge(node, edge, self.order)
    }

    pub fn is_child_on_side(&self, child: usize, side: usize) -> bool {
        tables::is_child_on_side(child, side)
    }

    pub fn is_edge_on_side(&self, edge: usize, side: usize) -> bool {
        tables::is_edge_on_side(edge, side)
    }

    pub fn opposite_side(&self, side: usize) -> usize {
        tables::opposite_side(side)
    }

    /// See [tables::opposite_node]; `node` must also exist on this cell
    pub fn opposite_node(&self, node: usize, side: usize) -> Result<usize, TopologyError> {
        if node >= self.nodes.len() {
            return Err(TopologyError::IndexOutOfRange {
                kind: "node",
                index: node,
                bound: self.nodes.len(),
            });
        }
        tables::opposite_node(node, side)
    }

    /// Sides (0 or more) of this cell containing a given global node
    pub fn sides_with_node_id(&self, id: usize) -> SmallVec<[usize; 3]> {
        (0..N_SIDES)
            .filter(|side| {
                self.side_nodes(*side)
                    .iter()
                    .any(|n| self.nodes[*n].id == id)
            })
            .collect()
    }

    // ----------------------------------------------------------------------------------------------------
    // Geometry
    // ----------------------------------------------------------------------------------------------------

    pub fn edge_length(&self, edge: usize) -> f64 {
        let [a, b] = tables::edge_nodes(edge);
        self.length(a, b)
    }

    /// Shortest distance between two corners
    pub fn hmin(&self) -> f64 {
        self.corner_distances().into_iter().fold(f64::INFINITY, f64::min)
    }

    /// Longest distance between two corners
    pub fn hmax(&self) -> f64 {
        self.corner_distances().into_iter().fold(0.0, f64::max)
    }

    /// Distances between each of the 28 pairs of corners
    fn corner_distances(&self) -> SmallVec<[f64; 28]> {
        (0..N_VERTICES)
            .flat_map(|a| ((a + 1)..N_VERTICES).map(move |b| (a, b)))
            .map(|(a, b)| self.length(a, b))
            .collect()
    }

    /// Average of the corner positions
    pub fn centroid(&self) -> Point3<f64> {
        let sum = (0..N_VERTICES).fold(Vector3::zeros(), |acc, n| acc + self.point(n).coords);
        Point3::from(sum / N_VERTICES as f64)
    }

    // ----------------------------------------------------------------------------------------------------
    // Quality
    // ----------------------------------------------------------------------------------------------------

    /// Compute a quality metric, falling back to [GenericQuality] for metrics without a Hex formula
    pub fn quality(&self, metric: ElemQuality) -> f64 {
        self.quality_with(metric, &GenericQuality)
    }

    pub fn quality_with(&self, metric: ElemQuality, fallback: &dyn ShapeQuality) -> f64 {
        HexQuality::new(fallback).quality(metric, &self.corner_points())
    }

    /// [Self::quality], reporting collapsed geometry as an error instead of a non-finite (or zero) value
    pub fn quality_checked(&self, metric: ElemQuality) -> Result<f64, QualityError> {
        let value = self.quality(metric);
        let collapsed = matches!(
            metric,
            ElemQuality::Diagonal | ElemQuality::Taper | ElemQuality::Stretch
        ) && value == 0.0;

        if !value.is_finite() || collapsed {
            Err(QualityError::DegenerateGeometry { metric, value })
        } else {
            Ok(value)
        }
    }

    pub fn quality_bounds(&self, metric: ElemQuality) -> (f64, f64) {
        quality::quality_bounds(metric)
    }

    /// Produce a Json Object that describes this cell
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        // keys exceed the range JSON numbers hold exactly
        let side_keys: Vec<String> = (0..N_SIDES)
            .map(|side| format!("{:016x}", self.key(side)))
            .collect();

        object! {
            "id": self.id,
            "type": self.order.name(),
            "nodes": JsonValue::from(self.node_ids().to_vec()),
            "side_keys": JsonValue::from(side_keys),
        }
    }
}
