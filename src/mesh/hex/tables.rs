use super::{HexOrder, TopologyError};
use smallvec::SmallVec;

/// Number of quadrilateral sides of a hexahedron
pub const N_SIDES: usize = 6;
/// Number of edges of a hexahedron
pub const N_EDGES: usize = 12;
/// Number of corner nodes of a hexahedron
pub const N_VERTICES: usize = 8;
/// Number of children produced by an isotropic h-refinement
pub const N_CHILDREN: usize = 8;
/// Largest supported node count (27-node triquadratic hexahedron)
pub const MAX_NODES: usize = 27;
/// Number of positions in the 5x5x5 refinement lattice spanning a parent and its 8 children
pub const LATTICE_SIZE: usize = 125;

/// Marks a node position without a counterpart in the opposite-node tables
const NO_OPPOSITE: u8 = 255;

/// Coordinates of each node in the `[-1, 1]^3` master element
///
/// ```text
///          7 ------ 18 ------ 6
///         /|                 /|
///       19 |      25       17 |
///       /  15              /  14          ζ
///      4 ------ 16 ------ 5   |           |  η
///      |   |     23      |    |           | /
///      |   3 ----|- 10 --|--- 2           |/
///      12 /  24  26   22 13  /            *---- ξ
///      | 11     21       |  9
///      |/       20       | /
///      0 ------- 8 ------ 1
/// ```
#[rustfmt::skip]
pub const MASTER_POINTS: [[f64; 3]; MAX_NODES] = [
    [-1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0],
    [ 1.0,  1.0, -1.0],
    [-1.0,  1.0, -1.0],
    [-1.0, -1.0,  1.0],
    [ 1.0, -1.0,  1.0],
    [ 1.0,  1.0,  1.0],
    [-1.0,  1.0,  1.0],
    [ 0.0, -1.0, -1.0],
    [ 1.0,  0.0, -1.0],
    [ 0.0,  1.0, -1.0],
    [-1.0,  0.0, -1.0],
    [-1.0, -1.0,  0.0],
    [ 1.0, -1.0,  0.0],
    [ 1.0,  1.0,  0.0],
    [-1.0,  1.0,  0.0],
    [ 0.0, -1.0,  1.0],
    [ 1.0,  0.0,  1.0],
    [ 0.0,  1.0,  1.0],
    [-1.0,  0.0,  1.0],
    [ 0.0,  0.0, -1.0],
    [ 0.0, -1.0,  0.0],
    [ 1.0,  0.0,  0.0],
    [ 0.0,  1.0,  0.0],
    [-1.0,  0.0,  0.0],
    [ 0.0,  0.0,  1.0],
    [ 0.0,  0.0,  0.0],
];

/// Local nodes on each side: 4 corners (counter-clockwise seen from outside), 4 edge nodes, 1 face node
#[rustfmt::skip]
pub const SIDE_NODES_MAP: [[usize; 9]; N_SIDES] = [
    [0, 3, 2, 1, 11, 10,  9,  8, 20],
    [0, 1, 5, 4,  8, 13, 16, 12, 21],
    [1, 2, 6, 5,  9, 14, 17, 13, 22],
    [2, 3, 7, 6, 10, 15, 18, 14, 23],
    [3, 0, 4, 7, 11, 12, 19, 15, 24],
    [4, 5, 6, 7, 16, 17, 18, 19, 25],
];

/// Local nodes on each edge: 2 corners followed by the midpoint node
#[rustfmt::skip]
pub const EDGE_NODES_MAP: [[usize; 3]; N_EDGES] = [
    [0, 1,  8],
    [1, 2,  9],
    [2, 3, 10],
    [0, 3, 11],
    [0, 4, 12],
    [1, 5, 13],
    [2, 6, 14],
    [3, 7, 15],
    [4, 5, 16],
    [5, 6, 17],
    [6, 7, 18],
    [4, 7, 19],
];

/// Opposite side of each side
pub const OPPOSITE_SIDES: [usize; N_SIDES] = [5, 3, 4, 1, 2, 0];

#[rustfmt::skip]
const SIDE05_NODES_MAP: [u8; 26] = [
    4, 5, 6, 7, 0, 1, 2, 3, 16, 17, 18, 19, 255, 255, 255, 255, 8, 9, 10, 11, 25, 255, 255, 255, 255, 20,
];
#[rustfmt::skip]
const SIDE13_NODES_MAP: [u8; 26] = [
    3, 2, 1, 0, 7, 6, 5, 4, 10, 255, 8, 255, 15, 14, 13, 12, 18, 255, 16, 255, 255, 23, 255, 21, 255, 255,
];
#[rustfmt::skip]
const SIDE24_NODES_MAP: [u8; 26] = [
    1, 0, 3, 2, 5, 4, 7, 6, 255, 11, 255, 9, 13, 12, 15, 14, 255, 19, 255, 17, 255, 255, 24, 255, 22, 255,
];

/// The child touched by each corner node (corner 2 touches child 3, corner 3 touches child 2, ...)
pub const NODE_CHILD_MAP: [usize; N_VERTICES] = [0, 1, 3, 2, 4, 5, 7, 6];

/// Corner pairs spanning the four space diagonals
pub const DIAGONALS: [[usize; 2]; 4] = [[0, 6], [3, 5], [1, 7], [2, 4]];

/// Pairs of parallel edges compared by the taper metric, two per face direction
#[rustfmt::skip]
pub const TAPER_EDGE_PAIRS: [[usize; 2]; 12] = [
    // front
    [0, 8], [4, 5],
    // right
    [5, 6], [1, 9],
    // back
    [10, 2], [6, 7],
    // left
    [4, 7], [3, 11],
    // bottom
    [0, 2], [3, 1],
    // top
    [8, 10], [9, 11],
];

/// (child, child-local node) at which each second order node (8..27) becomes a corner after refinement
#[rustfmt::skip]
const SECOND_ORDER_VERTEX_CHILD: [(usize, usize); MAX_NODES - N_VERTICES] = [
    // edges
    (0, 1), (1, 2), (3, 3), (0, 3), (0, 4), (1, 5), (3, 6), (2, 7), (4, 5), (5, 6), (7, 7), (4, 7),
    // faces
    (0, 2), (0, 5), (1, 6), (3, 7), (0, 7), (4, 6),
    // interior
    (0, 6),
];

/// Positions of each child's 27 nodes in the 5x5x5 lattice spanning the refined parent
///
/// Lattice index `i + 5j + 25k` sits at `(-1 + i/2, -1 + j/2, -1 + k/2)` in the parent's master element,
/// so positions shared by siblings (or coinciding with parent nodes) resolve to the same index.
#[rustfmt::skip]
pub const CHILD_NODE_LOOKUP: [[usize; MAX_NODES]; N_CHILDREN] = [
    // child 0 (near node 0)
    [  0,   2,  12,  10,   50,  52,  62,  60,    1,   7,  11,   5,   25,  27,  37,  35,
      51,  57,  61,  55,    6,   26,  32,  36,  30,   56,   31],
    // child 1 (near node 1)
    [  2,   4,  14,  12,   52,  54,  64,  62,    3,   9,  13,   7,   27,  29,  39,  37,
      53,  59,  63,  57,    8,   28,  34,  38,  32,   58,   33],
    // child 2 (near node 3)
    [ 10,  12,  22,  20,   60,  62,  72,  70,   11,  17,  21,  15,   35,  37,  47,  45,
      61,  67,  71,  65,   16,   36,  42,  46,  40,   66,   41],
    // child 3 (near node 2)
    [ 12,  14,  24,  22,   62,  64,  74,  72,   13,  19,  23,  17,   37,  39,  49,  47,
      63,  69,  73,  67,   18,   38,  44,  48,  42,   68,   43],
    // child 4 (near node 4)
    [ 50,  52,  62,  60,  100, 102, 112, 110,   51,  57,  61,  55,   75,  77,  87,  85,
     101, 107, 111, 105,   56,   76,  82,  86,  80,  106,   81],
    // child 5 (near node 5)
    [ 52,  54,  64,  62,  102, 104, 114, 112,   53,  59,  63,  57,   77,  79,  89,  87,
     103, 109, 113, 107,   58,   78,  84,  88,  82,  108,   83],
    // child 6 (near node 7)
    [ 60,  62,  72,  70,  110, 112, 122, 120,   61,  67,  71,  65,   85,  87,  97,  95,
     111, 117, 121, 115,   66,   86,  92,  96,  90,  116,   91],
    // child 7 (near node 6)
    [ 62,  64,  74,  72,  112, 114, 124, 122,   63,  69,  73,  67,   87,  89,  99,  97,
     113, 119, 123, 117,   68,   88,  94,  98,  92,  118,   93],
];

// ----------------------------------------------------------------------------------------------------
// Checked lookups
// ----------------------------------------------------------------------------------------------------

pub(crate) fn check_index(kind: &'static str, index: usize, bound: usize) -> Result<(), TopologyError> {
    if index < bound {
        Ok(())
    } else {
        Err(TopologyError::IndexOutOfRange { kind, index, bound })
    }
}

/// Local node indices on a side (4, 8 or 9 of them depending on the order)
///
/// Panics if `side` is not in `0..6`
pub fn side_nodes(side: usize, order: HexOrder) -> SmallVec<[usize; 9]> {
    assert!(side < N_SIDES, "Side {} does not exist on a Hex; cannot get its nodes!", side);
    SmallVec::from_slice(&SIDE_NODES_MAP[side][..order.n_side_nodes()])
}

/// [side_nodes] for an index that has not been validated
pub fn try_side_nodes(side: usize, order: HexOrder) -> Result<SmallVec<[usize; 9]>, TopologyError> {
    check_index("side", side, N_SIDES)?;
    Ok(side_nodes(side, order))
}

/// The two corner nodes of an edge
pub fn edge_nodes(edge: usize) -> [usize; 2] {
    assert!(edge < N_EDGES, "Edge {} does not exist on a Hex; cannot get its nodes!", edge);
    [EDGE_NODES_MAP[edge][0], EDGE_NODES_MAP[edge][1]]
}

/// [edge_nodes] for an index that has not been validated
pub fn try_edge_nodes(edge: usize) -> Result<[usize; 2], TopologyError> {
    check_index("edge", edge, N_EDGES)?;
    Ok(edge_nodes(edge))
}

/// Local node indices on an edge (2 or 3 of them depending on the order)
pub fn edge_nodes_of_order(edge: usize, order: HexOrder) -> SmallVec<[usize; 3]> {
    assert!(edge < N_EDGES, "Edge {} does not exist on a Hex; cannot get its nodes!", edge);
    SmallVec::from_slice(&EDGE_NODES_MAP[edge][..order.n_edge_nodes()])
}

pub fn opposite_side(side: usize) -> usize {
    assert!(side < N_SIDES, "Side {} does not exist on a Hex; cannot get its opposite!", side);
    OPPOSITE_SIDES[side]
}

pub fn try_opposite_side(side: usize) -> Result<usize, TopologyError> {
    check_index("side", side, N_SIDES)?;
    Ok(OPPOSITE_SIDES[side])
}

/// The node across the cell from `node`, through the pair of sides `{side, opposite_side(side)}`
///
/// `node` must lie on `side` or on its opposite. The tables are shared by both sides of a pair,
/// so `opposite_node(opposite_node(n, s)?, s)? == n`.
///
/// Panics if `node` or `side` are out of range for a 27-node Hex.
pub fn opposite_node(node: usize, side: usize) -> Result<usize, TopologyError> {
    assert!(node < MAX_NODES, "Node {} does not exist on a Hex; cannot get its opposite!", node);
    assert!(side < N_SIDES, "Side {} does not exist on a Hex; cannot get an opposite node!", side);

    if !is_node_on_side(node, side, HexOrder::Quadratic)
        && !is_node_on_side(node, OPPOSITE_SIDES[side], HexOrder::Quadratic)
    {
        return Err(TopologyError::InvalidArgument(format!(
            "Node {} is not on Side {} or its opposite; cannot get opposite node!",
            node, side
        )));
    }

    let table = match side {
        0 | 5 => &SIDE05_NODES_MAP,
        1 | 3 => &SIDE13_NODES_MAP,
        2 | 4 => &SIDE24_NODES_MAP,
        _ => unreachable!(),
    };

    match table[node] {
        NO_OPPOSITE => Err(TopologyError::InvalidArgument(format!(
            "Node {} has no opposite through Side {}",
            node, side
        ))),
        opposite => Ok(opposite as usize),
    }
}

pub fn is_node_on_side(node: usize, side: usize, order: HexOrder) -> bool {
    assert!(side < N_SIDES, "Side {} does not exist on a Hex!", side);
    SIDE_NODES_MAP[side][..order.n_side_nodes()].contains(&node)
}

pub fn is_node_on_edge(node: usize, edge: usize, order: HexOrder) -> bool {
    assert!(edge < N_EDGES, "Edge {} does not exist on a Hex!", edge);
    EDGE_NODES_MAP[edge][..order.n_edge_nodes()].contains(&node)
}

/// A child touches a side if the parent corner it owns lies on that side
pub fn is_child_on_side(child: usize, side: usize) -> bool {
    assert!(child < N_CHILDREN, "Child {} does not exist on a Hex!", child);
    assert!(side < N_SIDES, "Side {} does not exist on a Hex!", side);

    SIDE_NODES_MAP[side][..4]
        .iter()
        .any(|corner| NODE_CHILD_MAP[*corner] == child)
}

/// An edge lies on a side if both of its corners do
pub fn is_edge_on_side(edge: usize, side: usize) -> bool {
    let [n0, n1] = edge_nodes(edge);
    is_node_on_side(n0, side, HexOrder::Linear) && is_node_on_side(n1, side, HexOrder::Linear)
}

pub fn master_point(node: usize) -> [f64; 3] {
    assert!(node < MAX_NODES, "Node {} does not exist on a Hex!", node);
    MASTER_POINTS[node]
}

/// The local node sitting at a master element coordinate (components in `{-1, 0, 1}`)
pub fn node_at_master_point(point: [i8; 3]) -> Option<usize> {
    MASTER_POINTS.iter().position(|mp| {
        mp.iter()
            .zip(point.iter())
            .all(|(coord, cmp)| *coord == f64::from(*cmp))
    })
}

/// The two corners adjacent to an edge node (`8..20`)
pub fn second_order_adjacent_vertices(node: usize) -> [usize; 2] {
    assert!(
        (N_VERTICES..N_VERTICES + N_EDGES).contains(&node),
        "Node {} is not an edge node; cannot get adjacent vertices!",
        node
    );
    edge_nodes(node - N_VERTICES)
}

/// The (child, child-local corner) that a second order node (`8..27`) becomes after refinement
pub fn second_order_vertex_child(node: usize) -> (usize, usize) {
    assert!(
        (N_VERTICES..MAX_NODES).contains(&node),
        "Node {} is not a second order node; it has no vertex child!",
        node
    );
    SECOND_ORDER_VERTEX_CHILD[node - N_VERTICES]
}

pub fn child_node_lookup(child: usize) -> &'static [usize; MAX_NODES] {
    assert!(child < N_CHILDREN, "Child {} does not exist on a Hex!", child);
    &CHILD_NODE_LOOKUP[child]
}

pub fn try_child_node_lookup(child: usize) -> Result<&'static [usize; MAX_NODES], TopologyError> {
    check_index("child", child, N_CHILDREN)?;
    Ok(&CHILD_NODE_LOOKUP[child])
}

/// `[i, j, k]` lattice coordinates (each in `0..5`) of a lattice index
pub fn lattice_coords(index: usize) -> [usize; 3] {
    assert!(index < LATTICE_SIZE, "Lattice position {} does not exist!", index);
    [index % 5, (index / 5) % 5, index / 25]
}

pub fn lattice_index([i, j, k]: [usize; 3]) -> usize {
    assert!(i < 5 && j < 5 && k < 5, "Lattice coordinates must be in 0..5!");
    i + 5 * j + 25 * k
}

/// Location of a lattice position in the parent's master element
pub fn lattice_point(index: usize) -> [f64; 3] {
    lattice_coords(index).map(|c| -1.0 + c as f64 / 2.0)
}

/// The octant `[x, y, z]` (each 0 or 1) occupied by a child
pub fn child_octant(child: usize) -> [usize; 3] {
    assert!(child < N_CHILDREN, "Child {} does not exist on a Hex!", child);
    [child & 1, (child >> 1) & 1, (child >> 2) & 1]
}
