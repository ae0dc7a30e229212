/// A stored hexahedral cell and its place in the refinement tree
pub mod elem;
/// Structures and Functions to facilitate isotropic h-refinement of hexahedra
pub mod h_refinement;
/// The hexahedron: combinatorial tables and the [HexCell](hex::HexCell) topology facade
pub mod hex;
/// A Point in Real Space
pub mod node;
/// A quadrilateral face of a hexahedron
pub mod quad;
/// Cell quality metrics
pub mod quality;
/// Lagrange shape functions over the master hexahedron
pub mod shape_fns;

use elem::Elem;
use h_refinement::{lattice_node_key, parent_node_at, HRefError, NodeKey};
use hex::{
    tables::{self, N_CHILDREN, N_EDGES, N_SIDES, N_VERTICES},
    HexCell, HexOrder, TopologyError,
};
use node::Node;
use quality::{tabulated_bounds, ElemQuality, GenericQuality, ShapeQuality};
use shape_fns::map_reference_point;

use crate::factory::{shape_quality_factory, FactoryError};

#[cfg(feature = "json_export")]
use json::{object, JsonValue};
use nalgebra::Point3;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
#[cfg(feature = "json_export")]
use std::fs::File;
#[cfg(feature = "json_export")]
use std::io::BufWriter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Minimum Edge length in real space. h-Refinements will fail when they would produce edges shorter than this value.
pub const MIN_EDGE_LENGTH: f64 = 3.0518e-5; // 15ish refinement layers with unit sized cells

/// The expected "h-Refinement" depth. This determines the stack allocation size of some `SmallVec`s related to h-Refinement
pub const EXPECTED_NUM_H_REFINEMENTS: usize = 8;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Elem {0} does not exist!")]
    ElemDoesntExist(usize),
    #[error("Node {0} does not exist!")]
    NodeDoesntExist(usize),
    #[error("Node {node} is listed more than once by a single Elem!")]
    DuplicateNode { node: usize },
    #[error("every Elem in a Mesh must have the same order (expected {expected:?}, found {found:?})")]
    MixedOrder { expected: HexOrder, found: HexOrder },
    #[error("the face with corners {0:?} is shared by more than two active Elems")]
    NonManifoldFace([usize; 4]),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Summary of one quality metric over every active [Elem] of a [HexMesh]
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub metric: ElemQuality,
    /// Acceptable range of the metric; `(-1.0, -1.0)` where none is known
    pub bounds: (f64, f64),
    pub n_elems: usize,
    /// Extremes and mean over the finite values (`NaN` if there are none)
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Ids of Elems whose (finite) value lies outside `bounds`
    pub out_of_bounds: Vec<usize>,
    /// Ids of Elems whose value is `NaN` or infinite
    pub non_finite: Vec<usize>,
}

impl QualityReport {
    fn from_values(metric: ElemQuality, values: &[(usize, f64)]) -> Self {
        let tabulated = tabulated_bounds(metric);
        let bounds = tabulated.unwrap_or((-1.0, -1.0));

        let (non_finite, finite): (Vec<(usize, f64)>, Vec<(usize, f64)>) =
            values.iter().partition(|(_, value)| !value.is_finite());

        let out_of_bounds = if tabulated.is_some() {
            finite
                .iter()
                .filter(|(_, value)| *value < bounds.0 || *value > bounds.1)
                .map(|(id, _)| *id)
                .collect()
        } else {
            Vec::new()
        };

        let (min, max, mean) = if finite.is_empty() {
            (f64::NAN, f64::NAN, f64::NAN)
        } else {
            let sum: f64 = finite.iter().map(|(_, value)| value).sum();
            (
                finite.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min),
                finite.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max),
                sum / finite.len() as f64,
            )
        };

        Self {
            metric,
            bounds,
            n_elems: values.len(),
            min,
            max,
            mean,
            out_of_bounds,
            non_finite: non_finite.iter().map(|(id, _)| *id).collect(),
        }
    }

    /// Every active Elem produced a finite value inside the metric's bounds
    pub fn all_acceptable(&self) -> bool {
        self.out_of_bounds.is_empty() && self.non_finite.is_empty()
    }
}

/// A conforming collection of hexahedral `Elem`s sharing a single set of `Node`s
///
/// All `Elem`s have the same [HexOrder] (set by the first `Elem` added). h-Refinement splits an `Elem`
/// into 8 children; nodes at shared lattice positions are created once and reused by every `Elem` that
/// touches them.
#[derive(Clone)]
pub struct HexMesh {
    pub nodes: Vec<Node>,
    pub elems: Vec<Elem>,
    neighbors: Vec<[Option<usize>; N_SIDES]>,
    neighbors_current: bool,
    node_keys: BTreeMap<NodeKey, usize>,
    fallback_quality: Arc<dyn ShapeQuality + Send + Sync>,
}

impl fmt::Debug for HexMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HexMesh")
            .field("nodes", &self.nodes)
            .field("elems", &self.elems)
            .field("neighbors", &self.neighbors)
            .field("neighbors_current", &self.neighbors_current)
            .finish_non_exhaustive()
    }
}

impl Default for HexMesh {
    fn default() -> Self {
        Self::blank()
    }
}

impl HexMesh {
    /// Construct a completely empty Mesh
    pub fn blank() -> Self {
        Self {
            nodes: Vec::new(),
            elems: Vec::new(),
            neighbors: Vec::new(),
            neighbors_current: true,
            node_keys: BTreeMap::new(),
            fallback_quality: Arc::new(GenericQuality),
        }
    }

    /// Write the Mesh (Nodes, Elems and neighbor relationships) to a JSON file
    #[cfg(feature = "json_export")]
    pub fn export_to_json(&self, path: impl AsRef<str>) -> std::io::Result<()> {
        let f = File::create(path.as_ref())?;
        let mut w = BufWriter::new(&f);
        self.to_json().write_pretty(&mut w, 4)?;
        Ok(())
    }

    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "Nodes": JsonValue::from(self.nodes.iter().map(|node| node.to_json()).collect::<Vec<_>>()),
            "Elems": JsonValue::from(self.elems.iter().map(|elem| elem.to_json()).collect::<Vec<_>>()),
            "Neighbors": JsonValue::from(
                self.neighbors
                    .iter()
                    .map(|sides| JsonValue::from(sides.to_vec()))
                    .collect::<Vec<_>>()
            ),
        }
    }

    // ----------------------------------------------------------------------------------------------------
    // Construction
    // ----------------------------------------------------------------------------------------------------

    /// Add a Node and return its id
    pub fn add_node(&mut self, coords: Point3<f64>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, coords));
        id
    }

    /// Add a base-layer Elem from 8, 20 or 27 node ids (in master element order) and return its id
    ///
    /// Neighbor information is invalidated until [Self::find_neighbors] runs again.
    pub fn add_elem(&mut self, node_ids: &[usize]) -> Result<usize, MeshError> {
        let order = HexOrder::from_n_nodes(node_ids.len()).ok_or(TopologyError::NodeCount {
            shape: "Hex",
            n_nodes: node_ids.len(),
        })?;

        if let Some(first) = self.elems.first() {
            if first.order != order {
                return Err(MeshError::MixedOrder {
                    expected: first.order,
                    found: order,
                });
            }
        }

        if let Some(missing) = node_ids.iter().find(|id| **id >= self.nodes.len()) {
            return Err(MeshError::NodeDoesntExist(*missing));
        }

        if let Some(dup) = first_duplicate(node_ids) {
            return Err(MeshError::DuplicateNode { node: dup });
        }

        let id = self.elems.len();
        self.elems.push(Elem::new(id, node_ids, order));
        self.neighbors.push([None; N_SIDES]);
        self.neighbors_current = false;

        Ok(id)
    }

    /// Replace the [ShapeQuality] used for metrics without a hexahedron-specific formula
    ///
    /// `name` is looked up in the [shape_quality_factory]
    pub fn set_fallback_quality(&mut self, name: &str) -> Result<(), MeshError> {
        self.fallback_quality = Arc::from(shape_quality_factory().build(name)?);
        Ok(())
    }

    // ----------------------------------------------------------------------------------------------------
    // Retrieval
    // ----------------------------------------------------------------------------------------------------

    /// Bind an Elem to the Mesh's Nodes for topology and geometry queries
    pub fn hex_cell(&self, elem_id: usize) -> Result<HexCell<'_>, MeshError> {
        let elem = self
            .elems
            .get(elem_id)
            .ok_or(MeshError::ElemDoesntExist(elem_id))?;
        Ok(self.bind(elem))
    }

    fn bind<'a>(&'a self, elem: &Elem) -> HexCell<'a> {
        let nodes: SmallVec<[&'a Node; 27]> = elem.nodes.iter().map(|id| &self.nodes[*id]).collect();
        HexCell::from_checked_parts(elem.id, elem.order, nodes)
    }

    /// Ids of the Elems without children
    pub fn active_elems(&self) -> impl Iterator<Item = usize> + '_ {
        self.elems
            .iter()
            .filter(|elem| !elem.has_children())
            .map(|elem| elem.id)
    }

    /// Order shared by every Elem; `None` for an empty Mesh
    pub fn order(&self) -> Option<HexOrder> {
        self.elems.first().map(|elem| elem.order)
    }

    /// Get the real-space points of an [Elem]'s nodes
    pub fn elem_points(&self, elem_id: usize) -> SmallVec<[Point3<f64>; 27]> {
        self.elems[elem_id]
            .nodes
            .iter()
            .map(|id| self.nodes[*id].coords)
            .collect()
    }

    /// Get a list of an [`Elem`]s descendant's IDs
    pub fn descendant_elems(&self, elem_id: usize, include_starting_elem: bool) -> Result<Vec<usize>, MeshError> {
        if elem_id >= self.elems.len() {
            Err(MeshError::ElemDoesntExist(elem_id))
        } else {
            let mut descendants = Vec::new();
            self.rec_descendant_elems(elem_id, include_starting_elem, &mut descendants);
            Ok(descendants)
        }
    }

    fn rec_descendant_elems(&self, elem_id: usize, include: bool, desc: &mut Vec<usize>) {
        if include {
            desc.push(elem_id);
        }
        if let Some(child_elem_ids) = self.elems[elem_id].child_ids() {
            for cei in child_elem_ids {
                self.rec_descendant_elems(cei, true, desc);
            }
        }
    }

    /// Get a list of an [`Elem`]s ancestor's IDs, nearest first
    pub fn ancestor_elems(&self, elem_id: usize, include_starting_elem: bool) -> Result<Vec<usize>, MeshError> {
        let elem = self
            .elems
            .get(elem_id)
            .ok_or(MeshError::ElemDoesntExist(elem_id))?;

        let mut ancestors = Vec::with_capacity(elem.level() + 1);
        if include_starting_elem {
            ancestors.push(elem_id);
        }
        ancestors.extend(elem.ancestors().iter().rev());
        Ok(ancestors)
    }

    // ----------------------------------------------------------------------------------------------------
    // Neighbors
    // ----------------------------------------------------------------------------------------------------

    /// Match the sides of all active Elems that share a face
    ///
    /// Faces are bucketed by their [HexCell::key], then compared by corner ids so that a key
    /// collision can never link two unrelated Elems.
    pub fn find_neighbors(&mut self) -> Result<(), MeshError> {
        let mut faces: BTreeMap<u64, SmallVec<[([usize; 4], usize, usize); 2]>> = BTreeMap::new();

        for elem_id in self.active_elems() {
            let cell = self.bind(&self.elems[elem_id]);
            for side in 0..N_SIDES {
                let mut corners = cell.side_corner_ids(side);
                corners.sort_unstable();
                faces
                    .entry(cell.key(side))
                    .or_default()
                    .push((corners, elem_id, side));
            }
        }

        let mut neighbors = vec![[None; N_SIDES]; self.elems.len()];
        let mut num_shared = 0;

        for bucket in faces.values() {
            for (i, (corners, elem_id, side)) in bucket.iter().enumerate() {
                let matching: SmallVec<[(usize, usize); 2]> = bucket
                    .iter()
                    .enumerate()
                    .filter(|(j, (other_corners, _, _))| *j != i && other_corners == corners)
                    .map(|(_, (_, other_id, other_side))| (*other_id, *other_side))
                    .collect();

                match matching.len() {
                    0 => {}
                    1 => {
                        neighbors[*elem_id][*side] = Some(matching[0].0);
                        num_shared += 1;
                    }
                    _ => return Err(MeshError::NonManifoldFace(*corners)),
                }
            }
        }

        debug!(
            "found {} shared faces among {} active Elems",
            num_shared / 2,
            self.active_elems().count()
        );

        self.neighbors = neighbors;
        self.neighbors_current = true;
        Ok(())
    }

    /// Neighboring Elem across each side of an active Elem
    ///
    /// Returns `None` if neighbor information is stale (call [Self::find_neighbors] after adding or refining Elems)
    pub fn neighbors(&self, elem_id: usize) -> Option<[Option<usize>; N_SIDES]> {
        assert!(
            elem_id < self.elems.len(),
            "Elem {} doesn't exist; Cannot retrieve neighbors!",
            elem_id
        );

        if self.neighbors_current {
            Some(self.neighbors[elem_id])
        } else {
            None
        }
    }

    /// `(elem_id, side)` pairs of active Elem sides that have no neighbor
    ///
    /// Returns `None` if neighbor information is stale
    pub fn boundary_sides(&self) -> Option<Vec<(usize, usize)>> {
        if !self.neighbors_current {
            return None;
        }

        Some(
            self.active_elems()
                .flat_map(|elem_id| {
                    (0..N_SIDES)
                        .filter(move |side| self.neighbors[elem_id][*side].is_none())
                        .map(move |side| (elem_id, side))
                })
                .collect(),
        )
    }

    // ----------------------------------------------------------------------------------------------------
    // h-refinement methods
    // ----------------------------------------------------------------------------------------------------

    /// Determine if this Elem can be h-refined
    /// * returns false if the Elem already has children
    /// * returns false if its children would have edges shorter than [MIN_EDGE_LENGTH]
    /// * returns an `Err` if the Mesh doesn't have `elem_id`
    pub fn elem_is_h_refineable(&self, elem_id: usize) -> Result<bool, HRefError> {
        let elem = self
            .elems
            .get(elem_id)
            .ok_or(HRefError::ElemDoesntExist(elem_id))?;

        Ok(!elem.has_children() && self.children_are_long_enough(elem))
    }

    fn children_are_long_enough(&self, elem: &Elem) -> bool {
        let cell = self.bind(elem);
        (0..N_EDGES).all(|edge| cell.edge_length(edge) / 2.0 > MIN_EDGE_LENGTH)
    }

    /// h-refine all active Elems that can be refined
    pub fn global_h_refinement(&mut self) -> Result<(), HRefError> {
        let refineable: Vec<usize> = self
            .elems
            .iter()
            .filter(|elem| !elem.has_children() && self.children_are_long_enough(elem))
            .map(|elem| elem.id)
            .collect();

        self.execute_h_refinements(refineable)
    }

    /// h-refine a list of Elems
    pub fn h_refine_elems(&mut self, elems: Vec<usize>) -> Result<(), HRefError> {
        self.execute_h_refinements(elems)
    }

    /// h-refine [Elem]s according to an external filter function
    pub fn h_refine_with_filter<F>(&mut self, filt: F) -> Result<(), HRefError>
    where
        F: Fn(&Elem) -> bool,
    {
        let selected: Vec<usize> = self
            .elems
            .iter()
            .filter(|elem| !elem.has_children() && filt(elem))
            .map(|elem| elem.id)
            .collect();

        self.execute_h_refinements(selected)
    }

    /// Split each listed Elem into 8 children
    ///
    /// The request is validated as a whole before any Elem is refined. Neighbor information is
    /// invalidated afterwards.
    pub fn execute_h_refinements(&mut self, elem_ids: Vec<usize>) -> Result<(), HRefError> {
        let mut requested: BTreeSet<usize> = BTreeSet::new();
        for elem_id in elem_ids {
            if elem_id >= self.elems.len() {
                return Err(HRefError::ElemDoesntExist(elem_id));
            }
            if !requested.insert(elem_id) {
                return Err(HRefError::DoubleRefinement(elem_id));
            }
            if self.elems[elem_id].has_children() {
                return Err(HRefError::ElemHasChildren(elem_id));
            }
            if !self.children_are_long_enough(&self.elems[elem_id]) {
                return Err(HRefError::MinEdgeLength(elem_id));
            }
        }

        if requested.is_empty() {
            return Ok(());
        }

        let num_nodes_before = self.nodes.len();
        let num_elems_before = self.elems.len();

        for elem_id in requested {
            let child_nodes = self.child_node_ids(elem_id);
            let first_child_id = self.elems.len();
            let children = self.elems[elem_id].h_refine(child_nodes, first_child_id)?;

            self.neighbors
                .extend(std::iter::repeat([None; N_SIDES]).take(children.len()));
            self.elems.extend(children);
        }

        self.neighbors_current = false;

        debug!(
            "h-refinement added {} Elems and {} Nodes",
            self.elems.len() - num_elems_before,
            self.nodes.len() - num_nodes_before
        );

        Ok(())
    }

    /// Global node ids of each child of an Elem (in child order), creating any Nodes that don't exist yet
    fn child_node_ids(&mut self, elem_id: usize) -> Vec<SmallVec<[usize; 27]>> {
        let order = self.elems[elem_id].order;
        let parent_nodes = self.elems[elem_id].nodes.clone();
        let parent_points = self.elem_points(elem_id);

        let mut corner_ids = [0; N_VERTICES];
        corner_ids.copy_from_slice(&parent_nodes[0..N_VERTICES]);

        let mut lattice_nodes: BTreeMap<usize, usize> = BTreeMap::new();
        let mut child_nodes = Vec::with_capacity(N_CHILDREN);

        for child in 0..N_CHILDREN {
            let mut nodes = SmallVec::new();
            for lattice in tables::child_node_lookup(child).iter().take(order.n_nodes()) {
                let node_id = match lattice_nodes.get(lattice) {
                    Some(id) => *id,
                    None => {
                        let id = self.lattice_node(*lattice, order, &corner_ids, &parent_nodes, &parent_points);
                        lattice_nodes.insert(*lattice, id);
                        id
                    }
                };
                nodes.push(node_id);
            }
            child_nodes.push(nodes);
        }

        child_nodes
    }

    /// Global id of the node at a lattice position of a parent Elem
    ///
    /// Reuses the parent's own node, or a node another Elem already created at the same position.
    fn lattice_node(
        &mut self,
        lattice: usize,
        order: HexOrder,
        corner_ids: &[usize; N_VERTICES],
        parent_nodes: &[usize],
        parent_points: &[Point3<f64>],
    ) -> usize {
        let key = lattice_node_key(corner_ids, lattice);

        if let Some(local) = parent_node_at(lattice, order) {
            let id = parent_nodes[local];
            self.node_keys.entry(key).or_insert(id);
            return id;
        }

        if let Some(id) = self.node_keys.get(&key) {
            return *id;
        }

        let coords = map_reference_point(order, parent_points, tables::lattice_point(lattice));
        let id = self.add_node(coords);
        self.node_keys.insert(key, id);
        id
    }

    // ----------------------------------------------------------------------------------------------------
    // Quality
    // ----------------------------------------------------------------------------------------------------

    /// Evaluate a quality metric on every active Elem (in parallel)
    pub fn quality_scan(&self, metric: ElemQuality) -> QualityReport {
        let fallback: &(dyn ShapeQuality + Send + Sync) = self.fallback_quality.as_ref();

        let values: Vec<(usize, f64)> = self
            .elems
            .par_iter()
            .filter(|elem| !elem.has_children())
            .map(|elem| (elem.id, self.bind(elem).quality_with(metric, fallback)))
            .collect();

        let report = QualityReport::from_values(metric, &values);
        if !report.all_acceptable() {
            warn!(
                "{} of {} Elems have unacceptable {} values",
                report.out_of_bounds.len() + report.non_finite.len(),
                report.n_elems,
                metric
            );
        }

        report
    }
}

fn first_duplicate(values: &[usize]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .find(|(i, val)| values[i + 1..].contains(*val))
        .map(|(_, val)| *val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex::tables::MASTER_POINTS;

    /// Two unit cubes side by side in x; the second is numbered from a different corner
    fn two_cubes() -> HexMesh {
        let mut mesh = HexMesh::blank();
        for [x, y, z] in [
            [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0],
            [2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [2.0, 0.0, 1.0], [2.0, 1.0, 1.0],
        ] {
            mesh.add_node(Point3::new(x, y, z));
        }
        mesh.add_elem(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        mesh.add_elem(&[8, 9, 2, 1, 10, 11, 6, 5]).unwrap();
        mesh.find_neighbors().unwrap();
        mesh
    }

    fn single_hex(order: HexOrder) -> HexMesh {
        let mut mesh = HexMesh::blank();
        let ids: Vec<usize> = MASTER_POINTS
            .iter()
            .take(order.n_nodes())
            .map(|p| mesh.add_node(Point3::from(*p)))
            .collect();
        mesh.add_elem(&ids).unwrap();
        mesh.find_neighbors().unwrap();
        mesh
    }

    #[test]
    fn two_cube_neighbors() {
        let mesh = two_cubes();
        assert_eq!(mesh.nodes.len(), 12);
        assert_eq!(mesh.elems.len(), 2);
        assert_eq!(mesh.order(), Some(HexOrder::Linear));

        // the first cube's side 2 (ξ = 1) is the second cube's side 3 (η = 1)
        let first = mesh.neighbors(0).unwrap();
        assert_eq!(first, [None, None, Some(1), None, None, None]);
        let second = mesh.neighbors(1).unwrap();
        assert_eq!(second, [None, None, None, Some(0), None, None]);
        assert_eq!(mesh.boundary_sides().unwrap().len(), 10);
    }

    #[test]
    fn add_elem_contracts() {
        let mut mesh = single_hex(HexOrder::Linear);
        assert!(matches!(
            mesh.add_elem(&[0, 1, 2, 3]),
            Err(MeshError::Topology(TopologyError::NodeCount { n_nodes: 4, .. }))
        ));
        assert!(matches!(
            mesh.add_elem(&[0, 1, 2, 3, 4, 5, 6, 99]),
            Err(MeshError::NodeDoesntExist(99))
        ));
        let twenty: Vec<usize> = (0..20).collect();
        assert!(matches!(
            mesh.add_elem(&twenty),
            Err(MeshError::MixedOrder {
                expected: HexOrder::Linear,
                found: HexOrder::Serendipity
            })
        ));

        assert!(matches!(
            mesh.add_elem(&[0, 0, 1, 2, 3, 4, 5, 6]),
            Err(MeshError::DuplicateNode { node: 0 })
        ));

        let mut quadratic = single_hex(HexOrder::Quadratic);
        assert!(matches!(
            quadratic.add_elem(&[0, 1, 2, 3, 4, 5, 6, 7]),
            Err(MeshError::MixedOrder {
                expected: HexOrder::Quadratic,
                found: HexOrder::Linear
            })
        ));
    }

    #[test]
    fn neighbors_go_stale() {
        let mut mesh = two_cubes();
        mesh.h_refine_elems(vec![0]).unwrap();
        assert!(mesh.neighbors(0).is_none());
        assert!(mesh.boundary_sides().is_none());
        mesh.find_neighbors().unwrap();
        assert!(mesh.neighbors(0).is_some());
    }

    #[test]
    fn basic_h_refinements() {
        for order in [HexOrder::Linear, HexOrder::Serendipity, HexOrder::Quadratic] {
            let mut mesh = single_hex(order);
            mesh.h_refine_elems(vec![0]).unwrap();

            assert_eq!(mesh.elems.len(), 9);
            assert_eq!(mesh.elems[0].child_ids(), Some([1, 2, 3, 4, 5, 6, 7, 8]));

            let expected_nodes = match order {
                // 3x3x3 lattice
                HexOrder::Linear => 27,
                // lattice corners and edge midpoints of the 2x2x2 child grid
                HexOrder::Serendipity => 27 + 54,
                // full 5x5x5 lattice
                HexOrder::Quadratic => 125,
            };
            assert_eq!(mesh.nodes.len(), expected_nodes);

            // children tile the parent's volume: each child is a cube with edge length 1
            for child in 1..9 {
                let cell = mesh.hex_cell(child).unwrap();
                for edge in 0..N_EDGES {
                    assert!((cell.edge_length(edge) - 1.0).abs() < 1e-14);
                }
            }

            mesh.find_neighbors().unwrap();
            // every child touches 3 siblings
            for child in 1..9 {
                let shared = mesh.neighbors(child).unwrap().iter().filter(|n| n.is_some()).count();
                assert_eq!(shared, 3);
            }
        }
    }

    #[test]
    fn child_positions_follow_octants() {
        let mut mesh = single_hex(HexOrder::Linear);
        mesh.h_refine_elems(vec![0]).unwrap();

        for child in 0..N_CHILDREN {
            let centroid = mesh.hex_cell(child + 1).unwrap().centroid();
            let octant = tables::child_octant(child);
            for d in 0..3 {
                let expected = if octant[d] == 0 { -0.5 } else { 0.5 };
                assert!((centroid[d] - expected).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn refinement_is_conforming() {
        let mut mesh = two_cubes();
        mesh.global_h_refinement().unwrap();
        mesh.find_neighbors().unwrap();

        // 2 * 8 children on a 5x3x3 lattice of nodes
        assert_eq!(mesh.active_elems().count(), 16);
        assert_eq!(mesh.nodes.len(), 45);
        // 4 children of each parent touch the shared face
        let shared_faces = mesh
            .active_elems()
            .filter(|id| mesh.neighbors(*id).unwrap().iter().filter(|n| n.is_some()).count() == 4)
            .count();
        assert_eq!(shared_faces, 8);
        // the outer surface is 2 x 1 x 1 with 4 quarter faces per unit square
        assert_eq!(mesh.boundary_sides().unwrap().len(), 10 * 4);
    }

    #[test]
    fn refine_one_then_neighbor() {
        let mut mesh = two_cubes();
        mesh.h_refine_elems(vec![1]).unwrap();
        let nodes_after_first = mesh.nodes.len();
        mesh.h_refine_elems(vec![0]).unwrap();

        // the shared face's 5 new nodes are reused rather than duplicated
        assert_eq!(nodes_after_first, 12 + 19);
        assert_eq!(mesh.nodes.len(), 45);
    }

    #[test]
    fn mixed_level_refinement_shares_nodes() {
        for order in [HexOrder::Linear, HexOrder::Serendipity, HexOrder::Quadratic] {
            // two unit cubes side by side in x, with nodes shared by position
            let mut mesh = HexMesh::blank();
            let mut half_units: BTreeMap<[i64; 3], usize> = BTreeMap::new();
            for cube in 0..2 {
                let ids: Vec<usize> = MASTER_POINTS
                    .iter()
                    .take(order.n_nodes())
                    .map(|p| {
                        let position = [p[0] as i64 + 2 * cube + 1, p[1] as i64 + 1, p[2] as i64 + 1];
                        *half_units.entry(position).or_insert_with(|| {
                            mesh.add_node(Point3::from(position.map(|c| c as f64 / 2.0)))
                        })
                    })
                    .collect();
                mesh.add_elem(&ids).unwrap();
            }

            // grandchildren of the first cube exist before the second cube is refined
            mesh.h_refine_elems(vec![0]).unwrap();
            let first_children = mesh.elems[0].child_ids().unwrap();
            mesh.h_refine_elems(vec![first_children[0], first_children[6]]).unwrap();
            mesh.h_refine_elems(vec![1]).unwrap();
            let second_children = mesh.elems[1].child_ids().unwrap();
            mesh.h_refine_elems(vec![second_children[0], second_children[6]]).unwrap();

            let positions: BTreeSet<[i64; 3]> = mesh
                .nodes
                .iter()
                .map(|node| [node.coords.x, node.coords.y, node.coords.z].map(|c| (c * 64.0).round() as i64))
                .collect();
            assert_eq!(positions.len(), mesh.nodes.len(), "duplicated nodes in a {} mesh", order.name());
        }
    }

    #[test]
    fn tree_traversal() {
        let mut mesh = single_hex(HexOrder::Linear);
        mesh.h_refine_elems(vec![0]).unwrap();
        mesh.h_refine_elems(vec![3]).unwrap();

        assert_eq!(mesh.elems[10].level(), 2);
        assert_eq!(mesh.ancestor_elems(10, true).unwrap(), vec![10, 3, 0]);
        assert_eq!(mesh.ancestor_elems(10, false).unwrap(), vec![3, 0]);

        let descendants = mesh.descendant_elems(0, false).unwrap();
        assert_eq!(descendants.len(), 16);
        assert!(descendants.contains(&16));
        assert!(mesh.descendant_elems(17, true).is_err());
    }

    #[test]
    fn h_refine_with_filter() {
        let mut mesh = two_cubes();
        mesh.h_refine_with_filter(|elem| elem.nodes.contains(&0)).unwrap();
        assert!(mesh.elems[0].has_children());
        assert!(!mesh.elems[1].has_children());
    }

    #[test]
    fn h_refine_non_existent() {
        let mut mesh = single_hex(HexOrder::Linear);
        assert_eq!(mesh.h_refine_elems(vec![0, 1]), Err(HRefError::ElemDoesntExist(1)));
        // nothing was refined
        assert_eq!(mesh.elems.len(), 1);
    }

    #[test]
    fn h_refine_elem_with_children() {
        let mut mesh = single_hex(HexOrder::Linear);
        mesh.h_refine_elems(vec![0]).unwrap();
        assert_eq!(mesh.h_refine_elems(vec![0]), Err(HRefError::ElemHasChildren(0)));
        assert_eq!(mesh.elem_is_h_refineable(0), Ok(false));
    }

    #[test]
    fn double_h_refinement() {
        let mut mesh = two_cubes();
        assert_eq!(
            mesh.execute_h_refinements(vec![0, 1, 0]),
            Err(HRefError::DoubleRefinement(0))
        );
    }

    #[test]
    #[should_panic]
    fn minimum_edge_length_exceeded() {
        let mut mesh = single_hex(HexOrder::Linear);

        // repeatedly refine the cell at the master element's first corner
        for _ in 0..18 {
            mesh.h_refine_with_filter(|elem| elem.nodes[0] == 0).unwrap()
        }
    }

    #[test]
    fn quality_scan_of_cubes() {
        let mut mesh = two_cubes();
        mesh.global_h_refinement().unwrap();

        let report = mesh.quality_scan(ElemQuality::Diagonal);
        assert_eq!(report.n_elems, 16);
        assert!((report.min - 1.0).abs() < 1e-14);
        assert!((report.mean - 1.0).abs() < 1e-14);
        assert!(report.all_acceptable());

        let report = mesh.quality_scan(ElemQuality::EdgeLengthRatio);
        assert!((report.max - 1.0).abs() < 1e-14);
        // no tabulated range, so nothing is out of bounds
        assert_eq!(report.bounds, (-1.0, -1.0));
        assert!(report.out_of_bounds.is_empty());
    }

    #[test]
    fn quality_scan_flags_collapsed_elems() {
        let mut mesh = two_cubes();
        // flatten the second cube into the x = 1 plane
        for id in [8, 9, 10, 11] {
            mesh.nodes[id].coords.x = 1.0;
        }

        let report = mesh.quality_scan(ElemQuality::Stretch);
        assert_eq!(report.out_of_bounds, vec![1]);

        mesh.set_fallback_quality("strict").unwrap();
        let report = mesh.quality_scan(ElemQuality::Warp);
        assert_eq!(report.non_finite, vec![0, 1]);
        assert!(report.min.is_nan());

        assert!(matches!(
            mesh.set_fallback_quality("lenient"),
            Err(MeshError::Factory(FactoryError::UnknownType { .. }))
        ));
    }

    #[test]
    #[cfg(feature = "json_export")]
    fn mesh_to_json() {
        let mut mesh = two_cubes();
        mesh.h_refine_elems(vec![0]).unwrap();
        mesh.find_neighbors().unwrap();

        let mesh_json = mesh.to_json();
        assert_eq!(mesh_json["Elems"].len(), 10);
        assert_eq!(mesh_json["Nodes"].len(), mesh.nodes.len());
        assert_eq!(mesh_json["Elems"][0]["children"].len(), 8);
        assert_eq!(mesh_json["Elems"][3]["parent"], 0);
        // child 1 sits across ξ = 0 from child 0
        assert_eq!(mesh_json["Neighbors"][3][4], 2);
        assert!(mesh_json["Neighbors"][0][0].is_null());
    }
}
