use super::hex::{
    tables::{self, N_VERTICES},
    HexOrder,
};
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HRefError {
    #[error("Elem {0} does not exist; cannot h-Refine!")]
    ElemDoesntExist(usize),
    #[error("Elem {0} already has children; cannot h-Refine again!")]
    ElemHasChildren(usize),
    #[error("Elem {0} was requested for h-Refinement more than once!")]
    DoubleRefinement(usize),
    #[error("h-Refinement of Elem {0} would produce edges shorter than the minimum edge length!")]
    MinEdgeLength(usize),
}

/// Identifies a refinement lattice position independently of which parent produced it
///
/// A lattice point is a fixed trilinear combination of its parent's corners. The key holds each
/// contributing corner's global id with its weight (in 64ths), sorted by id, so neighboring parents that
/// share a face (or edge) generate identical keys for the nodes they share.
pub type NodeKey = SmallVec<[(usize, u8); 8]>;

/// Compute the [NodeKey] of a lattice position from the global ids of the parent's 8 corners
pub fn lattice_node_key(corner_ids: &[usize; N_VERTICES], lattice: usize) -> NodeKey {
    let ijk = tables::lattice_coords(lattice);

    let mut key: NodeKey = corner_ids
        .iter()
        .enumerate()
        .filter_map(|(corner, id)| {
            let master = tables::master_point(corner);
            let weight: usize = (0..3)
                .map(|d| if master[d] < 0.0 { 4 - ijk[d] } else { ijk[d] })
                .product();
            if weight == 0 {
                None
            } else {
                Some((*id, weight as u8))
            }
        })
        .collect();

    key.sort_unstable();
    key
}

/// The parent's local node sitting at a lattice position, if the parent has one there
pub fn parent_node_at(lattice: usize, order: HexOrder) -> Option<usize> {
    let ijk = tables::lattice_coords(lattice);
    if ijk.iter().any(|c| c % 2 != 0) {
        return None;
    }

    tables::node_at_master_point(ijk.map(|c| c as i8 / 2 - 1)).filter(|node| *node < order.n_nodes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::hex::tables::{child_node_lookup, lattice_index};

    #[test]
    fn corner_keys() {
        let corners = [10, 11, 12, 13, 14, 15, 16, 17];
        assert_eq!(lattice_node_key(&corners, 0).as_slice(), &[(10, 64)]);
        assert_eq!(lattice_node_key(&corners, 124).as_slice(), &[(16, 64)]);
        // midpoint of edge 0
        assert_eq!(lattice_node_key(&corners, 2).as_slice(), &[(10, 32), (11, 32)]);
    }

    #[test]
    fn weights_sum_to_one() {
        let corners = [7, 3, 9, 1, 0, 4, 8, 2];
        for lattice in 0..tables::LATTICE_SIZE {
            let total: usize = lattice_node_key(&corners, lattice)
                .iter()
                .map(|(_, w)| *w as usize)
                .sum();
            assert_eq!(total, 64);
        }
    }

    #[test]
    fn shared_face_keys_agree() {
        // cell b sits on top of cell a (b's bottom side is a's top side), numbered from a rotated corner
        let a = [0, 1, 2, 3, 4, 5, 6, 7];
        let b = [5, 6, 7, 4, 9, 10, 11, 8];

        // a's lattice point at (i, j, 4) is b's lattice point at (j, 4 - i, 0)
        for i in 0..5 {
            for j in 0..5 {
                assert_eq!(
                    lattice_node_key(&a, lattice_index([i, j, 4])),
                    lattice_node_key(&b, lattice_index([j, 4 - i, 0]))
                );
            }
        }
    }

    #[test]
    fn parent_nodes_on_lattice() {
        assert_eq!(parent_node_at(0, HexOrder::Linear), Some(0));
        assert_eq!(parent_node_at(124, HexOrder::Linear), Some(6));
        assert_eq!(parent_node_at(2, HexOrder::Linear), None);
        assert_eq!(parent_node_at(2, HexOrder::Serendipity), Some(8));
        assert_eq!(parent_node_at(62, HexOrder::Serendipity), None);
        assert_eq!(parent_node_at(62, HexOrder::Quadratic), Some(26));
        assert_eq!(parent_node_at(1, HexOrder::Quadratic), None);

        // each child's corner 0 sits at its octant's lowest point
        for child in 0..8 {
            let corner = child_node_lookup(child)[0];
            assert_eq!(tables::lattice_coords(corner), tables::child_octant(child).map(|c| 2 * c));
        }
    }
}
