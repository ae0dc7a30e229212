use super::{
    h_refinement::HRefError,
    hex::{tables::N_CHILDREN, HexOrder},
    EXPECTED_NUM_H_REFINEMENTS,
};
#[cfg(feature = "json_export")]
use json::{object, JsonValue};
use smallvec::SmallVec;

/// `Elem`s are the stored form of a hexahedral cell in a [`HexMesh`](super::HexMesh)
///
/// `Elem`s are responsible for keeping track of:
/// * The global ids of their `Node`s (in master element order)
/// * Connections to their parent `Elem` and its ancestors
/// * Connections to their 8 child `Elem`s (if h-refined)
///
/// Queries against an `Elem`'s topology and geometry go through a [`HexCell`](super::hex::HexCell),
/// which binds these ids to the mesh's `Node`s.
#[derive(Debug, Clone)]
pub struct Elem {
    pub id: usize,
    pub nodes: SmallVec<[usize; 27]>,
    pub order: HexOrder,
    children: Option<[usize; N_CHILDREN]>,
    ancestors: SmallVec<[usize; EXPECTED_NUM_H_REFINEMENTS]>,
}

impl Elem {
    pub fn new(id: usize, nodes: &[usize], order: HexOrder) -> Self {
        assert_eq!(
            nodes.len(),
            order.n_nodes(),
            "A {} needs {} nodes; cannot construct Elem {}!",
            order.name(),
            order.n_nodes(),
            id
        );

        Self {
            id,
            nodes: SmallVec::from_slice(nodes),
            order,
            children: None,
            ancestors: SmallVec::new(),
        }
    }

    /// Construct the 8 children of this Elem from their node ids (given in child order)
    pub(crate) fn h_refine(
        &mut self,
        child_nodes: Vec<SmallVec<[usize; 27]>>,
        first_child_id: usize,
    ) -> Result<Vec<Elem>, HRefError> {
        if self.children.is_some() {
            return Err(HRefError::ElemHasChildren(self.id));
        }
        assert_eq!(child_nodes.len(), N_CHILDREN);

        let mut ancestors = self.ancestors.clone();
        ancestors.push(self.id);

        let children: Vec<Elem> = child_nodes
            .into_iter()
            .enumerate()
            .map(|(child_idx, nodes)| Elem {
                id: first_child_id + child_idx,
                nodes,
                order: self.order,
                children: None,
                ancestors: ancestors.clone(),
            })
            .collect();

        let mut child_ids = [0; N_CHILDREN];
        for (child_id, child) in child_ids.iter_mut().zip(children.iter()) {
            *child_id = child.id;
        }
        self.children = Some(child_ids);

        Ok(children)
    }

    /// Id of the Parent Elem if this Elem has a parent
    pub fn parent_id(&self) -> Option<usize> {
        self.ancestors.last().copied()
    }

    /// Ids of this Elem's ancestors, starting on the base layer of the mesh
    pub fn ancestors(&self) -> &[usize] {
        &self.ancestors
    }

    /// Number of h-refinements between this Elem and the base layer of the mesh
    pub fn level(&self) -> usize {
        self.ancestors.len()
    }

    /// Returns this Elem's children in child order. Returns `None` if this Elem has no children.
    pub fn child_ids(&self) -> Option<[usize; N_CHILDREN]> {
        self.children
    }

    /// Has this `Elem` been h-Refined
    pub fn has_children(&self) -> bool {
        self.children.is_some()
    }

    /// Produce a Json Object that describes this Elem
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "id": self.id,
            "type": self.order.name(),
            "parent": self.parent_id(),
            "active": self.children.is_none(),
            "level": self.level(),
            "nodes": JsonValue::from(self.nodes.to_vec()),
            "children": JsonValue::from(
                match &self.children {
                    Some(ids) => ids.to_vec(),
                    None => Vec::new(),
                }
            )
        }
    }
}
