#[cfg(feature = "json_export")]
use json::{array, object, JsonValue};
use nalgebra::Point3;
use smallvec::SmallVec;

/// A point in 3D space, numbered globally by its owning [`HexMesh`](super::HexMesh)
///
/// Groups of 8, 20 or 27 Nodes describe a [`HexCell`](super::hex::HexCell); groups of 4, 8 or 9 describe a
/// [`QuadFace`](super::quad::QuadFace)
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: usize,
    pub coords: Point3<f64>,
}

impl Node {
    pub fn new(id: usize, coords: Point3<f64>) -> Self {
        Self { id, coords }
    }

    /// Produce a Json Object that describes this Node
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "id": self.id,
            "coords": array![self.coords.x, self.coords.y, self.coords.z],
        }
    }
}

const KEY_SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

/// Combine a set of global Node ids into one key, independent of the order they are given in
///
/// The ids are sorted and folded through a 64-bit finalizer, so two faces (or edges) built from the
/// same Nodes produce the same key no matter how each cell numbers them locally.
pub fn compute_key(ids: &[usize]) -> u64 {
    let mut sorted: SmallVec<[usize; 9]> = SmallVec::from_slice(ids);
    sorted.sort_unstable();
    sorted
        .iter()
        .fold(KEY_SEED, |hash, id| mix(hash ^ (*id as u64)))
}

// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
