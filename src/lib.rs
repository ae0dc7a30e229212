/// Named registries of trait-object builders
pub mod factory;
/// Hexahedral cells, their topology tables and quality metrics, and the Mesh that owns them
pub mod mesh;
/// Type-level rank and real/complex relationships between scalars, vectors and rank-2 tensors
pub mod tensor_tools;

pub use factory::{shape_quality_factory, Factory, FactoryError};
pub use mesh::{
    elem::Elem,
    h_refinement::HRefError,
    hex::{HexCell, HexOrder, TopologyError},
    node::Node,
    quad::{QuadFace, QuadOrder},
    quality::{ElemQuality, GenericQuality, QualityError, ShapeQuality, StrictQuality},
    HexMesh, MeshError, QualityReport,
};
