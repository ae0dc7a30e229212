use super::hex::tables::{DIAGONALS, EDGE_NODES_MAP, TAPER_EDGE_PAIRS};
use nalgebra::{distance, Point3};
use std::fmt;
use std::str::FromStr;
use std::sync::Once;
use thiserror::Error;
use tracing::warn;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Scalar measures of how well-suited a (deformed) cell is for finite element computation
///
/// Names and acceptable ranges follow the CUBIT User's Manual.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElemQuality {
    AspectRatio,
    Skew,
    Shear,
    Shape,
    MaxAngle,
    MinAngle,
    Condition,
    Distortion,
    Taper,
    Warp,
    Stretch,
    Diagonal,
    AspectRatioBeta,
    AspectRatioGamma,
    Size,
    Jacobian,
    Twist,
    EdgeLengthRatio,
}

impl ElemQuality {
    pub const ALL: [Self; 18] = [
        Self::AspectRatio,
        Self::Skew,
        Self::Shear,
        Self::Shape,
        Self::MaxAngle,
        Self::MinAngle,
        Self::Condition,
        Self::Distortion,
        Self::Taper,
        Self::Warp,
        Self::Stretch,
        Self::Diagonal,
        Self::AspectRatioBeta,
        Self::AspectRatioGamma,
        Self::Size,
        Self::Jacobian,
        Self::Twist,
        Self::EdgeLengthRatio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AspectRatio => "ASPECT_RATIO",
            Self::Skew => "SKEW",
            Self::Shear => "SHEAR",
            Self::Shape => "SHAPE",
            Self::MaxAngle => "MAX_ANGLE",
            Self::MinAngle => "MIN_ANGLE",
            Self::Condition => "CONDITION",
            Self::Distortion => "DISTORTION",
            Self::Taper => "TAPER",
            Self::Warp => "WARP",
            Self::Stretch => "STRETCH",
            Self::Diagonal => "DIAGONAL",
            Self::AspectRatioBeta => "ASPECT_RATIO_BETA",
            Self::AspectRatioGamma => "ASPECT_RATIO_GAMMA",
            Self::Size => "SIZE",
            Self::Jacobian => "JACOBIAN",
            Self::Twist => "TWIST",
            Self::EdgeLengthRatio => "EDGE_LENGTH_RATIO",
        }
    }
}

impl fmt::Display for ElemQuality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ElemQuality {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .find(|metric| metric.name() == upper)
            .copied()
            .ok_or_else(|| QualityError::UnrecognizedMetric(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityError {
    #[error("unrecognized quality metric: {0:?}")]
    UnrecognizedMetric(String),
    #[error("{metric} is undefined on a degenerate cell (got {value})")]
    DegenerateGeometry { metric: ElemQuality, value: f64 },
}

/// Shape-agnostic quality measures, used for any metric a specific cell shape has no formula for
///
/// `vertices` are the corner coordinates of the cell; `edges` are corner-index pairs resolved by the
/// caller's topology tables.
pub trait ShapeQuality {
    fn default_quality(&self, metric: ElemQuality, vertices: &[Point3<f64>], edges: &[[usize; 2]]) -> f64;
}

/// Computes the edge length ratio and returns 1 for every other metric (with a one-time warning)
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericQuality;

static UNSUPPORTED_METRIC_WARNING: Once = Once::new();

impl ShapeQuality for GenericQuality {
    fn default_quality(&self, metric: ElemQuality, vertices: &[Point3<f64>], edges: &[[usize; 2]]) -> f64 {
        match metric {
            ElemQuality::EdgeLengthRatio => edge_length_ratio(vertices, edges),
            _ => {
                UNSUPPORTED_METRIC_WARNING.call_once(|| {
                    warn!("quality metric {} is not implemented for this shape; returning 1", metric)
                });
                1.0
            }
        }
    }
}

/// Like [GenericQuality], but yields `NaN` for metrics it cannot compute so that scans flag them
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictQuality;

impl ShapeQuality for StrictQuality {
    fn default_quality(&self, metric: ElemQuality, vertices: &[Point3<f64>], edges: &[[usize; 2]]) -> f64 {
        match metric {
            ElemQuality::EdgeLengthRatio => edge_length_ratio(vertices, edges),
            _ => f64::NAN,
        }
    }
}

/// Maximum over minimum edge length; zero where that would be infinite
fn edge_length_ratio(vertices: &[Point3<f64>], edges: &[[usize; 2]]) -> f64 {
    let (min, max) = edges
        .iter()
        .map(|[a, b]| distance(&vertices[*a], &vertices[*b]))
        .fold((f64::INFINITY, 0.0_f64), |(min, max), len| (min.min(len), max.max(len)));

    if min == 0.0 || edges.is_empty() {
        0.0
    } else {
        max / min
    }
}

/// Hexahedron-specific quality formulas, delegating everything else to a [ShapeQuality] fallback
pub struct HexQuality<'f> {
    fallback: &'f dyn ShapeQuality,
}

impl<'f> HexQuality<'f> {
    pub fn new(fallback: &'f dyn ShapeQuality) -> Self {
        Self { fallback }
    }

    pub fn quality(&self, metric: ElemQuality, corners: &[Point3<f64>; 8]) -> f64 {
        match metric {
            ElemQuality::Diagonal => diagonal_ratio(corners),
            ElemQuality::Taper => taper(corners),
            ElemQuality::Stretch => stretch(corners),
            _ => self.fallback.default_quality(metric, corners, &HEX_EDGES),
        }
    }
}

const HEX_EDGES: [[usize; 2]; 12] = {
    let mut edges = [[0; 2]; 12];
    let mut e = 0;
    while e < 12 {
        edges[e] = [EDGE_NODES_MAP[e][0], EDGE_NODES_MAP[e][1]];
        e += 1;
    }
    edges
};

fn diagonal_lengths(corners: &[Point3<f64>; 8]) -> [f64; 4] {
    DIAGONALS.map(|[a, b]| distance(&corners[a], &corners[b]))
}

fn edge_lengths(corners: &[Point3<f64>; 8]) -> [f64; 12] {
    HEX_EDGES.map(|[a, b]| distance(&corners[a], &corners[b]))
}

/// Minimum over maximum space diagonal
///
/// `NaN` if every diagonal has collapsed to zero length.
pub fn diagonal_ratio(corners: &[Point3<f64>; 8]) -> f64 {
    let diagonals = diagonal_lengths(corners);
    let min = diagonals.iter().copied().fold(f64::INFINITY, f64::min);
    let max = diagonals.iter().copied().fold(0.0, f64::max);

    min / max
}

/// Minimum ratio between the lengths of parallel edges
///
/// `NaN` if both edges of some pair have collapsed.
pub fn taper(corners: &[Point3<f64>; 8]) -> f64 {
    let edges = edge_lengths(corners);

    nan_min(TAPER_EDGE_PAIRS.iter().map(|[a, b]| {
        let (la, lb) = (edges[*a], edges[*b]);
        la.min(lb) / la.max(lb)
    }))
}

/// √3 times the minimum edge length over the maximum space diagonal
pub fn stretch(corners: &[Point3<f64>; 8]) -> f64 {
    let max_diagonal = diagonal_lengths(corners).iter().copied().fold(0.0, f64::max);
    let min_edge = edge_lengths(corners).iter().copied().fold(f64::INFINITY, f64::min);

    SQRT_3 * min_edge / max_diagonal
}

// minimum which propagates NaN instead of skipping it
fn nan_min(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, |acc, v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            acc.min(v)
        }
    })
}

/// Acceptable `(low, high)` range of a metric on a hexahedron, if one is tabulated
pub fn tabulated_bounds(metric: ElemQuality) -> Option<(f64, f64)> {
    match metric {
        ElemQuality::AspectRatio => Some((1.0, 4.0)),
        ElemQuality::Skew => Some((0.0, 0.5)),
        ElemQuality::Shear | ElemQuality::Shape => Some((0.3, 1.0)),
        ElemQuality::Condition => Some((1.0, 8.0)),
        ElemQuality::Jacobian => Some((0.5, 1.0)),
        ElemQuality::Distortion => Some((0.6, 1.0)),
        ElemQuality::Taper => Some((0.0, 0.4)),
        ElemQuality::Stretch => Some((0.25, 1.0)),
        ElemQuality::Diagonal => Some((0.65, 1.0)),
        ElemQuality::Size => Some((0.5, 1.0)),
        _ => None,
    }
}

/// Acceptable `(low, high)` range of a metric on a hexahedron
///
/// Metrics without a tabulated range produce `(-1, -1)` and a warning; the bounds are advisory.
pub fn quality_bounds(metric: ElemQuality) -> (f64, f64) {
    tabulated_bounds(metric).unwrap_or_else(|| {
        warn!("invalid quality measure chosen for a Hex: {}", metric);
        (-1.0, -1.0)
    })
}

/// Does `metric` have a tabulated range on a hexahedron
pub fn has_bounds(metric: ElemQuality) -> bool {
    tabulated_bounds(metric).is_some()
}
