use super::hex::{tables::MASTER_POINTS, HexOrder};
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

/// Values of a Hex's Lagrange shape functions at a point in the master element
///
/// One value per node of `order`, with `N_i(master_point_j) = δ_ij`:
/// * `Linear`: trilinear
/// * `Serendipity`: 20-node serendipity
/// * `Quadratic`: triquadratic (tensor product of 1D quadratic Lagrange polynomials)
pub fn shape_values(order: HexOrder, xi: [f64; 3]) -> SmallVec<[f64; 27]> {
    MASTER_POINTS
        .iter()
        .take(order.n_nodes())
        .map(|node_point| match order {
            HexOrder::Linear => trilinear(node_point, xi),
            HexOrder::Serendipity => serendipity(node_point, xi),
            HexOrder::Quadratic => (0..3)
                .map(|d| lagrange_quadratic_1d(node_point[d], xi[d]))
                .product::<f64>(),
        })
        .collect()
}

/// Map a point in the master element into real space through the cell's node positions
pub fn map_reference_point(order: HexOrder, points: &[Point3<f64>], xi: [f64; 3]) -> Point3<f64> {
    assert_eq!(
        points.len(),
        order.n_nodes(),
        "A {} needs {} points to map into real space; got {}!",
        order.name(),
        order.n_nodes(),
        points.len()
    );

    let weighted = shape_values(order, xi)
        .iter()
        .zip(points.iter())
        .fold(Vector3::zeros(), |acc, (n, p)| acc + p.coords * *n);

    Point3::from(weighted)
}

fn trilinear(node_point: &[f64; 3], xi: [f64; 3]) -> f64 {
    (0..3).map(|d| (1.0 + node_point[d] * xi[d]) / 2.0).product()
}

fn serendipity(node_point: &[f64; 3], xi: [f64; 3]) -> f64 {
    match node_point.iter().position(|c| *c == 0.0) {
        // corner
        None => {
            let sum: f64 = (0..3).map(|d| node_point[d] * xi[d]).sum();
            trilinear(node_point, xi) * (sum - 2.0)
        }
        // edge midpoint, centered along `axis`
        Some(axis) => (0..3)
            .map(|d| {
                if d == axis {
                    1.0 - xi[d] * xi[d]
                } else {
                    (1.0 + node_point[d] * xi[d]) / 2.0
                }
            })
            .product(),
    }
}

fn lagrange_quadratic_1d(node: f64, x: f64) -> f64 {
    if node < 0.0 {
        x * (x - 1.0) / 2.0
    } else if node > 0.0 {
        x * (x + 1.0) / 2.0
    } else {
        1.0 - x * x
    }
}
