//! Moment-of-inertia formulas for the shapes the simulation supports.
use glam::DVec2;

use crate::geometry::Shape;

/// Moment of inertia of a solid disc of the given `radius` and `mass`,
/// about its centroid.
pub fn circle_moment_of_inertia(radius: f64, mass: f64) -> f64 {
    mass * radius * radius / 2.0
}

/// Moment of inertia of a convex polygon about its centroid, by summing
/// triangle contributions from an interior reference point. `points` are
/// in the shape's local space; `mass` is distributed uniformly over the
/// polygon's area.
pub fn polygon_moment_of_inertia(points: &[DVec2], centroid: DVec2, mass: f64) -> f64 {
    let n = points.len();
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..n {
        let p0 = points[i] - centroid;
        let p1 = points[(i + 1) % n] - centroid;
        let cross = p0.perp_dot(p1).abs();
        numerator += cross * (p0.dot(p0) + p0.dot(p1) + p1.dot(p1));
        denominator += cross;
    }
    if denominator.abs() < 1e-18 {
        return 0.0;
    }
    (mass / 6.0) * numerator / denominator
}

/// Moment of inertia of `shape` (scaled by `scale`) about its own centroid,
/// for a given `mass`. Circles ignore anisotropic scale (the crate never
/// constructs a non-circular ellipse from a circle).
pub fn moment_of_inertia(shape: &Shape, scale: DVec2, mass: f64) -> f64 {
    match shape {
        Shape::Circle => circle_moment_of_inertia(scale.x, mass),
        Shape::Polygon { points } => {
            let scaled: Vec<DVec2> = points.iter().map(|&p| p * scale).collect();
            let centroid = shape.center() * scale;
            polygon_moment_of_inertia(&scaled, centroid, mass)
        }
    }
}
