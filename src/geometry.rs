//! Convex shapes in local coordinates, and the placed view of a shape used
//! by the narrow phase and the solver.
use glam::{dvec2, DVec2};
use slotmap::new_key_type;

use crate::error::ShapeError;

new_key_type! {
    /// Stable handle into a [`crate::world::World`]'s shape pool. Shapes are
    /// immutable once inserted, so many bodies may share one `ShapeId`.
    pub struct ShapeId;
}

/// A convex shape defined in local coordinates, centered at the origin
/// unless the vertex list says otherwise.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Shape {
    Circle,
    Polygon { points: Vec<DVec2> },
}

impl Shape {
    /// Unit-radius circle. Non-unit radii are obtained through a body's
    /// `scale`.
    pub fn circle() -> Shape {
        Shape::Circle
    }

    /// Arbitrary convex polygon. Rejects degenerate or non-convex input
    /// rather than silently producing a shape whose support mapping lies.
    pub fn polygon(points: Vec<DVec2>) -> Result<Shape, ShapeError> {
        if points.len() < 3 {
            return Err(ShapeError::TooFewVertices { got: points.len() });
        }
        let n = points.len();
        for i in 0..n {
            if points[i].distance_squared(points[(i + 1) % n]) < 1e-18 {
                return Err(ShapeError::DuplicateVertex { index: i });
            }
        }
        check_convex(&points)?;
        Ok(Shape::Polygon { points })
    }

    /// Vertices on the unit circle. If `sides` is even, rotated by half the
    /// inter-vertex angle so one edge is axis-aligned to x.
    pub fn regular_polygon(sides: usize) -> Shape {
        assert!(sides >= 3, "a regular polygon needs at least 3 sides");
        let angle_step = std::f64::consts::TAU / sides as f64;
        let offset = if sides % 2 == 0 { angle_step / 2.0 } else { 0.0 };
        let points = (0..sides)
            .map(|i| {
                let a = offset + angle_step * i as f64;
                dvec2(a.sin(), a.cos())
            })
            .collect();
        Shape::Polygon { points }
    }

    /// The extreme point of the shape along `dir`, in local coordinates.
    pub fn support(&self, dir: DVec2) -> DVec2 {
        match self {
            Shape::Circle => dir.normalize_or_zero(),
            Shape::Polygon { points } => {
                let mut best = points[0];
                let mut best_dot = best.dot(dir);
                for &p in &points[1..] {
                    let d = p.dot(dir);
                    if d > best_dot {
                        best = p;
                        best_dot = d;
                    }
                }
                best
            }
        }
    }

    /// Centroid hint used by the narrow phase to seed a separating
    /// direction. Need not be exact.
    pub fn center(&self) -> DVec2 {
        match self {
            Shape::Circle => DVec2::ZERO,
            Shape::Polygon { points } => {
                points.iter().fold(DVec2::ZERO, |acc, &p| acc + p) / points.len() as f64
            }
        }
    }

    pub fn as_polygon_points(&self) -> Option<&[DVec2]> {
        match self {
            Shape::Circle => None,
            Shape::Polygon { points } => Some(points),
        }
    }
}

fn check_convex(points: &[DVec2]) -> Result<(), ShapeError> {
    let n = points.len();
    let mut sign = 0.0_f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let cross = (b - a).perp_dot(c - b);
        if cross.abs() < 1e-12 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return Err(ShapeError::NotConvex { index: (i + 1) % n });
        }
    }
    Ok(())
}

/// A placed instance of a `Shape`: translation, anisotropic scale, and
/// rotation, composed in that fixed order (scale, then rotate, then
/// translate). The rotation is kept as a `(sin, cos)` pair to avoid
/// repeated trig, mirroring the original engine's `polygon_view`.
pub struct ShapeView<'a> {
    shape: &'a Shape,
    offset: DVec2,
    scale: DVec2,
    sin_angle: f64,
    cos_angle: f64,
}

impl<'a> ShapeView<'a> {
    pub fn new(shape: &'a Shape, offset: DVec2, scale: DVec2, angle: f64) -> Self {
        ShapeView {
            shape,
            offset,
            scale,
            sin_angle: angle.sin(),
            cos_angle: angle.cos(),
        }
    }

    pub fn angle(&self) -> f64 {
        self.sin_angle.atan2(self.cos_angle)
    }

    pub fn transform(&self, p: DVec2) -> DVec2 {
        let scaled = p * self.scale;
        let rotated = dvec2(
            self.cos_angle * scaled.x - self.sin_angle * scaled.y,
            self.sin_angle * scaled.x + self.cos_angle * scaled.y,
        );
        rotated + self.offset
    }

    /// Maps a world-space direction back to the local-space direction whose
    /// support point, once transformed, is the true world-space extreme
    /// point along `dir`: `scale ⊙ (Rᵀ · dir)`, per the transform's inverse
    /// linear part (spec's `scaleᵀ · Rᵀ · d`, scale being diagonal so
    /// transpose is a no-op).
    fn inverse_direction(&self, dir: DVec2) -> DVec2 {
        let unrotated = dvec2(
            self.cos_angle * dir.x + self.sin_angle * dir.y,
            -self.sin_angle * dir.x + self.cos_angle * dir.y,
        );
        unrotated * self.scale
    }

    /// The lifted support mapping: the true world-space extreme point of
    /// the transformed shape along `dir`.
    pub fn support(&self, dir: DVec2) -> DVec2 {
        if (self.scale.x - self.scale.y).abs() < 1e-12 {
            // Uniform scale: rotating the world direction back is enough,
            // no need to invert the scale since it's a positive multiple
            // of the identity.
            let local_dir = dvec2(
                self.cos_angle * dir.x + self.sin_angle * dir.y,
                -self.sin_angle * dir.x + self.cos_angle * dir.y,
            );
            self.transform(self.shape.support(local_dir))
        } else {
            let local_dir = self.inverse_direction(dir);
            self.transform(self.shape.support(local_dir))
        }
    }

    pub fn center(&self) -> DVec2 {
        self.transform(self.shape.center())
    }

    pub fn shape(&self) -> &Shape {
        self.shape
    }

    /// World-space polygon edges as `(start, end, outward_normal)` triples,
    /// or `None` for a circle (which has no edges to clip against).
    pub fn edges(&self) -> Option<Vec<(DVec2, DVec2, DVec2)>> {
        let points = self.shape.as_polygon_points()?;
        let n = points.len();
        let world: Vec<DVec2> = points.iter().map(|&p| self.transform(p)).collect();
        let center = self.center();
        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let a = world[i];
            let b = world[(i + 1) % n];
            let edge = b - a;
            let mut normal = dvec2(edge.y, -edge.x).normalize_or_zero();
            // Flip to point away from the polygon's own center, so this is
            // correct regardless of the vertex winding order.
            if normal.dot(a - center) < 0.0 {
                normal = -normal;
            }
            edges.push((a, b, normal));
        }
        Some(edges)
    }
}

/// Up to two world-space contact points for a collision (a vertex touch
/// yields one; a flush edge-edge touch yields two).
#[derive(Clone, Copy, Debug)]
pub struct Contacts {
    points: [Option<DVec2>; 2],
}

impl Contacts {
    pub fn single(p: DVec2) -> Self {
        Contacts {
            points: [Some(p), None],
        }
    }

    pub fn pair(a: DVec2, b: DVec2) -> Self {
        Contacts {
            points: [Some(a), Some(b)],
        }
    }

    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = DVec2> + '_ {
        self.points.iter().filter_map(|p| *p)
    }

    /// The point the impulse solver applies a single combined impulse at:
    /// the midpoint of whatever points were recorded.
    pub fn midpoint(&self) -> DVec2 {
        let sum = self.iter().fold(DVec2::ZERO, |acc, p| acc + p);
        sum / self.len().max(1) as f64
    }
}

/// A detected overlap between two placed shapes. `normal` points out of `B`
/// into `A`; `depth` is the penetration depth (`>= 0`).
#[derive(Clone, Copy, Debug)]
pub struct Collision {
    pub body_a: crate::body::BodyId,
    pub body_b: crate::body::BodyId,
    pub normal: DVec2,
    pub depth: f64,
    pub contacts: Contacts,
}
