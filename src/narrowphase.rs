//! GJK for overlap detection, EPA for penetration depth and normal, and a
//! reference/incident edge clip for the (up to two) contact points.
use glam::{dvec2, DVec2};
use tracing::{instrument, trace};

use crate::geometry::{Contacts, ShapeView};

const MAX_GJK_ITERATIONS: usize = 64;
const MAX_EPA_ITERATIONS: usize = 64;
const EPA_EPSILON: f64 = 1e-6;
/// Support points whose projection is this close to zero are treated as
/// "touching", not "separating" — see spec §4.2's touching tie-break.
const GJK_SEPARATION_TOLERANCE: f64 = 1e-9;

/// Penetration info for a detected overlap, before it is attributed to a
/// pair of bodies.
#[derive(Clone, Copy, Debug)]
pub struct DetectedContact {
    pub normal: DVec2,
    pub depth: f64,
    pub contacts: Contacts,
}

fn minkowski_support(a: &ShapeView, b: &ShapeView, dir: DVec2) -> DVec2 {
    a.support(dir) - b.support(-dir)
}

/// `(u x v) x w`, via the standard 2D identity `v(u.w) - u(v.w)`.
fn triple_product(u: DVec2, v: DVec2, w: DVec2) -> DVec2 {
    v * u.dot(w) - u * v.dot(w)
}

fn line_case(simplex: &mut Vec<DVec2>, dir: &mut DVec2) -> bool {
    let a = simplex[1];
    let b = simplex[0];
    let ab = b - a;
    let ao = -a;
    if ab.dot(ao) > 0.0 {
        let mut perp = triple_product(ab, ao, ab);
        if perp.length_squared() < 1e-18 {
            perp = dvec2(-ab.y, ab.x);
        }
        *dir = perp;
    } else {
        *simplex = vec![a];
        *dir = ao;
    }
    false
}

fn triangle_case(simplex: &mut Vec<DVec2>, dir: &mut DVec2) -> bool {
    let a = simplex[2];
    let b = simplex[1];
    let c = simplex[0];
    let ab = b - a;
    let ac = c - a;
    let ao = -a;

    let ab_perp = triple_product(ac, ab, ab);
    if ab_perp.dot(ao) > 0.0 {
        *simplex = vec![a, b];
        *dir = ab_perp;
        return false;
    }
    let ac_perp = triple_product(ab, ac, ac);
    if ac_perp.dot(ao) > 0.0 {
        *simplex = vec![a, c];
        *dir = ac_perp;
        return false;
    }
    true
}

/// Builds a simplex inside the Minkowski difference `A - B` that contains
/// the origin, or returns `None` if the shapes are separable. Bounded at
/// [`MAX_GJK_ITERATIONS`] so a degenerate configuration can never spin
/// forever — it is reported as non-colliding instead.
fn gjk(a: &ShapeView, b: &ShapeView) -> Option<Vec<DVec2>> {
    let seed = {
        let d = b.center() - a.center();
        if d.length_squared() > 1e-18 {
            d
        } else {
            DVec2::X
        }
    };
    let p0 = minkowski_support(a, b, seed);
    let mut simplex = vec![p0];
    let mut dir = if p0.length_squared() > 1e-18 {
        -p0
    } else {
        DVec2::X
    };
    let mut last = p0;

    for _ in 0..MAX_GJK_ITERATIONS {
        let p = minkowski_support(a, b, dir);
        if p.dot(dir) < -GJK_SEPARATION_TOLERANCE {
            trace!("gjk: separating axis found, no collision");
            return None;
        }
        if (p - last).length_squared() < 1e-18 {
            trace!("gjk: support point stalled, treating as non-colliding");
            return None;
        }
        last = p;
        simplex.push(p);
        let enclosed = if simplex.len() == 2 {
            line_case(&mut simplex, &mut dir)
        } else {
            triangle_case(&mut simplex, &mut dir)
        };
        if enclosed {
            return Some(simplex);
        }
    }
    trace!("gjk: iteration cap reached without enclosing the origin");
    None
}

fn ensure_ccw(points: &mut [DVec2]) {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        area += a.x * b.y - b.x * a.y;
    }
    if area < 0.0 {
        points.reverse();
    }
}

fn find_closest_edge(polytope: &[DVec2]) -> (usize, DVec2, f64) {
    let n = polytope.len();
    let mut best = (0, DVec2::X, f64::INFINITY);
    for i in 0..n {
        let a = polytope[i];
        let b = polytope[(i + 1) % n];
        let edge = b - a;
        let normal = dvec2(edge.y, -edge.x).normalize_or_zero();
        let dist = normal.dot(a);
        if dist < best.2 {
            best = (i, normal, dist);
        }
    }
    best
}

/// Expands a GJK-terminating simplex into a polytope whose closest edge to
/// the origin yields the contact normal and penetration depth. Bounded at
/// [`MAX_EPA_ITERATIONS`]; on exhaustion the best edge found so far is
/// returned rather than looping forever.
///
/// `find_closest_edge` yields the `A - B` polytope's own outward edge
/// normal, which points from `a` toward `b`. The solver (and the original
/// engine) needs the opposite convention — a normal pointing out of `b`
/// into `a`, i.e. `dot(normal, b.center - a.center) <= 0` — so the raw
/// normal and its witness points are flipped once at the end, after the
/// polytope expansion (which operates in `A - B` space and must stay in
/// the raw convention throughout) has converged.
fn epa(a: &ShapeView, b: &ShapeView, simplex: Vec<DVec2>) -> (DVec2, f64, DVec2, DVec2) {
    let mut polytope = simplex;
    ensure_ccw(&mut polytope);

    let mut best = {
        let (_, raw_normal, dist) = find_closest_edge(&polytope);
        (raw_normal, dist.max(0.0), a.support(raw_normal), b.support(-raw_normal))
    };

    let result = 'epa: {
        for _ in 0..MAX_EPA_ITERATIONS {
            let (edge_index, raw_normal, dist) = find_closest_edge(&polytope);
            let support_a = a.support(raw_normal);
            let support_b = b.support(-raw_normal);
            let p = support_a - support_b;
            let d = p.dot(raw_normal);
            best = (raw_normal, dist.max(0.0), support_a, support_b);
            if d - dist < EPA_EPSILON {
                break 'epa best;
            }
            polytope.insert(edge_index + 1, p);
        }
        trace!("epa: iteration cap reached, returning best edge found");
        best
    };

    let (raw_normal, depth, support_a, support_b) = result;
    (-raw_normal, depth, support_b, support_a)
}

fn best_edge(
    edges: &[(DVec2, DVec2, DVec2)],
    dir: DVec2,
) -> Option<(DVec2, DVec2, DVec2)> {
    edges
        .iter()
        .copied()
        .max_by(|e1, e2| e1.2.dot(dir).partial_cmp(&e2.2.dot(dir)).unwrap())
}

fn clip_side(points: [DVec2; 2], normal: DVec2, offset: f64) -> Option<[DVec2; 2]> {
    let d0 = normal.dot(points[0]) - offset;
    let d1 = normal.dot(points[1]) - offset;
    let mut out = Vec::with_capacity(2);
    if d0 >= 0.0 {
        out.push(points[0]);
    }
    if d1 >= 0.0 {
        out.push(points[1]);
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        out.push(points[0] + t * (points[1] - points[0]));
    }
    if out.len() < 2 {
        return None;
    }
    Some([out[0], out[1]])
}

/// Reference/incident edge clip (the polygon analog of the original
/// engine's `find_best` + `clip`, re-expressed against a GJK/EPA normal
/// instead of a SAT axis): `B`'s edge most aligned with `normal` is the
/// reference face, `A`'s edge most anti-parallel to it is clipped against
/// the reference face's side planes.
fn clip_manifold(
    edges_a: &[(DVec2, DVec2, DVec2)],
    edges_b: &[(DVec2, DVec2, DVec2)],
    normal: DVec2,
) -> Option<Contacts> {
    let reference = best_edge(edges_b, normal)?;
    let incident = best_edge(edges_a, -normal)?;

    let ref_dir = (reference.1 - reference.0).normalize_or_zero();
    if ref_dir.length_squared() < 1e-18 {
        return None;
    }

    let pts = [incident.0, incident.1];
    let pts = clip_side(pts, -ref_dir, -ref_dir.dot(reference.0))?;
    let pts = clip_side(pts, ref_dir, ref_dir.dot(reference.1))?;

    let ref_normal = reference.2;
    let ref_proj = ref_normal.dot(reference.0);
    let kept: Vec<DVec2> = pts
        .into_iter()
        .filter(|p| ref_normal.dot(*p) - ref_proj <= 1e-3)
        .collect();

    match kept.len() {
        2 => Some(Contacts::pair(kept[0], kept[1])),
        1 => Some(Contacts::single(kept[0])),
        _ => None,
    }
}

fn build_manifold(
    a: &ShapeView,
    b: &ShapeView,
    normal: DVec2,
    fallback_a: DVec2,
    fallback_b: DVec2,
) -> Contacts {
    let midpoint = (fallback_a + fallback_b) * 0.5;
    match (a.edges(), b.edges()) {
        (Some(edges_a), Some(edges_b)) => {
            clip_manifold(&edges_a, &edges_b, normal).unwrap_or_else(|| Contacts::single(midpoint))
        }
        _ => Contacts::single(midpoint),
    }
}

/// Detects whether two placed shapes overlap and, if so, returns the
/// contact normal (pointing out of `b` into `a`), penetration depth, and
/// up to two world-space contact points.
#[instrument(level = "trace", skip_all)]
pub fn collide(a: &ShapeView, b: &ShapeView) -> Option<DetectedContact> {
    let simplex = gjk(a, b)?;
    let (normal, depth, contact_a, contact_b) = epa(a, b, simplex);
    let contacts = build_manifold(a, b, normal, contact_a, contact_b);
    Some(DetectedContact {
        normal,
        depth,
        contacts,
    })
}
