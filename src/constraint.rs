//! Two-body distance constraints, solved as a soft velocity bias (the same
//! family of technique the original engine used, re-derived directly in
//! velocity space rather than through a Jacobian).
use glam::DVec2;
use slotmap::SlotMap;
use tracing::trace;

use crate::body::{Body, BodyId};

/// Position-bias stiffness. Low and fixed rather than exposed as a tunable,
/// matching the single hardcoded `k_factor` the original engine used for
/// every constraint.
const BIAS_FACTOR: f64 = 0.01;

#[derive(Clone, Copy, Debug)]
pub struct DistanceConstraint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub distance: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct RopeConstraint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub max_distance: f64,
}

/// A constraint between exactly two bodies. Closed rather than `dyn`: the
/// simulation only ever needs these two kinds, so there is no open set of
/// caller-supplied constraint types to support.
#[derive(Clone, Copy, Debug)]
pub enum Constraint {
    Distance(DistanceConstraint),
    Rope(RopeConstraint),
}

impl Constraint {
    pub fn distance(body_a: BodyId, body_b: BodyId, distance: f64) -> Self {
        Constraint::Distance(DistanceConstraint {
            body_a,
            body_b,
            distance,
        })
    }

    pub fn rope(body_a: BodyId, body_b: BodyId, max_distance: f64) -> Self {
        Constraint::Rope(RopeConstraint {
            body_a,
            body_b,
            max_distance,
        })
    }

    /// Applies one velocity correction for this constraint. `dt` must be
    /// the substep duration the bias term is scaled against.
    pub(crate) fn apply(&self, dt: f64, bodies: &mut SlotMap<BodyId, Body>) {
        match self {
            Constraint::Distance(c) => apply_distance(c.body_a, c.body_b, c.distance, dt, bodies),
            Constraint::Rope(c) => {
                let (Some(a), Some(b)) = (bodies.get(c.body_a), bodies.get(c.body_b)) else {
                    return;
                };
                let separation = a.pose.position.distance(b.pose.position);
                if separation <= c.max_distance {
                    // Slack: a rope exerts no force until it goes taut.
                    return;
                }
                apply_distance(c.body_a, c.body_b, c.max_distance, dt, bodies);
            }
        }
    }
}

/// Shared solve used by both constraint kinds: pulls `a` and `b` toward
/// being exactly `target_distance` apart, correcting both velocity error
/// and a fraction of positional error (Baumgarte-style soft bias) in one
/// pass.
fn apply_distance(
    id_a: BodyId,
    id_b: BodyId,
    target_distance: f64,
    dt: f64,
    bodies: &mut SlotMap<BodyId, Body>,
) {
    let Some([a, b]) = bodies.get_disjoint_mut([id_a, id_b]) else {
        return;
    };
    let delta = a.pose.position - b.pose.position;
    let current_distance = delta.length();
    if current_distance < 1e-9 {
        return;
    }
    let inverse_mass_sum = a.inv_mass + b.inv_mass;
    if inverse_mass_sum <= 0.0 {
        return;
    }

    let normal = delta / current_distance;
    let error = target_distance - current_distance;
    let relative_velocity = (a.velocity.linear - b.velocity.linear).dot(normal);
    let bias = -BIAS_FACTOR * error / dt;
    let lambda = -(relative_velocity + bias) / inverse_mass_sum;

    trace!(error, lambda, "constraint solve");

    a.velocity.linear += normal * (lambda * a.inv_mass);
    b.velocity.linear -= normal * (lambda * b.inv_mass);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Pose, Velocity};
    use crate::geometry::ShapeId;
    use glam::dvec2;
    use slotmap::SlotMap;

    fn body(pos: DVec2, inv_mass: f64) -> Body {
        Body {
            pose: Pose {
                position: pos,
                angle: 0.0,
            },
            velocity: Velocity::default(),
            acceleration: DVec2::ZERO,
            inv_mass,
            inv_inertia: 0.0,
            scale: DVec2::ONE,
            shape: ShapeId::default(),
        }
    }

    #[test]
    fn distance_constraint_pulls_bodies_together_when_stretched() {
        let mut bodies: SlotMap<BodyId, Body> = SlotMap::with_key();
        let a = bodies.insert(body(dvec2(0.0, 0.0), 1.0));
        let b = bodies.insert(body(dvec2(3.0, 0.0), 0.0));
        let constraint = Constraint::distance(a, b, 1.0);
        constraint.apply(0.01, &mut bodies);
        // a should gain velocity pointing toward b (+x), b is static/unaffected.
        assert!(bodies[a].velocity.linear.x > 0.0);
        assert_eq!(bodies[b].velocity.linear, DVec2::ZERO);
    }

    #[test]
    fn rope_constraint_is_slack_within_max_distance() {
        let mut bodies: SlotMap<BodyId, Body> = SlotMap::with_key();
        let a = bodies.insert(body(dvec2(0.0, 0.0), 1.0));
        let b = bodies.insert(body(dvec2(1.0, 0.0), 0.0));
        let constraint = Constraint::rope(a, b, 5.0);
        constraint.apply(0.01, &mut bodies);
        assert_eq!(bodies[a].velocity.linear, DVec2::ZERO);
    }

    #[test]
    fn rope_constraint_engages_once_taut() {
        let mut bodies: SlotMap<BodyId, Body> = SlotMap::with_key();
        let a = bodies.insert(body(dvec2(0.0, 0.0), 1.0));
        let b = bodies.insert(body(dvec2(10.0, 0.0), 0.0));
        let constraint = Constraint::rope(a, b, 5.0);
        constraint.apply(0.01, &mut bodies);
        assert!(bodies[a].velocity.linear.x > 0.0);
    }
}
