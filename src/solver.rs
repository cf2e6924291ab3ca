//! Restitution-based collision response. A single non-iterative impulse per
//! collision pair, grounded directly in the original engine's `get_dv`
//! moment-arm derivation rather than an iterative Jacobian solver.
use glam::DVec2;
use slotmap::SlotMap;
use tracing::{instrument, trace, warn};

use crate::body::{Body, BodyId};
use crate::geometry::Collision;

/// Applies one collision impulse at `contact` so the bodies separate (or
/// bounce, for `restitution > 0`) along `normal`. `center_a`/`center_b` are
/// each body's world-space shape center (not necessarily `pose.position`
/// for an off-centroid polygon), giving the moment arms `r_a = contact -
/// center_a`, `r_b = contact - center_b` that the original `get_dv` uses.
fn apply_contact_impulse(
    a: &mut Body,
    b: &mut Body,
    center_a: DVec2,
    center_b: DVec2,
    normal: DVec2,
    contact: DVec2,
    restitution: f64,
) {
    let r_a = contact - center_a;
    let r_b = contact - center_b;

    let velocity_a = a.velocity.linear + a.velocity.angular * r_a.perp();
    let velocity_b = b.velocity.linear + b.velocity.angular * r_b.perp();
    let relative_velocity = velocity_a - velocity_b;
    let normal_velocity = relative_velocity.dot(normal);

    if normal_velocity >= 0.0 {
        // Already separating (or resting) along the normal; nothing to do.
        return;
    }

    let ra_cross_n = r_a.perp_dot(normal);
    let rb_cross_n = r_b.perp_dot(normal);
    let inverse_mass_sum = a.inv_mass
        + b.inv_mass
        + a.inv_inertia * ra_cross_n * ra_cross_n
        + b.inv_inertia * rb_cross_n * rb_cross_n;
    if inverse_mass_sum <= 0.0 {
        warn!("collision between two immovable bodies, skipping impulse");
        return;
    }

    let impulse_magnitude = -(1.0 + restitution) * normal_velocity / inverse_mass_sum;
    let impulse = normal * impulse_magnitude;
    trace!(impulse_magnitude, "contact impulse");

    a.velocity.linear += impulse * a.inv_mass;
    a.velocity.angular += a.inv_inertia * r_a.perp_dot(impulse);
    b.velocity.linear -= impulse * b.inv_mass;
    b.velocity.angular -= b.inv_inertia * r_b.perp_dot(impulse);
}

/// Resolves the velocity side of one detected collision: a single impulse
/// applied at the midpoint of the (one or two) recorded contact points,
/// rather than once per point, so momentum stays exactly conserved with
/// one shared normal and a single `±n·inv_mass·J` pair.
#[instrument(level = "trace", skip_all)]
pub(crate) fn resolve_collision(
    collision: &Collision,
    center_a: DVec2,
    center_b: DVec2,
    bodies: &mut SlotMap<BodyId, Body>,
    restitution: f64,
) {
    let [a, b] = match bodies.get_disjoint_mut([collision.body_a, collision.body_b]) {
        Some(pair) => pair,
        None => {
            warn!("collision referenced a missing body, skipping");
            return;
        }
    };
    apply_contact_impulse(
        a,
        b,
        center_a,
        center_b,
        collision.normal,
        collision.contacts.midpoint(),
        restitution,
    );
}

/// Pushes the two bodies apart along the collision normal, split by
/// inverse mass so a light body resting on a heavy one moves more than the
/// heavy one does, and a static body never moves at all.
pub(crate) fn correct_positions(collision: &Collision, bodies: &mut SlotMap<BodyId, Body>) {
    let [a, b] = match bodies.get_disjoint_mut([collision.body_a, collision.body_b]) {
        Some(pair) => pair,
        None => return,
    };
    let inverse_mass_sum = a.inv_mass + b.inv_mass;
    if inverse_mass_sum <= 0.0 {
        return;
    }
    let mtv = collision.normal * collision.depth;
    a.pose.position += mtv * (a.inv_mass / inverse_mass_sum);
    b.pose.position -= mtv * (b.inv_mass / inverse_mass_sum);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Pose, Velocity};
    use crate::geometry::{Contacts, ShapeId};
    use glam::dvec2;

    fn body(pos: DVec2, vel: DVec2, inv_mass: f64) -> Body {
        Body {
            pose: Pose {
                position: pos,
                angle: 0.0,
            },
            velocity: Velocity {
                linear: vel,
                angular: 0.0,
            },
            acceleration: DVec2::ZERO,
            inv_mass,
            inv_inertia: 0.0,
            scale: DVec2::ONE,
            shape: ShapeId::default(),
        }
    }

    #[test]
    fn head_on_collision_reverses_approach_velocity_with_full_restitution() {
        let mut bodies: SlotMap<BodyId, Body> = SlotMap::with_key();
        let a = bodies.insert(body(dvec2(-1.0, 0.0), dvec2(1.0, 0.0), 1.0));
        let b = bodies.insert(body(dvec2(1.0, 0.0), dvec2(-1.0, 0.0), 1.0));
        let collision = Collision {
            body_a: a,
            body_b: b,
            normal: dvec2(-1.0, 0.0),
            depth: 0.1,
            contacts: Contacts::single(DVec2::ZERO),
        };
        resolve_collision(
            &collision,
            dvec2(-1.0, 0.0),
            dvec2(1.0, 0.0),
            &mut bodies,
            1.0,
        );
        assert!(bodies[a].velocity.linear.x < 0.0);
        assert!(bodies[b].velocity.linear.x > 0.0);
    }

    #[test]
    fn separating_bodies_are_left_alone() {
        let mut bodies: SlotMap<BodyId, Body> = SlotMap::with_key();
        let a = bodies.insert(body(dvec2(-1.0, 0.0), dvec2(-1.0, 0.0), 1.0));
        let b = bodies.insert(body(dvec2(1.0, 0.0), dvec2(1.0, 0.0), 1.0));
        let collision = Collision {
            body_a: a,
            body_b: b,
            normal: dvec2(-1.0, 0.0),
            depth: 0.1,
            contacts: Contacts::single(DVec2::ZERO),
        };
        resolve_collision(
            &collision,
            dvec2(-1.0, 0.0),
            dvec2(1.0, 0.0),
            &mut bodies,
            1.0,
        );
        assert_eq!(bodies[a].velocity.linear, dvec2(-1.0, 0.0));
        assert_eq!(bodies[b].velocity.linear, dvec2(1.0, 0.0));
    }

    #[test]
    fn momentum_is_conserved_across_the_impulse() {
        let mut bodies: SlotMap<BodyId, Body> = SlotMap::with_key();
        let a = bodies.insert(body(dvec2(-1.0, 0.0), dvec2(2.0, 0.0), 1.0));
        let b = bodies.insert(body(dvec2(1.0, 0.0), dvec2(-0.5, 0.0), 0.5));
        let before = bodies[a].velocity.linear / bodies[a].inv_mass
            + bodies[b].velocity.linear / bodies[b].inv_mass;
        let collision = Collision {
            body_a: a,
            body_b: b,
            normal: dvec2(-1.0, 0.0),
            depth: 0.1,
            contacts: Contacts::single(DVec2::ZERO),
        };
        resolve_collision(
            &collision,
            dvec2(-1.0, 0.0),
            dvec2(1.0, 0.0),
            &mut bodies,
            0.5,
        );
        let after = bodies[a].velocity.linear / bodies[a].inv_mass
            + bodies[b].velocity.linear / bodies[b].inv_mass;
        assert!((before - after).length() < 1e-9);
    }

    #[test]
    fn static_body_never_moves_during_position_correction() {
        let mut bodies: SlotMap<BodyId, Body> = SlotMap::with_key();
        let a = bodies.insert(body(dvec2(0.0, 0.0), DVec2::ZERO, 1.0));
        let b = bodies.insert(body(dvec2(0.5, 0.0), DVec2::ZERO, 0.0));
        let collision = Collision {
            body_a: a,
            body_b: b,
            normal: dvec2(-1.0, 0.0),
            depth: 0.5,
            contacts: Contacts::single(dvec2(0.25, 0.0)),
        };
        correct_positions(&collision, &mut bodies);
        assert_eq!(bodies[b].pose.position, dvec2(0.5, 0.0));
        assert!(bodies[a].pose.position.x < 0.0);
    }
}
