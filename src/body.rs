//! Kinematic/dynamic state of one rigid object.
use glam::DVec2;
use slotmap::new_key_type;

use crate::geometry::ShapeId;

new_key_type! {
    /// Stable handle into a [`crate::world::World`]'s body storage. Indices
    /// rather than references, so inserting a new body never invalidates an
    /// id handed out earlier.
    pub struct BodyId;
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub position: DVec2,
    pub angle: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    pub linear: DVec2,
    pub angular: f64,
}

/// One rigid body: pose, velocity, acceleration, inverse mass/inertia, and
/// a non-owning reference to its shape in the world's shape pool.
///
/// Invariant: a body is dynamic iff `inv_mass > 0.0`. Static bodies
/// (`inv_mass == inv_inertia == 0.0`) are never mutated by the world.
#[derive(Clone, Debug)]
pub struct Body {
    pub pose: Pose,
    pub velocity: Velocity,
    pub acceleration: DVec2,
    pub inv_mass: f64,
    pub inv_inertia: f64,
    pub scale: DVec2,
    pub shape: ShapeId,
}

impl Body {
    pub fn is_dynamic(&self) -> bool {
        self.inv_mass > 0.0
    }

    /// Semi-implicit Euler: velocity first, then position, from `acceleration`.
    /// Static bodies never reach this (callers check `is_dynamic` first).
    pub(crate) fn integrate(&mut self, dt: f64) {
        self.velocity.linear += self.acceleration * dt;
        self.pose.position += self.velocity.linear * dt;
        self.pose.angle += self.velocity.angular * dt;
    }
}

/// A read-only copy of a body's externally visible state, returned by
/// [`crate::world::World::bodies`] so callers can never observe (or cause)
/// a half-mutated body mid-step.
#[derive(Clone, Copy, Debug)]
pub struct BodySnapshot {
    pub pose: Pose,
    pub velocity: Velocity,
    pub scale: DVec2,
    pub shape: ShapeId,
}

impl From<&Body> for BodySnapshot {
    fn from(b: &Body) -> Self {
        BodySnapshot {
            pose: b.pose,
            velocity: b.velocity,
            scale: b.scale,
            shape: b.shape,
        }
    }
}
