//! The simulation container: owns bodies, shapes, and constraints, and
//! drives the fixed-substep update loop.
use glam::{dvec2, DVec2};
use slotmap::SlotMap;
use tracing::{instrument, trace_span};

use crate::body::{Body, BodyId, BodySnapshot, Pose, Velocity};
use crate::constraint::Constraint;
use crate::geometry::{Collision, Shape, ShapeId, ShapeView};
use crate::mass;
use crate::narrowphase;
use crate::solver;

/// Fixed internal substep duration. `World::update` may be called with any
/// `dt`; it substeps at this fixed rate regardless.
pub const TIME_STEP: f64 = 0.001;

/// Default coefficient of restitution, matching the original engine's
/// `resolve_velocities(..., .85f)` call.
pub const DEFAULT_RESTITUTION: f64 = 0.85;

/// Half the side length of the boundary wall rectangles, chosen so large
/// it is never a meaningful collider except along the one inner face that
/// frames the world.
const WALL_HALF_EXTENT: f64 = 1.0e7;

/// Contact depths below this are treated as "not actually overlapping",
/// so position correction and impulses never fire on floating-point noise.
const CONTACT_EPSILON: f64 = 1e-6;

#[derive(Clone)]
pub struct World {
    bodies: SlotMap<BodyId, Body>,
    shapes: SlotMap<ShapeId, Shape>,
    constraints: Vec<Constraint>,
    collisions: Vec<Collision>,
    gravity: f64,
    width: f64,
    height: f64,
    restitution: f64,
    residual_dt: f64,
}

impl World {
    /// Builds an empty world of the given size and installs four static
    /// walls framing the rectangle `[0, width] x [0, height]`.
    pub fn new(width: f64, height: f64, gravity: f64) -> World {
        let mut world = World {
            bodies: SlotMap::with_key(),
            shapes: SlotMap::with_key(),
            constraints: Vec::new(),
            collisions: Vec::new(),
            gravity,
            width,
            height,
            restitution: DEFAULT_RESTITUTION,
            residual_dt: 0.0,
        };
        world.add_walls();
        world
    }

    fn add_walls(&mut self) {
        let wall_shape = self.add_shape(
            Shape::polygon(vec![
                dvec2(-1.0, -1.0),
                dvec2(1.0, -1.0),
                dvec2(1.0, 1.0),
                dvec2(-1.0, 1.0),
            ])
            .expect("unit square is always a valid convex polygon"),
        );
        let half_width = self.width / 2.0;
        let half_height = self.height / 2.0;

        // Bottom: top edge flush with y = 0.
        self.add_static(
            wall_shape,
            dvec2(half_width, -WALL_HALF_EXTENT),
            0.0,
            dvec2(half_width + WALL_HALF_EXTENT, WALL_HALF_EXTENT),
        );
        // Top: bottom edge flush with y = height.
        self.add_static(
            wall_shape,
            dvec2(half_width, self.height + WALL_HALF_EXTENT),
            0.0,
            dvec2(half_width + WALL_HALF_EXTENT, WALL_HALF_EXTENT),
        );
        // Left: right edge flush with x = 0.
        self.add_static(
            wall_shape,
            dvec2(-WALL_HALF_EXTENT, half_height),
            0.0,
            dvec2(WALL_HALF_EXTENT, half_height + WALL_HALF_EXTENT),
        );
        // Right: left edge flush with x = width.
        self.add_static(
            wall_shape,
            dvec2(self.width + WALL_HALF_EXTENT, half_height),
            0.0,
            dvec2(WALL_HALF_EXTENT, half_height + WALL_HALF_EXTENT),
        );
    }

    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        self.shapes.insert(shape)
    }

    /// Adds a finite-mass body. `inv_inertia` is derived from the shape's
    /// real second moment (see [`crate::mass`]), not a placeholder.
    pub fn add_dynamic(
        &mut self,
        shape: ShapeId,
        pos: DVec2,
        vel: DVec2,
        angle: f64,
        omega: f64,
        mass: f64,
        scale: DVec2,
    ) -> BodyId {
        let moment = mass::moment_of_inertia(&self.shapes[shape], scale, mass);
        let inv_inertia = if moment > 1e-12 { 1.0 / moment } else { 0.0 };
        self.bodies.insert(Body {
            pose: Pose {
                position: pos,
                angle,
            },
            velocity: Velocity {
                linear: vel,
                angular: omega,
            },
            acceleration: dvec2(0.0, self.gravity),
            inv_mass: 1.0 / mass,
            inv_inertia,
            scale,
            shape,
        })
    }

    pub fn add_static(&mut self, shape: ShapeId, pos: DVec2, angle: f64, scale: DVec2) -> BodyId {
        self.bodies.insert(Body {
            pose: Pose {
                position: pos,
                angle,
            },
            velocity: Velocity::default(),
            acceleration: DVec2::ZERO,
            inv_mass: 0.0,
            inv_inertia: 0.0,
            scale,
            shape,
        })
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    pub fn set_restitution(&mut self, restitution: f64) {
        self.restitution = restitution;
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, BodySnapshot)> + '_ {
        self.bodies.iter().map(|(id, b)| (id, BodySnapshot::from(b)))
    }

    pub fn body(&self, id: BodyId) -> Option<BodySnapshot> {
        self.bodies.get(id).map(BodySnapshot::from)
    }

    fn shape_view(&self, body: &Body) -> ShapeView<'_> {
        ShapeView::new(&self.shapes[body.shape], body.pose.position, body.scale, body.pose.angle)
    }

    /// Advances the simulation by `dt` seconds, substepping internally at
    /// [`TIME_STEP`]. Accumulates leftover time across calls so a run of
    /// sub-`TIME_STEP` calls still eventually advances the world, rather
    /// than silently dropping them.
    #[instrument(level = "trace", skip_all)]
    pub fn update(&mut self, dt: f64) {
        self.residual_dt += dt;
        while self.residual_dt >= TIME_STEP {
            self.residual_dt -= TIME_STEP;
            self.step_internal();
        }
    }

    fn step_internal(&mut self) {
        self.integrate();
        self.resolve_overlaps();
        self.apply_constraints();
        self.apply_impulses();
    }

    fn integrate(&mut self) {
        for body in self.bodies.values_mut() {
            if !body.is_dynamic() {
                continue;
            }
            body.acceleration = dvec2(0.0, self.gravity);
            body.integrate(TIME_STEP);
        }
    }

    #[instrument(level = "trace", skip_all)]
    fn resolve_overlaps(&mut self) {
        self.collisions.clear();

        let mut ids: Vec<BodyId> = self.bodies.keys().collect();
        ids.sort_by(|&a, &b| {
            let ya = self.bodies[a].pose.position.y;
            let yb = self.bodies[b].pose.position.y;
            yb.partial_cmp(&ya).unwrap()
        });

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let id_a = ids[i];
                let id_b = ids[j];
                if !self.bodies[id_a].is_dynamic() && !self.bodies[id_b].is_dynamic() {
                    continue;
                }

                let view_a = self.shape_view(&self.bodies[id_a]);
                let view_b = self.shape_view(&self.bodies[id_b]);
                let Some(detected) = narrowphase::collide(&view_a, &view_b) else {
                    continue;
                };
                if detected.depth < CONTACT_EPSILON {
                    continue;
                }

                let collision = Collision {
                    body_a: id_a,
                    body_b: id_b,
                    normal: detected.normal,
                    depth: detected.depth,
                    contacts: detected.contacts,
                };
                solver::correct_positions(&collision, &mut self.bodies);
                self.collisions.push(collision);
            }
        }
    }

    fn apply_constraints(&mut self) {
        let span = trace_span!("apply_constraints");
        let _enter = span.enter();
        for constraint in &self.constraints {
            constraint.apply(TIME_STEP, &mut self.bodies);
        }
    }

    fn apply_impulses(&mut self) {
        let span = trace_span!("apply_impulses");
        let _enter = span.enter();
        for collision in &self.collisions {
            let center_a = self.shape_view(&self.bodies[collision.body_a]).center();
            let center_b = self.shape_view(&self.bodies[collision.body_b]).center();
            solver::resolve_collision(
                collision,
                center_a,
                center_b,
                &mut self.bodies,
                self.restitution,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_falling_body_comes_to_rest_on_the_floor() {
        let mut world = World::new(10.0, 10.0, -9.8);
        let shape = world.add_shape(Shape::circle());
        let body = world.add_dynamic(
            shape,
            dvec2(5.0, 5.0),
            DVec2::ZERO,
            0.0,
            0.0,
            1.0,
            DVec2::ONE,
        );
        for _ in 0..5000 {
            world.update(0.016);
        }
        let snapshot = world.body(body).unwrap();
        assert!(snapshot.pose.position.y > 0.0);
        assert!(snapshot.velocity.linear.y.abs() < 1.0);
    }

    #[test]
    fn static_bodies_are_never_mutated_by_update() {
        let mut world = World::new(10.0, 10.0, -9.8);
        let shape = world.add_shape(Shape::circle());
        let wall = world.add_static(shape, dvec2(5.0, 0.0), 0.0, DVec2::ONE);
        let before = world.body(wall).unwrap();
        for _ in 0..100 {
            world.update(0.016);
        }
        let after = world.body(wall).unwrap();
        assert_eq!(before.pose.position, after.pose.position);
        assert_eq!(before.velocity.linear, after.velocity.linear);
    }

    #[test]
    fn sub_timestep_updates_accumulate_into_motion() {
        let mut world = World::new(10.0, 10.0, -9.8);
        let shape = world.add_shape(Shape::circle());
        let body = world.add_dynamic(
            shape,
            dvec2(5.0, 5.0),
            DVec2::ZERO,
            0.0,
            0.0,
            1.0,
            DVec2::ONE,
        );
        for _ in 0..2000 {
            world.update(TIME_STEP / 4.0);
        }
        let snapshot = world.body(body).unwrap();
        assert!(snapshot.pose.position.y < 5.0);
    }
}
