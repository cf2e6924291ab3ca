//! A 2D rigid-body physics core: convex shape support mappings, GJK/EPA
//! narrow-phase collision detection, a fixed-substep integrator, and a
//! restitution-based impulse solver with distance/rope constraints.
//!
//! The simulation is synchronous and single-threaded; see [`World`] for
//! the entry point.

pub mod body;
pub mod constraint;
pub mod error;
pub mod geometry;
pub mod mass;
pub mod narrowphase;
pub mod solver;
pub mod world;

pub use body::{Body, BodyId, BodySnapshot, Pose, Velocity};
pub use constraint::Constraint;
pub use error::ShapeError;
pub use geometry::{Collision, Contacts, Shape, ShapeId, ShapeView};
pub use world::World;
