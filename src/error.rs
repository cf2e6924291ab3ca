//! Construction-time errors. The simulation loop itself never fails (see
//! the crate's top-level docs); the one fallible entry point is building an
//! arbitrary [`crate::geometry::Shape::polygon`] from caller-supplied points.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    #[error("polygon needs at least 3 vertices, got {got}")]
    TooFewVertices { got: usize },
    #[error("duplicate vertex at index {index}")]
    DuplicateVertex { index: usize },
    #[error("polygon is not convex at vertex {index}")]
    NotConvex { index: usize },
}
