//! Triangulation and interpolation.

pub mod interpolation;
pub mod triangulation;

// Re-export key types for convenience
pub use interpolation::{
    interpolate_all, interpolate_field, InterpolatedField, InterpolationError, LinearInterpolator,
};
pub use triangulation::{Triangulation, TriangulationError};
