//! Core data types and I/O operations.

pub mod grid;
pub mod loaders;
pub mod writers;

pub use grid::{Extent, Grid};
pub use loaders::{load_samples, LoadError, Quantity, Sample, SampleSet};
pub use writers::{format_table, write_field_csv, WriteError};
