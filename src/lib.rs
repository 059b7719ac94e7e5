//! Electrical resistivity tomography plotting pipeline.
//!
//! This crate provides tools for:
//! - Loading whitespace-delimited ERT survey files (distance, depth, resistivity, conductivity)
//! - Delaunay triangulation of the sample positions
//! - Piecewise-linear interpolation of a quantity onto a regular grid (parallelized)
//! - Rendering interpolated sections with a color bar and selection polygons
//! - Exporting figures as PNG with a recorded pixel density
//!
//! # Example
//!
//! ```no_run
//! use ert_tomo::{FigureLayout, Quantity, Session, TomographyConfig};
//!
//! let mut session = Session::new(TomographyConfig::default());
//! session.open("survey.dat").unwrap();
//! let written = session.plot_figures(&Quantity::ALL, FigureLayout::Combined).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod session;
pub mod visualization;

pub use config::{GridConfig, OutputConfig, PlotConfig, TomographyConfig};
pub use core::loaders::{Quantity, Sample, SampleSet};
pub use session::{FigureLayout, Session, SessionError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
