//! Plotting session.
//!
//! A session owns the active survey, the fields interpolated from it and one
//! polygon selector per quantity. Every pipeline step takes the session
//! explicitly; there is no global "current file".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::TomographyConfig;
use crate::core::loaders::{load_samples, LoadError, Quantity, SampleSet};
use crate::core::writers::{format_table, write_field_csv, WriteError};
use crate::processors::interpolation::{interpolate_all, InterpolatedField, InterpolationError};
use crate::visualization::{
    self, Canvas, ExportError, FieldPanel, PolygonSelector, RenderError, SelectionPolygon,
};

/// Errors surfaced by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No data file is open")]
    NoData,

    #[error("Failed to load data: {0}")]
    Load(#[from] LoadError),

    #[error("Interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// How figures are written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureLayout {
    /// All quantities stacked in one figure.
    Combined,
    /// One figure per quantity.
    Split,
}

/// State shared by consecutive plotting actions.
#[derive(Debug, Default)]
pub struct Session {
    config: TomographyConfig,
    samples: Option<SampleSet>,
    fields: BTreeMap<Quantity, InterpolatedField>,
    selectors: BTreeMap<Quantity, PolygonSelector>,
}

impl Session {
    pub fn new(config: TomographyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TomographyConfig {
        &self.config
    }

    /// Mutable configuration; cached fields are recomputed if the grid
    /// resolution changes.
    pub fn config_mut(&mut self) -> &mut TomographyConfig {
        &mut self.config
    }

    /// Load a survey file and make it the active data set.
    ///
    /// On failure the previously opened data stays active and the error is
    /// returned unlogged.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<&SampleSet> {
        let path = path.as_ref();
        let samples = load_samples(path)?;

        log::info!("Opened {} ({} samples)", path.display(), samples.len());
        self.fields.clear();
        Ok(&*self.samples.insert(samples))
    }

    /// Active data set, if a file has been opened.
    pub fn samples(&self) -> Option<&SampleSet> {
        self.samples.as_ref()
    }

    /// Path of the active data file.
    pub fn source_path(&self) -> Option<&Path> {
        self.samples.as_ref()?.source_path.as_deref()
    }

    /// Interpolate the requested quantities, reusing cached fields.
    pub fn interpolate(&mut self, quantities: &[Quantity]) -> Result<()> {
        let samples = self.samples.as_ref().ok_or(SessionError::NoData)?;
        let resolution = self.config.grid.resolution;

        let missing: Vec<Quantity> = quantities
            .iter()
            .copied()
            .filter(|q| {
                self.fields
                    .get(q)
                    .map_or(true, |f| f.grid().resolution() != resolution)
            })
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        for field in interpolate_all(samples, &missing, resolution)? {
            self.fields.insert(field.quantity, field);
        }
        Ok(())
    }

    /// Last interpolated field of a quantity.
    pub fn field(&self, quantity: Quantity) -> Option<&InterpolatedField> {
        self.fields.get(&quantity)
    }

    /// Completion handler for a polygon traced over a quantity's plot.
    ///
    /// Returns `true` if the polygon was committed.
    pub fn commit_selection(&mut self, quantity: Quantity, vertices: Vec<(f64, f64)>) -> bool {
        self.selectors.entry(quantity).or_default().commit(vertices)
    }

    /// Polygons committed for a quantity.
    pub fn selections(&self, quantity: Quantity) -> &[SelectionPolygon] {
        self.selectors
            .get(&quantity)
            .map(|s| s.polygons())
            .unwrap_or(&[])
    }

    pub fn clear_selections(&mut self, quantity: Quantity) {
        if let Some(selector) = self.selectors.get_mut(&quantity) {
            selector.clear();
        }
    }

    /// Render the requested quantities onto one canvas.
    pub fn render(&mut self, quantities: &[Quantity]) -> Result<Canvas> {
        self.interpolate(quantities)?;
        let samples = self.samples.as_ref().ok_or(SessionError::NoData)?;

        let mut panels = Vec::with_capacity(quantities.len());
        for q in quantities {
            let field = self.fields.get(q).ok_or(SessionError::NoData)?;
            panels.push(FieldPanel {
                field,
                samples,
                selections: self
                    .selectors
                    .get(q)
                    .map(|s| s.polygons())
                    .unwrap_or(&[]),
            });
        }

        Ok(visualization::render(&panels, &self.config.plot)?)
    }

    /// Render and save figures, returning the written paths.
    ///
    /// Existing files are overwritten.
    pub fn plot_figures(
        &mut self,
        quantities: &[Quantity],
        layout: FigureLayout,
    ) -> Result<Vec<PathBuf>> {
        let plot = self.config.plot.clone();
        let output = self.config.output.clone();

        let mut written = Vec::new();
        match layout {
            FigureLayout::Combined => {
                let path = output.combined_path();
                self.render(quantities)?
                    .save_png(&path, plot.dpi, plot.tight)?;
                written.push(path);
            }
            FigureLayout::Split => {
                for &q in quantities {
                    let path = output.split_path(q.key());
                    self.render(&[q])?.save_png(&path, plot.dpi, plot.tight)?;
                    written.push(path);
                }
            }
        }
        Ok(written)
    }

    /// Export an interpolated field as CSV.
    pub fn export_grid(&mut self, quantity: Quantity, path: &Path) -> Result<()> {
        self.interpolate(&[quantity])?;
        let field = self.fields.get(&quantity).ok_or(SessionError::NoData)?;
        write_field_csv(path, field)?;
        Ok(())
    }

    /// Tabular view of the active data.
    pub fn table(&self) -> Result<String> {
        let samples = self.samples.as_ref().ok_or(SessionError::NoData)?;
        Ok(format_table(samples))
    }
}
