//! Configuration types for the tomography pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the interpolation grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of evenly spaced nodes per axis
    #[serde(default = "default_grid_resolution")]
    pub resolution: usize,
}

fn default_grid_resolution() -> usize {
    100
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: default_grid_resolution(),
        }
    }
}

/// Configuration for figure layout and styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Width of one panel in inches
    #[serde(default = "default_width_in")]
    pub width_in: f64,

    /// Height of one panel in inches
    #[serde(default = "default_height_in")]
    pub height_in: f64,

    /// Raster resolution in dots per inch
    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// Opacity of the raw sample scatter overlay (0.0 to 1.0)
    #[serde(default = "default_scatter_alpha")]
    pub scatter_alpha: f64,

    /// Scatter marker radius in pixels
    #[serde(default = "default_marker_size")]
    pub marker_size: u32,

    /// Stroke width of committed selection outlines in pixels
    #[serde(default = "default_selection_width")]
    pub selection_width: u32,

    /// Crop the exported image to its drawn content
    #[serde(default = "default_true")]
    pub tight: bool,

    /// Draw titles, axis descriptions and tick labels
    #[serde(default = "default_true")]
    pub annotate: bool,

    /// Title template, `{quantity}` is replaced by the quantity label
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_x_label")]
    pub x_label: String,

    #[serde(default = "default_y_label")]
    pub y_label: String,
}

fn default_width_in() -> f64 {
    8.0
}

fn default_height_in() -> f64 {
    2.0
}

fn default_dpi() -> u32 {
    300
}

fn default_scatter_alpha() -> f64 {
    0.1
}

fn default_marker_size() -> u32 {
    12
}

fn default_selection_width() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

fn default_title() -> String {
    "2D Electrical {quantity} Tomography".to_string()
}

fn default_x_label() -> String {
    "Distance (m)".to_string()
}

fn default_y_label() -> String {
    "Depth (m)".to_string()
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width_in: default_width_in(),
            height_in: default_height_in(),
            dpi: default_dpi(),
            scatter_alpha: default_scatter_alpha(),
            marker_size: default_marker_size(),
            selection_width: default_selection_width(),
            tight: true,
            annotate: true,
            title: default_title(),
            x_label: default_x_label(),
            y_label: default_y_label(),
        }
    }
}

impl PlotConfig {
    /// Pixel size of a single panel.
    pub fn panel_pixels(&self) -> (u32, u32) {
        let dpi = self.dpi.max(1) as f64;
        let w = (self.width_in * dpi).round().max(1.0) as u32;
        let h = (self.height_in * dpi).round().max(1.0) as u32;
        (w, h)
    }

    /// Render the title template for a quantity label.
    pub fn title_for(&self, quantity_label: &str) -> String {
        self.title.replace("{quantity}", quantity_label)
    }
}

/// Configuration for exported files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the figures are written to
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// File stem shared by all figures
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_stem() -> String {
    "tomography_plot".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            file_stem: default_file_stem(),
        }
    }
}

impl OutputConfig {
    /// Path of the figure holding every rendered quantity.
    pub fn combined_path(&self) -> PathBuf {
        self.directory.join(format!("{}.png", self.file_stem))
    }

    /// Path of the figure for a single quantity.
    pub fn split_path(&self, quantity_key: &str) -> PathBuf {
        self.directory
            .join(format!("{}_{}.png", self.file_stem, quantity_key))
    }
}

/// Main configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomographyConfig {
    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub plot: PlotConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl TomographyConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: TomographyConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Serialize the configuration as YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_yaml_string()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}
