//! Piecewise-linear interpolation of survey quantities onto a regular grid.
//!
//! The (distance, depth) positions are triangulated once; each quantity is then
//! evaluated at every grid node with the affine interpolant of the enclosing
//! triangle. Nodes outside the convex hull of the samples stay undefined.

use rayon::prelude::*;
use thiserror::Error;

use super::triangulation::{Triangulation, TriangulationError};
use crate::core::grid::Grid;
use crate::core::loaders::{Quantity, SampleSet};

/// Errors that can occur during interpolation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("Cannot interpolate an empty sample set")]
    NoSamples,

    #[error("Grid resolution must be at least 1")]
    InvalidResolution,

    #[error("Expected {expected} values, found {found}")]
    ValueCount { expected: usize, found: usize },

    #[error("Triangulation failed: {0}")]
    Triangulation(#[from] TriangulationError),
}

/// Result type for interpolation operations.
pub type Result<T> = std::result::Result<T, InterpolationError>;

/// Linear interpolant of one value column over a triangulation.
pub struct LinearInterpolator<'a> {
    triangulation: &'a Triangulation,
    values: &'a [f64],
}

impl<'a> LinearInterpolator<'a> {
    /// Pairs a triangulation with values indexed like its input points.
    ///
    /// # Errors
    ///
    /// Returns `ValueCount` if any triangle references a value past the end
    /// of `values`.
    pub fn new(triangulation: &'a Triangulation, values: &'a [f64]) -> Result<Self> {
        let needed = (0..triangulation.num_triangles())
            .flat_map(|t| triangulation.source_vertices(t))
            .max()
            .map_or(0, |m| m + 1);
        if values.len() < needed {
            return Err(InterpolationError::ValueCount {
                expected: needed,
                found: values.len(),
            });
        }
        Ok(Self {
            triangulation,
            values,
        })
    }

    /// Value at `(x, y)`, or `None` outside the convex hull.
    pub fn evaluate(&self, x: f64, y: f64) -> Option<f64> {
        let hit = self.triangulation.locate(x, y)?;
        let [a, b, c] = self.triangulation.source_vertices(hit.triangle);
        let [wa, wb, wc] = hit.weights;
        Some(wa * self.values[a] + wb * self.values[b] + wc * self.values[c])
    }

    /// Evaluate every node of `grid`, row-major.
    ///
    /// Rows are processed in parallel; the result does not depend on
    /// scheduling.
    pub fn evaluate_grid(&self, grid: &Grid) -> Vec<Option<f64>> {
        let xs = grid.xs();
        grid.ys()
            .par_iter()
            .flat_map_iter(|&y| xs.iter().map(move |&x| self.evaluate(x, y)))
            .collect()
    }
}

/// Interpolated values of one quantity over a grid.
#[derive(Debug, Clone)]
pub struct InterpolatedField {
    pub quantity: Quantity,
    grid: Grid,
    values: Vec<Option<f64>>,
}

impl InterpolatedField {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Row-major node values; `None` marks nodes outside the sample hull.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value at (`row`, `col`), `None` when undefined or out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let n = self.grid.resolution();
        if row >= n || col >= n {
            return None;
        }
        self.values[row * n + col]
    }

    /// Value at the grid node nearest to `(x, y)`, if it lies on the grid.
    pub fn value_near(&self, x: f64, y: f64) -> Option<f64> {
        let xs = self.grid.xs();
        let ys = self.grid.ys();
        let col = nearest_index(xs, x)?;
        let row = nearest_index(ys, y)?;
        self.get(row, col)
    }

    /// Number of nodes with a defined value.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Minimum and maximum of the defined values.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

fn nearest_index(axis: &[f64], v: f64) -> Option<usize> {
    axis.iter()
        .enumerate()
        .min_by(|a, b| (a.1 - v).abs().total_cmp(&(b.1 - v).abs()))
        .map(|(i, _)| i)
}

/// Triangulate the sample positions of a sample set.
pub fn triangulate(samples: &SampleSet) -> Result<Triangulation> {
    if samples.is_empty() {
        return Err(InterpolationError::NoSamples);
    }
    Ok(Triangulation::new(&samples.positions())?)
}

/// Build the evaluation grid spanning the sample extent.
pub fn grid_for(samples: &SampleSet, resolution: usize) -> Result<Grid> {
    if resolution == 0 {
        return Err(InterpolationError::InvalidResolution);
    }
    let extent = samples.extent().ok_or(InterpolationError::NoSamples)?;
    Ok(Grid::new(extent, resolution))
}

/// Interpolate one quantity onto a `resolution × resolution` grid.
///
/// # Arguments
///
/// * `samples` - Survey samples
/// * `quantity` - Column to interpolate
/// * `resolution` - Nodes per axis
///
/// # Errors
///
/// Returns an error if the resolution is zero, or if the sample positions
/// cannot be triangulated (fewer than three distinct points or all collinear).
pub fn interpolate_field(
    samples: &SampleSet,
    quantity: Quantity,
    resolution: usize,
) -> Result<InterpolatedField> {
    let mut fields = interpolate_all(samples, &[quantity], resolution)?;
    fields.pop().ok_or(InterpolationError::NoSamples)
}

/// Interpolate several quantities sharing one triangulation and grid.
pub fn interpolate_all(
    samples: &SampleSet,
    quantities: &[Quantity],
    resolution: usize,
) -> Result<Vec<InterpolatedField>> {
    let grid = grid_for(samples, resolution)?;
    let triangulation = triangulate(samples)?;

    let mut fields = Vec::with_capacity(quantities.len());
    for &quantity in quantities {
        let interpolator = LinearInterpolator::new(&triangulation, samples.values(quantity))?;
        let values = interpolator.evaluate_grid(&grid);

        let field = InterpolatedField {
            quantity,
            grid: grid.clone(),
            values,
        };
        log::info!(
            "{}: {}/{} grid nodes inside the sample hull",
            quantity,
            field.defined_count(),
            grid.len()
        );
        fields.push(field);
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::Sample;

    fn sample(distance: f64, depth: f64, resistivity: f64, conductivity: f64) -> Sample {
        Sample {
            distance,
            depth,
            resistivity,
            conductivity,
        }
    }

    fn triangle_set() -> SampleSet {
        SampleSet::from_samples(&[
            sample(0.0, 0.0, 10.0, 0.1),
            sample(1.0, 0.0, 20.0, 0.2),
            sample(0.0, 1.0, 30.0, 0.3),
        ])
    }

    fn survey_set() -> SampleSet {
        let mut set = SampleSet::with_capacity(64);
        for j in 0..6 {
            for i in 0..10 {
                let x = i as f64 * 3.0 + if j % 2 == 0 { 0.0 } else { 1.5 };
                let y = -(j as f64) * 1.7;
                let rho = 50.0 + 3.0 * x - 7.0 * y + ((i * 7 + j * 3) % 5) as f64;
                set.push(sample(x, y, rho, 1.0 / rho));
            }
        }
        set
    }

    #[test]
    fn test_triangle_end_to_end() {
        let set = triangle_set();
        let tri = triangulate(&set).unwrap();

        let rho = LinearInterpolator::new(&tri, set.values(Quantity::Resistivity)).unwrap();
        let sigma = LinearInterpolator::new(&tri, set.values(Quantity::Conductivity)).unwrap();

        assert_eq!(rho.evaluate(0.0, 0.0), Some(10.0));
        assert_eq!(sigma.evaluate(0.0, 0.0), Some(0.1));
        assert_eq!(rho.evaluate(100.0, 100.0), None);
        assert_eq!(sigma.evaluate(100.0, 100.0), None);
    }

    #[test]
    fn test_triangle_grid_corners() {
        let set = triangle_set();
        let fields = interpolate_all(&set, &Quantity::ALL, 100).unwrap();
        let (rho, sigma) = (&fields[0], &fields[1]);

        assert_eq!(rho.quantity, Quantity::Resistivity);
        assert_eq!(rho.get(0, 0), Some(10.0));
        assert_eq!(rho.get(0, 99), Some(20.0));
        assert_eq!(rho.get(99, 0), Some(30.0));
        // (1, 1) lies outside the triangle.
        assert_eq!(rho.get(99, 99), None);

        assert_eq!(sigma.get(0, 0), Some(0.1));
        assert_eq!(sigma.get(99, 99), None);
    }

    #[test]
    fn test_reproduces_sample_values() {
        let set = survey_set();
        let tri = triangulate(&set).unwrap();
        let interp = LinearInterpolator::new(&tri, set.values(Quantity::Resistivity)).unwrap();

        for s in set.samples() {
            let v = interp.evaluate(s.distance, s.depth).unwrap();
            assert!((v - s.resistivity).abs() < 1e-9, "{} vs {}", v, s.resistivity);
        }
    }

    #[test]
    fn test_linear_field_reproduced_everywhere() {
        // A globally affine quantity must be reproduced exactly inside the hull.
        let survey = survey_set();
        let mut linear = SampleSet::with_capacity(survey.len());
        for s in survey.samples() {
            linear.push(sample(s.distance, s.depth, 2.0 * s.distance - 3.0 * s.depth + 1.0, 0.0));
        }

        let field = interpolate_field(&linear, Quantity::Resistivity, 40).unwrap();
        let grid = field.grid();
        for row in 0..grid.resolution() {
            for col in 0..grid.resolution() {
                if let Some(v) = field.get(row, col) {
                    let (x, y) = grid.node(row, col);
                    assert!((v - (2.0 * x - 3.0 * y + 1.0)).abs() < 1e-9);
                }
            }
        }
        assert!(field.defined_count() > 0);
    }

    #[test]
    fn test_outside_hull_is_undefined() {
        // Diamond: the grid corners lie outside the hull.
        let set = SampleSet::from_samples(&[
            sample(0.0, -1.0, 1.0, 1.0),
            sample(1.0, 0.0, 2.0, 1.0),
            sample(0.0, 1.0, 3.0, 1.0),
            sample(-1.0, 0.0, 4.0, 1.0),
        ]);
        let field = interpolate_field(&set, Quantity::Resistivity, 21).unwrap();
        let grid = field.grid();

        for row in 0..21 {
            for col in 0..21 {
                let (x, y) = grid.node(row, col);
                let inside = x.abs() + y.abs() <= 1.0 + 1e-12;
                assert_eq!(field.get(row, col).is_some(), inside, "node ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_values_stay_within_vertex_range() {
        let set = survey_set();
        let field = interpolate_field(&set, Quantity::Conductivity, 50).unwrap();
        let (lo, hi) = set.value_range(Quantity::Conductivity).unwrap();
        let (flo, fhi) = field.value_range().unwrap();
        assert!(flo >= lo - 1e-9 && fhi <= hi + 1e-9);
    }

    #[test]
    fn test_grid_shape() {
        let set = survey_set();
        let field = interpolate_field(&set, Quantity::Resistivity, 100).unwrap();
        assert_eq!(field.values().len(), 100 * 100);
        let extent = set.extent().unwrap();
        assert!(field.grid().nodes().all(|(x, y)| extent.contains(x, y)));
    }

    #[test]
    fn test_too_few_points() {
        let set = SampleSet::from_samples(&[sample(0.0, 0.0, 1.0, 1.0), sample(1.0, 0.0, 2.0, 0.5)]);
        let err = interpolate_field(&set, Quantity::Resistivity, 10).unwrap_err();
        assert_eq!(
            err,
            InterpolationError::Triangulation(TriangulationError::TooFewPoints { found: 2 })
        );
    }

    #[test]
    fn test_collinear_points() {
        let set = SampleSet::from_samples(&[
            sample(0.0, 0.0, 1.0, 1.0),
            sample(1.0, 1.0, 2.0, 0.5),
            sample(2.0, 2.0, 3.0, 0.3),
            sample(3.0, 3.0, 4.0, 0.25),
        ]);
        let err = interpolate_field(&set, Quantity::Conductivity, 10).unwrap_err();
        assert!(matches!(
            err,
            InterpolationError::Triangulation(TriangulationError::Collinear { .. })
        ));
    }

    #[test]
    fn test_empty_and_zero_resolution() {
        let empty = SampleSet::default();
        assert_eq!(
            interpolate_field(&empty, Quantity::Resistivity, 10).unwrap_err(),
            InterpolationError::NoSamples
        );
        assert_eq!(
            interpolate_field(&triangle_set(), Quantity::Resistivity, 0).unwrap_err(),
            InterpolationError::InvalidResolution
        );
    }

    #[test]
    fn test_value_near() {
        let field = interpolate_field(&triangle_set(), Quantity::Resistivity, 11).unwrap();
        assert_eq!(field.value_near(0.0, 0.0), Some(10.0));
        assert_eq!(field.value_near(0.98, 0.98), None);
    }
}
