//! Free-form selection polygons committed over a rendered field.
//!
//! Polygons are annotations only: they are drawn as outlines on every redraw
//! of the field they belong to and are never used to mask or summarise data.

use thiserror::Error;

/// Minimum number of vertices of a committed polygon.
pub const MIN_VERTICES: usize = 3;

/// Errors raised when validating a selection polygon.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("A selection polygon needs at least 3 vertices, got {found}")]
    TooFewVertices { found: usize },

    #[error("Vertex {index} has a non-finite coordinate")]
    NonFinite { index: usize },

    #[error("Vertex '{vertex}' is not of the form x,y with numeric coordinates")]
    Parse { vertex: String },
}

/// Closed polygon in (distance, depth) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolygon {
    vertices: Vec<(f64, f64)>,
}

impl SelectionPolygon {
    /// Validates and wraps the traced vertices.
    pub fn new(vertices: Vec<(f64, f64)>) -> Result<Self, SelectionError> {
        if vertices.len() < MIN_VERTICES {
            return Err(SelectionError::TooFewVertices {
                found: vertices.len(),
            });
        }
        if let Some(index) = vertices
            .iter()
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(SelectionError::NonFinite { index });
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Vertices with the first one repeated at the end.
    pub fn closed_path(&self) -> Vec<(f64, f64)> {
        let mut path = self.vertices.clone();
        path.push(self.vertices[0]);
        path
    }
}

/// Accumulates the polygons committed for one rendered field.
#[derive(Debug, Clone, Default)]
pub struct PolygonSelector {
    committed: Vec<SelectionPolygon>,
}

impl PolygonSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion handler for a traced polygon.
    ///
    /// Returns `true` if the polygon was accepted. Rejected polygons are
    /// logged and never drawn.
    pub fn commit(&mut self, vertices: Vec<(f64, f64)>) -> bool {
        match SelectionPolygon::new(vertices) {
            Ok(polygon) => {
                log::debug!(
                    "Committed selection polygon with {} vertices",
                    polygon.vertices().len()
                );
                self.committed.push(polygon);
                true
            }
            Err(e) => {
                log::warn!("Ignoring selection: {}", e);
                false
            }
        }
    }

    /// Committed polygons in commit order.
    pub fn polygons(&self) -> &[SelectionPolygon] {
        &self.committed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn clear(&mut self) {
        self.committed.clear();
    }
}

/// Parse a polygon written as `x,y;x,y;x,y`.
pub fn parse_vertices(text: &str) -> Result<Vec<(f64, f64)>, SelectionError> {
    text.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let parse_err = || SelectionError::Parse {
                vertex: part.to_string(),
            };
            let (x, y) = part.split_once(',').ok_or_else(parse_err)?;
            let x: f64 = x.trim().parse().map_err(|_| parse_err())?;
            let y: f64 = y.trim().parse().map_err(|_| parse_err())?;
            Ok((x, y))
        })
        .collect()
}
