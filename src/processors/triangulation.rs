//! Delaunay triangulation of scattered survey positions.
//!
//! This module implements an incremental Bowyer-Watson triangulation with:
//! - Normalisation of the input into the unit box before any predicate runs
//! - Adaptive-precision orientation and in-circle predicates, so cocircular
//!   and nearly collinear inputs still yield a partition of the hull
//! - Merging of coincident positions (first occurrence wins)
//! - Explicit rejection of point sets with fewer than three distinct or only
//!   collinear positions
//! - A uniform bucket index for locating the triangle containing a query point
//!
//! # Example
//!
//! ```
//! use ert_tomo::processors::triangulation::Triangulation;
//!
//! let tri = Triangulation::new(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
//! assert_eq!(tri.num_triangles(), 1);
//! assert!(tri.locate(0.2, 0.2).is_some());
//! assert!(tri.locate(5.0, 5.0).is_none());
//! ```

use std::collections::HashMap;

use robust::Coord;
use thiserror::Error;

use crate::core::grid::Extent;

/// Relative tolerance for collinearity, in normalised units.
const COLLINEAR_EPS: f64 = 1e-12;

/// Barycentric slack accepted on triangle edges.
const EDGE_EPS: f64 = 1e-10;

/// Half-size of the enclosing super triangle, in normalised units.
const SUPER_SCALE: f64 = 1.0e4;

/// Errors that can occur while triangulating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriangulationError {
    #[error("At least 3 distinct points are required, found {found}")]
    TooFewPoints { found: usize },

    #[error("All {count} points are collinear")]
    Collinear { count: usize },

    #[error("Point {index} has a non-finite coordinate ({x}, {y})")]
    NonFinite { index: usize, x: f64, y: f64 },
}

/// Result type for triangulation operations.
pub type Result<T> = std::result::Result<T, TriangulationError>;

/// Barycentric weights of a point with respect to one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barycentric {
    /// Triangle index.
    pub triangle: usize,
    /// Weights of the triangle's three vertices, summing to one.
    pub weights: [f64; 3],
}

/// Delaunay triangulation with point location.
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// Normalised vertex positions.
    vertices: Vec<[f64; 2]>,
    /// Index into the caller's point slice for every vertex.
    source_index: Vec<usize>,
    /// Counter-clockwise vertex triples.
    triangles: Vec<[usize; 3]>,
    /// Affine map into the unit box: (x - origin) / scale.
    origin: [f64; 2],
    scale: f64,
    index: BucketIndex,
}

impl Triangulation {
    /// Triangulate the given (x, y) positions.
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate is non-finite, if fewer than three
    /// distinct positions remain, or if all positions lie on one line.
    pub fn new(points: &[(f64, f64)]) -> Result<Self> {
        for (index, &(x, y)) in points.iter().enumerate() {
            if !x.is_finite() || !y.is_finite() {
                return Err(TriangulationError::NonFinite { index, x, y });
            }
        }

        let (unique, source_index) = dedup_points(points);
        if unique.len() < 3 {
            return Err(TriangulationError::TooFewPoints {
                found: unique.len(),
            });
        }
        if unique.len() < points.len() {
            log::warn!(
                "Merged {} coincident positions before triangulating",
                points.len() - unique.len()
            );
        }

        let extent = Extent::from_points(unique.iter().copied()).ok_or(
            TriangulationError::TooFewPoints { found: 0 },
        )?;
        let scale = extent.width().max(extent.height());
        let origin = [extent.x_min, extent.y_min];

        let vertices: Vec<[f64; 2]> = unique
            .iter()
            .map(|&(x, y)| [(x - origin[0]) / scale, (y - origin[1]) / scale])
            .collect();

        if all_collinear(&vertices) {
            return Err(TriangulationError::Collinear {
                count: vertices.len(),
            });
        }

        let triangles = bowyer_watson(&vertices);
        let index = BucketIndex::build(&vertices, &triangles);

        log::debug!(
            "Triangulated {} vertices into {} triangles",
            vertices.len(),
            triangles.len()
        );

        Ok(Self {
            vertices,
            source_index,
            triangles,
            origin,
            scale,
            index,
        })
    }

    /// Number of distinct vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Triangles as triples of indices into the original point slice.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        self.triangles
            .iter()
            .map(|t| t.map(|v| self.source_index[v]))
            .collect()
    }

    /// Find the triangle containing `(x, y)` and its barycentric weights.
    ///
    /// Points on a shared edge resolve to any adjacent triangle. Points
    /// outside the convex hull return `None`.
    pub fn locate(&self, x: f64, y: f64) -> Option<Barycentric> {
        let p = self.normalize(x, y);
        for &t in self.index.candidates(p) {
            if let Some(weights) = self.weights(t, p) {
                return Some(Barycentric {
                    triangle: t,
                    weights,
                });
            }
        }
        None
    }

    /// Original point indices of a triangle's vertices.
    #[inline]
    pub fn source_vertices(&self, triangle: usize) -> [usize; 3] {
        self.triangles[triangle].map(|v| self.source_index[v])
    }

    #[inline]
    fn normalize(&self, x: f64, y: f64) -> [f64; 2] {
        [(x - self.origin[0]) / self.scale, (y - self.origin[1]) / self.scale]
    }

    fn weights(&self, t: usize, p: [f64; 2]) -> Option<[f64; 3]> {
        let [a, b, c] = self.triangles[t];
        let (p1, p2, p3) = (self.vertices[a], self.vertices[b], self.vertices[c]);

        let det = (p2[1] - p3[1]) * (p1[0] - p3[0]) + (p3[0] - p2[0]) * (p1[1] - p3[1]);
        if det == 0.0 {
            return None;
        }
        let w1 = ((p2[1] - p3[1]) * (p[0] - p3[0]) + (p3[0] - p2[0]) * (p[1] - p3[1])) / det;
        let w2 = ((p3[1] - p1[1]) * (p[0] - p3[0]) + (p1[0] - p3[0]) * (p[1] - p3[1])) / det;
        let w3 = 1.0 - w1 - w2;

        if w1 >= -EDGE_EPS && w2 >= -EDGE_EPS && w3 >= -EDGE_EPS {
            Some([w1, w2, w3])
        } else {
            None
        }
    }
}

/// Remove exact duplicates, returning the unique points and their first index.
fn dedup_points(points: &[(f64, f64)]) -> (Vec<(f64, f64)>, Vec<usize>) {
    let mut seen: HashMap<(u64, u64), usize> = HashMap::with_capacity(points.len());
    let mut unique = Vec::with_capacity(points.len());
    let mut source = Vec::with_capacity(points.len());

    for (i, &(x, y)) in points.iter().enumerate() {
        // Adding 0.0 folds -0.0 into +0.0.
        let key = ((x + 0.0).to_bits(), (y + 0.0).to_bits());
        if seen.contains_key(&key) {
            continue;
        }
        seen.insert(key, i);
        unique.push((x, y));
        source.push(i);
    }

    (unique, source)
}

#[inline]
fn coord(p: [f64; 2]) -> Coord<f64> {
    Coord { x: p[0], y: p[1] }
}

/// Twice the signed area of (a, b, c); positive when counter-clockwise.
/// The sign is exact.
#[inline]
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    robust::orient2d(coord(a), coord(b), coord(c))
}

/// Positive when `d` lies strictly inside the circumcircle of ccw (a, b, c).
/// The sign is exact.
#[inline]
fn in_circle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    robust::incircle(coord(a), coord(b), coord(c), coord(d))
}

/// Whether every point lies on the line through the first point and the
/// point farthest from it. Points are in normalised units.
fn all_collinear(vertices: &[[f64; 2]]) -> bool {
    let p0 = vertices[0];
    let far = vertices
        .iter()
        .copied()
        .max_by(|a, b| {
            let da = (a[0] - p0[0]).powi(2) + (a[1] - p0[1]).powi(2);
            let db = (b[0] - p0[0]).powi(2) + (b[1] - p0[1]).powi(2);
            da.total_cmp(&db)
        })
        .unwrap_or(p0);

    let len = ((far[0] - p0[0]).powi(2) + (far[1] - p0[1]).powi(2)).sqrt();
    if len == 0.0 {
        return true;
    }

    vertices
        .iter()
        .all(|&p| (orient(p0, far, p) / len).abs() <= COLLINEAR_EPS)
}

/// Incremental Bowyer-Watson over normalised vertices.
///
/// Returns counter-clockwise triangles referencing `vertices` only.
fn bowyer_watson(vertices: &[[f64; 2]]) -> Vec<[usize; 3]> {
    let n = vertices.len();

    // Super triangle vertices live past the end of the real ones.
    let mut pts: Vec<[f64; 2]> = Vec::with_capacity(n + 3);
    pts.extend_from_slice(vertices);
    pts.push([0.5 - 2.0 * SUPER_SCALE, 0.5 - SUPER_SCALE]);
    pts.push([0.5 + 2.0 * SUPER_SCALE, 0.5 - SUPER_SCALE]);
    pts.push([0.5, 0.5 + 2.0 * SUPER_SCALE]);

    let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];

    // Insert in sorted order for better locality of the cavities.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        vertices[a][0]
            .total_cmp(&vertices[b][0])
            .then(vertices[a][1].total_cmp(&vertices[b][1]))
    });

    let mut edge_count: HashMap<(usize, usize), (usize, usize, u32)> = HashMap::new();

    for &i in &order {
        let p = pts[i];
        edge_count.clear();

        let mut kept = Vec::with_capacity(triangles.len() + 2);
        for tri in triangles.drain(..) {
            let [a, b, c] = tri;
            if in_circle(pts[a], pts[b], pts[c], p) > 0.0 {
                for (u, v) in [(a, b), (b, c), (c, a)] {
                    let key = if u < v { (u, v) } else { (v, u) };
                    edge_count
                        .entry(key)
                        .and_modify(|e| e.2 += 1)
                        .or_insert((u, v, 1));
                }
            } else {
                kept.push(tri);
            }
        }

        // Boundary edges of the cavity keep their ccw direction.
        for &(u, v, count) in edge_count.values() {
            if count == 1 && orient(pts[u], pts[v], p) > 0.0 {
                kept.push([u, v, i]);
            }
        }

        triangles = kept;
    }

    triangles
        .into_iter()
        .filter(|t| t.iter().all(|&v| v < n))
        .collect()
}

/// Uniform bucket grid over the unit box mapping cells to triangles.
#[derive(Debug, Clone)]
struct BucketIndex {
    cells: usize,
    buckets: Vec<Vec<usize>>,
}

impl BucketIndex {
    fn build(vertices: &[[f64; 2]], triangles: &[[usize; 3]]) -> Self {
        let cells = ((triangles.len() as f64).sqrt().ceil() as usize).max(1);
        let mut buckets = vec![Vec::new(); cells * cells];

        for (t, tri) in triangles.iter().enumerate() {
            let xs = tri.map(|v| vertices[v][0]);
            let ys = tri.map(|v| vertices[v][1]);
            let (x0, x1) = (min3(xs) - EDGE_EPS, max3(xs) + EDGE_EPS);
            let (y0, y1) = (min3(ys) - EDGE_EPS, max3(ys) + EDGE_EPS);

            let (c0, c1) = (Self::cell(x0, cells), Self::cell(x1, cells));
            let (r0, r1) = (Self::cell(y0, cells), Self::cell(y1, cells));
            for r in r0..=r1 {
                for c in c0..=c1 {
                    buckets[r * cells + c].push(t);
                }
            }
        }

        Self { cells, buckets }
    }

    #[inline]
    fn cell(v: f64, cells: usize) -> usize {
        let idx = (v * cells as f64).floor();
        if idx < 0.0 {
            0
        } else {
            (idx as usize).min(cells - 1)
        }
    }

    fn candidates(&self, p: [f64; 2]) -> &[usize] {
        // Queries beyond the unit box can only be outside the hull.
        let slack = EDGE_EPS;
        if p[0] < -slack || p[0] > 1.0 + slack || p[1] < -slack || p[1] > 1.0 + slack {
            return &[];
        }
        let c = Self::cell(p[0], self.cells);
        let r = Self::cell(p[1], self.cells);
        &self.buckets[r * self.cells + c]
    }
}

#[inline]
fn min3(v: [f64; 3]) -> f64 {
    v[0].min(v[1]).min(v[2])
}

#[inline]
fn max3(v: [f64; 3]) -> f64 {
    v[0].max(v[1]).max(v[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(nx: usize, ny: usize) -> Vec<(f64, f64)> {
        let mut points = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                points.push((i as f64 * 2.5, -(j as f64) * 1.25));
            }
        }
        points
    }

    fn total_area(tri: &Triangulation) -> f64 {
        tri.triangles
            .iter()
            .map(|&[a, b, c]| orient(tri.vertices[a], tri.vertices[b], tri.vertices[c]) * 0.5)
            .sum::<f64>()
            * tri.scale
            * tri.scale
    }

    #[test]
    fn test_single_triangle() {
        let tri = Triangulation::new(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
        assert_eq!(tri.num_vertices(), 3);
        assert_eq!(tri.num_triangles(), 1);

        let mut verts = tri.triangles()[0];
        verts.sort();
        assert_eq!(verts, [0, 1, 2]);
    }

    #[test]
    fn test_square_splits_into_two() {
        let tri = Triangulation::new(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]).unwrap();
        assert_eq!(tri.num_triangles(), 2);
        assert!((total_area(&tri) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_lattice_covers_hull() {
        let points = lattice(12, 7);
        let tri = Triangulation::new(&points).unwrap();

        // A convex lattice of n points with h on the hull has 2n - h - 2 triangles.
        let hull = 2 * 12 + 2 * 7 - 4;
        assert_eq!(tri.num_triangles(), 2 * points.len() - hull - 2);
        assert!((total_area(&tri) - 11.0 * 2.5 * 6.0 * 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_triangles_are_delaunay() {
        let points: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let t = i as f64;
                ((t * 7.3) % 13.0, (t * 3.1) % 5.0)
            })
            .collect();
        let tri = Triangulation::new(&points).unwrap();

        for &[a, b, c] in &tri.triangles {
            for (v, &p) in tri.vertices.iter().enumerate() {
                if v == a || v == b || v == c {
                    continue;
                }
                let inside = in_circle(tri.vertices[a], tri.vertices[b], tri.vertices[c], p);
                assert!(inside <= 1e-9, "vertex {} inside circumcircle", v);
            }
        }
    }

    #[test]
    fn test_cocircular_points_partition_hull() {
        let n = 200;
        let r = 10.0;
        let points: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let t = i as f64 * std::f64::consts::TAU / n as f64;
                (r * t.cos(), r * t.sin())
            })
            .collect();
        let tri = Triangulation::new(&points).unwrap();

        // Points in convex position: every triangulation has n - 2 triangles.
        assert_eq!(tri.num_triangles(), n - 2);

        let hull_area: f64 = (0..n)
            .map(|i| {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % n];
                x0 * y1 - x1 * y0
            })
            .sum::<f64>()
            * 0.5;
        assert!((total_area(&tri) - hull_area).abs() < 1e-6 * hull_area);

        // Triangles containing an interior query agree on its value (two at
        // most, when it sits on a shared edge).
        let values: Vec<f64> = points.iter().map(|&(x, y)| x * y).collect();
        let p = tri.normalize(1.0, 2.0);
        let estimates: Vec<f64> = (0..tri.num_triangles())
            .filter_map(|t| {
                let w = tri.weights(t, p)?;
                let [a, b, c] = tri.source_vertices(t);
                Some(w[0] * values[a] + w[1] * values[b] + w[2] * values[c])
            })
            .collect();
        assert!(!estimates.is_empty() && estimates.len() <= 2);
        assert!(estimates.iter().all(|v| (v - estimates[0]).abs() < 1e-9));
        assert!(tri.locate(1.0, 2.0).is_some());
    }

    #[test]
    fn test_locate_inside_and_outside() {
        let tri = Triangulation::new(&[(0.0, 0.0), (4.0, 0.0), (0.0, 2.0)]).unwrap();

        let hit = tri.locate(1.0, 0.5).unwrap();
        let sum: f64 = hit.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(hit.weights.iter().all(|&w| w >= 0.0));

        assert!(tri.locate(3.9, 1.9).is_none());
        assert!(tri.locate(-0.1, 0.0).is_none());
        assert!(tri.locate(100.0, 100.0).is_none());
    }

    #[test]
    fn test_locate_vertex_is_exact() {
        let points = lattice(5, 4);
        let tri = Triangulation::new(&points).unwrap();

        for (i, &(x, y)) in points.iter().enumerate() {
            let hit = tri.locate(x, y).unwrap();
            let verts = tri.source_vertices(hit.triangle);
            let slot = verts.iter().position(|&v| v == i).unwrap();
            assert_eq!(hit.weights[slot], 1.0);
        }
    }

    #[test]
    fn test_duplicates_merged() {
        let points = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 0.0), (-0.0, 0.0)];
        let tri = Triangulation::new(&points).unwrap();
        assert_eq!(tri.num_vertices(), 3);
        assert_eq!(tri.num_triangles(), 1);
    }

    #[test]
    fn test_too_few_points() {
        assert_eq!(
            Triangulation::new(&[(0.0, 0.0), (1.0, 1.0)]).unwrap_err(),
            TriangulationError::TooFewPoints { found: 2 }
        );
        assert_eq!(
            Triangulation::new(&[(0.0, 0.0), (1.0, 1.0), (1.0, 1.0)]).unwrap_err(),
            TriangulationError::TooFewPoints { found: 2 }
        );
    }

    #[test]
    fn test_collinear_points() {
        let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        assert_eq!(
            Triangulation::new(&points).unwrap_err(),
            TriangulationError::Collinear { count: 10 }
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = Triangulation::new(&[(0.0, 0.0), (f64::NAN, 0.0), (0.0, 1.0)]);
        assert!(matches!(result, Err(TriangulationError::NonFinite { index: 1, .. })));
    }
}
