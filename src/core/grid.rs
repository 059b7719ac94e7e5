//! Regular evaluation grid over the survey extent.

/// Axis-aligned bounds of a set of (distance, depth) positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extent {
    /// Bounding extent of the given points, `None` if there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut extent = Extent {
            x_min: x0,
            x_max: x0,
            y_min: y0,
            y_max: y0,
        };
        for (x, y) in iter {
            extent.x_min = extent.x_min.min(x);
            extent.x_max = extent.x_max.max(x);
            extent.y_min = extent.y_min.min(y);
            extent.y_max = extent.y_max.max(y);
        }
        Some(extent)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Whether `(x, y)` lies inside the extent, boundary included.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// `n` evenly spaced values from `start` to `stop`, both included.
///
/// A single value yields `[start]`; zero values yield an empty vector.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the endpoint so it never drifts outside the extent.
            values[n - 1] = stop;
            values
        }
    }
}

/// Regular lattice of `resolution × resolution` evaluation nodes.
///
/// Nodes are addressed row-major: the row index walks the depth axis and the
/// column index walks the distance axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    extent: Extent,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Grid {
    /// Builds the lattice spanning `extent` at `resolution` nodes per axis.
    pub fn new(extent: Extent, resolution: usize) -> Self {
        Self {
            extent,
            xs: linspace(extent.x_min, extent.x_max, resolution),
            ys: linspace(extent.y_min, extent.y_max, resolution),
        }
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Nodes per axis.
    #[inline]
    pub fn resolution(&self) -> usize {
        self.xs.len()
    }

    /// Distance coordinates of the columns.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Depth coordinates of the rows.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Total number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of the node at (`row`, `col`).
    #[inline]
    pub fn node(&self, row: usize, col: usize) -> (f64, f64) {
        (self.xs[col], self.ys[row])
    }

    /// All nodes in row-major order.
    pub fn nodes(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ys
            .iter()
            .flat_map(move |&y| self.xs.iter().map(move |&x| (x, y)))
    }
}
