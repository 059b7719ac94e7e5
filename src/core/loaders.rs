//! Loader for whitespace-delimited survey files.
//!
//! A survey file holds one observation per line with four numeric columns:
//! distance, depth, resistivity and conductivity. There is no header. Blank
//! lines and lines starting with `#` are ignored.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::grid::Extent;

/// Number of columns in a survey row.
pub const SURVEY_COLUMNS: usize = 4;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Line {line}: expected {expected} columns, found {found}")]
    WrongWidth {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: expected {expected} columns like the first row, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}, column {column}: invalid number '{value}'")]
    Parse {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("Column length mismatch: {0}")]
    LengthMismatch(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Physical quantity carried by a survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quantity {
    Resistivity,
    Conductivity,
}

impl Quantity {
    /// Both quantities in display order.
    pub const ALL: [Quantity; 2] = [Quantity::Resistivity, Quantity::Conductivity];

    /// Human readable label used for titles and color bars.
    pub fn label(self) -> &'static str {
        match self {
            Quantity::Resistivity => "Resistivity",
            Quantity::Conductivity => "Conductivity",
        }
    }

    /// Lowercase key used in file names and CSV headers.
    pub fn key(self) -> &'static str {
        match self {
            Quantity::Resistivity => "resistivity",
            Quantity::Conductivity => "conductivity",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One survey observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub distance: f64,
    pub depth: f64,
    pub resistivity: f64,
    pub conductivity: f64,
}

impl Sample {
    /// Value of the given quantity.
    #[inline]
    pub fn value(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Resistivity => self.resistivity,
            Quantity::Conductivity => self.conductivity,
        }
    }
}

/// Column-oriented survey data loaded from one source.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    distance: Vec<f64>,
    depth: Vec<f64>,
    resistivity: Vec<f64>,
    conductivity: Vec<f64>,
    /// Field text of every row as it was read.
    text: Vec<[String; SURVEY_COLUMNS]>,
    /// Source file path.
    pub source_path: Option<PathBuf>,
}

impl SampleSet {
    /// Creates a sample set from its four columns.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::LengthMismatch` if the columns differ in length.
    pub fn from_columns(
        distance: Vec<f64>,
        depth: Vec<f64>,
        resistivity: Vec<f64>,
        conductivity: Vec<f64>,
    ) -> Result<Self> {
        let n = distance.len();
        if depth.len() != n || resistivity.len() != n || conductivity.len() != n {
            return Err(LoadError::LengthMismatch(format!(
                "distance={}, depth={}, resistivity={}, conductivity={}",
                n,
                depth.len(),
                resistivity.len(),
                conductivity.len()
            )));
        }
        let text = (0..n)
            .map(|i| {
                [distance[i], depth[i], resistivity[i], conductivity[i]].map(|v| v.to_string())
            })
            .collect();
        Ok(Self {
            distance,
            depth,
            resistivity,
            conductivity,
            text,
            source_path: None,
        })
    }

    /// Creates a sample set from individual samples.
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut set = Self::with_capacity(samples.len());
        for s in samples {
            set.push(*s);
        }
        set
    }

    /// Creates an empty sample set with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            distance: Vec::with_capacity(capacity),
            depth: Vec::with_capacity(capacity),
            resistivity: Vec::with_capacity(capacity),
            conductivity: Vec::with_capacity(capacity),
            text: Vec::with_capacity(capacity),
            source_path: None,
        }
    }

    /// Appends a sample, keeping all columns aligned.
    ///
    /// The row text is the shortest representation of each value.
    #[inline]
    pub fn push(&mut self, sample: Sample) {
        let text = [
            sample.distance,
            sample.depth,
            sample.resistivity,
            sample.conductivity,
        ]
        .map(|v| v.to_string());
        self.push_with_text(sample, text);
    }

    fn push_with_text(&mut self, sample: Sample, text: [String; SURVEY_COLUMNS]) {
        self.text.push(text);
        self.distance.push(sample.distance);
        self.depth.push(sample.depth);
        self.resistivity.push(sample.resistivity);
        self.conductivity.push(sample.conductivity);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.distance.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    pub fn depth(&self) -> &[f64] {
        &self.depth
    }

    /// Column of the given quantity.
    pub fn values(&self, quantity: Quantity) -> &[f64] {
        match quantity {
            Quantity::Resistivity => &self.resistivity,
            Quantity::Conductivity => &self.conductivity,
        }
    }

    /// Sample at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Sample> {
        if index >= self.len() {
            return None;
        }
        Some(Sample {
            distance: self.distance[index],
            depth: self.depth[index],
            resistivity: self.resistivity[index],
            conductivity: self.conductivity[index],
        })
    }

    /// Field text of row `index` exactly as it appeared in the source.
    pub fn row_text(&self, index: usize) -> Option<&[String; SURVEY_COLUMNS]> {
        self.text.get(index)
    }

    /// Iterates over the samples in load order.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// (distance, depth) position of every sample.
    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.distance
            .iter()
            .zip(self.depth.iter())
            .map(|(&x, &y)| (x, y))
            .collect()
    }

    /// Bounding extent of the sample positions, `None` when empty.
    pub fn extent(&self) -> Option<Extent> {
        Extent::from_points(self.distance.iter().copied().zip(self.depth.iter().copied()))
    }

    /// Minimum and maximum of a quantity column, `None` when empty.
    pub fn value_range(&self, quantity: Quantity) -> Option<(f64, f64)> {
        let values = self.values(quantity);
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}

/// Load a survey file.
///
/// Every data row must hold exactly four numeric fields separated by
/// whitespace. Rows must all have the same width as the first one.
///
/// # Arguments
///
/// * `path` - Path to the survey file
///
/// # Errors
///
/// Returns an error if the file is missing or unreadable, if any field fails
/// to parse, or if a row has the wrong number of columns.
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<SampleSet> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let mut set = parse_samples(BufReader::new(file))?;

    if set.is_empty() {
        return Err(LoadError::EmptyFile(path.to_path_buf()));
    }

    log::debug!("Loaded {} samples from {}", set.len(), path.display());
    set.source_path = Some(path.to_path_buf());
    Ok(set)
}

/// Parse survey rows from any buffered reader.
pub fn parse_samples<R: BufRead>(reader: R) -> Result<SampleSet> {
    let mut set = SampleSet::with_capacity(1024);
    let mut first_width: Option<usize> = None;
    let mut row = [0.0f64; SURVEY_COLUMNS];

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = stripped.split_whitespace().collect();
        match first_width {
            None => {
                if fields.len() != SURVEY_COLUMNS {
                    return Err(LoadError::WrongWidth {
                        line: line_no,
                        expected: SURVEY_COLUMNS,
                        found: fields.len(),
                    });
                }
                first_width = Some(fields.len());
            }
            Some(expected) if fields.len() != expected => {
                return Err(LoadError::ColumnCount {
                    line: line_no,
                    expected,
                    found: fields.len(),
                });
            }
            Some(_) => {}
        }

        for (column, field) in fields.iter().enumerate() {
            row[column] = field.parse().map_err(|_| LoadError::Parse {
                line: line_no,
                column: column + 1,
                value: field.to_string(),
            })?;
        }

        set.push_with_text(
            Sample {
                distance: row[0],
                depth: row[1],
                resistivity: row[2],
                conductivity: row[3],
            },
            [0, 1, 2, 3].map(|c| fields[c].to_string()),
        );
    }

    Ok(set)
}
