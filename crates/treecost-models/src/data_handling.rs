//! Data structures and helpers for tree census records and encoded datasets.
//!
//! This module defines `TreeRecord`/`TreeTable` (the raw census view),
//! `FeatureMatrix`/`Dataset` (the encoded view) and the helpers used to clean
//! the census and to split a dataset into training and evaluation rows.
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::validate_fraction;
use crate::error::{PipelineError, Result};

pub const DIAMETER_COLUMN: &str = "tree_dbh";
pub const HEALTH_COLUMN: &str = "health";
pub const SPECIES_COLUMN: &str = "spc_common";
pub const COST_COLUMN: &str = "estimated_cost";

/// One observed street tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeRecord {
    /// Trunk diameter in inches.
    pub diameter: Option<f64>,
    pub health: Option<String>,
    pub species: Option<String>,
}

impl TreeRecord {
    pub fn new(diameter: Option<f64>, health: Option<&str>, species: Option<&str>) -> Self {
        TreeRecord {
            diameter,
            health: health.map(str::to_string),
            species: species.map(str::to_string),
        }
    }

    /// A diameter that can carry a cost: present, finite and positive.
    pub fn has_valid_diameter(&self) -> bool {
        matches!(self.diameter, Some(d) if d.is_finite() && d > 0.0)
    }
}

/// Records together with the column names present in their source.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeTable {
    pub columns: Vec<String>,
    pub records: Vec<TreeRecord>,
}

impl TreeTable {
    /// Table with the three census columns present.
    pub fn new(records: Vec<TreeRecord>) -> Self {
        TreeTable {
            columns: vec![
                DIAMETER_COLUMN.to_string(),
                HEALTH_COLUMN.to_string(),
                SPECIES_COLUMN.to_string(),
            ],
            records,
        }
    }

    pub fn with_columns(columns: Vec<String>, records: Vec<TreeRecord>) -> Self {
        TreeTable { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(PipelineError::schema(name))
        }
    }

    pub fn select(&self, indices: &[usize]) -> TreeTable {
        TreeTable {
            columns: self.columns.clone(),
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
        }
    }
}

/// Outcome of removing rows that cannot be priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleaningSummary {
    pub original_rows: usize,
    pub removed_invalid: usize,
    pub removed_outliers: usize,
    pub remaining: usize,
}

/// Indices of the rows with a valid diameter no larger than `max_diameter`.
///
/// Rows are returned in their original order.
pub fn clean_indices(table: &TreeTable, max_diameter: Option<f64>) -> (Vec<usize>, CleaningSummary) {
    let mut keep = Vec::with_capacity(table.len());
    let mut removed_invalid = 0;
    let mut removed_outliers = 0;

    for (i, record) in table.records.iter().enumerate() {
        if !record.has_valid_diameter() {
            removed_invalid += 1;
            continue;
        }
        match (record.diameter, max_diameter) {
            (Some(d), Some(max)) if d > max => removed_outliers += 1,
            _ => keep.push(i),
        }
    }

    let summary = CleaningSummary {
        original_rows: table.len(),
        removed_invalid,
        removed_outliers,
        remaining: keep.len(),
    };

    if removed_invalid > 0 {
        log::warn!(
            "Removed {} rows with missing or non-positive diameter.",
            removed_invalid
        );
    }
    if removed_outliers > 0 {
        log::warn!(
            "Removed {} outlier trees with diameter > {} inches.",
            removed_outliers,
            max_diameter.unwrap_or_default()
        );
    }

    (keep, summary)
}

/// Encoded features with their column names.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub values: Array2<f32>,
    pub names: Vec<String>,
}

impl FeatureMatrix {
    pub fn new(values: Array2<f32>, names: Vec<String>) -> Result<Self> {
        if values.ncols() != names.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: names.len(),
                found: values.ncols(),
            });
        }
        Ok(FeatureMatrix { values, names })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            values: self.values.select(Axis(0), indices),
            names: self.names.clone(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Encoded rows paired with their (possibly missing) cost label.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: FeatureMatrix,
    pub labels: Vec<Option<f64>>,
}

impl Dataset {
    pub fn new(features: FeatureMatrix, labels: Vec<Option<f64>>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: features.nrows(),
                found: labels.len(),
            });
        }
        Ok(Dataset { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn missing_labels(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }

    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select_rows(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Row indices assigned to each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Partition {
    /// Assign `ceil(fraction * n_rows)` rows to the test side using a permutation
    /// drawn from `seed`.
    pub fn new(n_rows: usize, fraction: f64, seed: u64) -> Result<Partition> {
        validate_fraction(fraction)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n_rows).collect();
        indices.shuffle(&mut rng);

        let n_test = ((n_rows as f64) * fraction).ceil() as usize;
        let n_test = n_test.min(n_rows);
        let train = indices.split_off(n_test);

        log::debug!(
            "Partitioned {} rows into {} training and {} evaluation rows (seed {}).",
            n_rows,
            train.len(),
            indices.len(),
            seed
        );

        Ok(Partition {
            train,
            test: indices,
        })
    }
}

/// Split a dataset into `(train, test)` with `fraction` of the rows held out.
pub fn split(dataset: &Dataset, fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    let partition = Partition::new(dataset.len(), fraction, seed)?;
    Ok((
        dataset.select(&partition.train),
        dataset.select(&partition.test),
    ))
}
