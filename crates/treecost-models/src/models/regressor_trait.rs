use std::fmt;

use ndarray::Array2;

use crate::error::Result;

/// Contract shared by the regression models the trainer can build.
pub trait RegressorModel: fmt::Debug {
    /// Fit the model on fully labelled rows.
    fn fit(&mut self, x: &Array2<f32>, y: &[f64]) -> Result<()>;

    /// Predict one value per row of `x`.
    fn predict(&self, x: &Array2<f32>) -> Result<Vec<f64>>;

    /// Number of times each feature column is used as a split criterion.
    fn split_counts(&self) -> Vec<u32>;

    fn num_trees(&self) -> usize;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "regressor"
    }
}
