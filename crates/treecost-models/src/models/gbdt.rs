use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{ModelConfig, ModelType};
use crate::error::{PipelineError, Result};
use crate::models::regressor_trait::RegressorModel;
use crate::models::tree::{GrowParams, RegressionTree, TreeGrower};

/// Gradient Boosting Decision Tree (GBDT) regressor minimizing squared error.
#[derive(Debug, Clone)]
pub struct GBDTRegressor {
    params: ModelConfig,
    base_score: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GBDTRegressor {
    pub fn new(params: ModelConfig) -> Self {
        GBDTRegressor {
            params,
            base_score: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Initial prediction every tree corrects: the mean training label.
    pub fn base_score(&self) -> f64 {
        self.base_score
    }
}

impl RegressorModel for GBDTRegressor {
    fn fit(&mut self, x: &Array2<f32>, y: &[f64]) -> Result<()> {
        self.params.validate()?;
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: x.nrows(),
                found: y.len(),
            });
        }
        if y.is_empty() {
            return Err(PipelineError::insufficient_data(
                "cannot fit a model on zero rows",
            ));
        }

        let ModelType::GBDT {
            num_trees,
            max_depth,
            min_child_weight,
            reg_lambda,
            subsample,
        } = self.params.model_type.clone();

        let n_rows = y.len();
        self.n_features = x.ncols();
        self.base_score = y.iter().sum::<f64>() / n_rows as f64;
        self.trees = Vec::with_capacity(num_trees as usize);

        let grower = TreeGrower::new(
            x,
            GrowParams {
                max_depth,
                min_child_weight,
                reg_lambda,
                learning_rate: self.params.learning_rate as f64,
            },
        );
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let n_sampled = ((n_rows as f64 * subsample).round() as usize).clamp(1, n_rows);

        let mut preds = vec![self.base_score; n_rows];
        let mut grad = vec![0.0f64; n_rows];
        let hess = vec![1.0f64; n_rows];

        for round in 0..num_trees {
            for ((g, p), target) in grad.iter_mut().zip(&preds).zip(y) {
                *g = p - target;
            }

            let rows: Vec<usize> = if n_sampled < n_rows {
                let mut sampled = rand::seq::index::sample(&mut rng, n_rows, n_sampled).into_vec();
                sampled.sort_unstable();
                sampled
            } else {
                (0..n_rows).collect()
            };

            let tree = grower.grow(&grad, &hess, &rows);
            for (i, p) in preds.iter_mut().enumerate() {
                *p += tree.predict_row(x.row(i));
            }
            self.trees.push(tree);

            if log::log_enabled!(log::Level::Debug) && (round + 1) % 10 == 0 {
                let rmse = (preds
                    .iter()
                    .zip(y)
                    .map(|(p, t)| (p - t) * (p - t))
                    .sum::<f64>()
                    / n_rows as f64)
                    .sqrt();
                log::debug!("[{}] round {}: train rmse {:.4}", self.name(), round + 1, rmse);
            }
        }

        log::info!(
            "Trained {} trees on {} rows x {} features (base score {:.2}).",
            self.trees.len(),
            n_rows,
            self.n_features,
            self.base_score
        );

        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<f64>> {
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeMismatch {
                expected: self.n_features,
                found: x.ncols(),
            });
        }
        let predictions = x
            .rows()
            .into_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .fold(self.base_score, |acc, tree| acc + tree.predict_row(row))
            })
            .collect();
        Ok(predictions)
    }

    fn split_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_features];
        for tree in &self.trees {
            for feature in tree.split_features() {
                if feature < counts.len() {
                    counts[feature] += 1;
                }
            }
        }
        counts
    }

    fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn name(&self) -> &str {
        self.params.model_type.name()
    }
}
