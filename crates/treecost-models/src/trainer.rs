//! Fitting the cost regressor.
use ndarray::Array2;

use crate::config::ModelConfig;
use crate::data_handling::FeatureMatrix;
use crate::error::{PipelineError, Result};
use crate::models::factory::build_model;
use crate::models::RegressorModel;

/// A fitted model together with the names of the columns it was trained on.
#[derive(Debug)]
pub struct TrainedModel {
    model: Box<dyn RegressorModel>,
    feature_names: Vec<String>,
    n_train_rows: usize,
}

impl TrainedModel {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_trees(&self) -> usize {
        self.model.num_trees()
    }

    pub fn n_train_rows(&self) -> usize {
        self.n_train_rows
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        if features.ncols() != self.feature_names.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.feature_names.len(),
                found: features.ncols(),
            });
        }
        if let Some((expected, _)) = self
            .feature_names
            .iter()
            .zip(&features.names)
            .find(|(expected, found)| expected != found)
        {
            return Err(PipelineError::schema(expected.clone()));
        }
        self.model.predict(&features.values)
    }

    pub fn split_counts(&self) -> Vec<u32> {
        self.model.split_counts()
    }
}

/// Train a model on the rows of `features` whose label is present.
///
/// Label-missing rows are dropped here rather than upstream; the inputs are
/// left untouched.
pub fn train(
    features: &FeatureMatrix,
    labels: &[Option<f64>],
    config: &ModelConfig,
) -> Result<TrainedModel> {
    config.validate()?;
    if features.nrows() != labels.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: features.nrows(),
            found: labels.len(),
        });
    }

    let labelled: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter_map(|(i, label)| label.map(|_| i))
        .collect();
    let dropped = labels.len() - labelled.len();
    if dropped > 0 {
        log::warn!(
            "Dropped {} of {} training rows without a cost label.",
            dropped,
            labels.len()
        );
    }
    if labelled.is_empty() {
        return Err(PipelineError::insufficient_data(format!(
            "no labelled training rows remain out of {}",
            labels.len()
        )));
    }

    let x: Array2<f32> = if dropped > 0 {
        features.select_rows(&labelled).values
    } else {
        features.values.clone()
    };
    let y: Vec<f64> = labels.iter().flatten().copied().collect();

    let mut model = build_model(config.clone());
    log::info!(
        "Training {} model on {} rows (learning rate {}, seed {}).",
        model.name(),
        y.len(),
        config.learning_rate,
        config.seed
    );
    model.fit(&x, &y)?;

    Ok(TrainedModel {
        model,
        feature_names: features.names.clone(),
        n_train_rows: y.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelType;

    fn matrix(values: Vec<f32>, rows: usize) -> FeatureMatrix {
        let x = Array2::from_shape_vec((rows, 1), values).unwrap();
        FeatureMatrix::new(x, vec!["tree_dbh".to_string()]).unwrap()
    }

    fn small_config() -> ModelConfig {
        ModelConfig {
            model_type: ModelType::GBDT {
                num_trees: 5,
                max_depth: 2,
                min_child_weight: 1.0,
                reg_lambda: 1.0,
                subsample: 1.0,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_all_labels_missing_is_insufficient_data() {
        let features = matrix(vec![1.0, 2.0, 3.0], 3);
        let err = train(&features, &[None, None, None], &small_config()).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }

    #[test]
    fn test_missing_labels_are_dropped() {
        let features = matrix(vec![1.0, 2.0, 3.0, 4.0], 4);
        let labels = vec![Some(200.0), None, Some(400.0), None];
        let model = train(&features, &labels, &small_config()).unwrap();
        assert_eq!(model.n_train_rows(), 2);
        assert_eq!(model.num_trees(), 5);
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn test_invalid_config_fails_before_training() {
        let features = matrix(vec![1.0], 1);
        let mut config = small_config();
        config.learning_rate = -1.0;
        assert!(matches!(
            train(&features, &[Some(1.0)], &config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_label_length_mismatch() {
        let features = matrix(vec![1.0, 2.0], 2);
        assert!(matches!(
            train(&features, &[Some(1.0)], &small_config()),
            Err(PipelineError::ShapeMismatch { .. })
        ));
    }
}
