//! Split-count ("weight") feature importance.
use serde::Serialize;

use crate::trainer::TrainedModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Number of splits on this feature across the ensemble.
    pub weight: u32,
}

/// Features ranked by how often they are used to split, most used first.
///
/// Unused features are left out, so a model without trees ranks nothing.
/// Equal weights keep column order.
pub fn rank(model: &TrainedModel) -> Vec<FeatureImportance> {
    let mut ranking: Vec<FeatureImportance> = model
        .feature_names()
        .iter()
        .zip(model.split_counts())
        .filter(|(_, weight)| *weight > 0)
        .map(|(feature, weight)| FeatureImportance {
            feature: feature.clone(),
            weight,
        })
        .collect();
    ranking.sort_by(|a, b| b.weight.cmp(&a.weight));
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, ModelType};
    use crate::data_handling::FeatureMatrix;
    use crate::trainer::train;
    use ndarray::Array2;

    fn config(num_trees: u32) -> ModelConfig {
        ModelConfig {
            model_type: ModelType::GBDT {
                num_trees,
                max_depth: 2,
                min_child_weight: 1.0,
                reg_lambda: 1.0,
                subsample: 1.0,
            },
            ..Default::default()
        }
    }

    fn data() -> (FeatureMatrix, Vec<Option<f64>>) {
        // column 1 drives the label, column 0 is constant
        let x = Array2::from_shape_fn((30, 2), |(r, c)| if c == 0 { 1.0 } else { r as f32 });
        let features =
            FeatureMatrix::new(x, vec!["flat".to_string(), "signal".to_string()]).unwrap();
        let labels = (0..30).map(|r| Some(if r < 15 { 250.0 } else { 800.0 })).collect();
        (features, labels)
    }

    #[test]
    fn test_rank_orders_by_weight() {
        let (features, labels) = data();
        let model = train(&features, &labels, &config(10)).unwrap();
        let ranking = rank(&model);
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].feature, "signal");
        assert!(ranking[0].weight >= 10);
    }

    #[test]
    fn test_zero_trees_rank_nothing() {
        let (features, labels) = data();
        let model = train(&features, &labels, &config(0)).unwrap();
        assert!(rank(&model).is_empty());
    }
}
