use crate::config::{ModelConfig, ModelType};
use crate::models::gbdt::GBDTRegressor;
use crate::models::regressor_trait::RegressorModel;

/// Build an unfitted, boxed regression model from a `ModelConfig`.
pub fn build_model(params: ModelConfig) -> Box<dyn RegressorModel> {
    match params.model_type {
        ModelType::GBDT { .. } => Box::new(GBDTRegressor::new(params)),
    }
}
