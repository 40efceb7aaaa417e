//! Held-out scoring of a trained model.
use crate::data_handling::FeatureMatrix;
use crate::error::{PipelineError, Result};
use crate::stats::mean_absolute_error;
use crate::trainer::TrainedModel;

/// Mean absolute error of `model` on the evaluation rows.
///
/// Unlike training, evaluation refuses label-missing rows instead of
/// dropping them, so incomplete coverage is visible to the caller.
pub fn score(model: &TrainedModel, features: &FeatureMatrix, labels: &[Option<f64>]) -> Result<f64> {
    if labels.is_empty() {
        return Err(PipelineError::insufficient_data("evaluation set is empty"));
    }
    if features.nrows() != labels.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: features.nrows(),
            found: labels.len(),
        });
    }

    let missing = labels.iter().filter(|l| l.is_none()).count();
    if missing > 0 {
        log::warn!(
            "{} of {} evaluation rows carry no label.",
            missing,
            labels.len()
        );
        return Err(PipelineError::MissingLabels {
            missing,
            total: labels.len(),
        });
    }

    let truth: Vec<f64> = labels.iter().flatten().copied().collect();
    let predictions = model.predict(features)?;
    let mae = mean_absolute_error(&predictions, &truth)?;

    log::info!("Mean Absolute Error: ${:.2} over {} rows.", mae, truth.len());
    Ok(mae)
}
