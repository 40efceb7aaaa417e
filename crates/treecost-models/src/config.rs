use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Central configuration for the regression model.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub learning_rate: f32,
    /// Seed for any sampling performed while growing the ensemble.
    pub seed: u64,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    GBDT {
        num_trees: u32,
        max_depth: u32,
        min_child_weight: f64,
        reg_lambda: f64,
        /// Fraction of training rows drawn for each tree.
        subsample: f64,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::GBDT {
            num_trees: 100,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            subsample: 1.0,
        }
    }
}

impl ModelType {
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::GBDT { .. } => "gbdt",
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gbdt" => Ok(ModelType::default()),
            _ => Err(format!("Unknown model type: {}", s)),
        }
    }
}

impl ModelConfig {
    pub fn new(learning_rate: f32, model_type: ModelType) -> Self {
        Self {
            learning_rate,
            model_type,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(PipelineError::config(format!(
                "learning_rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }
        match &self.model_type {
            ModelType::GBDT {
                max_depth,
                min_child_weight,
                reg_lambda,
                subsample,
                ..
            } => {
                if *max_depth == 0 {
                    return Err(PipelineError::config("max_depth must be at least 1"));
                }
                if !min_child_weight.is_finite() || *min_child_weight < 0.0 {
                    return Err(PipelineError::config(format!(
                        "min_child_weight must be a non-negative finite number, got {}",
                        min_child_weight
                    )));
                }
                if !reg_lambda.is_finite() || *reg_lambda < 0.0 {
                    return Err(PipelineError::config(format!(
                        "reg_lambda must be a non-negative finite number, got {}",
                        reg_lambda
                    )));
                }
                if !(*subsample > 0.0 && *subsample <= 1.0) {
                    return Err(PipelineError::config(format!(
                        "subsample must be in (0, 1], got {}",
                        subsample
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            seed: 42,
            model_type: ModelType::default(),
        }
    }
}

/// A size band of the cost curve: diameters strictly above `above` get `multiplier`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SizeTier {
    pub above: f64,
    pub multiplier: f64,
}

/// Multiplicative Gaussian variation applied to each synthesized cost.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    pub mean: f64,
    pub std_dev: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            mean: 1.0,
            std_dev: 0.20,
        }
    }
}

/// Constants of the removal cost curve.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub base: f64,
    pub rate_linear: f64,
    pub rate_supralinear: f64,
    pub supralinear_exponent: f64,
    /// Evaluated largest threshold first; diameters matching no tier use 1.0.
    pub tiers: Vec<SizeTier>,
    pub noise: NoiseConfig,
    pub floor: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base: 150.0,
            rate_linear: 25.0,
            rate_supralinear: 5.0,
            supralinear_exponent: 1.2,
            tiers: vec![
                SizeTier {
                    above: 40.0,
                    multiplier: 2.0,
                },
                SizeTier {
                    above: 20.0,
                    multiplier: 1.5,
                },
            ],
            noise: NoiseConfig::default(),
            floor: 200.0,
        }
    }
}

impl SynthesisConfig {
    pub fn validate(&self) -> Result<()> {
        let constants = [
            ("base", self.base),
            ("rate_linear", self.rate_linear),
            ("rate_supralinear", self.rate_supralinear),
            ("supralinear_exponent", self.supralinear_exponent),
            ("floor", self.floor),
        ];
        for (name, value) in constants {
            if !value.is_finite() {
                return Err(PipelineError::config(format!(
                    "synthesis constant '{}' must be finite, got {}",
                    name, value
                )));
            }
        }
        for tier in &self.tiers {
            if !tier.above.is_finite() || !tier.multiplier.is_finite() || tier.multiplier <= 0.0 {
                return Err(PipelineError::config(format!(
                    "invalid size tier (above {}, multiplier {})",
                    tier.above, tier.multiplier
                )));
            }
        }
        if !self.noise.mean.is_finite() || self.noise.mean <= 0.0 {
            return Err(PipelineError::config(format!(
                "noise mean must be positive, got {}",
                self.noise.mean
            )));
        }
        if !self.noise.std_dev.is_finite() || self.noise.std_dev < 0.0 {
            return Err(PipelineError::config(format!(
                "noise std_dev must be non-negative, got {}",
                self.noise.std_dev
            )));
        }
        Ok(())
    }
}

/// Categorical encoding choices applied by the feature encoder.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    pub health_levels: BTreeMap<String, u8>,
    /// Code used when health is absent or not one of `health_levels`.
    pub default_health: u8,
    pub top_n_species: usize,
    pub other_label: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        let health_levels = [("Poor", 1u8), ("Fair", 2), ("Good", 3)]
            .into_iter()
            .map(|(label, code)| (label.to_string(), code))
            .collect();
        Self {
            health_levels,
            default_health: 2,
            top_n_species: 10,
            other_label: "Other".to_string(),
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_n_species == 0 {
            return Err(PipelineError::config("top_n_species must be at least 1"));
        }
        if self.other_label.trim().is_empty() {
            return Err(PipelineError::config("other_label must not be empty"));
        }
        Ok(())
    }
}

/// Hold-out settings for evaluation.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        validate_fraction(self.test_fraction)
    }
}

/// Species compared against each other within one diameter band.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Inclusive diameter band in inches.
    pub min_diameter: f64,
    pub max_diameter: f64,
    /// Matched case-insensitively as substrings of the species name.
    pub species: Vec<String>,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            min_diameter: 15.0,
            max_diameter: 25.0,
            species: vec!["oak".to_string(), "planetree".to_string()],
        }
    }
}

impl ComparisonConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_diameter.is_finite()
            || !self.max_diameter.is_finite()
            || self.min_diameter > self.max_diameter
        {
            return Err(PipelineError::config(format!(
                "comparison band [{}, {}] is not a valid diameter range",
                self.min_diameter, self.max_diameter
            )));
        }
        if self.species.iter().any(|s| s.trim().is_empty()) {
            return Err(PipelineError::config(
                "comparison species patterns must not be empty",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_fraction(fraction: f64) -> Result<()> {
    if fraction.is_finite() && fraction > 0.0 && fraction < 1.0 {
        Ok(())
    } else {
        Err(PipelineError::config(format!(
            "test fraction must be strictly between 0 and 1, got {}",
            fraction
        )))
    }
}

/// Everything a full synthesis + training run needs.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub synthesis: SynthesisConfig,
    pub encoder: EncoderConfig,
    pub split: SplitConfig,
    pub model: ModelConfig,
    pub comparison: ComparisonConfig,
    /// Seed for the cost noise draws.
    pub noise_seed: u64,
    /// Rows with a larger diameter are dropped while cleaning.
    pub max_diameter: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            synthesis: SynthesisConfig::default(),
            encoder: EncoderConfig::default(),
            split: SplitConfig::default(),
            model: ModelConfig::default(),
            comparison: ComparisonConfig::default(),
            noise_seed: 42,
            max_diameter: Some(60.0),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.synthesis.validate()?;
        self.encoder.validate()?;
        self.split.validate()?;
        self.model.validate()?;
        self.comparison.validate()?;
        if let Some(max) = self.max_diameter {
            if !max.is_finite() || max <= 0.0 {
                return Err(PipelineError::config(format!(
                    "max_diameter must be positive, got {}",
                    max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_fraction_boundaries_rejected() {
        for fraction in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let err = validate_fraction(fraction).unwrap_err();
            assert!(matches!(err, PipelineError::Config(_)), "{}", fraction);
        }
        assert!(validate_fraction(0.2).is_ok());
    }

    #[test]
    fn test_model_config_rejects_bad_learning_rate() {
        let mut cfg = ModelConfig::default();
        cfg.learning_rate = 0.0;
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_model_config_rejects_zero_depth() {
        let cfg = ModelConfig {
            model_type: ModelType::GBDT {
                num_trees: 10,
                max_depth: 0,
                min_child_weight: 1.0,
                reg_lambda: 1.0,
                subsample: 1.0,
            },
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_encoder_config_rejects_zero_top_n() {
        let cfg = EncoderConfig {
            top_n_species: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_noise_rejected() {
        let mut cfg = SynthesisConfig::default();
        cfg.noise.std_dev = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_comparison_band_must_be_ordered() {
        let cfg = ComparisonConfig {
            min_diameter: 30.0,
            max_diameter: 20.0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
        assert!(ComparisonConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"split": {"test_fraction": 0.3}}"#).unwrap();
        assert_eq!(cfg.split.test_fraction, 0.3);
        assert_eq!(cfg.split.seed, 42);
        assert_eq!(cfg.encoder.top_n_species, 10);
        assert_eq!(cfg.comparison, ComparisonConfig::default());
    }
}
