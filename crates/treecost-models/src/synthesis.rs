//! Synthetic removal-cost labels.
//!
//! The census carries no price, so each tree gets a cost from its diameter:
//! a base amount, a linear and a supralinear term, a size-tier multiplier and
//! multiplicative Gaussian noise, floored and rounded to cents.
use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::Normal;

use crate::config::SynthesisConfig;
use crate::data_handling::{TreeTable, DIAMETER_COLUMN};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct CostSynthesizer {
    config: SynthesisConfig,
    /// `None` when the noise spread is zero.
    noise: Option<Normal>,
}

impl CostSynthesizer {
    pub fn new(config: SynthesisConfig) -> Result<Self> {
        config.validate()?;
        let noise = if config.noise.std_dev > 0.0 {
            let normal = Normal::new(config.noise.mean, config.noise.std_dev)
                .map_err(|e| PipelineError::config(format!("invalid noise distribution: {}", e)))?;
            Some(normal)
        } else {
            None
        };
        Ok(CostSynthesizer { config, noise })
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Cost before tiering and noise.
    pub fn base_cost(&self, diameter: f64) -> f64 {
        let c = &self.config;
        c.base + diameter * c.rate_linear + diameter.powf(c.supralinear_exponent) * c.rate_supralinear
    }

    /// Multiplier of the largest tier whose threshold `diameter` exceeds.
    pub fn tier_multiplier(&self, diameter: f64) -> f64 {
        let mut tiers = self.config.tiers.clone();
        tiers.sort_by(|a, b| b.above.total_cmp(&a.above));
        tiers
            .iter()
            .find(|tier| diameter > tier.above)
            .map_or(1.0, |tier| tier.multiplier)
    }

    /// Noise-free cost, floored and rounded. `None` for an unusable diameter.
    pub fn expected_cost(&self, diameter: Option<f64>) -> Option<f64> {
        let d = valid_diameter(diameter)?;
        Some(self.finish(self.base_cost(d) * self.tier_multiplier(d) * self.config.noise.mean))
    }

    /// Draw one cost for `diameter`, consuming at most one sample from `rng`.
    pub fn synthesize<R: Rng + ?Sized>(&self, diameter: Option<f64>, rng: &mut R) -> Option<f64> {
        let d = valid_diameter(diameter)?;
        let variation = match &self.noise {
            Some(normal) => normal.sample(rng),
            None => self.config.noise.mean,
        };
        Some(self.finish(self.base_cost(d) * self.tier_multiplier(d) * variation))
    }

    /// One cost per record, in row order.
    pub fn synthesize_table<R: Rng + ?Sized>(
        &self,
        table: &TreeTable,
        rng: &mut R,
    ) -> Result<Vec<Option<f64>>> {
        table.require_column(DIAMETER_COLUMN)?;

        let costs: Vec<Option<f64>> = table
            .records
            .iter()
            .map(|record| self.synthesize(record.diameter, rng))
            .collect();

        let missing = costs.iter().filter(|c| c.is_none()).count();
        if missing > 0 {
            log::warn!(
                "{} of {} rows have no usable diameter; their cost is missing.",
                missing,
                costs.len()
            );
        }
        log::info!("Synthesized removal costs for {} rows.", costs.len() - missing);

        Ok(costs)
    }

    fn finish(&self, cost: f64) -> f64 {
        round_cents(cost.max(self.config.floor))
    }
}

fn valid_diameter(diameter: Option<f64>) -> Option<f64> {
    diameter.filter(|d| d.is_finite() && *d > 0.0)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
