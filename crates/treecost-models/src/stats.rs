//! Error metrics and the cost sanity-check summary.
use std::collections::HashMap;

use serde::Serialize;
use statrs::statistics::{Data, Median};

use crate::config::ComparisonConfig;
use crate::data_handling::TreeTable;
use crate::error::{PipelineError, Result};

/// Number of species listed in the summary.
pub const TOP_SPECIES: usize = 10;

pub const UNKNOWN_HEALTH: &str = "Unknown";

/// Mean of `|prediction - label|`.
pub fn mean_absolute_error(predictions: &[f64], labels: &[f64]) -> Result<f64> {
    if predictions.len() != labels.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: labels.len(),
            found: predictions.len(),
        });
    }
    if labels.is_empty() {
        return Err(PipelineError::insufficient_data(
            "mean absolute error of an empty set",
        ));
    }
    let total: f64 = predictions
        .iter()
        .zip(labels)
        .map(|(p, y)| (p - y).abs())
        .sum();
    Ok(total / labels.len() as f64)
}

/// Mean and median of the costs that are present, `None` when there are none.
pub fn mean_and_median(costs: &[Option<f64>]) -> Option<(f64, f64)> {
    let present: Vec<f64> = costs.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    let median = Data::new(present).median();
    Some((mean, median))
}

/// Mean cost of one health group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: String,
    pub mean_cost: f64,
    pub count: usize,
}

/// How many rows carry one label, and their share in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelShare {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

/// Costs of one species pattern within the comparison band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesBandMean {
    pub pattern: String,
    /// Matching trees in the band, with or without a cost.
    pub trees: usize,
    /// `None` when no matching tree has a cost.
    pub mean_cost: Option<f64>,
}

/// Quick look at the synthesized costs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    /// Ascending by mean cost.
    pub by_health: Vec<GroupMean>,
    /// Share of each health label among rows that have one, largest first.
    pub health_distribution: Vec<LabelShare>,
    /// The most common species, largest first.
    pub top_species: Vec<LabelShare>,
    pub band: (f64, f64),
    pub species_in_band: Vec<SpeciesBandMean>,
    pub mean_cost: Option<f64>,
    pub median_cost: Option<f64>,
    pub missing_costs: usize,
    pub total_rows: usize,
}

impl CostSummary {
    pub fn missing_percentage(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.missing_costs as f64 / self.total_rows as f64 * 100.0
        }
    }
}

/// Mean cost per health label (missing health grouped as `Unknown`), label
/// distributions, the species comparison and the number of rows without a
/// cost.
pub fn cost_summary(
    table: &TreeTable,
    costs: &[Option<f64>],
    comparison: &ComparisonConfig,
) -> Result<CostSummary> {
    if table.len() != costs.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: table.len(),
            found: costs.len(),
        });
    }

    let mut groups: HashMap<&str, (f64, usize)> = HashMap::new();
    let mut missing_costs = 0;
    for (record, cost) in table.records.iter().zip(costs) {
        let Some(cost) = cost else {
            missing_costs += 1;
            continue;
        };
        let key = record.health.as_deref().unwrap_or(UNKNOWN_HEALTH);
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += cost;
        entry.1 += 1;
    }

    let mut by_health: Vec<GroupMean> = groups
        .into_iter()
        .map(|(group, (sum, count))| GroupMean {
            group: group.to_string(),
            mean_cost: sum / count as f64,
            count,
        })
        .collect();
    by_health.sort_by(|a, b| {
        a.mean_cost
            .total_cmp(&b.mean_cost)
            .then_with(|| a.group.cmp(&b.group))
    });

    let health_distribution = label_shares(
        table.records.iter().map(|r| r.health.as_deref()),
        usize::MAX,
    );
    let top_species = label_shares(
        table.records.iter().map(|r| r.species.as_deref()),
        TOP_SPECIES,
    );
    let species_in_band = compare_species_in_band(table, costs, comparison)?;
    let (mean_cost, median_cost) = match mean_and_median(costs) {
        Some((mean, median)) => (Some(mean), Some(median)),
        None => (None, None),
    };

    Ok(CostSummary {
        by_health,
        health_distribution,
        top_species,
        band: (comparison.min_diameter, comparison.max_diameter),
        species_in_band,
        mean_cost,
        median_cost,
        missing_costs,
        total_rows: table.len(),
    })
}

/// Counts of each present label with its percentage of the present labels.
/// Sorted by count, largest first, then by label; at most `limit` entries.
fn label_shares<'a>(labels: impl Iterator<Item = Option<&'a str>>, limit: usize) -> Vec<LabelShare> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0;
    for label in labels.flatten() {
        *counts.entry(label).or_insert(0) += 1;
        total += 1;
    }

    let mut shares: Vec<LabelShare> = counts
        .into_iter()
        .map(|(label, count)| LabelShare {
            label: label.to_string(),
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    shares.truncate(limit);
    shares
}

/// Mean cost of the trees whose species contains each configured pattern,
/// restricted to diameters inside the comparison band (both ends inclusive).
pub fn compare_species_in_band(
    table: &TreeTable,
    costs: &[Option<f64>],
    comparison: &ComparisonConfig,
) -> Result<Vec<SpeciesBandMean>> {
    if table.len() != costs.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: table.len(),
            found: costs.len(),
        });
    }

    let in_band: Vec<(String, Option<f64>)> = table
        .records
        .iter()
        .zip(costs)
        .filter(|(record, _)| {
            matches!(record.diameter,
                Some(d) if d >= comparison.min_diameter && d <= comparison.max_diameter)
        })
        .filter_map(|(record, cost)| Some((record.species.as_deref()?.to_lowercase(), *cost)))
        .collect();

    let result = comparison
        .species
        .iter()
        .map(|pattern| {
            let needle = pattern.to_lowercase();
            let matching: Vec<Option<f64>> = in_band
                .iter()
                .filter(|(species, _)| species.contains(&needle))
                .map(|(_, cost)| *cost)
                .collect();
            let priced: Vec<f64> = matching.iter().flatten().copied().collect();
            let mean_cost = if priced.is_empty() {
                None
            } else {
                Some(priced.iter().sum::<f64>() / priced.len() as f64)
            };
            SpeciesBandMean {
                pattern: pattern.clone(),
                trees: matching.len(),
                mean_cost,
            }
        })
        .collect();
    Ok(result)
}
