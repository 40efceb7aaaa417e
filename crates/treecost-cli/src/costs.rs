//! `treecost costs`: add synthesized removal costs to a census file.
use std::path::{Path, PathBuf};

use anyhow::Result;
use treecost_models::config::PipelineConfig;
use treecost_models::data_handling::CleaningSummary;
use treecost_models::io::census::{read_census, write_census_with_costs};
use treecost_models::pipeline::synthesize_labels;
use treecost_models::stats::{cost_summary, CostSummary};

use crate::util::{sibling_path, validate_csv_file};

/// What `run_costs` did.
#[derive(Debug)]
pub struct CostsResult {
    pub output_path: PathBuf,
    pub cleaning: CleaningSummary,
    pub summary: CostSummary,
}

pub fn run_costs(
    input: &Path,
    output: Option<&Path>,
    config: &PipelineConfig,
) -> Result<CostsResult> {
    validate_csv_file(input)?;
    config.validate()?;

    let mut census = read_census(input)?;
    let cleaning = census.clean(config.max_diameter);

    let costs = synthesize_labels(&census.table, config)?;

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_path(input, "_with_costs", "csv"));
    write_census_with_costs(&output_path, &census, &costs)?;

    let summary = cost_summary(&census.table, &costs, &config.comparison)?;
    for group in &summary.by_health {
        log::info!(
            "Mean cost for {} trees: ${:.2} ({} trees)",
            group.group,
            group.mean_cost,
            group.count
        );
    }
    let (low, high) = summary.band;
    for species in &summary.species_in_band {
        match species.mean_cost {
            Some(mean) => log::info!(
                "Mean cost for '{}' trees between {} and {} inches: ${:.2} ({} trees)",
                species.pattern,
                low,
                high,
                mean,
                species.trees
            ),
            None => log::info!(
                "No priced '{}' trees between {} and {} inches.",
                species.pattern,
                low,
                high
            ),
        }
    }

    Ok(CostsResult {
        output_path,
        cleaning,
        summary,
    })
}
