//! `treecost train`: fit the cost model on a census file and report on it.
use std::path::Path;

use anyhow::Result;
use treecost_models::config::PipelineConfig;
use treecost_models::io::census::read_census;
use treecost_models::pipeline::{run, run_with_labels, PipelineOutput};
use treecost_models::report::write_report;
use treecost_models::stats::cost_summary;

use crate::util::validate_csv_file;

/// Train on `input`, using its `estimated_cost` column when present and
/// synthesized costs otherwise. Writes an HTML report when `report` is set.
pub fn run_train(
    input: &Path,
    config: &PipelineConfig,
    report: Option<&Path>,
) -> Result<PipelineOutput> {
    validate_csv_file(input)?;
    config.validate()?;

    let mut census = read_census(input)?;
    census.clean(config.max_diameter);

    let output = match census.costs.take() {
        Some(costs) => {
            log::info!("Using the existing estimated_cost column as labels.");
            run_with_labels(&census.table, costs, config)?
        }
        None => {
            log::info!("No estimated_cost column found; synthesizing costs.");
            run(&census.table, config)?
        }
    };

    if let Some(path) = report {
        let summary = cost_summary(&census.table, &output.labels, &config.comparison)?;
        write_report(path, &census.table, &output, &summary)?;
    }

    Ok(output)
}

/// Ranking as printable `feature: weight` lines.
pub fn format_importance(output: &PipelineOutput) -> Vec<String> {
    output
        .importance
        .iter()
        .map(|entry| format!("{}: {}", entry.feature, entry.weight))
        .collect()
}
