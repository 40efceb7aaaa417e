use std::path::Path;

use anyhow::{Context, Result};
use maud::html;

pub use report_builder::{Report, ReportSection};

use crate::data_handling::TreeTable;
use crate::pipeline::PipelineOutput;
use crate::stats::CostSummary;

use super::plots::{plot_cost_histogram, plot_diameter_vs_cost, plot_feature_importance};

fn dollars(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("${:.2}", v))
}

/// Build the HTML report for a finished pipeline run.
///
/// `table` must be the table the run was made on, so its rows line up with
/// `output.labels`.
pub fn build_report(
    table: &TreeTable,
    output: &PipelineOutput,
    summary: &CostSummary,
) -> Result<Report> {
    let mut report = Report::new(
        "treecost",
        env!("CARGO_PKG_VERSION"),
        None,
        "Tree Cost Model Report",
    );

    let mut overview = ReportSection::new("Overview");
    overview.add_content(html! {
        table {
            tr { th { "Rows" } td { (output.labels.len()) } }
            tr { th { "Training rows" } td { (output.n_train) } }
            tr { th { "Test rows" } td { (output.n_test) } }
            tr { th { "Model" } td { (output.model.model_name()) } }
            tr { th { "Trees" } td { (output.model.num_trees()) } }
            tr { th { "Mean absolute error" } td { "$" (format!("{:.2}", output.mean_absolute_error)) } }
        }
    });
    report.add_section(overview);

    let mut importance = ReportSection::new("Feature Importance");
    importance.add_content(html! {
        table {
            tr { th { "Feature" } th { "Weight" } }
            @for entry in &output.importance {
                tr { td { (entry.feature) } td { (entry.weight) } }
            }
        }
    });
    importance.add_plot(plot_feature_importance(
        &output.importance,
        "Top Features by Weight",
    ));
    report.add_section(importance);

    let mut costs = ReportSection::new("Estimated Costs");
    costs.add_content(html! {
        table {
            tr { th { "Health" } th { "Trees" } th { "Mean cost" } }
            @for group in &summary.by_health {
                tr {
                    td { (group.group) }
                    td { (group.count) }
                    td { "$" (format!("{:.2}", group.mean_cost)) }
                }
            }
        }
        p {
            "Mean cost " (dollars(summary.mean_cost))
            ", median cost " (dollars(summary.median_cost)) "."
        }
        p {
            (summary.missing_costs) " of " (summary.total_rows) " rows have no cost ("
            (format!("{:.1}", summary.missing_percentage())) "%)."
        }
    });
    let scatter = plot_diameter_vs_cost(table, &output.labels, "Diameter vs. Estimated Cost")
        .map_err(anyhow::Error::msg)?;
    costs.add_plot(scatter);
    costs.add_plot(plot_cost_histogram(
        &output.labels,
        "Distribution of Estimated Costs",
    ));
    report.add_section(costs);

    let (low, high) = summary.band;
    let mut comparison = ReportSection::new("Species Comparison");
    comparison.add_content(html! {
        p { "Trees between " (low) " and " (high) " inches in diameter." }
        table {
            tr { th { "Species matching" } th { "Trees" } th { "Mean cost" } }
            @for species in &summary.species_in_band {
                tr {
                    td { (species.pattern) }
                    td { (species.trees) }
                    td { (dollars(species.mean_cost)) }
                }
            }
        }
    });
    report.add_section(comparison);

    let mut census = ReportSection::new("Census Composition");
    census.add_content(html! {
        h3 { "Health" }
        table {
            tr { th { "Health" } th { "Trees" } th { "Share" } }
            @for share in &summary.health_distribution {
                tr {
                    td { (share.label) }
                    td { (share.count) }
                    td { (format!("{:.1}%", share.percentage)) }
                }
            }
        }
        h3 { "Most common species" }
        table {
            tr { th { "Species" } th { "Trees" } }
            @for share in &summary.top_species {
                tr { td { (share.label) } td { (share.count) } }
            }
        }
    });
    report.add_section(census);

    Ok(report)
}

/// Write the HTML report for a finished pipeline run to `path`.
pub fn write_report<P: AsRef<Path>>(
    path: P,
    table: &TreeTable,
    output: &PipelineOutput,
    summary: &CostSummary,
) -> Result<()> {
    let path = path.as_ref();
    let report = build_report(table, output, summary)?;
    report
        .save_to_file(&path.to_string_lossy())
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::info!("Report saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, ModelType, PipelineConfig};
    use crate::data_handling::TreeRecord;
    use crate::pipeline::run;
    use crate::stats::cost_summary;

    fn census() -> TreeTable {
        let species = ["pin oak", "London planetree", "honeylocust"];
        let health = [Some("Good"), Some("Fair"), Some("Poor"), None];
        let records = (0..120)
            .map(|i| {
                TreeRecord::new(
                    Some(2.0 + (i % 30) as f64),
                    health[i % health.len()],
                    Some(species[i % species.len()]),
                )
            })
            .collect();
        TreeTable::new(records)
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            model: ModelConfig {
                model_type: ModelType::GBDT {
                    num_trees: 10,
                    max_depth: 3,
                    min_child_weight: 1.0,
                    reg_lambda: 1.0,
                    subsample: 1.0,
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_report_renders_every_section() {
        let table = census();
        let config = config();
        let output = run(&table, &config).unwrap();
        let summary = cost_summary(&table, &output.labels, &config.comparison).unwrap();

        let page = build_report(&table, &output, &summary).unwrap().to_string();
        for title in [
            "Overview",
            "Feature Importance",
            "Estimated Costs",
            "Species Comparison",
            "Census Composition",
        ] {
            assert!(page.contains(title), "missing section {}", title);
        }
        assert!(page.contains("planetree"));
        assert!(page.contains("honeylocust"));
        assert!(page.contains("Distribution of Estimated Costs"));
        assert!(page.contains("Median cost"));
    }

    #[test]
    fn test_write_report_reports_unwritable_path() {
        let table = census();
        let config = config();
        let output = run(&table, &config).unwrap();
        let summary = cost_summary(&table, &output.labels, &config.comparison).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.html");
        let err = write_report(&path, &table, &output, &summary).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to write report"));
    }
}
