use plotly::common::{DashType, Line, Mode, Orientation};
use plotly::histogram::Bins;
use plotly::layout::{Axis, Layout};
use plotly::{Bar, Histogram, Plot, Scatter};

use crate::data_handling::TreeTable;
use crate::importance::FeatureImportance;
use crate::stats::mean_and_median;

/// Number of features shown in the importance chart.
pub const TOP_FEATURES: usize = 10;

/// Number of bins in the cost histogram.
pub const COST_BINS: usize = 50;

fn mean_line() -> Line {
    Line::new().color("red").dash(DashType::Dash)
}

fn median_line() -> Line {
    Line::new().color("blue").dash(DashType::Dot)
}

/// Horizontal bar chart of the most used features, most used on top.
pub fn plot_feature_importance(importance: &[FeatureImportance], title: &str) -> Plot {
    let top: Vec<&FeatureImportance> = importance.iter().take(TOP_FEATURES).collect();

    // plotly draws the first category at the bottom
    let features: Vec<String> = top.iter().rev().map(|f| f.feature.clone()).collect();
    let weights: Vec<u32> = top.iter().rev().map(|f| f.weight).collect();

    let trace = Bar::new(weights, features)
        .orientation(Orientation::Horizontal)
        .name("Weight");

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Weight (number of splits)"))
        .y_axis(Axis::new().title("Feature"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// Scatter of diameter against cost for rows that have both.
pub fn plot_diameter_vs_cost(
    table: &TreeTable,
    costs: &[Option<f64>],
    title: &str,
) -> Result<Plot, String> {
    if table.len() != costs.len() {
        return Err(format!(
            "Expected {} costs, got {}",
            table.len(),
            costs.len()
        ));
    }

    let (diameters, values): (Vec<f64>, Vec<f64>) = table
        .records
        .iter()
        .zip(costs)
        .filter_map(|(record, cost)| Some((record.diameter?, (*cost)?)))
        .unzip();

    let (x_min, x_max) = diameters
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &d| (lo.min(d), hi.max(d)));
    let center = if diameters.is_empty() {
        None
    } else {
        mean_and_median(costs)
    };

    let trace = Scatter::new(diameters, values)
        .mode(Mode::Markers)
        .name("Tree");

    let mut plot = Plot::new();
    plot.add_trace(trace);

    if let Some((mean, median)) = center {
        plot.add_trace(
            Scatter::new(vec![x_min, x_max], vec![mean, mean])
                .mode(Mode::Lines)
                .name(&format!("Mean cost (${:.0})", mean))
                .line(mean_line()),
        );
        plot.add_trace(
            Scatter::new(vec![x_min, x_max], vec![median, median])
                .mode(Mode::Lines)
                .name(&format!("Median cost (${:.0})", median))
                .line(median_line()),
        );
    }

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Diameter at breast height (inches)"))
        .y_axis(Axis::new().title("Estimated cost ($)"));
    plot.set_layout(layout);

    Ok(plot)
}

/// Histogram of the costs that are present, with dashed mean and dotted
/// median lines spanning the tallest bin.
pub fn plot_cost_histogram(costs: &[Option<f64>], title: &str) -> Plot {
    let values: Vec<f64> = costs.iter().flatten().copied().collect();
    let mut plot = Plot::new();

    if let Some((mean, median)) = mean_and_median(costs) {
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let size = if hi > lo { (hi - lo) / COST_BINS as f64 } else { 1.0 };

        let mut counts = vec![0usize; COST_BINS];
        for v in &values {
            let bin = (((v - lo) / size) as usize).min(COST_BINS - 1);
            counts[bin] += 1;
        }
        let tallest = counts.iter().copied().max().unwrap_or(0) as f64;

        plot.add_trace(
            Histogram::new(values)
                .name("Trees")
                .x_bins(Bins::new(lo, hi + size, size)),
        );
        plot.add_trace(
            Scatter::new(vec![mean, mean], vec![0.0, tallest])
                .mode(Mode::Lines)
                .name(&format!("Mean (${:.0})", mean))
                .line(mean_line()),
        );
        plot.add_trace(
            Scatter::new(vec![median, median], vec![0.0, tallest])
                .mode(Mode::Lines)
                .name(&format!("Median (${:.0})", median))
                .line(median_line()),
        );
    }

    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Estimated cost ($)"))
            .y_axis(Axis::new().title("Number of trees")),
    );
    plot
}
