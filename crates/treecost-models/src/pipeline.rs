//! End-to-end run: synthesize labels, encode, split, train, score and rank.
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::PipelineConfig;
use crate::data_handling::{Dataset, Partition, TreeTable};
use crate::error::{PipelineError, Result};
use crate::evaluation::score;
use crate::importance::{rank, FeatureImportance};
use crate::preprocessing::FeatureEncoder;
use crate::synthesis::CostSynthesizer;
use crate::trainer::{train, TrainedModel};

/// Everything produced by one pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    /// One cost per input row, in input order.
    pub labels: Vec<Option<f64>>,
    pub encoder: FeatureEncoder,
    pub model: TrainedModel,
    pub mean_absolute_error: f64,
    pub importance: Vec<FeatureImportance>,
    pub n_train: usize,
    pub n_test: usize,
}

/// Synthesize costs for `table` and run the training pipeline on them.
pub fn run(table: &TreeTable, config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let labels = synthesize_labels(table, config)?;
    run_with_labels(table, labels, config)
}

/// One synthesized cost per row, drawn from a generator seeded with
/// `config.noise_seed`.
pub fn synthesize_labels(table: &TreeTable, config: &PipelineConfig) -> Result<Vec<Option<f64>>> {
    let synthesizer = CostSynthesizer::new(config.synthesis.clone())?;
    let mut rng = StdRng::seed_from_u64(config.noise_seed);
    synthesizer.synthesize_table(table, &mut rng)
}

/// Run the training pipeline on costs that already exist.
///
/// Rows are partitioned first and the species vocabulary is fitted on the
/// training rows only, so a species seen only in held-out rows is encoded as
/// the other bucket.
pub fn run_with_labels(
    table: &TreeTable,
    labels: Vec<Option<f64>>,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    config.validate()?;
    if labels.len() != table.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: table.len(),
            found: labels.len(),
        });
    }

    let partition = Partition::new(table.len(), config.split.test_fraction, config.split.seed)?;

    log::info!("Starting feature engineering on {} rows...", table.len());
    let encoder = FeatureEncoder::fit(&table.select(&partition.train), config.encoder.clone())?;
    let features = encoder.encode(table)?;
    log::info!("Selected features: {:?}", features.names);

    let dataset = Dataset::new(features, labels)?;
    let train_set = dataset.select(&partition.train);
    let test_set = dataset.select(&partition.test);
    log::info!(
        "Data split into {} training and {} testing samples.",
        train_set.len(),
        test_set.len()
    );

    let model = train(&train_set.features, &train_set.labels, &config.model)?;
    let mean_absolute_error = score(&model, &test_set.features, &test_set.labels)?;
    let importance = rank(&model);

    Ok(PipelineOutput {
        labels: dataset.labels,
        encoder,
        model,
        mean_absolute_error,
        importance,
        n_train: train_set.len(),
        n_test: test_set.len(),
    })
}
