//! Feature encoding for tree records.
//!
//! `FeatureEncoder::fit` freezes the health mapping and the species vocabulary
//! from a table; `encode` then turns any table into the same fixed-width
//! matrix: `[tree_dbh, health_encoded, spc_<species>..., spc_<other>]`.
use std::collections::HashMap;

use ndarray::Array2;

use crate::config::EncoderConfig;
use crate::data_handling::{FeatureMatrix, TreeRecord, TreeTable, DIAMETER_COLUMN};
use crate::error::{PipelineError, Result};

pub const HEALTH_FEATURE: &str = "health_encoded";
const SPECIES_PREFIX: &str = "spc_";

/// A fitted encoder. The species vocabulary is sorted alphabetically and the
/// other bucket is always the last column.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureEncoder {
    config: EncoderConfig,
    species: Vec<String>,
    species_index: HashMap<String, usize>,
}

impl FeatureEncoder {
    pub fn fit(table: &TreeTable, config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        table.require_column(DIAMETER_COLUMN)?;

        let species = top_species(&table.records, config.top_n_species, &config.other_label);
        let species_index = species
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        log::debug!(
            "Fitted encoder on {} rows: {} species retained, others bucketed as '{}'.",
            table.len(),
            species.len(),
            config.other_label
        );

        Ok(FeatureEncoder {
            config,
            species,
            species_index,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Retained species, in column order, without the other bucket.
    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn n_features(&self) -> usize {
        2 + self.species.len() + 1
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.n_features());
        names.push(DIAMETER_COLUMN.to_string());
        names.push(HEALTH_FEATURE.to_string());
        for species in &self.species {
            names.push(format!("{}{}", SPECIES_PREFIX, species));
        }
        names.push(format!("{}{}", SPECIES_PREFIX, self.config.other_label));
        names
    }

    pub fn encode_health(&self, health: Option<&str>) -> u8 {
        health
            .and_then(|h| self.config.health_levels.get(h))
            .copied()
            .unwrap_or(self.config.default_health)
    }

    /// Column offset (within the indicators) of the species bucket.
    pub fn species_slot(&self, species: Option<&str>) -> usize {
        species
            .and_then(|s| self.species_index.get(s))
            .copied()
            .unwrap_or(self.species.len())
    }

    pub fn encode_record(&self, record: &TreeRecord) -> Vec<f32> {
        let mut row = vec![0.0f32; self.n_features()];
        row[0] = record.diameter.map_or(f32::NAN, |d| d as f32);
        row[1] = self.encode_health(record.health.as_deref()) as f32;
        row[2 + self.species_slot(record.species.as_deref())] = 1.0;
        row
    }

    /// Encode every row of `table`. Rows are never dropped; a missing diameter
    /// becomes NaN.
    pub fn encode(&self, table: &TreeTable) -> Result<FeatureMatrix> {
        table.require_column(DIAMETER_COLUMN)?;

        let n_features = self.n_features();
        let mut data = Vec::with_capacity(table.len() * n_features);
        let mut missing_diameter = 0;
        for record in &table.records {
            if record.diameter.is_none() {
                missing_diameter += 1;
            }
            data.extend(self.encode_record(record));
        }

        if missing_diameter > 0 {
            log::warn!(
                "{} rows have no diameter value; encoded as NaN.",
                missing_diameter
            );
        }

        let values = Array2::from_shape_vec((table.len(), n_features), data).map_err(|_| {
            PipelineError::ShapeMismatch {
                expected: table.len() * n_features,
                found: table.len(),
            }
        })?;
        FeatureMatrix::new(values, self.feature_names())
    }
}

/// The `n` most frequent species labels, alphabetically ordered.
///
/// Ties on frequency are resolved by first appearance. Missing species and
/// labels equal to `other_label` never enter the vocabulary.
fn top_species(records: &[TreeRecord], n: usize, other_label: &str) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (row, record) in records.iter().enumerate() {
        let Some(species) = record.species.as_deref() else {
            continue;
        };
        if species == other_label {
            continue;
        }
        counts.entry(species).or_insert((0, row)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(name, (count, first))| (name, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.truncate(n);

    let mut species: Vec<String> = ranked
        .into_iter()
        .map(|(name, _, _)| name.to_string())
        .collect();
    species.sort();
    species
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(d: f64, health: Option<&str>, species: Option<&str>) -> TreeRecord {
        TreeRecord::new(Some(d), health, species)
    }

    fn census() -> TreeTable {
        let mut records = Vec::new();
        for _ in 0..5 {
            records.push(record(12.0, Some("Good"), Some("oak")));
        }
        for _ in 0..3 {
            records.push(record(8.0, Some("Fair"), Some("maple")));
        }
        for _ in 0..2 {
            records.push(record(20.0, Some("Poor"), Some("ginkgo")));
        }
        records.push(record(4.0, None, Some("linden")));
        records.push(record(6.0, None, None));
        TreeTable::new(records)
    }

    fn encoder(top_n: usize) -> FeatureEncoder {
        let config = EncoderConfig {
            top_n_species: top_n,
            ..Default::default()
        };
        FeatureEncoder::fit(&census(), config).unwrap()
    }

    #[test]
    fn test_fit_keeps_most_frequent_species() {
        let enc = encoder(2);
        assert_eq!(enc.species(), &["maple".to_string(), "oak".to_string()]);
        assert_eq!(
            enc.feature_names(),
            vec!["tree_dbh", "health_encoded", "spc_maple", "spc_oak", "spc_Other"]
        );
    }

    #[test]
    fn test_frequency_ties_resolved_by_first_appearance() {
        let table = TreeTable::new(vec![
            record(1.0, None, Some("zelkova")),
            record(1.0, None, Some("ash")),
            record(1.0, None, Some("birch")),
        ]);
        let config = EncoderConfig {
            top_n_species: 2,
            ..Default::default()
        };
        let enc = FeatureEncoder::fit(&table, config).unwrap();
        assert_eq!(enc.species(), &["ash".to_string(), "zelkova".to_string()]);
    }

    #[test]
    fn test_encode_known_record() {
        let enc = encoder(10);
        let row = enc.encode_record(&record(10.0, Some("Good"), Some("oak")));
        let names = enc.feature_names();
        assert_eq!(row[0], 10.0);
        assert_eq!(row[1], 3.0);
        let oak = names.iter().position(|n| n == "spc_oak").unwrap();
        assert_eq!(row[oak], 1.0);
        assert_eq!(row[2..].iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_unseen_species_goes_to_other() {
        let enc = encoder(10);
        let row = enc.encode_record(&record(10.0, Some("Good"), Some("baobab")));
        let last = row.len() - 1;
        assert_eq!(row[last], 1.0);
        assert!(row[2..last].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_health_fallback() {
        let enc = encoder(10);
        assert_eq!(enc.encode_health(None), 2);
        assert_eq!(enc.encode_health(Some("Dead")), 2);
        assert_eq!(enc.encode_health(Some("Poor")), 1);
    }

    #[test]
    fn test_encode_is_column_stable() {
        let enc = encoder(3);
        let batch = TreeTable::new(vec![record(5.0, Some("Fair"), Some("baobab"))]);
        let a = enc.encode(&census()).unwrap();
        let b = enc.encode(&batch).unwrap();
        assert_eq!(a.names, b.names);
        assert_eq!(a.ncols(), b.ncols());
        assert_eq!(b.nrows(), 1);
    }

    #[test]
    fn test_missing_diameter_value_is_kept_as_nan() {
        let enc = encoder(3);
        let table = TreeTable::new(vec![TreeRecord::new(None, Some("Good"), Some("oak"))]);
        let matrix = enc.encode(&table).unwrap();
        assert_eq!(matrix.nrows(), 1);
        assert!(matrix.values[[0, 0]].is_nan());
    }

    #[test]
    fn test_encode_requires_diameter_column() {
        let enc = encoder(3);
        let table = TreeTable::with_columns(
            vec!["health".to_string(), "spc_common".to_string()],
            vec![TreeRecord::new(None, Some("Good"), Some("oak"))],
        );
        assert_eq!(
            enc.encode(&table).unwrap_err(),
            PipelineError::schema(DIAMETER_COLUMN)
        );
    }

    #[test]
    fn test_other_label_is_not_a_vocabulary_entry() {
        let table = TreeTable::new(vec![
            record(1.0, None, Some("Other")),
            record(1.0, None, Some("Other")),
            record(1.0, None, Some("oak")),
        ]);
        let enc = FeatureEncoder::fit(&table, EncoderConfig::default()).unwrap();
        assert_eq!(enc.species(), &["oak".to_string()]);
        assert_eq!(enc.species_slot(Some("Other")), 1);
    }
}
