//! Street-tree census CSV reader and writer.
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;

use crate::data_handling::{
    clean_indices, CleaningSummary, TreeRecord, TreeTable, COST_COLUMN, DIAMETER_COLUMN,
    HEALTH_COLUMN, SPECIES_COLUMN,
};

/// A census file: the raw rows for writing back and the parsed tree table.
#[derive(Debug, Clone)]
pub struct CensusData {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
    pub table: TreeTable,
    /// Costs already present in the file, if it has an `estimated_cost` column.
    pub costs: Option<Vec<Option<f64>>>,
}

impl CensusData {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop rows whose diameter cannot be priced, plus those above
    /// `max_diameter` when set. Raw rows, records and costs stay aligned.
    pub fn clean(&mut self, max_diameter: Option<f64>) -> CleaningSummary {
        let (keep, summary) = clean_indices(&self.table, max_diameter);
        if keep.len() != self.rows.len() {
            self.rows = keep.iter().map(|&i| self.rows[i].clone()).collect();
            self.table = self.table.select(&keep);
            self.costs = self
                .costs
                .take()
                .map(|costs| keep.iter().map(|&i| costs[i]).collect());
        }
        log::info!(
            "Cleaning kept {} of {} rows.",
            summary.remaining,
            summary.original_rows
        );
        summary
    }
}

/// Read a comma-separated census file with a header row.
///
/// Column names match case-insensitively. Empty cells are treated as
/// missing; a diameter or cost that does not parse is an error.
pub fn read_census<P: AsRef<Path>>(path: P) -> Result<CensusData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open census file: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("Failed to read census header row")?
        .clone();

    let diameter_idx = find_column(&headers, DIAMETER_COLUMN);
    let health_idx = find_column(&headers, HEALTH_COLUMN);
    let species_idx = find_column(&headers, SPECIES_COLUMN);
    let cost_idx = find_column(&headers, COST_COLUMN);

    let columns: Vec<String> = [
        (DIAMETER_COLUMN, diameter_idx),
        (HEALTH_COLUMN, health_idx),
        (SPECIES_COLUMN, species_idx),
    ]
    .iter()
    .filter(|(_, idx)| idx.is_some())
    .map(|(name, _)| name.to_string())
    .collect();

    let mut rows = Vec::new();
    let mut records = Vec::new();
    let mut costs = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let diameter = parse_number(&row, diameter_idx)
            .with_context(|| format!("Invalid {} at row {}", DIAMETER_COLUMN, row_idx + 1))?;
        let health = text_field(&row, health_idx);
        let species = text_field(&row, species_idx);
        records.push(TreeRecord::new(diameter, health, species));

        if cost_idx.is_some() {
            let cost = parse_number(&row, cost_idx)
                .with_context(|| format!("Invalid {} at row {}", COST_COLUMN, row_idx + 1))?;
            costs.push(cost);
        }
        rows.push(row);
    }

    log::info!(
        "Loaded {} rows from {} (columns found: {:?}).",
        rows.len(),
        path.as_ref().display(),
        columns
    );

    Ok(CensusData {
        headers,
        rows,
        table: TreeTable::with_columns(columns, records),
        costs: cost_idx.map(|_| costs),
    })
}

/// Write every original column plus `estimated_cost`, replacing the column
/// if the file already had one. Costs use two decimals; missing costs are
/// written as empty fields.
pub fn write_census_with_costs<P: AsRef<Path>>(
    path: P,
    census: &CensusData,
    costs: &[Option<f64>],
) -> Result<()> {
    if costs.len() != census.rows.len() {
        bail!(
            "Expected {} costs to write, got {}",
            census.rows.len(),
            costs.len()
        );
    }

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create output file: {}", path.as_ref().display()))?;

    let cost_idx = find_column(&census.headers, COST_COLUMN);
    let mut header = census.headers.clone();
    if cost_idx.is_none() {
        header.push_field(COST_COLUMN);
    }
    writer.write_record(&header)?;

    for (row_idx, (row, cost)) in census.rows.iter().zip(costs).enumerate() {
        let formatted = cost.map(|c| format!("{:.2}", c)).unwrap_or_default();
        let record: StringRecord = match cost_idx {
            Some(idx) => row
                .iter()
                .enumerate()
                .map(|(i, field)| if i == idx { formatted.as_str() } else { field })
                .collect(),
            None => {
                let mut record = row.clone();
                record.push_field(&formatted);
                record
            }
        };
        writer
            .write_record(&record)
            .with_context(|| format!("Failed to write row {}", row_idx + 1))?;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} rows with costs to {}.",
        census.rows.len(),
        path.as_ref().display()
    );
    Ok(())
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}

fn text_field(row: &StringRecord, idx: Option<usize>) -> Option<&str> {
    let value = row.get(idx?)?.trim();
    (!value.is_empty()).then_some(value)
}

fn parse_number(row: &StringRecord, idx: Option<usize>) -> Result<Option<f64>> {
    match text_field(row, idx) {
        None => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|e| anyhow!("'{}' is not a number: {}", value, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_census_parses_known_columns() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            &dir,
            "trees.csv",
            "tree_id,tree_dbh,health,spc_common\n1,10,Good,oak\n2,,Fair,\n3,45,,maple\n",
        );
        let census = read_census(&path).unwrap();
        assert_eq!(census.len(), 3);
        assert!(census.costs.is_none());
        assert!(census.table.has_column(DIAMETER_COLUMN));
        assert_eq!(census.table.records[0].diameter, Some(10.0));
        assert_eq!(census.table.records[1].diameter, None);
        assert_eq!(census.table.records[1].species, None);
        assert_eq!(census.table.records[2].health, None);
    }

    #[test]
    fn test_missing_column_is_not_reported() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "trees.csv", "health,spc_common\nGood,oak\n");
        let census = read_census(&path).unwrap();
        assert!(!census.table.has_column(DIAMETER_COLUMN));
        assert!(census.table.has_column(SPECIES_COLUMN));
    }

    #[test]
    fn test_non_numeric_diameter_names_the_row() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "trees.csv", "tree_dbh\n10\nwide\n");
        let err = read_census(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("row 2"));
    }

    #[test]
    fn test_clean_keeps_rows_aligned() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            &dir,
            "trees.csv",
            "tree_dbh,health,estimated_cost\n10,Good,400\n0,Good,100\n80,Poor,9000\n20,Fair,\n",
        );
        let mut census = read_census(&path).unwrap();
        let summary = census.clean(Some(60.0));
        assert_eq!(summary.removed_invalid, 1);
        assert_eq!(summary.removed_outliers, 1);
        assert_eq!(census.len(), 2);
        assert_eq!(census.table.len(), 2);
        assert_eq!(census.costs, Some(vec![Some(400.0), None]));
        assert_eq!(census.rows[1].get(1), Some("Fair"));
    }

    #[test]
    fn test_write_appends_cost_column() {
        let dir = tempdir().unwrap();
        let input = write_csv(&dir, "in.csv", "tree_dbh,health\n10,Good\n,Fair\n");
        let output = dir.path().join("out.csv");
        let census = read_census(&input).unwrap();
        write_census_with_costs(&output, &census, &[Some(543.219), None]).unwrap();
        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "tree_dbh,health,estimated_cost\n10,Good,543.22\n,Fair,\n"
        );
    }

    #[test]
    fn test_write_replaces_existing_cost_column() {
        let dir = tempdir().unwrap();
        let input = write_csv(&dir, "in.csv", "estimated_cost,tree_dbh\n1,10\n");
        let output = dir.path().join("out.csv");
        let census = read_census(&input).unwrap();
        write_census_with_costs(&output, &census, &[Some(250.0)]).unwrap();
        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(written, "estimated_cost,tree_dbh\n250.00,10\n");
    }

    #[test]
    fn test_write_rejects_length_mismatch() {
        let dir = tempdir().unwrap();
        let input = write_csv(&dir, "in.csv", "tree_dbh\n10\n");
        let census = read_census(&input).unwrap();
        assert!(write_census_with_costs(dir.path().join("out.csv"), &census, &[]).is_err());
    }
}
