//! Parallel corpus preparation
//!
//! Turns a raw two-column table of sentence pairs into cleaned, split
//! train / validation / test partitions and persists them as TSV files.
//!
//! # Workflow Example
//!
//! ```ignore
//! use entel::dataset::{PrepareConfig, prepare, read_csv, write_partitions};
//! use std::path::Path;
//!
//! let table = read_csv(Path::new("corpus.csv"))?;
//! let dataset = prepare(&table, &PrepareConfig::default())?;
//! write_partitions(&dataset, Path::new("processed"))?;
//! ```
//!
//! Rows where either side is empty after trimming are dropped silently: that is
//! a data-quality filter, not an input error. Missing columns and corpora too
//! small to split are errors, and both are detected before anything is written.
//! Writing itself is all-or-nothing: see [`write_partitions`].

use crate::error::{DatasetError, DatasetResult};
use crate::split::{SplitFractions, three_way_split};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Fewest usable records that can still form three non-empty partitions
pub const MIN_RECORDS: usize = 3;

/// One aligned sentence pair; both sides are trimmed and non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParallelRecord {
    pub source_text: String,
    pub target_text: String,
}

impl ParallelRecord {
    /// Normalize both sides; `None` if either is empty after trimming
    pub fn new(source_text: &str, target_text: &str) -> Option<Self> {
        let source_text = source_text.trim();
        let target_text = target_text.trim();
        if source_text.is_empty() || target_text.is_empty() {
            return None;
        }
        Some(Self {
            source_text: source_text.to_string(),
            target_text: target_text.to_string(),
        })
    }

    /// The same pair read in the opposite direction
    pub fn swapped(&self) -> Self {
        Self {
            source_text: self.target_text.clone(),
            target_text: self.source_text.clone(),
        }
    }
}

/// The three partitions of a prepared corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Train,
    Validation,
    Test,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Validation, Partition::Test];

    /// File stem used on disk (`train`, `val`, `test`)
    pub fn file_stem(self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Validation => "val",
            Partition::Test => "test",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.tsv", self.file_stem())
    }
}

/// A corpus split into disjoint train, validation and test partitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub train: Vec<ParallelRecord>,
    pub validation: Vec<ParallelRecord>,
    pub test: Vec<ParallelRecord>,
}

impl Dataset {
    pub fn new(
        train: Vec<ParallelRecord>,
        validation: Vec<ParallelRecord>,
        test: Vec<ParallelRecord>,
    ) -> Self {
        Self {
            train,
            validation,
            test,
        }
    }

    pub fn partition(&self, partition: Partition) -> &[ParallelRecord] {
        match partition {
            Partition::Train => &self.train,
            Partition::Validation => &self.validation,
            Partition::Test => &self.test,
        }
    }

    /// Total number of records across all partitions
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record, train first, then validation, then test
    pub fn records(&self) -> impl Iterator<Item = &ParallelRecord> {
        self.train.iter().chain(&self.validation).chain(&self.test)
    }

    /// Apply `f` to every record of every partition
    pub fn map_records<F>(&self, f: F) -> Self
    where
        F: Fn(&ParallelRecord) -> ParallelRecord,
    {
        Self {
            train: self.train.iter().map(&f).collect(),
            validation: self.validation.iter().map(&f).collect(),
            test: self.test.iter().map(&f).collect(),
        }
    }
}

/// A raw table as read from the input file: header names plus string cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}

/// Settings for [`prepare`]
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareConfig {
    /// Column holding source-language sentences
    pub source_column: String,
    /// Column holding target-language sentences
    pub target_column: String,
    pub fractions: SplitFractions,
    pub seed: u64,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            source_column: "English".to_string(),
            target_column: "Telugu".to_string(),
            fractions: SplitFractions::default(),
            seed: 42,
        }
    }
}

/// Clean and split a raw table into a [`Dataset`]
///
/// # Errors
///
/// * [`DatasetError::Schema`] - a configured column is missing
/// * [`DatasetError::Empty`] - fewer than [`MIN_RECORDS`] usable rows remain
pub fn prepare(table: &RawTable, config: &PrepareConfig) -> DatasetResult<Dataset> {
    let (source_idx, target_idx) = match (
        table.column_index(&config.source_column),
        table.column_index(&config.target_column),
    ) {
        (Some(source), Some(target)) => (source, target),
        _ => {
            return Err(DatasetError::Schema {
                source_column: config.source_column.clone(),
                target_column: config.target_column.clone(),
                found: table.headers.clone(),
            });
        }
    };

    let records: Vec<ParallelRecord> = table
        .rows
        .iter()
        .filter_map(|row| {
            let source = row.get(source_idx).map(String::as_str).unwrap_or("");
            let target = row.get(target_idx).map(String::as_str).unwrap_or("");
            ParallelRecord::new(source, target)
        })
        .collect();

    let dropped = table.rows.len() - records.len();
    if dropped > 0 {
        tracing::debug!("Dropped {} rows with an empty side", dropped);
    }

    if records.len() < MIN_RECORDS {
        return Err(DatasetError::Empty {
            usable: records.len(),
            required: MIN_RECORDS,
        });
    }

    let splits = three_way_split(records, &config.fractions, config.seed);
    Ok(Dataset::new(splits.train, splits.validation, splits.test))
}

/// Read a headered CSV file into a [`RawTable`]
///
/// Short rows are allowed; missing cells read as empty and get filtered by
/// [`prepare`].
pub fn read_csv(path: &Path) -> DatasetResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    tracing::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(RawTable::new(headers, rows))
}

/// Column names written at the top of every partition file
pub const PARTITION_HEADER: [&str; 2] = ["en", "te"];

/// Write `train.tsv`, `val.tsv` and `test.tsv` into `out_dir`
///
/// Each file starts with the fixed [`PARTITION_HEADER`], whatever the
/// direction: in a mirror directory the `en` column holds the Telugu source
/// side. Loaders read columns by position.
///
/// The three files are staged in a temporary directory beside `out_dir` and
/// moved into place only once all of them are written, so a failure leaves
/// no partition behind. Returns the written paths in partition order.
pub fn write_partitions(dataset: &Dataset, out_dir: &Path) -> DatasetResult<Vec<PathBuf>> {
    let parent = match out_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".entel-partitions-")
        .tempdir_in(parent)?;

    for partition in Partition::ALL {
        let path = staging.path().join(partition.file_name());
        write_partition(dataset.partition(partition), &path)?;
    }

    let targets: Vec<PathBuf> = Partition::ALL
        .iter()
        .map(|partition| out_dir.join(partition.file_name()))
        .collect();
    if let Some(blocked) = targets.iter().find(|path| path.is_dir()) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::IsADirectory,
            format!("{} is a directory", blocked.display()),
        )
        .into());
    }

    fs::create_dir_all(out_dir)?;
    let mut moved: Vec<&PathBuf> = Vec::with_capacity(targets.len());
    for (partition, target) in Partition::ALL.iter().zip(&targets) {
        if let Err(e) = fs::rename(staging.path().join(partition.file_name()), target) {
            for path in moved {
                let _ = fs::remove_file(path);
            }
            return Err(e.into());
        }
        moved.push(target);
    }

    tracing::info!(
        "Wrote {} train, {} val, {} test records to {}",
        dataset.train.len(),
        dataset.validation.len(),
        dataset.test.len(),
        out_dir.display()
    );
    Ok(targets)
}

fn write_partition(records: &[ParallelRecord], path: &Path) -> DatasetResult<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(PARTITION_HEADER)?;
    for record in records {
        writer.write_record([record.source_text.as_str(), record.target_text.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read one two-column TSV partition file
pub fn load_partition(path: &Path) -> DatasetResult<Vec<ParallelRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;

    let columns = reader.headers()?.len();
    if columns != 2 {
        return Err(DatasetError::MalformedPartition {
            path: path.display().to_string(),
            reason: format!("expected 2 columns, found {}", columns),
        });
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(record) = ParallelRecord::new(&row[0], &row[1]) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Load a dataset from explicit partition files
pub fn load_dataset(train: &Path, validation: &Path, test: &Path) -> DatasetResult<Dataset> {
    Ok(Dataset::new(
        load_partition(train)?,
        load_partition(validation)?,
        load_partition(test)?,
    ))
}

/// Load `train.tsv`, `val.tsv` and `test.tsv` from a prepared directory
pub fn load_partitions(dir: &Path) -> DatasetResult<Dataset> {
    load_dataset(
        &dir.join(Partition::Train.file_name()),
        &dir.join(Partition::Validation.file_name()),
        &dir.join(Partition::Test.file_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::SplitFractions;
    use tempfile::tempdir;

    fn table(rows: &[(&str, &str)]) -> RawTable {
        RawTable::new(
            vec!["English".to_string(), "Telugu".to_string()],
            rows.iter()
                .map(|(en, te)| vec![en.to_string(), te.to_string()])
                .collect(),
        )
    }

    fn sample_rows(count: usize) -> Vec<(String, String)> {
        (0..count)
            .map(|i| (format!("sentence {}", i), format!("వాక్యం {}", i)))
            .collect()
    }

    #[test]
    fn test_record_trims_and_rejects_empty() {
        let record = ParallelRecord::new("  Hello ", "\tనమస్కారం\n").unwrap();
        assert_eq!(record.source_text, "Hello");
        assert_eq!(record.target_text, "నమస్కారం");
        assert!(ParallelRecord::new("Hello", "   ").is_none());
        assert!(ParallelRecord::new("", "నమస్కారం").is_none());
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let raw = RawTable::new(
            vec!["English".to_string(), "Hindi".to_string()],
            vec![vec!["a".to_string(), "b".to_string()]],
        );
        match prepare(&raw, &PrepareConfig::default()) {
            Err(DatasetError::Schema { found, .. }) => {
                assert_eq!(found, vec!["English".to_string(), "Hindi".to_string()]);
            }
            other => panic!("Expected Schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_column_names() {
        let rows = sample_rows(10);
        let raw = RawTable::new(
            vec!["id".to_string(), "src".to_string(), "tgt".to_string()],
            rows.iter()
                .enumerate()
                .map(|(i, (en, te))| vec![i.to_string(), en.clone(), te.clone()])
                .collect(),
        );
        let config = PrepareConfig {
            source_column: "src".to_string(),
            target_column: "tgt".to_string(),
            ..PrepareConfig::default()
        };
        let dataset = prepare(&raw, &config).unwrap();
        assert_eq!(dataset.len(), 10);
        assert!(dataset.records().all(|r| r.source_text.starts_with("sentence")));
    }

    #[test]
    fn test_empty_fields_never_reach_partitions() {
        let raw = table(&[
            ("one", "ఒకటి"),
            ("", "రెండు"),
            ("three", "   "),
            ("four", "నాలుగు"),
            ("  ", ""),
            ("six", "ఆరు"),
            ("seven", "ఏడు"),
        ]);
        let dataset = prepare(&raw, &PrepareConfig::default()).unwrap();
        assert_eq!(dataset.len(), 4);
        assert!(
            dataset
                .records()
                .all(|r| !r.source_text.is_empty() && !r.target_text.is_empty())
        );
    }

    #[test]
    fn test_five_rows_with_two_empty_targets() {
        let raw = table(&[
            ("a", "అ"),
            ("b", ""),
            ("c", "క"),
            ("d", " "),
            ("e", "ఎ"),
        ]);
        let config = PrepareConfig {
            fractions: SplitFractions::new(0.2, 0.2).unwrap(),
            ..PrepareConfig::default()
        };
        let dataset = prepare(&raw, &config).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.train.len(), 1);
        assert_eq!(dataset.validation.len(), 1);
        assert_eq!(dataset.test.len(), 1);
    }

    #[test]
    fn test_too_few_usable_records() {
        let raw = table(&[("a", "అ"), ("b", ""), ("c", "క"), ("", "డ")]);
        match prepare(&raw, &PrepareConfig::default()) {
            Err(DatasetError::Empty { usable, required }) => {
                assert_eq!(usable, 2);
                assert_eq!(required, MIN_RECORDS);
            }
            other => panic!("Expected Empty error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_rows_are_filtered() {
        let raw = RawTable::new(
            vec!["English".to_string(), "Telugu".to_string()],
            vec![
                vec!["a".to_string(), "అ".to_string()],
                vec!["b".to_string()],
                vec!["c".to_string(), "క".to_string()],
                vec!["d".to_string(), "డ".to_string()],
            ],
        );
        let dataset = prepare(&raw, &PrepareConfig::default()).unwrap();
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_partition_sizes_for_default_fractions() {
        let rows = sample_rows(100);
        let refs: Vec<(&str, &str)> = rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let dataset = prepare(&table(&refs), &PrepareConfig::default()).unwrap();
        assert_eq!(dataset.train.len(), 80);
        assert_eq!(dataset.validation.len(), 10);
        assert_eq!(dataset.test.len(), 10);
    }

    #[test]
    fn test_write_and_load_partitions() {
        let dir = tempdir().unwrap();
        let rows = sample_rows(20);
        let refs: Vec<(&str, &str)> = rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let dataset = prepare(&table(&refs), &PrepareConfig::default()).unwrap();

        let written = write_partitions(&dataset, dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(dir.path().join("train.tsv").exists());
        assert!(dir.path().join("val.tsv").exists());
        assert!(dir.path().join("test.tsv").exists());

        let header = fs::read_to_string(dir.path().join("val.tsv")).unwrap();
        assert!(header.starts_with("en\tte\n"));

        let loaded = load_partitions(dir.path()).unwrap();
        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_failed_write_leaves_no_partitions() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("processed");
        fs::create_dir_all(out_dir.join("test.tsv")).unwrap();
        let rows = sample_rows(20);
        let refs: Vec<(&str, &str)> = rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let dataset = prepare(&table(&refs), &PrepareConfig::default()).unwrap();

        let result = write_partitions(&dataset, &out_dir);
        assert!(matches!(result, Err(DatasetError::Io(_))));
        assert!(!out_dir.join("train.tsv").exists());
        assert!(!out_dir.join("val.tsv").exists());

        // No staging directory is left beside the output
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_mirrored_partitions_keep_fixed_header() {
        let dir = tempdir().unwrap();
        let rows = sample_rows(20);
        let refs: Vec<(&str, &str)> = rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let dataset = prepare(&table(&refs), &PrepareConfig::default()).unwrap();
        let mirrored = dataset.map_records(ParallelRecord::swapped);

        write_partitions(&mirrored, dir.path()).unwrap();
        let contents = fs::read_to_string(dir.path().join("train.tsv")).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("en\tte"));
        let first = &mirrored.train[0];
        assert_eq!(
            lines.next(),
            Some(format!("{}\t{}", first.source_text, first.target_text).as_str())
        );
    }

    #[test]
    fn test_read_csv_with_quoted_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.csv");
        fs::write(
            &path,
            "English,Telugu\n\"Hello, world\",హలో ప్రపంచం\nGood morning,శుభోదయం\n",
        )
        .unwrap();

        let raw = read_csv(&path).unwrap();
        assert_eq!(raw.headers, vec!["English", "Telugu"]);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[0][0], "Hello, world");
    }

    #[test]
    fn test_load_partition_rejects_wrong_column_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("train.tsv");
        fs::write(&path, "en\tte\textra\na\tb\tc\n").unwrap();
        match load_partition(&path) {
            Err(DatasetError::MalformedPartition { reason, .. }) => {
                assert!(reason.contains("found 3"));
            }
            other => panic!("Expected MalformedPartition, got {:?}", other),
        }
    }

    #[test]
    fn test_map_records_preserves_partition_sizes() {
        let dataset = Dataset::new(
            vec![ParallelRecord::new("a", "అ").unwrap()],
            vec![],
            vec![ParallelRecord::new("b", "బ").unwrap()],
        );
        let upper = dataset.map_records(|r| ParallelRecord {
            source_text: r.source_text.to_uppercase(),
            target_text: r.target_text.clone(),
        });
        assert_eq!(upper.train[0].source_text, "A");
        assert!(upper.validation.is_empty());
        assert_eq!(upper.test.len(), 1);
    }
}
