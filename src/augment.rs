//! Bidirectional augmentation
//!
//! A prepared corpus translates in one direction. Swapping the two sides of
//! every record yields a mirror corpus for the opposite direction, so a single
//! fine-tuning run can learn both.
//!
//! Mirror files on disk keep the fixed `en\tte` header of every partition
//! file. The columns are positional: in `<dir>_swapped` the `en` column holds
//! the Telugu source side.

use crate::dataset::{Dataset, ParallelRecord};
use crate::languages::LanguagePair;
use std::path::{Path, PathBuf};

/// A dataset together with the direction its records translate in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedDataset {
    pub pair: LanguagePair,
    pub dataset: Dataset,
}

impl DirectedDataset {
    pub fn new(pair: LanguagePair, dataset: Dataset) -> Self {
        Self { pair, dataset }
    }
}

/// Exchange source and target text in every record of every partition.
///
/// Partition membership and order are preserved, so `swap(&swap(d)) == d`.
pub fn swap(dataset: &Dataset) -> Dataset {
    dataset.map_records(ParallelRecord::swapped)
}

/// Forward corpus plus its swapped mirror, each tagged with its direction
pub fn bidirectional(dataset: Dataset, pair: LanguagePair) -> Vec<DirectedDataset> {
    let mirrored = swap(&dataset);
    vec![
        DirectedDataset::new(pair, dataset),
        DirectedDataset::new(pair.reversed(), mirrored),
    ]
}

/// Directory holding the swapped mirror of a prepared directory: `<dir>_swapped`
pub fn swapped_dir(dir: &Path) -> PathBuf {
    let mut name = dir
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push("_swapped");
    dir.with_file_name(name)
}
