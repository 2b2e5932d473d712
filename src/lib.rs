//! English ↔ Telugu corpus preparation and translation request handling
//!
//! This crate holds the model-independent half of the translator:
//!
//! - [`languages`] - short codes to model language tags
//! - [`dataset`] - clean, split and persist a raw parallel corpus
//! - [`split`] - the seeded two-stage train / validation / test split
//! - [`augment`] - swap a prepared corpus to train the opposite direction
//! - [`request`] - validate an inbound translation request
//!
//! Model loading, inference and fine-tuning live in the `entel-mt` crate.

pub mod augment;
pub mod dataset;
pub mod error;
pub mod languages;
pub mod request;
pub mod split;

// Re-export main types for convenient access
pub use augment::{DirectedDataset, bidirectional, swap, swapped_dir};
pub use dataset::{
    Dataset, MIN_RECORDS, PARTITION_HEADER, ParallelRecord, Partition, PrepareConfig, RawTable,
    load_dataset, load_partitions, prepare, read_csv, write_partitions,
};
pub use error::{DatasetError, DatasetResult, RequestError};
pub use languages::{LanguageId, LanguagePair, resolve};
pub use request::{TranslationRequest, ValidatedRequest, validate};
pub use split::SplitFractions;
