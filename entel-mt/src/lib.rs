//! Model runtime adapter and fine-tuning for entel
//!
//! This crate connects the corpus and request types from `entel` to an
//! external seq2seq model runtime.
//!
//! # Workflow Example
//!
//! ```ignore
//! use entel::{TranslationRequest, validate, load_partitions, bidirectional, LanguagePair};
//! use entel_mt::{AdapterConfig, HttpRuntimeLoader, ModelAdapter, TrainingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Load the model once for the whole process
//!     let loader = HttpRuntimeLoader::from_env()?;
//!     let mut adapter =
//!         ModelAdapter::load(&loader, "facebook/nllb-200-distilled-600M", AdapterConfig::default()).await?;
//!
//!     // 2. Serve a request
//!     let request = validate(&TranslationRequest::new("Good morning", "en", "te"))?;
//!     println!("{}", adapter.translate_request(&request).await?);
//!
//!     // 3. Or fine-tune on a prepared corpus in both directions
//!     let dataset = load_partitions("processed".as_ref())?;
//!     let data = bidirectional(dataset, LanguagePair::english_telugu());
//!     adapter.fit(&data, &TrainingConfig::bidirectional(), "model-out".as_ref()).await?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod batching;
pub mod checkpoint;
pub mod error;
pub mod http_runtime;
pub mod mock;
pub mod runtime;
pub mod trainer;

// Integration tests (only available during testing)
#[cfg(test)]
mod integration_tests;

// Re-export main types for convenient access
pub use adapter::{AdapterConfig, DEFAULT_MAX_OUTPUT_LENGTH, ModelAdapter};
pub use batching::{Batch, LABEL_PAD_ID, TokenizedPair};
pub use checkpoint::{CheckpointManager, TrainerState};
pub use error::{MtError, MtResult};
pub use http_runtime::{HttpRuntime, HttpRuntimeLoader};
pub use mock::{MockLoader, MockMode, MockRuntime};
pub use runtime::{Device, ModelRuntime, RuntimeLoader};
pub use trainer::{Hyperparameters, Trainer, TrainingConfig, TrainingReport, linear_decay};
