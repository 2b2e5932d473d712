//! Model runtime seam
//!
//! The tokenizer, the seq2seq model and the optimizer belong to an external
//! runtime. This module defines the contract the rest of the crate relies on,
//! so the adapter and the training loop never depend on a particular backend.
//!
//! Two implementations ship with the crate:
//!
//! - [`HttpRuntime`](crate::http_runtime::HttpRuntime) talks JSON to a runtime server
//! - [`MockRuntime`](crate::mock::MockRuntime) is deterministic and in-process, for tests

use crate::batching::Batch;
use crate::error::MtResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Compute device a model is placed on at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// GPU or other accelerator
    Accelerator,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Accelerator => f.write_str("accelerator"),
            Device::Cpu => f.write_str("cpu"),
        }
    }
}

/// A loaded model and its paired tokenizer
///
/// Inference methods take `&self` and must be safe to call concurrently.
/// [`train_step`](ModelRuntime::train_step) mutates weights and takes
/// `&mut self`, so it can never overlap with inference on the same handle.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Identifier the model was loaded from
    fn model_name(&self) -> &str;

    /// Device chosen at load time
    fn device(&self) -> Device;

    /// Token id used to pad input sequences
    fn pad_token_id(&self) -> u32;

    /// Tokenize `text` as language `lang_tag`, truncating to `max_length`
    /// tokens when given (special tokens included)
    async fn encode(
        &self,
        text: &str,
        lang_tag: &str,
        max_length: Option<usize>,
    ) -> MtResult<Vec<u32>>;

    /// Generate output ids with `forced_bos_tag` forced as the first token
    ///
    /// Decoding is greedy/beam per the runtime's defaults; identical weights and
    /// inputs give identical output.
    async fn generate(
        &self,
        input_ids: &[u32],
        forced_bos_tag: &str,
        max_length: usize,
    ) -> MtResult<Vec<u32>>;

    /// Detokenize, skipping special tokens
    async fn decode(&self, ids: &[u32]) -> MtResult<String>;

    /// One optimizer update on `batch`; returns the batch loss
    async fn train_step(&mut self, batch: &Batch, learning_rate: f64) -> MtResult<f32>;

    /// Loss on `batch` without updating weights
    async fn eval_loss(&self, batch: &Batch) -> MtResult<f32>;

    /// Persist weights and tokenizer files into `dir`
    async fn save(&self, dir: &Path) -> MtResult<()>;
}

/// Loads models for a runtime backend
#[async_trait]
pub trait RuntimeLoader: Send + Sync {
    /// Whether the backend can place models on an accelerator
    async fn accelerator_available(&self) -> bool;

    /// Load tokenizer and model for `model_name` onto `device`
    async fn load(&self, model_name: &str, device: Device) -> MtResult<Box<dyn ModelRuntime>>;

    /// Name used in logs
    fn backend_name(&self) -> &str;
}
