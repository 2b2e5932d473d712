//! Model runtime adapter
//!
//! [`ModelAdapter`] owns the process's single loaded model. It picks the
//! compute device at load time, turns load failures into
//! [`MtError::ModelUnavailable`], and exposes two uniform operations on top of
//! the raw runtime:
//!
//! - [`translate`](ModelAdapter::translate) - encode, generate with the target
//!   language forced, decode; takes `&self` so requests can share the model
//! - [`fit`](ModelAdapter::fit) - fine-tune on prepared data; takes `&mut self`
//!   so no inference can overlap with a weight update
//!
//! # Example
//!
//! ```ignore
//! use entel_mt::{AdapterConfig, HttpRuntimeLoader, ModelAdapter};
//!
//! let loader = HttpRuntimeLoader::from_env()?;
//! let adapter = ModelAdapter::load(&loader, "facebook/nllb-200-distilled-600M", AdapterConfig::default()).await?;
//! let telugu = adapter.translate("Good morning", "eng_Latn", "tel_Telu", 200).await?;
//! ```

use crate::batching::{Batch, TokenizedPair};
use crate::error::{MtError, MtResult};
use crate::runtime::{Device, ModelRuntime, RuntimeLoader};
use crate::trainer::{Trainer, TrainingConfig, TrainingReport};
use entel::{DirectedDataset, LanguagePair, ParallelRecord, ValidatedRequest};
use std::path::Path;
use tracing::{debug, info};

/// Default cap on generated tokens per translation
pub const DEFAULT_MAX_OUTPUT_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Used by [`ModelAdapter::translate_request`]
    pub max_output_length: usize,
    /// Pin the model to a device instead of probing for an accelerator
    pub device: Option<Device>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_output_length: DEFAULT_MAX_OUTPUT_LENGTH,
            device: None,
        }
    }
}

/// The loaded model and tokenizer, behind a translate / fit interface
pub struct ModelAdapter {
    runtime: Box<dyn ModelRuntime>,
    config: AdapterConfig,
}

impl ModelAdapter {
    /// Load `model_name` through `loader`
    ///
    /// The accelerator is used when the loader reports one, otherwise the CPU.
    ///
    /// # Errors
    ///
    /// Any loader failure is returned as [`MtError::ModelUnavailable`].
    pub async fn load(
        loader: &dyn RuntimeLoader,
        model_name: &str,
        config: AdapterConfig,
    ) -> MtResult<Self> {
        let device = match config.device {
            Some(device) => device,
            None if loader.accelerator_available().await => Device::Accelerator,
            None => Device::Cpu,
        };

        info!(
            "Loading {} on {} via {}",
            model_name,
            device,
            loader.backend_name()
        );

        let runtime = loader.load(model_name, device).await.map_err(|e| {
            MtError::ModelUnavailable(format!("failed to load '{}' on {}: {}", model_name, device, e))
        })?;

        Ok(Self::from_runtime(runtime, config))
    }

    /// Wrap an already loaded runtime
    pub fn from_runtime(runtime: Box<dyn ModelRuntime>, config: AdapterConfig) -> Self {
        Self { runtime, config }
    }

    pub fn model_name(&self) -> &str {
        self.runtime.model_name()
    }

    pub fn device(&self) -> Device {
        self.runtime.device()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn runtime(&self) -> &dyn ModelRuntime {
        self.runtime.as_ref()
    }

    /// Translate one string from `source_tag` into `target_tag`
    ///
    /// Failures are reported as [`MtError::Generation`] and affect only this call.
    pub async fn translate(
        &self,
        text: &str,
        source_tag: &str,
        target_tag: &str,
        max_output_length: usize,
    ) -> MtResult<String> {
        let input_ids = self
            .runtime
            .encode(text, source_tag, None)
            .await
            .map_err(generation_error)?;
        let output_ids = self
            .runtime
            .generate(&input_ids, target_tag, max_output_length)
            .await
            .map_err(generation_error)?;
        let translated = self
            .runtime
            .decode(&output_ids)
            .await
            .map_err(generation_error)?;

        debug!(
            "Generated {} tokens from {} ({} → {})",
            output_ids.len(),
            input_ids.len(),
            source_tag,
            target_tag
        );
        Ok(translated)
    }

    /// Translate a validated request with the configured output length
    pub async fn translate_request(&self, request: &ValidatedRequest) -> MtResult<String> {
        self.translate(
            &request.text,
            request.source_tag(),
            request.target_tag(),
            self.config.max_output_length,
        )
        .await
    }

    pub fn pad_token_id(&self) -> u32 {
        self.runtime.pad_token_id()
    }

    /// Tokenize one record for `pair`, truncating both sides to `max_length`
    pub async fn tokenize_pair(
        &self,
        record: &ParallelRecord,
        pair: LanguagePair,
        max_length: usize,
    ) -> MtResult<TokenizedPair> {
        let input_ids = self
            .runtime
            .encode(&record.source_text, pair.source().tag(), Some(max_length))
            .await?;
        let labels = self
            .runtime
            .encode(&record.target_text, pair.target().tag(), Some(max_length))
            .await?;
        Ok(TokenizedPair { input_ids, labels })
    }

    /// Tokenize a slice of records in order
    pub async fn tokenize(
        &self,
        records: &[ParallelRecord],
        pair: LanguagePair,
        max_length: usize,
    ) -> MtResult<Vec<TokenizedPair>> {
        let mut tokenized = Vec::with_capacity(records.len());
        for record in records {
            tokenized.push(self.tokenize_pair(record, pair, max_length).await?);
        }
        Ok(tokenized)
    }

    /// One weight update; requires exclusive access to the model
    pub async fn train_step(&mut self, batch: &Batch, learning_rate: f64) -> MtResult<f32> {
        self.runtime.train_step(batch, learning_rate).await
    }

    /// Mean loss over `batches`, or `None` when there is nothing to evaluate
    pub async fn evaluate(&self, batches: &[Batch]) -> MtResult<Option<f32>> {
        if batches.is_empty() {
            return Ok(None);
        }
        let mut total = 0.0f32;
        for batch in batches {
            total += self.runtime.eval_loss(batch).await?;
        }
        Ok(Some(total / batches.len() as f32))
    }

    /// Persist the current weights and tokenizer into `dir`
    pub async fn save_pretrained(&self, dir: &Path) -> MtResult<()> {
        self.runtime.save(dir).await
    }

    /// Fine-tune on `data` and write the final model to `output_dir`
    pub async fn fit(
        &mut self,
        data: &[DirectedDataset],
        config: &TrainingConfig,
        output_dir: &Path,
    ) -> MtResult<TrainingReport> {
        Trainer::new(config.clone()).run(self, data, output_dir).await
    }
}

impl std::fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("model_name", &self.runtime.model_name())
            .field("device", &self.runtime.device())
            .field("config", &self.config)
            .finish()
    }
}

fn generation_error(err: MtError) -> MtError {
    match err {
        MtError::Generation(_) => err,
        other => MtError::Generation(other.to_string()),
    }
}
