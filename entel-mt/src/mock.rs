//! Mock model runtime for testing
//!
//! A deterministic, in-process stand-in for a real seq2seq model. It
//! tokenizes UTF-8 bytes, "generates" by echoing the input content, and keeps
//! a step counter in place of weights, so the whole adapter and training loop
//! can be exercised without model files or network access.
//!
//! # Example
//!
//! ```ignore
//! use entel_mt::{MockLoader, MockMode, ModelAdapter, AdapterConfig};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let loader = MockLoader::new(MockMode::Suffix);
//!     let adapter = ModelAdapter::load(&loader, "mock", AdapterConfig::default()).await.unwrap();
//!     let result = adapter.translate("hello", "eng_Latn", "tel_Telu", 200).await.unwrap();
//!     assert_eq!(result, "hello_tel_Telu");
//! }
//! ```

use crate::batching::Batch;
use crate::error::{MtError, MtResult};
use crate::runtime::{Device, ModelRuntime, RuntimeLoader};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const PAD_ID: u32 = 0;
const EOS_ID: u32 = 1;
/// First id of the language tag block
const TAG_OFFSET: u32 = 3;
/// Byte `b` is token `b + BYTE_OFFSET`; everything below is special
const BYTE_OFFSET: u32 = 16;

/// How the mock turns input into output
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Output equals input: "hello" → "hello"
    Echo,
    /// Append the target tag: "hello" → "hello_tel_Telu"
    Suffix,
    /// Every generate call fails with this message
    Error(String),
}

/// Deterministic runtime backed by a byte tokenizer
#[derive(Debug, Clone)]
pub struct MockRuntime {
    model_name: String,
    device: Device,
    mode: MockMode,
    /// Optional simulated latency per call (in milliseconds)
    delay_ms: u64,
    /// Optimizer updates applied so far; stands in for the weights
    steps: u64,
    /// Step number whose update fails, for exercising aborted runs
    fail_at_step: Option<u64>,
}

#[derive(Serialize, Deserialize)]
struct MockWeights {
    model_name: String,
    device: Device,
    steps: u64,
}

impl MockRuntime {
    pub fn new(model_name: &str, device: Device, mode: MockMode) -> Self {
        Self {
            model_name: model_name.to_string(),
            device,
            mode,
            delay_ms: 0,
            steps: 0,
            fail_at_step: None,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Make the `step`-th call to `train_step` fail
    pub fn failing_at_step(mut self, step: u64) -> Self {
        self.fail_at_step = Some(step);
        self
    }

    /// Updates applied so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn tag_id(tag: &str) -> MtResult<u32> {
        entel::languages::all()
            .iter()
            .position(|lang| lang.tag() == tag)
            .map(|idx| TAG_OFFSET + idx as u32)
            .ok_or_else(|| MtError::Generation(format!("unknown language tag '{}'", tag)))
    }

    fn byte_ids(text: &str) -> impl Iterator<Item = u32> + '_ {
        text.bytes().map(|b| b as u32 + BYTE_OFFSET)
    }

    fn current_loss(&self) -> f32 {
        2.0 / (1.0 + self.steps as f32 * 0.5)
    }
}

#[async_trait]
impl ModelRuntime for MockRuntime {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn device(&self) -> Device {
        self.device
    }

    fn pad_token_id(&self) -> u32 {
        PAD_ID
    }

    async fn encode(
        &self,
        text: &str,
        lang_tag: &str,
        max_length: Option<usize>,
    ) -> MtResult<Vec<u32>> {
        let tag = Self::tag_id(lang_tag)?;
        let mut content: Vec<u32> = Self::byte_ids(text).collect();
        if let Some(max) = max_length {
            // room for the language tag and </s>
            content.truncate(max.saturating_sub(2));
        }

        let mut ids = Vec::with_capacity(content.len() + 2);
        ids.push(tag);
        ids.extend(content);
        ids.push(EOS_ID);
        Ok(ids)
    }

    async fn generate(
        &self,
        input_ids: &[u32],
        forced_bos_tag: &str,
        max_length: usize,
    ) -> MtResult<Vec<u32>> {
        self.apply_delay().await;

        let tag = Self::tag_id(forced_bos_tag)?;
        let mut content: Vec<u32> = input_ids
            .iter()
            .copied()
            .filter(|&id| id >= BYTE_OFFSET)
            .collect();

        match &self.mode {
            MockMode::Echo => {}
            MockMode::Suffix => content.extend(Self::byte_ids(&format!("_{}", forced_bos_tag))),
            MockMode::Error(msg) => return Err(MtError::Generation(msg.clone())),
        }
        content.truncate(max_length.saturating_sub(2));

        let mut output = Vec::with_capacity(content.len() + 2);
        output.push(tag);
        output.extend(content);
        output.push(EOS_ID);
        Ok(output)
    }

    async fn decode(&self, ids: &[u32]) -> MtResult<String> {
        let bytes: Vec<u8> = ids
            .iter()
            .filter(|&&id| id >= BYTE_OFFSET)
            .map(|&id| (id - BYTE_OFFSET) as u8)
            .collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn train_step(&mut self, batch: &Batch, _learning_rate: f64) -> MtResult<f32> {
        self.apply_delay().await;

        if batch.is_empty() {
            return Err(MtError::Generation("cannot train on an empty batch".to_string()));
        }
        if self.fail_at_step == Some(self.steps + 1) {
            return Err(MtError::Generation(format!(
                "simulated failure at step {}",
                self.steps + 1
            )));
        }

        self.steps += 1;
        Ok(self.current_loss())
    }

    async fn eval_loss(&self, batch: &Batch) -> MtResult<f32> {
        if batch.is_empty() {
            return Err(MtError::Generation("cannot evaluate an empty batch".to_string()));
        }
        Ok(self.current_loss() + 0.1)
    }

    async fn save(&self, dir: &Path) -> MtResult<()> {
        std::fs::create_dir_all(dir)?;
        let weights = MockWeights {
            model_name: self.model_name.clone(),
            device: self.device,
            steps: self.steps,
        };
        std::fs::write(dir.join("model.json"), serde_json::to_vec_pretty(&weights)?)?;
        Ok(())
    }
}

/// Loader producing [`MockRuntime`]s
#[derive(Debug, Clone)]
pub struct MockLoader {
    mode: MockMode,
    accelerator: bool,
    load_error: Option<String>,
    delay_ms: u64,
    fail_at_step: Option<u64>,
}

impl MockLoader {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            accelerator: false,
            load_error: None,
            delay_ms: 0,
            fail_at_step: None,
        }
    }

    /// Report an accelerator as available
    pub fn with_accelerator(mut self) -> Self {
        self.accelerator = true;
        self
    }

    /// Fail every load with `message`
    pub fn failing(mut self, message: &str) -> Self {
        self.load_error = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn failing_at_step(mut self, step: u64) -> Self {
        self.fail_at_step = Some(step);
        self
    }
}

#[async_trait]
impl RuntimeLoader for MockLoader {
    async fn accelerator_available(&self) -> bool {
        self.accelerator
    }

    async fn load(&self, model_name: &str, device: Device) -> MtResult<Box<dyn ModelRuntime>> {
        if let Some(message) = &self.load_error {
            return Err(MtError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                message.clone(),
            )));
        }

        let mut runtime =
            MockRuntime::new(model_name, device, self.mode.clone()).with_delay(self.delay_ms);
        if let Some(step) = self.fail_at_step {
            runtime = runtime.failing_at_step(step);
        }
        Ok(Box::new(runtime))
    }

    fn backend_name(&self) -> &str {
        "Mock Runtime"
    }
}
