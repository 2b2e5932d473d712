//! HTTP model runtime
//!
//! Drives a model hosted by an external runtime server (for example a Python
//! process wrapping a Hugging Face seq2seq model) over a small JSON protocol:
//!
//! | call                           | request body                                  | response          |
//! |--------------------------------|-----------------------------------------------|-------------------|
//! | `GET  /health`                 |                                               | `{accelerator_available}` |
//! | `POST /models`                 | `{model, device}`                             | `{handle, pad_token_id}` |
//! | `POST /models/{h}/encode`      | `{text, lang, max_length}`                    | `{ids}`           |
//! | `POST /models/{h}/generate`    | `{input_ids, forced_bos_token, max_length}`   | `{ids}`           |
//! | `POST /models/{h}/decode`      | `{ids, skip_special_tokens}`                  | `{text}`          |
//! | `POST /models/{h}/train_step`  | `{batch, learning_rate}`                      | `{loss}`          |
//! | `POST /models/{h}/eval_loss`   | `{batch}`                                     | `{loss}`          |
//! | `POST /models/{h}/save`        | `{path}`                                      | `{}`              |
//!
//! # Configuration
//!
//! [`HttpRuntimeLoader::from_env`] reads the server address from
//! `ENTEL_RUNTIME_URL` and an optional bearer token from `ENTEL_RUNTIME_TOKEN`.

use crate::batching::Batch;
use crate::error::{MtError, MtResult};
use crate::runtime::{Device, ModelRuntime, RuntimeLoader};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

/// Generation and training calls can be slow on CPU
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared HTTP plumbing for loader and runtime
#[derive(Clone)]
struct RuntimeClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RuntimeClient {
    fn new(base_url: &str, token: Option<String>) -> MtResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(MtError::Config("runtime URL cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MtError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<Resp: DeserializeOwned>(&self, path: &str) -> MtResult<Resp> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Self::read(request.send().await?).await
    }

    async fn post<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> MtResult<Resp> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Self::read(request.send().await?).await
    }

    async fn read<Resp: DeserializeOwned>(response: reqwest::Response) -> MtResult<Resp> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(if status.is_client_error() {
                MtError::Config(format!("runtime client error ({}): {}", status, error_text))
            } else {
                MtError::Generation(format!("runtime server error ({}): {}", status, error_text))
            });
        }

        response
            .json()
            .await
            .map_err(|e| MtError::Network(format!("Failed to parse runtime response: {}", e)))
    }
}

#[derive(Deserialize)]
struct HealthResponse {
    accelerator_available: bool,
}

#[derive(Deserialize)]
struct LoadResponse {
    handle: String,
    pad_token_id: u32,
}

#[derive(Deserialize)]
struct IdsResponse {
    ids: Vec<u32>,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Deserialize)]
struct LossResponse {
    loss: f32,
}

#[derive(Deserialize)]
struct Empty {}

/// Loads models on a remote runtime server
#[derive(Clone)]
pub struct HttpRuntimeLoader {
    client: RuntimeClient,
}

impl HttpRuntimeLoader {
    pub fn new(base_url: &str, token: Option<String>) -> MtResult<Self> {
        Ok(Self {
            client: RuntimeClient::new(base_url, token)?,
        })
    }

    /// Create a loader from `ENTEL_RUNTIME_URL` (and optional `ENTEL_RUNTIME_TOKEN`)
    pub fn from_env() -> MtResult<Self> {
        let base_url = std::env::var("ENTEL_RUNTIME_URL").map_err(|_| {
            MtError::Config("ENTEL_RUNTIME_URL environment variable not set".to_string())
        })?;
        let token = std::env::var("ENTEL_RUNTIME_TOKEN").ok();
        Self::new(&base_url, token)
    }
}

impl std::fmt::Debug for HttpRuntimeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRuntimeLoader")
            .field("base_url", &self.client.base_url)
            .field("token", &self.client.token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl RuntimeLoader for HttpRuntimeLoader {
    async fn accelerator_available(&self) -> bool {
        match self.client.get::<HealthResponse>("health").await {
            Ok(health) => health.accelerator_available,
            Err(e) => {
                tracing::warn!("Runtime health probe failed, assuming CPU: {}", e);
                false
            }
        }
    }

    async fn load(&self, model_name: &str, device: Device) -> MtResult<Box<dyn ModelRuntime>> {
        let loaded: LoadResponse = self
            .client
            .post("models", &json!({ "model": model_name, "device": device }))
            .await?;

        Ok(Box::new(HttpRuntime {
            client: self.client.clone(),
            handle: loaded.handle,
            model_name: model_name.to_string(),
            device,
            pad_token_id: loaded.pad_token_id,
        }))
    }

    fn backend_name(&self) -> &str {
        "HTTP Runtime"
    }
}

/// A model loaded on a remote runtime server
pub struct HttpRuntime {
    client: RuntimeClient,
    handle: String,
    model_name: String,
    device: Device,
    pad_token_id: u32,
}

impl HttpRuntime {
    fn route(&self, call: &str) -> String {
        format!("models/{}/{}", self.handle, call)
    }
}

impl std::fmt::Debug for HttpRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRuntime")
            .field("base_url", &self.client.base_url)
            .field("handle", &self.handle)
            .field("model_name", &self.model_name)
            .field("device", &self.device)
            .finish()
    }
}

#[async_trait]
impl ModelRuntime for HttpRuntime {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn device(&self) -> Device {
        self.device
    }

    fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    async fn encode(
        &self,
        text: &str,
        lang_tag: &str,
        max_length: Option<usize>,
    ) -> MtResult<Vec<u32>> {
        let body = json!({ "text": text, "lang": lang_tag, "max_length": max_length });
        let response: IdsResponse = self.client.post(&self.route("encode"), &body).await?;
        Ok(response.ids)
    }

    async fn generate(
        &self,
        input_ids: &[u32],
        forced_bos_tag: &str,
        max_length: usize,
    ) -> MtResult<Vec<u32>> {
        let body = json!({
            "input_ids": input_ids,
            "forced_bos_token": forced_bos_tag,
            "max_length": max_length,
        });
        let response: IdsResponse = self.client.post(&self.route("generate"), &body).await?;
        Ok(response.ids)
    }

    async fn decode(&self, ids: &[u32]) -> MtResult<String> {
        let body = json!({ "ids": ids, "skip_special_tokens": true });
        let response: TextResponse = self.client.post(&self.route("decode"), &body).await?;
        Ok(response.text)
    }

    async fn train_step(&mut self, batch: &Batch, learning_rate: f64) -> MtResult<f32> {
        let body = json!({ "batch": batch, "learning_rate": learning_rate });
        let response: LossResponse = self.client.post(&self.route("train_step"), &body).await?;
        Ok(response.loss)
    }

    async fn eval_loss(&self, batch: &Batch) -> MtResult<f32> {
        let body = json!({ "batch": batch });
        let response: LossResponse = self.client.post(&self.route("eval_loss"), &body).await?;
        Ok(response.loss)
    }

    async fn save(&self, dir: &Path) -> MtResult<()> {
        let body = json!({ "path": dir.display().to_string() });
        let _: Empty = self.client.post(&self.route("save"), &body).await?;
        Ok(())
    }
}
