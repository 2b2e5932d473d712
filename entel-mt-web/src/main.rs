use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use entel::{RequestError, TranslationRequest, validate};
use entel_mt::{
    AdapterConfig, DEFAULT_MAX_OUTPUT_LENGTH, Device, HttpRuntimeLoader, MockLoader, MockMode,
    ModelAdapter, MtError, RuntimeLoader,
};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_MODEL: &str = "facebook/nllb-200-distilled-600M";

#[derive(Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translation: String,
    pub source: String,
    pub target: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub device: Device,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelAdapter>,
}

/// Server settings read from `ENTEL_*` environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub model_name: String,
    pub max_output_length: usize,
    pub mock_runtime: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let max_output_length = match lookup("ENTEL_MAX_OUTPUT_LENGTH") {
            Some(raw) => raw.trim().parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                format!(
                    "ENTEL_MAX_OUTPUT_LENGTH must be a positive integer, got '{}'",
                    raw
                )
            })?,
            None => DEFAULT_MAX_OUTPUT_LENGTH,
        };

        Ok(Self {
            bind_addr: lookup("ENTEL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            model_name: lookup("ENTEL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_output_length,
            mock_runtime: lookup("ENTEL_MOCK_RUNTIME")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let loader: Box<dyn RuntimeLoader> = if config.mock_runtime {
        warn!("ENTEL_MOCK_RUNTIME is set, serving the mock runtime");
        Box::new(MockLoader::new(MockMode::Suffix))
    } else {
        Box::new(HttpRuntimeLoader::from_env()?)
    };

    // The model must be loaded before the listener exists
    let adapter_config = AdapterConfig {
        max_output_length: config.max_output_length,
        ..AdapterConfig::default()
    };
    let model = match ModelAdapter::load(loader.as_ref(), &config.model_name, adapter_config).await
    {
        Ok(model) => model,
        Err(e) => {
            error!("❌ {}", e);
            return Err(e.into());
        }
    };

    info!("🌐 Starting entel translation server");

    let app = app(AppState {
        model: Arc::new(model),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("🚀 Server running at http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/translate", post(translate))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn serve_index() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        include_str!("static/index.html"),
    )
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model.model_name().to_string(),
        device: state.model.device(),
    })
}

async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslationRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let validated = validate(&request).map_err(request_error)?;

    info!(
        "Translating {} chars {}",
        validated.text.chars().count(),
        validated.pair
    );

    let translation = state
        .model
        .translate_request(&validated)
        .await
        .map_err(generation_error)?;

    Ok(Json(TranslateResponse {
        translation,
        source: request.source_lang,
        target: request.target_lang,
    }))
}

fn request_error(err: RequestError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
}

fn generation_error(err: MtError) -> ApiError {
    error!("Translation failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Translation service error: {}", err),
            kind: "generation-failure".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::collections::HashMap;
    use tower::ServiceExt;

    async fn mock_app(mode: MockMode) -> Router {
        let model = ModelAdapter::load(&MockLoader::new(mode), "mock-nllb", AdapterConfig::default())
            .await
            .unwrap();
        app(AppState {
            model: Arc::new(model),
        })
    }

    fn post_translate(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/translate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_translate_success() {
        let app = mock_app(MockMode::Suffix).await;
        let response = app
            .oneshot(post_translate(serde_json::json!({
                "text": "Hello",
                "source_lang": "EN",
                "target_lang": "te"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["translation"], "Hello_tel_Telu");
        assert_eq!(body["source"], "EN");
        assert_eq!(body["target"], "te");
    }

    #[tokio::test]
    async fn test_translate_validation_errors() {
        let cases = [
            (("   ", "en", "te"), "empty-input", "Input text cannot be empty."),
            (
                ("Hello", "en", "en"),
                "identical-language",
                "Source and target languages must be different.",
            ),
        ];

        for ((text, source, target), kind, message) in cases {
            let app = mock_app(MockMode::Suffix).await;
            let response = app
                .oneshot(post_translate(serde_json::json!({
                    "text": text,
                    "source_lang": source,
                    "target_lang": target
                })))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = json_body(response).await;
            assert_eq!(body["kind"], kind);
            assert_eq!(body["error"], message);
        }
    }

    #[tokio::test]
    async fn test_translate_unsupported_language() {
        let app = mock_app(MockMode::Suffix).await;
        let response = app
            .oneshot(post_translate(serde_json::json!({
                "text": "Hello",
                "source_lang": "en",
                "target_lang": "hi"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "unsupported-language");
        assert!(body["error"].as_str().unwrap().contains("hi"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_per_request() {
        let app = mock_app(MockMode::Error("device lost".to_string())).await;
        let request = || {
            post_translate(serde_json::json!({
                "text": "Hello",
                "source_lang": "en",
                "target_lang": "te"
            }))
        };

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "generation-failure");

        // the server keeps answering
        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_model() {
        let app = mock_app(MockMode::Suffix).await;
        let handles: Vec<_> = ["one", "two", "three", "four"]
            .into_iter()
            .map(|text| {
                let app = app.clone();
                tokio::spawn(async move {
                    let response = app
                        .oneshot(post_translate(serde_json::json!({
                            "text": text,
                            "source_lang": "te",
                            "target_lang": "en"
                        })))
                        .await
                        .unwrap();
                    (text, json_body(response).await)
                })
            })
            .collect();

        for handle in handles {
            let (text, body) = handle.await.unwrap();
            assert_eq!(body["translation"], format!("{}_eng_Latn", text));
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = mock_app(MockMode::Echo).await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "mock-nllb");
        assert_eq!(body["device"], "cpu");
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = mock_app(MockMode::Echo).await;
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.model_name, "facebook/nllb-200-distilled-600M");
        assert_eq!(config.max_output_length, 200);
        assert!(!config.mock_runtime);
    }

    #[test]
    fn test_server_config_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ENTEL_BIND_ADDR", "0.0.0.0:9090"),
            ("ENTEL_MODEL", "./model-out"),
            ("ENTEL_MAX_OUTPUT_LENGTH", "64"),
            ("ENTEL_MOCK_RUNTIME", "true"),
        ]);
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9090");
        assert_eq!(config.model_name, "./model-out");
        assert_eq!(config.max_output_length, 64);
        assert!(config.mock_runtime);

        let bad = ServerConfig::from_lookup(|key| {
            (key == "ENTEL_MAX_OUTPUT_LENGTH").then(|| "zero".to_string())
        });
        assert!(bad.is_err());
    }
}
