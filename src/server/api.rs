//! HTTP API server implementation

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{header, HeaderName, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeFile, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::core::client::OpenRouterClient;
use crate::core::config::{AppConfig, API_KEY_VAR};
use crate::core::errors::TranslationError;
use crate::core::models::{
    PipelineResult, RoundTripRequest, Stage, DEFAULT_MODEL, DEFAULT_SOURCE_LANG,
    DEFAULT_TARGET_LANG,
};
use crate::core::pipeline::RoundTrip;
use crate::core::prompt::PromptLoader;
use crate::core::translator::Translator;

const CONFIG_ERROR_MESSAGE: &str = "Server configuration error: API key not set";
const NOT_JSON_MESSAGE: &str = "Request body must be JSON";

/// Application state
pub struct AppState {
    config: Arc<AppConfig>,
    /// `None` when no API key is configured; every request then fails with 500
    pipeline: Option<RoundTrip>,
}

impl AppState {
    /// Build the production pipeline from configuration
    pub fn from_config(config: Arc<AppConfig>) -> crate::core::errors::Result<Self> {
        let pipeline = if config.has_api_key() {
            let client = OpenRouterClient::new(config.clone())?;
            let translator =
                Translator::new(Arc::new(client), PromptLoader::new(&config.prompts_dir));
            Some(RoundTrip::new(translator))
        } else {
            None
        };

        Ok(Self { config, pipeline })
    }

    /// Use an already assembled pipeline
    pub fn with_pipeline(config: Arc<AppConfig>, pipeline: Option<RoundTrip>) -> Self {
        Self { config, pipeline }
    }

    fn pipeline(&self) -> Result<RoundTrip, ApiError> {
        match &self.pipeline {
            Some(pipeline) if self.config.has_api_key() => Ok(pipeline.clone()),
            _ => {
                error!("{} environment variable not set", API_KEY_VAR);
                Err(ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    CONFIG_ERROR_MESSAGE,
                ))
            }
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// Round-trip request body
#[derive(Debug, Deserialize)]
pub struct TranslatePayload {
    pub text: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    pub model: Option<String>,
}

impl TranslatePayload {
    fn into_request(self) -> Result<RoundTripRequest, TranslationError> {
        let text = self
            .text
            .filter(|text| !text.is_empty())
            .ok_or_else(|| TranslationError::MissingField {
                field: "text".to_string(),
            })?;

        Ok(RoundTripRequest {
            text,
            source_lang: self.source.unwrap_or_else(|| DEFAULT_SOURCE_LANG.to_string()),
            target_lang: self.target.unwrap_or_else(|| DEFAULT_TARGET_LANG.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status code plus message, rendered as `{"error": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn parse_payload(
    payload: Result<Json<TranslatePayload>, JsonRejection>,
) -> Result<RoundTripRequest, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!("Rejected request body: {}", rejection);
        ApiError::new(StatusCode::BAD_REQUEST, NOT_JSON_MESSAGE)
    })?;
    Ok(payload.into_request()?)
}

/// Health check handler
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Batch round-trip handler
async fn translate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranslatePayload>, JsonRejection>,
) -> Result<Json<PipelineResult>, ApiError> {
    let pipeline = state.pipeline()?;
    let request = parse_payload(payload)?;

    info!(
        "Translation request: {} chars, {} -> {}, model: {}",
        request.text.len(),
        request.source_lang,
        request.target_lang,
        request.model
    );

    match pipeline.run(&request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!("Translation error: {}", e);
            Err(e.into())
        }
    }
}

fn stage_event(stage: &Stage) -> Event {
    Event::default()
        .event(stage.name())
        .data(stage.payload().to_string())
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .data(serde_json::json!({ "error": message }).to_string())
}

fn sse_response<S>(status: StatusCode, events: S) -> Response
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    (
        status,
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events),
    )
        .into_response()
}

/// Streaming round-trip handler: one SSE event per completed stage
async fn translate_stream(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranslatePayload>, JsonRejection>,
) -> Response {
    let prepared = state
        .pipeline()
        .and_then(|pipeline| parse_payload(payload).map(|request| (pipeline, request)));

    let (pipeline, request) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            let event = error_event(&e.message);
            return sse_response(e.status, stream::once(async move { Ok(event) }));
        }
    };

    info!(
        "Streaming translation request: {} chars, {} -> {}, model: {}",
        request.text.len(),
        request.source_lang,
        request.target_lang,
        request.model
    );

    let events = pipeline.stream(request).map(|item| {
        let event = match item {
            Ok(stage) => {
                info!("Sending {} event", stage.name());
                stage_event(&stage)
            }
            Err(e) => {
                error!("Streaming translation error: {}", e);
                error_event(&e.to_string())
            }
        };
        Ok::<_, Infallible>(event)
    });

    sse_response(StatusCode::OK, events)
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    let index = ServeFile::new(&state.config.index_file);

    Router::new()
        .route_service("/", index)
        .route("/health", get(health_check))
        .route("/translate", post(translate))
        .route("/translate/stream", post(translate_stream))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listening socket. `host` may be an IP address or a hostname.
pub async fn bind_listener(config: &AppConfig) -> std::io::Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await
}

/// Run the HTTP server
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    let listener = bind_listener(&config).await?;
    info!("Starting server on {}", listener.local_addr()?);

    let state = Arc::new(AppState::from_config(Arc::new(config))?);
    let app = router(state);

    axum::serve(listener, app).await?;

    Ok(())
}
