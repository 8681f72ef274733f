//! HTTP API server implementation

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        Form, FromRequest, Json, Request, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::core::batch::{is_valid_language_code, BatchDispatcher, BatchEntry};
use crate::core::client::{MicrosoftTranslator, Translator};
use crate::core::config::{Environment, ProxyConfig};
use crate::core::credentials::Credentials;
use crate::core::errors::ProxyError;
use crate::core::models::{BatchResult, BatchSummary, OutcomeRecord, SpeechRequest};
use crate::core::speech::{GoogleSpeechClient, SpeechSynthesizer};

/// Application state
#[derive(Clone)]
pub struct AppState {
    translator: Arc<dyn Translator>,
    speech: Arc<dyn SpeechSynthesizer>,
    dispatcher: BatchDispatcher,
    environment: Environment,
}

impl AppState {
    /// Wire the state from explicit collaborators
    pub fn new(
        translator: Arc<dyn Translator>,
        speech: Arc<dyn SpeechSynthesizer>,
        config: &ProxyConfig,
    ) -> Self {
        let dispatcher = BatchDispatcher::new(
            Arc::clone(&translator),
            config.max_batch_size,
            config.item_timeout(),
        );

        Self {
            translator,
            speech,
            dispatcher,
            environment: config.environment,
        }
    }

    /// Build the real upstream clients from configuration and resolved credentials
    pub fn from_config(config: &ProxyConfig, credentials: &Credentials) -> crate::core::errors::Result<Self> {
        let translator = Arc::new(MicrosoftTranslator::from_config(config, credentials)?);
        let speech = Arc::new(GoogleSpeechClient::from_config(config, credentials)?);
        Ok(Self::new(translator, speech, config))
    }
}

/// Health check response
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `healthy` while the server is answering
    pub status: String,
    /// RFC 3339 time of the check
    pub timestamp: String,
    /// Crate version
    pub version: String,
    /// Whether the Microsoft Translator key is loaded
    pub microsoft_key: bool,
    /// Whether the Google Text-to-Speech key is loaded
    pub google_key: bool,
}

/// Single translation request
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    /// Text to translate
    pub text: Option<String>,
    /// Target language code
    pub target_lang: Option<String>,
}

/// Single translation response
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    /// Always true
    pub success: bool,
    /// Text as sent by the caller
    pub original_text: String,
    /// Text as returned by the translator
    pub translated_text: String,
    /// Language the text was translated into
    pub target_language: String,
}

/// Batch translation request
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchTranslateRequest {
    /// Entries to translate, in order
    pub texts: Option<Vec<BatchEntry>>,
    /// Target language for entries that do not name their own
    pub target_lang: Option<String>,
}

/// Text-to-speech request
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpeakRequest {
    /// Text to synthesize
    pub text: Option<String>,
    /// Voice language, e.g. `pt-BR`
    pub language_code: Option<String>,
    /// Specific voice to use
    pub voice_name: Option<String>,
    /// `FEMALE`, `MALE` or `NEUTRAL`
    pub ssml_gender: Option<String>,
}

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Caller-facing message
    pub error: String,
    /// Underlying cause, outside production only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error returned from handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            detail: None,
        }
    }

    /// Validation errors keep their message; everything else gets `generic`,
    /// with the real cause attached only outside production
    fn from_proxy(err: ProxyError, generic: &str, environment: Environment) -> Self {
        match err {
            ProxyError::Validation { message } => Self::bad_request(message),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: generic.to_string(),
                detail: (!environment.is_production()).then(|| other.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.message,
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::bad_request(format!("Invalid form body: {}", rejection.body_text()))
    }
}

/// Request body given either as JSON or as `application/x-www-form-urlencoded`
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(OpenApi)]
#[openapi(
    paths(health_check, translate, translate_batch, speak),
    components(schemas(
        HealthResponse,
        TranslateRequest,
        TranslateResponse,
        BatchTranslateRequest,
        BatchEntry,
        BatchResult,
        BatchSummary,
        OutcomeRecord,
        SpeakRequest,
        ErrorResponse
    ))
)]
struct ApiDoc;

/// Health check handler
#[utoipa::path(get, path = "/health", responses((status = 200, body = HealthResponse)))]
async fn health_check() -> Json<HealthResponse> {
    // The server only starts once both keys have resolved
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        microsoft_key: true,
        google_key: true,
    })
}

/// Single translation handler
#[utoipa::path(
    post,
    path = "/translate",
    request_body(content = TranslateRequest, description = "JSON or form-encoded body"),
    responses(
        (status = 200, body = TranslateResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse)
    )
)]
async fn translate(
    State(state): State<Arc<AppState>>,
    JsonOrForm(payload): JsonOrForm<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {

    let (Some(text), Some(target_lang)) = (required(payload.text), required(payload.target_lang)) else {
        return Err(ApiError::bad_request("Required fields: text and targetLang"));
    };
    let target_lang = target_lang.trim().to_string();

    if !is_valid_language_code(&target_lang) {
        return Err(ApiError::bad_request(format!("Invalid targetLang '{}'", target_lang)));
    }

    match state.translator.translate(&text, &target_lang).await {
        Ok(translated_text) => Ok(Json(TranslateResponse {
            success: true,
            original_text: text,
            translated_text,
            target_language: target_lang,
        })),
        Err(e) => {
            warn!("Translation failed: {}", e);
            Err(ApiError::from_proxy(e, "Translation failed", state.environment))
        }
    }
}

/// Batch translation handler
#[utoipa::path(
    post,
    path = "/translate/batch",
    request_body = BatchTranslateRequest,
    responses(
        (status = 200, description = "Per-item outcomes, including failed items", body = BatchResult),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse)
    )
)]
async fn translate_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchTranslateRequest>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(payload) = payload?;

    let texts = payload
        .texts
        .ok_or_else(|| ApiError::bad_request("Required fields: texts and targetLang"))?;

    let items = state
        .dispatcher
        .validate(&texts, payload.target_lang.as_deref())
        .map_err(|e| ApiError::from_proxy(e, "Invalid batch", state.environment))?;

    state
        .dispatcher
        .dispatch(items)
        .await
        .map(Json)
        .map_err(|e| {
            warn!("Batch translation failed: {}", e);
            ApiError::from_proxy(e, "Batch translation failed", state.environment)
        })
}

/// Text-to-speech handler
#[utoipa::path(
    post,
    path = "/speak",
    request_body(content = SpeakRequest, description = "JSON or form-encoded body"),
    responses(
        (status = 200, description = "MP3 audio (audio/mpeg)"),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse)
    )
)]
async fn speak(
    State(state): State<Arc<AppState>>,
    JsonOrForm(payload): JsonOrForm<SpeakRequest>,
) -> Result<Response, ApiError> {

    let (Some(text), Some(language_code)) = (required(payload.text), required(payload.language_code)) else {
        return Err(ApiError::bad_request("Required fields: text and languageCode"));
    };

    let mut request = SpeechRequest::new(text, language_code.trim());
    if let Some(voice_name) = required(payload.voice_name) {
        request = request.with_voice_name(voice_name);
    }
    if let Some(ssml_gender) = required(payload.ssml_gender) {
        request = request.with_ssml_gender(ssml_gender.to_uppercase());
    }

    match state.speech.synthesize(&request).await {
        Ok(audio) => Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response()),
        Err(e) => {
            warn!("Speech synthesis failed: {}", e);
            Err(ApiError::from_proxy(e, "Audio generation failed", state.environment))
        }
    }
}

/// OpenAPI document handler
async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/translate", post(translate))
        .route("/translate/batch", post(translate_batch))
        .route("/speak", post(speak))
        .route("/api-docs/openapi.json", get(openapi))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Run the HTTP server
pub async fn run_server(config: ProxyConfig, credentials: Credentials) -> anyhow::Result<()> {
    let state = AppState::from_config(&config, &credentials)?;
    let app = create_router(state);

    // Bind address
    let addr: SocketAddr = config.bind_address().parse()?;

    info!(
        "Starting server on {} ({:?}, max batch size {})",
        addr, config.environment, config.max_batch_size
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
