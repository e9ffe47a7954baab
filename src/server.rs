//! HTTP surface: `POST /api/summarize` and `GET /api/health`.
//!
//! The handler only moves bytes. It streams the `file` field into memory
//! while enforcing the upload ceiling, then hands a [`RawUpload`] to
//! [`SummaryService::run`]. Every failure is rendered through
//! [`SummarizeError::classify`], so the wire contract lives in one place.

use crate::config::SummarizerConfig;
use crate::error::SummarizeError;
use crate::output::{ErrorBody, PipelineResponse};
use crate::pipeline::gate::RawUpload;
use crate::service::SummaryService;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const SUMMARIZE_PATH: &str = "/api/summarize";
pub const HEALTH_PATH: &str = "/api/health";

/// Name of the multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

/// Room for multipart boundaries and part headers on top of the ceiling.
const ENVELOPE_SLACK: usize = 64 * 1024;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    service: Arc<SummaryService>,
}

/// A pipeline failure on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub SummarizeError);

impl From<SummarizeError> for ApiError {
    fn from(e: SummarizeError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let classified = self.0.classify();
        if let SummarizeError::Internal(detail) = &self.0 {
            error!(%detail, "unexpected error while handling request");
        }
        (classified.status, Json(ErrorBody::from(&classified))).into_response()
    }
}

/// The application router, without a listener.
pub fn build_router(service: SummaryService, config: &SummarizerConfig) -> Router {
    let body_limit = service.max_upload_bytes().saturating_add(ENVELOPE_SLACK);
    let state = AppState {
        service: Arc::new(service),
    };

    Router::new()
        .route(SUMMARIZE_PATH, post(summarize))
        .route(HEALTH_PATH, get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn summarize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let mut multipart =
        multipart.map_err(|e| SummarizeError::MalformedUpload(e.body_text()))?;
    let upload = read_upload(&mut multipart, state.service.max_upload_bytes()).await?;
    let response = state.service.run(upload).await?;
    Ok(Json(response))
}

/// Pull the first `file` field out of the form. Other fields are skipped.
async fn read_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<Option<RawUpload>, SummarizeError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if upload.is_some() || field.name() != Some(FILE_FIELD) {
            debug!(field = ?field.name(), "skipping multipart field");
            continue;
        }
        upload = Some(read_file_field(field, max_bytes).await?);
    }
    Ok(upload)
}

async fn read_file_field(
    mut field: Field<'_>,
    max_bytes: usize,
) -> Result<RawUpload, SummarizeError> {
    let declared_type = field.content_type().map(str::to_string);
    let file_name = field.file_name().map(str::to_string);

    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(SummarizeError::PayloadTooLarge { limit: max_bytes });
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(RawUpload {
        bytes,
        declared_type,
        file_name,
    })
}

fn multipart_error(e: axum::extract::multipart::MultipartError, max_bytes: usize) -> SummarizeError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SummarizeError::PayloadTooLarge { limit: max_bytes }
    } else {
        SummarizeError::MalformedUpload(e.body_text())
    }
}

// ── Listener ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to determine local address: {source}")]
    LocalAddr {
        #[source]
        source: std::io::Error,
    },
    #[error("axum server error: {source}")]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ShutdownEvent {
    Pending,
    CtrlC,
    SigTerm,
    ListenerFailed,
}

/// Bind `config.bind` and serve until Ctrl+C or SIGTERM.
///
/// In-flight requests get [`DRAIN_TIMEOUT`] to finish after the signal.
pub async fn serve(service: SummaryService, config: &SummarizerConfig) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            address: config.bind,
            source,
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::LocalAddr { source })?;
    info!(%local_addr, model = %service.model(), "pdf-summarizer listening");

    let app = build_router(service, config);
    let (shutdown_tx, shutdown_rx) = watch::channel(ShutdownEvent::Pending);

    let mut server = Box::pin(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(broadcast_shutdown(shutdown_tx))
            .await
    });
    let mut drain = Box::pin(drain_timeout(shutdown_rx.clone()));

    tokio::select! {
        result = server.as_mut() => {
            result.map_err(|source| ServerError::Serve { source })?;
        }
        _ = drain.as_mut() => {}
    }

    let event = *shutdown_rx.borrow();
    info!(?event, "server stopped");
    Ok(())
}

async fn wait_for_shutdown() -> ShutdownEvent {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ShutdownEvent::CtrlC,
            Err(error) => {
                warn!(%error, "failed to capture Ctrl+C");
                ShutdownEvent::ListenerFailed
            }
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => match term.recv().await {
                Some(()) => ShutdownEvent::SigTerm,
                None => ShutdownEvent::ListenerFailed,
            },
            Err(error) => {
                warn!(%error, "failed to capture SIGTERM");
                ShutdownEvent::ListenerFailed
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<ShutdownEvent>();

    tokio::select! {
        event = ctrl_c => event,
        event = sigterm => event,
    }
}

fn broadcast_shutdown(
    sender: watch::Sender<ShutdownEvent>,
) -> impl Future<Output = ()> + Send + 'static {
    async move {
        let event = wait_for_shutdown().await;
        if let Err(error) = sender.send(event) {
            warn!(?event, %error, "failed to broadcast shutdown event");
        }
    }
}

fn drain_timeout(
    mut receiver: watch::Receiver<ShutdownEvent>,
) -> impl Future<Output = ()> + Send + 'static {
    async move {
        if receiver.changed().await.is_ok() {
            let event = *receiver.borrow_and_update();
            info!(?event, "shutdown signal received; draining connections");
            tokio::time::sleep(DRAIN_TIMEOUT).await;
            warn!(
                seconds = DRAIN_TIMEOUT.as_secs(),
                "drain timed out; dropping remaining connections"
            );
        } else {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn api_error_renders_classified_body() {
        let resp = ApiError(SummarizeError::AiTimeout { timeout_ms: 100 }).into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, "AI_TIMEOUT");
        assert_eq!(body.message, "Upstream model timeout");
    }

    #[tokio::test]
    async fn internal_details_stay_out_of_the_body() {
        let resp = ApiError(SummarizeError::Internal("join error: panicked".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("panicked"));
    }
}
