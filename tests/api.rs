//! HTTP contract tests for `/api/summarize` and `/api/health`.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`. The
//! PDF parser and the model are replaced by fakes, so these run offline and
//! without PDFium.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures::future::BoxFuture;
use http_body_util::BodyExt;
use pdf_summarizer::backend::GeminiBackend;
use pdf_summarizer::{
    build_router, ModelReply, SummarizeError, SummarizerConfig, Summarizer, SummaryBackend,
    SummaryService, TextExtractor, UpstreamError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Treats everything after `%PDF-` as the document text. A body containing
/// `BROKEN` makes the "parser" fail.
struct FakeExtractor;

impl TextExtractor for FakeExtractor {
    fn extract(&self, pdf: Vec<u8>) -> BoxFuture<'_, Result<String, SummarizeError>> {
        Box::pin(async move {
            let text = String::from_utf8_lossy(&pdf[5..]).into_owned();
            if text.contains("BROKEN") {
                return Err(SummarizeError::ExtractionFailed("bad xref table".into()));
            }
            Ok(text)
        })
    }
}

enum Behaviour {
    Reply(&'static str),
    Fail(&'static str),
    Hang,
}

struct FakeModel {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl FakeModel {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SummaryBackend for FakeModel {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _model: &'a str,
    ) -> BoxFuture<'a, Result<ModelReply, UpstreamError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            match self.behaviour {
                Behaviour::Reply(text) => Ok(ModelReply::Structured(json!({
                    "candidates": [{ "content": { "parts": [{ "text": text }] } }]
                }))),
                Behaviour::Fail(msg) => Err(UpstreamError::Other(msg.into())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(ModelReply::Text("never observed".into()))
                }
            }
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const MODEL: &str = "gemini-2.5-flash";
const CEILING: usize = 1024;

fn app_with(backend: Arc<dyn SummaryBackend>, timeout: Duration) -> axum::Router {
    let config = SummarizerConfig::builder()
        .max_upload_bytes(CEILING)
        .timeout(timeout)
        .build()
        .unwrap();
    app_from_config(backend, config)
}

fn app_from_config(backend: Arc<dyn SummaryBackend>, config: SummarizerConfig) -> axum::Router {
    let summarizer = Summarizer::new(backend, MODEL, config.timeout, config.max_input_chars);
    let service = SummaryService::new(Arc::new(FakeExtractor), summarizer, config.max_upload_bytes);
    build_router(service, &config)
}

fn app(backend: Arc<FakeModel>) -> axum::Router {
    app_with(backend, Duration::from_secs(5))
}

const BOUNDARY: &str = "----pdfsummarizertestboundary";

/// One multipart part: (field name, content type, bytes).
type Part<'a> = (&'a str, &'a str, &'a [u8]);

fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload.pdf\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/summarize")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn pdf_upload(bytes: &[u8]) -> Request<Body> {
    multipart_request(&[("file", "application/pdf", bytes)])
}

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn assert_error(status: StatusCode, body: &Value, want_status: u16, want_code: &str) {
    assert_eq!(status.as_u16(), want_status, "body: {body}");
    assert_eq!(body["code"], want_code, "body: {body}");
    assert!(body["message"].is_string(), "body: {body}");
}

// ── Success ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn valid_pdf_returns_summary() {
    let model = FakeModel::new(Behaviour::Reply("  • It is a report.\n• It has numbers.  "));
    let (status, body) = send(app(model.clone()), pdf_upload(b"%PDF-Hello world\n")).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["summary"], "• It is a report.\n• It has numbers.");
    assert_eq!(body["model"], MODEL);
    assert_eq!(body["inputChars"], 11);
    assert!(body["durationMs"].is_u64());
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn repeated_upload_gives_same_shape() {
    let model = FakeModel::new(Behaviour::Reply("Same."));
    let router = app(model.clone());
    let (_, first) = send(router.clone(), pdf_upload(b"%PDF-abc")).await;
    let (_, second) = send(router, pdf_upload(b"%PDF-abc")).await;

    assert_eq!(first["summary"], second["summary"]);
    assert_eq!(first["model"], second["model"]);
    assert_eq!(first["model"], MODEL);
    assert_eq!(first["inputChars"], second["inputChars"]);
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn unrelated_fields_are_ignored() {
    let model = FakeModel::new(Behaviour::Reply("ok"));
    let req = multipart_request(&[
        ("note", "text/plain", b"ignore me"),
        ("file", "application/pdf", b"%PDF-content"),
    ]);
    let (status, body) = send(app(model), req).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["inputChars"], 7);
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_file_is_validation_error() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let (status, body) = send(app(model.clone()), pdf_upload(b"")).await;
    assert_error(status, &body, 400, "VALIDATION_ERROR");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn missing_file_field_is_validation_error() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let req = multipart_request(&[("document", "application/pdf", b"%PDF-x")]);
    let (status, body) = send(app(model), req).await;
    assert_error(status, &body, 400, "VALIDATION_ERROR");
}

#[tokio::test]
async fn non_multipart_body_is_validation_error() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let req = Request::builder()
        .method("POST")
        .uri("/api/summarize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(app(model), req).await;
    assert_error(status, &body, 400, "VALIDATION_ERROR");
}

#[tokio::test]
async fn wrong_signature_is_unsupported_media_type() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let (status, body) = send(app(model.clone()), pdf_upload(b"hello")).await;
    assert_error(status, &body, 415, "UNSUPPORTED_MEDIA_TYPE");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn octet_stream_with_signature_is_accepted() {
    let model = FakeModel::new(Behaviour::Reply("fine"));
    let req = multipart_request(&[("file", "application/octet-stream", b"%PDF-text")]);
    let (status, _) = send(app(model), req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn foreign_declared_type_is_unsupported_media_type() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let req = multipart_request(&[("file", "text/plain", b"%PDF-1.4 x")]);
    let (status, body) = send(app(model.clone()), req).await;
    assert_error(status, &body, 415, "UNSUPPORTED_MEDIA_TYPE");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn upload_at_ceiling_is_accepted() {
    let model = FakeModel::new(Behaviour::Reply("fits"));
    let mut bytes = b"%PDF-".to_vec();
    bytes.resize(CEILING, b'a');
    let (status, body) = send(app(model), pdf_upload(&bytes)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["inputChars"], CEILING - 5);
}

#[tokio::test]
async fn upload_over_ceiling_is_rejected() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let mut bytes = b"%PDF-".to_vec();
    bytes.resize(CEILING + 1, b'a');
    let (status, body) = send(app(model.clone()), pdf_upload(&bytes)).await;
    assert_error(status, &body, 413, "PAYLOAD_TOO_LARGE");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn body_far_over_limit_is_rejected() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let mut bytes = b"%PDF-".to_vec();
    bytes.resize(256 * 1024, b'a');
    let (status, body) = send(app(model), pdf_upload(&bytes)).await;
    assert_error(status, &body, 413, "PAYLOAD_TOO_LARGE");
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn textless_pdf_is_empty_pdf_and_skips_model() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let (status, body) = send(app(model.clone()), pdf_upload(b"%PDF- \n\t \n")).await;
    assert_error(status, &body, 400, "EMPTY_PDF");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn parser_failure_is_upstream_error_with_fixed_message() {
    let model = FakeModel::new(Behaviour::Reply("unused"));
    let (status, body) = send(app(model.clone()), pdf_upload(b"%PDF-BROKEN")).await;
    assert_error(status, &body, 502, "AI_UPSTREAM_ERROR");
    assert_eq!(body["message"], "Failed to extract text from PDF");
    assert_eq!(model.calls(), 0);
}

// ── Upstream ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn slow_model_times_out() {
    let model = FakeModel::new(Behaviour::Hang);
    let router = app_with(model.clone(), Duration::from_millis(100));
    let (status, body) = send(router, pdf_upload(b"%PDF-some text")).await;
    assert_error(status, &body, 504, "AI_TIMEOUT");
    assert_eq!(body["message"], "Upstream model timeout");
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn blank_model_answer_is_empty_summary() {
    let model = FakeModel::new(Behaviour::Reply("   \n  "));
    let (status, body) = send(app(model), pdf_upload(b"%PDF-text")).await;
    assert_error(status, &body, 502, "EMPTY_SUMMARY");
}

#[tokio::test]
async fn upstream_failure_message_is_preserved() {
    let model = FakeModel::new(Behaviour::Fail("Resource has been exhausted"));
    let (status, body) = send(app(model), pdf_upload(b"%PDF-text")).await;
    assert_error(status, &body, 502, "AI_UPSTREAM_ERROR");
    assert_eq!(body["message"], "Resource has been exhausted");
}

#[tokio::test]
async fn upstream_abort_text_is_reported_as_timeout() {
    let model = FakeModel::new(Behaviour::Fail("The operation was aborted"));
    let (status, body) = send(app(model), pdf_upload(b"%PDF-text")).await;
    assert_error(status, &body, 504, "AI_TIMEOUT");
}

#[tokio::test]
async fn missing_api_key_is_configuration_error() {
    let backend = GeminiBackend::new(None, "http://127.0.0.1:1").unwrap();
    let router = app_with(Arc::new(backend), Duration::from_secs(5));
    let (status, body) = send(router, pdf_upload(b"%PDF-text")).await;
    assert_error(status, &body, 500, "CONFIGURATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

// ── Health and CORS ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(FakeModel::new(Behaviour::Reply("x"))), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn preflight_mirrors_origin_by_default() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/summarize")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app(FakeModel::new(Behaviour::Reply("x")))
        .oneshot(req)
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/api/summarize")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn configured_origins_restrict_cors() {
    let config = SummarizerConfig::builder()
        .cors_origins(vec![
            "http://allowed.test".into(),
            "bad\norigin".into(),
        ])
        .build()
        .unwrap();
    let router = app_from_config(FakeModel::new(Behaviour::Reply("x")), config);

    let allowed = router
        .clone()
        .oneshot(preflight("http://allowed.test"))
        .await
        .unwrap();
    assert!(allowed.status().is_success());
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://allowed.test"
    );

    let denied = router.oneshot(preflight("http://evil.test")).await.unwrap();
    assert!(denied
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
