//! Configuration for the summarization service.
//!
//! Every knob lives in [`SummarizerConfig`], built via its
//! [`SummarizerConfigBuilder`] or loaded from the process environment with
//! [`SummarizerConfig::from_env`]. The CLI maps its flags onto the builder, so
//! library users, the server and the one-shot CLI all share one set of
//! defaults.

use crate::error::SummarizeError;
use crate::prompts::MAX_INPUT_CHARS;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Default upstream model when `GEMINI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default deadline for one summarization call.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default Gemini REST endpoint root.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Which summarization backend to call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Google Gemini over its REST API (default).
    #[default]
    Gemini,
    /// Any provider known to the edgequake provider factory, by name
    /// (`"openai"`, `"anthropic"`, `"ollama"`, …).
    Provider(String),
}

impl BackendKind {
    /// Parse a backend name. `"gemini"` (any case) selects the REST backend.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("gemini") {
            BackendKind::Gemini
        } else {
            BackendKind::Provider(name.to_lowercase())
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Gemini => f.write_str("gemini"),
            BackendKind::Provider(name) => f.write_str(name),
        }
    }
}

/// Configuration for the upload → extract → summarize pipeline and its server.
///
/// # Example
/// ```rust
/// use pdf_summarizer::SummarizerConfig;
/// use std::time::Duration;
///
/// let config = SummarizerConfig::builder()
///     .model("gemini-2.5-pro")
///     .timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.5-pro");
/// ```
#[derive(Clone)]
pub struct SummarizerConfig {
    /// Upstream API credential (`GEMINI_API_KEY`). Checked per request, so a
    /// server without a key still starts and reports `CONFIGURATION_ERROR`.
    pub api_key: Option<String>,

    /// Upstream model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Deadline for one summarization call. Default: 15 s.
    pub timeout: Duration,

    /// Which backend to call. Default: [`BackendKind::Gemini`].
    pub backend: BackendKind,

    /// Gemini REST endpoint root. Overridable for proxies and tests.
    pub gemini_base_url: String,

    /// Upload ceiling in bytes. A payload of exactly this size is accepted.
    pub max_upload_bytes: usize,

    /// Characters of extracted text sent upstream. Default: 120 000.
    pub max_input_chars: usize,

    /// Allowed cross-origin callers. Empty means any origin is mirrored.
    pub cors_origins: Vec<String>,

    /// Listen address for `serve`.
    pub bind: SocketAddr,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            backend: BackendKind::default(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_input_chars: MAX_INPUT_CHARS,
            cors_origins: Vec::new(),
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

impl fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("backend", &self.backend)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_input_chars", &self.max_input_chars)
            .field("cors_origins", &self.cors_origins)
            .field("bind", &self.bind)
            .finish()
    }
}

impl SummarizerConfig {
    /// Create a new builder for `SummarizerConfig`.
    pub fn builder() -> SummarizerConfigBuilder {
        SummarizerConfigBuilder {
            config: Self::default(),
        }
    }

    /// A builder seeded with this configuration, for layering overrides.
    pub fn into_builder(self) -> SummarizerConfigBuilder {
        SummarizerConfigBuilder { config: self }
    }

    /// Load configuration from the process environment.
    ///
    /// Unset or empty variables keep their defaults. Unparseable numbers are
    /// an [`SummarizeError::Configuration`] error rather than a silent default.
    pub fn from_env() -> Result<Self, SummarizeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SummarizeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(key) = get("GEMINI_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            builder = builder.model(model);
        }
        if let Some(ms) = get("GEMINI_TIMEOUT_MS") {
            builder = builder.timeout(Duration::from_millis(parse_number(
                "GEMINI_TIMEOUT_MS",
                &ms,
            )?));
        }
        if let Some(name) = get("SUMMARIZER_BACKEND") {
            builder = builder.backend(BackendKind::parse(&name));
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            builder = builder.gemini_base_url(url);
        }
        if let Some(bytes) = get("SUMMARIZER_MAX_UPLOAD_BYTES") {
            builder = builder.max_upload_bytes(parse_number(
                "SUMMARIZER_MAX_UPLOAD_BYTES",
                &bytes,
            )?);
        }
        if let Some(origins) = get("CORS_ORIGIN") {
            builder = builder.cors_origins(parse_origins(&origins));
        }
        if let Some(port) = get("PORT") {
            let port: u16 = parse_number("PORT", &port)?;
            builder = builder.bind(SocketAddr::from(([0, 0, 0, 0], port)));
        }

        builder.build()
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, SummarizeError> {
    raw.trim().parse().map_err(|_| {
        SummarizeError::Configuration(format!("{var} must be a number, got '{raw}'"))
    })
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder for [`SummarizerConfig`].
#[derive(Debug)]
pub struct SummarizerConfigBuilder {
    config: SummarizerConfig,
}

impl SummarizerConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.gemini_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn max_input_chars(mut self, chars: usize) -> Self {
        self.config.max_input_chars = chars;
        self
    }

    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors_origins = origins;
        self
    }

    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind = addr;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummarizerConfig, SummarizeError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(SummarizeError::Configuration(
                "model identifier must not be empty".into(),
            ));
        }
        if c.timeout.is_zero() {
            return Err(SummarizeError::Configuration(
                "timeout must be greater than zero".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(SummarizeError::Configuration(
                "upload ceiling must be at least one byte".into(),
            ));
        }
        if c.max_input_chars == 0 {
            return Err(SummarizeError::Configuration(
                "max_input_chars must be at least 1".into(),
            ));
        }
        Ok(self.config)
    }
}
