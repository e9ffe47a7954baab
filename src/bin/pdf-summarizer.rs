//! CLI binary for pdf-summarizer.
//!
//! `serve` runs the HTTP API; `summarize` runs one local file through the
//! same pipeline and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_summarizer::pipeline::gate::{precheck, PDF_MEDIA_TYPE};
use pdf_summarizer::{
    engine, serve, BackendKind, RawUpload, SummarizerConfig, SummaryProgressCallback,
    SummaryService,
};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Spinner driven by pipeline events ────────────────────────────────────────

struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Uploading");
        bar.set_message("checking file…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_upload_accepted(&self, bytes: usize) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(format!("{bytes} bytes"));
    }

    fn on_text_extracted(&self, input_chars: usize) {
        self.bar
            .println(format!("  {} {input_chars} characters of text", green("✓")));
    }

    fn on_summary_start(&self, model: &str) {
        self.bar.set_prefix("Summarizing");
        self.bar.set_message(model.to_string());
    }

    fn on_summary_complete(&self, duration_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!("{} summary ready in {duration_ms}ms", green("✔"));
    }

    fn on_failure(&self, code: &str, _message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), dim(code));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP API on :3000
  GEMINI_API_KEY=... pdf-summarizer serve

  # Summarize one file from the terminal
  pdf-summarizer summarize report.pdf

  # Same, as the JSON the API would return
  pdf-summarizer summarize --json report.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY               Google Gemini API key (required for the gemini backend)
  GEMINI_MODEL                 Model ID (default: gemini-2.5-flash)
  GEMINI_TIMEOUT_MS            Deadline per summarization call (default: 15000)
  GEMINI_BASE_URL              Gemini REST root (default: Google's v1beta endpoint)
  SUMMARIZER_BACKEND           gemini, or an edgequake provider (openai, anthropic, ollama, …)
  SUMMARIZER_MAX_UPLOAD_BYTES  Upload ceiling (default: 10485760)
  CORS_ORIGIN                  Comma-separated allowed origins (default: mirror any)
  PORT                         Listen port for `serve` (default: 3000)
  PDFIUM_LIB_PATH              Path to an existing libpdfium; skips auto-download
  PDFIUM_CACHE_DIR             Override the pdfium cache root
  RUST_LOG                     tracing filter, e.g. pdf_summarizer=debug
"#;

/// Summarize PDF files with an LLM, over HTTP or from the terminal.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-summarizer",
    version,
    about = "Summarize PDF files with an LLM, over HTTP or from the terminal",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Model ID; overrides GEMINI_MODEL.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Backend: gemini, openai, anthropic, ollama, …; overrides SUMMARIZER_BACKEND.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Summarization deadline in milliseconds; overrides GEMINI_TIMEOUT_MS.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF_SUMMARIZER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF_SUMMARIZER_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve POST /api/summarize and GET /api/health.
    Serve {
        /// Listen address; overrides PORT.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Summarize a local PDF.
    Summarize {
        /// Path to the PDF.
        file: PathBuf,

        /// Print the JSON response body instead of the summary text.
        #[arg(long)]
        json: bool,

        /// Disable the spinner.
        #[arg(long)]
        no_progress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let one_shot = matches!(cli.command, Command::Summarize { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || one_shot {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    match cli.command {
        Command::Serve { .. } => {
            // A missing PDFium is not fatal here: /api/health still works and
            // extraction reports INTERNAL_ERROR until the library shows up.
            if let Err(e) = prepare_engine(cli.quiet).await {
                warn!(error = %e, "PDF engine unavailable");
            }
            let service = SummaryService::from_config(&config)?;
            serve(service, &config).await?;
        }
        Command::Summarize {
            ref file,
            json,
            no_progress,
        } => {
            let show_progress = !cli.quiet && !no_progress && !json;
            summarize_file(file, &config, json, show_progress, cli.quiet).await?;
        }
    }
    Ok(())
}

/// Environment first, then command-line overrides.
fn build_config(cli: &Cli) -> Result<SummarizerConfig> {
    let mut builder = SummarizerConfig::from_env()
        .context("Invalid configuration in environment")?
        .into_builder();

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref backend) = cli.backend {
        builder = builder.backend(BackendKind::parse(backend));
    }
    if let Some(ms) = cli.timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    if let Command::Serve { bind: Some(addr) } = cli.command {
        builder = builder.bind(addr);
    }
    builder.build().context("Invalid configuration")
}

/// Make sure PDFium is on disk before the first request needs it.
async fn prepare_engine(quiet: bool) -> Result<()> {
    if engine::local_library().is_some() {
        return Ok(());
    }

    let bar = (!quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("PDF engine");
        bar.set_message(format!("downloading pdfium {}…", engine::PDFIUM_VERSION));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = tokio::task::spawn_blocking(engine::ensure_library)
        .await
        .context("PDF engine task failed")?;

    if let Some(bar) = bar {
        match &result {
            Ok(_) => bar.finish_with_message("ready ✓"),
            Err(_) => bar.finish_and_clear(),
        }
    }
    result.context("Failed to download PDFium engine")?;
    Ok(())
}

async fn summarize_file(
    path: &Path,
    config: &SummarizerConfig,
    json: bool,
    show_progress: bool,
    quiet: bool,
) -> Result<()> {
    // ── Client-side pre-check on declared metadata ───────────────────────
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let declared_type = declared_media_type(path);
    if let Err(rejection) = precheck(declared_type, meta.len(), config.max_upload_bytes) {
        anyhow::bail!("{}", rejection.message());
    }

    prepare_engine(quiet).await?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let upload = RawUpload {
        bytes,
        declared_type: Some(declared_type.to_string()),
        file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
    };

    let mut service = SummaryService::from_config(config)?;
    if show_progress {
        service = service.with_progress(CliProgressCallback::new() as Arc<dyn SummaryProgressCallback>);
    }

    let response = match service.run(Some(upload)).await {
        Ok(r) => r,
        Err(e) => {
            let c = e.classify();
            anyhow::bail!("{}: {}", c.code, c.message);
        }
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialise response")?
        );
    } else {
        println!("{}", response.summary);
        if !quiet {
            eprintln!(
                "{}",
                dim(&format!(
                    "{} · {} chars in · {}ms",
                    response.model, response.input_chars, response.duration_ms
                ))
            );
        }
    }
    Ok(())
}

/// What a browser would declare for this file, judged by its extension.
fn declared_media_type(path: &Path) -> &'static str {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        PDF_MEDIA_TYPE
    } else {
        "application/octet-stream"
    }
}
