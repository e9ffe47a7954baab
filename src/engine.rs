//! PDFium provisioning: find, fetch and bind the shared library once.
//!
//! Text extraction needs the native PDFium library. Resolution order:
//!
//! 1. `PDFIUM_LIB_PATH` pointing at an existing file.
//! 2. The per-version cache directory (`PDFIUM_CACHE_DIR` overrides its root).
//! 3. Download the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//!    and unpack the library into the cache directory.
//!
//! The bound [`Pdfium`] instance is process-wide; binding happens at most once.
//! Everything here is blocking and must run on a blocking thread.

use once_cell::sync::OnceCell;
use pdfium_render::prelude::Pdfium;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

const RELEASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Errors raised while provisioning PDFium.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no PDFium build for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("cannot prepare cache directory '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDFium download failed: {0}")]
    Download(String),

    #[error("PDFium archive is unusable: {0}")]
    Unpack(String),

    #[error("failed to load PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Where a platform's library lives in the release archive and on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LibraryTarget {
    archive: &'static str,
    member: &'static str,
    file_name: &'static str,
}

fn library_target(os: &str, arch: &str) -> Result<LibraryTarget, EngineError> {
    let (archive, member, file_name) = match (os, arch) {
        ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
        ("macos", "x86_64") => ("pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
        _ => {
            return Err(EngineError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };
    Ok(LibraryTarget {
        archive,
        member,
        file_name,
    })
}

fn host_target() -> Result<LibraryTarget, EngineError> {
    library_target(std::env::consts::OS, std::env::consts::ARCH)
}

/// Per-version cache directory for the library.
///
/// `PDFIUM_CACHE_DIR` replaces the platform cache root when set.
pub fn cache_dir() -> PathBuf {
    let root = std::env::var_os("PDFIUM_CACHE_DIR")
        .map(PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|d| d.join("pdf-summarizer")))
        .unwrap_or_else(|| std::env::temp_dir().join("pdf-summarizer"));
    root.join(format!("pdfium-{PDFIUM_VERSION}"))
}

/// Path of a usable library without touching the network, if there is one.
pub fn local_library() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from) {
        if p.exists() {
            return Some(p);
        }
        warn!(path = %p.display(), "PDFIUM_LIB_PATH does not exist; ignoring");
    }
    let target = host_target().ok()?;
    let cached = cache_dir().join(target.file_name);
    cached.exists().then_some(cached)
}

/// Make sure a library file is on disk, downloading it if needed.
pub fn ensure_library() -> Result<PathBuf, EngineError> {
    if let Some(path) = local_library() {
        debug!(path = %path.display(), "using local PDFium");
        return Ok(path);
    }

    let target = host_target()?;
    let dir = cache_dir();
    std::fs::create_dir_all(&dir).map_err(|source| EngineError::CacheDir {
        path: dir.clone(),
        source,
    })?;

    let url = format!("{RELEASE_URL}/chromium%2F{PDFIUM_VERSION}/{}", target.archive);
    info!(%url, "downloading PDFium");
    let archive = download(&url)?;

    let dest = dir.join(target.file_name);
    unpack_member(&archive, target.member, &dest)?;
    info!(path = %dest.display(), "PDFium ready");
    Ok(dest)
}

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// The process-wide PDFium instance, provisioning and binding on first use.
pub fn pdfium() -> Result<&'static Pdfium, EngineError> {
    PDFIUM.get_or_try_init(|| {
        let path = ensure_library()?;
        bind(&path)
    })
}

fn bind(path: &Path) -> Result<Pdfium, EngineError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| EngineError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn download(url: &str) -> Result<Vec<u8>, EngineError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdf-summarizer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| EngineError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| EngineError::Download(format!("GET {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(EngineError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let mut buf = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    response
        .read_to_end(&mut buf)
        .map_err(|e| EngineError::Download(format!("read error: {e}")))?;
    debug!(bytes = buf.len(), "PDFium archive downloaded");
    Ok(buf)
}

/// Unpack one member of a gzipped tarball to `dest`.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), EngineError> {
    use flate2::read::GzDecoder;

    let mut tar = tar::Archive::new(GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| EngineError::Unpack(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| EngineError::Unpack(e.to_string()))?;
        let is_member = entry
            .path()
            .map_err(|e| EngineError::Unpack(e.to_string()))?
            .as_ref()
            == Path::new(member);
        if is_member {
            entry
                .unpack(dest)
                .map_err(|e| EngineError::Unpack(format!("unpack {member}: {e}")))?;
            return Ok(());
        }
    }

    Err(EngineError::Unpack(format!("'{member}' not in archive")))
}
