//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! ## Why download into the scratch workspace?
//!
//! The preprocessor and the tesseract subprocess both need a file-system
//! path — neither can stream from a byte buffer. Downloads land in the
//! caller's per-session scratch directory, so cleanup is owned by one place
//! (the `TempDir` in [`crate::convert`]) and happens on every exit path.
//! We sniff the image format from the leading bytes before returning so
//! callers get a meaningful error rather than a decoder failure later.

use crate::error::Board2TexError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The resolved input — either a local path or a downloaded scratch file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; image downloaded into the scratch workspace.
    Downloaded(PathBuf),
}

impl ResolvedInput {
    /// Get the path to the image file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded(p) => p,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local image file path.
///
/// If the input is a URL, download it into `work_dir`.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(
    input: &str,
    work_dir: &Path,
    timeout_secs: u64,
) -> Result<ResolvedInput, Board2TexError> {
    if is_url(input) {
        download_url(input, work_dir, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and image magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, Board2TexError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Board2TexError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 8];
            if f.read_exact(&mut magic).is_ok() && image::guess_format(&magic).is_err() {
                return Err(Board2TexError::NotAnImage { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Board2TexError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Board2TexError::FileNotFound { path });
        }
    }

    debug!("Resolved local image: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL into the scratch workspace and return the path.
async fn download_url(
    url: &str,
    work_dir: &Path,
    timeout_secs: u64,
) -> Result<ResolvedInput, Board2TexError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Board2TexError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Board2TexError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Board2TexError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Board2TexError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);
    let file_path = work_dir.join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Board2TexError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    // Sniff the format before writing; an HTML error page is not an image.
    if bytes.len() >= 8 {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[..8]);
        if image::guess_format(&magic).is_err() {
            return Err(Board2TexError::NotAnImage {
                path: file_path,
                magic,
            });
        }
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Board2TexError::Internal(format!("Failed to write scratch file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded(file_path))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.img".to_string()
}
