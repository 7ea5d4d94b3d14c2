//! Error types for the board2tex library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Board2TexError`] — **Fatal**: the conversion cannot proceed at all
//!   (unreadable or corrupt input image, bad configuration, output write
//!   failure). Returned as `Err(Board2TexError)` from the top-level
//!   `convert*` functions. A decode failure is fatal for the whole batch
//!   because all images feed a single combined document.
//!
//! * [`StageError`] — **Recoverable, stage-scoped**: an external collaborator
//!   failed (OCR engine unavailable or timed out for one image, LaTeX
//!   compiler missing or failing). Collected in
//!   [`crate::output::ConversionOutput::warnings`] so the document text that
//!   was produced is still returned.
//!
//! The split lets callers decide their own tolerance: treat any warning as an
//! error, log and continue, or ignore the compile step entirely.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the board2tex library.
///
/// Stage-scoped failures use [`StageError`] and are stored in
/// [`crate::output::ConversionOutput::warnings`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Board2TexError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not in a recognised image format.
    #[error("File is not a supported image: '{path}'\nFirst bytes: {magic:?}")]
    NotAnImage { path: PathBuf, magic: [u8; 8] },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The image could not be decoded into pixels.
    ///
    /// Fatal to the whole batch: the final document combines every image's
    /// lines, so proceeding with a missing image would silently drop content.
    #[error("Failed to decode image '{path}': {detail}")]
    DecodeFailed { path: PathBuf, detail: String },

    /// Writing an intermediate image into the scratch workspace failed.
    #[error("Failed to write intermediate image '{path}': {detail}")]
    IntermediateWriteFailed { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output LaTeX file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable failure of one external-collaborator stage.
///
/// Stored in [`crate::output::ConversionOutput::warnings`]. None of these
/// variants ever blocks the return of the document text already produced.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StageError {
    /// The OCR engine failed for one image; its lines are skipped.
    #[error("OCR failed for image {image}: {detail}")]
    Ocr { image: usize, detail: String },

    /// The OCR engine did not answer within the configured timeout.
    #[error("OCR timed out after {secs}s for image {image}")]
    OcrTimeout { image: usize, secs: u64 },

    /// No LaTeX compiler (latexmk or pdflatex) was found on PATH.
    #[error("No LaTeX compiler found: {detail}\nInstall latexmk or pdflatex, or skip compilation.")]
    CompilerMissing { detail: String },

    /// The compiler ran but exited non-zero.
    #[error("LaTeX compilation failed: {detail}")]
    CompileFailed { detail: String },

    /// The compiler did not finish within the configured timeout.
    #[error("LaTeX compilation timed out after {secs}s")]
    CompileTimeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failed_display() {
        let e = Board2TexError::DecodeFailed {
            path: PathBuf::from("board.jpg"),
            detail: "truncated JPEG".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("board.jpg"), "got: {msg}");
        assert!(msg.contains("truncated JPEG"));
    }

    #[test]
    fn not_an_image_display_shows_magic() {
        let e = Board2TexError::NotAnImage {
            path: PathBuf::from("notes.txt"),
            magic: *b"hello wo",
        };
        assert!(e.to_string().contains("notes.txt"));
    }

    #[test]
    fn ocr_timeout_display() {
        let e = StageError::OcrTimeout { image: 2, secs: 30 };
        assert!(e.to_string().contains("30s"));
        assert!(e.to_string().contains("image 2"));
    }

    #[test]
    fn compiler_missing_display() {
        let e = StageError::CompilerMissing {
            detail: "latexmk: not found".into(),
        };
        assert!(e.to_string().contains("latexmk"));
    }
}
