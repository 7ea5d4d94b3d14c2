//! Output types returned by the conversion functions.

use crate::error::StageError;
use serde::{Deserialize, Serialize};

/// The result of converting one submitted batch of board photos.
///
/// The document is immutable once assembled: `latex` is the single serialised
/// form. Persistence (writing `<base_name>.tex`, keeping the compiled PDF) is
/// the caller's concern; the library only suggests the name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The complete LaTeX document text. Always structurally valid, even
    /// when no usable lines survived confidence filtering (empty body).
    pub latex: String,

    /// Suggested file base name: `notes_<timestamp>` with a `_multi<N>`
    /// suffix when the batch contained more than one image.
    pub base_name: String,

    /// Aggregate counters and per-stage durations.
    pub stats: ConversionStats,

    /// Recoverable stage failures (OCR for a single image, PDF compilation).
    /// Non-empty warnings never invalidate `latex`.
    pub warnings: Vec<StageError>,
}

/// Statistics about a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Number of images in the submitted batch.
    pub total_images: usize,
    /// Images whose OCR stage failed (their lines are absent from the document).
    pub failed_images: usize,
    /// Visual lines that survived confidence filtering, across all images.
    pub total_lines: usize,
    /// Bullet entries in the assembled document (includes prose fallbacks).
    pub bullet_count: usize,
    /// Heading and equation blocks in the assembled document.
    pub block_count: usize,
    /// Wall-clock milliseconds spent in image preprocessing.
    pub preprocess_duration_ms: u64,
    /// Wall-clock milliseconds spent waiting on the OCR engine.
    pub ocr_duration_ms: u64,
    /// Total wall-clock milliseconds for the whole conversion.
    pub total_duration_ms: u64,
}
