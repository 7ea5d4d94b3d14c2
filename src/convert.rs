//! Top-level conversion orchestration.
//!
//! [`convert`] drives the full pipeline for a batch of inputs: resolve each
//! input to a local file, normalise it, run OCR, classify the extracted
//! lines, and assemble one combined LaTeX document. [`convert_to_file`]
//! additionally persists the document (and optionally compiles it), and
//! [`convert_sync`] wraps the async API for blocking callers.
//!
//! Images are processed strictly in submission order and their sections
//! appear in the document in that order. A decode failure is fatal for the
//! whole batch; an OCR failure only skips that image's lines and is
//! reported as a warning.

use crate::config::ConversionConfig;
use crate::error::Board2TexError;
use crate::ocr::{OcrEngine, TesseractCli};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::assemble::{assemble_document, suggested_base_name};
use crate::pipeline::classify::{classify, Classification};
use crate::pipeline::compile::compile_pdf;
use crate::pipeline::extract::extract_lines;
use crate::pipeline::input::resolve_input;
use crate::pipeline::preprocess::preprocess_image;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Convert a batch of board-photo inputs (paths or HTTP URLs) to a LaTeX
/// document.
///
/// Returns the assembled document together with per-stage statistics and any
/// stage warnings. The scratch workspace holding downloads and intermediate
/// images is removed before this function returns.
///
/// `config.compile_pdf` has no effect here: compilation needs a durable
/// `.tex` on disk, so it runs only in [`convert_to_file`].
///
/// # Errors
/// Fatal [`Board2TexError`]s: unresolvable input, undecodable image, empty
/// batch, or scratch workspace failure.
pub async fn convert(
    inputs: &[String],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Board2TexError> {
    let started = Instant::now();

    if inputs.is_empty() {
        return Err(Board2TexError::InvalidInput {
            input: "(no inputs given)".to_string(),
        });
    }

    let scratch = tempfile::tempdir()
        .map_err(|e| Board2TexError::Internal(format!("Failed to create scratch dir: {}", e)))?;

    let engine: Arc<dyn OcrEngine> = config
        .engine
        .clone()
        .unwrap_or_else(|| Arc::new(TesseractCli::default()));

    info!(
        images = inputs.len(),
        engine = engine.name(),
        "starting conversion"
    );

    let mut stats = ConversionStats {
        total_images: inputs.len(),
        ..ConversionStats::default()
    };
    let mut warnings = Vec::new();
    let mut captures: Vec<Classification> = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        let resolved =
            resolve_input(input, scratch.path(), config.download_timeout_secs).await?;

        let pre_started = Instant::now();
        let pre = preprocess_image(resolved.path(), config, scratch.path(), index).await?;
        stats.preprocess_duration_ms += pre_started.elapsed().as_millis() as u64;

        let ocr_started = Instant::now();
        let lines = match extract_lines(&engine, &pre.enhanced, index, config).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(image = index, error = %e, "OCR stage failed, skipping image");
                warnings.push(e);
                stats.failed_images += 1;
                Vec::new()
            }
        };
        stats.ocr_duration_ms += ocr_started.elapsed().as_millis() as u64;
        stats.total_lines += lines.len();

        info!(
            image = index,
            width = pre.width,
            height = pre.height,
            lines = lines.len(),
            "image processed"
        );
        captures.push(classify(&lines));
    }

    stats.bullet_count = captures.iter().map(|c| c.bullets.len()).sum();
    stats.block_count = captures.iter().map(|c| c.blocks.len()).sum();

    let latex = assemble_document(&config.title, &captures);
    stats.total_duration_ms = started.elapsed().as_millis() as u64;

    info!(
        lines = stats.total_lines,
        bullets = stats.bullet_count,
        blocks = stats.block_count,
        duration_ms = stats.total_duration_ms,
        "conversion complete"
    );

    Ok(ConversionOutput {
        latex,
        base_name: suggested_base_name(inputs.len()),
        stats,
        warnings,
    })
}

/// Convert and write the document to `output_path` (atomically), then
/// compile it to PDF when `config.compile_pdf` is set.
///
/// The `.tex` is written via a temporary file in the target directory and
/// renamed into place, so readers never observe a half-written document.
/// Compilation failures are appended to `warnings`; the `.tex` stays valid
/// regardless.
pub async fn convert_to_file(
    inputs: &[String],
    config: &ConversionConfig,
    output_path: &Path,
) -> Result<ConversionOutput, Board2TexError> {
    let mut output = convert(inputs, config).await?;

    write_atomic(output_path, &output.latex)?;
    info!(path = %output_path.display(), "wrote LaTeX document");

    if config.compile_pdf {
        match compile_pdf(output_path, config.compile_timeout_secs).await {
            Ok(pdf) => info!(pdf = %pdf.display(), "wrote PDF"),
            Err(e) => {
                warn!(error = %e, "PDF compilation failed");
                output.warnings.push(e);
            }
        }
    }

    Ok(output)
}

/// Blocking wrapper around [`convert`] for non-async callers.
///
/// Builds a private multi-threaded runtime per call; do not call from inside
/// an existing Tokio runtime.
pub fn convert_sync(
    inputs: &[String],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Board2TexError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Board2TexError::Internal(format!("Failed to start runtime: {}", e)))?;
    runtime.block_on(convert(inputs, config))
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), Board2TexError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        std::fs::create_dir_all(dir).map_err(|source| Board2TexError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let dir = parent.unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| {
        Board2TexError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tmp.write_all(contents.as_bytes())
        .map_err(|source| Board2TexError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    tmp.persist(path)
        .map_err(|e| Board2TexError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrToken;
    use image::RgbImage;
    use std::path::PathBuf;

    struct FixedEngine {
        tokens: Vec<OcrToken>,
    }

    impl OcrEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _image_path: &Path) -> std::io::Result<Vec<OcrToken>> {
            Ok(self.tokens.clone())
        }
    }

    struct FailingEngine;

    impl OcrEngine for FailingEngine {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(&self, _image_path: &Path) -> std::io::Result<Vec<OcrToken>> {
            Err(std::io::Error::other("engine exploded"))
        }
    }

    fn token(text: &str, left: i64) -> OcrToken {
        OcrToken {
            text: text.to_string(),
            confidence: 90.0,
            left,
            top: 10,
            width: 20,
            height: 12,
            line_num: 1,
            block_num: 1,
        }
    }

    fn write_test_image(dir: &Path) -> PathBuf {
        let img = RgbImage::from_fn(40, 30, |x, _| {
            if (8..32).contains(&x) {
                image::Rgb([20, 30, 25])
            } else {
                image::Rgb([230, 230, 230])
            }
        });
        let path = dir.join("board.png");
        img.save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let config = ConversionConfig::default();
        let err = convert(&[], &config).await;
        assert!(matches!(err, Err(Board2TexError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let config = ConversionConfig::default();
        let err = convert(&["/no/such/board.png".to_string()], &config).await;
        assert!(matches!(err, Err(Board2TexError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn full_pipeline_with_injected_engine() {
        let dir = tempfile::tempdir().unwrap();
        let img = write_test_image(dir.path());

        let engine = FixedEngine {
            tokens: vec![token("x^2", 5), token("=", 30), token("4", 50)],
        };
        let config = ConversionConfig::builder()
            .engine(Arc::new(engine))
            .title("Unit Test")
            .build()
            .unwrap();

        let out = convert(&[img.to_string_lossy().into_owned()], &config)
            .await
            .unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.stats.total_images, 1);
        assert_eq!(out.stats.total_lines, 1);
        assert_eq!(out.stats.block_count, 1);
        assert!(out.latex.contains("\\title{Unit Test}"));
        assert!(out.latex.contains("x^{2} = 4"));
        assert!(out.base_name.starts_with("notes_"));
    }

    #[tokio::test]
    async fn ocr_failure_becomes_warning_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let img = write_test_image(dir.path());

        let config = ConversionConfig::builder()
            .engine(Arc::new(FailingEngine))
            .build()
            .unwrap();

        let out = convert(&[img.to_string_lossy().into_owned()], &config)
            .await
            .unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.stats.failed_images, 1);
        assert!(out.latex.contains("\\end{document}"));
    }

    #[tokio::test]
    async fn convert_to_file_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let img = write_test_image(dir.path());
        let out_path = dir.path().join("nested").join("notes.tex");

        let config = ConversionConfig::builder()
            .engine(Arc::new(FixedEngine {
                tokens: vec![token("hello", 5)],
            }))
            .build()
            .unwrap();

        let out = convert_to_file(&[img.to_string_lossy().into_owned()], &config, &out_path)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&out_path).unwrap();
        assert_eq!(written, out.latex);
    }

    #[test]
    fn convert_sync_runs_without_ambient_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let img = write_test_image(dir.path());

        let config = ConversionConfig::builder()
            .engine(Arc::new(FixedEngine {
                tokens: vec![token("- item", 5)],
            }))
            .build()
            .unwrap();

        let out = convert_sync(&[img.to_string_lossy().into_owned()], &config).unwrap();
        assert_eq!(out.stats.bullet_count, 1);
    }
}
