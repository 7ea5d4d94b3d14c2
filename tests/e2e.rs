//! End-to-end integration tests for board2tex.
//!
//! These tests run the full pipeline — input resolution, preprocessing,
//! line extraction, classification, assembly — against synthetic board
//! photos and a scripted OCR engine, so they are fully offline and need
//! neither tesseract nor a LaTeX installation.

use board2tex::{
    convert, convert_to_file, ConversionConfig, OcrEngine, OcrToken, StageError,
};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// A scripted OCR engine: image N of the batch gets script N.
///
/// The pipeline hands the engine the enhanced scratch image, named
/// `enhanced_NN.png`, so the batch index is recoverable from the path.
struct ScriptedEngine {
    scripts: Vec<Vec<OcrToken>>,
}

impl ScriptedEngine {
    fn new(scripts: Vec<Vec<OcrToken>>) -> Arc<Self> {
        Arc::new(Self { scripts })
    }
}

impl OcrEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, image_path: &Path) -> std::io::Result<Vec<OcrToken>> {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let index: usize = stem
            .rsplit('_')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        Ok(self.scripts.get(index).cloned().unwrap_or_default())
    }
}

/// Tokens for one visual line: `line_num` within `block_num`, words spaced
/// left to right at vertical position `top`.
fn line_tokens(words: &[&str], line_num: u32, block_num: u32, top: i64) -> Vec<OcrToken> {
    words
        .iter()
        .enumerate()
        .map(|(i, w)| OcrToken {
            text: w.to_string(),
            confidence: 91.0,
            left: 10 + i as i64 * 60,
            top,
            width: 50,
            height: 18,
            line_num,
            block_num,
        })
        .collect()
}

/// A synthetic chalkboard photo: dark strokes on a light background.
fn write_board_image(dir: &Path, name: &str) -> PathBuf {
    let img = RgbImage::from_fn(48, 36, |x, y| {
        if (10..38).contains(&x) && (8..28).contains(&y) && (x + y) % 5 != 0 {
            image::Rgb([25, 35, 30])
        } else {
            image::Rgb([225, 228, 222])
        }
    });
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn config_with(engine: Arc<dyn OcrEngine>) -> ConversionConfig {
    ConversionConfig::builder()
        .engine(engine)
        .title("E2E Notes")
        .build()
        .unwrap()
}

/// Basic structural checks every assembled document must pass.
fn assert_latex_quality(tex: &str, context: &str) {
    assert!(
        tex.starts_with("\\documentclass[11pt]{article}"),
        "[{context}] wrong preamble start"
    );
    assert!(tex.contains("\\begin{document}"), "[{context}] no body");
    assert!(tex.contains("\\maketitle"), "[{context}] no \\maketitle");
    assert!(
        tex.trim_end().ends_with("\\end{document}"),
        "[{context}] unterminated document"
    );
    assert_eq!(
        tex.matches("\\begin{document}").count(),
        1,
        "[{context}] duplicated body"
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_document_from_one_board() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_board_image(dir.path(), "board.png");

    let mut script = Vec::new();
    script.extend(line_tokens(&["Theorem:", "x^2", ">", "0"], 1, 1, 10));
    script.extend(line_tokens(&["x^2", "=", "x*x"], 2, 1, 40));
    script.extend(line_tokens(&["-", "always", "positive"], 3, 1, 70));
    let engine = ScriptedEngine::new(vec![script]);

    let out = convert(
        &[img.to_string_lossy().into_owned()],
        &config_with(engine),
    )
    .await
    .unwrap();

    assert_latex_quality(&out.latex, "full document");
    assert!(out.warnings.is_empty());
    assert_eq!(out.stats.total_lines, 3);
    assert_eq!(out.stats.bullet_count, 1);
    assert_eq!(out.stats.block_count, 2);

    assert!(out.latex.contains("\\title{E2E Notes}"));
    assert_eq!(out.latex.matches("\\section{Board Capture}").count(), 1);
    assert!(out.latex.contains("\\begin{theorem}\nx^{2} > 0\n\\end{theorem}"));
    assert!(out.latex.contains("\\[\nx^{2} = x*x\n\\]"));
    assert!(out.latex.contains("\\item always positive"));
}

#[tokio::test]
async fn low_confidence_tokens_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_board_image(dir.path(), "board.png");

    let mut script = line_tokens(&["smudged", "chalk"], 1, 1, 10);
    for t in &mut script {
        t.confidence = 12.0;
    }
    let engine = ScriptedEngine::new(vec![script]);

    let out = convert(
        &[img.to_string_lossy().into_owned()],
        &config_with(engine),
    )
    .await
    .unwrap();

    assert_latex_quality(&out.latex, "low confidence");
    assert_eq!(out.stats.total_lines, 0);
    assert!(!out.latex.contains("smudged"));
    assert!(!out.latex.contains("itemize"));
}

#[tokio::test]
async fn multi_image_batch_keeps_order_and_names() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_board_image(dir.path(), "first.png");
    let second = write_board_image(dir.path(), "second.png");

    let engine = ScriptedEngine::new(vec![
        line_tokens(&["morning", "lecture"], 1, 1, 10),
        line_tokens(&["afternoon", "lecture"], 1, 1, 10),
    ]);

    let out = convert(
        &[
            first.to_string_lossy().into_owned(),
            second.to_string_lossy().into_owned(),
        ],
        &config_with(engine),
    )
    .await
    .unwrap();

    assert_latex_quality(&out.latex, "multi image");
    assert_eq!(out.latex.matches("\\section{Board Capture}").count(), 2);
    assert_eq!(out.stats.total_images, 2);
    assert!(out.base_name.ends_with("_multi2"), "got {}", out.base_name);

    let morning = out.latex.find("morning lecture").unwrap();
    let afternoon = out.latex.find("afternoon lecture").unwrap();
    assert!(morning < afternoon, "batch order not preserved");
}

#[tokio::test]
async fn consecutive_equations_form_one_aligned_block() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_board_image(dir.path(), "board.png");

    let mut script = Vec::new();
    script.extend(line_tokens(&["a", "=", "1"], 1, 1, 10));
    script.extend(line_tokens(&["b", "=", "2"], 2, 1, 40));
    script.extend(line_tokens(&["c", "=", "3"], 3, 1, 70));
    script.extend(line_tokens(&["-", "done"], 4, 1, 100));
    let engine = ScriptedEngine::new(vec![script]);

    let out = convert(
        &[img.to_string_lossy().into_owned()],
        &config_with(engine),
    )
    .await
    .unwrap();

    assert_eq!(out.stats.block_count, 1);
    assert_eq!(out.latex.matches("\\begin{aligned}").count(), 1);
    assert_eq!(out.latex.matches(" \\\\\n").count(), 2, "3 rows, 2 breaks");
    assert!(out.latex.contains("\\item done"));
}

#[tokio::test]
async fn reading_order_follows_geometry_not_arrival() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_board_image(dir.path(), "board.png");

    // The lower line arrives first; geometry must win.
    let mut script = Vec::new();
    script.extend(line_tokens(&["bottom", "line"], 2, 1, 90));
    script.extend(line_tokens(&["top", "line"], 1, 1, 10));
    let engine = ScriptedEngine::new(vec![script]);

    let out = convert(
        &[img.to_string_lossy().into_owned()],
        &config_with(engine),
    )
    .await
    .unwrap();

    let top = out.latex.find("top line").unwrap();
    let bottom = out.latex.find("bottom line").unwrap();
    assert!(top < bottom, "lines not in reading order");
}

#[tokio::test]
async fn symbols_are_normalised_in_output() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_board_image(dir.path(), "board.png");

    let engine = ScriptedEngine::new(vec![line_tokens(&["x", "→", "∞"], 1, 1, 10)]);

    let out = convert(
        &[img.to_string_lossy().into_owned()],
        &config_with(engine),
    )
    .await
    .unwrap();

    assert!(
        out.latex.contains("\\[\nx \\to  \\infty\n\\]"),
        "got: {}",
        out.latex
    );
    assert!(!out.latex.contains('→'));
}

#[tokio::test]
async fn failed_image_does_not_sink_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_board_image(dir.path(), "first.png");
    let second = write_board_image(dir.path(), "second.png");

    struct HalfBrokenEngine;
    impl OcrEngine for HalfBrokenEngine {
        fn name(&self) -> &str {
            "half-broken"
        }
        fn recognize(&self, image_path: &Path) -> std::io::Result<Vec<OcrToken>> {
            let name = image_path.file_name().unwrap().to_string_lossy();
            if name.contains("00") {
                Err(std::io::Error::other("lens cap on"))
            } else {
                Ok(line_tokens(&["still", "works"], 1, 1, 10))
            }
        }
    }

    let out = convert(
        &[
            first.to_string_lossy().into_owned(),
            second.to_string_lossy().into_owned(),
        ],
        &config_with(Arc::new(HalfBrokenEngine)),
    )
    .await
    .unwrap();

    assert_eq!(out.stats.failed_images, 1);
    assert_eq!(out.warnings.len(), 1);
    assert!(matches!(out.warnings[0], StageError::Ocr { image: 0, .. }));
    assert!(out.latex.contains("still works"));
    assert_latex_quality(&out.latex, "partial batch");
}

#[tokio::test]
async fn convert_to_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_board_image(dir.path(), "board.png");
    let out_path = dir.path().join("out").join("notes.tex");

    let engine = ScriptedEngine::new(vec![line_tokens(&["persisted", "note"], 1, 1, 10)]);

    let out = convert_to_file(
        &[img.to_string_lossy().into_owned()],
        &config_with(engine),
        &out_path,
    )
    .await
    .unwrap();

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written, out.latex);
    assert!(written.contains("persisted note"));
}
