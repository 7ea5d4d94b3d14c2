//! The OCR collaborator boundary: token shape, engine trait, tesseract CLI.
//!
//! Recognition itself is an external capability. The pipeline only depends on
//! the [`OcrEngine`] trait — a black box that takes an image path and returns
//! a flat list of [`OcrToken`]s with text, confidence, bounding geometry, and
//! the line/block identifiers of the recogniser's own layout analysis.
//! Everything the pipeline does with those tokens (filtering, grouping,
//! ordering) lives in [`crate::pipeline::extract`], so a different engine can
//! be dropped in without touching any downstream stage. Tests inject a fake.
//!
//! The bundled implementation, [`TesseractCli`], shells out to the
//! `tesseract` binary in TSV mode rather than linking libtesseract: the CLI
//! is available everywhere, and a subprocess is trivially bounded by a
//! timeout from the async caller.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// One recognised text fragment as reported by the OCR engine.
///
/// Confidence is on the engine's 0–100 scale; tesseract reports −1.0 for
/// structural (non-word) rows, which the confidence filter discards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrToken {
    pub text: String,
    pub confidence: f32,
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
    /// Line number within the token's block, from the engine's layout analysis.
    pub line_num: u32,
    /// Block number within the page, from the engine's layout analysis.
    pub block_num: u32,
}

/// An external OCR capability.
///
/// `recognize` is synchronous by design: every real engine here is either a
/// subprocess or an FFI call, and the pipeline runs it under
/// `tokio::task::spawn_blocking` with a timeout, the same way rendering-style
/// blocking work is handled elsewhere in the crate.
pub trait OcrEngine: Send + Sync {
    /// Short human-readable engine name for logs and `Debug` output.
    fn name(&self) -> &str;

    /// Recognise all tokens in the image at `image_path`.
    fn recognize(&self, image_path: &Path) -> io::Result<Vec<OcrToken>>;
}

/// OCR via the `tesseract` command-line binary in TSV output mode.
///
/// TSV mode emits one row per token with the columns
/// `level page_num block_num par_num line_num word_num left top width height conf text`,
/// which carries exactly the geometry and line/block identifiers the
/// extractor needs.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: String,
    language: Option<String>,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            program: "tesseract".to_string(),
            language: None,
        }
    }
}

impl TesseractCli {
    /// Use a specific executable (absolute path or PATH lookup name).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: None,
        }
    }

    /// Set the tesseract language pack, e.g. `"eng"` or `"deu"`.
    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        &self.program
    }

    fn recognize(&self, image_path: &Path) -> io::Result<Vec<OcrToken>> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image_path).arg("stdout").arg("tsv");
        if let Some(ref lang) = self.language {
            cmd.arg("-l").arg(lang);
        }

        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::other(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let tokens = parse_tsv(&stdout);
        debug!(
            "tesseract returned {} tokens for {}",
            tokens.len(),
            image_path.display()
        );
        Ok(tokens)
    }
}

/// Parse tesseract TSV output into tokens.
///
/// Rows that do not carry all twelve columns (including the trailing text
/// field) are layout rows, not words, and are skipped. Malformed numeric
/// fields are logged and skipped rather than failing the whole image.
fn parse_tsv(tsv: &str) -> Vec<OcrToken> {
    let mut tokens = Vec::new();

    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let parsed = (|| -> Option<OcrToken> {
            Some(OcrToken {
                text: cols[11].to_string(),
                confidence: cols[10].parse().ok()?,
                left: cols[6].parse().ok()?,
                top: cols[7].parse().ok()?,
                width: cols[8].parse().ok()?,
                height: cols[9].parse().ok()?,
                line_num: cols[4].parse().ok()?,
                block_num: cols[2].parse().ok()?,
            })
        })();

        match parsed {
            Some(token) => tokens.push(token),
            None => warn!("Skipping malformed TSV row: {line:?}"),
        }
    }

    tokens
}
