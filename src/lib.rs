//! # board2tex
//!
//! Convert photographs of handwritten blackboard mathematics into complete,
//! compilable LaTeX documents.
//!
//! ## Why this crate?
//!
//! Raw OCR output from a chalkboard photo is noisy and flat: chalk dust and
//! sensor grain confuse the recogniser, and even a clean transcription is just
//! a bag of lines with no structure. This crate first normalises the photo
//! (denoise, binarise, morphological cleanup) so the recogniser sees clean
//! strokes, then reconstructs document structure — theorem-style headings,
//! bulleted prose, multi-line equation blocks — from the recognised lines
//! using deterministic heuristics, and renders the result into a well-formed
//! LaTeX article.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo(s)
//!  │
//!  ├─ 1. Input       resolve local file or download from URL
//!  ├─ 2. Preprocess  denoise + binarise + morphology + edges (spawn_blocking)
//!  ├─ 3. OCR         injected engine returns tokens with boxes + confidence
//!  ├─ 4. Extract     group tokens into reading-ordered visual lines
//!  ├─ 5. Classify    headings / bullets / merged equation blocks
//!  ├─ 6. Assemble    fixed LaTeX template → document text
//!  └─ 7. Compile     optional latexmk/pdflatex run (failure is non-fatal)
//! ```
//!
//! Multiple images in one call are processed strictly in order and merged
//! into a single document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use board2tex::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OCR defaults to the `tesseract` binary on PATH.
//!     let config = ConversionConfig::default();
//!     let output = convert(&["board.jpg".to_string()], &config).await?;
//!     println!("{}", output.latex);
//!     eprintln!("suggested name: {}", output.base_name);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `board2tex` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! board2tex = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod ocr;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, convert_to_file};
pub use error::{Board2TexError, StageError};
pub use ocr::{OcrEngine, OcrToken, TesseractCli};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::classify::{classify, Classification, ClassifiedBlock, HeadingKind};
pub use pipeline::extract::VisualLine;
pub use pipeline::symbols::normalize_symbols;
