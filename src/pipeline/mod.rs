//! Pipeline stages for photo-to-LaTeX conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different OCR engine or compiler) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ preprocess ──▶ extract ──▶ classify ──▶ assemble ──▶ compile
//! (URL/path) (denoise+     (OCR +      (headings/   (LaTeX       (optional
//!             binarise)     grouping)   equations)   template)    latexmk)
//! ```
//!
//! 1. [`input`]      — canonicalise the user-supplied path or URL to a local file
//! 2. [`preprocess`] — denoise, binarise, and edge-detect; runs in
//!    `spawn_blocking` because pixel loops are CPU-bound
//! 3. [`extract`]    — drive the injected OCR engine and group its tokens into
//!    reading-ordered visual lines
//! 4. [`classify`]   — priority-ordered heuristics turning lines into heading,
//!    bullet, and merged equation blocks (uses [`symbols`])
//! 5. [`assemble`]   — render classified blocks into the fixed article template
//! 6. [`compile`]    — optional external LaTeX compiler; failure is a warning

pub mod assemble;
pub mod classify;
pub mod compile;
pub mod extract;
pub mod input;
pub mod preprocess;
pub mod symbols;
