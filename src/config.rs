//! Configuration types for blackboard-photo-to-LaTeX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads, serialise them for logging, and
//! lets tests override a single threshold without touching global state.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::Board2TexError;
use crate::ocr::OcrEngine;
use std::fmt;
use std::sync::Arc;

/// Configuration for a photo-to-LaTeX conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use board2tex::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .max_side(1600)
///     .min_confidence(50.0)
///     .compile_pdf(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Maximum length of the longest image side in pixels. Default: 2000.
    ///
    /// Phone cameras routinely produce 4000 px photos; denoising such an
    /// image takes minutes and adds nothing for OCR. Downscaling uses
    /// area-style averaging so strokes stay smooth rather than aliased.
    /// Images already within the cap are left untouched.
    pub max_side: u32,

    /// Non-local-means filter strength. Default: 10.0.
    ///
    /// Strong enough to suppress chalk dust and sensor grain, gentle enough
    /// to preserve stroke edges. Raise for very grainy photos at the cost of
    /// slightly softer strokes.
    pub denoise_strength: f32,

    /// Non-local-means patch (template) window size, odd. Default: 7.
    pub denoise_template: u32,

    /// Non-local-means search window size, odd. Default: 21.
    pub denoise_search: u32,

    /// Canny low hysteresis threshold for the auxiliary edge map. Default: 50.0.
    pub canny_low: f32,

    /// Canny high hysteresis threshold. Default: 150.0.
    pub canny_high: f32,

    /// Minimum OCR token confidence, 0–100. Default: 40.0.
    ///
    /// Tokens below this are dropped before line grouping. Tesseract emits
    /// confidence −1 for structural rows, so those fall out for free.
    pub min_confidence: f32,

    /// The OCR engine to use. `None` means the default `tesseract` CLI.
    ///
    /// Which recogniser (and which language model it carries) is a strategy
    /// decision of the caller, not pipeline logic; tests inject a fake here.
    pub engine: Option<Arc<dyn OcrEngine>>,

    /// Document title placed in the LaTeX preamble. Default: "Lecture — Board Notes".
    pub title: String,

    /// Attempt PDF compilation after assembly. Default: false.
    ///
    /// Compilation is an optional external collaborator; a missing or failing
    /// compiler is reported as a warning, never as a conversion failure.
    pub compile_pdf: bool,

    /// Per-image OCR call timeout in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// LaTeX compiler timeout in seconds. Default: 120.
    pub compile_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_side: 2000,
            denoise_strength: 10.0,
            denoise_template: 7,
            denoise_search: 21,
            canny_low: 50.0,
            canny_high: 150.0,
            min_confidence: 40.0,
            engine: None,
            title: "Lecture — Board Notes".to_string(),
            compile_pdf: false,
            ocr_timeout_secs: 120,
            compile_timeout_secs: 120,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("max_side", &self.max_side)
            .field("denoise_strength", &self.denoise_strength)
            .field("denoise_template", &self.denoise_template)
            .field("denoise_search", &self.denoise_search)
            .field("canny_low", &self.canny_low)
            .field("canny_high", &self.canny_high)
            .field("min_confidence", &self.min_confidence)
            .field("engine", &self.engine.as_ref().map(|e| e.name()))
            .field("title", &self.title)
            .field("compile_pdf", &self.compile_pdf)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("compile_timeout_secs", &self.compile_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn max_side(mut self, px: u32) -> Self {
        self.config.max_side = px.max(100);
        self
    }

    pub fn denoise_strength(mut self, h: f32) -> Self {
        self.config.denoise_strength = h.max(0.0);
        self
    }

    /// Set the non-local-means patch window; even values are rounded up to odd.
    pub fn denoise_template(mut self, px: u32) -> Self {
        self.config.denoise_template = force_odd(px.max(1));
        self
    }

    /// Set the non-local-means search window; even values are rounded up to odd.
    pub fn denoise_search(mut self, px: u32) -> Self {
        self.config.denoise_search = force_odd(px.max(1));
        self
    }

    pub fn canny_thresholds(mut self, low: f32, high: f32) -> Self {
        self.config.canny_low = low.max(0.0);
        self.config.canny_high = high.max(self.config.canny_low);
        self
    }

    pub fn min_confidence(mut self, c: f32) -> Self {
        self.config.min_confidence = c.clamp(0.0, 100.0);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn compile_pdf(mut self, v: bool) -> Self {
        self.config.compile_pdf = v;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs.max(1);
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compile_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Board2TexError> {
        let c = &self.config;
        if c.denoise_search <= c.denoise_template {
            return Err(Board2TexError::InvalidConfig(format!(
                "Denoise search window ({}) must exceed the template window ({})",
                c.denoise_search, c.denoise_template
            )));
        }
        if c.canny_high < c.canny_low {
            return Err(Board2TexError::InvalidConfig(format!(
                "Canny high threshold ({}) must be ≥ low threshold ({})",
                c.canny_high, c.canny_low
            )));
        }
        if c.title.trim().is_empty() {
            return Err(Board2TexError::InvalidConfig(
                "Document title must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

fn force_odd(px: u32) -> u32 {
    if px % 2 == 0 {
        px + 1
    } else {
        px
    }
}
