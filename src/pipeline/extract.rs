//! Line extraction: group OCR tokens into reading-ordered visual lines.
//!
//! The OCR engine returns a flat token list; this stage is the pure
//! aggregation step on top of it. The only algorithmic subtleties are the
//! composite grouping key — `line_num + 1000 * block_num`, which keeps line
//! numbers unique across layout blocks — and the confidence-based filtering
//! policy, both of which downstream parity depends on.

use crate::config::ConversionConfig;
use crate::error::StageError;
use crate::ocr::{OcrEngine, OcrToken};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A reading-order group of recognised tokens sharing one on-image line.
///
/// `text` is the space-joined token texts; the bounding box is the min/max
/// aggregate over the constituent tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualLine {
    pub text: String,
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

/// Run the OCR engine on one preprocessed image and group the result.
///
/// The engine call is blocking (subprocess or FFI), so it runs under
/// `spawn_blocking`, bounded by the configured timeout. Failures are
/// stage-scoped: the caller records them and continues with the remaining
/// images of the batch.
pub async fn extract_lines(
    engine: &Arc<dyn OcrEngine>,
    image_path: &Path,
    image_index: usize,
    config: &ConversionConfig,
) -> Result<Vec<VisualLine>, StageError> {
    let engine_clone = Arc::clone(engine);
    let path = image_path.to_path_buf();

    let task = tokio::task::spawn_blocking(move || engine_clone.recognize(&path));

    match tokio::time::timeout(Duration::from_secs(config.ocr_timeout_secs), task).await {
        Err(_) => Err(StageError::OcrTimeout {
            image: image_index,
            secs: config.ocr_timeout_secs,
        }),
        Ok(Err(join_err)) => Err(StageError::Ocr {
            image: image_index,
            detail: format!("OCR task panicked: {}", join_err),
        }),
        Ok(Ok(Err(e))) => Err(StageError::Ocr {
            image: image_index,
            detail: e.to_string(),
        }),
        Ok(Ok(Ok(tokens))) => {
            let lines = group_tokens(tokens, config.min_confidence);
            debug!(
                "Image {}: {} visual lines after filtering",
                image_index,
                lines.len()
            );
            Ok(lines)
        }
    }
}

struct LineAccumulator {
    chunks: Vec<String>,
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

/// Group tokens into visual lines, dropping low-confidence and empty input.
///
/// Policy, applied in order:
/// 1. tokens with `confidence < min_confidence` are dropped;
/// 2. tokens whose trimmed text is empty are dropped;
/// 3. remaining tokens are grouped by `line_num + 1000 * block_num`;
/// 4. lines whose joined text is empty are dropped;
/// 5. output is sorted into reading order: ascending `top`, ties broken by
///    ascending `left` (stable, so identical boxes keep grouping order).
pub fn group_tokens(tokens: Vec<OcrToken>, min_confidence: f32) -> Vec<VisualLine> {
    let mut groups: BTreeMap<u64, LineAccumulator> = BTreeMap::new();

    for token in tokens {
        if token.confidence < min_confidence {
            continue;
        }
        let text = token.text.trim();
        if text.is_empty() {
            continue;
        }

        // Line numbers restart per block; the multiplier keeps keys unique
        // across blocks without colliding for any realistic line count.
        let key = token.line_num as u64 + 1000 * token.block_num as u64;
        let right = token.left + token.width;
        let bottom = token.top + token.height;

        groups
            .entry(key)
            .and_modify(|acc| {
                acc.chunks.push(text.to_string());
                acc.left = acc.left.min(token.left);
                acc.top = acc.top.min(token.top);
                acc.right = acc.right.max(right);
                acc.bottom = acc.bottom.max(bottom);
            })
            .or_insert_with(|| LineAccumulator {
                chunks: vec![text.to_string()],
                left: token.left,
                top: token.top,
                right,
                bottom,
            });
    }

    let mut lines: Vec<VisualLine> = groups
        .into_values()
        .map(|acc| VisualLine {
            text: acc.chunks.join(" ").trim().to_string(),
            left: acc.left,
            top: acc.top,
            right: acc.right,
            bottom: acc.bottom,
        })
        .filter(|line| !line.text.is_empty())
        .collect();

    lines.sort_by_key(|line| (line.top, line.left));
    lines
}
