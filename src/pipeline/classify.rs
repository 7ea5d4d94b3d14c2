//! Line classification: visual lines → document structure.
//!
//! A single left-to-right pass over the extracted lines with one piece of
//! state: the pending-equation buffer. Each line is tested against the
//! categories in fixed priority order — heading, bullet, equation hint,
//! prose fallback — and the first match wins, so a line like
//! `Theorem: x^2 = 4` is a heading even though it also looks like math.
//!
//! Consecutive equation-hinted lines accumulate and are emitted as one
//! `aligned` block when interrupted; the buffer-or-not distinction is the
//! small state machine [`ClassifierState`], modelled explicitly so the
//! flush triggers are auditable and testable without any regex involved.
//!
//! Plain prose deliberately lands in the bullet list alongside real
//! bullets — handwritten board notes rarely carry paragraph structure worth
//! preserving, and rendering stray prose as items keeps the output compact.

use crate::pipeline::extract::VisualLine;
use crate::pipeline::symbols::normalize_symbols;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Theorem-style heading kinds recognised at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingKind {
    Definition,
    Theorem,
    Lemma,
    Proposition,
    Corollary,
    Remark,
    Example,
}

impl HeadingKind {
    /// The LaTeX environment name for this kind.
    pub fn env_name(&self) -> &'static str {
        match self {
            HeadingKind::Definition => "definition",
            HeadingKind::Theorem => "theorem",
            HeadingKind::Lemma => "lemma",
            HeadingKind::Proposition => "proposition",
            HeadingKind::Corollary => "corollary",
            HeadingKind::Remark => "remark",
            HeadingKind::Example => "example",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "definition" => Some(HeadingKind::Definition),
            "theorem" => Some(HeadingKind::Theorem),
            "lemma" => Some(HeadingKind::Lemma),
            "proposition" => Some(HeadingKind::Proposition),
            "corollary" => Some(HeadingKind::Corollary),
            "remark" => Some(HeadingKind::Remark),
            "example" => Some(HeadingKind::Example),
            _ => None,
        }
    }
}

/// One structural block of the reconstructed document, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClassifiedBlock {
    /// A theorem-style heading with its symbol-normalised remainder.
    Heading { kind: HeadingKind, text: String },
    /// A display equation; `multi_line` blocks wrap an `aligned` group and
    /// always aggregate at least two source lines.
    Equation { latex: String, multi_line: bool },
}

/// The classifier's output: the bullet list (bullets and prose fallbacks,
/// in input order) and the ordered structural blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub bullets: Vec<String>,
    pub blocks: Vec<ClassifiedBlock>,
}

// ── Patterns ─────────────────────────────────────────────────────────────

static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(Definition|Theorem|Lemma|Proposition|Corollary|Remark|Example)\b[:\-\s]*(.*)$",
    )
    .unwrap()
});

static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(->|[-•*])\s+(.*)$").unwrap());

/// Anything that makes a line smell like mathematics: relational and
/// calculus glyphs, caret exponents, LaTeX-shaped control words, or a named
/// function keyword as a whole word.
static MATH_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(=|≥|≤|→|∑|∫|∇|∂|[A-Za-z]\^\d|\\(?:frac|sum|int|prod|nabla|partial)|\b(?:lim|sin|cos|tan|log|ln)\b)",
    )
    .unwrap()
});

// ── State machine ────────────────────────────────────────────────────────

/// The classifier's accumulator: either between equations, or holding the
/// raw text of consecutive equation-hinted lines pending emission.
#[derive(Debug, Default)]
enum ClassifierState {
    #[default]
    Idle,
    AccumulatingEquation(Vec<String>),
}

impl ClassifierState {
    fn push_equation(&mut self, raw: &str) {
        match self {
            ClassifierState::Idle => {
                *self = ClassifierState::AccumulatingEquation(vec![raw.to_string()]);
            }
            ClassifierState::AccumulatingEquation(buf) => buf.push(raw.to_string()),
        }
    }

    /// Emit the pending buffer (if any) as one equation block and reset.
    ///
    /// One buffered line emits a single-line equation; two or more merge
    /// into an `aligned` group, one row per source line. The buffer never
    /// emits an empty block.
    fn flush(&mut self, blocks: &mut Vec<ClassifiedBlock>) {
        match std::mem::take(self) {
            ClassifierState::Idle => {}
            ClassifierState::AccumulatingEquation(buf) => {
                if buf.len() == 1 {
                    blocks.push(ClassifiedBlock::Equation {
                        latex: normalize_symbols(&buf[0]),
                        multi_line: false,
                    });
                } else {
                    let body = buf
                        .iter()
                        .map(|raw| normalize_symbols(raw))
                        .collect::<Vec<_>>()
                        .join(" \\\\\n");
                    blocks.push(ClassifiedBlock::Equation {
                        latex: format!("\\begin{{aligned}}\n{}\n\\end{{aligned}}", body),
                        multi_line: true,
                    });
                }
            }
        }
    }
}

// ── Classification ───────────────────────────────────────────────────────

/// Classify visual lines into bullets and structural blocks.
///
/// Classification is a pure function of each line's text; bounding geometry
/// influenced only the ordering done upstream. The priority is
/// heading → bullet → equation hint → prose, first match wins, and the
/// pending equation buffer flushes before any non-equation emission and
/// once unconditionally at end of input.
pub fn classify(lines: &[VisualLine]) -> Classification {
    let mut out = Classification::default();
    let mut state = ClassifierState::Idle;

    for line in lines {
        let txt = line.text.as_str();

        if let Some((kind, rest)) = match_heading(txt) {
            state.flush(&mut out.blocks);
            out.blocks.push(ClassifiedBlock::Heading {
                kind,
                text: normalize_symbols(rest),
            });
            continue;
        }

        if let Some(rest) = match_bullet(txt) {
            state.flush(&mut out.blocks);
            out.bullets.push(normalize_symbols(rest));
            continue;
        }

        if MATH_HINT.is_match(txt) {
            state.push_equation(txt);
            continue;
        }

        // Unmatched lines are prose; prose renders as a bullet entry.
        state.flush(&mut out.blocks);
        out.bullets.push(normalize_symbols(txt));
    }

    state.flush(&mut out.blocks);
    out
}

fn match_heading(txt: &str) -> Option<(HeadingKind, &str)> {
    let caps = HEADING_RE.captures(txt)?;
    let kind = HeadingKind::from_keyword(caps.get(1)?.as_str())?;
    Some((kind, caps.get(2).map_or("", |m| m.as_str())))
}

fn match_bullet(txt: &str) -> Option<&str> {
    BULLET_RE
        .captures(txt)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}
