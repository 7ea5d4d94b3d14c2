//! Symbol normalisation: plaintext/unicode math shorthand → LaTeX control
//! sequences.
//!
//! A pure, table-driven string rewrite. Replacement keys are applied longest
//! first so that a multi-character key (`->`) can never be shadowed by a
//! shorter key matching one of its characters, then a single regex pass
//! braces bare caret exponents (`x^2` → `x^{2}`) so multi-token superscripts
//! survive later edits. The whole function is idempotent: none of the
//! replacement values contains a replacement key, and a braced exponent no
//! longer matches the caret pattern.

use once_cell::sync::Lazy;
use regex::Regex;

/// Shorthand-to-LaTeX replacement table.
///
/// Values keep a trailing space so a control sequence never fuses with the
/// following character (`\le x`, not `\lex`).
const REMAP: &[(&str, &str)] = &[
    ("->", r"\to "),
    ("→", r"\to "),
    ("⇒", r"\Rightarrow "),
    ("≥", r"\ge "),
    ("≤", r"\le "),
    ("±", r"\pm "),
    ("×", r"\times "),
    ("·", r"\cdot "),
    ("∞", r"\infty "),
    ("α", r"\alpha "),
    ("β", r"\beta "),
    ("γ", r"\gamma "),
    ("δ", r"\delta "),
    ("ε", r"\varepsilon "),
    ("λ", r"\lambda "),
    ("μ", r"\mu "),
    ("π", r"\pi "),
    ("σ", r"\sigma "),
    ("θ", r"\theta "),
    ("Δ", r"\Delta "),
    ("∑", r"\sum "),
    ("∫", r"\int "),
];

/// The table sorted longest-key-first; order matters when keys overlap as
/// substrings.
static ORDERED_REMAP: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    let mut table: Vec<_> = REMAP.to_vec();
    table.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
    table
});

/// A bare caret exponent: `^` followed by exactly one alphanumeric.
static RE_CARET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^([A-Za-z0-9])").unwrap());

/// Rewrite math shorthand in `text` to canonical LaTeX, trimmed.
///
/// ```
/// use board2tex::normalize_symbols;
///
/// assert_eq!(normalize_symbols("x->∞"), r"x\to \infty");
/// assert_eq!(normalize_symbols("x^2 = x*x"), "x^{2} = x*x");
/// ```
pub fn normalize_symbols(text: &str) -> String {
    let mut s = text.to_string();
    for (key, replacement) in ORDERED_REMAP.iter() {
        s = s.replace(key, replacement);
    }
    let s = RE_CARET.replace_all(&s, "^{${1}}");
    s.trim().to_string()
}
