//! LaTeX document assembly.
//!
//! Turns per-image [`Classification`]s into one self-contained `.tex`
//! source. The preamble is fixed apart from the title; the body interleaves
//! the bullet list and the structural blocks per captured image.

use crate::pipeline::classify::{Classification, ClassifiedBlock};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const PREAMBLE_TOP: &str = r"\documentclass[11pt]{article}
\usepackage{amsmath}
\usepackage{amsthm}
\usepackage{amssymb}
\usepackage{mathtools}
\usepackage[margin=1in]{geometry}
\usepackage{enumitem}

\newtheorem{definition}{Definition}[section]
\newtheorem{theorem}{Theorem}[section]
\newtheorem{lemma}{Lemma}[section]
\newtheorem{proposition}{Proposition}[section]
\newtheorem{corollary}{Corollary}[section]
\newtheorem{remark}{Remark}[section]
\newtheorem{example}{Example}[section]
";

const STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");

/// Render the complete LaTeX document for a batch of classified captures.
///
/// Each capture becomes one `Board Capture` section in batch order. An empty
/// batch (or a batch where every capture classified to nothing) still yields
/// a compilable document with title and table of contents.
pub fn assemble_document(title: &str, captures: &[Classification]) -> String {
    let mut tex = String::with_capacity(2048);
    tex.push_str(PREAMBLE_TOP);
    tex.push_str(&format!("\n\\title{{{}}}\n", title));
    tex.push_str("\\date{\\today}\n\n");
    tex.push_str("\\begin{document}\n\\maketitle\n\\tableofcontents\n");

    for capture in captures {
        tex.push_str("\n\\section{Board Capture}\n");
        render_capture(&mut tex, capture);
    }

    tex.push_str("\n\\end{document}\n");
    tex
}

fn render_capture(tex: &mut String, capture: &Classification) {
    if !capture.bullets.is_empty() {
        tex.push_str("\n\\begin{itemize}[leftmargin=*]\n");
        for item in &capture.bullets {
            tex.push_str(&format!("  \\item {}\n", item));
        }
        tex.push_str("\\end{itemize}\n");
    }

    for block in &capture.blocks {
        match block {
            ClassifiedBlock::Heading { kind, text } => {
                let env = kind.env_name();
                if text.is_empty() {
                    tex.push_str(&format!("\n\\begin{{{env}}}\n\\end{{{env}}}\n"));
                } else {
                    tex.push_str(&format!("\n\\begin{{{env}}}\n{text}\n\\end{{{env}}}\n"));
                }
            }
            ClassifiedBlock::Equation { latex, .. } => {
                tex.push_str(&format!("\n\\[\n{latex}\n\\]\n"));
            }
        }
    }
}

/// Suggested output stem: `notes_<UTC timestamp>`, with a `_multi<N>`
/// suffix when the batch held more than one image.
pub fn suggested_base_name(image_count: usize) -> String {
    let stamp = OffsetDateTime::now_utc()
        .format(STAMP_FORMAT)
        .unwrap_or_else(|_| "unknown".to_string());
    if image_count > 1 {
        format!("notes_{}_multi{}", stamp, image_count)
    } else {
        format!("notes_{}", stamp)
    }
}
