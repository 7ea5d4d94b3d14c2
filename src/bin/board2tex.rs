//! CLI binary for board2tex.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use board2tex::{convert, convert_to_file, ConversionConfig, TesseractCli};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = "\
Examples:
  board2tex board.jpg
      Print the LaTeX document for one photo to stdout.

  board2tex morning.jpg afternoon.jpg -o notes.tex
      Combine two photos into notes.tex, one section per photo.

  board2tex board.jpg -o notes.tex --compile-pdf
      Also run latexmk (or pdflatex) to produce notes.pdf.

  board2tex https://example.com/board.png --json
      Download the photo, print the full result as JSON.

Requires the `tesseract` binary on PATH (or --ocr-program).";

#[derive(Parser, Debug)]
#[command(
    name = "board2tex",
    version,
    about = "Convert photos of handwritten blackboard mathematics to LaTeX",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Board photo paths or HTTP/HTTPS URLs, combined in the given order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the LaTeX document to this file instead of stdout.
    #[arg(short, long, env = "BOARD2TEX_OUTPUT")]
    output: Option<PathBuf>,

    /// Compile the written .tex to PDF (requires -o and latexmk/pdflatex).
    #[arg(long, env = "BOARD2TEX_COMPILE_PDF", requires = "output")]
    compile_pdf: bool,

    /// Print the full result (document, stats, warnings) as JSON to stdout.
    #[arg(long, env = "BOARD2TEX_JSON")]
    json: bool,

    /// Document title for the LaTeX preamble.
    #[arg(short, long, env = "BOARD2TEX_TITLE")]
    title: Option<String>,

    /// Resize cap on the longest image side in pixels.
    #[arg(long, env = "BOARD2TEX_MAX_SIDE", default_value_t = 2000)]
    max_side: u32,

    /// Drop OCR tokens below this confidence (0–100).
    #[arg(long, env = "BOARD2TEX_MIN_CONFIDENCE", default_value_t = 40.0)]
    min_confidence: f32,

    /// OCR program to invoke.
    #[arg(long, env = "BOARD2TEX_OCR_PROGRAM", default_value = "tesseract")]
    ocr_program: String,

    /// OCR language model (tesseract -l).
    #[arg(long, env = "BOARD2TEX_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Per-image OCR timeout in seconds.
    #[arg(long, env = "BOARD2TEX_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// LaTeX compiler timeout in seconds.
    #[arg(long, env = "BOARD2TEX_COMPILE_TIMEOUT", default_value_t = 120)]
    compile_timeout: u64,

    /// Download timeout for URL inputs in seconds.
    #[arg(long, env = "BOARD2TEX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Verbose logging (debug level).
    #[arg(short, long, env = "BOARD2TEX_VERBOSE")]
    verbose: bool,

    /// Suppress all logs and the summary line.
    #[arg(short, long, env = "BOARD2TEX_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    let output = if let Some(ref output_path) = cli.output {
        let output = convert_to_file(&cli.inputs, &config, output_path)
            .await
            .context("Conversion failed")?;

        if !cli.quiet {
            let ok = output.stats.total_images - output.stats.failed_images;
            eprintln!(
                "{}  {}/{} images  {} lines  {}ms  →  {}",
                if output.warnings.is_empty() {
                    green("✔")
                } else {
                    yellow("⚠")
                },
                ok,
                output.stats.total_images,
                output.stats.total_lines,
                output.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
        output
    } else {
        let output = convert(&cli.inputs, &config)
            .await
            .context("Conversion failed")?;

        if !cli.json {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.latex.as_bytes())
                .context("Failed to write to stdout")?;
            if !output.latex.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
        output
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        for warning in &output.warnings {
            eprintln!("{}  {}", yellow("⚠"), warning);
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let engine = TesseractCli::with_program(&cli.ocr_program).language(&cli.ocr_lang);

    let mut builder = ConversionConfig::builder()
        .max_side(cli.max_side)
        .min_confidence(cli.min_confidence)
        .engine(Arc::new(engine))
        .compile_pdf(cli.compile_pdf)
        .ocr_timeout_secs(cli.ocr_timeout)
        .compile_timeout_secs(cli.compile_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }

    builder.build().context("Invalid configuration")
}
