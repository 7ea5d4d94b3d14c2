//! Optional PDF compilation of the assembled LaTeX source.
//!
//! Prefers `latexmk` (which reruns as needed for the table of contents) and
//! falls back to a double `pdflatex` pass when latexmk is not installed.
//! Compilation failures never fail the conversion; they surface as a
//! [`StageError`] warning next to the already-written `.tex`.

use crate::error::StageError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Compile `tex_path` to a PDF in the same directory.
///
/// Returns the path of the produced PDF. A missing compiler, a non-zero
/// exit, or a timeout each maps to its own [`StageError`] variant.
pub async fn compile_pdf(tex_path: &Path, timeout_secs: u64) -> Result<PathBuf, StageError> {
    compile_with_programs(tex_path, timeout_secs, "latexmk", "pdflatex").await
}

/// [`compile_pdf`] with the compiler executables made explicit, so tests can
/// point at nonexistent binaries without touching the process environment.
async fn compile_with_programs(
    tex_path: &Path,
    timeout_secs: u64,
    latexmk: &str,
    pdflatex: &str,
) -> Result<PathBuf, StageError> {
    let dir = tex_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = tex_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match run_compiler(latexmk, &["-pdf", "-interaction=nonstopmode"], dir, &file_name, timeout_secs)
        .await
    {
        Ok(()) => {}
        Err(CompilerFailure::NotFound(latexmk_err)) => {
            debug!("{} not found, falling back to {}", latexmk, pdflatex);
            // Two passes so \tableofcontents resolves.
            for pass in 1..=2 {
                debug!(pass, "running pdflatex");
                match run_compiler(
                    pdflatex,
                    &["-interaction=nonstopmode"],
                    dir,
                    &file_name,
                    timeout_secs,
                )
                .await
                {
                    Ok(()) => {}
                    Err(CompilerFailure::NotFound(pdflatex_err)) => {
                        return Err(StageError::CompilerMissing {
                            detail: format!(
                                "{latexmk}: {latexmk_err}; {pdflatex}: {pdflatex_err}"
                            ),
                        });
                    }
                    Err(other) => return Err(other.into()),
                }
            }
        }
        Err(other) => return Err(other.into()),
    }

    let pdf_path = tex_path.with_extension("pdf");
    if !pdf_path.exists() {
        return Err(StageError::CompileFailed {
            detail: format!("compiler exited cleanly but {} was not produced", pdf_path.display()),
        });
    }
    info!(pdf = %pdf_path.display(), "LaTeX compilation succeeded");
    Ok(pdf_path)
}

enum CompilerFailure {
    NotFound(String),
    Failed(String),
    TimedOut(u64),
    Io(String),
}

impl From<CompilerFailure> for StageError {
    fn from(f: CompilerFailure) -> Self {
        match f {
            CompilerFailure::NotFound(detail) => StageError::CompilerMissing { detail },
            CompilerFailure::Failed(detail) => StageError::CompileFailed { detail },
            CompilerFailure::TimedOut(secs) => StageError::CompileTimeout { secs },
            CompilerFailure::Io(detail) => StageError::CompileFailed { detail },
        }
    }
}

async fn run_compiler(
    program: &str,
    args: &[&str],
    dir: &Path,
    file_name: &str,
    timeout_secs: u64,
) -> Result<(), CompilerFailure> {
    debug!(program, file = file_name, "invoking LaTeX compiler");
    let child = Command::new(program)
        .args(args)
        .arg(file_name)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output();

    let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), child).await {
        Ok(Ok(out)) => out,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CompilerFailure::NotFound(e.to_string()));
        }
        Ok(Err(e)) => return Err(CompilerFailure::Io(e.to_string())),
        Err(_) => return Err(CompilerFailure::TimedOut(timeout_secs)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(CompilerFailure::Failed(format!(
            "{program} exited with {}: {}",
            output.status,
            tail.trim()
        )));
    }
    Ok(())
}
