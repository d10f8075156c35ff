//! The per-file job: contain, decode, scale, encode.
//!
//! [`process_one`] never returns an error and never panics on bad input.
//! Every failure is logged and folded into a [`JobOutcome`], so one broken
//! file cannot take the batch down with it.
//!
//! | Step | Failure | Outcome | Log level |
//! |---|---|---|---|
//! | Resolve path inside input root | escapes root | `Rejected` | error |
//! | Decode | not an image | `Skipped` | warn |
//! | Decode | read error | `Failed` | error |
//! | Scale | resizer error | `Failed` | error |
//! | Encode + write | any error | `Failed` | error |
//!
//! Output is encoded to a hidden `.<name>.partial` sibling and renamed into
//! place, so a failed or interrupted write never leaves a half-written image
//! under the real name.

use crate::config::{OutputLayout, RunConfig};
use crate::imaging::{BackendError, ImageBackend, ScaleError, resize_and_pad};
use crate::scan::SourceFile;
use image::RgbaImage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Output image written.
    Written { output: PathBuf },
    /// Not a decodable image; skipped.
    Skipped { reason: String },
    /// Path resolved outside the input root; refused.
    Rejected { reason: String },
    /// I/O, encode, or unexpected failure.
    Failed { reason: String },
    /// Never admitted because the run was cancelled.
    Cancelled,
}

impl JobOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    /// Short status word for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::Skipped { .. } => "skipped",
            Self::Rejected { .. } => "rejected",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Skipped { reason } | Self::Rejected { reason } | Self::Failed { reason } => {
                Some(reason)
            }
            Self::Written { .. } | Self::Cancelled => None,
        }
    }
}

#[derive(Error, Debug)]
enum JobError {
    #[error("path resolves outside the input root: {}", .0.display())]
    OutsideRoot(PathBuf),
    #[error("cannot resolve path: {0}")]
    Resolve(#[source] std::io::Error),
    #[error("{0}")]
    Decode(#[source] BackendError),
    #[error("scaling failed: {0}")]
    Scale(#[from] ScaleError),
    #[error("write failed: {0}")]
    Write(#[source] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a job needs besides the file itself, resolved once per run.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Canonical input root; containment is checked against this.
    input_root: PathBuf,
    output_root: PathBuf,
    width: u32,
    height: u32,
    layout: OutputLayout,
}

impl JobContext {
    /// Resolve the input root to its canonical form. Fails if it does not exist.
    pub fn new(config: &RunConfig) -> std::io::Result<Self> {
        Ok(Self {
            input_root: config.input.canonicalize()?,
            output_root: config.output.clone(),
            width: config.width,
            height: config.height,
            layout: config.layout,
        })
    }
}

/// Process one source file. Never fails outward; see the [module docs](self).
pub fn process_one(
    backend: &impl ImageBackend,
    source: &SourceFile,
    ctx: &JobContext,
) -> JobOutcome {
    let name = source.file_name.as_str();
    match run_job(backend, source, ctx) {
        Ok(output) => {
            info!(file = name, output = %output.display(), "processed");
            JobOutcome::Written { output }
        }
        Err(e @ JobError::OutsideRoot(_)) => {
            error!(file = name, path = %source.path.display(), error = %e, "security: refusing file");
            JobOutcome::Rejected {
                reason: e.to_string(),
            }
        }
        Err(JobError::Decode(BackendError::Undecodable(msg))) => {
            warn!(file = name, reason = %msg, "skipping: not a valid image");
            JobOutcome::Skipped { reason: msg }
        }
        Err(e) => {
            error!(file = name, error = %e, "processing failed");
            JobOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

fn run_job(
    backend: &impl ImageBackend,
    source: &SourceFile,
    ctx: &JobContext,
) -> Result<PathBuf, JobError> {
    let resolved = ensure_contained(&source.path, &ctx.input_root)?;

    let decoded = backend.decode(&resolved).map_err(JobError::Decode)?;
    let padded = resize_and_pad(&decoded, ctx.width, ctx.height)?;
    drop(decoded);

    let output = source.output_path(&ctx.output_root, ctx.layout);
    write_atomically(backend, &padded, &output)?;
    Ok(output)
}

/// Canonicalize `path` and require it to live under `root` (already canonical).
///
/// Catches `..` segments and symlinks that lead out of the input tree.
fn ensure_contained(path: &Path, root: &Path) -> Result<PathBuf, JobError> {
    let resolved = path.canonicalize().map_err(JobError::Resolve)?;
    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(JobError::OutsideRoot(resolved))
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{name}.partial"))
}

fn write_atomically(
    backend: &impl ImageBackend,
    image: &RgbaImage,
    output: &Path,
) -> Result<(), JobError> {
    if let Some(dir) = output.parent() {
        fs::create_dir_all(dir)?;
    }

    let partial = partial_path(output);
    let written = backend
        .encode(image, &partial)
        .map_err(JobError::Write)
        .and_then(|()| fs::rename(&partial, output).map_err(JobError::from));

    if written.is_err() {
        // Best effort; the partial may never have been created
        let _ = fs::remove_file(&partial);
    }
    written
}
