//! Run coordinator: one call from validated config to summary statistics.
//!
//! ```text
//! validate config (once per entry point)
//!   → input root exists?          no → RunError::InputMissing (nothing created)
//!   → scan (output root pruned when nested in the input tree)
//!   → flat layout: name collisions?  yes → ScanError::NameCollision (nothing created)
//!   → create output root
//!   → Scheduler::run_all(process_one)      timed
//!   → RunReport { stats, files }
//! ```
//!
//! Only setup problems are errors. Once the scheduler starts, every file ends
//! as a [`JobOutcome`] and the run itself succeeds.

use crate::config::{ConfigError, OutputLayout, RunConfig, effective_threads};
use crate::imaging::ImageBackend;
use crate::job::{JobContext, JobOutcome, process_one};
use crate::scan::{ScanError, SourceFile, check_collisions, scan};
use crate::scheduler::{Scheduler, TaskResult};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Input directory not found: {}", .0.display())]
    InputMissing(PathBuf),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Progress notifications, sent from worker threads as the run advances.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// Files are about to be scheduled.
    Started {
        total: usize,
        parallelism: usize,
        threads: usize,
    },
    /// One file reached its final outcome. `position` counts completions, 1-based.
    FileFinished {
        position: usize,
        total: usize,
        relative: PathBuf,
        outcome: JobOutcome,
    },
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub discovered: usize,
    pub written: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Highest number of files in flight at the same time.
    pub peak_active: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl RunStats {
    fn tally<'a>(outcomes: impl IntoIterator<Item = &'a JobOutcome>) -> Self {
        let mut stats = Self::default();
        for outcome in outcomes {
            stats.discovered += 1;
            match outcome {
                JobOutcome::Written { .. } => stats.written += 1,
                JobOutcome::Skipped { .. } => stats.skipped += 1,
                JobOutcome::Rejected { .. } => stats.rejected += 1,
                JobOutcome::Failed { .. } => stats.failed += 1,
                JobOutcome::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Files per second over the scheduled phase. `None` when no measurable
    /// time passed.
    pub fn throughput(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.discovered as f64 / secs)
    }
}

/// Final outcome of one discovered file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub relative: PathBuf,
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

/// Everything a run produced: totals plus per-file outcomes in path order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub stats: RunStats,
    pub files: Vec<FileReport>,
}

/// The scanned work set, before anything is written.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Canonical input root.
    pub input_root: PathBuf,
    pub files: Vec<SourceFile>,
}

fn require_input_dir(config: &RunConfig) -> Result<(), RunError> {
    if config.input.is_dir() {
        Ok(())
    } else {
        Err(RunError::InputMissing(config.input.clone()))
    }
}

/// Validate the config and enumerate the work without touching the output.
///
/// Backs the `check` command and is the first half of [`run`].
pub fn plan(config: &RunConfig) -> Result<RunPlan, RunError> {
    config.validate()?;
    plan_validated(config)
}

fn plan_validated(config: &RunConfig) -> Result<RunPlan, RunError> {
    require_input_dir(config)?;

    let input_root = config.input.canonicalize()?;
    // An output root that does not exist yet cannot contain inputs
    let output_root = config.output.canonicalize().ok();
    if output_root.as_deref() == Some(input_root.as_path()) {
        return Err(ConfigError::Validation(format!(
            "output resolves to the input directory ({})",
            input_root.display()
        ))
        .into());
    }
    let exclude = output_root.filter(|out| out.starts_with(&input_root));

    let files = scan(&input_root, exclude.as_deref())?;
    if config.layout == OutputLayout::Flat {
        check_collisions(&files)?;
    }
    Ok(RunPlan { input_root, files })
}

/// Run the whole pipeline on a scheduler sized from `config`.
pub fn run(
    config: &RunConfig,
    backend: &impl ImageBackend,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunReport, RunError> {
    config.validate()?;
    let scheduler = Scheduler::new(config.parallelism, effective_threads(config))?;
    execute(&scheduler, config, backend, events)
}

/// Run the pipeline on a caller-supplied scheduler.
///
/// Lets the caller keep a [`CancelHandle`](crate::scheduler::CancelHandle)
/// for the run. The scheduler's gate capacity takes the place of
/// `config.parallelism`.
pub fn run_on(
    scheduler: &Scheduler,
    config: &RunConfig,
    backend: &impl ImageBackend,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunReport, RunError> {
    config.validate()?;
    execute(scheduler, config, backend, events)
}

/// The run body; `config` has already been validated.
fn execute(
    scheduler: &Scheduler,
    config: &RunConfig,
    backend: &impl ImageBackend,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunReport, RunError> {
    let RunPlan { input_root, files } = plan_validated(config)?;

    if !config.output.is_dir() {
        info!(output = %config.output.display(), "creating output directory");
    }
    std::fs::create_dir_all(&config.output)?;

    let total = files.len();
    info!(input = %input_root.display(), files = total, "scan complete");

    if files.is_empty() {
        warn!(input = %input_root.display(), "no PNG files found; nothing to do");
        return Ok(RunReport::default());
    }

    let ctx = JobContext::new(config)?;
    let parallelism = scheduler.gate().capacity();
    let threads = scheduler.threads();
    info!(files = total, parallelism, threads, "processing");
    if let Some(tx) = &events {
        let _ = tx.send(ProcessEvent::Started {
            total,
            parallelism,
            threads,
        });
    }

    let finished = AtomicUsize::new(0);
    let start = Instant::now();
    let results = scheduler.run_all(
        &files,
        |_, source| process_one(backend, source, &ctx),
        |index, result| {
            let source = &files[index];
            if let TaskResult::Panicked(msg) = result {
                error!(file = %source.file_name, panic = %msg, "job panicked");
            }
            let position = finished.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(tx) = &events {
                let _ = tx.send(ProcessEvent::FileFinished {
                    position,
                    total,
                    relative: source.relative.clone(),
                    outcome: outcome_of(result),
                });
            }
        },
    );
    let elapsed = start.elapsed();

    let files: Vec<FileReport> = files
        .iter()
        .zip(&results)
        .map(|(source, result)| FileReport {
            relative: source.relative.clone(),
            outcome: outcome_of(result),
        })
        .collect();

    let stats = RunStats {
        peak_active: scheduler.gate().peak(),
        elapsed,
        ..RunStats::tally(files.iter().map(|f| &f.outcome))
    };
    info!(
        written = stats.written,
        skipped = stats.skipped,
        rejected = stats.rejected,
        failed = stats.failed,
        cancelled = stats.cancelled,
        peak_active = stats.peak_active,
        elapsed_ms = elapsed.as_millis() as u64,
        "run complete"
    );

    Ok(RunReport { stats, files })
}

fn outcome_of(result: &TaskResult<JobOutcome>) -> JobOutcome {
    match result {
        TaskResult::Completed(outcome) => outcome.clone(),
        TaskResult::Panicked(msg) => JobOutcome::Failed {
            reason: format!("job panicked: {msg}"),
        },
        TaskResult::Cancelled => JobOutcome::Cancelled,
    }
}
