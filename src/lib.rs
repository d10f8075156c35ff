//! # sticker-scale
//!
//! Batch-normalizes a directory tree of PNG stickers onto a fixed-size
//! transparent canvas. Every image is scaled to fit, keeping its aspect ratio,
//! and centered; whatever the image does not cover stays fully transparent.
//!
//! # Architecture: One Pass, Bounded Concurrency
//!
//! ```text
//! RunConfig ──▶ run ──▶ scan ──▶ Scheduler ──▶ process_one × N ──▶ output/
//!                                   │              │
//!                             AdmissionGate    decode → resize_and_pad → encode
//!                              (P permits)
//! ```
//!
//! Every discovered file gets its own task up front, but only `parallelism`
//! of them may be decoding, scaling, or encoding at once. Each active task
//! owns two full pixel buffers, so the admission limit is what bounds peak
//! memory, independently of how many files the tree holds or how many worker
//! threads the pool runs.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Layered `RunConfig` loading (defaults → TOML file → flags) and validation |
//! | [`scan`] | Recursive, sorted discovery of `*.png` inputs; output name collisions |
//! | [`imaging`] | Fit-and-center geometry, resampling, and the PNG codec backend |
//! | [`job`] | One file end to end: path containment, decode, scale, atomic write |
//! | [`scheduler`] | Admission gate, per-task panic isolation, cancellation |
//! | [`run`] | Coordinator: setup checks, scheduling, timing, `RunStats` |
//! | [`output`] | CLI output formatting for progress lines and summaries |
//!
//! # Design Decisions
//!
//! ## Per-File Failures Are Values
//!
//! A corrupt PNG, a symlink pointing out of the input tree, or a full disk
//! affects exactly one file. [`job::process_one`] folds every such problem into
//! a [`job::JobOutcome`]; only setup problems (bad config, missing input,
//! colliding output names) surface as a [`run::RunError`].
//!
//! ## Bicubic Resampling
//!
//! Scaling uses the Catmull-Rom filter. The `image` crate widens the kernel
//! when downscaling, which gives proper antialiasing on large reductions
//! without the ringing of Lanczos on hard sticker outlines.
//!
//! ## No Partial Files
//!
//! Output is encoded to a hidden sibling and renamed into place. A reader of
//! the output directory sees either a complete image or nothing.

pub mod config;
pub mod imaging;
pub mod job;
pub mod output;
pub mod run;
pub mod scan;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_helpers;
