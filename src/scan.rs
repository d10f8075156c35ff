//! Input discovery.
//!
//! Walks the input tree and collects every PNG (extension matched
//! case-insensitively), in a stable path order:
//!
//! ```text
//! stickers/                      # Input root
//! ├── cat.png                    # → SourceFile { relative: "cat.png" }
//! ├── notes.txt                  # ignored
//! └── pack-2/
//!     ├── DOG.PNG                # → SourceFile { relative: "pack-2/DOG.PNG" }
//!     └── broken.png             # listed; rejected later when it fails to decode
//! ```
//!
//! Symlinks are listed when they point at a regular file. Where they point is
//! checked by the file job, which refuses anything resolving outside the
//! input root.
//!
//! Unreadable subdirectories are logged and skipped; only an unreadable root
//! aborts the scan.

use crate::config::OutputLayout;
use crate::imaging::rust_backend::has_supported_extension;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(
        "Output name {name} is shared by {} and {}; use the mirror layout or rename one",
        .first.display(),
        .second.display()
    )]
    NameCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// One discovered input image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Full path as found under the input root.
    pub path: PathBuf,
    /// Path relative to the input root.
    pub relative: PathBuf,
    /// Base file name, reused for the output file.
    pub file_name: String,
}

impl SourceFile {
    /// Where this file's output goes under `output_root`.
    pub fn output_path(&self, output_root: &Path, layout: OutputLayout) -> PathBuf {
        match layout {
            OutputLayout::Flat => output_root.join(&self.file_name),
            OutputLayout::Mirror => output_root.join(&self.relative),
        }
    }
}

/// Regular files, plus symlinks whose target is a regular file.
fn is_candidate(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
    is_file && has_supported_extension(entry.path())
}

/// Recursively collect all supported images under `input_root`.
///
/// `exclude` prunes one directory from the walk; the coordinator passes the
/// output root when it lives inside the input tree so a run never picks up
/// its own results.
pub fn scan(input_root: &Path, exclude: Option<&Path>) -> Result<Vec<SourceFile>, ScanError> {
    let walker = WalkDir::new(input_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| exclude.is_none_or(|ex| e.path() != ex));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !is_candidate(&entry) {
            continue;
        }

        let path = entry.path().to_path_buf();
        let relative = path
            .strip_prefix(input_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
        files.push(SourceFile {
            file_name: entry.file_name().to_string_lossy().into_owned(),
            relative,
            path,
        });
    }

    Ok(files)
}

/// Fail if two files would be written to the same flat output name.
///
/// Names are compared case-folded: on case-insensitive filesystems
/// `Cat.png` and `cat.png` are the same output file.
pub fn check_collisions(files: &[SourceFile]) -> Result<(), ScanError> {
    let mut seen: HashMap<String, &SourceFile> = HashMap::new();
    for file in files {
        if let Some(first) = seen.insert(file.file_name.to_lowercase(), file) {
            return Err(ScanError::NameCollision {
                name: file.file_name.clone(),
                first: first.relative.clone(),
                second: file.relative.clone(),
            });
        }
    }
    Ok(())
}
