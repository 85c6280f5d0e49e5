#![deny(missing_docs)]

//! # Project Discovery
//!
//! Locates the sources of a tinyspec project below a directory:
//!
//! - `header.yaml`: the static top-level keys (required).
//! - `*models.tinyspec`: model declarations, concatenated in path order.
//! - `*endpoints.tinyspec`: endpoint declarations, concatenated in path order.

use crate::error::{CliError, CliResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// File name of the header document.
pub const HEADER_FILE: &str = "header.yaml";

const MODELS_SUFFIX: &str = "models.tinyspec";
const ENDPOINTS_SUFFIX: &str = "endpoints.tinyspec";
const SKIPPED_DIRS: [&str; 3] = ["node_modules", "target", ".git"];

/// Separator placed between concatenated source files.
const FILE_SEPARATOR: &str = "\n\n";

/// Sources gathered from a project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSources {
    /// Contents of `header.yaml`.
    pub header: String,
    /// Every models file, joined.
    pub models: String,
    /// Every endpoints file, joined.
    pub endpoints: String,
}

/// Walks `root` and reads every source file.
pub fn discover(root: &Path) -> CliResult<ProjectSources> {
    let mut header: Option<PathBuf> = None;
    let mut models = Vec::new();
    let mut endpoints = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry));

    for entry in walker {
        let entry =
            entry.map_err(|e| CliError::General(format!("Cannot walk {:?}: {}", root, e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name == HEADER_FILE {
            if header.is_none() {
                header = Some(entry.path().to_path_buf());
            }
        } else if name.ends_with(MODELS_SUFFIX) {
            models.push(entry.path().to_path_buf());
        } else if name.ends_with(ENDPOINTS_SUFFIX) {
            endpoints.push(entry.path().to_path_buf());
        }
    }

    let header = header.ok_or_else(|| {
        CliError::General(format!("No {} found under {:?}", HEADER_FILE, root))
    })?;
    debug!(
        header = ?header,
        models = models.len(),
        endpoints = endpoints.len(),
        "discovered project sources"
    );

    Ok(ProjectSources {
        header: fs::read_to_string(&header)?,
        models: read_joined(&models)?,
        endpoints: read_joined(&endpoints)?,
    })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && SKIPPED_DIRS
            .iter()
            .any(|skipped| entry.file_name() == *skipped)
}

fn read_joined(paths: &[PathBuf]) -> CliResult<String> {
    let contents = paths
        .iter()
        .map(fs::read_to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(contents.join(FILE_SEPARATOR))
}
