//! Staging locations for downloaded artifacts and scratch directories.
//!
//! Downloads land in the system temp dir, named after the final path segment
//! of the URL they came from. The names are deterministic, so two concurrent
//! runs fetching the same release race on the same staging file; callers that
//! need parallelism must serialize runs themselves.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Staging path for a downloaded file, named after the file itself.
pub fn staging_path(filename: &str) -> PathBuf {
    std::env::temp_dir().join(filename)
}

/// Prepare a scratch directory, removing it if it exists and creating it fresh.
///
/// Used for the throwaway GPG home during signature verification.
pub fn prepare_work_dir(parent_dir: &Path, name: &str) -> Result<PathBuf> {
    let work_dir = parent_dir.join(name);

    // Clean up if it exists from a previous run
    if work_dir.exists() {
        fs::remove_dir_all(&work_dir)?;
    }

    fs::create_dir_all(&work_dir)?;

    Ok(work_dir)
}

/// Clean up a scratch directory after use. Idempotent; missing is fine.
pub fn cleanup_work_dir(path: &Path) {
    let _ = fs::remove_dir_all(path);
}
