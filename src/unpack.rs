//! Safe extraction of bootstrap tarballs.
//!
//! Archive decoding is the `flate2` + `tar` crates' job; this module drives
//! them with the safety settings the pipeline requires: permissions restored
//! as recorded in the archive, ownership left to the invoking user, and no
//! entry allowed to escape the destination directory.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Component, Path};

/// Extract a gzip-compressed tarball into `dest_dir`.
///
/// The destination is created if it does not exist. Entry paths are
/// validated before unpacking; an absolute path or a `..` component fails
/// the whole extraction rather than being skipped.
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    preserve_permissions: bool,
    preserve_ownership: bool,
) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(preserve_permissions);
    archive.set_preserve_ownerships(preserve_ownership);
    archive.set_unpack_xattrs(false);

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?
    {
        let mut entry = entry.context("Failed to read archive entry")?;
        let entry_path = entry.path()?.into_owned();

        validate_entry_path(&entry_path)?;

        if !entry
            .unpack_in(dest_dir)
            .with_context(|| format!("Failed to unpack {}", entry_path.display()))?
        {
            bail!("Refused to unpack {}", entry_path.display());
        }
    }

    Ok(())
}

/// Reject entry paths that would land outside the destination directory.
fn validate_entry_path(path: &Path) -> Result<()> {
    if path.is_absolute() {
        bail!("Archive entry has an absolute path: {}", path.display());
    }

    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            bail!("Archive entry escapes the destination: {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn relative_paths_are_accepted() {
        validate_entry_path(Path::new("root.x86_64/etc/pacman.conf")).unwrap();
        validate_entry_path(Path::new("./root.x86_64")).unwrap();
    }

    #[test]
    fn absolute_paths_are_rejected() {
        let err = validate_entry_path(Path::new("/etc/passwd")).unwrap_err();
        assert!(err.to_string().contains("absolute path"));
    }

    #[test]
    fn parent_components_are_rejected() {
        let err = validate_entry_path(Path::new("root.x86_64/../../evil")).unwrap_err();
        assert!(err.to_string().contains("escapes the destination"));
    }

    #[test]
    fn missing_archive_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = extract_archive(
            &PathBuf::from("/nonexistent/archive.tar.gz"),
            temp.path(),
            true,
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to open archive"));
    }
}
