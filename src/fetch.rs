//! Downloading artifacts to staging.
//!
//! Transport is delegated to `curl`. An optional SHA-256 check runs
//! in-process after the transfer; a mismatch deletes the staged file.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::process::Cmd;

/// Download a URL to a staging path.
///
/// `expected_sha256` is optional; `None` means no integrity check beyond
/// whatever verification the caller performs afterwards.
pub fn download(url: &str, dest: &Path, expected_sha256: Option<&str>) -> Result<()> {
    println!("Downloading {}", url);

    Cmd::new("curl")
        .args(["-L", "--fail", "--progress-bar", "-o"])
        .arg_path(dest)
        .arg(url)
        .error_msg(format!("Failed to download {}", url))
        .run_interactive()?;

    if let Some(expected) = expected_sha256 {
        if !expected.is_empty() {
            verify_checksum(dest, expected)?;
        }
    }

    Ok(())
}

/// Fetch a page body, for the release index.
pub fn fetch_index(url: &str) -> Result<String> {
    let result = Cmd::new("curl")
        .args(["-L", "--fail", "-sS", url])
        .error_msg(format!("Failed to fetch {}", url))
        .run()?;

    Ok(result.stdout)
}

/// Verify the SHA-256 checksum of a downloaded file.
///
/// On mismatch the file is deleted before the error is returned.
pub fn verify_checksum(file_path: &Path, expected_sha256: &str) -> Result<()> {
    let actual = hash_file(file_path)?;

    if actual != expected_sha256 {
        fs::remove_file(file_path)?;
        bail!(
            "Checksum mismatch for {}\n  Expected: {}\n  Got: {}\n\
             The download may be corrupted. Deleted partial file.",
            file_path.display(),
            expected_sha256,
            actual
        );
    }

    Ok(())
}

/// Compute the SHA-256 hash of a file.
fn hash_file(path: &Path) -> Result<String> {
    let content = fs::read(path)
        .with_context(|| format!("Failed to read {} for hashing", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn hash_file_matches_known_digest() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("data");
        fs::write(&path, "abc").unwrap();

        assert_eq!(hash_file(&path).unwrap(), ABC_SHA256);
    }

    #[test]
    fn checksum_match_keeps_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("data");
        fs::write(&path, "abc").unwrap();

        verify_checksum(&path, ABC_SHA256).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn checksum_mismatch_deletes_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("data");
        fs::write(&path, "not the expected content").unwrap();

        let err = verify_checksum(&path, ABC_SHA256).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
        assert!(!path.exists());
    }
}
