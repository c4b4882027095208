//! Detached GPG signature verification.
//!
//! Cryptography stays in `gpg` itself. Verification runs against a throwaway
//! GPG home so the host keyring is never consulted or polluted: import the
//! configured fingerprints from the keyserver, then verify the detached
//! signature. The result distinguishes "gpg could not run / keys could not be
//! imported" (an error) from "gpg ran and the signature is bad" (`Ok(false)`).

use anyhow::{bail, Result};
use std::path::Path;

use crate::process::Cmd;
use crate::staging;

/// Verify `sig` as a detached signature over `data`.
///
/// Returns `Ok(true)` when the signature checks out against one of the
/// imported keys, `Ok(false)` when gpg rejects it, and `Err` when gpg is
/// missing or the key import fails.
pub fn detached_signature(
    data: &Path,
    sig: &Path,
    keys: &[String],
    keyserver: &str,
) -> Result<bool> {
    if keys.is_empty() {
        bail!("No GPG keys configured for signature verification");
    }

    let gnupg_home = staging::prepare_work_dir(&std::env::temp_dir(), "archstrap-gnupg")?;

    // gpg refuses a homedir that is group or world accessible
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&gnupg_home, std::fs::Permissions::from_mode(0o700))?;
    }

    let valid = import_and_verify(&gnupg_home, data, sig, keys, keyserver);
    staging::cleanup_work_dir(&gnupg_home);
    valid
}

fn import_and_verify(
    gnupg_home: &Path,
    data: &Path,
    sig: &Path,
    keys: &[String],
    keyserver: &str,
) -> Result<bool> {
    println!("Importing {} trust key(s) from {}", keys.len(), keyserver);

    Cmd::new("gpg")
        .args(["--batch", "--homedir"])
        .arg_path(gnupg_home)
        .args(["--keyserver", keyserver, "--recv-keys"])
        .args(keys)
        .error_msg("Failed to import GPG keys")
        .run()?;

    let result = Cmd::new("gpg")
        .args(["--batch", "--homedir"])
        .arg_path(gnupg_home)
        .arg("--verify")
        .arg_path(sig)
        .arg_path(data)
        .allow_fail()
        .run()?;

    if !result.success() {
        eprintln!("{}", result.stderr_trimmed());
    }

    Ok(result.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_list_is_an_error() {
        let err = detached_signature(
            Path::new("/tmp/data"),
            Path::new("/tmp/data.sig"),
            &[],
            "hkps://keys.example.org",
        )
        .unwrap_err();

        assert!(err.to_string().contains("No GPG keys configured"));
    }
}
