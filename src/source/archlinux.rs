//! Arch Linux bootstrap source.
//!
//! Acquires a rootfs from an Arch Linux mirror in five sequential steps:
//! resolve the release (scraping the download page when none is configured),
//! build the artifact URL, decide the verification policy, download and
//! verify when required, then unpack and flatten the archive's `root.{arch}`
//! nesting so the destination's top level is the rootfs tree.

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use super::Source;
use crate::definition::Definition;
use crate::{fetch, staging, unpack, verify};

/// Index page scraped to determine the latest release.
pub const RELEASE_INDEX_URL: &str = "https://www.archlinux.org/download/";

/// The Arch Linux bootstrap-tarball source.
pub struct ArchLinuxSource;

impl Source for ArchLinuxSource {
    fn name(&self) -> &'static str {
        "archlinux-http"
    }

    fn run(&self, definition: &Definition, rootfs_dir: &Path) -> Result<()> {
        let release = if definition.image.release.is_empty() {
            let release = latest_release()?;
            println!("Resolved latest release: {}", release);
            release
        } else {
            definition.image.release.clone()
        };

        let architecture = definition.architecture_mapped();
        let artifact =
            ArtifactReference::new(&definition.source.url, &release, architecture)?;
        let policy = VerificationPolicy::decide(
            definition.source.skip_verification,
            &definition.source.keys,
            &artifact.url,
        )?;

        fetch::download(artifact.url.as_str(), &artifact.tarball_path, None)?;

        if policy.requires_signature() {
            let signature_url = format!("{}.sig", artifact.url);
            fetch::download(&signature_url, &artifact.signature_path, None)?;

            let valid = verify::detached_signature(
                &artifact.tarball_path,
                &artifact.signature_path,
                &definition.source.keys,
                &definition.source.keyserver,
            )?;

            if !valid {
                // Failed artifacts must not remain in staging.
                artifact.discard_staged();
                bail!("Failed to verify tarball");
            }
        }

        println!("Unpacking {} to {}", artifact.filename, rootfs_dir.display());
        unpack::extract_archive(&artifact.tarball_path, rootfs_dir, true, false)?;

        flatten_bootstrap_root(rootfs_dir, architecture)?;

        println!("Rootfs ready at {}", rootfs_dir.display());
        Ok(())
    }
}

// =============================================================================
// Release resolver
// =============================================================================

/// Determine the latest release from the Arch Linux download page.
pub fn latest_release() -> Result<String> {
    let html = fetch::fetch_index(RELEASE_INDEX_URL)?;
    parse_latest_release(&html)
}

/// Pull the current release out of the download page markup.
///
/// The release is the first item of the first list under the
/// `arch-downloads` anchor, where it appears as plain text next to a
/// `<strong>` label. Only text directly inside the item counts; label
/// elements and their contents are discarded.
pub fn parse_latest_release(html: &str) -> Result<String> {
    let not_found = || anyhow!("Failed to determine latest release");

    let section = match html.find("id=\"arch-downloads\"") {
        Some(pos) => &html[pos..],
        None => return Err(not_found()),
    };

    let first_item = Regex::new(r"(?s)<ul[^>]*>.*?<li[^>]*>(.*?)</li>")
        .unwrap()
        .captures(section)
        .and_then(|captures| captures.get(1))
        .ok_or_else(not_found)?;

    let child_elements = Regex::new(r"(?s)<\w+[^>]*>.*?</\w+>").unwrap();
    let stray_tags = Regex::new(r"<[^>]+>").unwrap();

    let text = child_elements.replace_all(first_item.as_str(), "");
    let text = stray_tags.replace_all(&text, "");
    let release = text.trim().to_string();

    if release.is_empty() {
        return Err(not_found());
    }

    Ok(release)
}

// =============================================================================
// Artifact locator
// =============================================================================

/// Everything needed to fetch one bootstrap tarball.
#[derive(Debug, Clone)]
pub struct ArtifactReference {
    /// Tarball filename, e.g. `archlinux-bootstrap-2024.01.01-x86_64.tar.gz`.
    pub filename: String,
    /// Full download URL.
    pub url: Url,
    /// Staging path the tarball is downloaded to.
    pub tarball_path: PathBuf,
    /// Staging path the detached signature is downloaded to.
    pub signature_path: PathBuf,
}

impl ArtifactReference {
    /// Build the artifact location for a release.
    ///
    /// Pure; fails only on an unparsable mirror URL, before any network
    /// activity.
    pub fn new(base_url: &str, release: &str, architecture: &str) -> Result<Self> {
        let filename = format!(
            "archlinux-bootstrap-{}-{}.tar.gz",
            release, architecture
        );
        let raw = format!("{}/{}/{}", base_url, release, filename);
        let url =
            Url::parse(&raw).with_context(|| format!("Invalid source URL {}", raw))?;

        let tarball_path = staging::staging_path(&filename);
        let signature_path = staging::staging_path(&format!("{}.sig", filename));

        Ok(Self {
            filename,
            url,
            tarball_path,
            signature_path,
        })
    }

    /// Delete staged downloads that must not be trusted.
    pub fn discard_staged(&self) {
        let _ = fs::remove_file(&self.tarball_path);
        let _ = fs::remove_file(&self.signature_path);
    }
}

// =============================================================================
// Verification policy gate
// =============================================================================

/// How the downloaded artifact earns trust.
///
/// Decided once, before any download. Each variant names the trust anchor in
/// play, so the three-way branch stays auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPolicy {
    /// Verification disabled in the definition.
    Skipped,
    /// Encrypted transport; the mirror connection is the trust anchor.
    TrustedTransport,
    /// Insecure transport; a detached signature must verify.
    SignatureRequired,
}

impl VerificationPolicy {
    /// Decide the policy for a download. Order matters: an explicit skip
    /// wins, then an encrypted scheme, and an insecure scheme without trust
    /// keys is refused before any download is attempted.
    pub fn decide(skip_verification: bool, keys: &[String], url: &Url) -> Result<Self> {
        if skip_verification {
            return Ok(Self::Skipped);
        }

        if url.scheme() == "https" {
            return Ok(Self::TrustedTransport);
        }

        if keys.is_empty() {
            bail!("GPG keys are required if downloading from HTTP");
        }

        Ok(Self::SignatureRequired)
    }

    /// Whether the detached signature must be fetched and checked.
    pub fn requires_signature(self) -> bool {
        matches!(self, Self::SignatureRequired)
    }
}

// =============================================================================
// Layout normalizer
// =============================================================================

/// Flatten the `root.{arch}` directory the bootstrap tarball nests
/// everything under.
///
/// Two explicit phases: enumerate the nested directory's direct children and
/// relocate each to the destination's top level, then remove the emptied
/// directory. A destination entry already carrying a child's name is a hard
/// error; nothing is merged or overwritten.
pub fn flatten_bootstrap_root(rootfs_dir: &Path, architecture: &str) -> Result<()> {
    let nested = rootfs_dir.join(format!("root.{}", architecture));

    if !nested.is_dir() {
        bail!(
            "Bootstrap archive did not contain {}; the upstream layout may have changed",
            nested.display()
        );
    }

    let mut children = Vec::new();
    for entry in fs::read_dir(&nested)
        .with_context(|| format!("Failed to list {}", nested.display()))?
    {
        let entry = entry?;
        children.push((entry.path(), entry.file_name()));
    }

    for (child, name) in children {
        let target = rootfs_dir.join(&name);

        // symlink_metadata so a dangling symlink still counts as occupied
        if target.symlink_metadata().is_ok() {
            bail!("Refusing to overwrite existing {}", target.display());
        }

        fs::rename(&child, &target).with_context(|| {
            format!(
                "Failed to move {} to {}",
                child.display(),
                target.display()
            )
        })?;
    }

    fs::remove_dir_all(&nested)
        .with_context(|| format!("Failed to remove {}", nested.display()))?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
