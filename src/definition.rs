//! Image definition loading for archstrap.
//!
//! A definition is a small JSON document describing which release to fetch,
//! for which architecture, from which mirror, and what trust material to use
//! when verification is required. Every field has a default so an empty
//! definition (or none at all) still describes a valid fetch of the latest
//! release for x86_64. Environment variables take precedence over the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default mirror serving Arch Linux bootstrap tarballs.
pub const DEFAULT_MIRROR_URL: &str = "https://mirror.rackspace.com/archlinux/iso";

/// Default keyserver for importing trust keys.
pub const DEFAULT_KEYSERVER: &str = "hkps.pool.sks-keyservers.net";

/// Full image definition: what to fetch and where from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub image: ImageSpec,
    #[serde(default)]
    pub source: SourceSpec,
}

/// The image being requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Release identifier (e.g. "2024.01.01"). Empty means "resolve latest".
    #[serde(default)]
    pub release: String,
    /// Target architecture. Aliases like "amd64" are mapped before use.
    #[serde(default = "default_architecture")]
    pub architecture: String,
}

/// Where to fetch from, and the trust material for insecure transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Mirror base URL. The tarball lives at `{url}/{release}/{filename}`.
    #[serde(default = "default_mirror")]
    pub url: String,
    /// GPG key fingerprints trusted to sign the bootstrap tarball.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Keyserver the trust keys are imported from.
    #[serde(default = "default_keyserver")]
    pub keyserver: String,
    /// Skip signature verification entirely.
    #[serde(default)]
    pub skip_verification: bool,
}

fn default_architecture() -> String {
    "x86_64".to_string()
}

fn default_mirror() -> String {
    DEFAULT_MIRROR_URL.to_string()
}

fn default_keyserver() -> String {
    DEFAULT_KEYSERVER.to_string()
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            release: String::new(),
            architecture: default_architecture(),
        }
    }
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self {
            url: default_mirror(),
            keys: Vec::new(),
            keyserver: default_keyserver(),
            skip_verification: false,
        }
    }
}

impl Default for Definition {
    fn default() -> Self {
        Self {
            image: ImageSpec::default(),
            source: SourceSpec::default(),
        }
    }
}

impl Definition {
    /// Load a definition from a JSON file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read definition {}", path.display()))?;
        let mut definition: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse definition {}", path.display()))?;
        definition.apply_env();
        Ok(definition)
    }

    /// Build a definition from defaults and environment overrides only.
    pub fn from_env() -> Self {
        let mut definition = Self::default();
        definition.apply_env();
        definition
    }

    /// Apply `ARCHSTRAP_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(mirror) = std::env::var("ARCHSTRAP_MIRROR") {
            self.source.url = mirror;
        }
        if let Ok(release) = std::env::var("ARCHSTRAP_RELEASE") {
            self.image.release = release;
        }
        if let Ok(arch) = std::env::var("ARCHSTRAP_ARCH") {
            self.image.architecture = arch;
        }
        if let Ok(keyserver) = std::env::var("ARCHSTRAP_KEYSERVER") {
            self.source.keyserver = keyserver;
        }
    }

    /// Architecture with common aliases normalized to Arch Linux names.
    pub fn architecture_mapped(&self) -> &str {
        match self.image.architecture.as_str() {
            "amd64" => "x86_64",
            "arm64" => "aarch64",
            other => other,
        }
    }

    /// Print the effective configuration.
    pub fn print(&self) {
        println!("Definition:");
        println!("  release:           {}", if self.image.release.is_empty() {
            "(latest)"
        } else {
            self.image.release.as_str()
        });
        println!("  architecture:      {}", self.architecture_mapped());
        println!("  mirror:            {}", self.source.url);
        println!("  keyserver:         {}", self.source.keyserver);
        println!("  keys:              {}", self.source.keys.len());
        println!("  skip verification: {}", self.source.skip_verification);
    }
}
