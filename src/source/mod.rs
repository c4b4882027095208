//! Pluggable rootfs sources.
//!
//! A source turns a definition into a populated rootfs directory. archstrap
//! ships one source, the Arch Linux bootstrap mirror; the trait is the seam
//! an image-build orchestrator selects through.

use anyhow::Result;
use std::path::Path;

use crate::definition::Definition;

pub mod archlinux;

pub use archlinux::ArchLinuxSource;

/// A provider of root filesystems.
pub trait Source {
    /// Stable name used to select this source.
    fn name(&self) -> &'static str;

    /// Populate `rootfs_dir` according to the definition.
    ///
    /// On failure the destination state is undefined; callers must wipe and
    /// retry rather than resume.
    fn run(&self, definition: &Definition, rootfs_dir: &Path) -> Result<()>;
}

/// Look up a source by name.
pub fn by_name(name: &str) -> Option<Box<dyn Source>> {
    match name {
        "archlinux-http" => Some(Box::new(ArchLinuxSource)),
        _ => None,
    }
}
