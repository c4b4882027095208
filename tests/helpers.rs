//! Shared test utilities for archstrap tests.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test environment with temporary directories for rootfs and staging.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Destination rootfs directory
    pub rootfs: PathBuf,
    /// Scratch directory for fixture tarballs
    pub staging: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with temporary directories.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let rootfs = base.join("rootfs");
        let staging = base.join("staging");

        fs::create_dir_all(&rootfs).expect("Failed to create rootfs dir");
        fs::create_dir_all(&staging).expect("Failed to create staging dir");

        Self {
            _temp_dir: temp_dir,
            rootfs,
            staging,
        }
    }
}

type TarballBuilder = tar::Builder<GzEncoder<File>>;

/// Build a tar.gz laid out like a real bootstrap tarball: everything nested
/// under a single `root.{architecture}` directory.
pub fn make_bootstrap_tarball(dir: &Path, architecture: &str) -> PathBuf {
    let path = dir.join(format!(
        "archlinux-bootstrap-2024.01.01-{}.tar.gz",
        architecture
    ));
    let file = File::create(&path).expect("Failed to create tarball");
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let root = format!("root.{}", architecture);
    append_dir(&mut builder, &format!("{}/", root));
    append_dir(&mut builder, &format!("{}/etc/", root));
    append_file(
        &mut builder,
        &format!("{}/etc/pacman.conf", root),
        b"[options]\nArchitecture = auto\n",
        0o644,
    );
    append_dir(&mut builder, &format!("{}/usr/", root));
    append_dir(&mut builder, &format!("{}/usr/bin/", root));
    append_file(
        &mut builder,
        &format!("{}/usr/bin/pacstrap", root),
        b"#!/bin/sh\n",
        0o755,
    );
    append_file(&mut builder, &format!("{}/version", root), b"2024.01.01\n", 0o644);

    finish(builder);
    path
}

/// Build a tar.gz with an entry that tries to escape the destination.
///
/// `Header::set_path` refuses `..` components, so the malicious name is
/// written into the raw header bytes the way a hostile archive would carry it.
pub fn make_traversal_tarball(dir: &Path) -> PathBuf {
    let path = dir.join("traversal.tar.gz");
    let file = File::create(&path).expect("Failed to create tarball");
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    append_file(&mut builder, "root.x86_64/ok", b"fine\n", 0o644);

    let content: &[u8] = b"not fine\n";
    let mut header = tar::Header::new_gnu();
    let name = b"../escape";
    header.as_old_mut().name[..name.len()].copy_from_slice(name);
    header.set_mode(0o644);
    header.set_size(content.len() as u64);
    header.set_cksum();
    builder
        .append(&header, content)
        .expect("Failed to append traversal entry");

    finish(builder);
    path
}

fn append_dir(builder: &mut TarballBuilder, path: &str) {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_mode(0o755);
    header.set_size(0);
    builder
        .append_data(&mut header, path, std::io::empty())
        .expect("Failed to append directory");
}

fn append_file(builder: &mut TarballBuilder, path: &str, content: &[u8], mode: u32) {
    let mut header = tar::Header::new_gnu();
    header.set_mode(mode);
    header.set_size(content.len() as u64);
    builder
        .append_data(&mut header, path, content)
        .expect("Failed to append file");
}

fn finish(builder: TarballBuilder) {
    builder
        .into_inner()
        .expect("Failed to finish tarball")
        .finish()
        .expect("Failed to finish gzip stream");
}

/// Assert a path exists and is a regular file.
pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "expected file at {}", path.display());
}

/// Assert a path exists and is a directory.
pub fn assert_dir_exists(path: &Path) {
    assert!(path.is_dir(), "expected directory at {}", path.display());
}
