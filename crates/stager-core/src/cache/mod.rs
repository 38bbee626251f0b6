//! Per-product cache directory layout and flag-file state.
//!
//! The cache directory is the cross-invocation persistence layer: the mere
//! existence of `<cache_root>/<name>/<tag>/` is the installed/uninstalled
//! boundary, flag files encode blocked/recovering states, and `version.json`
//! records the last successful download. Every read and write of that state
//! goes through [`ProductDir`] so the install state machine can be exercised
//! against a temporary directory in tests.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::types::PackageManifest;

/// Serialized installed-manifest file inside each product directory.
pub const MANIFEST_FILE: &str = "version.json";

/// Destination subdirectory for archive expansion.
pub const EXTRACT_DIR: &str = "extract";

/// Empty marker files whose presence short-circuits status resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallFlag {
    /// Suppresses all automatic action until manually removed.
    Blocked,
    /// A previous install attempt did not complete cleanly.
    Recovering,
}

impl InstallFlag {
    pub fn file_name(self) -> &'static str {
        match self {
            InstallFlag::Blocked => "installblocked.flag",
            InstallFlag::Recovering => "installrecovery.flag",
        }
    }
}

/// Root of the local package cache.
#[derive(Debug, Clone)]
pub struct ProductCache {
    root: PathBuf,
}

impl ProductCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `<root>/<name>/<version_tag>` directory for one product version.
    pub fn product_dir(&self, name: &str, version_tag: &str) -> ProductDir {
        ProductDir {
            dir: self.root.join(name).join(version_tag),
        }
    }
}

/// One per-package/version cache directory.
#[derive(Debug, Clone)]
pub struct ProductDir {
    dir: PathBuf,
}

impl ProductDir {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn create(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))
    }

    pub fn remove(&self) -> anyhow::Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir).with_context(|| {
                format!("Failed to remove cache directory: {}", self.dir.display())
            })?;
        }
        Ok(())
    }

    pub fn recreate(&self) -> anyhow::Result<()> {
        self.remove()?;
        self.create()
    }

    pub fn has_flag(&self, flag: InstallFlag) -> bool {
        self.dir.join(flag.file_name()).exists()
    }

    pub fn set_flag(&self, flag: InstallFlag) -> anyhow::Result<()> {
        let path = self.dir.join(flag.file_name());
        std::fs::write(&path, b"")
            .with_context(|| format!("Failed to write flag file: {}", path.display()))
    }

    pub fn clear_flag(&self, flag: InstallFlag) -> anyhow::Result<()> {
        let path = self.dir.join(flag.file_name());
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove flag file: {}", path.display()))?;
        }
        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Read the installed manifest.
    ///
    /// `Ok(None)` when the file is absent; an error only when it exists but
    /// cannot be read or parsed.
    pub fn read_manifest(&self) -> anyhow::Result<Option<PackageManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read installed manifest: {}", path.display()))?;
        let manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse installed manifest: {}", path.display()))?;
        Ok(Some(manifest))
    }

    /// Persist the installed manifest, pretty-printed.
    pub fn write_manifest(&self, manifest: &PackageManifest) -> anyhow::Result<()> {
        let content =
            serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;
        let path = self.manifest_path();
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write installed manifest: {}", path.display()))
    }

    /// Path of the downloaded payload named by the catalog manifest.
    pub fn package_path(&self, package_file: &str) -> PathBuf {
        self.dir.join(package_file)
    }

    /// Transient `<packageFile>.inprogress` marker written during download.
    pub fn progress_marker(&self, package_file: &str) -> PathBuf {
        self.dir.join(format!("{package_file}.inprogress"))
    }

    pub fn clear_progress_marker(&self, package_file: &str) -> anyhow::Result<()> {
        let path = self.progress_marker(package_file);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove progress marker: {}", path.display()))?;
        }
        Ok(())
    }

    pub fn extract_dir(&self) -> PathBuf {
        self.dir.join(EXTRACT_DIR)
    }
}
