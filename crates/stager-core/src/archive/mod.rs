//! Archive expansion for downloaded payloads.
//!
//! Zip and 7z payloads are expanded into the target directory, recreating
//! each entry's relative directory structure. Any other extension is not an
//! archive; the installer reads those payloads straight from the download
//! directory.

use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Payload classification by file extension, case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Zip,
    SevenZ,
    Other,
}

impl PayloadKind {
    pub fn of(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("zip") => PayloadKind::Zip,
            Some("7z") => PayloadKind::SevenZ,
            _ => PayloadKind::Other,
        }
    }

    pub fn is_archive(self) -> bool {
        !matches!(self, PayloadKind::Other)
    }
}

/// Expand `archive` into `target`, creating `target` if absent.
///
/// Non-archive payloads pass through untouched and leave the filesystem
/// alone. A failure leaves whatever was extracted so far in place; callers
/// log and continue to installer discovery, which simply finds nothing
/// usable.
pub fn extract(archive: &Path, target: &Path) -> anyhow::Result<()> {
    let kind = PayloadKind::of(archive);
    if !kind.is_archive() {
        return Ok(());
    }

    std::fs::create_dir_all(target)
        .with_context(|| format!("Failed to create extract directory: {}", target.display()))?;

    match kind {
        PayloadKind::Zip => extract_zip(archive, target),
        PayloadKind::SevenZ => extract_seven_z(archive, target),
        PayloadKind::Other => Ok(()),
    }
}

fn extract_zip(archive: &Path, target: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip archive: {}", archive.display()))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry {}", i))?;

        // Skip entries whose paths would escape the target directory
        let outpath = match entry.enclosed_name() {
            Some(path) => target.join(path),
            None => continue,
        };

        // Directory entries are structural only
        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)
                .with_context(|| format!("Failed to create directory: {}", outpath.display()))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory: {}", parent.display())
            })?;
        }

        debug!(entry = entry.name(), "extracting");
        let mut outfile = std::fs::File::create(&outpath)
            .with_context(|| format!("Failed to create file: {}", outpath.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to write file: {}", outpath.display()))?;
    }

    Ok(())
}

fn extract_seven_z(archive: &Path, target: &Path) -> anyhow::Result<()> {
    sevenz_rust2::decompress_file(archive, target)
        .with_context(|| format!("Failed to extract 7z archive: {}", archive.display()))
}
