//! Status resolution for a single product version.
//!
//! A pure function of the catalog fetch outcome and the local cache
//! directory contents, evaluated in a fixed precedence order:
//!
//! 1. catalog fetch failed → `Indeterminate`
//! 2. cache directory missing → `Uninstalled`
//! 3. blocked flag present → `Blocked`
//! 4. recovery flag present → `Recovering`
//! 5. `version.json` absent → `Uninstalled`
//! 6. `version.json` unreadable → resolution failure
//! 7. version strings differ (byte-wise) → `Outdated`
//! 8. declared package file absent → `PendingDownload`
//! 9. otherwise → `Current`
//!
//! Flag files take precedence over everything below them; a directory with
//! both a blocked flag and an outdated `version.json` resolves `Blocked`.

use thiserror::Error;
use tracing::debug;

use crate::cache::{InstallFlag, ProductDir};
use crate::catalog::CatalogError;
use crate::types::{PackageManifest, ProductStatus};

/// Raised only when the cache directory exists but `version.json` cannot be
/// read or parsed. Every other condition maps to a status value.
#[derive(Debug, Error)]
#[error("unreadable installed manifest in {dir}: {cause}")]
pub struct StatusError {
    pub dir: String,
    pub cause: anyhow::Error,
}

/// Output of one resolution pass.
///
/// The catalog manifest is attached whenever the fetch succeeded, whatever
/// the final status, so downstream components can read the package file name
/// and install options without re-fetching.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub status: ProductStatus,
    pub catalog: Option<PackageManifest>,
    pub installed: Option<PackageManifest>,
}

pub fn resolve(
    outcome: Result<PackageManifest, CatalogError>,
    dir: &ProductDir,
) -> Result<Resolution, StatusError> {
    let catalog = match outcome {
        Ok(manifest) => manifest,
        Err(err) => {
            debug!(error = %err, "catalog fetch failed, status is indeterminate");
            return Ok(Resolution {
                status: ProductStatus::Indeterminate,
                catalog: None,
                installed: None,
            });
        }
    };

    if !dir.exists() {
        return Ok(resolved(ProductStatus::Uninstalled, catalog, None));
    }

    if dir.has_flag(InstallFlag::Blocked) {
        return Ok(resolved(ProductStatus::Blocked, catalog, None));
    }
    if dir.has_flag(InstallFlag::Recovering) {
        return Ok(resolved(ProductStatus::Recovering, catalog, None));
    }

    let installed = match dir.read_manifest() {
        Ok(Some(manifest)) => manifest,
        Ok(None) => return Ok(resolved(ProductStatus::Uninstalled, catalog, None)),
        Err(cause) => {
            return Err(StatusError {
                dir: dir.path().display().to_string(),
                cause,
            });
        }
    };

    // Ordinal comparison: any byte difference reads as outdated.
    if installed.version != catalog.version {
        return Ok(resolved(ProductStatus::Outdated, catalog, Some(installed)));
    }

    if !dir.package_path(&catalog.package_file).exists() {
        return Ok(resolved(
            ProductStatus::PendingDownload,
            catalog,
            Some(installed),
        ));
    }

    Ok(resolved(ProductStatus::Current, catalog, Some(installed)))
}

fn resolved(
    status: ProductStatus,
    catalog: PackageManifest,
    installed: Option<PackageManifest>,
) -> Resolution {
    Resolution {
        status,
        catalog: Some(catalog),
        installed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProductCache;

    fn manifest(version: &str) -> PackageManifest {
        PackageManifest {
            name: "app".to_string(),
            package_file: "app.zip".to_string(),
            version: version.to_string(),
            min_agent: String::new(),
            installation_arguments: String::new(),
            allow_unscripted_install: false,
            installation_target: None,
        }
    }

    fn product_dir(temp: &tempfile::TempDir) -> ProductDir {
        ProductCache::new(temp.path()).product_dir("app", "prod")
    }

    #[test]
    fn failed_fetch_is_indeterminate() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");

        let resolution = resolve(
            Err(CatalogError::Status(reqwest::StatusCode::NOT_FOUND)),
            &dir,
        )
        .expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Indeterminate);
        assert!(resolution.catalog.is_none());
    }

    #[test]
    fn missing_directory_is_uninstalled() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);

        let resolution = resolve(Ok(manifest("2.1")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Uninstalled);
        // Catalog manifest is attached even though nothing is installed
        assert!(resolution.catalog.is_some());
    }

    #[test]
    fn blocked_flag_wins_over_outdated_manifest() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");
        dir.write_manifest(&manifest("1.0")).expect("write");
        dir.set_flag(InstallFlag::Blocked).expect("flag");

        let resolution = resolve(Ok(manifest("2.0")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Blocked);
    }

    #[test]
    fn blocked_flag_wins_over_recovery_flag() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");
        dir.set_flag(InstallFlag::Blocked).expect("flag");
        dir.set_flag(InstallFlag::Recovering).expect("flag");

        let resolution = resolve(Ok(manifest("2.0")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Blocked);
    }

    #[test]
    fn recovery_flag_forces_recovering() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");
        dir.set_flag(InstallFlag::Recovering).expect("flag");

        let resolution = resolve(Ok(manifest("2.0")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Recovering);
    }

    #[test]
    fn empty_directory_is_uninstalled() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");

        let resolution = resolve(Ok(manifest("2.1")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Uninstalled);
    }

    #[test]
    fn corrupt_manifest_is_a_resolution_failure() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");
        std::fs::write(dir.manifest_path(), "{ not json").expect("write");

        assert!(resolve(Ok(manifest("2.1")), &dir).is_err());
    }

    #[test]
    fn version_difference_is_outdated() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");
        dir.write_manifest(&manifest("1.0")).expect("write");

        let resolution = resolve(Ok(manifest("2.0")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Outdated);
        assert_eq!(resolution.installed.expect("installed").version, "1.0");
    }

    #[test]
    fn version_comparison_is_case_sensitive() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");
        dir.write_manifest(&manifest("2.0-RC1")).expect("write");

        let resolution = resolve(Ok(manifest("2.0-rc1")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Outdated);
    }

    #[test]
    fn missing_package_file_is_pending_download() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");
        dir.write_manifest(&manifest("2.1")).expect("write");

        let resolution = resolve(Ok(manifest("2.1")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::PendingDownload);
    }

    #[test]
    fn matching_version_and_payload_is_current() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");
        dir.write_manifest(&manifest("2.1")).expect("write");
        std::fs::write(dir.package_path("app.zip"), b"payload").expect("write");

        let resolution = resolve(Ok(manifest("2.1")), &dir).expect("resolve");
        assert_eq!(resolution.status, ProductStatus::Current);
        assert!(resolution.installed.is_some());
        assert!(resolution.catalog.is_some());
    }
}
