//! Integration tests for status resolution precedence and idempotence.

use std::path::Path;

use tempfile::TempDir;

use stager_core::cache::{InstallFlag, ProductCache, ProductDir};
use stager_core::status;
use stager_core::types::{PackageManifest, ProductStatus};

fn manifest(version: &str) -> PackageManifest {
    PackageManifest {
        name: "app".to_string(),
        package_file: "app-2.1.zip".to_string(),
        version: version.to_string(),
        min_agent: String::new(),
        installation_arguments: String::new(),
        allow_unscripted_install: false,
        installation_target: None,
    }
}

fn product_dir(temp: &TempDir) -> ProductDir {
    ProductCache::new(temp.path()).product_dir("app", "prod")
}

/// Sorted (name, size) listing used to prove a query did not touch disk.
fn snapshot(dir: &Path) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            let entry = entry.expect("entry");
            let len = entry.metadata().expect("metadata").len();
            (entry.file_name().to_string_lossy().to_string(), len)
        })
        .collect();
    entries.sort();
    entries
}

#[test]
fn flag_and_version_combinations_obey_precedence() {
    // (blocked flag, recovery flag, local version) -> expected status
    let cases = [
        (false, false, Some("1.0"), ProductStatus::Outdated),
        (false, true, Some("1.0"), ProductStatus::Recovering),
        (true, false, Some("1.0"), ProductStatus::Blocked),
        (true, true, Some("1.0"), ProductStatus::Blocked),
        (false, false, None, ProductStatus::Uninstalled),
        (true, false, None, ProductStatus::Blocked),
    ];

    for (blocked, recovering, local_version, expected) in cases {
        let temp = TempDir::new().expect("temp dir");
        let dir = product_dir(&temp);
        dir.create().expect("create");

        if blocked {
            dir.set_flag(InstallFlag::Blocked).expect("flag");
        }
        if recovering {
            dir.set_flag(InstallFlag::Recovering).expect("flag");
        }
        if let Some(version) = local_version {
            dir.write_manifest(&manifest(version)).expect("write");
        }

        let resolution = status::resolve(Ok(manifest("2.0")), &dir).expect("resolve");
        assert_eq!(
            resolution.status, expected,
            "blocked={blocked} recovering={recovering} local={local_version:?}"
        );
    }
}

#[test]
fn resolving_twice_never_mutates_the_cache() {
    let temp = TempDir::new().expect("temp dir");
    let dir = product_dir(&temp);
    dir.create().expect("create");
    dir.write_manifest(&manifest("2.1")).expect("write");
    std::fs::write(dir.package_path("app-2.1.zip"), b"payload").expect("write");

    let before = snapshot(dir.path());

    let first = status::resolve(Ok(manifest("2.1")), &dir).expect("resolve");
    let second = status::resolve(Ok(manifest("2.1")), &dir).expect("resolve");

    assert_eq!(first.status, ProductStatus::Current);
    assert_eq!(first.status, second.status);
    assert_eq!(first.installed, second.installed);
    assert_eq!(first.catalog, second.catalog);
    assert_eq!(before, snapshot(dir.path()));
}

#[test]
fn partial_download_resolves_pending_download() {
    let temp = TempDir::new().expect("temp dir");
    let dir = product_dir(&temp);
    dir.create().expect("create");
    dir.write_manifest(&manifest("2.1")).expect("write");
    // Declared package file never arrived

    let resolution = status::resolve(Ok(manifest("2.1")), &dir).expect("resolve");
    assert_eq!(resolution.status, ProductStatus::PendingDownload);
}
