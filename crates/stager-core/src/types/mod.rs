//! Shared data model: package manifests, product records, and status values.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A package version manifest.
///
/// The same structure serves two roles: the remote catalog document fetched
/// from `<repository>/<name>/<tag>/version.txt`, and the local `version.json`
/// record of what was last downloaded for that version. Wire field names are
/// PascalCase to match the published catalog format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageManifest {
    pub name: String,
    pub package_file: String,
    pub version: String,
    #[serde(default)]
    pub min_agent: String,
    #[serde(default)]
    pub installation_arguments: String,
    #[serde(default)]
    pub allow_unscripted_install: bool,
    #[serde(default)]
    pub installation_target: Option<String>,
}

/// Resolved state of one package version on this machine.
///
/// Exactly one value is attached per resolution pass. Version strings are
/// compared byte-for-byte, so any difference at all reads as `Outdated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    Uninstalled,
    Blocked,
    Recovering,
    Outdated,
    InProgress,
    PendingDownload,
    Current,
    Indeterminate,
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProductStatus::Uninstalled => "Uninstalled",
            ProductStatus::Blocked => "Blocked",
            ProductStatus::Recovering => "Recovering",
            ProductStatus::Outdated => "Outdated",
            ProductStatus::InProgress => "InProgress",
            ProductStatus::PendingDownload => "PendingDownload",
            ProductStatus::Current => "Current",
            ProductStatus::Indeterminate => "Indeterminate",
        })
    }
}

/// Snapshot of one product as seen by a single status query.
///
/// Computed fresh on every query and never persisted itself; `version.json`
/// in the cache directory is the only durable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub version_tag: String,
    /// What was last successfully downloaded, if anything.
    pub installed: Option<PackageManifest>,
    /// The remote manifest, attached whenever the catalog fetch succeeded.
    pub catalog: Option<PackageManifest>,
    pub status: ProductStatus,
    /// Open key/value options, passed through untouched by the core.
    pub options: HashMap<String, String>,
}
