//! Core install state machine for a single product version.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, trace, warn};

use crate::archive::{self, PayloadKind};
use crate::cache::{InstallFlag, ProductDir};
use crate::catalog::CatalogClient;
use crate::download::{Downloader, PackageFetcher, ProgressUpdate, RateGate};
use crate::installer;
use crate::progress::{NullSink, ProgressReport, ProgressSink};
use crate::types::{ProductRecord, ProductStatus};

const DOWNLOAD_ACTIVITY_ID: u32 = 0;
const DOWNLOAD_ACTIVITY: &str = "Download Package";

/// Floor between derived progress reports sent to the sink.
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Consumes a resolved status and applies the flag-file transition rules,
/// then runs the install sequence: download, persist manifest, extract,
/// execute installers, clear the in-progress marker.
///
/// At most one attempt per invocation: failures are logged and surface as a
/// different status on the next query, never as a returned error.
pub struct InstallOrchestrator<F = Downloader> {
    catalog: CatalogClient,
    fetcher: F,
    sink: Arc<dyn ProgressSink>,
}

impl InstallOrchestrator<Downloader> {
    pub fn new(catalog: CatalogClient) -> anyhow::Result<Self> {
        Ok(Self {
            catalog,
            fetcher: Downloader::new()?,
            sink: Arc::new(NullSink),
        })
    }
}

impl<F: PackageFetcher> InstallOrchestrator<F> {
    /// Build with an explicit fetcher; tests use this to avoid the network.
    pub fn with_fetcher(catalog: CatalogClient, fetcher: F) -> Self {
        Self {
            catalog,
            fetcher,
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Drive one install attempt for a product whose status is already
    /// resolved. Never raises; the caller always gets control back.
    pub async fn run(&self, product: &mut ProductRecord, dir: &ProductDir) {
        if let Err(err) = self.step(product, dir).await {
            error!(product = product.name, error = %err, "install attempt failed");
        }
    }

    async fn step(&self, product: &mut ProductRecord, dir: &ProductDir) -> anyhow::Result<()> {
        match product.status {
            ProductStatus::Current => {
                warn!(
                    product = product.name,
                    "already current, no action taken (reinstall with force)"
                );
                return Ok(());
            }
            ProductStatus::Blocked => {
                warn!(
                    product = product.name,
                    "installation blocked, clear installblocked.flag to retry"
                );
                return Ok(());
            }
            ProductStatus::Indeterminate => {
                warn!(
                    product = product.name,
                    "status indeterminate (catalog unreachable or unknown package), no action taken"
                );
                return Ok(());
            }
            // A recovery attempt that itself failed: convert to a permanent
            // block instead of looping.
            ProductStatus::InProgress if dir.has_flag(InstallFlag::Recovering) => {
                warn!(
                    product = product.name,
                    "repeated installation failure, blocking package until the cache is cleared manually"
                );
                dir.set_flag(InstallFlag::Blocked)?;
                return Ok(());
            }
            ProductStatus::Recovering => {
                warn!(
                    product = product.name,
                    "previous recovery attempt did not complete, blocking package until the cache is cleared manually"
                );
                dir.set_flag(InstallFlag::Blocked)?;
                return Ok(());
            }
            // Second attempt at installing: start over from a clean directory
            // with the recovery flag raised.
            ProductStatus::InProgress => {
                dir.recreate()?;
                dir.set_flag(InstallFlag::Recovering)?;
            }
            ProductStatus::Outdated => {
                trace!(
                    product = product.name,
                    "versions differ, replacing cached package"
                );
                dir.remove()?;
                product.status = ProductStatus::InProgress;
            }
            ProductStatus::Uninstalled | ProductStatus::PendingDownload => {}
        }

        self.perform_install(product, dir).await
    }

    async fn perform_install(
        &self,
        product: &mut ProductRecord,
        dir: &ProductDir,
    ) -> anyhow::Result<()> {
        let Some(manifest) = product.catalog.clone() else {
            anyhow::bail!("no catalog manifest attached to product record");
        };

        dir.create()?;
        info!(
            product = manifest.name,
            version = manifest.version,
            file = manifest.package_file,
            dir = %dir.path().display(),
            "starting download"
        );

        let package_path = dir.package_path(&manifest.package_file);
        let marker = dir.progress_marker(&manifest.package_file);
        let url = self
            .catalog
            .package_url(&product.name, &product.version_tag, &manifest.package_file)?;

        let sink = self.sink.as_ref();
        let mut gate = RateGate::new(REPORT_INTERVAL);
        let mut on_progress = |update: ProgressUpdate| {
            // Last reported percentage, persisted for crash inspection
            let text = update.percent.map(|p| p.to_string()).unwrap_or_default();
            if let Err(err) = std::fs::write(&marker, text) {
                trace!(error = %err, "failed writing progress marker");
            }

            if let Some(report) = gate.observe(&update) {
                let status = if report.rate_mbit > 0.0 {
                    format!(
                        "Downloading file {} ({:.1}Mbit/s)",
                        update.destination.display(),
                        report.rate_mbit
                    )
                } else {
                    format!("Downloading file {}", update.destination.display())
                };
                sink.progress(&ProgressReport {
                    activity_id: DOWNLOAD_ACTIVITY_ID,
                    activity: DOWNLOAD_ACTIVITY.to_string(),
                    status,
                    percent: report.percent,
                });
            }
        };

        self.fetcher
            .fetch_package(url.as_str(), &package_path, &mut on_progress)
            .await?;
        info!(
            product = manifest.name,
            version = manifest.version,
            "download finished"
        );

        // The payload is on disk; record what we have before going further
        dir.write_manifest(&manifest)?;

        let install_root = if PayloadKind::of(&package_path).is_archive() {
            let extract_dir = dir.extract_dir();
            if let Err(err) = archive::extract(&package_path, &extract_dir) {
                warn!(error = %err, "extraction failed, continuing to installer discovery");
            } else {
                info!(
                    product = manifest.name,
                    version = manifest.version,
                    "extraction finished"
                );
            }
            extract_dir
        } else {
            dir.path().to_path_buf()
        };

        match installer::plan(&install_root, &manifest) {
            Ok(actions) if actions.is_empty() => {
                info!(
                    product = manifest.name,
                    "no installer found, payload placed without running an install"
                );
            }
            Ok(actions) => {
                for run in installer::execute(actions) {
                    if run.succeeded() {
                        info!(
                            product = manifest.name,
                            version = manifest.version,
                            "successfully installed"
                        );
                    } else if let Ok(status) = &run.outcome {
                        warn!(
                            product = manifest.name,
                            code = ?status.code(),
                            "installer exited with failure"
                        );
                    }
                }
            }
            Err(err) => warn!(error = %err, "installer discovery failed"),
        }

        dir.clear_progress_marker(&manifest.package_file)?;
        dir.clear_flag(InstallFlag::Recovering)?;
        Ok(())
    }
}
