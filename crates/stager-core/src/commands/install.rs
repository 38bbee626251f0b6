//! Install command: drive the install state machine for one product and
//! report the post-install status.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::cache::ProductCache;
use crate::catalog::CatalogClient;
use crate::commands::StatusCommand;
use crate::config::AgentConfig;
use crate::install::InstallOrchestrator;
use crate::progress::{NullSink, ProgressSink};
use crate::types::{ProductRecord, ProductStatus};

pub struct InstallCommand {
    config: AgentConfig,
    sink: Arc<dyn ProgressSink>,
}

impl InstallCommand {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Install or update one product version.
    ///
    /// With `force`, the cache directory is erased first so resolution
    /// starts over from `Uninstalled`. The returned record reflects a fresh
    /// status query after the attempt; install failures show up there, not
    /// as an error from this method.
    pub async fn execute(
        &self,
        name: &str,
        version_tag: &str,
        force: bool,
    ) -> anyhow::Result<ProductRecord> {
        let cache = ProductCache::new(&self.config.cache_root);
        let dir = cache.product_dir(name, version_tag);

        if force {
            info!(
                product = name,
                "force flag set, erasing cached package to force reinstallation"
            );
            if let Err(err) = dir.remove() {
                warn!(error = %err, "failed to remove cache directory");
            }
        }

        let status_command = StatusCommand::new(self.config.clone());
        let mut product = status_command.execute(name, version_tag).await?;

        if product.status == ProductStatus::Current {
            warn!(
                product = name,
                "package is already installed, reinstall with force"
            );
        }

        let catalog = CatalogClient::new(&self.config.repository_url)
            .context("Invalid repository configuration")?;
        let orchestrator = InstallOrchestrator::new(catalog)?.with_sink(self.sink.clone());
        orchestrator.run(&mut product, &dir).await;

        status_command.execute(name, version_tag).await
    }
}
