//! Get-status command: resolve the current state of one product version.

use std::collections::HashMap;

use anyhow::Context;
use tracing::debug;

use crate::cache::ProductCache;
use crate::catalog::CatalogClient;
use crate::config::AgentConfig;
use crate::status;
use crate::types::ProductRecord;

#[derive(Debug, Clone)]
pub struct StatusCommand {
    config: AgentConfig,
}

impl StatusCommand {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Resolve the product record. Read-only: querying status twice with no
    /// intervening install never mutates the cache.
    pub async fn execute(&self, name: &str, version_tag: &str) -> anyhow::Result<ProductRecord> {
        let catalog = CatalogClient::new(&self.config.repository_url)
            .context("Invalid repository configuration")?;
        let cache = ProductCache::new(&self.config.cache_root);
        let dir = cache.product_dir(name, version_tag);

        let outcome = catalog.fetch(name, version_tag).await;
        debug!(
            product = name,
            version_tag,
            ok = outcome.is_ok(),
            "catalog fetch finished"
        );

        let resolution = status::resolve(outcome, &dir)
            .with_context(|| format!("Failed to determine status for {name} {version_tag}"))?;

        Ok(ProductRecord {
            name: name.to_string(),
            version_tag: version_tag.to_string(),
            installed: resolution.installed,
            catalog: resolution.catalog,
            status: resolution.status,
            options: HashMap::new(),
        })
    }
}
