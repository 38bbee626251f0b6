//! Remote version catalog client.
//!
//! Fetches the manifest document for one package version from
//! `<repository>/<name>/<versionTag>/version.txt` and builds payload URLs
//! from the same layout. The catalog being unreachable is an expected
//! condition; callers map any [`CatalogError`] to an `Indeterminate` status
//! rather than treating it as fatal.

use thiserror::Error;
use url::Url;

use crate::types::PackageManifest;

/// Remote manifest document name inside each version directory.
pub const MANIFEST_DOCUMENT: &str = "version.txt";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed manifest document: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    base: Url,
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new(repository_url: &str) -> Result<Self, CatalogError> {
        // The base must end with a slash or Url::join drops the last segment.
        let raw = if repository_url.ends_with('/') {
            repository_url.to_string()
        } else {
            format!("{repository_url}/")
        };
        let base = Url::parse(&raw)?;
        Ok(Self {
            base,
            http: reqwest::Client::new(),
        })
    }

    /// URL of the manifest document for one package version.
    pub fn manifest_url(&self, name: &str, version_tag: &str) -> Result<Url, CatalogError> {
        Ok(self
            .base
            .join(&format!("{name}/{version_tag}/{MANIFEST_DOCUMENT}"))?)
    }

    /// URL of the package payload named by a fetched manifest.
    pub fn package_url(
        &self,
        name: &str,
        version_tag: &str,
        package_file: &str,
    ) -> Result<Url, CatalogError> {
        Ok(self
            .base
            .join(&format!("{name}/{version_tag}/{package_file}"))?)
    }

    /// Fetch and parse the catalog manifest for one package version.
    pub async fn fetch(
        &self,
        name: &str,
        version_tag: &str,
    ) -> Result<PackageManifest, CatalogError> {
        let url = self.manifest_url(name, version_tag)?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }
        let body = response.text().await?;
        let manifest = serde_json::from_str(&body)?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_url_follows_catalog_layout() {
        let client = CatalogClient::new("https://packages.example.com/v1/").expect("client");
        let url = client.manifest_url("app", "prod").expect("url");
        assert_eq!(
            url.as_str(),
            "https://packages.example.com/v1/app/prod/version.txt"
        );
    }

    #[test]
    fn missing_trailing_slash_is_normalized() {
        let client = CatalogClient::new("https://packages.example.com/v1").expect("client");
        let url = client.manifest_url("app", "prod").expect("url");
        assert_eq!(
            url.as_str(),
            "https://packages.example.com/v1/app/prod/version.txt"
        );
    }

    #[test]
    fn package_url_uses_manifest_file_name() {
        let client = CatalogClient::new("https://packages.example.com/v1/").expect("client");
        let url = client
            .package_url("app", "prod", "app-2.1.zip")
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://packages.example.com/v1/app/prod/app-2.1.zip"
        );
    }

    #[test]
    fn invalid_repository_url_is_rejected() {
        assert!(CatalogClient::new("not a url").is_err());
    }
}
