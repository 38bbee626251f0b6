//! Stager Core Library
//!
//! Domain logic for a single-product deployment agent: resolving the status
//! of a package version against a remote catalog, and driving the
//! download/extract/install state machine that brings the local machine
//! up to date.

pub mod archive;
pub mod cache;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod download;
pub mod install;
pub mod installer;
pub mod progress;
pub mod status;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::AgentConfig;

    // Data model
    pub use crate::types::{PackageManifest, ProductRecord, ProductStatus};

    // Cache layout
    pub use crate::cache::{InstallFlag, ProductCache, ProductDir};

    // Catalog
    pub use crate::catalog::{CatalogClient, CatalogError};

    // Download pipeline
    pub use crate::download::{
        DownloadError, Downloader, PackageFetcher, ProgressTracker, ProgressUpdate, RateGate,
    };

    // Progress sink
    pub use crate::progress::{NullSink, ProgressReport, ProgressSink};

    // Orchestration
    pub use crate::install::InstallOrchestrator;

    // Commands
    pub use crate::commands::{InstallCommand, StatusCommand};
}
