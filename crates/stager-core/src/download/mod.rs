//! Streaming package download with throttled progress updates.
//!
//! The response body is streamed to disk chunk by chunk, never buffered in
//! memory. Progress emission is dual-mode: when the response declares a
//! content length, an update fires only once cumulative progress has
//! advanced more than two percentage points; for chunked bodies, every 200
//! chunks read. One final update always fires at end of stream.
//!
//! A partial file from an aborted download is left in place; callers decide
//! when to clean up.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Generous ceiling so a stalled transfer cannot hang forever.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Chunks between updates when the total size is unknown.
const CHUNKS_PER_UPDATE: u64 = 200;

/// Minimum percentage-point advance between updates when the size is known.
const PERCENT_STEP: f64 = 2.0;

/// Bytes-per-second divisor yielding Mbit/s.
const MBIT: f64 = 131_072.0;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("download returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("failed writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot of a transfer, passed to progress observers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub total_bytes: Option<u64>,
    pub transferred: u64,
    /// Percentage rounded to two decimals; `None` for chunked bodies.
    pub percent: Option<f64>,
    pub destination: PathBuf,
}

/// Decides which chunk boundaries produce a progress update.
#[derive(Debug)]
pub struct ProgressTracker {
    total: Option<u64>,
    destination: PathBuf,
    transferred: u64,
    chunks: u64,
    last_percent: f64,
}

impl ProgressTracker {
    pub fn new(total: Option<u64>, destination: impl Into<PathBuf>) -> Self {
        Self {
            total,
            destination: destination.into(),
            transferred: 0,
            chunks: 0,
            last_percent: 0.0,
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Record one chunk; returns an update when the throttle allows one.
    pub fn record(&mut self, len: u64) -> Option<ProgressUpdate> {
        self.transferred += len;
        match self.percent() {
            Some(percent) => {
                if percent - self.last_percent > PERCENT_STEP {
                    self.last_percent = percent;
                    Some(self.snapshot())
                } else {
                    None
                }
            }
            None => {
                self.chunks += 1;
                if self.chunks % CHUNKS_PER_UPDATE == 0 {
                    Some(self.snapshot())
                } else {
                    None
                }
            }
        }
    }

    /// Unconditional final update at end of stream.
    pub fn finish(&self) -> ProgressUpdate {
        self.snapshot()
    }

    fn percent(&self) -> Option<f64> {
        self.total.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.transferred as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
            }
        })
    }

    fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            total_bytes: self.total,
            transferred: self.transferred,
            percent: self.percent(),
            destination: self.destination.clone(),
        }
    }
}

/// Consumer-side throttle: limits derived reporting to a floor interval and
/// estimates the transfer rate between the two most recent acted-on updates.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    last_report: Option<(Instant, u64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateReport {
    pub percent: u8,
    /// Mbit/s since the previous acted-on update; zero on the first.
    pub rate_mbit: f64,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: None,
        }
    }

    pub fn observe(&mut self, update: &ProgressUpdate) -> Option<RateReport> {
        self.observe_at(Instant::now(), update)
    }

    /// Explicit-clock variant used by tests.
    pub fn observe_at(&mut self, now: Instant, update: &ProgressUpdate) -> Option<RateReport> {
        let percent = update.percent.unwrap_or(0.0).clamp(0.0, 100.0) as u8;
        match self.last_report {
            None => {
                // First update establishes the baseline.
                self.last_report = Some((now, update.transferred));
                Some(RateReport {
                    percent,
                    rate_mbit: 0.0,
                })
            }
            Some((at, bytes)) => {
                let elapsed = now.duration_since(at);
                if elapsed < self.interval {
                    return None;
                }
                let delta = update.transferred.saturating_sub(bytes);
                let rate_mbit = if delta > 0 && elapsed.as_secs_f64() > 0.0 {
                    delta as f64 / elapsed.as_secs_f64() / MBIT
                } else {
                    0.0
                };
                self.last_report = Some((now, update.transferred));
                Some(RateReport { percent, rate_mbit })
            }
        }
    }
}

/// Seam the install state machine downloads through. Tests substitute a
/// local stub for the HTTP client.
#[allow(async_fn_in_trait)]
pub trait PackageFetcher {
    async fn fetch_package(
        &self,
        url: &str,
        destination: &Path,
        on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<(), DownloadError>;
}

/// HTTP downloader streaming response bodies to disk.
#[derive(Debug, Clone)]
pub struct Downloader {
    http: reqwest::Client,
}

impl Downloader {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(TRANSFER_TIMEOUT)
            .build()
            .context("Failed to build download client")?;
        Ok(Self { http })
    }
}

impl PackageFetcher for Downloader {
    async fn fetch_package(
        &self,
        url: &str,
        destination: &Path,
        on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<(), DownloadError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status()));
        }

        let total = response.content_length();
        let mut tracker = ProgressTracker::new(total, destination);
        let io_err = |source: std::io::Error| DownloadError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(destination).await.map_err(io_err)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(io_err)?;
            if let Some(update) = tracker.record(chunk.len() as u64) {
                on_progress(update);
            }
        }

        // Durable on disk before the caller persists the installed manifest.
        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;

        on_progress(tracker.finish());
        debug!(url, bytes = tracker.transferred(), "download complete");
        Ok(())
    }
}
