//! Structured progress reporting sink.
//!
//! The core emits display-agnostic progress updates; frontends decide how to
//! render them. A sink implementation must be cheap, it is called from the
//! download hot path.

/// One structured progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub activity_id: u32,
    pub activity: String,
    pub status: String,
    /// Percent complete, 0-100.
    pub percent: u8,
}

/// Receives progress updates from the install pipeline.
pub trait ProgressSink {
    fn progress(&self, report: &ProgressReport);
}

/// Discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&self, _report: &ProgressReport) {}
}
