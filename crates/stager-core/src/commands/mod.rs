//! High-level commands for stager operations.
//!
//! The thin public API frontends call: "get status" and "install". Both
//! return a [`crate::types::ProductRecord`] for display or machine output.

pub mod install;
pub mod status;

pub use install::InstallCommand;
pub use status::StatusCommand;
