//! Install orchestration: the state machine driving download, extraction,
//! and installer execution for one product.

mod orchestrator;

pub use orchestrator::InstallOrchestrator;
