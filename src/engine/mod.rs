//! Orchestration over the pure contract and risk modules.
//!
//! `ContractWorkflow` drives lifecycle writes through the platform API;
//! `InsightRefresher` owns the current risk dashboard and its busy flag.

pub mod refresher;
pub mod workflow;

pub use refresher::InsightRefresher;
pub use workflow::ContractWorkflow;
