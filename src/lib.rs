//! ESCROW INSIGHT: contract state and risk aggregation core for a
//! trade-escrow dashboard.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod config;
pub mod contract;
pub mod dashboard;
pub mod engine;
pub mod intake;
pub mod risk;
pub mod types;
pub mod view;
