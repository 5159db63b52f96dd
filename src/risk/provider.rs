//! Risk insight providers.
//!
//! The risk view never generates its own analytics; it asks a
//! `RiskInsightProvider` for a complete `RiskDashboard` and normalises
//! whatever comes back. Implementations:
//! - `HttpEscrowClient` (in `api::http`): remote generation endpoint
//! - `SnapshotInsightProvider`: a dashboard saved as JSON on disk

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::types::{EscrowContract, RiskDashboard};

/// Source of generated risk dashboards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RiskInsightProvider: Send + Sync {
    /// Produce a full dashboard for the given contracts.
    async fn generate(&self, contracts: &[EscrowContract]) -> Result<RiskDashboard>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Serves a dashboard previously saved as JSON.
///
/// Useful offline and in demos; the file is re-read on every call so an
/// edited snapshot shows up on the next refresh.
pub struct SnapshotInsightProvider {
    path: PathBuf,
}

impl SnapshotInsightProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl RiskInsightProvider for SnapshotInsightProvider {
    async fn generate(&self, contracts: &[EscrowContract]) -> Result<RiskDashboard> {
        let path = self.path.display().to_string();
        debug!(path = %path, contracts = contracts.len(), "Reading risk snapshot");

        let json = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read risk snapshot {path}"))?;
        let dashboard: RiskDashboard = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse risk snapshot {path}"))?;

        info!(
            path = %path,
            factors = dashboard.risk_factors.len(),
            partners = dashboard.partner_risks.len(),
            "Risk snapshot loaded"
        );
        Ok(dashboard)
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
