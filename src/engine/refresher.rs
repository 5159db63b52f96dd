//! Risk dashboard refresher.
//!
//! Regeneration is one-shot and guarded by a busy flag: a request that
//! arrives while one is pending is refused immediately, never queued. A
//! completed refresh replaces the held dashboard wholesale; a failed one
//! leaves it untouched.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::risk::RiskInsightProvider;
use crate::types::{EscrowContract, EscrowError, RiskDashboard};

pub struct InsightRefresher {
    provider: Arc<dyn RiskInsightProvider>,
    busy: AtomicBool,
    current: RwLock<Option<RiskDashboard>>,
}

/// Clears the busy flag when the refresh ends, including on error or
/// cancellation.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl InsightRefresher {
    pub fn new(provider: Arc<dyn RiskInsightProvider>) -> Self {
        Self {
            provider,
            busy: AtomicBool::new(false),
            current: RwLock::new(None),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Latest normalised dashboard, if a refresh has ever succeeded.
    pub async fn current(&self) -> Option<RiskDashboard> {
        self.current.read().await.clone()
    }

    /// Generate, normalise and store a new dashboard for `contracts`.
    pub async fn refresh(&self, contracts: &[EscrowContract]) -> Result<RiskDashboard> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Risk refresh requested while one is already running");
            return Err(EscrowError::RefreshInProgress.into());
        }
        let _guard = BusyGuard(&self.busy);

        let started = Instant::now();
        let provider = self.provider.name();
        let mut dashboard = self
            .provider
            .generate(contracts)
            .await
            .with_context(|| format!("Risk insight generation via {provider} failed"))?;
        dashboard.normalize();

        *self.current.write().await = Some(dashboard.clone());

        info!(
            provider,
            contracts = contracts.len(),
            overall = format!("{:.1}", dashboard.overall_risk_score),
            level = %dashboard.risk_level,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Risk dashboard refreshed"
        );
        Ok(dashboard)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
