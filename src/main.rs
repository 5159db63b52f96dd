//! ESCROW INSIGHT: trade-escrow contract and risk dashboard
//!
//! Entry point. Loads configuration, initialises structured logging,
//! fetches the session and contract list, generates the first risk
//! dashboard and serves it until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use escrow_insight::api::{EscrowApi, HttpEscrowClient};
use escrow_insight::config::{self, ProviderKind};
use escrow_insight::contract::eligible_actions;
use escrow_insight::dashboard::{self, DashboardState};
use escrow_insight::engine::{ContractWorkflow, InsightRefresher};
use escrow_insight::risk::{RiskInsightProvider, SnapshotInsightProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;
    init_logging();

    info!(
        name = %cfg.app.name,
        api = %cfg.api.base_url,
        provider = ?cfg.risk.provider,
        "Escrow Insight starting up"
    );

    // -- Platform client --------------------------------------------------

    let client = Arc::new(HttpEscrowClient::new(
        &cfg.api.base_url,
        cfg.api_token()?,
        cfg.timeout(),
    )?);
    let api: Arc<dyn EscrowApi> = client.clone();
    let workflow = ContractWorkflow::new(api.clone());

    // -- Initial fetch ----------------------------------------------------

    let mut contracts = Vec::new();
    let (session, count) =
        futures::try_join!(api.current_session(), workflow.reload(&mut contracts))
            .context("Initial fetch from escrow API failed")?;
    info!(count, "Contracts loaded");

    let user_address = session
        .as_ref()
        .and_then(|s| s.user.wallet_address.clone())
        .or_else(|| cfg.app.user_address.clone());

    match &session {
        Some(s) if s.is_expired() => warn!(user_id = %s.user.id, "Session has expired"),
        Some(s) => {
            info!(user_id = %s.user.id, name = %s.user.name, "Signed in");
            match api.wallet_balance(&s.user.id).await {
                Ok(w) => info!(balance = %w.balance, currency = %w.currency, "Wallet balance"),
                Err(e) => warn!(error = %e, "Could not fetch wallet balance"),
            }
        }
        None => warn!("No active session; actions are evaluated for the configured address"),
    }

    if let Some(address) = &user_address {
        for contract in &contracts {
            let actions = eligible_actions(contract, address);
            if !actions.is_empty() {
                let names: Vec<&str> = actions.iter().map(|a| a.as_str()).collect();
                info!(contract_id = %contract.id, status = %contract.status, actions = ?names, "Actions available");
            }
        }
    }

    // -- Risk dashboard ---------------------------------------------------

    let provider: Arc<dyn RiskInsightProvider> = match cfg.risk.provider {
        ProviderKind::Remote => client.clone() as Arc<dyn RiskInsightProvider>,
        ProviderKind::Snapshot => {
            let snapshot = SnapshotInsightProvider::new(cfg.risk.snapshot_path.clone().unwrap_or_default());
            info!(path = %snapshot.path().display(), "Using risk snapshot provider");
            Arc::new(snapshot)
        }
    };
    let refresher = Arc::new(InsightRefresher::new(provider));

    if cfg.risk.refresh_on_start {
        match refresher.refresh(&contracts).await {
            Ok(generated) => {
                let summary = generated.summary();
                info!(
                    overall = format!("{:.1}", summary.overall_risk_score),
                    level = %summary.risk_level,
                    insights = summary.insight_count,
                    high_risk_partners = summary.partners.high_risk_count,
                    restricted_countries = summary.countries.restricted_count,
                    "Risk dashboard ready"
                );
            }
            Err(e) => warn!(error = format!("{e:#}"), "Initial risk refresh failed"),
        }
    }

    // -- Serve ------------------------------------------------------------

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received.");
    };

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(contracts, refresher));
        dashboard::serve(state, cfg.dashboard.port, shutdown).await?;
    } else {
        info!("Dashboard disabled. Press Ctrl+C to stop.");
        shutdown.await;
    }

    info!("Escrow Insight shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("escrow_insight=info"));

    let json_logging = std::env::var("ESCROW_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
