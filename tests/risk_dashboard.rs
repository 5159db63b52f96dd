//! Risk dashboard generation, aggregation and serving, end to end.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::MockEscrowPlatform;
use escrow_insight::dashboard::{build_router, DashboardState};
use escrow_insight::engine::InsightRefresher;
use escrow_insight::risk::{partners_by_risk_level, SnapshotInsightProvider};
use escrow_insight::types::{EscrowError, PartnerRisk, RiskCategory, RiskLevel, TrendDirection};
use escrow_insight::view::{ListView, PartnerFilter, Selection};

fn refresher(platform: Arc<MockEscrowPlatform>) -> InsightRefresher {
    InsightRefresher::new(platform)
}

#[tokio::test]
async fn test_generated_dashboard_is_normalised() {
    let platform = Arc::new(MockEscrowPlatform::new());
    let contracts = common::default_contracts();
    let dashboard = refresher(platform).refresh(&contracts).await.unwrap();

    // 0.4 * 75 + 0.6 * 60
    assert!((dashboard.overall_risk_score - 66.0).abs() < 1e-9);
    assert_eq!(dashboard.risk_level, RiskLevel::High);
    assert_eq!(dashboard.insights[0].affected_contracts.len(), 3);

    let levels: Vec<RiskLevel> = dashboard.partner_risks.iter().map(|p| p.risk_level).collect();
    assert_eq!(
        levels,
        vec![
            RiskLevel::Critical,
            RiskLevel::High,
            RiskLevel::High,
            RiskLevel::Low,
            RiskLevel::Medium
        ]
    );

    let direction = |category: RiskCategory| {
        dashboard
            .trends
            .iter()
            .find(|t| t.category == category)
            .map(|t| t.direction)
    };
    assert_eq!(direction(RiskCategory::Currency), Some(TrendDirection::Increasing));
    assert_eq!(direction(RiskCategory::Delivery), Some(TrendDirection::Stable));
    assert_eq!(direction(RiskCategory::Fraud), Some(TrendDirection::Decreasing));
    assert!(dashboard.trends[0].history.windows(2).all(|w| w[0].date <= w[1].date));
}

#[tokio::test]
async fn test_summary_figures() {
    let platform = Arc::new(MockEscrowPlatform::new());
    let dashboard = refresher(platform).refresh(&[]).await.unwrap();
    let summary = dashboard.summary();

    assert_eq!(summary.partners.partner_count, 5);
    assert_eq!(summary.partners.high_risk_count, 3);
    assert_eq!(summary.partners.distribution.count(RiskLevel::High), 2);
    assert!((summary.partners.distribution.percentage(RiskLevel::High) - 40.0).abs() < 1e-9);
    assert!((summary.partners.avg_on_time_rate - 0.8).abs() < 1e-9);

    assert_eq!(summary.countries.restricted_count, 1);
    assert_eq!(summary.countries.total_trading_partners, 6);
    assert_eq!(summary.countries.high_risk_count, 1);

    assert_eq!(summary.top_predictions, vec!["PR-2", "PR-1", "PR-3"]);
    assert_eq!(summary.categories.len(), RiskCategory::ALL.len());

    let grouped = partners_by_risk_level(&dashboard.partner_risks);
    assert_eq!(grouped[&RiskLevel::High].len(), 2);
    assert_eq!(grouped[&RiskLevel::Critical][0].partner_name, "Highland Coffee");
}

#[tokio::test]
async fn test_high_risk_partner_view() {
    let platform = Arc::new(MockEscrowPlatform::new());
    let dashboard = refresher(platform).refresh(&[]).await.unwrap();

    let mut view = ListView::<PartnerRisk>::new().with_filter(PartnerFilter {
        level: Selection::Only(RiskLevel::High),
    });
    let high = view.apply(&dashboard.partner_risks);
    assert_eq!(high.matched(), 2);
    assert_eq!(high.excluded(), 3);

    view.reset();
    let all = view.apply(&dashboard.partner_risks);
    assert_eq!(all.matched(), 5);
    assert_eq!(all.items[0].risk_level, RiskLevel::Critical);
}

#[tokio::test]
async fn test_failed_refresh_keeps_last_dashboard() {
    let platform = Arc::new(MockEscrowPlatform::new());
    let refresher = refresher(platform.clone());
    let first = refresher.refresh(&[]).await.unwrap();

    platform.set_error("insight engine down");
    let err = refresher.refresh(&[]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EscrowError>(),
        Some(EscrowError::Api { status: 503, .. })
    ));
    assert_eq!(refresher.current().await, Some(first));
    assert!(!refresher.is_busy());
}

#[tokio::test]
async fn test_snapshot_provider_round_trip() {
    let platform = Arc::new(MockEscrowPlatform::new());
    let generated = refresher(platform).refresh(&[]).await.unwrap();

    let mut path = std::env::temp_dir();
    path.push(format!("escrow_risk_{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, serde_json::to_string_pretty(&generated).unwrap()).unwrap();

    let snapshot = InsightRefresher::new(Arc::new(SnapshotInsightProvider::new(&path)));
    let reloaded = snapshot.refresh(&[]).await.unwrap();
    assert_eq!(reloaded.risk_level, generated.risk_level);
    assert_eq!(reloaded.partner_risks.len(), generated.partner_risks.len());

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_dashboard_server_end_to_end() {
    let platform = Arc::new(MockEscrowPlatform::new());
    let state = Arc::new(DashboardState::new(
        common::default_contracts(),
        Arc::new(refresher(platform)),
    ));

    let resp = build_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/risk/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = build_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/risk/partners?level=high&sort=creditScore&dir=asc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["total"], 5);
    assert_eq!(json["matched"], 2);
    assert_eq!(json["items"][0]["partnerName"], "Mekong Traders");
    assert_eq!(json["items"][1]["partnerName"], "Sidamo Growers");
}
