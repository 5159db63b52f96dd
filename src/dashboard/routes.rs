//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! List endpoints take `search`, `sort`, `dir` and their view's filters
//! as query parameters; unknown values are a 400.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::contract::{color_for, eligible_actions, label_for, ContractAction, StatusColor};
use crate::engine::InsightRefresher;
use crate::risk::DashboardSummary;
use crate::types::{
    ContractStatus, CountryRisk, EscrowContract, EscrowError, PartnerRisk, RiskFactor,
};
use crate::view::{
    ContractFilter, CountryFilter, FactorFilter, ListView, Listable, PartnerFilter, Selection,
    SortDirection, SortState,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub contracts: RwLock<Vec<EscrowContract>>,
    pub refresher: Arc<InsightRefresher>,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(contracts: Vec<EscrowContract>, refresher: Arc<InsightRefresher>) -> Self {
        Self {
            contracts: RwLock::new(contracts),
            refresher,
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// JSON error body: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(e: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let status = match err.downcast_ref::<EscrowError>() {
            Some(EscrowError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(EscrowError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(EscrowError::NotEligible { .. }) => StatusCode::FORBIDDEN,
            Some(EscrowError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            Some(EscrowError::RefreshInProgress) => StatusCode::CONFLICT,
            Some(EscrowError::Api { .. }) => StatusCode::BAD_GATEWAY,
            Some(EscrowError::Config(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Query parsing
// ---------------------------------------------------------------------------

/// Query parameters shared by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
}

fn selection<T>(raw: Option<&str>) -> Result<Selection<T>, ApiError>
where
    T: FromStr<Err = anyhow::Error>,
{
    raw.unwrap_or_default().parse().map_err(ApiError::bad_request)
}

/// Build a view from the query string; absent parameters keep the view's defaults.
fn view_from_params<T>(params: &ListParams, filter: T::Filter) -> Result<ListView<T>, ApiError>
where
    T: Listable,
    T::SortKey: FromStr<Err = anyhow::Error>,
{
    let mut view = ListView::<T>::new().with_filter(filter);
    if let Some(search) = &params.search {
        view.search = search.clone();
    }

    let default = T::default_sort();
    let key = match params.sort.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => raw.parse().map_err(ApiError::bad_request)?,
        None => default.key,
    };
    let direction = match params.dir.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => raw.parse().map_err(ApiError::bad_request)?,
        None if key == default.key => default.direction,
        None => SortDirection::Desc,
    };
    view.sort = SortState::new(key, direction);
    Ok(view)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Display label and badge classes the page renders as given.
pub trait Badged {
    fn label(&self) -> String;
    fn badge_class(&self) -> &'static str;
}

impl Badged for EscrowContract {
    fn label(&self) -> String {
        label_for(self.status)
    }

    fn badge_class(&self) -> &'static str {
        color_for(self.status).badge_class()
    }
}

impl Badged for RiskFactor {
    fn label(&self) -> String {
        self.level.to_string()
    }

    fn badge_class(&self) -> &'static str {
        self.level.badge_class()
    }
}

impl Badged for PartnerRisk {
    fn label(&self) -> String {
        self.risk_level.to_string()
    }

    fn badge_class(&self) -> &'static str {
        self.risk_level.badge_class()
    }
}

impl Badged for CountryRisk {
    fn label(&self) -> String {
        self.risk_level.to_string()
    }

    fn badge_class(&self) -> &'static str {
        self.risk_level.badge_class()
    }
}

/// One list item with its badge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row<T> {
    #[serde(flatten)]
    pub item: T,
    pub label: String,
    pub badge_class: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<Row<T>>,
    pub total: usize,
    pub matched: usize,
    pub excluded: usize,
}

fn run_view<T: Listable + Badged + Clone>(view: &ListView<T>, items: &[T]) -> ListResponse<T> {
    let result = view.apply(items);
    ListResponse {
        matched: result.matched(),
        excluded: result.excluded(),
        total: result.total,
        items: result
            .items
            .into_iter()
            .map(|item| Row {
                label: item.label(),
                badge_class: item.badge_class(),
                item: item.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: i64,
    pub refreshing: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionsResponse {
    pub contract_id: String,
    pub status: ContractStatus,
    pub label: String,
    pub color: StatusColor,
    pub badge_class: &'static str,
    pub actions: Vec<ContractAction>,
}

#[derive(Debug, Deserialize)]
pub struct ActionsParams {
    pub user: Option<String>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        refreshing: state.refresher.is_busy(),
    })
}

/// GET /api/risk/summary
pub async fn get_risk_summary(
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let dashboard = state
        .refresher
        .current()
        .await
        .ok_or_else(|| ApiError::not_found("Risk dashboard has not been generated yet"))?;
    Ok(Json(dashboard.summary()))
}

/// GET /api/risk/factors?search=&category=&level=&sort=&dir=
pub async fn get_risk_factors(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<RiskFactor>>, ApiError> {
    let filter = FactorFilter {
        category: selection(params.category.as_deref())?,
        level: selection(params.level.as_deref())?,
    };
    let view = view_from_params::<RiskFactor>(&params, filter)?;
    let factors = state
        .refresher
        .current()
        .await
        .map(|d| d.risk_factors)
        .unwrap_or_default();
    Ok(Json(run_view(&view, &factors)))
}

/// GET /api/risk/partners?search=&level=&sort=&dir=
pub async fn get_partner_risks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<PartnerRisk>>, ApiError> {
    let filter = PartnerFilter {
        level: selection(params.level.as_deref())?,
    };
    let view = view_from_params::<PartnerRisk>(&params, filter)?;
    let partners = state
        .refresher
        .current()
        .await
        .map(|d| d.partner_risks)
        .unwrap_or_default();
    Ok(Json(run_view(&view, &partners)))
}

/// GET /api/risk/countries?search=&level=&sort=&dir=
pub async fn get_country_risks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<CountryRisk>>, ApiError> {
    let filter = CountryFilter {
        level: selection(params.level.as_deref())?,
    };
    let view = view_from_params::<CountryRisk>(&params, filter)?;
    let countries = state
        .refresher
        .current()
        .await
        .map(|d| d.country_risks)
        .unwrap_or_default();
    Ok(Json(run_view(&view, &countries)))
}

/// GET /api/contracts?search=&status=&sort=&dir=
pub async fn get_contracts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<EscrowContract>>, ApiError> {
    let filter = ContractFilter {
        status: selection(params.status.as_deref())?,
    };
    let view = view_from_params::<EscrowContract>(&params, filter)?;
    let contracts = state.contracts.read().await;
    Ok(Json(run_view(&view, &contracts)))
}

/// GET /api/contracts/:id/actions?user=<wallet address>
pub async fn get_contract_actions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActionsParams>,
) -> Result<Json<ActionsResponse>, ApiError> {
    let user = params
        .user
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter 'user' is required"))?;

    let contracts = state.contracts.read().await;
    let contract = contracts
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| ApiError::not_found(format!("Contract {id} not found")))?;

    let color = color_for(contract.status);
    Ok(Json(ActionsResponse {
        contract_id: contract.id.clone(),
        status: contract.status,
        label: label_for(contract.status),
        color,
        badge_class: color.badge_class(),
        actions: eligible_actions(contract, user.trim()),
    }))
}

/// POST /api/risk/refresh
pub async fn post_risk_refresh(
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let contracts = state.contracts.read().await.clone();
    match state.refresher.refresh(&contracts).await {
        Ok(dashboard) => {
            info!(contracts = contracts.len(), "Risk dashboard refreshed via API");
            Ok(Json(dashboard.summary()))
        }
        Err(e) => {
            warn!(error = %e, "Risk refresh via API failed");
            Err(e.into())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
