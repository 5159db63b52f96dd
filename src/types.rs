//! Shared types for the escrow dashboard core.
//!
//! These types form the data model used across all modules. They mirror
//! the JSON shapes served by the platform API (camelCase fields) so that
//! the client, the risk engine and the view pipeline can share them
//! without conversion layers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Contract lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of an escrow contract.
///
/// Declaration order is lifecycle order; `Disputed` and `Cancelled` sit at
/// the end as side branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Draft,
    AwaitingFunds,
    Funded,
    GoodsShipped,
    GoodsReceived,
    Completed,
    Disputed,
    Cancelled,
}

impl ContractStatus {
    /// All statuses in lifecycle order.
    pub const ALL: &'static [ContractStatus] = &[
        ContractStatus::Draft,
        ContractStatus::AwaitingFunds,
        ContractStatus::Funded,
        ContractStatus::GoodsShipped,
        ContractStatus::GoodsReceived,
        ContractStatus::Completed,
        ContractStatus::Disputed,
        ContractStatus::Cancelled,
    ];

    /// Wire name, e.g. `AWAITING_FUNDS`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "DRAFT",
            ContractStatus::AwaitingFunds => "AWAITING_FUNDS",
            ContractStatus::Funded => "FUNDED",
            ContractStatus::GoodsShipped => "GOODS_SHIPPED",
            ContractStatus::GoodsReceived => "GOODS_RECEIVED",
            ContractStatus::Completed => "COMPLETED",
            ContractStatus::Disputed => "DISPUTED",
            ContractStatus::Cancelled => "CANCELLED",
        }
    }

    /// Key under which reaching this status is recorded in `milestones`.
    pub fn milestone_key(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a status from its wire name or display label (case-insensitive).
impl std::str::FromStr for ContractStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        ContractStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Unknown contract status: {s}"))
    }
}

/// Role a party plays in a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyRole {
    Importer,
    Exporter,
    Mediator,
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Importer => write!(f, "IMPORTER"),
            PartyRole::Exporter => write!(f, "EXPORTER"),
            PartyRole::Mediator => write!(f, "MEDIATOR"),
        }
    }
}

/// A participant in an escrow contract, identified by wallet address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub address: String,
    pub role: PartyRole,
    pub name: String,
    pub country: String,
}

/// Commercial terms. Incoterm and payment terms are carried, never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeTerms {
    pub incoterm: String,
    pub payment_terms: String,
    pub currency: String,
    pub amount: Decimal,
    pub delivery_deadline: DateTime<Utc>,
    /// Days the importer has to inspect goods after receipt.
    pub inspection_period: u32,
    #[serde(default)]
    pub dispute_resolution_mechanism: String,
}

/// An escrow contract as served by `/api/contracts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowContract {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: ContractStatus,
    pub parties: Vec<Party>,
    pub trade_terms: TradeTerms,
    #[serde(default)]
    pub documents: Vec<ContractDocument>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Lowercased status name → time the contract reached it.
    #[serde(default)]
    pub milestones: BTreeMap<String, DateTime<Utc>>,
}

impl fmt::Display for EscrowContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} {} {}, {} parties)",
            self.status,
            self.title,
            self.trade_terms.amount,
            self.trade_terms.currency,
            self.trade_terms.incoterm,
            self.parties.len(),
        )
    }
}

impl EscrowContract {
    /// The first party registered under `address`, if any.
    pub fn party_for(&self, address: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.address == address)
    }

    /// All parties holding `role`. More than one is possible.
    pub fn parties_with_role(&self, role: PartyRole) -> impl Iterator<Item = &Party> {
        self.parties.iter().filter(move |p| p.role == role)
    }

    /// When the contract reached `status`, if it ever did.
    pub fn milestone(&self, status: ContractStatus) -> Option<DateTime<Utc>> {
        self.milestones.get(&status.milestone_key()).copied()
    }
}

/// Partial update sent as the `PATCH /api/contracts/:id` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContractStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestones: Option<BTreeMap<String, DateTime<Utc>>>,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    CommercialInvoice,
    BillOfLading,
    PackingList,
    CertificateOfOrigin,
    InspectionCertificate,
    InsuranceCertificate,
    Other,
}

impl DocumentType {
    pub const ALL: &'static [DocumentType] = &[
        DocumentType::CommercialInvoice,
        DocumentType::BillOfLading,
        DocumentType::PackingList,
        DocumentType::CertificateOfOrigin,
        DocumentType::InspectionCertificate,
        DocumentType::InsuranceCertificate,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::CommercialInvoice => "COMMERCIAL_INVOICE",
            DocumentType::BillOfLading => "BILL_OF_LADING",
            DocumentType::PackingList => "PACKING_LIST",
            DocumentType::CertificateOfOrigin => "CERTIFICATE_OF_ORIGIN",
            DocumentType::InspectionCertificate => "INSPECTION_CERTIFICATE",
            DocumentType::InsuranceCertificate => "INSURANCE_CERTIFICATE",
            DocumentType::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        DocumentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Unknown document type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Pending,
    Verified,
    Rejected,
}

impl std::str::FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(DocumentStatus::Pending),
            "verified" => Ok(DocumentStatus::Verified),
            "rejected" => Ok(DocumentStatus::Rejected),
            _ => Err(anyhow::anyhow!("Unknown document status: {s}")),
        }
    }
}

/// A trade document attached to a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDocument {
    pub id: String,
    pub contract_id: String,
    pub name: String,
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    #[serde(default)]
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// File payload for `POST /api/contracts/:id/documents`.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub name: String,
    pub doc_type: DocumentType,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Risk enums
// ---------------------------------------------------------------------------

/// Risk bucket derived from a 0-100 score.
///
/// Ordering follows severity, so `Critical > High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// All levels, least severe first.
    pub const ALL: &'static [RiskLevel] = &[
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Bucket a 0-100 score. Boundaries are exclusive: 50 is MEDIUM, 51 is HIGH.
    ///
    /// This is the only place a level is ever derived from a number.
    /// NaN falls through to LOW.
    pub fn from_score(score: f64) -> Self {
        if score > 75.0 {
            RiskLevel::Critical
        } else if score > 50.0 {
            RiskLevel::High
        } else if score > 25.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Sort rank used by list views (CRITICAL=4 … LOW=1).
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Critical => 4,
        }
    }

    /// Score an insight contributes to the overall dashboard score.
    pub fn insight_score(&self) -> f64 {
        match self {
            RiskLevel::Low => 25.0,
            RiskLevel::Medium => 50.0,
            RiskLevel::High => 75.0,
            RiskLevel::Critical => 95.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Badge classes for this level.
    pub fn badge_class(&self) -> &'static str {
        match self {
            RiskLevel::Low => "bg-green-100 text-green-800",
            RiskLevel::Medium => "bg-yellow-100 text-yellow-800",
            RiskLevel::High => "bg-orange-100 text-orange-800",
            RiskLevel::Critical => "bg-red-100 text-red-800",
        }
    }

    /// HIGH or CRITICAL.
    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(anyhow::anyhow!("Unknown risk level: {s}")),
        }
    }
}

/// Dimension of exposure a risk factor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Credit,
    Country,
    Currency,
    Delivery,
    Payment,
    Documentation,
    Regulatory,
    Fraud,
}

impl RiskCategory {
    pub const ALL: &'static [RiskCategory] = &[
        RiskCategory::Credit,
        RiskCategory::Country,
        RiskCategory::Currency,
        RiskCategory::Delivery,
        RiskCategory::Payment,
        RiskCategory::Documentation,
        RiskCategory::Regulatory,
        RiskCategory::Fraud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Credit => "CREDIT",
            RiskCategory::Country => "COUNTRY",
            RiskCategory::Currency => "CURRENCY",
            RiskCategory::Delivery => "DELIVERY",
            RiskCategory::Payment => "PAYMENT",
            RiskCategory::Documentation => "DOCUMENTATION",
            RiskCategory::Regulatory => "REGULATORY",
            RiskCategory::Fraud => "FRAUD",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        RiskCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| anyhow::anyhow!("Unknown risk category: {s}"))
    }
}

/// Direction a risk measure is moving in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Risk entities
// ---------------------------------------------------------------------------

/// One scored dimension of exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub id: String,
    pub category: RiskCategory,
    pub description: String,
    /// Risk magnitude (0-100).
    pub value: f64,
    #[serde(default)]
    pub level: RiskLevel,
    #[serde(default)]
    pub trend: TrendDirection,
    #[serde(default)]
    pub impact_description: String,
    #[serde(default)]
    pub mitigation_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRisk {
    pub country: String,
    pub iso_code: String,
    pub overall_risk_score: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
    pub political_score: f64,
    pub economic_score: f64,
    pub regulatory_score: f64,
    #[serde(default)]
    pub trade_restrictions: Vec<String>,
    #[serde(default)]
    pub trading_partner_count: u32,
}

impl CountryRisk {
    pub fn has_restrictions(&self) -> bool {
        !self.trade_restrictions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistory {
    pub on_time_payments: u32,
    pub late_payments: u32,
    pub missed_payments: u32,
}

impl PaymentHistory {
    /// Widened to `u64` so three large `u32` counts cannot overflow.
    pub fn total(&self) -> u64 {
        self.on_time_payments as u64 + self.late_payments as u64 + self.missed_payments as u64
    }

    /// Share of payments made on time (0.0–1.0), 0 with no history.
    pub fn on_time_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.on_time_payments as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerRisk {
    pub partner_id: String,
    pub partner_name: String,
    pub country: String,
    /// Creditworthiness (0-100, higher is safer).
    pub credit_score: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub payment_history: PaymentHistory,
    #[serde(default)]
    pub relationship_years: f64,
    #[serde(default)]
    pub total_trade_volume: Decimal,
    #[serde(default)]
    pub avg_transaction_size: Decimal,
    #[serde(default)]
    pub recent_flags: Vec<String>,
}

impl PartnerRisk {
    /// Risk magnitude implied by the credit score: `100 - credit_score`.
    pub fn risk_score(&self) -> f64 {
        (100.0 - self.credit_score).clamp(0.0, 100.0)
    }
}

/// A generated observation about the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskInsight {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: RiskCategory,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub affected_contracts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub value: f64,
    /// 0.0–1.0
    pub confidence: f64,
}

/// Historical series for one category plus a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskTrend {
    pub category: RiskCategory,
    pub history: Vec<TrendPoint>,
    #[serde(default)]
    pub forecast: Option<Forecast>,
    #[serde(default)]
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPrediction {
    pub id: String,
    pub title: String,
    /// 0.0–1.0
    pub probability: f64,
    pub impact: RiskLevel,
    pub timeframe: String,
    #[serde(default)]
    pub mitigation_options: Vec<String>,
}

impl RiskPrediction {
    /// probability × impact score, on the same scale as insight scores.
    pub fn expected_severity(&self) -> f64 {
        self.probability.clamp(0.0, 1.0) * self.impact.insight_score()
    }
}

/// Everything the risk intelligence view shows. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskDashboard {
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub overall_risk_score: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub insights: Vec<RiskInsight>,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default)]
    pub country_risks: Vec<CountryRisk>,
    #[serde(default)]
    pub partner_risks: Vec<PartnerRisk>,
    #[serde(default)]
    pub trends: Vec<RiskTrend>,
    #[serde(default)]
    pub predictions: Vec<RiskPrediction>,
}

impl fmt::Display for RiskDashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "overall={:.1} ({}) | {} insights | {} factors | {} countries | {} partners",
            self.overall_risk_score,
            self.risk_level,
            self.insights.len(),
            self.risk_factors.len(),
            self.country_risks.len(),
            self.partner_risks.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Session & wallet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires.map(|e| e <= Utc::now()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub balance: Decimal,
    pub currency: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types.
///
/// Carried inside `anyhow::Error`; callers branch with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
pub enum EscrowError {
    #[error("Validation failed: missing or invalid {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Action '{action}' is not permitted on a {status} contract for this user")]
    NotEligible {
        action: String,
        status: ContractStatus,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ContractStatus,
        to: ContractStatus,
    },

    #[error("Risk insight generation already in progress")]
    RefreshInProgress,

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
