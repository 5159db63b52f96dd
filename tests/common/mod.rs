//! Mock escrow platform for integration testing.
//!
//! Provides a deterministic `EscrowApi` and `RiskInsightProvider`
//! implementation that holds contracts, documents and KYC submissions
//! in memory with no external dependencies.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use escrow_insight::api::EscrowApi;
use escrow_insight::contract::apply_patch;
use escrow_insight::intake::{Credentials, KycSubmission, NewContract, Registration};
use escrow_insight::risk::RiskInsightProvider;
use escrow_insight::types::*;

pub const IMPORTER: &str = "0xa11ce";
pub const EXPORTER: &str = "0xb0b";
pub const MEDIATOR: &str = "0xc4a1";
pub const STRANGER: &str = "0xdead";

/// A mock escrow platform for deterministic testing.
///
/// All state is in-memory and controllable from test code.
pub struct MockEscrowPlatform {
    contracts: Arc<Mutex<Vec<EscrowContract>>>,
    documents: Arc<Mutex<Vec<ContractDocument>>>,
    kyc: Arc<Mutex<Vec<KycSubmission>>>,
    patches: Arc<Mutex<Vec<(String, ContractPatch)>>>,
    session: Option<Session>,
    dashboard: RiskDashboard,
    /// If set, every call fails with a 503 carrying this message.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockEscrowPlatform {
    pub fn new() -> Self {
        Self {
            contracts: Arc::new(Mutex::new(default_contracts())),
            documents: Arc::new(Mutex::new(Vec::new())),
            kyc: Arc::new(Mutex::new(Vec::new())),
            patches: Arc::new(Mutex::new(Vec::new())),
            session: Some(Session {
                user: User {
                    id: "u-1".to_string(),
                    name: "Alice Importer".to_string(),
                    email: "alice@harbor.example".to_string(),
                    wallet_address: Some(IMPORTER.to_string()),
                },
                expires: Some(Utc::now() + Duration::hours(8)),
            }),
            dashboard: default_dashboard(),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Every PATCH body received, in order.
    pub fn patches(&self) -> Vec<(String, ContractPatch)> {
        self.patches.lock().unwrap().clone()
    }

    pub fn kyc_submissions(&self) -> Vec<KycSubmission> {
        self.kyc.lock().unwrap().clone()
    }

    pub fn stored(&self, id: &str) -> Option<EscrowContract> {
        self.contracts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    fn check_error(&self) -> Result<()> {
        match self.force_error.lock().unwrap().as_ref() {
            Some(msg) => Err(EscrowError::Api {
                status: 503,
                message: msg.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EscrowApi for MockEscrowPlatform {
    async fn current_session(&self) -> Result<Option<Session>> {
        self.check_error()?;
        Ok(self.session.clone())
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.check_error()?;
        credentials.validate()?;
        self.session.clone().ok_or_else(|| {
            EscrowError::Api {
                status: 401,
                message: "Invalid credentials".to_string(),
            }
            .into()
        })
    }

    async fn register(&self, registration: &Registration) -> Result<Session> {
        self.check_error()?;
        registration.validate()?;
        Ok(Session {
            user: User {
                id: Uuid::new_v4().to_string(),
                name: registration.name.clone(),
                email: registration.email.clone(),
                wallet_address: None,
            },
            expires: None,
        })
    }

    async fn logout(&self) -> Result<()> {
        self.check_error()
    }

    async fn list_contracts(&self) -> Result<Vec<EscrowContract>> {
        self.check_error()?;
        Ok(self.contracts.lock().unwrap().clone())
    }

    async fn get_contract(&self, id: &str) -> Result<EscrowContract> {
        self.check_error()?;
        self.stored(id)
            .ok_or_else(|| EscrowError::NotFound(format!("contract {id}")).into())
    }

    async fn create_contract(&self, form: &NewContract) -> Result<EscrowContract> {
        self.check_error()?;
        form.validate()?;
        let now = Utc::now();
        let mut milestones = BTreeMap::new();
        milestones.insert(ContractStatus::Draft.milestone_key(), now);

        let contract = EscrowContract {
            id: format!("C-{}", Uuid::new_v4().simple()),
            title: form.title.clone(),
            description: form.description.clone(),
            status: ContractStatus::Draft,
            parties: form.parties.clone(),
            trade_terms: form.trade_terms.clone(),
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
            milestones,
        };
        self.contracts.lock().unwrap().push(contract.clone());
        Ok(contract)
    }

    async fn update_contract(&self, id: &str, patch: &ContractPatch) -> Result<EscrowContract> {
        self.check_error()?;
        let mut contracts = self.contracts.lock().unwrap();
        let stored = contracts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| EscrowError::NotFound(format!("contract {id}")))?;

        if let Some(next) = patch.status {
            if !stored.status.can_transition_to(next) {
                return Err(EscrowError::Api {
                    status: 409,
                    message: format!("cannot move {} to {next}", stored.status),
                }
                .into());
            }
        }

        apply_patch(stored, patch, Utc::now());
        self.patches
            .lock()
            .unwrap()
            .push((id.to_string(), patch.clone()));
        Ok(stored.clone())
    }

    async fn wallet_balance(&self, _user_id: &str) -> Result<WalletBalance> {
        self.check_error()?;
        Ok(WalletBalance {
            balance: dec!(250000.00),
            currency: "USDC".to_string(),
        })
    }

    async fn list_documents(&self, contract_id: &str) -> Result<Vec<ContractDocument>> {
        self.check_error()?;
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.contract_id == contract_id)
            .cloned()
            .collect())
    }

    async fn upload_document(
        &self,
        contract_id: &str,
        upload: &DocumentUpload,
    ) -> Result<ContractDocument> {
        self.check_error()?;
        let doc = ContractDocument {
            id: Uuid::new_v4().to_string(),
            contract_id: contract_id.to_string(),
            name: upload.name.clone(),
            doc_type: upload.doc_type,
            status: DocumentStatus::Pending,
            uploaded_by: EXPORTER.to_string(),
            uploaded_at: Utc::now(),
            size: upload.bytes.len() as u64,
        };
        self.documents.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn submit_kyc(&self, submission: &KycSubmission) -> Result<()> {
        self.check_error()?;
        self.kyc.lock().unwrap().push(submission.clone());
        Ok(())
    }
}

#[async_trait]
impl RiskInsightProvider for MockEscrowPlatform {
    async fn generate(&self, contracts: &[EscrowContract]) -> Result<RiskDashboard> {
        self.check_error()?;
        let mut dashboard = self.dashboard.clone();
        let ids: Vec<String> = contracts.iter().map(|c| c.id.clone()).collect();
        for insight in &mut dashboard.insights {
            insight.affected_contracts = ids.clone();
        }
        Ok(dashboard)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn party(address: &str, role: PartyRole, name: &str, country: &str) -> Party {
    Party {
        address: address.to_string(),
        role,
        name: name.to_string(),
        country: country.to_string(),
    }
}

pub fn default_parties() -> Vec<Party> {
    vec![
        party(IMPORTER, PartyRole::Importer, "Harbor Foods", "Canada"),
        party(EXPORTER, PartyRole::Exporter, "Highland Coffee", "Ethiopia"),
        party(MEDIATOR, PartyRole::Mediator, "Geneva Trade Arbitration", "Switzerland"),
    ]
}

pub fn terms(amount: rust_decimal::Decimal) -> TradeTerms {
    TradeTerms {
        incoterm: "FOB".to_string(),
        payment_terms: "100% escrow".to_string(),
        currency: "USDC".to_string(),
        amount,
        delivery_deadline: Utc::now() + Duration::days(60),
        inspection_period: 7,
        dispute_resolution_mechanism: "Mediator decision".to_string(),
    }
}

fn contract(id: &str, title: &str, status: ContractStatus, days_ago: i64) -> EscrowContract {
    let base = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
    EscrowContract {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{title} under escrow"),
        status,
        parties: default_parties(),
        trade_terms: terms(dec!(40000)),
        documents: Vec::new(),
        created_at: base - Duration::days(days_ago + 10),
        updated_at: base - Duration::days(days_ago),
        milestones: BTreeMap::new(),
    }
}

pub fn default_contracts() -> Vec<EscrowContract> {
    vec![
        contract("C-100", "Robusta coffee", ContractStatus::AwaitingFunds, 3),
        contract("C-200", "Cotton bales", ContractStatus::Funded, 1),
        contract("C-300", "Cocoa butter", ContractStatus::Draft, 7),
    ]
}

fn factor(id: &str, category: RiskCategory, value: f64) -> RiskFactor {
    RiskFactor {
        id: id.to_string(),
        category,
        description: format!("{category} exposure"),
        value,
        level: RiskLevel::Low,
        trend: TrendDirection::Stable,
        impact_description: String::new(),
        mitigation_suggestions: vec!["Hedge".to_string()],
    }
}

fn partner(id: &str, name: &str, country: &str, credit: f64) -> PartnerRisk {
    PartnerRisk {
        partner_id: id.to_string(),
        partner_name: name.to_string(),
        country: country.to_string(),
        credit_score: credit,
        risk_level: RiskLevel::Low,
        payment_history: PaymentHistory {
            on_time_payments: 8,
            late_payments: 2,
            missed_payments: 0,
        },
        relationship_years: 3.0,
        total_trade_volume: dec!(100000),
        avg_transaction_size: dec!(12500),
        recent_flags: Vec::new(),
    }
}

fn country(name: &str, iso: &str, score: f64, restrictions: &[&str]) -> CountryRisk {
    CountryRisk {
        country: name.to_string(),
        iso_code: iso.to_string(),
        overall_risk_score: score,
        risk_level: RiskLevel::Low,
        political_score: score,
        economic_score: score,
        regulatory_score: score,
        trade_restrictions: restrictions.iter().map(|s| s.to_string()).collect(),
        trading_partner_count: 2,
    }
}

fn series(values: &[f64]) -> Vec<TrendPoint> {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    // Stored newest first to check that normalising sorts by date.
    values
        .iter()
        .enumerate()
        .rev()
        .map(|(i, v)| TrendPoint {
            date: start + Duration::days(30 * i as i64),
            value: *v,
        })
        .collect()
}

fn prediction(id: &str, probability: f64, impact: RiskLevel) -> RiskPrediction {
    RiskPrediction {
        id: id.to_string(),
        title: format!("Scenario {id}"),
        probability,
        impact,
        timeframe: "90 days".to_string(),
        mitigation_options: Vec::new(),
    }
}

/// Raw provider output: every level is left at LOW and every trend at
/// stable so tests can see normalisation at work.
///
/// Insights average 75 and factors average 60, so the overall score is 66.
pub fn default_dashboard() -> RiskDashboard {
    let insight = |id: &str, category: RiskCategory| RiskInsight {
        id: id.to_string(),
        title: format!("{category} pressure"),
        description: String::new(),
        category,
        risk_level: RiskLevel::High,
        recommendations: vec!["Review exposure".to_string()],
        affected_contracts: Vec::new(),
    };

    RiskDashboard {
        last_updated: Utc::now(),
        overall_risk_score: 0.0,
        risk_level: RiskLevel::Low,
        insights: vec![
            insight("I-1", RiskCategory::Currency),
            insight("I-2", RiskCategory::Delivery),
        ],
        risk_factors: vec![
            factor("F-1", RiskCategory::Currency, 50.0),
            factor("F-2", RiskCategory::Delivery, 70.0),
        ],
        country_risks: vec![
            country("Ethiopia", "ET", 82.0, &["Export licence required"]),
            country("Vietnam", "VN", 30.0, &[]),
            country("Canada", "CA", 10.0, &[]),
        ],
        partner_risks: vec![
            partner("P-1", "Highland Coffee", "Ethiopia", 20.0),
            partner("P-2", "Mekong Traders", "Vietnam", 35.0),
            partner("P-3", "Sidamo Growers", "Ethiopia", 48.0),
            partner("P-4", "Maple Imports", "Canada", 80.0),
            partner("P-5", "Saigon Spice", "Vietnam", 60.0),
        ],
        trends: vec![
            RiskTrend {
                category: RiskCategory::Currency,
                history: series(&[40.0, 44.0, 50.0]),
                forecast: Some(Forecast {
                    value: 55.0,
                    confidence: 0.7,
                }),
                direction: TrendDirection::Stable,
            },
            RiskTrend {
                category: RiskCategory::Delivery,
                history: series(&[50.0, 49.0]),
                forecast: None,
                direction: TrendDirection::Increasing,
            },
            RiskTrend {
                category: RiskCategory::Fraud,
                history: series(&[20.0, 10.0]),
                forecast: None,
                direction: TrendDirection::Stable,
            },
        ],
        predictions: vec![
            prediction("PR-1", 0.5, RiskLevel::High),
            prediction("PR-2", 0.9, RiskLevel::Medium),
            prediction("PR-3", 0.2, RiskLevel::Critical),
            prediction("PR-4", 0.1, RiskLevel::Low),
        ],
    }
}
