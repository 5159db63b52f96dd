//! Intake forms: new contracts, KYC submissions, login and registration.
//!
//! Each form validates itself before anything is sent. A failed
//! validation lists every offending field at once so the caller can mark
//! them all, and no request is made.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::types::{EscrowError, Party, PartyRole, TradeTerms};

/// Collect field names whose check failed into a validation error.
fn finish(missing: Vec<&str>) -> Result<(), EscrowError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EscrowError::Validation(
            missing.into_iter().map(String::from).collect(),
        ))
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn looks_like_email(s: &str) -> bool {
    let s = s.trim();
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Body of `POST /api/contracts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContract {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub parties: Vec<Party>,
    pub trade_terms: TradeTerms,
}

impl NewContract {
    pub fn validate(&self) -> Result<(), EscrowError> {
        let mut missing = Vec::new();
        let terms = &self.trade_terms;

        if blank(&self.title) {
            missing.push("title");
        }
        if !self.parties.iter().any(|p| p.role == PartyRole::Importer) {
            missing.push("importer");
        }
        if !self.parties.iter().any(|p| p.role == PartyRole::Exporter) {
            missing.push("exporter");
        }
        if self.parties.iter().any(|p| blank(&p.address)) {
            missing.push("parties.address");
        }
        if blank(&terms.incoterm) {
            missing.push("tradeTerms.incoterm");
        }
        if blank(&terms.payment_terms) {
            missing.push("tradeTerms.paymentTerms");
        }
        if blank(&terms.currency) {
            missing.push("tradeTerms.currency");
        }
        if terms.amount <= Decimal::ZERO {
            missing.push("tradeTerms.amount");
        }

        finish(missing)
    }
}

// ---------------------------------------------------------------------------
// KYC
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessType {
    SoleProprietor,
    Partnership,
    Corporation,
    Cooperative,
}

/// Body of `POST /api/kyc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSubmission {
    pub legal_name: String,
    pub registration_number: String,
    pub country: String,
    pub contact_email: String,
    pub business_type: BusinessType,
    #[serde(default)]
    pub beneficial_owners: Vec<String>,
}

impl KycSubmission {
    pub fn validate(&self) -> Result<(), EscrowError> {
        let mut missing = Vec::new();

        if blank(&self.legal_name) {
            missing.push("legalName");
        }
        if blank(&self.registration_number) {
            missing.push("registrationNumber");
        }
        if blank(&self.country) {
            missing.push("country");
        }
        if !looks_like_email(&self.contact_email) {
            missing.push("contactEmail");
        }
        if self.business_type != BusinessType::SoleProprietor
            && self.beneficial_owners.iter().all(|o| blank(o))
        {
            missing.push("beneficialOwners");
        }

        finish(missing)
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Login form. The password never appears in `Debug` output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn validate(&self) -> Result<(), EscrowError> {
        let mut missing = Vec::new();
        if !looks_like_email(&self.email) {
            missing.push("email");
        }
        if self.password.expose_secret().is_empty() {
            missing.push("password");
        }
        finish(missing)
    }

    /// JSON body for `POST /api/auth/login`.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "email": self.email.trim(),
            "password": self.password.expose_secret(),
        })
    }
}

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

impl Registration {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn validate(&self) -> Result<(), EscrowError> {
        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name");
        }
        if !looks_like_email(&self.email) {
            missing.push("email");
        }
        if self.password.expose_secret().len() < MIN_PASSWORD_LEN {
            missing.push("password");
        }
        finish(missing)
    }

    /// JSON body for `POST /api/auth/register`.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name.trim(),
            "email": self.email.trim(),
            "password": self.password.expose_secret(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
