//! List view definitions for contracts, documents, risk factors, partners
//! and countries: which fields are searched, which filters apply, and how
//! each sort key orders records.

use std::cmp::Ordering;
use std::str::FromStr;

use super::{compare_level, compare_number, compare_text, key_token, Listable, Selection};
use super::{SortDirection, SortState};
use crate::types::{
    ContractDocument, ContractStatus, CountryRisk, DocumentStatus, DocumentType, EscrowContract,
    PartnerRisk, RiskCategory, RiskFactor, RiskLevel,
};

fn unknown_key(view: &str, s: &str) -> anyhow::Error {
    anyhow::anyhow!("Unknown {view} sort key: {s}")
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractSortKey {
    Title,
    Amount,
    CreatedAt,
    UpdatedAt,
    Status,
}

impl FromStr for ContractSortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match key_token(s).as_str() {
            "title" => Ok(ContractSortKey::Title),
            "amount" => Ok(ContractSortKey::Amount),
            "createdat" => Ok(ContractSortKey::CreatedAt),
            "updatedat" => Ok(ContractSortKey::UpdatedAt),
            "status" => Ok(ContractSortKey::Status),
            _ => Err(unknown_key("contract", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    pub status: Selection<ContractStatus>,
}

impl Listable for EscrowContract {
    type SortKey = ContractSortKey;
    type Filter = ContractFilter;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        fields.extend(self.parties.iter().map(|p| p.name.as_str()));
        fields
    }

    fn passes(&self, filter: &ContractFilter) -> bool {
        filter.status.admits(&self.status)
    }

    fn compare_by(&self, other: &Self, key: ContractSortKey) -> Ordering {
        match key {
            ContractSortKey::Title => compare_text(&self.title, &other.title),
            ContractSortKey::Amount => self.trade_terms.amount.cmp(&other.trade_terms.amount),
            ContractSortKey::CreatedAt => self.created_at.cmp(&other.created_at),
            ContractSortKey::UpdatedAt => self.updated_at.cmp(&other.updated_at),
            // Lifecycle order
            ContractSortKey::Status => self.status.cmp(&other.status),
        }
    }

    fn default_sort() -> SortState<ContractSortKey> {
        SortState::new(ContractSortKey::UpdatedAt, SortDirection::Desc)
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSortKey {
    Name,
    UploadedAt,
    Size,
}

impl FromStr for DocumentSortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match key_token(s).as_str() {
            "name" => Ok(DocumentSortKey::Name),
            "uploadedat" | "date" => Ok(DocumentSortKey::UploadedAt),
            "size" => Ok(DocumentSortKey::Size),
            _ => Err(unknown_key("document", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub doc_type: Selection<DocumentType>,
    pub status: Selection<DocumentStatus>,
}

impl Listable for ContractDocument {
    type SortKey = DocumentSortKey;
    type Filter = DocumentFilter;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.uploaded_by.as_str()]
    }

    fn passes(&self, filter: &DocumentFilter) -> bool {
        filter.doc_type.admits(&self.doc_type) && filter.status.admits(&self.status)
    }

    fn compare_by(&self, other: &Self, key: DocumentSortKey) -> Ordering {
        match key {
            DocumentSortKey::Name => compare_text(&self.name, &other.name),
            DocumentSortKey::UploadedAt => self.uploaded_at.cmp(&other.uploaded_at),
            DocumentSortKey::Size => self.size.cmp(&other.size),
        }
    }

    fn default_sort() -> SortState<DocumentSortKey> {
        SortState::new(DocumentSortKey::UploadedAt, SortDirection::Desc)
    }
}

// ---------------------------------------------------------------------------
// Risk factors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorSortKey {
    Value,
    Level,
    Category,
}

impl FromStr for FactorSortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match key_token(s).as_str() {
            "value" | "score" => Ok(FactorSortKey::Value),
            "level" | "risklevel" => Ok(FactorSortKey::Level),
            "category" => Ok(FactorSortKey::Category),
            _ => Err(unknown_key("risk factor", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FactorFilter {
    pub category: Selection<RiskCategory>,
    pub level: Selection<RiskLevel>,
}

impl Listable for RiskFactor {
    type SortKey = FactorSortKey;
    type Filter = FactorFilter;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.description.as_str(), self.impact_description.as_str()]
    }

    fn passes(&self, filter: &FactorFilter) -> bool {
        filter.category.admits(&self.category) && filter.level.admits(&self.level)
    }

    fn compare_by(&self, other: &Self, key: FactorSortKey) -> Ordering {
        match key {
            FactorSortKey::Value => compare_number(self.value, other.value),
            FactorSortKey::Level => compare_level(self.level, other.level),
            FactorSortKey::Category => compare_text(self.category.as_str(), other.category.as_str()),
        }
    }

    fn default_sort() -> SortState<FactorSortKey> {
        SortState::new(FactorSortKey::Value, SortDirection::Desc)
    }
}

// ---------------------------------------------------------------------------
// Partners
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerSortKey {
    Name,
    CreditScore,
    TradeVolume,
    Level,
}

impl FromStr for PartnerSortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match key_token(s).as_str() {
            "name" | "partnername" => Ok(PartnerSortKey::Name),
            "creditscore" | "score" => Ok(PartnerSortKey::CreditScore),
            "tradevolume" | "volume" => Ok(PartnerSortKey::TradeVolume),
            "level" | "risklevel" => Ok(PartnerSortKey::Level),
            _ => Err(unknown_key("partner", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PartnerFilter {
    pub level: Selection<RiskLevel>,
}

impl Listable for PartnerRisk {
    type SortKey = PartnerSortKey;
    type Filter = PartnerFilter;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.partner_name.as_str(), self.country.as_str()]
    }

    fn passes(&self, filter: &PartnerFilter) -> bool {
        filter.level.admits(&self.risk_level)
    }

    fn compare_by(&self, other: &Self, key: PartnerSortKey) -> Ordering {
        match key {
            PartnerSortKey::Name => compare_text(&self.partner_name, &other.partner_name),
            PartnerSortKey::CreditScore => compare_number(self.credit_score, other.credit_score),
            PartnerSortKey::TradeVolume => self.total_trade_volume.cmp(&other.total_trade_volume),
            PartnerSortKey::Level => compare_level(self.risk_level, other.risk_level),
        }
    }

    fn default_sort() -> SortState<PartnerSortKey> {
        SortState::new(PartnerSortKey::Level, SortDirection::Desc)
    }
}

// ---------------------------------------------------------------------------
// Countries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountrySortKey {
    Name,
    OverallScore,
    Level,
}

impl FromStr for CountrySortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match key_token(s).as_str() {
            "name" | "country" => Ok(CountrySortKey::Name),
            "overallscore" | "overallriskscore" | "score" => Ok(CountrySortKey::OverallScore),
            "level" | "risklevel" => Ok(CountrySortKey::Level),
            _ => Err(unknown_key("country", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    pub level: Selection<RiskLevel>,
}

impl Listable for CountryRisk {
    type SortKey = CountrySortKey;
    type Filter = CountryFilter;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.country.as_str(), self.iso_code.as_str()]
    }

    fn passes(&self, filter: &CountryFilter) -> bool {
        filter.level.admits(&self.risk_level)
    }

    fn compare_by(&self, other: &Self, key: CountrySortKey) -> Ordering {
        match key {
            CountrySortKey::Name => compare_text(&self.country, &other.country),
            CountrySortKey::OverallScore => {
                compare_number(self.overall_risk_score, other.overall_risk_score)
            }
            CountrySortKey::Level => compare_level(self.risk_level, other.risk_level),
        }
    }

    fn default_sort() -> SortState<CountrySortKey> {
        SortState::new(CountrySortKey::OverallScore, SortDirection::Desc)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
