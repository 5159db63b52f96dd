//! Platform API boundary.
//!
//! Defines the `EscrowApi` trait and provides `HttpEscrowClient`, the
//! reqwest implementation against the escrow platform's REST endpoints.
//! Any non-2xx response is a failure; a 404 on a single-entity fetch is
//! reported as `EscrowError::NotFound`.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;

use crate::intake::{Credentials, KycSubmission, NewContract, Registration};
use crate::types::{
    ContractDocument, ContractPatch, DocumentUpload, EscrowContract, Session, WalletBalance,
};

pub use http::HttpEscrowClient;

/// Abstraction over the escrow platform's REST API.
///
/// No call retries. Callers apply results to local state only after a
/// call succeeds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EscrowApi: Send + Sync {
    /// `GET /api/auth/session`. `None` when nobody is signed in.
    async fn current_session(&self) -> Result<Option<Session>>;

    /// `POST /api/auth/login`
    async fn login(&self, credentials: &Credentials) -> Result<Session>;

    /// `POST /api/auth/register`
    async fn register(&self, registration: &Registration) -> Result<Session>;

    /// `POST /api/auth/logout`
    async fn logout(&self) -> Result<()>;

    /// `GET /api/contracts`
    async fn list_contracts(&self) -> Result<Vec<EscrowContract>>;

    /// `GET /api/contracts/:id`
    async fn get_contract(&self, id: &str) -> Result<EscrowContract>;

    /// `POST /api/contracts`
    async fn create_contract(&self, contract: &NewContract) -> Result<EscrowContract>;

    /// `PATCH /api/contracts/:id`. Returns the contract as stored remotely.
    async fn update_contract(&self, id: &str, patch: &ContractPatch) -> Result<EscrowContract>;

    /// `GET /api/users/:id/wallets/main/balance`
    async fn wallet_balance(&self, user_id: &str) -> Result<WalletBalance>;

    /// `GET /api/contracts/:id/documents`
    async fn list_documents(&self, contract_id: &str) -> Result<Vec<ContractDocument>>;

    /// `POST /api/contracts/:id/documents`
    async fn upload_document(
        &self,
        contract_id: &str,
        upload: &DocumentUpload,
    ) -> Result<ContractDocument>;

    /// `POST /api/kyc`
    async fn submit_kyc(&self, submission: &KycSubmission) -> Result<()>;
}
