//! reqwest client for the escrow platform API.
//!
//! Base URL and optional bearer token come from configuration. Every
//! request carries a fresh `X-Request-Id` so failures can be matched with
//! server logs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::EscrowApi;
use crate::intake::{Credentials, KycSubmission, NewContract, Registration};
use crate::risk::RiskInsightProvider;
use crate::types::{
    ContractDocument, ContractPatch, DocumentUpload, EscrowContract, EscrowError, RiskDashboard,
    Session, WalletBalance,
};

const USER_AGENT: &str = "escrow-insight/0.1.0";

/// Longest error body echoed back in an `EscrowError::Api` message.
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct HttpEscrowClient {
    http: Client,
    base_url: String,
    /// Bearer token for authenticated calls, if configured.
    token: Option<SecretString>,
}

impl HttpEscrowClient {
    pub fn new(base_url: &str, token: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for escrow API")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- Internal helpers ------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(method = %method, path, request_id = %request_id, "Escrow API request");

        let builder = self
            .http
            .request(method, self.url(path))
            .header("X-Request-Id", request_id);
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Turn a non-2xx response into the matching `EscrowError`.
    async fn ensure_success(resp: Response, resource: &str) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(EscrowError::NotFound(resource.to_string()).into());
        }

        warn!(status = status.as_u16(), resource, "Escrow API returned an error");
        Err(EscrowError::Api {
            status: status.as_u16(),
            message: error_message(&body, status),
        }
        .into())
    }

    async fn read_json<T: DeserializeOwned>(resp: Response, resource: &str) -> Result<T> {
        let resp = Self::ensure_success(resp, resource).await?;
        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse {resource} response"))
    }

    async fn send(builder: RequestBuilder, resource: &str) -> Result<Response> {
        builder
            .send()
            .await
            .with_context(|| format!("Escrow API request for {resource} failed"))
    }
}

/// Pull a readable message out of an error body.
///
/// Prefers `{"error": ...}` or `{"message": ...}`, then the raw body
/// (truncated), then the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_BODY).collect()
    }
}

// ---------------------------------------------------------------------------
// EscrowApi trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl EscrowApi for HttpEscrowClient {
    async fn current_session(&self) -> Result<Option<Session>> {
        let resp = Self::send(self.request(Method::GET, "/api/auth/session"), "session").await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        let value: serde_json::Value = Self::read_json(resp, "session").await?;
        if value.get("user").map_or(true, |u| u.is_null()) {
            debug!("No active session");
            return Ok(None);
        }

        let session: Session =
            serde_json::from_value(value).context("Failed to parse session response")?;
        Ok(Some(session))
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        credentials.validate()?;
        let builder = self
            .request(Method::POST, "/api/auth/login")
            .json(&credentials.to_body());
        let session: Session = Self::read_json(Self::send(builder, "login").await?, "login").await?;
        info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn register(&self, registration: &Registration) -> Result<Session> {
        registration.validate()?;
        let builder = self
            .request(Method::POST, "/api/auth/register")
            .json(&registration.to_body());
        let session: Session =
            Self::read_json(Self::send(builder, "registration").await?, "registration").await?;
        info!(user_id = %session.user.id, "Registered");
        Ok(session)
    }

    async fn logout(&self) -> Result<()> {
        let resp = Self::send(self.request(Method::POST, "/api/auth/logout"), "logout").await?;
        Self::ensure_success(resp, "logout").await?;
        Ok(())
    }

    async fn list_contracts(&self) -> Result<Vec<EscrowContract>> {
        let resp = Self::send(self.request(Method::GET, "/api/contracts"), "contracts").await?;
        let contracts: Vec<EscrowContract> = Self::read_json(resp, "contracts").await?;
        debug!(count = contracts.len(), "Contracts fetched");
        Ok(contracts)
    }

    async fn get_contract(&self, id: &str) -> Result<EscrowContract> {
        let path = format!("/api/contracts/{}", urlencoding::encode(id));
        let resource = format!("contract {id}");
        let resp = Self::send(self.request(Method::GET, &path), &resource).await?;
        Self::read_json(resp, &resource).await
    }

    async fn create_contract(&self, contract: &NewContract) -> Result<EscrowContract> {
        contract.validate()?;
        let builder = self.request(Method::POST, "/api/contracts").json(contract);
        let created: EscrowContract =
            Self::read_json(Self::send(builder, "new contract").await?, "new contract").await?;
        info!(contract_id = %created.id, title = %created.title, "Contract created");
        Ok(created)
    }

    async fn update_contract(&self, id: &str, patch: &ContractPatch) -> Result<EscrowContract> {
        let path = format!("/api/contracts/{}", urlencoding::encode(id));
        let resource = format!("contract {id}");
        let builder = self.request(Method::PATCH, &path).json(patch);
        Self::read_json(Self::send(builder, &resource).await?, &resource).await
    }

    async fn wallet_balance(&self, user_id: &str) -> Result<WalletBalance> {
        let path = format!(
            "/api/users/{}/wallets/main/balance",
            urlencoding::encode(user_id)
        );
        let resp = Self::send(self.request(Method::GET, &path), "wallet balance").await?;
        Self::read_json(resp, "wallet balance").await
    }

    async fn list_documents(&self, contract_id: &str) -> Result<Vec<ContractDocument>> {
        let path = format!("/api/contracts/{}/documents", urlencoding::encode(contract_id));
        let resource = format!("documents of {contract_id}");
        let resp = Self::send(self.request(Method::GET, &path), &resource).await?;
        Self::read_json(resp, &resource).await
    }

    async fn upload_document(
        &self,
        contract_id: &str,
        upload: &DocumentUpload,
    ) -> Result<ContractDocument> {
        if upload.name.trim().is_empty() || upload.bytes.is_empty() {
            let mut missing = Vec::new();
            if upload.name.trim().is_empty() {
                missing.push("name".to_string());
            }
            if upload.bytes.is_empty() {
                missing.push("file".to_string());
            }
            return Err(EscrowError::Validation(missing).into());
        }

        let path = format!(
            "/api/contracts/{}/documents?name={}&type={}",
            urlencoding::encode(contract_id),
            urlencoding::encode(&upload.name),
            upload.doc_type.as_str(),
        );
        let builder = self
            .request(Method::POST, &path)
            .header(reqwest::header::CONTENT_TYPE, upload.content_type.as_str())
            .body(upload.bytes.clone());

        let doc: ContractDocument =
            Self::read_json(Self::send(builder, "document upload").await?, "document upload")
                .await?;
        info!(
            contract_id,
            document_id = %doc.id,
            size = upload.bytes.len(),
            "Document uploaded"
        );
        Ok(doc)
    }

    async fn submit_kyc(&self, submission: &KycSubmission) -> Result<()> {
        submission.validate()?;
        let builder = self.request(Method::POST, "/api/kyc").json(submission);
        let resp = Self::send(builder, "kyc submission").await?;
        Self::ensure_success(resp, "kyc submission").await?;
        info!(legal_name = %submission.legal_name, "KYC submitted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Remote insight generation
// ---------------------------------------------------------------------------

#[async_trait]
impl RiskInsightProvider for HttpEscrowClient {
    /// `POST /api/risk/insights` with the contracts in scope.
    async fn generate(&self, contracts: &[EscrowContract]) -> Result<RiskDashboard> {
        let body = serde_json::json!({ "contracts": contracts });
        let builder = self.request(Method::POST, "/api/risk/insights").json(&body);
        let dashboard: RiskDashboard =
            Self::read_json(Self::send(builder, "risk insights").await?, "risk insights").await?;
        info!(
            contracts = contracts.len(),
            insights = dashboard.insights.len(),
            "Remote risk insights generated"
        );
        Ok(dashboard)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
