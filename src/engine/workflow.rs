//! Contract workflow.
//!
//! Runs lifecycle actions, creation, document upload and KYC intake
//! against an `EscrowApi`. Eligibility and validation are checked first and
//! a failure there makes no call. Local state changes only once the API
//! has confirmed the write.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::EscrowApi;
use crate::contract::{plan_transition, status_update, ContractAction};
use crate::intake::{KycSubmission, NewContract};
use crate::types::{
    ContractDocument, ContractStatus, DocumentUpload, EscrowContract, EscrowError,
};

pub struct ContractWorkflow {
    api: Arc<dyn EscrowApi>,
}

impl ContractWorkflow {
    pub fn new(api: Arc<dyn EscrowApi>) -> Self {
        Self { api }
    }

    /// Take `action` as `user_address` and replace `contract` with the
    /// stored result.
    pub async fn perform(
        &self,
        contract: &mut EscrowContract,
        user_address: &str,
        action: ContractAction,
    ) -> Result<()> {
        let patch = plan_transition(contract, user_address, action, Utc::now())?;
        let from = contract.status;

        let updated = match self.api.update_contract(&contract.id, &patch).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(contract_id = %contract.id, action = %action, error = %e, "Action failed");
                return Err(e);
            }
        };

        info!(
            contract_id = %contract.id,
            action = %action,
            from = %from,
            to = %updated.status,
            "Contract action applied"
        );
        adopt(contract, updated);
        Ok(())
    }

    /// Move `contract` to `next` without an action or role check.
    ///
    /// The lifecycle table still applies.
    pub async fn update_status(
        &self,
        contract: &mut EscrowContract,
        next: ContractStatus,
    ) -> Result<()> {
        let patch = status_update(contract, next, Utc::now())?;
        let updated = self.api.update_contract(&contract.id, &patch).await?;
        info!(contract_id = %contract.id, from = %contract.status, to = %next, "Status updated");
        adopt(contract, updated);
        Ok(())
    }

    pub async fn create(&self, form: &NewContract) -> Result<EscrowContract> {
        form.validate()?;
        self.api.create_contract(form).await
    }

    /// Fetch one contract. A missing contract is `Ok(None)`, not an error.
    pub async fn load(&self, id: &str) -> Result<Option<EscrowContract>> {
        match self.api.get_contract(id).await {
            Ok(contract) => Ok(Some(contract)),
            Err(e) if matches!(e.downcast_ref::<EscrowError>(), Some(EscrowError::NotFound(_))) => {
                info!(contract_id = id, "Contract not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Replace `contracts` with a fresh listing. On failure the old list stays.
    pub async fn reload(&self, contracts: &mut Vec<EscrowContract>) -> Result<usize> {
        let fresh = self.api.list_contracts().await?;
        *contracts = fresh;
        Ok(contracts.len())
    }

    pub async fn documents(&self, contract_id: &str) -> Result<Vec<ContractDocument>> {
        self.api.list_documents(contract_id).await
    }

    /// Upload a document and attach the stored record to `contract`.
    pub async fn upload(
        &self,
        contract: &mut EscrowContract,
        upload: &DocumentUpload,
    ) -> Result<ContractDocument> {
        let doc = self.api.upload_document(&contract.id, upload).await?;
        contract.documents.push(doc.clone());
        Ok(doc)
    }

    pub async fn submit_kyc(&self, form: &KycSubmission) -> Result<()> {
        form.validate()?;
        self.api.submit_kyc(form).await
    }
}

/// Replace `local` with the stored copy. Milestones only accumulate, so any
/// the reply omits are carried over.
fn adopt(local: &mut EscrowContract, mut stored: EscrowContract) {
    for (key, at) in std::mem::take(&mut local.milestones) {
        stored.milestones.entry(key).or_insert(at);
    }
    *local = stored;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockEscrowApi;
    use crate::contract::apply_patch;
    use crate::intake::BusinessType;
    use crate::types::{
        ContractPatch, DocumentStatus, DocumentType, Party, PartyRole, TradeTerms,
    };
    use rust_decimal_macros::dec;

    const IMPORTER: &str = "0ximp";
    const EXPORTER: &str = "0xexp";

    fn contract(status: ContractStatus) -> EscrowContract {
        let now = Utc::now();
        EscrowContract {
            id: "c1".to_string(),
            title: "Tea".to_string(),
            description: String::new(),
            status,
            parties: vec![
                Party {
                    address: IMPORTER.to_string(),
                    role: PartyRole::Importer,
                    name: "Leaf GmbH".to_string(),
                    country: "Germany".to_string(),
                },
                Party {
                    address: EXPORTER.to_string(),
                    role: PartyRole::Exporter,
                    name: "Assam Estates".to_string(),
                    country: "India".to_string(),
                },
            ],
            trade_terms: TradeTerms {
                incoterm: "CIF".to_string(),
                payment_terms: "escrow".to_string(),
                currency: "USD".to_string(),
                amount: dec!(15000),
                delivery_deadline: now,
                inspection_period: 4,
                dispute_resolution_mechanism: String::new(),
            },
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
            milestones: Default::default(),
        }
    }

    /// Echo the patch back the way the platform would store it.
    fn echo_update(status: ContractStatus) -> impl Fn(&str, &ContractPatch) -> Result<EscrowContract> {
        move |_, patch| {
            let mut stored = contract(status);
            apply_patch(&mut stored, patch, Utc::now());
            Ok(stored)
        }
    }

    #[tokio::test]
    async fn test_fund_by_importer() {
        let mut api = MockEscrowApi::new();
        api.expect_update_contract()
            .withf(|id, patch| id == "c1" && patch.status == Some(ContractStatus::Funded))
            .times(1)
            .returning(echo_update(ContractStatus::AwaitingFunds));

        let workflow = ContractWorkflow::new(Arc::new(api));
        let mut c = contract(ContractStatus::AwaitingFunds);
        workflow.perform(&mut c, IMPORTER, ContractAction::Fund).await.unwrap();

        assert_eq!(c.status, ContractStatus::Funded);
        assert!(c.milestone(ContractStatus::Funded).is_some());
    }

    #[tokio::test]
    async fn test_reply_without_history_keeps_local_milestones() {
        let mut api = MockEscrowApi::new();
        api.expect_update_contract().returning(|_, patch| {
            // Stored copy that only knows about the newest milestone.
            let mut stored = contract(ContractStatus::Funded);
            stored.milestones = patch.milestones.clone().unwrap_or_default();
            stored.milestones.retain(|k, _| k == &ContractStatus::GoodsShipped.milestone_key());
            stored.status = ContractStatus::GoodsShipped;
            Ok(stored)
        });

        let workflow = ContractWorkflow::new(Arc::new(api));
        let mut c = contract(ContractStatus::Funded);
        let funded_at = Utc::now() - chrono::Duration::days(3);
        c.milestones.insert(ContractStatus::Funded.milestone_key(), funded_at);

        workflow
            .perform(&mut c, EXPORTER, ContractAction::ConfirmShipment)
            .await
            .unwrap();

        assert_eq!(c.status, ContractStatus::GoodsShipped);
        assert_eq!(c.milestone(ContractStatus::Funded), Some(funded_at));
        assert!(c.milestone(ContractStatus::GoodsShipped).is_some());
    }

    #[tokio::test]
    async fn test_ineligible_action_makes_no_call() {
        let mut api = MockEscrowApi::new();
        api.expect_update_contract().never();

        let workflow = ContractWorkflow::new(Arc::new(api));
        let mut c = contract(ContractStatus::AwaitingFunds);
        let err = workflow
            .perform(&mut c, EXPORTER, ContractAction::Fund)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<EscrowError>(),
            Some(EscrowError::NotEligible { .. })
        ));
        assert_eq!(c.status, ContractStatus::AwaitingFunds);
    }

    #[tokio::test]
    async fn test_api_failure_leaves_contract_unchanged() {
        let mut api = MockEscrowApi::new();
        api.expect_update_contract().times(1).returning(|_, _| {
            Err(EscrowError::Api {
                status: 500,
                message: "ledger unavailable".to_string(),
            }
            .into())
        });

        let workflow = ContractWorkflow::new(Arc::new(api));
        let mut c = contract(ContractStatus::Funded);
        let before = c.clone();
        let result = workflow
            .perform(&mut c, EXPORTER, ContractAction::ConfirmShipment)
            .await;

        assert!(result.is_err());
        assert_eq!(c, before);
    }

    #[tokio::test]
    async fn test_update_status_rejects_illegal_move() {
        let mut api = MockEscrowApi::new();
        api.expect_update_contract().never();

        let workflow = ContractWorkflow::new(Arc::new(api));
        let mut c = contract(ContractStatus::Draft);
        let err = workflow
            .update_status(&mut c, ContractStatus::Completed)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("DRAFT -> COMPLETED"));
    }

    #[tokio::test]
    async fn test_create_validates_before_calling() {
        let mut api = MockEscrowApi::new();
        api.expect_create_contract().never();

        let workflow = ContractWorkflow::new(Arc::new(api));
        let c = contract(ContractStatus::Draft);
        let form = NewContract {
            title: String::new(),
            description: String::new(),
            parties: c.parties.clone(),
            trade_terms: c.trade_terms.clone(),
        };
        let err = workflow.create(&form).await.unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_load_missing_contract_is_none() {
        let mut api = MockEscrowApi::new();
        api.expect_get_contract()
            .returning(|id| Err(EscrowError::NotFound(format!("contract {id}")).into()));

        let workflow = ContractWorkflow::new(Arc::new(api));
        let loaded = tokio_test::block_on(workflow.load("ghost")).unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_propagates_other_errors() {
        let mut api = MockEscrowApi::new();
        api.expect_get_contract().returning(|_| {
            Err(EscrowError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            }
            .into())
        });

        let workflow = ContractWorkflow::new(Arc::new(api));
        assert!(workflow.load("c1").await.is_err());
    }

    #[tokio::test]
    async fn test_reload_keeps_old_list_on_failure() {
        let mut api = MockEscrowApi::new();
        api.expect_list_contracts()
            .returning(|| Err(anyhow::anyhow!("connection refused")));

        let workflow = ContractWorkflow::new(Arc::new(api));
        let mut contracts = vec![contract(ContractStatus::Draft)];
        assert!(workflow.reload(&mut contracts).await.is_err());
        assert_eq!(contracts.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_attaches_document() {
        let mut api = MockEscrowApi::new();
        api.expect_upload_document().times(1).returning(|contract_id, upload| {
            Ok(ContractDocument {
                id: "d1".to_string(),
                contract_id: contract_id.to_string(),
                name: upload.name.clone(),
                doc_type: upload.doc_type,
                status: DocumentStatus::Pending,
                uploaded_by: EXPORTER.to_string(),
                uploaded_at: Utc::now(),
                size: upload.bytes.len() as u64,
            })
        });

        let workflow = ContractWorkflow::new(Arc::new(api));
        let mut c = contract(ContractStatus::GoodsShipped);
        let upload = DocumentUpload {
            name: "invoice.pdf".to_string(),
            doc_type: DocumentType::CommercialInvoice,
            content_type: "application/pdf".to_string(),
            bytes: vec![0; 16],
        };
        let doc = workflow.upload(&mut c, &upload).await.unwrap();

        assert_eq!(doc.size, 16);
        assert_eq!(c.documents.len(), 1);
        assert_eq!(c.documents[0].contract_id, "c1");
    }

    #[tokio::test]
    async fn test_kyc_validation_blocks_submission() {
        let mut api = MockEscrowApi::new();
        api.expect_submit_kyc().never();

        let workflow = ContractWorkflow::new(Arc::new(api));
        let form = KycSubmission {
            legal_name: "Assam Estates".to_string(),
            registration_number: String::new(),
            country: "India".to_string(),
            contact_email: "ops@assam.example".to_string(),
            business_type: BusinessType::Partnership,
            beneficial_owners: vec!["R. Das".to_string()],
        };
        let err = workflow.submit_kyc(&form).await.unwrap_err();
        assert!(err.to_string().contains("registrationNumber"));
    }
}
