//! Action eligibility.
//!
//! Decides which lifecycle actions the current user may take on a
//! contract, and builds the status update an action produces. The caller
//! is resolved to a party by wallet address first; a caller who is not a
//! party gets nothing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::types::{ContractPatch, ContractStatus, EscrowContract, EscrowError, PartyRole};

/// A user-triggered lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractAction {
    Publish,
    Fund,
    ConfirmShipment,
    ConfirmReceipt,
    Complete,
    RaiseDispute,
    ResolveDispute,
    Cancel,
}

impl ContractAction {
    pub const ALL: &'static [ContractAction] = &[
        ContractAction::Publish,
        ContractAction::Fund,
        ContractAction::ConfirmShipment,
        ContractAction::ConfirmReceipt,
        ContractAction::Complete,
        ContractAction::RaiseDispute,
        ContractAction::ResolveDispute,
        ContractAction::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractAction::Publish => "publish",
            ContractAction::Fund => "fund",
            ContractAction::ConfirmShipment => "confirmShipment",
            ContractAction::ConfirmReceipt => "confirmReceipt",
            ContractAction::Complete => "complete",
            ContractAction::RaiseDispute => "raiseDispute",
            ContractAction::ResolveDispute => "resolveDispute",
            ContractAction::Cancel => "cancel",
        }
    }

    /// Statuses the contract must be in for this action.
    pub fn required_statuses(&self) -> &'static [ContractStatus] {
        use ContractStatus::*;
        match self {
            ContractAction::Publish => &[Draft],
            ContractAction::Fund => &[AwaitingFunds],
            ContractAction::ConfirmShipment => &[Funded],
            ContractAction::ConfirmReceipt => &[GoodsShipped],
            ContractAction::Complete => &[GoodsReceived],
            ContractAction::RaiseDispute => &[Funded, GoodsShipped],
            ContractAction::ResolveDispute => &[Disputed],
            ContractAction::Cancel => &[Draft, AwaitingFunds],
        }
    }

    /// Roles allowed to take this action. `None` means any party.
    pub fn required_roles(&self) -> Option<&'static [PartyRole]> {
        use PartyRole::*;
        match self {
            ContractAction::Fund => Some(&[Importer]),
            ContractAction::ConfirmShipment => Some(&[Exporter]),
            ContractAction::ConfirmReceipt => Some(&[Importer]),
            ContractAction::RaiseDispute => Some(&[Importer, Exporter]),
            ContractAction::ResolveDispute => Some(&[Mediator]),
            ContractAction::Publish | ContractAction::Complete | ContractAction::Cancel => None,
        }
    }

    /// Status the contract moves to when the action succeeds.
    pub fn target_status(&self) -> ContractStatus {
        match self {
            ContractAction::Publish => ContractStatus::AwaitingFunds,
            ContractAction::Fund => ContractStatus::Funded,
            ContractAction::ConfirmShipment => ContractStatus::GoodsShipped,
            ContractAction::ConfirmReceipt => ContractStatus::GoodsReceived,
            ContractAction::Complete => ContractStatus::Completed,
            ContractAction::RaiseDispute => ContractStatus::Disputed,
            ContractAction::ResolveDispute => ContractStatus::Completed,
            ContractAction::Cancel => ContractStatus::Cancelled,
        }
    }
}

impl fmt::Display for ContractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the camelCase wire name or snake_case.
impl std::str::FromStr for ContractAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().replace('_', "").to_lowercase();
        ContractAction::ALL
            .iter()
            .copied()
            .find(|a| a.as_str().to_lowercase() == folded)
            .ok_or_else(|| anyhow::anyhow!("Unknown contract action: {s}"))
    }
}

/// Whether `user_address` may take `action` on `contract` right now.
pub fn can_perform(contract: &EscrowContract, user_address: &str, action: ContractAction) -> bool {
    let Some(party) = contract.party_for(user_address) else {
        return false;
    };

    if !action.required_statuses().contains(&contract.status) {
        return false;
    }

    match action.required_roles() {
        Some(roles) => roles.contains(&party.role),
        None => true,
    }
}

/// Every action `user_address` may take, in table order.
pub fn eligible_actions(contract: &EscrowContract, user_address: &str) -> Vec<ContractAction> {
    ContractAction::ALL
        .iter()
        .copied()
        .filter(|action| can_perform(contract, user_address, *action))
        .collect()
}

/// Record `status` in a milestone map. Existing keys are kept.
pub fn stamp_status(
    milestones: &BTreeMap<String, DateTime<Utc>>,
    status: ContractStatus,
    at: DateTime<Utc>,
) -> BTreeMap<String, DateTime<Utc>> {
    let mut merged = milestones.clone();
    merged.insert(status.milestone_key(), at);
    merged
}

/// Build the status update for moving `contract` to `next`.
///
/// Rejects moves the lifecycle does not allow. The milestone for `next` is
/// always stamped.
pub fn status_update(
    contract: &EscrowContract,
    next: ContractStatus,
    at: DateTime<Utc>,
) -> Result<ContractPatch, EscrowError> {
    if !contract.status.can_transition_to(next) {
        return Err(EscrowError::InvalidTransition {
            from: contract.status,
            to: next,
        });
    }

    Ok(ContractPatch {
        status: Some(next),
        milestones: Some(stamp_status(&contract.milestones, next, at)),
    })
}

/// Check eligibility for `action` and build the resulting update.
pub fn plan_transition(
    contract: &EscrowContract,
    user_address: &str,
    action: ContractAction,
    at: DateTime<Utc>,
) -> Result<ContractPatch, EscrowError> {
    if !can_perform(contract, user_address, action) {
        debug!(
            contract_id = %contract.id,
            action = %action,
            status = %contract.status,
            "Action not eligible"
        );
        return Err(EscrowError::NotEligible {
            action: action.as_str().to_string(),
            status: contract.status,
        });
    }

    status_update(contract, action.target_status(), at)
}

/// Apply a confirmed patch to a local copy.
pub fn apply_patch(contract: &mut EscrowContract, patch: &ContractPatch, at: DateTime<Utc>) {
    if let Some(status) = patch.status {
        contract.status = status;
    }
    if let Some(milestones) = &patch.milestones {
        for (key, ts) in milestones {
            contract.milestones.insert(key.clone(), *ts);
        }
    }
    contract.updated_at = at;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
