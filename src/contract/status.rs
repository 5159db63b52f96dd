//! Status model.
//!
//! The transition table and the presentation mapping (color, label) for
//! every `ContractStatus`. Colors resolve to badge classes through a fixed
//! table so nothing downstream builds class names from strings.

use std::fmt;

use serde::Serialize;

use crate::types::ContractStatus;

impl ContractStatus {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// DRAFT → AWAITING_FUNDS → FUNDED → GOODS_SHIPPED → GOODS_RECEIVED →
    /// COMPLETED, with DISPUTED off FUNDED/GOODS_SHIPPED, CANCELLED off
    /// DRAFT/AWAITING_FUNDS, and DISPUTED closing into COMPLETED.
    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        use ContractStatus::*;
        matches!(
            (self, next),
            (Draft, AwaitingFunds)
                | (Draft, Cancelled)
                | (AwaitingFunds, Funded)
                | (AwaitingFunds, Cancelled)
                | (Funded, GoodsShipped)
                | (Funded, Disputed)
                | (GoodsShipped, GoodsReceived)
                | (GoodsShipped, Disputed)
                | (GoodsReceived, Completed)
                | (Disputed, Completed)
        )
    }

    /// Statuses reachable in one step.
    pub fn successors(&self) -> Vec<ContractStatus> {
        ContractStatus::ALL
            .iter()
            .copied()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Cancelled)
    }
}

/// Badge color for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Gray,
    Yellow,
    Green,
    Blue,
    Indigo,
    Red,
}

impl StatusColor {
    /// Badge classes for this color.
    pub fn badge_class(&self) -> &'static str {
        match self {
            StatusColor::Gray => "bg-gray-100 text-gray-800",
            StatusColor::Yellow => "bg-yellow-100 text-yellow-800",
            StatusColor::Green => "bg-green-100 text-green-800",
            StatusColor::Blue => "bg-blue-100 text-blue-800",
            StatusColor::Indigo => "bg-indigo-100 text-indigo-800",
            StatusColor::Red => "bg-red-100 text-red-800",
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusColor::Gray => "gray",
            StatusColor::Yellow => "yellow",
            StatusColor::Green => "green",
            StatusColor::Blue => "blue",
            StatusColor::Indigo => "indigo",
            StatusColor::Red => "red",
        };
        f.write_str(name)
    }
}

pub fn color_for(status: ContractStatus) -> StatusColor {
    match status {
        ContractStatus::Draft => StatusColor::Gray,
        ContractStatus::AwaitingFunds => StatusColor::Yellow,
        ContractStatus::Funded => StatusColor::Green,
        ContractStatus::GoodsShipped => StatusColor::Blue,
        ContractStatus::GoodsReceived => StatusColor::Indigo,
        ContractStatus::Completed => StatusColor::Green,
        ContractStatus::Disputed => StatusColor::Red,
        ContractStatus::Cancelled => StatusColor::Red,
    }
}

/// Display label: the wire name with underscores turned into spaces.
pub fn label_for(status: ContractStatus) -> String {
    status.as_str().replace('_', " ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
