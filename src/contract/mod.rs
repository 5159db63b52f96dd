//! Contract lifecycle: status presentation, the transition table, and
//! which actions a given party may take.

pub mod actions;
pub mod status;

pub use actions::{
    apply_patch, can_perform, eligible_actions, plan_transition, stamp_status, status_update,
    ContractAction,
};
pub use status::{color_for, label_for, StatusColor};
