use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Settlement references stored on the engagement as part of the `pending → accepted` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementUpdate {
    pub charge_ref: String,
    pub transfer_group: String,
}

/// One of the follow-up store writes a lifecycle transition issues after its primary effect has succeeded.
/// Reported back to the caller when a write fails so reconciliation knows exactly what was left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideEffect {
    StatusRow,
    OwnerRef,
    WalkerRef,
}

impl Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideEffect::StatusRow => write!(f, "engagement status row"),
            SideEffect::OwnerRef => write!(f, "owner back-reference"),
            SideEffect::WalkerRef => write!(f, "walker back-reference"),
        }
    }
}
