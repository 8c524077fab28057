use thiserror::Error;

use crate::{
    db_types::{EngagementId, EngagementStatus, ParticipantId, QuoteId},
    pricing::PricingError,
    settlement::SettlementError,
    traits::{SideEffect, StoreError},
};

#[derive(Debug, Clone, Error)]
pub enum EngagementFlowError {
    // -- validation: bad input, no side effects --
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("{0}")]
    Pricing(#[from] PricingError),

    // -- conflict: the request is well-formed but the world disagrees --
    #[error("The walker already has an active engagement")]
    WalkerUnavailable,
    #[error("The owner already has an active engagement")]
    OwnerBusy,
    #[error("Quote {0} has already been dispatched")]
    QuoteAlreadyDispatched(QuoteId),
    #[error("Engagement {id} is {actual}; this operation requires {expected}")]
    InvalidTransition { id: EngagementId, expected: EngagementStatus, actual: EngagementStatus },
    #[error("Engagement {0} has no settlement to refund; deny the request instead")]
    NotSettled(EngagementId),

    // -- not found --
    #[error("Quote {0} does not exist")]
    QuoteNotFound(QuoteId),
    #[error("Engagement {0} does not exist")]
    EngagementNotFound(EngagementId),
    #[error("Participant {0} does not exist")]
    ParticipantNotFound(ParticipantId),

    // -- settlement: always logged with the engagement id for reconciliation --
    #[error("Payment was declined for engagement {0}")]
    PaymentDeclined(EngagementId),
    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    // -- dependency: a collaborator failed; the caller may retry --
    #[error("Could not deliver the walk request to the walker for engagement {0}")]
    NotificationFailed(EngagementId),
    #[error("Store error: {0}")]
    Dependency(#[from] StoreError),
    #[error("Engagement {id} transitioned but follow-up updates failed ({failed:?}); retry to reconcile")]
    Reconcile { id: EngagementId, failed: Vec<SideEffect> },
}
