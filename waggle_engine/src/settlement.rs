//! Settlement orchestration.
//!
//! Wraps the payment processor so the lifecycle engine never touches its raw API. There are only two flows:
//! capture-with-split at acceptance, and reversal-plus-refund at cancellation. Both are tagged with the engagement
//! id, which serves as the processor idempotency key and as the transfer-group tag used later to locate the payout
//! for reversal.
use std::fmt::Debug;

use log::*;
use thiserror::Error;
use wgl_common::{Cents, FEE_RATE_PERCENT};

use crate::{
    db_types::{Engagement, EngagementId, Participant, ParticipantId},
    traits::{CaptureOutcome, PaymentProcessor, ProcessorError},
};

/// Splits an engagement total into `(service_fee, walker_payout)`.
///
/// The fee is rounded half-up to the cent and the payout is the exact remainder, so the two always partition the
/// total; the payout is never derived by rounding the fee's complement.
pub fn split_fee(total: Cents) -> (Cents, Cents) {
    let fee = total.percent_of(FEE_RATE_PERCENT);
    (fee, total - fee)
}

pub struct SettlementApi<P> {
    processor: P,
}

impl<P> Debug for SettlementApi<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<P> SettlementApi<P> {
    pub fn new(processor: P) -> Self {
        Self { processor }
    }
}

impl<P> SettlementApi<P>
where P: PaymentProcessor
{
    /// Captures the engagement total from the owner with an immediate payout split to the walker.
    ///
    /// The returned outcome may still be a decline; the caller owns the resulting state transition. A retry after
    /// a crash is safe because the processor call is idempotency-tagged by the engagement id.
    pub async fn capture_for_engagement(
        &self,
        owner: &Participant,
        walker: &Participant,
        engagement: &Engagement,
    ) -> Result<CaptureOutcome, SettlementError> {
        let customer_ref = owner
            .customer_ref
            .as_deref()
            .ok_or_else(|| SettlementError::NoPaymentMethod(owner.participant_id.clone()))?;
        let payee_ref = walker
            .payout_account_ref
            .as_deref()
            .ok_or_else(|| SettlementError::NoPayoutAccount(walker.participant_id.clone()))?;
        let tag = engagement.engagement_id.as_str();
        debug!(
            "💳️ Capturing {} for engagement [{tag}] ({} fee, {} payout)",
            engagement.total, engagement.service_fee, engagement.walker_payout
        );
        let outcome = self
            .processor
            .capture_with_split(customer_ref, engagement.total, payee_ref, engagement.service_fee, tag)
            .await?;
        debug!("💳️ Capture for engagement [{tag}] came back {}", outcome.status);
        Ok(outcome)
    }

    /// Unwinds the walker payout and refunds the owner for the same amount.
    ///
    /// The payout transfer is located by its transfer-group tag; if it cannot be found the refund is refused and
    /// nothing is changed: retrying later is safer than marking an engagement cancelled without its money moving
    /// back. Once the reversal has actually gone through upstream, a retry finds the transfer again and the
    /// processor's idempotency keys make the second reversal and refund no-ops.
    ///
    /// Returns the refunded amount.
    pub async fn refund_for_engagement(&self, engagement: &Engagement) -> Result<Cents, SettlementError> {
        let id = &engagement.engagement_id;
        let charge_ref =
            engagement.charge_ref.as_deref().ok_or_else(|| SettlementError::NotSettled(id.clone()))?;
        let group = engagement.transfer_group.as_deref().unwrap_or(id.as_str());
        let transfer_ref = self
            .processor
            .find_transfer_by_group(group)
            .await?
            .ok_or_else(|| SettlementError::SettlementNotFound(group.to_string()))?;
        let amount = engagement.walker_payout;
        debug!("💳️ Reversing transfer {transfer_ref} and refunding {amount} for engagement [{id}]");
        self.processor.reverse_transfer(&transfer_ref, amount, id.as_str()).await?;
        self.processor.refund_charge(charge_ref, amount, id.as_str()).await?;
        info!("💳️ Refunded {amount} to the owner for engagement [{id}]");
        Ok(amount)
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Participant {0} has no payment method on file")]
    NoPaymentMethod(ParticipantId),
    #[error("Participant {0} has no payout account on file")]
    NoPayoutAccount(ParticipantId),
    #[error("Engagement {0} has no settlement reference")]
    NotSettled(EngagementId),
    #[error("No transfer found for group {0}")]
    SettlementNotFound(String),
    #[error("Payment processor error: {0}")]
    Processor(#[from] ProcessorError),
}
