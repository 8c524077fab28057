use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    db_types::{
        Engagement,
        EngagementId,
        EngagementRef,
        EngagementStatus,
        NewParticipant,
        NewQuote,
        Participant,
        ParticipantId,
        Quote,
        QuoteId,
        Role,
    },
    engagement_flow::EngagementFlowError,
    events::{EventProducers, LifecycleEvent},
    pricing,
    settlement::{split_fee, SettlementApi},
    traits::{MarketplaceDatabase, PaymentProcessor, PushGateway, SettlementUpdate, SideEffect, StoreError},
};

/// `EngagementFlowApi` is the primary API for the walk-request lifecycle: quoting, dispatching a request to a
/// walker, and driving the resulting engagement through acceptance (with payment capture), denial, cancellation
/// (with refund), start and completion.
pub struct EngagementFlowApi<B, P, N> {
    db: B,
    settlement: SettlementApi<P>,
    pusher: N,
    producers: EventProducers,
}

impl<B, P, N> Debug for EngagementFlowApi<B, P, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EngagementFlowApi")
    }
}

impl<B, P, N> EngagementFlowApi<B, P, N> {
    pub fn new(db: B, processor: P, pusher: N, producers: EventProducers) -> Self {
        Self { db, settlement: SettlementApi::new(processor), pusher, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B, P, N> EngagementFlowApi<B, P, N>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    /// Prices a walk and stores the result as a quote.
    ///
    /// A quote is a non-binding estimate: no participant is locked and no external system is touched, so an
    /// unused quote can simply be forgotten.
    pub async fn create_quote(&self, new_quote: NewQuote) -> Result<Quote, EngagementFlowError> {
        if new_quote.owner_id.is_empty() {
            return Err(EngagementFlowError::Validation("An owner id is required".into()));
        }
        if new_quote.walker_id.is_empty() {
            return Err(EngagementFlowError::Validation("A walker id is required".into()));
        }
        let cost = pricing::quote_price(new_quote.dog_count, new_quote.duration_minutes)?;
        let quote = Quote {
            id: QuoteId::random(),
            owner_id: new_quote.owner_id,
            walker_id: new_quote.walker_id,
            dog_count: cost.dog_count,
            tier: cost.tier,
            base: cost.base,
            surcharge: cost.surcharge,
            total: cost.total,
            origin_lat: new_quote.origin_lat,
            origin_lng: new_quote.origin_lng,
            dispatched: false,
            created_at: Utc::now(),
        };
        self.db.insert_quote(&quote).await?;
        debug!("🐾️ Quote [{}] created: {} for {} dogs / {}", quote.id, quote.total, quote.dog_count, quote.tier);
        Ok(quote)
    }

    /// Promotes a quote into a `pending` engagement and notifies the walker.
    ///
    /// The quote is claimed atomically, so a quote can only ever become one engagement. Both participant
    /// back-references are taken before the engagement is written: a walker (or owner) that already carries a
    /// non-terminal engagement makes the dispatch fail with `WalkerUnavailable` (or `OwnerBusy`) and leaves no
    /// trace. If the walk-request push cannot be delivered the engagement is closed as `invalidRequest` rather
    /// than left waiting on a walker who never saw it.
    pub async fn dispatch(&self, quote_id: &QuoteId) -> Result<Engagement, EngagementFlowError> {
        let quote = self.db.claim_quote(quote_id).await.map_err(|e| match e {
            StoreError::QuoteNotFound(id) => EngagementFlowError::QuoteNotFound(id),
            StoreError::QuoteAlreadyDispatched(id) => EngagementFlowError::QuoteAlreadyDispatched(id),
            e => EngagementFlowError::Dependency(e),
        })?;
        let (owner, walker) = match self.load_pair(&quote).await {
            Ok(pair) => pair,
            Err(e) => {
                self.release_quote_quietly(quote_id).await;
                return Err(e);
            },
        };

        let id = EngagementId::random();
        let pending_ref = EngagementRef::new(id.clone(), EngagementStatus::Pending);

        // The walker's back-reference is the contended one; take it first.
        if let Err(e) =
            self.db.compare_and_set_engagement_ref(&walker.participant_id, None, Some(&pending_ref)).await
        {
            self.release_quote_quietly(quote_id).await;
            return Err(match e {
                StoreError::EngagementRefMismatch(_) => EngagementFlowError::WalkerUnavailable,
                e => EngagementFlowError::Dependency(e),
            });
        }
        if let Err(e) =
            self.db.compare_and_set_engagement_ref(&owner.participant_id, None, Some(&pending_ref)).await
        {
            self.clear_ref_quietly(&walker.participant_id, &id, SideEffect::WalkerRef).await;
            self.release_quote_quietly(quote_id).await;
            return Err(match e {
                StoreError::EngagementRefMismatch(_) => EngagementFlowError::OwnerBusy,
                e => EngagementFlowError::Dependency(e),
            });
        }

        let (service_fee, walker_payout) = split_fee(quote.total);
        let now = Utc::now();
        let engagement = Engagement {
            engagement_id: id.clone(),
            quote_id: quote.id.clone(),
            owner_id: owner.participant_id.clone(),
            owner_name: owner.name.clone(),
            owner_rating: owner.rating,
            walker_id: walker.participant_id.clone(),
            walker_name: walker.name.clone(),
            walker_rating: walker.rating,
            dog_count: quote.dog_count,
            tier: quote.tier,
            total: quote.total,
            service_fee,
            walker_payout,
            status: EngagementStatus::Pending,
            charge_ref: None,
            transfer_group: None,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.db.insert_engagement(&engagement).await {
            self.clear_ref_quietly(&owner.participant_id, &id, SideEffect::OwnerRef).await;
            self.clear_ref_quietly(&walker.participant_id, &id, SideEffect::WalkerRef).await;
            self.release_quote_quietly(quote_id).await;
            return Err(EngagementFlowError::Dependency(e));
        }
        info!("🐾️ Engagement [{id}] dispatched to walker {} for quote [{}]", walker.participant_id, quote.id);

        let delivered = self
            .pusher
            .push_message(
                &walker.device_token,
                "New walk request",
                &format!("{} needs a {} walk for {} dog(s)", owner.name, quote.tier, quote.dog_count),
                json!({ "engagementId": id, "status": engagement.status, "total": quote.total }),
            )
            .await;
        if !delivered {
            warn!("🐾️ Walk request push for engagement [{id}] was not delivered; closing as invalidRequest");
            let closed = self
                .db
                .update_engagement_status(&id, EngagementStatus::Pending, EngagementStatus::InvalidRequest, None)
                .await;
            if let Err(e) = closed {
                error!("🐾️ Engagement [{id}] could not be marked invalidRequest: {e}");
            }
            self.clear_ref_quietly(&owner.participant_id, &id, SideEffect::OwnerRef).await;
            self.clear_ref_quietly(&walker.participant_id, &id, SideEffect::WalkerRef).await;
            return Err(EngagementFlowError::NotificationFailed(id));
        }
        Ok(engagement)
    }

    /// The walker's acceptance: capture the owner's payment with an immediate payout split, then promote the
    /// engagement to `accepted`.
    ///
    /// A capture that comes back neither succeeded nor processing closes the engagement as `paymentFailure` and
    /// frees both participants; a payment failure is always recorded in the same state field everything else
    /// reads. A second `accept` of the same engagement is a conflict, never a second capture: the processor call
    /// only happens from `pending`, and the capture itself is idempotency-tagged by the engagement id.
    pub async fn accept(&self, id: &EngagementId) -> Result<Engagement, EngagementFlowError> {
        let engagement = self.fetch_in_state(id, EngagementStatus::Pending).await?;
        let (owner, walker) = self.load_pair_for(&engagement).await?;

        let outcome = match self.settlement.capture_for_engagement(&owner, &walker, &engagement).await {
            Ok(outcome) if outcome.status.is_committed() => outcome,
            Ok(outcome) => {
                error!(
                    "🐾️ Capture for engagement [{id}] was {}; closing as paymentFailure",
                    outcome.status
                );
                self.fail_payment(&engagement).await;
                return Err(EngagementFlowError::PaymentDeclined(id.clone()));
            },
            Err(e) => {
                error!("🐾️ Settlement error accepting engagement [{id}]: {e}; closing as paymentFailure");
                self.fail_payment(&engagement).await;
                return Err(EngagementFlowError::Settlement(e));
            },
        };

        // Money has moved. From here on, a store failure must surface as retriable, never silently lose the
        // captured payment.
        let settlement =
            SettlementUpdate { charge_ref: outcome.charge_ref, transfer_group: id.as_str().to_string() };
        let updated = self
            .db
            .update_engagement_status(id, EngagementStatus::Pending, EngagementStatus::Accepted, Some(settlement))
            .await
            .map_err(|e| match e {
                StoreError::StaleStatus { id, expected, actual } => {
                    // a concurrent accept won the guarded update; the idempotency tag means only one capture
                    // actually happened upstream
                    EngagementFlowError::InvalidTransition { id, expected, actual }
                },
                e => {
                    error!("🐾️ Engagement [{id}] captured but the status row could not be updated: {e}");
                    EngagementFlowError::Reconcile { id: id.clone(), failed: vec![SideEffect::StatusRow] }
                },
            })?;

        let failed = self.advance_refs(&updated, EngagementStatus::Accepted).await;
        info!("🐾️ Engagement [{id}] accepted; captured {} for the owner's walk", updated.total);
        self.publish(updated.clone()).await;
        if failed.is_empty() {
            Ok(updated)
        } else {
            error!("🐾️ Engagement [{id}] accepted but back-references failed: {failed:?}");
            Err(EngagementFlowError::Reconcile { id: id.clone(), failed })
        }
    }

    /// Turns a `pending` request down. Legal for the walker (declining) and for the owner (retracting a request
    /// the walker has not answered yet). No payment has occurred, so denial never touches the processor.
    pub async fn deny(&self, id: &EngagementId, acting_role: Role) -> Result<Engagement, EngagementFlowError> {
        let engagement = self.fetch_in_state(id, EngagementStatus::Pending).await?;
        let updated = self
            .db
            .update_engagement_status(id, EngagementStatus::Pending, EngagementStatus::RequestDenied, None)
            .await
            .map_err(stale_to_transition)?;
        let failed = self.clear_refs(&engagement).await;
        info!("🐾️ Engagement [{id}] denied by the {acting_role}");
        self.publish(updated.clone()).await;
        self.finish(updated, failed)
    }

    /// Calls off an `accepted` engagement, unwinding the walker payout and refunding the owner the same amount.
    ///
    /// An in-progress walk cannot be unilaterally cancelled, and terminal engagements admit no transitions. A
    /// `pending` engagement has no settlement to unwind; deny it instead. If the payout transfer cannot be found
    /// the engagement is left untouched so the cancellation can be retried; marking it cancelled without the
    /// refund would silently keep the owner's money.
    pub async fn cancel(&self, id: &EngagementId, acting_role: Role) -> Result<Engagement, EngagementFlowError> {
        let engagement =
            self.db.fetch_engagement(id).await?.ok_or_else(|| EngagementFlowError::EngagementNotFound(id.clone()))?;
        match engagement.status {
            EngagementStatus::Accepted => {},
            EngagementStatus::Pending => return Err(EngagementFlowError::NotSettled(id.clone())),
            actual => {
                return Err(EngagementFlowError::InvalidTransition {
                    id: id.clone(),
                    expected: EngagementStatus::Accepted,
                    actual,
                })
            },
        }
        let refunded = self.settlement.refund_for_engagement(&engagement).await.map_err(|e| {
            error!("🐾️ Cancellation of engagement [{id}] failed in settlement: {e}; state unchanged");
            EngagementFlowError::Settlement(e)
        })?;
        let updated = self
            .db
            .update_engagement_status(id, EngagementStatus::Accepted, EngagementStatus::Cancelled, None)
            .await
            .map_err(|e| match e {
                StoreError::StaleStatus { id, expected, actual } => {
                    EngagementFlowError::InvalidTransition { id, expected, actual }
                },
                e => {
                    error!("🐾️ Engagement [{id}] refunded {refunded} but the status row could not be updated: {e}");
                    EngagementFlowError::Reconcile { id: id.clone(), failed: vec![SideEffect::StatusRow] }
                },
            })?;
        let failed = self.clear_refs(&updated).await;
        info!("🐾️ Engagement [{id}] cancelled by the {acting_role}; {refunded} refunded to the owner");
        self.publish(updated.clone()).await;
        self.finish(updated, failed)
    }

    /// The walk begins. Legal only from `accepted`.
    pub async fn start(&self, id: &EngagementId, acting_role: Role) -> Result<Engagement, EngagementFlowError> {
        self.fetch_in_state(id, EngagementStatus::Accepted).await?;
        let updated = self
            .db
            .update_engagement_status(id, EngagementStatus::Accepted, EngagementStatus::InProgress, None)
            .await
            .map_err(stale_to_transition)?;
        let failed = self.advance_refs(&updated, EngagementStatus::InProgress).await;
        info!("🐾️ Engagement [{id}] started by the {acting_role}");
        self.publish(updated.clone()).await;
        self.finish(updated, failed)
    }

    /// The walk is over and both participants are free to book again. Only the walker, who is on the ground with
    /// the dogs, may declare a walk complete. Capture and payout happened at acceptance, so completion moves no
    /// money.
    pub async fn complete(&self, id: &EngagementId, acting_role: Role) -> Result<Engagement, EngagementFlowError> {
        if acting_role != Role::Walker {
            return Err(EngagementFlowError::Validation("Only the walker can complete a walk".into()));
        }
        let engagement = self.fetch_in_state(id, EngagementStatus::InProgress).await?;
        let updated = self
            .db
            .update_engagement_status(id, EngagementStatus::InProgress, EngagementStatus::Completed, None)
            .await
            .map_err(stale_to_transition)?;
        let failed = self.clear_refs(&engagement).await;
        info!("🐾️ Engagement [{id}] completed; {} is owed {}", updated.walker_name, updated.walker_payout);
        self.publish(updated.clone()).await;
        self.finish(updated, failed)
    }

    pub async fn engagement(&self, id: &EngagementId) -> Result<Option<Engagement>, EngagementFlowError> {
        Ok(self.db.fetch_engagement(id).await?)
    }

    pub async fn register_participant(
        &self,
        participant: NewParticipant,
    ) -> Result<Participant, EngagementFlowError> {
        Ok(self.db.upsert_participant(participant).await?)
    }

    // ------------------------------------------ internal helpers ------------------------------------------

    async fn fetch_in_state(
        &self,
        id: &EngagementId,
        expected: EngagementStatus,
    ) -> Result<Engagement, EngagementFlowError> {
        let engagement =
            self.db.fetch_engagement(id).await?.ok_or_else(|| EngagementFlowError::EngagementNotFound(id.clone()))?;
        if engagement.status != expected {
            return Err(EngagementFlowError::InvalidTransition {
                id: id.clone(),
                expected,
                actual: engagement.status,
            });
        }
        Ok(engagement)
    }

    async fn load_pair(&self, quote: &Quote) -> Result<(Participant, Participant), EngagementFlowError> {
        let owner = self
            .db
            .fetch_participant(&quote.owner_id)
            .await?
            .ok_or_else(|| EngagementFlowError::ParticipantNotFound(quote.owner_id.clone()))?;
        let walker = self
            .db
            .fetch_participant(&quote.walker_id)
            .await?
            .ok_or_else(|| EngagementFlowError::ParticipantNotFound(quote.walker_id.clone()))?;
        Ok((owner, walker))
    }

    async fn load_pair_for(
        &self,
        engagement: &Engagement,
    ) -> Result<(Participant, Participant), EngagementFlowError> {
        let owner = self
            .db
            .fetch_participant(&engagement.owner_id)
            .await?
            .ok_or_else(|| EngagementFlowError::ParticipantNotFound(engagement.owner_id.clone()))?;
        let walker = self
            .db
            .fetch_participant(&engagement.walker_id)
            .await?
            .ok_or_else(|| EngagementFlowError::ParticipantNotFound(engagement.walker_id.clone()))?;
        Ok((owner, walker))
    }

    /// Closes a pending engagement as `paymentFailure` and frees both participants. Called after a failed
    /// capture; nothing was charged, so store failures here are logged rather than escalated.
    async fn fail_payment(&self, engagement: &Engagement) {
        let id = &engagement.engagement_id;
        match self
            .db
            .update_engagement_status(id, EngagementStatus::Pending, EngagementStatus::PaymentFailure, None)
            .await
        {
            Ok(updated) => {
                let failed = self.clear_refs(engagement).await;
                if !failed.is_empty() {
                    error!("🐾️ Back-references not cleared after paymentFailure on [{id}]: {failed:?}");
                }
                self.publish(updated).await;
            },
            Err(e) => error!("🐾️ Engagement [{id}] could not be marked paymentFailure: {e}"),
        }
    }

    /// Best-effort batch: advance both back-references to the engagement's new status, collecting rather than
    /// short-circuiting on failure so the caller knows exactly which side needs reconciliation.
    async fn advance_refs(&self, engagement: &Engagement, status: EngagementStatus) -> Vec<SideEffect> {
        let id = &engagement.engagement_id;
        let new_ref = EngagementRef::new(id.clone(), status);
        let mut failed = Vec::new();
        for (pid, side) in
            [(&engagement.owner_id, SideEffect::OwnerRef), (&engagement.walker_id, SideEffect::WalkerRef)]
        {
            if let Err(e) = self.db.compare_and_set_engagement_ref(pid, Some(id), Some(&new_ref)).await {
                error!("🐾️ Could not advance the {side} for engagement [{id}]: {e}");
                failed.push(side);
            }
        }
        failed
    }

    /// Best-effort batch: clear both back-references. A reference that no longer points at this engagement counts
    /// as already cleared.
    async fn clear_refs(&self, engagement: &Engagement) -> Vec<SideEffect> {
        let id = &engagement.engagement_id;
        let mut failed = Vec::new();
        for (pid, side) in
            [(&engagement.owner_id, SideEffect::OwnerRef), (&engagement.walker_id, SideEffect::WalkerRef)]
        {
            match self.db.compare_and_set_engagement_ref(pid, Some(id), None).await {
                Ok(()) | Err(StoreError::EngagementRefMismatch(_)) => {},
                Err(e) => {
                    error!("🐾️ Could not clear the {side} for engagement [{id}]: {e}");
                    failed.push(side);
                },
            }
        }
        failed
    }

    async fn clear_ref_quietly(&self, pid: &ParticipantId, id: &EngagementId, side: SideEffect) {
        match self.db.compare_and_set_engagement_ref(pid, Some(id), None).await {
            Ok(()) | Err(StoreError::EngagementRefMismatch(_)) => {},
            Err(e) => error!("🐾️ Could not roll back the {side} for engagement [{id}]: {e}"),
        }
    }

    async fn release_quote_quietly(&self, quote_id: &QuoteId) {
        if let Err(e) = self.db.release_quote(quote_id).await {
            error!("🐾️ Could not release quote [{quote_id}] after a failed dispatch: {e}");
        }
    }

    async fn publish(&self, engagement: Engagement) {
        trace!("📬️ Publishing {} to room [{}]", engagement.status, engagement.engagement_id);
        self.producers.publish(LifecycleEvent::new(engagement)).await;
    }

    fn finish(&self, engagement: Engagement, failed: Vec<SideEffect>) -> Result<Engagement, EngagementFlowError> {
        if failed.is_empty() {
            Ok(engagement)
        } else {
            Err(EngagementFlowError::Reconcile { id: engagement.engagement_id, failed })
        }
    }
}

fn stale_to_transition(e: StoreError) -> EngagementFlowError {
    match e {
        StoreError::StaleStatus { id, expected, actual } => {
            EngagementFlowError::InvalidTransition { id, expected, actual }
        },
        e => EngagementFlowError::Dependency(e),
    }
}
