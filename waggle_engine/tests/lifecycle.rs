//! End-to-end exercises of the walk-request lifecycle against a real SQLite store, with scriptable payment
//! processor and push gateway doubles.
use std::{future::Future, pin::Pin, sync::Arc, sync::Mutex};

use waggle_engine::{
    db_types::{EngagementStatus, NewQuote, ParticipantId, Role},
    events::{EventHub, EventProducers, LifecycleEvent},
    EngagementFlowError,
    MarketplaceDatabase,
};
use wgl_common::Cents;

mod support;

use support::{setup, setup_with_producers, tear_down, TestRig};

#[tokio::test]
async fn create_quote_prices_and_persists() {
    let rig = setup().await;
    rig.seed_owner("O1", "Ada").await;
    rig.seed_walker("W1", "Grace").await;
    let quote = rig.quote("O1", "W1").await;
    // base(30) = $28.99 + 2 × $4.99
    assert_eq!(quote.total, Cents::new(3897));
    assert_eq!(quote.base, Cents::new(2899));
    assert_eq!(quote.surcharge, Cents::new(998));
    assert!(!quote.dispatched);
    let stored = rig.db.fetch_quote(&quote.id).await.unwrap().expect("quote should be stored");
    assert_eq!(stored.total, quote.total);
    // quoting locks nobody
    assert!(rig.participant("O1").await.engagement_ref().is_none());
    assert!(rig.participant("W1").await.engagement_ref().is_none());
    tear_down(rig).await;
}

#[tokio::test]
async fn create_quote_rejects_bad_input() {
    let rig = setup().await;
    let bad_owner = rig
        .api
        .create_quote(NewQuote {
            owner_id: ParticipantId::from("  "),
            walker_id: ParticipantId::from("W1"),
            dog_count: 1,
            duration_minutes: 30,
            origin_lat: 0.0,
            origin_lng: 0.0,
        })
        .await;
    assert!(matches!(bad_owner, Err(EngagementFlowError::Validation(_))));
    let too_many_dogs = rig
        .api
        .create_quote(NewQuote {
            owner_id: ParticipantId::from("O1"),
            walker_id: ParticipantId::from("W1"),
            dog_count: 5,
            duration_minutes: 30,
            origin_lat: 0.0,
            origin_lng: 0.0,
        })
        .await;
    assert!(matches!(too_many_dogs, Err(EngagementFlowError::Pricing(_))));
    let odd_duration = rig
        .api
        .create_quote(NewQuote {
            owner_id: ParticipantId::from("O1"),
            walker_id: ParticipantId::from("W1"),
            dog_count: 1,
            duration_minutes: 45,
            origin_lat: 0.0,
            origin_lng: 0.0,
        })
        .await;
    assert!(matches!(odd_duration, Err(EngagementFlowError::Pricing(_))));
    tear_down(rig).await;
}

#[tokio::test]
async fn dispatch_creates_pending_engagement_and_notifies_walker() {
    let rig = setup().await;
    let engagement = rig.pending("O1", "W1").await;
    assert_eq!(engagement.status, EngagementStatus::Pending);
    assert_eq!(engagement.owner_name, "Owner O1");
    assert_eq!(engagement.walker_name, "Walker W1");
    assert_eq!(engagement.total, Cents::new(3897));
    assert_eq!(engagement.service_fee, Cents::new(1169));
    assert_eq!(engagement.walker_payout, Cents::new(2728));
    assert!(engagement.charge_ref.is_none());

    // both back-references now point at the pending engagement
    for pid in ["O1", "W1"] {
        let r = rig.participant(pid).await.engagement_ref().expect("back-reference should be set");
        assert_eq!(r.engagement_id, engagement.engagement_id);
        assert_eq!(r.status, EngagementStatus::Pending);
    }

    let pushed = rig.pusher.pushed();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].device_token, "device-W1");
    assert_eq!(pushed[0].title, "New walk request");
    tear_down(rig).await;
}

#[tokio::test]
async fn a_quote_dispatches_at_most_once() {
    let rig = setup().await;
    rig.seed_owner("O1", "Ada").await;
    rig.seed_walker("W1", "Grace").await;
    let quote = rig.quote("O1", "W1").await;
    rig.api.dispatch(&quote.id).await.unwrap();
    let again = rig.api.dispatch(&quote.id).await;
    assert!(matches!(again, Err(EngagementFlowError::QuoteAlreadyDispatched(id)) if id == quote.id));
    tear_down(rig).await;
}

#[tokio::test]
async fn dispatch_fails_when_walker_is_busy() {
    let rig = setup().await;
    rig.pending("O1", "W1").await;
    // a second owner wants the same walker
    rig.seed_owner("O2", "Barbara").await;
    let quote = rig.quote("O2", "W1").await;
    let result = rig.api.dispatch(&quote.id).await;
    assert!(matches!(result, Err(EngagementFlowError::WalkerUnavailable)));
    // no trace left behind: the second owner is free and the quote can be retried later
    assert!(rig.participant("O2").await.engagement_ref().is_none());
    let quote = rig.db.fetch_quote(&quote.id).await.unwrap().unwrap();
    assert!(!quote.dispatched);
    assert_eq!(rig.pusher.pushed().len(), 1);
    tear_down(rig).await;
}

#[tokio::test]
async fn dispatch_fails_when_owner_is_busy() {
    let rig = setup().await;
    rig.pending("O1", "W1").await;
    rig.seed_walker("W2", "Katherine").await;
    let quote = rig.quote("O1", "W2").await;
    let result = rig.api.dispatch(&quote.id).await;
    assert!(matches!(result, Err(EngagementFlowError::OwnerBusy)));
    // the walker reference taken first was rolled back
    assert!(rig.participant("W2").await.engagement_ref().is_none());
    tear_down(rig).await;
}

#[tokio::test]
async fn undeliverable_push_closes_the_request() {
    let rig = setup().await;
    rig.seed_owner("O1", "Ada").await;
    rig.seed_walker("W1", "Grace").await;
    rig.pusher.fail_deliveries();
    let quote = rig.quote("O1", "W1").await;
    let result = rig.api.dispatch(&quote.id).await;
    let id = match result {
        Err(EngagementFlowError::NotificationFailed(id)) => id,
        other => panic!("expected NotificationFailed, got {other:?}"),
    };
    let engagement = rig.db.fetch_engagement(&id).await.unwrap().unwrap();
    assert_eq!(engagement.status, EngagementStatus::InvalidRequest);
    assert!(rig.participant("O1").await.engagement_ref().is_none());
    assert!(rig.participant("W1").await.engagement_ref().is_none());
    tear_down(rig).await;
}

#[tokio::test]
async fn accept_captures_with_split_and_stores_the_settlement() {
    let rig = setup().await;
    let engagement = rig.accepted("O1", "W1").await;
    let id = &engagement.engagement_id;
    assert_eq!(engagement.status, EngagementStatus::Accepted);
    assert_eq!(engagement.charge_ref.as_deref(), Some(format!("ch_{id}").as_str()));
    assert_eq!(engagement.transfer_group.as_deref(), Some(id.as_str()));

    let captures = rig.processor.captures();
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].customer_ref, "cus_O1");
    assert_eq!(captures[0].payee_ref, "acct_W1");
    assert_eq!(captures[0].amount, Cents::new(3897));
    assert_eq!(captures[0].fee, Cents::new(1169));
    assert_eq!(captures[0].tag, id.as_str());

    for pid in ["O1", "W1"] {
        let r = rig.participant(pid).await.engagement_ref().unwrap();
        assert_eq!(r.status, EngagementStatus::Accepted);
    }
    tear_down(rig).await;
}

#[tokio::test]
async fn accepting_twice_is_a_conflict_not_a_second_capture() {
    let rig = setup().await;
    let engagement = rig.accepted("O1", "W1").await;
    let again = rig.api.accept(&engagement.engagement_id).await;
    assert!(matches!(again, Err(EngagementFlowError::InvalidTransition { .. })));
    assert_eq!(rig.processor.captures().len(), 1);
    tear_down(rig).await;
}

#[tokio::test]
async fn declined_capture_becomes_payment_failure() {
    let rig = setup().await;
    let engagement = rig.pending("O1", "W1").await;
    rig.processor.decline_captures();
    let result = rig.api.accept(&engagement.engagement_id).await;
    assert!(matches!(result, Err(EngagementFlowError::PaymentDeclined(_))));
    let stored = rig.db.fetch_engagement(&engagement.engagement_id).await.unwrap().unwrap();
    assert_eq!(stored.status, EngagementStatus::PaymentFailure);
    assert!(stored.charge_ref.is_none(), "no settlement reference may be stored on a failed capture");
    assert!(rig.participant("O1").await.engagement_ref().is_none());
    assert!(rig.participant("W1").await.engagement_ref().is_none());
    tear_down(rig).await;
}

#[tokio::test]
async fn unreachable_processor_also_becomes_payment_failure() {
    let rig = setup().await;
    let engagement = rig.pending("O1", "W1").await;
    rig.processor.go_offline();
    let result = rig.api.accept(&engagement.engagement_id).await;
    assert!(matches!(result, Err(EngagementFlowError::Settlement(_))));
    let stored = rig.db.fetch_engagement(&engagement.engagement_id).await.unwrap().unwrap();
    assert_eq!(stored.status, EngagementStatus::PaymentFailure);
    tear_down(rig).await;
}

#[tokio::test]
async fn deny_frees_both_participants_without_touching_payment() {
    let rig = setup().await;
    let engagement = rig.pending("O1", "W1").await;
    let denied = rig.api.deny(&engagement.engagement_id, Role::Walker).await.unwrap();
    assert_eq!(denied.status, EngagementStatus::RequestDenied);
    assert!(rig.participant("O1").await.engagement_ref().is_none());
    assert!(rig.participant("W1").await.engagement_ref().is_none());
    assert!(rig.processor.captures().is_empty());
    tear_down(rig).await;
}

#[tokio::test]
async fn an_owner_can_retract_a_pending_request() {
    let rig = setup().await;
    let engagement = rig.pending("O1", "W1").await;
    let denied = rig.api.deny(&engagement.engagement_id, Role::Owner).await.unwrap();
    assert_eq!(denied.status, EngagementStatus::RequestDenied);
    tear_down(rig).await;
}

#[tokio::test]
async fn cancel_refunds_exactly_the_walker_payout() {
    let rig = setup().await;
    let engagement = rig.accepted("O1", "W1").await;
    let id = &engagement.engagement_id;
    let cancelled = rig.api.cancel(id, Role::Owner).await.unwrap();
    assert_eq!(cancelled.status, EngagementStatus::Cancelled);
    assert_eq!(rig.processor.reversals(), vec![(format!("tr_{id}"), Cents::new(2728))]);
    assert_eq!(rig.processor.refunds(), vec![(format!("ch_{id}"), Cents::new(2728))]);
    assert!(rig.participant("O1").await.engagement_ref().is_none());
    assert!(rig.participant("W1").await.engagement_ref().is_none());
    tear_down(rig).await;
}

#[tokio::test]
async fn cancel_needs_a_settlement_to_unwind() {
    let rig = setup().await;
    let engagement = rig.pending("O1", "W1").await;
    let result = rig.api.cancel(&engagement.engagement_id, Role::Owner).await;
    assert!(matches!(result, Err(EngagementFlowError::NotSettled(_))));
    tear_down(rig).await;
}

#[tokio::test]
async fn an_in_progress_walk_cannot_be_cancelled() {
    let rig = setup().await;
    let engagement = rig.accepted("O1", "W1").await;
    rig.api.start(&engagement.engagement_id, Role::Walker).await.unwrap();
    let result = rig.api.cancel(&engagement.engagement_id, Role::Owner).await;
    assert!(matches!(result, Err(EngagementFlowError::InvalidTransition { .. })));
    tear_down(rig).await;
}

#[tokio::test]
async fn cancel_with_a_missing_transfer_changes_nothing() {
    let rig = setup().await;
    let engagement = rig.accepted("O1", "W1").await;
    let id = &engagement.engagement_id;
    rig.processor.forget_transfer(id.as_str());
    let result = rig.api.cancel(id, Role::Owner).await;
    assert!(matches!(result, Err(EngagementFlowError::Settlement(_))));
    // safer to retry than to mark cancelled without the refund
    let stored = rig.db.fetch_engagement(id).await.unwrap().unwrap();
    assert_eq!(stored.status, EngagementStatus::Accepted);
    assert!(rig.participant("O1").await.engagement_ref().is_some());
    assert!(rig.processor.refunds().is_empty());
    tear_down(rig).await;
}

#[tokio::test]
async fn start_then_complete_frees_the_pair_for_new_walks() {
    let rig = setup().await;
    let engagement = rig.accepted("O1", "W1").await;
    let id = &engagement.engagement_id;

    let started = rig.api.start(id, Role::Walker).await.unwrap();
    assert_eq!(started.status, EngagementStatus::InProgress);
    for pid in ["O1", "W1"] {
        assert_eq!(rig.participant(pid).await.engagement_ref().unwrap().status, EngagementStatus::InProgress);
    }

    let completed = rig.api.complete(id, Role::Walker).await.unwrap();
    assert_eq!(completed.status, EngagementStatus::Completed);
    assert!(rig.participant("O1").await.engagement_ref().is_none());
    assert!(rig.participant("W1").await.engagement_ref().is_none());
    // completion settles nothing; the capture at accept time stands
    assert!(rig.processor.reversals().is_empty());
    assert!(rig.processor.refunds().is_empty());

    // both are free to engage again
    rig.seed_owner("O2", "Barbara").await;
    let quote = rig.quote("O2", "W1").await;
    assert!(rig.api.dispatch(&quote.id).await.is_ok());
    tear_down(rig).await;
}

#[tokio::test]
async fn only_the_walker_may_complete_a_walk() {
    let rig = setup().await;
    let engagement = rig.accepted("O1", "W1").await;
    rig.api.start(&engagement.engagement_id, Role::Walker).await.unwrap();
    let result = rig.api.complete(&engagement.engagement_id, Role::Owner).await;
    assert!(matches!(result, Err(EngagementFlowError::Validation(_))));
    let stored = rig.db.fetch_engagement(&engagement.engagement_id).await.unwrap().unwrap();
    assert_eq!(stored.status, EngagementStatus::InProgress);
    tear_down(rig).await;
}

#[tokio::test]
async fn complete_is_only_legal_from_in_progress() {
    let rig = setup().await;
    let engagement = rig.accepted("O1", "W1").await;
    let result = rig.api.complete(&engagement.engagement_id, Role::Walker).await;
    assert!(matches!(result, Err(EngagementFlowError::InvalidTransition { .. })));
    tear_down(rig).await;
}

#[tokio::test]
async fn every_transition_reaches_the_event_room() {
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    let hook = Arc::new(move |event: LifecycleEvent| {
        let sink = sink.clone();
        Box::pin(async move {
            sink.lock().unwrap().push((event.room.clone(), event.status));
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let hub = EventHub::new(32, hook);
    let producers = EventProducers { lifecycle: vec![hub.subscribe()] };

    let rig = setup_with_producers(producers).await;
    let engagement = rig.accepted("O1", "W1").await;
    let id = engagement.engagement_id.clone();
    rig.api.start(&id, Role::Walker).await.unwrap();
    rig.api.complete(&id, Role::Walker).await.unwrap();

    let TestRig { db, api, .. } = rig;
    drop(api);
    hub.run().await;

    let observed = observed.lock().unwrap().clone();
    let statuses: Vec<_> = observed.iter().map(|(_, s)| *s).collect();
    assert_eq!(
        statuses,
        vec![EngagementStatus::Accepted, EngagementStatus::InProgress, EngagementStatus::Completed]
    );
    assert!(observed.iter().all(|(room, _)| *room == id), "all events belong to the engagement's room");
    support::prepare_env::destroy_test_env(db).await;
}
