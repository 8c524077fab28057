//! Concurrency and bookkeeping invariants: one active engagement per participant, back-references tracking
//! engagement state exactly, and the fee split never gaining or losing a cent.
use rand::Rng;
use waggle_engine::{
    db_types::{EngagementStatus, Role},
    settlement::split_fee,
    EngagementFlowError,
};
use wgl_common::Cents;

mod support;

use support::{setup, tear_down};

#[tokio::test]
async fn two_dispatches_for_one_walker_have_exactly_one_winner() {
    let rig = setup().await;
    rig.seed_owner("O1", "Ada").await;
    rig.seed_owner("O2", "Barbara").await;
    rig.seed_walker("W1", "Grace").await;
    let q1 = rig.quote("O1", "W1").await;
    let q2 = rig.quote("O2", "W1").await;

    let (r1, r2) = futures_util::future::join(rig.api.dispatch(&q1.id), rig.api.dispatch(&q2.id)).await;
    let winners = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one dispatch may win the walker");
    let loser = if r1.is_ok() { r2 } else { r1 };
    assert!(matches!(loser, Err(EngagementFlowError::WalkerUnavailable)));
    tear_down(rig).await;
}

#[tokio::test]
async fn concurrent_accepts_capture_once() {
    let rig = setup().await;
    let engagement = rig.pending("O1", "W1").await;
    let id = engagement.engagement_id.clone();
    let (r1, r2) = futures_util::future::join(rig.api.accept(&id), rig.api.accept(&id)).await;
    let accepted = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1, "exactly one accept may win the transition");
    assert_eq!(rig.processor.captures().len(), 1, "the engagement may only be captured once");
    tear_down(rig).await;
}

#[tokio::test]
async fn back_references_exist_exactly_while_the_engagement_is_live() {
    let rig = setup().await;
    let engagement = rig.pending("O1", "W1").await;
    let id = engagement.engagement_id.clone();

    let assert_refs = |expected: Option<EngagementStatus>| {
        let rig = &rig;
        let id = id.clone();
        async move {
            for pid in ["O1", "W1"] {
                let r = rig.participant(pid).await.engagement_ref();
                match expected {
                    Some(status) => {
                        let r = r.expect("back-reference should be set while the engagement is live");
                        assert_eq!(r.engagement_id, id);
                        assert_eq!(r.status, status);
                    },
                    None => assert!(r.is_none(), "back-reference should be clear in a terminal state"),
                }
            }
        }
    };

    assert_refs(Some(EngagementStatus::Pending)).await;
    rig.api.accept(&id).await.unwrap();
    assert_refs(Some(EngagementStatus::Accepted)).await;
    rig.api.start(&id, Role::Walker).await.unwrap();
    assert_refs(Some(EngagementStatus::InProgress)).await;
    rig.api.complete(&id, Role::Walker).await.unwrap();
    assert_refs(None).await;
    tear_down(rig).await;
}

#[tokio::test]
async fn settlement_reference_exists_iff_accepted() {
    let rig = setup().await;

    let pending = rig.pending("O1", "W1").await;
    assert!(pending.charge_ref.is_none());
    let denied = rig.api.deny(&pending.engagement_id, Role::Walker).await.unwrap();
    assert!(denied.charge_ref.is_none());

    rig.seed_owner("O2", "Barbara").await;
    rig.seed_walker("W2", "Katherine").await;
    let accepted = rig.accepted("O2", "W2").await;
    assert!(accepted.charge_ref.is_some());
    assert!(accepted.transfer_group.is_some());
    // the reference survives into later states
    let completed = {
        rig.api.start(&accepted.engagement_id, Role::Walker).await.unwrap();
        rig.api.complete(&accepted.engagement_id, Role::Walker).await.unwrap()
    };
    assert_eq!(completed.charge_ref, accepted.charge_ref);
    tear_down(rig).await;
}

#[test]
fn no_cent_is_gained_or_lost_across_random_totals() {
    let mut rng = rand::thread_rng();
    for _ in 0..10_000 {
        let total = Cents::new(rng.gen_range(1..=1_000_000));
        let (fee, payout) = split_fee(total);
        assert_eq!(fee + payout, total, "split of {total} does not partition");
        assert!(fee >= Cents::new(0) && payout >= Cents::new(0));
    }
}
