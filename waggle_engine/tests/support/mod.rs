#![allow(dead_code)]
pub mod doubles;
pub mod prepare_env;

use self::doubles::{TestProcessor, TestPusher};
use waggle_engine::{
    db_types::{Engagement, NewParticipant, NewQuote, Participant, ParticipantId, Quote, Role},
    events::EventProducers,
    EngagementFlowApi,
    MarketplaceDatabase,
    SqliteDatabase,
};

pub type TestApi = EngagementFlowApi<SqliteDatabase, TestProcessor, TestPusher>;

pub struct TestRig {
    pub db: SqliteDatabase,
    pub processor: TestProcessor,
    pub pusher: TestPusher,
    pub api: TestApi,
}

pub async fn setup() -> TestRig {
    setup_with_producers(EventProducers::default()).await
}

pub async fn setup_with_producers(producers: EventProducers) -> TestRig {
    let url = prepare_env::random_db_path();
    let db = prepare_env::prepare_test_env(&url).await;
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let api = EngagementFlowApi::new(db.clone(), processor.clone(), pusher.clone(), producers);
    TestRig { db, processor, pusher, api }
}

pub async fn tear_down(rig: TestRig) {
    prepare_env::destroy_test_env(rig.db).await;
}

impl TestRig {
    pub async fn seed_owner(&self, id: &str, name: &str) -> Participant {
        self.db
            .upsert_participant(NewParticipant {
                participant_id: ParticipantId::from(id),
                name: name.to_string(),
                role: Role::Owner,
                rating: 4.8,
                device_token: format!("device-{id}"),
                customer_ref: Some(format!("cus_{id}")),
                payout_account_ref: None,
            })
            .await
            .expect("Error seeding owner")
    }

    pub async fn seed_walker(&self, id: &str, name: &str) -> Participant {
        self.db
            .upsert_participant(NewParticipant {
                participant_id: ParticipantId::from(id),
                name: name.to_string(),
                role: Role::Walker,
                rating: 4.9,
                device_token: format!("device-{id}"),
                customer_ref: None,
                payout_account_ref: Some(format!("acct_{id}")),
            })
            .await
            .expect("Error seeding walker")
    }

    /// A standard two-dog, half-hour quote between the given pair.
    pub async fn quote(&self, owner_id: &str, walker_id: &str) -> Quote {
        self.api
            .create_quote(NewQuote {
                owner_id: ParticipantId::from(owner_id),
                walker_id: ParticipantId::from(walker_id),
                dog_count: 2,
                duration_minutes: 30,
                origin_lat: 40.7484,
                origin_lng: -73.9857,
            })
            .await
            .expect("Error creating quote")
    }

    /// Quote + dispatch: a `pending` engagement between a freshly seeded pair.
    pub async fn pending(&self, owner_id: &str, walker_id: &str) -> Engagement {
        self.seed_owner(owner_id, &format!("Owner {owner_id}")).await;
        self.seed_walker(walker_id, &format!("Walker {walker_id}")).await;
        let quote = self.quote(owner_id, walker_id).await;
        self.api.dispatch(&quote.id).await.expect("Error dispatching quote")
    }

    pub async fn accepted(&self, owner_id: &str, walker_id: &str) -> Engagement {
        let engagement = self.pending(owner_id, walker_id).await;
        self.api.accept(&engagement.engagement_id).await.expect("Error accepting engagement")
    }

    pub async fn participant(&self, id: &str) -> Participant {
        self.db
            .fetch_participant(&ParticipantId::from(id))
            .await
            .expect("Error fetching participant")
            .expect("Participant should exist")
    }
}
