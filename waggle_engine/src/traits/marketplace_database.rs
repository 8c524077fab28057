use thiserror::Error;

use crate::{
    db_types::{
        Engagement,
        EngagementId,
        EngagementRef,
        EngagementStatus,
        NewParticipant,
        Participant,
        ParticipantId,
        Quote,
        QuoteId,
    },
    traits::SettlementUpdate,
};

/// Storage behaviour a backend must expose to support the lifecycle engine.
///
/// Every method is a single-record operation the backend applies atomically. The engine composes them; it never
/// asks the store for multi-record transactions, and it is the only writer of engagements and back-references.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a freshly priced quote.
    async fn insert_quote(&self, quote: &Quote) -> Result<(), StoreError>;

    async fn fetch_quote(&self, id: &QuoteId) -> Result<Option<Quote>, StoreError>;

    /// Atomically claims a quote for promotion into an engagement.
    ///
    /// A quote can be claimed exactly once; a second claim fails with [`StoreError::QuoteAlreadyDispatched`] even
    /// when the two claims race. Returns the claimed quote.
    async fn claim_quote(&self, id: &QuoteId) -> Result<Quote, StoreError>;

    /// Releases a claimed quote after a dispatch that failed before creating the engagement, so the owner can
    /// re-dispatch once the conflict clears.
    async fn release_quote(&self, id: &QuoteId) -> Result<(), StoreError>;

    async fn insert_engagement(&self, engagement: &Engagement) -> Result<(), StoreError>;

    async fn fetch_engagement(&self, id: &EngagementId) -> Result<Option<Engagement>, StoreError>;

    /// Applies a guarded status transition: the row is updated only if its current status equals `expected`.
    ///
    /// A row in any other state fails with [`StoreError::StaleStatus`] and is left untouched, which is what makes
    /// every lifecycle transition at-most-once under concurrent callers. `settlement`, when present, stores the
    /// charge reference and transfer group alongside the new status.
    ///
    /// Returns the updated engagement.
    async fn update_engagement_status(
        &self,
        id: &EngagementId,
        expected: EngagementStatus,
        new: EngagementStatus,
        settlement: Option<SettlementUpdate>,
    ) -> Result<Engagement, StoreError>;

    /// Creates or refreshes a participant profile. Never touches the back-reference columns; those belong to the
    /// lifecycle engine alone.
    async fn upsert_participant(&self, participant: NewParticipant) -> Result<Participant, StoreError>;

    async fn fetch_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError>;

    /// Compare-and-set on the participant's engagement back-reference.
    ///
    /// The update applies only if the participant's current engagement id equals `expected` (`None` meaning "no
    /// current engagement"); otherwise it fails with [`StoreError::EngagementRefMismatch`] and changes nothing.
    /// Two concurrent dispatches against one free walker therefore produce exactly one winner.
    async fn compare_and_set_engagement_ref(
        &self,
        id: &ParticipantId,
        expected: Option<&EngagementId>,
        new: Option<&EngagementRef>,
    ) -> Result<(), StoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Quote {0} does not exist")]
    QuoteNotFound(QuoteId),
    #[error("Quote {0} has already been dispatched")]
    QuoteAlreadyDispatched(QuoteId),
    #[error("Engagement {0} does not exist")]
    EngagementNotFound(EngagementId),
    #[error("Participant {0} does not exist")]
    ParticipantNotFound(ParticipantId),
    #[error("Engagement {id} is {actual}, not {expected}")]
    StaleStatus { id: EngagementId, expected: EngagementStatus, actual: EngagementStatus },
    #[error("Back-reference for participant {0} did not match the expected engagement")]
    EngagementRefMismatch(ParticipantId),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}
