use std::fmt::Debug;

use log::*;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use super::{engagements, participants, quotes};
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
    traits::{MarketplaceDatabase, SettlementUpdate, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connect to the database at `url`. The database file must already exist (or the url must carry
    /// `?mode=rwc`); migrations are applied separately via [`Self::run_migrations`].
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        info!("🗃️ Migrations complete");
        Ok(())
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_quote(&self, quote: &Quote) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        quotes::insert(quote, &mut conn).await?;
        debug!("🗃️ Quote [{}] saved", quote.id);
        Ok(())
    }

    async fn fetch_quote(&self, id: &QuoteId) -> Result<Option<Quote>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        quotes::fetch(id, &mut conn).await
    }

    async fn claim_quote(&self, id: &QuoteId) -> Result<Quote, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let quote = quotes::claim(id, &mut conn).await?;
        debug!("🗃️ Quote [{id}] claimed for dispatch");
        Ok(quote)
    }

    async fn release_quote(&self, id: &QuoteId) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        quotes::release(id, &mut conn).await?;
        debug!("🗃️ Quote [{id}] released");
        Ok(())
    }

    async fn insert_engagement(&self, engagement: &Engagement) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        engagements::insert(engagement, &mut conn).await?;
        debug!("🗃️ Engagement [{}] saved", engagement.engagement_id);
        Ok(())
    }

    async fn fetch_engagement(&self, id: &EngagementId) -> Result<Option<Engagement>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        engagements::fetch(id, &mut conn).await
    }

    async fn update_engagement_status(
        &self,
        id: &EngagementId,
        expected: EngagementStatus,
        new: EngagementStatus,
        settlement: Option<SettlementUpdate>,
    ) -> Result<Engagement, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = engagements::update_status(id, expected, new, settlement.as_ref(), &mut conn).await?;
        debug!("🗃️ Engagement [{id}] moved {expected} → {new}");
        Ok(updated)
    }

    async fn upsert_participant(&self, participant: NewParticipant) -> Result<Participant, StoreError> {
        let mut conn = self.pool.acquire().await?;
        participants::upsert(&participant, &mut conn).await
    }

    async fn fetch_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        participants::fetch(id, &mut conn).await
    }

    async fn compare_and_set_engagement_ref(
        &self,
        id: &ParticipantId,
        expected: Option<&EngagementId>,
        new: Option<&EngagementRef>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        participants::compare_and_set_ref(id, expected, new, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}
