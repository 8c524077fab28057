use sqlx::SqliteConnection;

use crate::{
    db_types::{Quote, QuoteId},
    traits::StoreError,
};

pub(crate) async fn insert(quote: &Quote, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO quotes (
                id, owner_id, walker_id, dog_count, tier,
                base, surcharge, total, origin_lat, origin_lng,
                dispatched, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12);
        "#,
    )
    .bind(&quote.id)
    .bind(&quote.owner_id)
    .bind(&quote.walker_id)
    .bind(quote.dog_count)
    .bind(quote.tier)
    .bind(quote.base)
    .bind(quote.surcharge)
    .bind(quote.total)
    .bind(quote.origin_lat)
    .bind(quote.origin_lng)
    .bind(quote.dispatched)
    .bind(quote.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn fetch(id: &QuoteId, conn: &mut SqliteConnection) -> Result<Option<Quote>, StoreError> {
    let quote = sqlx::query_as::<_, Quote>(
        r#"
            SELECT id, owner_id, walker_id, dog_count, tier,
                   base, surcharge, total, origin_lat, origin_lng,
                   dispatched, created_at
            FROM quotes WHERE id = $1;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(quote)
}

/// Flips the dispatch flag if and only if it was unset. The single conditional UPDATE is what makes quote
/// promotion at-most-once under racing dispatchers.
pub(crate) async fn claim(id: &QuoteId, conn: &mut SqliteConnection) -> Result<Quote, StoreError> {
    let result = sqlx::query("UPDATE quotes SET dispatched = 1 WHERE id = $1 AND dispatched = 0")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return match fetch(id, conn).await? {
            Some(_) => Err(StoreError::QuoteAlreadyDispatched(id.clone())),
            None => Err(StoreError::QuoteNotFound(id.clone())),
        };
    }
    fetch(id, conn).await?.ok_or_else(|| StoreError::QuoteNotFound(id.clone()))
}

pub(crate) async fn release(id: &QuoteId, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query("UPDATE quotes SET dispatched = 0 WHERE id = $1").bind(id).execute(conn).await?;
    Ok(())
}
