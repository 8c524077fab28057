use sqlx::SqliteConnection;

use crate::{
    db_types::{Engagement, EngagementId, EngagementStatus},
    traits::{SettlementUpdate, StoreError},
};

const COLUMNS: &str = r#"
    engagement_id, quote_id,
    owner_id, owner_name, owner_rating,
    walker_id, walker_name, walker_rating,
    dog_count, tier, total, service_fee, walker_payout,
    status, charge_ref, transfer_group,
    created_at, updated_at
"#;

pub(crate) async fn insert(engagement: &Engagement, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let query = format!(
        "INSERT INTO engagements ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
         $14, $15, $16, $17, $18);"
    );
    sqlx::query(&query)
        .bind(&engagement.engagement_id)
        .bind(&engagement.quote_id)
        .bind(&engagement.owner_id)
        .bind(&engagement.owner_name)
        .bind(engagement.owner_rating)
        .bind(&engagement.walker_id)
        .bind(&engagement.walker_name)
        .bind(engagement.walker_rating)
        .bind(engagement.dog_count)
        .bind(engagement.tier)
        .bind(engagement.total)
        .bind(engagement.service_fee)
        .bind(engagement.walker_payout)
        .bind(engagement.status)
        .bind(engagement.charge_ref.as_deref())
        .bind(engagement.transfer_group.as_deref())
        .bind(engagement.created_at)
        .bind(engagement.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn fetch(
    id: &EngagementId,
    conn: &mut SqliteConnection,
) -> Result<Option<Engagement>, StoreError> {
    let query = format!("SELECT {COLUMNS} FROM engagements WHERE engagement_id = $1;");
    let engagement = sqlx::query_as::<_, Engagement>(&query).bind(id).fetch_optional(conn).await?;
    Ok(engagement)
}

/// Guarded transition: the row changes only if its status still equals `expected`, so a transition can never be
/// applied twice. Settlement references, when supplied, land in the same statement as the status change.
pub(crate) async fn update_status(
    id: &EngagementId,
    expected: EngagementStatus,
    new: EngagementStatus,
    settlement: Option<&SettlementUpdate>,
    conn: &mut SqliteConnection,
) -> Result<Engagement, StoreError> {
    let (charge_ref, transfer_group) = match settlement {
        Some(s) => (Some(s.charge_ref.as_str()), Some(s.transfer_group.as_str())),
        None => (None, None),
    };
    let result = sqlx::query(
        r#"
            UPDATE engagements SET
                status = $1,
                charge_ref = COALESCE($2, charge_ref),
                transfer_group = COALESCE($3, transfer_group),
                updated_at = CURRENT_TIMESTAMP
            WHERE engagement_id = $4 AND status = $5;
        "#,
    )
    .bind(new)
    .bind(charge_ref)
    .bind(transfer_group)
    .bind(id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return match fetch(id, conn).await? {
            Some(e) => Err(StoreError::StaleStatus { id: id.clone(), expected, actual: e.status }),
            None => Err(StoreError::EngagementNotFound(id.clone())),
        };
    }
    fetch(id, conn).await?.ok_or_else(|| StoreError::EngagementNotFound(id.clone()))
}
