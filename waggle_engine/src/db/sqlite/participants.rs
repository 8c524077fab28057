use sqlx::SqliteConnection;

use crate::{
    db_types::{EngagementId, EngagementRef, NewParticipant, Participant, ParticipantId},
    traits::StoreError,
};

const COLUMNS: &str = r#"
    participant_id, name, role, rating, device_token,
    customer_ref, payout_account_ref,
    current_engagement_id, current_engagement_status,
    created_at, updated_at
"#;

/// Creates or refreshes a participant profile. The back-reference columns are deliberately absent from the
/// conflict clause: only the lifecycle engine writes those, through [`compare_and_set_ref`].
pub(crate) async fn upsert(
    participant: &NewParticipant,
    conn: &mut SqliteConnection,
) -> Result<Participant, StoreError> {
    sqlx::query(
        r#"
            INSERT INTO participants (participant_id, name, role, rating, device_token, customer_ref, payout_account_ref)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (participant_id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                rating = excluded.rating,
                device_token = excluded.device_token,
                customer_ref = excluded.customer_ref,
                payout_account_ref = excluded.payout_account_ref,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(&participant.participant_id)
    .bind(&participant.name)
    .bind(participant.role)
    .bind(participant.rating)
    .bind(&participant.device_token)
    .bind(participant.customer_ref.as_deref())
    .bind(participant.payout_account_ref.as_deref())
    .execute(&mut *conn)
    .await?;
    fetch(&participant.participant_id, conn)
        .await?
        .ok_or_else(|| StoreError::ParticipantNotFound(participant.participant_id.clone()))
}

pub(crate) async fn fetch(
    id: &ParticipantId,
    conn: &mut SqliteConnection,
) -> Result<Option<Participant>, StoreError> {
    let query = format!("SELECT {COLUMNS} FROM participants WHERE participant_id = $1;");
    let participant = sqlx::query_as::<_, Participant>(&query).bind(id).fetch_optional(conn).await?;
    Ok(participant)
}

/// Compare-and-set on the back-reference: the row updates only if the current engagement id equals `expected`
/// (NULL when `expected` is `None`). Two dispatchers racing for one walker get exactly one winner out of this
/// statement; the loser sees a zero row count and a [`StoreError::EngagementRefMismatch`].
pub(crate) async fn compare_and_set_ref(
    id: &ParticipantId,
    expected: Option<&EngagementId>,
    new: Option<&EngagementRef>,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let (new_id, new_status) = match new {
        Some(r) => (Some(&r.engagement_id), Some(r.status)),
        None => (None, None),
    };
    let result = match expected {
        Some(current) => {
            sqlx::query(
                r#"
                    UPDATE participants SET
                        current_engagement_id = $1,
                        current_engagement_status = $2,
                        updated_at = CURRENT_TIMESTAMP
                    WHERE participant_id = $3 AND current_engagement_id = $4;
                "#,
            )
            .bind(new_id)
            .bind(new_status)
            .bind(id)
            .bind(current)
            .execute(&mut *conn)
            .await?
        },
        None => {
            sqlx::query(
                r#"
                    UPDATE participants SET
                        current_engagement_id = $1,
                        current_engagement_status = $2,
                        updated_at = CURRENT_TIMESTAMP
                    WHERE participant_id = $3 AND current_engagement_id IS NULL;
                "#,
            )
            .bind(new_id)
            .bind(new_status)
            .bind(id)
            .execute(&mut *conn)
            .await?
        },
    };
    if result.rows_affected() == 0 {
        return match fetch(id, conn).await? {
            Some(_) => Err(StoreError::EngagementRefMismatch(id.clone())),
            None => Err(StoreError::ParticipantNotFound(id.clone())),
        };
    }
    Ok(())
}
