use models::{Alert, AlertId, NewAlert, SentStatus};

/// Returns up to `limit` alerts which have not been sent, oldest first.
pub async fn fetch_pending_alerts(
    limit: i64,
    db: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
) -> sqlx::Result<Vec<Alert>> {
    sqlx::query_as::<_, Alert>(
        r#"select
            id,
            home_id,
            user_id,
            device_id,
            message,
            sent_status,
            created_at
        from alerts
        where sent_status = $1
        order by created_at asc, id asc
        limit $2
        "#,
    )
    .bind(SentStatus::Unsent)
    .bind(limit)
    .fetch_all(db)
    .await
}

/// Inserts a new, unsent alert and returns the stored row.
pub async fn insert_alert(
    alert: &NewAlert,
    db: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
) -> sqlx::Result<Alert> {
    let row = sqlx::query_as::<_, Alert>(
        r#"insert into alerts (home_id, user_id, device_id, message, sent_status)
        values ($1, $2, $3, $4, $5)
        returning
            id,
            home_id,
            user_id,
            device_id,
            message,
            sent_status,
            created_at
        "#,
    )
    .bind(&alert.home_id)
    .bind(&alert.user_id)
    .bind(&alert.device_id)
    .bind(&alert.message)
    .bind(SentStatus::Unsent)
    .fetch_one(db)
    .await?;

    tracing::debug!(id = %row.id, home_id = %alert.home_id, "inserted alert");
    Ok(row)
}

/// Marks the alert as sent. Returns false if the alert doesn't exist or was
/// already marked sent, in which case nothing is changed.
pub async fn mark_alert_sent(
    id: AlertId,
    db: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"update alerts
        set sent_status = $2
        where id = $1 and sent_status = $3
        "#,
    )
    .bind(id)
    .bind(SentStatus::Sent)
    .bind(SentStatus::Unsent)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}
