use models::HomeUserLink;

/// Returns the override address which receives alerts for `home_id`, if any
/// member of the home has set one. Blank addresses are ignored.
pub async fn fetch_home_override_email(
    home_id: &str,
    db: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar::<_, String>(
        r#"select trim(email)
        from home_users
        where home_id = $1
        and nullif(trim(email), '') is not null
        order by created_at asc
        limit 1
        "#,
    )
    .bind(home_id)
    .fetch_optional(db)
    .await
}

/// Creates or updates the link between a home and a user.
pub async fn upsert_home_user(
    link: &HomeUserLink,
    db: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"insert into home_users (home_id, user_id, email)
        values ($1, $2, $3)
        on conflict (home_id, user_id) do update set email = excluded.email
        "#,
    )
    .bind(&link.home_id)
    .bind(&link.user_id)
    .bind(&link.email)
    .execute(db)
    .await?;
    Ok(())
}
