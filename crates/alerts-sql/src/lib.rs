//! Postgres queries over the `alerts` and `home_users` tables.
pub mod alerts;
pub mod homes;

use anyhow::Context;

/// Builds the connection pool shared by every store operation of a process.
/// No connection is opened until the pool is first used.
pub fn lazy_pool(
    database_url: &url::Url,
    database_ca: Option<&str>,
    max_connections: u32,
) -> anyhow::Result<sqlx::PgPool> {
    let mut pg_options = database_url
        .as_str()
        .parse::<sqlx::postgres::PgConnectOptions>()
        .context("parsing database URL")?
        .application_name("alert-agent");

    // If a database CA was provided, require that we use TLS with full cert verification.
    if let Some(ca) = database_ca {
        pg_options = pg_options
            .ssl_mode(sqlx::postgres::PgSslMode::VerifyFull)
            .ssl_root_cert(ca);
    } else {
        pg_options = pg_options.ssl_mode(sqlx::postgres::PgSslMode::Prefer);
    }

    Ok(sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_lazy_with(pg_options))
}
