use anyhow::Context;
use models::{Alert, AlertId, NewAlert};

/// Persistence of alerts and of the home links used to route them.
pub trait AlertStore: std::fmt::Debug + Send + Sync + 'static {
    /// Returns up to `limit` unsent alerts, oldest first.
    fn fetch_pending<'s>(
        &'s self,
        limit: u32,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<Alert>>> + Send + 's;

    fn insert_alert<'s>(
        &'s self,
        alert: &'s NewAlert,
    ) -> impl std::future::Future<Output = anyhow::Result<Alert>> + Send + 's;

    /// Transitions the alert from unsent to sent. Alerts which are already
    /// sent are left untouched.
    fn mark_sent<'s>(
        &'s self,
        id: AlertId,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;

    fn home_override_email<'s>(
        &'s self,
        home_id: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<String>>> + Send + 's;
}

/// AlertStore backed by the Postgres `alerts` and `home_users` tables.
#[derive(Debug, Clone)]
pub struct PgAlertStore {
    pool: sqlx::PgPool,
}

impl PgAlertStore {
    pub fn new(pool: sqlx::PgPool) -> PgAlertStore {
        PgAlertStore { pool }
    }
}

impl AlertStore for PgAlertStore {
    async fn fetch_pending<'s>(&'s self, limit: u32) -> anyhow::Result<Vec<Alert>> {
        alerts_sql::alerts::fetch_pending_alerts(limit as i64, &self.pool)
            .await
            .context("fetching pending alerts")
    }

    async fn insert_alert<'s>(&'s self, alert: &'s NewAlert) -> anyhow::Result<Alert> {
        alerts_sql::alerts::insert_alert(alert, &self.pool)
            .await
            .context("inserting alert")
    }

    async fn mark_sent<'s>(&'s self, id: AlertId) -> anyhow::Result<()> {
        let updated = alerts_sql::alerts::mark_alert_sent(id, &self.pool)
            .await
            .with_context(|| format!("marking alert {id} as sent"))?;
        if !updated {
            tracing::warn!(%id, "alert was no longer pending when it was marked sent");
        }
        Ok(())
    }

    async fn home_override_email<'s>(&'s self, home_id: &'s str) -> anyhow::Result<Option<String>> {
        alerts_sql::homes::fetch_home_override_email(home_id, &self.pool)
            .await
            .with_context(|| format!("fetching override email for home '{home_id}'"))
    }
}
