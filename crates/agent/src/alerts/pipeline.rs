use super::{EmailSender, Notifier, resolver::resolve_recipient};
use crate::identity::IdentityLookup;
use crate::store::AlertStore;
use models::{Alert, AlertId, BatchResult, NewAlert};

/// Reasons why a single alert could not be delivered. None of these abort a
/// batch, and in every case the alert remains unsent.
#[derive(Debug, thiserror::Error)]
pub enum AlertFailure {
    #[error("no email address could be resolved for the alert")]
    NoRecipient,
    #[error("resolving alert recipient")]
    Resolve(#[source] anyhow::Error),
    #[error("sending alert notification")]
    Send(#[source] anyhow::Error),
    /// The email went out, but the alert is still unsent and will be emailed
    /// again by a later batch.
    #[error("alert notification was sent, but marking the alert sent failed")]
    MarkSent(#[source] anyhow::Error),
}

/// Outcome of accepting a new alert from an ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingested {
    pub alert_id: AlertId,
    /// Whether the notification was delivered right away. Undelivered alerts
    /// are retried by the batch pipeline.
    pub sent: bool,
}

/// Delivers pending alerts: resolve the recipient, send the email, and mark
/// the alert as sent, one alert at a time.
#[derive(Debug)]
pub struct Pipeline<S, I, ES> {
    store: S,
    identity: I,
    notifier: Notifier<ES>,
    batch_limit: u32,
}

impl<S, I, ES> Pipeline<S, I, ES>
where
    S: AlertStore,
    I: IdentityLookup,
    ES: EmailSender,
{
    pub fn new(store: S, identity: I, notifier: Notifier<ES>) -> Pipeline<S, I, ES> {
        Pipeline {
            store,
            identity,
            notifier,
            batch_limit: models::BATCH_LIMIT,
        }
    }

    /// Processes the oldest pending alerts, up to the batch limit.
    ///
    /// Alerts are handled sequentially, and a failure of one alert is counted
    /// and logged without affecting the others. Only a failure to fetch the
    /// batch itself is reported as an `error`.
    #[tracing::instrument(skip_all)]
    pub async fn run_batch(&self) -> BatchResult {
        let alerts = match self.store.fetch_pending(self.batch_limit).await {
            Ok(alerts) => alerts,
            Err(error) => {
                tracing::error!(error = %format!("{error:#}"), "failed to fetch pending alerts");
                return BatchResult::aborted(0, 0, format!("{error:#}"));
            }
        };

        if alerts.is_empty() {
            tracing::debug!("no pending alerts");
            return BatchResult::empty();
        }

        let processed = alerts.len() as u32;
        let (mut successful, mut failed) = (0, 0);

        for alert in alerts {
            match self.process_alert(&alert).await {
                Ok(_delivery_id) => successful += 1,
                Err(failure) => {
                    failed += 1;
                    tracing::warn!(
                        alert_id = %alert.id,
                        error = %format!("{:#}", anyhow::Error::from(failure)),
                        "failed to process alert"
                    );
                }
            }
        }

        let result = BatchResult::completed(processed, successful, failed);
        tracing::info!(%processed, %successful, %failed, "finished alert batch");
        result
    }

    /// Delivers a single alert, and marks it sent only once its email has
    /// been dispatched. Returns the delivery id of the email.
    #[tracing::instrument(skip_all, fields(alert_id = %alert.id, home_id = ?alert.home_id))]
    pub async fn process_alert(&self, alert: &Alert) -> Result<String, AlertFailure> {
        let recipient = resolve_recipient(
            &self.store,
            &self.identity,
            alert.home_id.as_deref(),
            alert.user_id.as_deref(),
        )
        .await
        .map_err(AlertFailure::Resolve)?;

        if recipient.email.is_none() {
            return Err(AlertFailure::NoRecipient);
        }

        let delivery_id = self
            .notifier
            .notify(&recipient, alert)
            .await
            .map_err(AlertFailure::Send)?;

        self.store
            .mark_sent(alert.id)
            .await
            .map_err(AlertFailure::MarkSent)?;

        tracing::info!(%delivery_id, "sent alert notification");
        Ok(delivery_id)
    }

    /// Stores a newly submitted alert, and attempts to deliver it right away.
    /// Only a failure to store the alert is returned as an error.
    pub async fn ingest(&self, new_alert: &NewAlert) -> anyhow::Result<Ingested> {
        let alert = self.store.insert_alert(new_alert).await?;

        let sent = match self.process_alert(&alert).await {
            Ok(_delivery_id) => true,
            Err(failure) => {
                tracing::warn!(
                    alert_id = %alert.id,
                    error = %format!("{:#}", anyhow::Error::from(failure)),
                    "alert stored, but not delivered"
                );
                false
            }
        };

        Ok(Ingested {
            alert_id: alert.id,
            sent,
        })
    }
}
