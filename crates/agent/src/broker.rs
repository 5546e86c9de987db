use crate::alerts::{EmailSender, Ingested, Pipeline};
use crate::config::{BrokerArgs, ConfigError};
use crate::identity::IdentityLookup;
use crate::store::AlertStore;
use models::{AlertId, AlertPayload};
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;

/// Capacity of the request channel between the client and its event loop.
const CLIENT_CAPACITY: usize = 10;

/// What became of a single message received from the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The payload was malformed or incomplete.
    Dropped,
    Stored { alert_id: AlertId, sent: bool },
    /// The payload was valid, but the alert couldn't be stored.
    StoreFailed,
}

impl MessageOutcome {
    /// Whether the message is done with and may be acknowledged. Messages
    /// which failed to be stored are left unacknowledged, so the broker
    /// delivers them again once the session resumes.
    pub fn is_settled(&self) -> bool {
        !matches!(self, MessageOutcome::StoreFailed)
    }
}

/// Counts of the messages handled during one listening window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ListenSummary {
    pub received: u32,
    pub stored: u32,
    pub sent: u32,
    pub dropped: u32,
    pub failed: u32,
}

impl ListenSummary {
    fn record(&mut self, outcome: MessageOutcome) {
        self.received += 1;
        match outcome {
            MessageOutcome::Dropped => self.dropped += 1,
            MessageOutcome::Stored { sent, .. } => {
                self.stored += 1;
                if sent {
                    self.sent += 1;
                }
            }
            MessageOutcome::StoreFailed => self.failed += 1,
        }
    }
}

/// Ingests one message published by a device. Errors never escape, so that a
/// bad message can't stop the listener.
pub async fn handle_message<S, I, ES>(
    pipeline: &Pipeline<S, I, ES>,
    topic: &str,
    payload: &[u8],
) -> MessageOutcome
where
    S: AlertStore,
    I: IdentityLookup,
    ES: EmailSender,
{
    let new_alert = match AlertPayload::parse(payload) {
        Ok(new_alert) => new_alert,
        Err(error) => {
            tracing::warn!(%topic, %error, "dropping invalid alert message");
            return MessageOutcome::Dropped;
        }
    };

    match pipeline.ingest(&new_alert).await {
        Ok(Ingested { alert_id, sent }) => {
            tracing::info!(
                %topic,
                %alert_id,
                %sent,
                home_id = %new_alert.home_id,
                "stored alert message"
            );
            MessageOutcome::Stored { alert_id, sent }
        }
        Err(error) => {
            tracing::error!(
                %topic,
                error = %format!("{error:#}"),
                "failed to store alert message"
            );
            MessageOutcome::StoreFailed
        }
    }
}

/// Client options of the listener. Publishes are acknowledged by the listener
/// itself, and only after they've been handled, and the session outlives the
/// connection. Together these let the broker redeliver any message which
/// arrived but wasn't stored before the listening window closed.
fn mqtt_options(args: &BrokerArgs, host: &str) -> Result<MqttOptions, ConfigError> {
    // A persistent session is keyed on the client id.
    if args.mqtt_client_id.trim().is_empty() {
        return Err(ConfigError::Missing("MQTT_CLIENT_ID"));
    }

    let mut options = MqttOptions::new(args.mqtt_client_id.as_str(), host, args.mqtt_port);
    options.set_keep_alive(Duration::from_secs(30));
    options.set_manual_acks(true);
    options.set_clean_session(false);
    if let Some(username) = &args.mqtt_username {
        options.set_credentials(
            username.as_str(),
            args.mqtt_password.clone().unwrap_or_default(),
        );
    }
    Ok(options)
}

/// Subscribes to the alerts topic and ingests messages until `window` has
/// elapsed, then disconnects. A message is acknowledged only once it has been
/// stored or rejected, so messages in flight when the window closes are
/// redelivered to the next listener.
pub async fn listen<S, I, ES>(
    pipeline: &Pipeline<S, I, ES>,
    args: &BrokerArgs,
    window: Duration,
) -> anyhow::Result<ListenSummary>
where
    S: AlertStore,
    I: IdentityLookup,
    ES: EmailSender,
{
    let host = args.host()?;
    let options = mqtt_options(args, host)?;

    let (client, mut event_loop) = AsyncClient::new(options, CLIENT_CAPACITY);
    client
        .subscribe(args.mqtt_topic.as_str(), QoS::AtLeastOnce)
        .await?;

    let mut summary = ListenSummary::default();
    let mut connected = false;

    let receive = async {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    connected = true;
                    tracing::info!(%host, topic = %args.mqtt_topic, "connected to broker");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let outcome =
                        handle_message(pipeline, &publish.topic, &publish.payload).await;
                    summary.record(outcome);

                    // The ack is queued, and written by a later poll.
                    if outcome.is_settled() {
                        if let Err(error) = client.try_ack(&publish) {
                            tracing::warn!(%error, "failed to acknowledge alert message");
                        }
                    }
                }
                Ok(_) => {}
                Err(error) if !connected => {
                    return anyhow::Error::from(error)
                        .context(format!("connecting to broker at {host}"));
                }
                Err(error) => {
                    // The event loop reconnects on the next poll.
                    tracing::warn!(%error, "broker connection lost");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    };

    match tokio::time::timeout(window, receive).await {
        Ok(error) => return Err(error),
        Err(_elapsed) => {
            tracing::info!(
                window = %humantime::format_duration(window),
                "listening window closed"
            );
        }
    }

    disconnect(&client, &mut event_loop).await;
    Ok(summary)
}

async fn disconnect(client: &AsyncClient, event_loop: &mut rumqttc::EventLoop) {
    if let Err(error) = client.disconnect().await {
        tracing::warn!(%error, "failed to request broker disconnect");
        return;
    }
    // Drive the event loop until pending acks and the disconnect are written.
    let flush = async {
        loop {
            match event_loop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };
    if tokio::time::timeout(Duration::from_secs(2), flush).await.is_err() {
        tracing::warn!("timed out disconnecting from broker");
    }
}
