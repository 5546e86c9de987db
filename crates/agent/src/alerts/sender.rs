use anyhow::Context;

pub trait EmailSender: std::fmt::Debug + Send + Sync + 'static {
    /// Delivers the email, returning the provider's id for the delivery.
    fn send<'s>(
        &'s self,
        email: notifications::NotificationEmail,
    ) -> impl std::future::Future<Output = anyhow::Result<String>> + Send + 's;
}

/// Sends emails using the resend
#[derive(Debug)]
pub struct ResendSender {
    from_address: String,
    reply_to_address: Option<String>,
    resend_client: resend_rs::Resend,
}

impl ResendSender {
    async fn send(&self, notification: notifications::NotificationEmail) -> anyhow::Result<String> {
        let notifications::NotificationEmail {
            alert_id,
            recipient: notifications::Recipient { email, .. },
            subject,
            text,
            html,
        } = notification;

        let Self {
            from_address,
            reply_to_address,
            resend_client,
        } = self;

        let mut resend_req =
            resend_rs::types::CreateEmailBaseOptions::new(from_address, [email.as_str()], subject)
                .with_text(text.as_str())
                .with_html(html.as_str());
        if let Some(reply_to) = reply_to_address {
            resend_req = resend_req.with_reply(reply_to.as_str());
        }

        // Failures are not retried here. The alert stays unsent and is picked
        // up again by the next batch.
        let response = resend_client
            .emails
            .send(resend_req)
            .await
            .context("calling resend API")?;

        tracing::debug!(
            %alert_id,
            to = %email,
            email_id = %response.id,
            "successfully sent alert email"
        );

        Ok(response.id.to_string())
    }
}

#[derive(Debug)]
pub enum Sender {
    Disabled,
    Resend(ResendSender),
}

impl Sender {
    pub fn resend(api_key: &str, from_address: String, reply_to_address: Option<String>) -> Sender {
        let resend_client = resend_rs::Resend::new(api_key);
        Sender::Resend(ResendSender {
            from_address,
            reply_to_address,
            resend_client,
        })
    }
}

impl EmailSender for Sender {
    async fn send<'s>(
        &'s self,
        notification: notifications::NotificationEmail,
    ) -> anyhow::Result<String> {
        match self {
            Sender::Disabled => {
                tracing::warn!(
                    to = %notification.recipient.email,
                    subject = %notification.subject,
                    alert_id = %notification.alert_id,
                    "skipping sending alert email (disabled)"
                );
                Ok(format!("disabled-{}", notification.alert_id))
            }
            Sender::Resend(resend) => resend.send(notification).await,
        }
    }
}
