use super::EmailSender;
use models::{Alert, ResolvedRecipient};
use notifications::Renderer;

/// Formats alert emails and hands them to an `EmailSender`.
#[derive(Debug)]
pub struct Notifier<ES> {
    renderer: Renderer,
    sender: ES,
}

impl<ES: EmailSender> Notifier<ES> {
    pub fn new(sender: ES) -> anyhow::Result<Notifier<ES>> {
        let renderer = Renderer::try_new()?;
        Ok(Notifier { renderer, sender })
    }

    /// Sends one email about `alert` to `recipient`, returning the delivery id.
    /// Delivery errors are returned as-is and never retried.
    pub async fn notify(
        &self,
        recipient: &ResolvedRecipient,
        alert: &Alert,
    ) -> anyhow::Result<String> {
        let Some(email) = recipient.email.clone() else {
            anyhow::bail!("recipient of alert {} has no email address", alert.id);
        };

        let notification = self.renderer.render_alert_email(
            notifications::Recipient {
                email,
                display_name: recipient.display_name.clone(),
            },
            alert,
        )?;

        self.sender.send(notification).await
    }
}
