//! Rendering of alert notification emails.
use anyhow::Context;
use models::Alert;

mod home_alert;

const SUBJECT: &str = "home_alert-subject";
const TEXT_BODY: &str = "home_alert-text";
const HTML_BODY: &str = "home_alert-html";

/// Where an email is delivered, and how to address the person reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub display_name: Option<String>,
}

/// A fully rendered email, ready to hand to a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEmail {
    pub alert_id: models::AlertId,
    pub recipient: Recipient,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(serde::Serialize)]
struct TemplateArgs<'a> {
    display_name: Option<&'a str>,
    message: &'a str,
    alert_id: models::AlertId,
}

#[derive(Debug)]
pub struct Renderer {
    registry: handlebars::Handlebars<'static>,
}

impl Renderer {
    pub fn try_new() -> anyhow::Result<Renderer> {
        let mut registry = handlebars::Handlebars::new();
        home_alert::register_templates(&mut registry)?;
        Ok(Renderer { registry })
    }

    /// Renders the email notifying `recipient` of `alert`.
    pub fn render_alert_email(
        &self,
        recipient: Recipient,
        alert: &Alert,
    ) -> anyhow::Result<NotificationEmail> {
        let args = TemplateArgs {
            display_name: recipient
                .display_name
                .as_deref()
                .filter(|name| !name.trim().is_empty()),
            message: &alert.message,
            alert_id: alert.id,
        };

        let subject = self
            .registry
            .render(SUBJECT, &args)
            .context("rendering subject")?;
        let text = self
            .registry
            .render(TEXT_BODY, &args)
            .context("rendering text body")?;
        let html = self
            .registry
            .render(HTML_BODY, &args)
            .context("rendering html body")?;

        Ok(NotificationEmail {
            alert_id: alert.id,
            recipient,
            subject,
            text,
            html,
        })
    }
}
