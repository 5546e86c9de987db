use super::{HTML_BODY, SUBJECT, TEXT_BODY};
use anyhow::Context;

pub fn register_templates<'a>(registry: &mut handlebars::Handlebars<'a>) -> anyhow::Result<()> {
    registry
        .register_template_string(SUBJECT, r#"Smart Home Alert"#)
        .context("registering home_alert-subject template")?;

    // Triple-stash values are not HTML-escaped, which is what we want for the
    // plain-text part.
    registry
        .register_template_string(
            TEXT_BODY,
            r#"{{#if display_name}}Hi {{{display_name}}},{{else}}Hi there,{{/if}}

Your smart home reported an alert:

{{{message}}}

Alert ID: {{alert_id}}"#,
        )
        .context("registering home_alert-text template")?;

    registry
        .register_template_string(
            HTML_BODY,
            r#"<p class="body-text">
{{#if display_name}}Hi {{display_name}},{{else}}Hi there,{{/if}}
</p>
<p class="body-text">Your smart home reported an alert:</p>
<p class="body-text"><strong>{{message}}</strong></p>
<p class="footer-text">Alert ID: <span class="identifier">{{alert_id}}</span></p>"#,
        )
        .context("registering home_alert-html template")?;

    Ok(())
}
