use crate::alerts::{Notifier, Pipeline, Sender};
use crate::identity::ClerkClient;
use crate::store::PgAlertStore;
use anyhow::Context;
use derivative::Derivative;

/// A required setting which was not provided. Reported before any
/// connection to the store or to a provider is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
}

fn require<'a, T>(value: &'a Option<T>, name: &'static str) -> Result<&'a T, ConfigError> {
    value.as_ref().ok_or(ConfigError::Missing(name))
}

/// Pipeline wired to the production store and providers.
pub type AgentPipeline = Pipeline<PgAlertStore, ClerkClient, Sender>;

/// Settings of the store, identity provider, and email provider.
#[derive(Derivative, clap::Args)]
#[derivative(Debug)]
pub struct ServiceArgs {
    /// URL of the postgres database.
    #[derivative(Debug = "ignore")]
    #[clap(long = "database", env = "DATABASE_URL")]
    pub database_url: Option<url::Url>,
    /// Path to CA certificate of the database.
    #[clap(long = "database-ca", env = "DATABASE_CA")]
    pub database_ca: Option<String>,
    /// Maximum number of open database connections.
    #[clap(long, env = "DATABASE_MAX_CONNECTIONS", default_value = "1")]
    pub database_max_connections: u32,
    /// Secret key of the Clerk Backend API.
    #[derivative(Debug = "ignore")]
    #[clap(long, env = "CLERK_SECRET_KEY")]
    pub clerk_secret_key: Option<String>,
    /// Base URL of the Clerk Backend API.
    #[clap(long, env = "CLERK_API_URL", default_value = "https://api.clerk.com")]
    pub clerk_api_url: url::Url,
    /// Timeout of each request to the Clerk Backend API.
    #[clap(long, env = "CLERK_TIMEOUT", default_value = "10s")]
    pub clerk_timeout: humantime::Duration,
    /// API key of the Resend email API.
    #[derivative(Debug = "ignore")]
    #[clap(long, env = "RESEND_API_KEY")]
    pub resend_api_key: Option<String>,
    /// Address which alert emails are sent from.
    #[clap(
        long,
        env = "EMAIL_FROM",
        default_value = "Smart Home Alerts <onboarding@resend.dev>"
    )]
    pub email_from: String,
    /// Optional Reply-To address of alert emails.
    #[clap(long, env = "EMAIL_REPLY_TO")]
    pub email_reply_to: Option<String>,
    /// Log alert emails instead of sending them. For local development.
    #[clap(long, env = "DISABLE_EMAIL")]
    pub disable_email: bool,
}

/// Secrets of `ServiceArgs` which were verified to be present.
pub struct Credentials<'a> {
    database_url: &'a url::Url,
    clerk_secret_key: &'a str,
    resend_api_key: Option<&'a str>,
}

impl ServiceArgs {
    /// Checks that every required secret was provided.
    pub fn credentials(&self) -> Result<Credentials<'_>, ConfigError> {
        let database_url = require(&self.database_url, "DATABASE_URL")?;
        let clerk_secret_key = require(&self.clerk_secret_key, "CLERK_SECRET_KEY")?;
        let resend_api_key = if self.disable_email {
            None
        } else {
            Some(require(&self.resend_api_key, "RESEND_API_KEY")?.as_str())
        };

        Ok(Credentials {
            database_url,
            clerk_secret_key,
            resend_api_key,
        })
    }

    /// Builds the pipeline. The database pool is created here, once, and
    /// connects lazily on first use.
    pub fn build_pipeline(&self, credentials: Credentials<'_>) -> anyhow::Result<AgentPipeline> {
        let Credentials {
            database_url,
            clerk_secret_key,
            resend_api_key,
        } = credentials;

        let pool = alerts_sql::lazy_pool(
            database_url,
            self.database_ca.as_deref(),
            self.database_max_connections,
        )?;

        let identity = ClerkClient::new(
            self.clerk_api_url.clone(),
            clerk_secret_key.to_string(),
            self.identity_http_client()?,
        );

        let sender = match resend_api_key {
            Some(api_key) => Sender::resend(
                api_key,
                self.email_from.clone(),
                self.email_reply_to.clone(),
            ),
            None => Sender::Disabled,
        };

        Ok(Pipeline::new(
            PgAlertStore::new(pool),
            identity,
            Notifier::new(sender)?,
        ))
    }

    /// HTTP client of the identity provider. A lookup that hangs fails once
    /// `clerk_timeout` elapses, leaving its alert pending.
    fn identity_http_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.clerk_timeout.into())
            .build()
            .context("building identity provider client")
    }
}

/// Settings of the MQTT broker that devices publish alerts to.
#[derive(Derivative, clap::Args)]
#[derivative(Debug)]
pub struct BrokerArgs {
    /// Hostname of the MQTT broker.
    #[clap(long, env = "MQTT_HOST")]
    pub mqtt_host: Option<String>,
    #[clap(long, env = "MQTT_PORT", default_value = "1883")]
    pub mqtt_port: u16,
    #[clap(long, env = "MQTT_USERNAME")]
    pub mqtt_username: Option<String>,
    #[derivative(Debug = "ignore")]
    #[clap(long, env = "MQTT_PASSWORD")]
    pub mqtt_password: Option<String>,
    /// Topic which devices publish alerts to.
    #[clap(long, env = "MQTT_TOPIC", default_value = "home/alerts")]
    pub mqtt_topic: String,
    #[clap(long, env = "MQTT_CLIENT_ID", default_value = "alert-agent")]
    pub mqtt_client_id: String,
}

impl BrokerArgs {
    pub fn host(&self) -> Result<&str, ConfigError> {
        require(&self.mqtt_host, "MQTT_HOST").map(String::as_str)
    }
}
