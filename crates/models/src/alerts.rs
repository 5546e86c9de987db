use crate::AlertId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery state of an alert. Alerts start out `Unsent`, and move to `Sent`
/// exactly once, after their notification email has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentStatus {
    Unsent,
    Sent,
}

impl std::fmt::Display for SentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl SentStatus {
    pub fn name(&self) -> &'static str {
        match self {
            SentStatus::Unsent => "unsent",
            SentStatus::Sent => "sent",
        }
    }

    pub fn from_str(name: &str) -> Option<SentStatus> {
        [SentStatus::Unsent, SentStatus::Sent]
            .into_iter()
            .find(|status| name.eq_ignore_ascii_case(status.name()))
    }
}

#[cfg(feature = "sqlx-support")]
impl sqlx::Type<sqlx::postgres::Postgres> for SentStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("alert_sent_status")
    }
}

#[cfg(feature = "sqlx-support")]
impl sqlx::Encode<'_, sqlx::postgres::Postgres> for SentStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<'_, sqlx::Postgres>>::encode_by_ref(&self.name(), buf)
    }
}

#[cfg(feature = "sqlx-support")]
impl sqlx::Decode<'_, sqlx::postgres::Postgres> for SentStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'_>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::postgres::Postgres>>::decode(value)?;
        SentStatus::from_str(s).ok_or_else(|| format!("Invalid alert_sent_status: {}", s).into())
    }
}

/// A notification event raised by a device in a home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Alert {
    pub id: AlertId,
    /// The home that raised the alert. Alerts without a home can only be
    /// delivered through the responsible user's identity email.
    pub home_id: Option<String>,
    /// The responsible user, as known to the identity provider.
    pub user_id: Option<String>,
    pub device_id: Option<String>,
    pub message: String,
    pub sent_status: SentStatus,
    pub created_at: DateTime<Utc>,
}

/// An alert which has been accepted by an ingress, but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub home_id: String,
    pub user_id: Option<String>,
    pub device_id: String,
    pub message: String,
}

/// Association of a user with a home, with an optional address that receives
/// that home's alerts instead of the user's own email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct HomeUserLink {
    pub home_id: String,
    pub user_id: String,
    pub email: Option<String>,
}

/// Error returned when an alert submission can't be accepted.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Invalid message payload: missing required fields")]
    MissingFields,
    #[error("Invalid message payload: {0}")]
    Malformed(serde_json::Error),
}

/// The JSON body of an alert submission, as published by devices over the
/// broker or POSTed over HTTP.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AlertPayload {
    #[serde(default)]
    pub home_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AlertPayload {
    /// Parses and validates a raw JSON submission.
    pub fn parse(body: &[u8]) -> Result<NewAlert, PayloadError> {
        let payload: AlertPayload =
            serde_json::from_slice(body).map_err(PayloadError::Malformed)?;
        payload.validate()
    }

    /// Checks that all required fields are present and non-blank.
    pub fn validate(self) -> Result<NewAlert, PayloadError> {
        let AlertPayload {
            home_id,
            user_id,
            device_id,
            message,
        } = self;

        let (Some(home_id), Some(device_id), Some(message)) = (
            non_blank(home_id),
            non_blank(device_id),
            non_blank(message),
        ) else {
            return Err(PayloadError::MissingFields);
        };

        Ok(NewAlert {
            home_id,
            user_id: non_blank(user_id),
            device_id,
            message,
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}
