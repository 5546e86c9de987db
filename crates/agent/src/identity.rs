use anyhow::Context;
use derivative::Derivative;

/// The parts of a user's identity profile which are used to address alerts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub primary_email: Option<String>,
}

/// Outcome of looking up a user with the identity provider. Callers generally
/// treat anything other than `Found` as "no profile", but the distinction is
/// kept so that provider errors show up in logs as errors.
#[derive(Debug)]
pub enum UserLookup {
    Found(UserProfile),
    NotFound,
    Failed(anyhow::Error),
}

pub trait IdentityLookup: std::fmt::Debug + Send + Sync + 'static {
    fn get_user<'s>(
        &'s self,
        user_id: &'s str,
    ) -> impl std::future::Future<Output = UserLookup> + Send + 's;
}

/// Looks up users with the Clerk Backend API.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ClerkClient {
    base_url: url::Url,
    #[derivative(Debug = "ignore")]
    secret_key: String,
    http_client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct ClerkUser {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ClerkEmailAddress>,
}

#[derive(Debug, serde::Deserialize)]
struct ClerkEmailAddress {
    id: String,
    email_address: String,
}

impl From<ClerkUser> for UserProfile {
    fn from(user: ClerkUser) -> Self {
        let ClerkUser {
            first_name,
            primary_email_address_id,
            email_addresses,
        } = user;

        let primary_email = primary_email_address_id.and_then(|primary_id| {
            email_addresses
                .into_iter()
                .find(|address| address.id == primary_id)
                .map(|address| address.email_address)
        });

        UserProfile {
            first_name: first_name.filter(|name| !name.trim().is_empty()),
            primary_email: primary_email.filter(|email| !email.trim().is_empty()),
        }
    }
}

impl ClerkClient {
    pub fn new(
        base_url: url::Url,
        secret_key: String,
        http_client: reqwest::Client,
    ) -> ClerkClient {
        ClerkClient {
            base_url,
            secret_key,
            http_client,
        }
    }

    async fn fetch_user(&self, user_id: &str) -> anyhow::Result<Option<UserProfile>> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                anyhow::anyhow!("identity provider URL '{}' cannot be a base", self.base_url)
            })?
            .pop_if_empty()
            .extend(["v1", "users", user_id]);

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("requesting user from identity provider")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let user: ClerkUser = response
            .error_for_status()
            .context("identity provider responded with an error")?
            .json()
            .await
            .context("decoding identity provider user")?;

        Ok(Some(user.into()))
    }
}

impl IdentityLookup for ClerkClient {
    async fn get_user<'s>(&'s self, user_id: &'s str) -> UserLookup {
        match self.fetch_user(user_id).await {
            Ok(Some(profile)) => UserLookup::Found(profile),
            Ok(None) => UserLookup::NotFound,
            Err(error) => UserLookup::Failed(error),
        }
    }
}
