use crate::identity::{IdentityLookup, UserLookup, UserProfile};
use crate::store::AlertStore;
use models::ResolvedRecipient;

/// Resolves who should receive an alert for the given home and user.
///
/// A non-empty override address of the home always wins. Otherwise the
/// user's primary email from the identity provider is used. The display name
/// only ever comes from the identity provider. Identity lookup failures are
/// logged and treated as "no profile", while store errors are returned.
pub async fn resolve_recipient<S: AlertStore, I: IdentityLookup>(
    store: &S,
    identity: &I,
    home_id: Option<&str>,
    user_id: Option<&str>,
) -> anyhow::Result<ResolvedRecipient> {
    let profile = match user_id {
        Some(user_id) => lookup_profile(identity, user_id).await,
        None => UserProfile::default(),
    };

    let override_email = match home_id {
        Some(home_id) => store
            .home_override_email(home_id)
            .await?
            .filter(|email| !email.trim().is_empty()),
        None => None,
    };

    let UserProfile {
        first_name,
        primary_email,
    } = profile;

    Ok(ResolvedRecipient {
        email: override_email.or(primary_email),
        display_name: first_name,
    })
}

async fn lookup_profile<I: IdentityLookup>(identity: &I, user_id: &str) -> UserProfile {
    match identity.get_user(user_id).await {
        UserLookup::Found(profile) => profile,
        UserLookup::NotFound => {
            tracing::info!(%user_id, "user not found by identity provider");
            UserProfile::default()
        }
        UserLookup::Failed(error) => {
            tracing::warn!(%user_id, error = %format!("{error:#}"), "identity lookup failed");
            UserProfile::default()
        }
    }
}
