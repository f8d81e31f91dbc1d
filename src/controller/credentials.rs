//! Credentials stored in Secrets
//!
//! A Database references a Secret in its own namespace whose `user` and
//! `password` keys hold the role that owns the database.

use k8s_openapi::api::core::v1::Secret;

use super::client::ResourceClient;
use super::error::{Error, Result};

pub const USER_KEY: &str = "user";
pub const PASSWORD_KEY: &str = "password";

/// Role credentials resolved from a Secret
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Extract credentials from a Secret's `user` and `password` keys
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let name = secret.metadata.name.clone().unwrap_or_default();
        let invalid = |reason: String| Error::InvalidCredentials {
            name: name.clone(),
            reason,
        };

        let data = secret
            .data
            .as_ref()
            .ok_or_else(|| invalid("no data in secret".to_string()))?;

        let field = |key: &str| {
            let bytes = data
                .get(key)
                .ok_or_else(|| invalid(format!("missing key '{}'", key)))?;
            String::from_utf8(bytes.0.clone())
                .map_err(|_| invalid(format!("key '{}' is not valid UTF-8", key)))
        };

        Ok(Self {
            user: field(USER_KEY)?,
            password: field(PASSWORD_KEY)?,
        })
    }
}

/// Fetch the Secret `name` in `namespace` and the credentials it holds
pub async fn fetch_credentials(
    client: &dyn ResourceClient,
    namespace: &str,
    name: &str,
) -> Result<(Secret, Credentials)> {
    let secret = client
        .get_secret(namespace, name)
        .await?
        .ok_or_else(|| Error::CredentialsNotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;
    let credentials = Credentials::from_secret(&secret)?;
    Ok((secret, credentials))
}
