use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    error::IdentityProviderError,
    models::{registration::Password, user::ExternalId},
};

/// Everything needed to create a remote identity.
#[derive(Debug, Clone)]
pub struct NewIdentity<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a Password,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: Option<&'a str>,
}

/// A user as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIdentity {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

/// Administrative operations against the identity provider.
///
/// Every method is one remote call or a short fixed sequence of them; none retries.
#[async_trait]
pub trait IdentityProvider {
    /// Creates the identity, sets a permanent password and assigns `role` if given.
    ///
    /// A failure in any sub-step is reported as a single error.
    async fn create_user(
        &self,
        identity: NewIdentity<'_>,
    ) -> Result<ExternalId, IdentityProviderError>;

    async fn set_password(
        &self,
        id: &ExternalId,
        password: &Password,
    ) -> Result<(), IdentityProviderError>;

    async fn assign_role(&self, id: &ExternalId, role: &str) -> Result<(), IdentityProviderError>;

    async fn delete_user(&self, id: &ExternalId) -> Result<(), IdentityProviderError>;

    async fn update_user(
        &self,
        id: &ExternalId,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), IdentityProviderError>;

    async fn set_enabled(&self, id: &ExternalId, enabled: bool)
    -> Result<(), IdentityProviderError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<RemoteIdentity>, IdentityProviderError>;
}
