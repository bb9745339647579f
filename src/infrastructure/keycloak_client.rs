use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, header::LOCATION};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::{
    domain::{
        error::IdentityProviderError,
        models::{registration::Password, user::ExternalId},
        services::identity_provider::{IdentityProvider, NewIdentity, RemoteIdentity},
    },
    infrastructure::keycloak_session::{KeycloakAdminSession, transport_error},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRepresentation<'a> {
    username: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    enabled: bool,
    email_verified: bool,
}

#[derive(Serialize)]
struct CredentialRepresentation<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
    temporary: bool,
}

/// Keycloak Admin REST client bound to one target realm.
#[derive(Clone)]
pub struct KeycloakAdminClient {
    http: reqwest::Client,
    base_url: Url,
    realm: String,
    session: KeycloakAdminSession,
}

impl KeycloakAdminClient {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        realm: String,
        session: KeycloakAdminSession,
    ) -> Self {
        Self {
            http,
            base_url,
            realm,
            session,
        }
    }

    /// `{base}/admin/realms/{realm}/{segments...}`
    fn admin_url(&self, segments: &[&str]) -> Result<Url, IdentityProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                IdentityProviderError::Transport(format!("invalid base URL {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["admin", "realms", self.realm.as_str()])
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, IdentityProviderError> {
        let token = self.session.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            // the next call logs in again
            self.session.invalidate().await;
        }
        Ok(response)
    }

    async fn read_identity(&self, id: &ExternalId) -> Result<Value, IdentityProviderError> {
        let url = self.admin_url(&["users", id.as_str()])?;
        let response = self.send(self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IdentityProviderError::IdentityNotFound(id.to_string()));
        }
        expect_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)
    }

    async fn write_identity(
        &self,
        id: &ExternalId,
        representation: &Value,
    ) -> Result<(), IdentityProviderError> {
        let url = self.admin_url(&["users", id.as_str()])?;
        let response = self.send(self.http.put(url).json(representation)).await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn complete_creation(
        &self,
        id: &ExternalId,
        password: &Password,
        role: Option<&str>,
    ) -> Result<(), IdentityProviderError> {
        self.set_password(id, password).await?;
        if let Some(role) = role.filter(|r| !r.is_empty()) {
            self.assign_role(id, role).await?;
        }
        Ok(())
    }
}

async fn expect_success(response: Response) -> Result<Response, IdentityProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(IdentityProviderError::UnexpectedStatus { status, body })
}

/// Last path segment of the `Location` header of a create response.
fn created_id(response: &Response) -> Result<ExternalId, IdentityProviderError> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(ExternalId::new)
        .ok_or(IdentityProviderError::MissingLocation)
}

#[async_trait]
impl IdentityProvider for KeycloakAdminClient {
    #[instrument(skip_all, fields(realm = %self.realm, username = %identity.username))]
    async fn create_user(
        &self,
        identity: NewIdentity<'_>,
    ) -> Result<ExternalId, IdentityProviderError> {
        let url = self.admin_url(&["users"])?;
        let representation = UserRepresentation {
            username: identity.username,
            email: identity.email,
            first_name: identity.first_name,
            last_name: identity.last_name,
            enabled: true,
            email_verified: false,
        };

        let response = self.send(self.http.post(url).json(&representation)).await?;
        if response.status() != StatusCode::CREATED {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(status, body = %body, "Failed to create user in Keycloak");
            return Err(IdentityProviderError::UnexpectedStatus { status, body });
        }
        let id = created_id(&response)?;
        info!(external_id = %id, "Created Keycloak user");

        if let Err(e) = self
            .complete_creation(&id, identity.password, identity.role)
            .await
        {
            warn!(external_id = %id, error = %e, "Removing partially created Keycloak user");
            if let Err(cleanup) = self.delete_user(&id).await {
                error!(external_id = %id, error = %cleanup, "Failed to remove partially created Keycloak user");
            }
            return Err(e);
        }
        Ok(id)
    }

    #[instrument(skip_all, fields(realm = %self.realm, external_id = %id))]
    async fn set_password(
        &self,
        id: &ExternalId,
        password: &Password,
    ) -> Result<(), IdentityProviderError> {
        let url = self.admin_url(&["users", id.as_str(), "reset-password"])?;
        let credential = CredentialRepresentation {
            kind: "password",
            value: password.expose(),
            temporary: false,
        };
        let response = self.send(self.http.put(url).json(&credential)).await?;
        expect_success(response).await?;
        info!("Password set");
        Ok(())
    }

    #[instrument(skip_all, fields(realm = %self.realm, external_id = %id, role = %role))]
    async fn assign_role(&self, id: &ExternalId, role: &str) -> Result<(), IdentityProviderError> {
        let role_url = self.admin_url(&["roles", role])?;
        let response = self.send(self.http.get(role_url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IdentityProviderError::RoleNotFound(role.to_string()));
        }
        let representation: Value = expect_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        let mapping_url = self.admin_url(&["users", id.as_str(), "role-mappings", "realm"])?;
        let response = self
            .send(self.http.post(mapping_url).json(&[representation]))
            .await?;
        expect_success(response).await?;
        info!("Assigned realm role");
        Ok(())
    }

    #[instrument(skip_all, fields(realm = %self.realm, external_id = %id))]
    async fn delete_user(&self, id: &ExternalId) -> Result<(), IdentityProviderError> {
        let url = self.admin_url(&["users", id.as_str()])?;
        let response = self.send(self.http.delete(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("Keycloak user already absent");
            return Ok(());
        }
        expect_success(response).await?;
        info!("Deleted Keycloak user");
        Ok(())
    }

    #[instrument(skip_all, fields(realm = %self.realm, external_id = %id))]
    async fn update_user(
        &self,
        id: &ExternalId,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), IdentityProviderError> {
        let mut representation = self.read_identity(id).await?;
        representation["email"] = json!(email);
        representation["firstName"] = json!(first_name);
        representation["lastName"] = json!(last_name);
        self.write_identity(id, &representation).await?;
        info!("Updated Keycloak user");
        Ok(())
    }

    #[instrument(skip_all, fields(realm = %self.realm, external_id = %id, enabled = enabled))]
    async fn set_enabled(
        &self,
        id: &ExternalId,
        enabled: bool,
    ) -> Result<(), IdentityProviderError> {
        let mut representation = self.read_identity(id).await?;
        representation["enabled"] = json!(enabled);
        self.write_identity(id, &representation).await?;
        info!(enabled, "Set Keycloak user enabled flag");
        Ok(())
    }

    #[instrument(skip_all, fields(realm = %self.realm, username = %username))]
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<RemoteIdentity>, IdentityProviderError> {
        let url = self.admin_url(&["users"])?;
        let request = self
            .http
            .get(url)
            .query(&[("username", username), ("exact", "true")]);
        let response = self.send(request).await?;
        let identities: Vec<RemoteIdentity> = expect_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(identities.into_iter().next())
    }
}
