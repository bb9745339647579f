//! In-memory doubles for the repository and identity-provider seams.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    error::{IdentityProviderError, RepositoryError, UniqueField},
    models::{
        registration::Password,
        user::{ExternalId, NewUser, User, UserId},
    },
    repositories::user_repository::UserRepository,
    services::identity_provider::{IdentityProvider, NewIdentity, RemoteIdentity},
};

#[derive(Default)]
struct IdpState {
    identities: HashMap<String, RemoteIdentity>,
    roles: HashMap<String, Vec<String>>,
    created: Vec<String>,
    deleted: Vec<String>,
    delete_attempts: usize,
    calls: usize,
    next_id: u32,
}

#[derive(Clone, Default)]
pub struct FakeIdentityProvider {
    state: Arc<Mutex<IdpState>>,
    fail_create: bool,
    fail_delete: bool,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn delete_attempts(&self) -> usize {
        self.state.lock().unwrap().delete_attempts
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().unwrap().identities.contains_key(id)
    }

    pub fn roles_of(&self, id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .roles
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Registers an identity directly, bypassing call accounting.
    pub fn seed(&self, id: &str, username: &str) {
        self.state.lock().unwrap().identities.insert(
            id.to_string(),
            RemoteIdentity {
                id: id.to_string(),
                username: username.to_string(),
                email: None,
                first_name: None,
                last_name: None,
                enabled: true,
            },
        );
    }

    fn server_error() -> IdentityProviderError {
        IdentityProviderError::UnexpectedStatus {
            status: 500,
            body: "boom".to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn create_user(
        &self,
        identity: NewIdentity<'_>,
    ) -> Result<ExternalId, IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if self.fail_create {
            return Err(Self::server_error());
        }
        state.next_id += 1;
        let id = format!("kc-{}", state.next_id);
        state.identities.insert(
            id.clone(),
            RemoteIdentity {
                id: id.clone(),
                username: identity.username.to_string(),
                email: Some(identity.email.to_string()),
                first_name: Some(identity.first_name.to_string()),
                last_name: Some(identity.last_name.to_string()),
                enabled: true,
            },
        );
        if let Some(role) = identity.role {
            state.roles.insert(id.clone(), vec![role.to_string()]);
        }
        state.created.push(id.clone());
        Ok(ExternalId::new(id))
    }

    async fn set_password(
        &self,
        id: &ExternalId,
        _password: &Password,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if !state.identities.contains_key(id.as_str()) {
            return Err(IdentityProviderError::IdentityNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn assign_role(&self, id: &ExternalId, role: &str) -> Result<(), IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state
            .roles
            .entry(id.to_string())
            .or_default()
            .push(role.to_string());
        Ok(())
    }

    async fn delete_user(&self, id: &ExternalId) -> Result<(), IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.delete_attempts += 1;
        if self.fail_delete {
            return Err(Self::server_error());
        }
        state.identities.remove(id.as_str());
        state.deleted.push(id.to_string());
        Ok(())
    }

    async fn update_user(
        &self,
        id: &ExternalId,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let identity = state
            .identities
            .get_mut(id.as_str())
            .ok_or_else(|| IdentityProviderError::IdentityNotFound(id.to_string()))?;
        identity.email = Some(email.to_string());
        identity.first_name = Some(first_name.to_string());
        identity.last_name = Some(last_name.to_string());
        Ok(())
    }

    async fn set_enabled(
        &self,
        id: &ExternalId,
        enabled: bool,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let identity = state
            .identities
            .get_mut(id.as_str())
            .ok_or_else(|| IdentityProviderError::IdentityNotFound(id.to_string()))?;
        identity.enabled = enabled;
        Ok(())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<RemoteIdentity>, IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state
            .identities
            .values()
            .find(|i| i.username == username)
            .cloned())
    }
}

/// How the next `insert` should fail, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertFailure {
    Database,
    Unique(UniqueField),
}

#[derive(Default)]
struct RepoState {
    users: Vec<User>,
    next_id: i32,
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    state: Arc<Mutex<RepoState>>,
    insert_failure: Option<InsertFailure>,
    fail_delete: bool,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_insert(mut self, failure: InsertFailure) -> Self {
        self.insert_failure = Some(failure);
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn seed(&self, username: &str, email: &str, external_id: &str) -> User {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let user = User::from_new(
            UserId::new(state.next_id),
            NewUser {
                username: username.to_string(),
                email: email.to_string(),
                external_id: ExternalId::new(external_id),
                first_name: "Seeded".to_string(),
                last_name: "User".to_string(),
            },
            Utc::now(),
        );
        state.users.push(user.clone());
        user
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id() == id)
            .cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().any(|u| u.username() == username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().any(|u| u.email() == email))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.get(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| u.username() == username)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| u.external_id() == external_id)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.state.lock().unwrap().users.clone())
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        match self.insert_failure {
            Some(InsertFailure::Database) => {
                return Err(RepositoryError::DatabaseError("disk full".to_string()));
            }
            Some(InsertFailure::Unique(field)) => {
                return Err(RepositoryError::UniqueViolation(field));
            }
            None => {}
        }
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.username() == user.username) {
            return Err(RepositoryError::UniqueViolation(UniqueField::Username));
        }
        if state.users.iter().any(|u| u.email() == user.email) {
            return Err(RepositoryError::UniqueViolation(UniqueField::Email));
        }
        state.next_id += 1;
        let created = User::from_new(UserId::new(state.next_id), user, Utc::now());
        state.users.push(created.clone());
        Ok(created)
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        if self.fail_delete {
            return Err(RepositoryError::DatabaseError("connection reset".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        let before = state.users.len();
        state.users.retain(|u| u.id() != id);
        if state.users.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
