use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local primary key of a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(i32);
impl UserId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier the identity provider assigned to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId(String);
impl ExternalId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row about to be written by the registration protocol.
///
/// A new row is always active; the store assigns `id` and both timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub external_id: ExternalId,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    email: String,
    external_id: ExternalId,
    first_name: String,
    last_name: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Rebuild a user from a persisted row.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: UserId,
        username: String,
        email: String,
        external_id: ExternalId,
        first_name: String,
        last_name: String,
        active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            email,
            external_id,
            first_name,
            last_name,
            active,
            created_at,
            // never earlier than creation
            updated_at: updated_at.max(created_at),
        }
    }

    pub fn from_new(id: UserId, new_user: NewUser, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username: new_user.username,
            email: new_user.email,
            external_id: new_user.external_id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            active: true,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn email(&self) -> &str {
        &self.email
    }
    pub fn external_id(&self) -> &ExternalId {
        &self.external_id
    }
    pub fn first_name(&self) -> &str {
        &self.first_name
    }
    pub fn last_name(&self) -> &str {
        &self.last_name
    }
    pub fn is_active(&self) -> bool {
        self.active
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
