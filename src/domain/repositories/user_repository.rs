use async_trait::async_trait;

use crate::domain::{
    error::RepositoryError,
    models::user::{ExternalId, NewUser, User, UserId},
};

/// Local store of user records.
///
/// Implementations must enforce uniqueness of `username` and `email` atomically at
/// write time and report a violation as [`RepositoryError::UniqueViolation`].
#[async_trait]
pub trait UserRepository {
    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError>;
    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, RepositoryError>;
    async fn find_all(&self) -> Result<Vec<User>, RepositoryError>;
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;
    /// Removes the row; `NotFound` if nothing was deleted.
    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;
}
