use tracing::{error, info, instrument};

use crate::domain::{
    error::DomainError, models::user::UserId, repositories::user_repository::UserRepository,
    services::identity_provider::IdentityProvider,
};

/// Deletes a user from the identity provider, then from the local store.
pub struct DeleteUserUsecase<R: UserRepository, I: IdentityProvider> {
    user_repository: R,
    identity_provider: I,
}

impl<R: UserRepository, I: IdentityProvider> DeleteUserUsecase<R, I> {
    pub fn new(user_repository: R, identity_provider: I) -> Self {
        Self {
            user_repository,
            identity_provider,
        }
    }

    /// A failed remote delete keeps the local row so the call can be retried.
    ///
    /// A failed local delete after a successful remote delete is not compensated: the
    /// row is left pointing at an identity that no longer exists.
    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn delete(&self, id: UserId) -> Result<(), DomainError>
    where
        R: Send + Sync,
        I: Send + Sync,
    {
        let user = self
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        self.identity_provider
            .delete_user(user.external_id())
            .await
            .map_err(|e| {
                error!(error = %e, external_id = %user.external_id(), "Failed to delete user from identity provider");
                DomainError::DeletionFailed(Box::new(e))
            })?;

        self.user_repository.delete(id).await.map_err(|e| {
            error!(
                error = %e,
                external_id = %user.external_id(),
                "Identity provider user deleted but local row could not be removed"
            );
            DomainError::DeletionFailed(Box::new(e))
        })?;

        info!(username = %user.username(), "Successfully deleted user");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeIdentityProvider, InMemoryUserRepository};

    #[tokio::test]
    async fn removes_user_from_both_systems() {
        let repo = InMemoryUserRepository::new();
        let idp = FakeIdentityProvider::new();
        idp.seed("kc-1", "alice");
        let user = repo.seed("alice", "alice@example.com", "kc-1");
        let usecase = DeleteUserUsecase::new(repo.clone(), idp.clone());

        usecase.delete(user.id()).await.unwrap();

        assert_eq!(repo.len(), 0);
        assert!(!idp.contains("kc-1"));
        assert_eq!(idp.deleted(), vec!["kc-1".to_string()]);
    }

    #[tokio::test]
    async fn unknown_id_makes_no_remote_calls() {
        let idp = FakeIdentityProvider::new();
        let usecase = DeleteUserUsecase::new(InMemoryUserRepository::new(), idp.clone());

        let result = usecase.delete(UserId::new(42)).await;

        assert!(matches!(result, Err(DomainError::UserNotFound)));
        assert_eq!(idp.calls(), 0);
    }

    #[tokio::test]
    async fn remote_failure_keeps_local_row() {
        let repo = InMemoryUserRepository::new();
        let idp = FakeIdentityProvider::new().failing_delete();
        let user = repo.seed("alice", "alice@example.com", "kc-1");
        let usecase = DeleteUserUsecase::new(repo.clone(), idp);

        let result = usecase.delete(user.id()).await;

        assert!(matches!(result, Err(DomainError::DeletionFailed(_))));
        assert_eq!(repo.get(user.id()), Some(user));
    }

    #[tokio::test]
    async fn local_failure_after_remote_delete_is_reported() {
        let repo = InMemoryUserRepository::new().failing_delete();
        let idp = FakeIdentityProvider::new();
        idp.seed("kc-1", "alice");
        let user = repo.seed("alice", "alice@example.com", "kc-1");
        let usecase = DeleteUserUsecase::new(repo.clone(), idp.clone());

        let result = usecase.delete(user.id()).await;

        assert!(matches!(result, Err(DomainError::DeletionFailed(_))));
        assert!(!idp.contains("kc-1"));
        assert_eq!(repo.len(), 1);
    }
}
