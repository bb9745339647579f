use tracing::{error, info, instrument};

use crate::{
    domain::{
        error::{DomainError, RepositoryError, UniqueField},
        models::{
            registration::RegistrationRequest,
            user::{NewUser, User},
        },
        repositories::user_repository::UserRepository,
        services::identity_provider::{IdentityProvider, NewIdentity},
    },
    usecase::compensation::{Compensation, CompensationLog},
};

pub const DEFAULT_ROLE: &str = "BASIC";

/// Registers a user in the identity provider and the local store as one logical step.
pub struct RegisterUserUsecase<R: UserRepository, I: IdentityProvider> {
    user_repository: R,
    identity_provider: I,
    default_role: String,
}

impl<R: UserRepository, I: IdentityProvider> RegisterUserUsecase<R, I> {
    pub fn new(user_repository: R, identity_provider: I) -> Self {
        Self::with_default_role(user_repository, identity_provider, DEFAULT_ROLE.to_string())
    }

    pub fn with_default_role(user_repository: R, identity_provider: I, default_role: String) -> Self {
        Self {
            user_repository,
            identity_provider,
            default_role,
        }
    }

    /// Creates the remote identity first, then the local row.
    ///
    /// When the local write fails the remote identity is deleted again (best-effort) and
    /// the local failure is what the caller sees.
    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn register(&self, request: RegistrationRequest) -> Result<User, DomainError>
    where
        R: Send + Sync,
        I: Send + Sync,
    {
        request.ensure_valid()?;

        if self
            .user_repository
            .exists_by_username(&request.username)
            .await?
        {
            return Err(DomainError::DuplicateUsername);
        }
        if self.user_repository.exists_by_email(&request.email).await? {
            return Err(DomainError::DuplicateEmail);
        }

        let mut compensations = CompensationLog::new();

        // Step 1: remote identity
        let external_id = self
            .identity_provider
            .create_user(NewIdentity {
                username: &request.username,
                email: &request.email,
                password: &request.password,
                first_name: &request.first_name,
                last_name: &request.last_name,
                role: Some(request.role_or(&self.default_role)),
            })
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create user in identity provider"))?;
        compensations.record(Compensation::DeleteRemoteIdentity(external_id.clone()));

        // Step 2: local row
        let new_user = NewUser {
            username: request.username,
            email: request.email,
            external_id,
            first_name: request.first_name,
            last_name: request.last_name,
        };
        match self.user_repository.insert(new_user).await {
            Ok(user) => {
                info!(
                    user_id = %user.id(),
                    external_id = %user.external_id(),
                    "Successfully registered user"
                );
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, "Failed to persist local user");
                compensations.unwind(&self.identity_provider).await;
                Err(match e {
                    RepositoryError::UniqueViolation(UniqueField::Username) => {
                        DomainError::DuplicateUsername
                    }
                    RepositoryError::UniqueViolation(UniqueField::Email) => {
                        DomainError::DuplicateEmail
                    }
                    other => DomainError::RegistrationFailed(other),
                })
            }
        }
    }
}
