use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid registration request: {0}")]
    InvalidRequest(String),

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Identity provider error: {0}")]
    IdentityProvider(#[from] IdentityProviderError),

    #[error("Failed to register user: {0}")]
    RegistrationFailed(#[source] RepositoryError),

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to delete user: {0}")]
    DeletionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Column whose UNIQUE constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found")]
    NotFound,

    #[error("Unique constraint violated on {0:?}")]
    UniqueViolation(UniqueField),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Error)]
pub enum IdentityProviderError {
    #[error("Admin authentication failed: {0}")]
    Authentication(String),

    #[error("Request to identity provider failed: {0}")]
    Transport(String),

    #[error("Identity provider returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Identity provider response is missing the Location header")]
    MissingLocation,

    #[error("Realm role '{0}' does not exist")]
    RoleNotFound(String),

    #[error("Identity '{0}' does not exist")]
    IdentityNotFound(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,
}
