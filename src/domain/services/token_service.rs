use crate::domain::{error::AuthError, models::claims::TokenClaims};

/// Verifies bearer tokens issued by the identity provider.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError>;
}
