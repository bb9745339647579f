use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::domain::{
    error::AuthError, models::claims::TokenClaims, services::token_service::TokenVerifier,
};

#[derive(Clone)]
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    /// Verifies RS256 tokens against the realm's public key (PEM).
    pub fn from_rsa_pem(pem: &[u8], issuer: Option<&str>) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self::with_key(
            DecodingKey::from_rsa_pem(pem)?,
            Algorithm::RS256,
            issuer,
        ))
    }

    /// Verifies HS256 tokens signed with a shared secret.
    pub fn from_secret(secret: &[u8], issuer: Option<&str>) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256, issuer)
    }

    fn with_key(decoding_key: DecodingKey, algorithm: Algorithm, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(algorithm);
        // Keycloak access tokens carry a varying audience ("account", client ids)
        validation.validate_aud = false;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            decoding_key,
            validation,
        }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AuthError::InvalidToken
            })
    }
}
