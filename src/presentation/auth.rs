use std::{collections::BTreeSet, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::{
    domain::{
        error::AuthError,
        models::claims::TokenClaims,
        services::{role_mapper, token_service::TokenVerifier},
    },
    presentation::error::ApiError,
};

pub type SharedTokenVerifier = Arc<dyn TokenVerifier>;

/// Caller authenticated by a bearer token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub claims: TokenClaims,
    pub authorities: BTreeSet<String>,
}

impl Principal {
    pub fn name(&self) -> &str {
        self.claims.principal_name()
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    pub fn require(&self, authority: &str) -> Result<(), ApiError> {
        if self.has_authority(authority) {
            Ok(())
        } else {
            warn!(principal = %self.name(), required = authority, "Access denied");
            Err(ApiError::Forbidden)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    SharedTokenVerifier: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = <SharedTokenVerifier as FromRef<S>>::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let claims = verifier.verify(token)?;
        let authorities = role_mapper::authorities(&claims);

        Ok(Self {
            claims,
            authorities,
        })
    }
}
