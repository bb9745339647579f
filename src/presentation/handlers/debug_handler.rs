use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};

use crate::presentation::auth::{Principal, SharedTokenVerifier};

/// Echo of the authenticated caller, for troubleshooting token mapping.
#[derive(Serialize, Deserialize)]
pub struct AuthInfo {
    pub name: String,
    pub authenticated: bool,
    pub authorities: Vec<String>,
    pub jwt_subject: String,
    pub jwt_claims: serde_json::Value,
}

pub fn create_debug_router(token_verifier: SharedTokenVerifier) -> Router {
    Router::new()
        .route("/auth", get(auth_info))
        .with_state(token_verifier)
}

async fn auth_info(principal: Principal) -> Json<AuthInfo> {
    Json(AuthInfo {
        name: principal.name().to_string(),
        authenticated: true,
        authorities: principal.authorities.iter().cloned().collect(),
        jwt_subject: principal.claims.sub.clone(),
        jwt_claims: serde_json::to_value(&principal.claims).unwrap_or_default(),
    })
}
