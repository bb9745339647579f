mod config;
mod domain;
mod infrastructure;
mod presentation;
mod telemetry;
mod usecase;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use sea_orm::{ConnectOptions, Database};
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::{AppConfig, TokenKey},
    domain::{repositories::user_repository::UserRepository, services::identity_provider::IdentityProvider},
    infrastructure::{
        jwt_token_verifier::JwtTokenVerifier, keycloak_client::KeycloakAdminClient,
        keycloak_session::KeycloakAdminSession, schema::ensure_schema,
        user_repository::SqlUserRepository,
    },
    presentation::{
        auth::SharedTokenVerifier,
        handlers::{
            debug_handler::create_debug_router,
            user_handler::{AppState, create_user_router},
        },
        request_id::request_id_middleware,
    },
    usecase::{
        delete_user_usecase::DeleteUserUsecase, list_users_usecase::ListUsersUsecase,
        register_user_usecase::RegisterUserUsecase,
    },
};

fn build_app<R, I>(state: AppState<R, I>) -> Router
where
    R: UserRepository + Send + Sync + 'static,
    I: IdentityProvider + Send + Sync + 'static,
{
    let token_verifier = Arc::clone(&state.token_verifier);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest(
            "/api",
            Router::new()
                .nest("/users", create_user_router(state))
                .nest("/debug", create_debug_router(token_verifier)),
        )
        .layer(middleware::from_fn(request_id_middleware))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(config.log_format);

    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(10)
        .min_connections(1)
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    ensure_schema(&db).await?;
    let user_repository = SqlUserRepository::new(db);

    let http = reqwest::Client::new();
    let session = KeycloakAdminSession::new(
        http.clone(),
        &config.keycloak.url,
        &config.keycloak.admin_realm,
        config.keycloak.admin_client_id.clone(),
        config.keycloak.credentials.clone(),
    )?;
    // fail at startup rather than on the first registration
    session.access_token().await?;
    let identity_provider = KeycloakAdminClient::new(
        http,
        config.keycloak.url.clone(),
        config.keycloak.target_realm.clone(),
        session,
    );

    let token_verifier: SharedTokenVerifier = match &config.token_key {
        TokenKey::RsaPem(pem) => Arc::new(JwtTokenVerifier::from_rsa_pem(
            pem.as_bytes(),
            config.jwt_issuer.as_deref(),
        )?),
        TokenKey::Secret(secret) => Arc::new(JwtTokenVerifier::from_secret(
            secret.as_bytes(),
            config.jwt_issuer.as_deref(),
        )),
    };

    let state = AppState {
        register_service: Arc::new(RegisterUserUsecase::with_default_role(
            user_repository.clone(),
            identity_provider.clone(),
            config.default_role.clone(),
        )),
        delete_service: Arc::new(DeleteUserUsecase::new(
            user_repository.clone(),
            identity_provider,
        )),
        list_service: Arc::new(ListUsersUsecase::new(user_repository)),
        token_verifier,
        allow_self_registration: config.allow_self_registration,
    };
    let app = build_app(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        realm = %config.keycloak.target_realm,
        self_registration = config.allow_self_registration,
        "Listening"
    );
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
