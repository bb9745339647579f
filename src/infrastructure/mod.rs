pub mod entity;
pub mod jwt_token_verifier;
pub mod keycloak_client;
pub mod keycloak_session;
pub mod schema;
pub mod user_repository;
