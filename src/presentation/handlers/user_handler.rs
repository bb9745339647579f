use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    domain::{
        models::{
            registration::RegistrationRequest,
            user::{User, UserId},
        },
        repositories::user_repository::UserRepository,
        services::{identity_provider::IdentityProvider, role_mapper::ADMIN_AUTHORITY},
    },
    presentation::{
        auth::{Principal, SharedTokenVerifier},
        error::ApiError,
    },
    usecase::{
        delete_user_usecase::DeleteUserUsecase, list_users_usecase::ListUsersUsecase,
        register_user_usecase::RegisterUserUsecase,
    },
};

// Response

/// json for a stored user
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id().value(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            external_id: user.external_id().to_string(),
            first_name: user.first_name().to_string(),
            last_name: user.last_name().to_string(),
            active: user.is_active(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

/* Router Function and Handler Function */

pub struct AppState<R: UserRepository, I: IdentityProvider> {
    pub register_service: Arc<RegisterUserUsecase<R, I>>,
    pub delete_service: Arc<DeleteUserUsecase<R, I>>,
    pub list_service: Arc<ListUsersUsecase<R>>,
    pub token_verifier: SharedTokenVerifier,
    /// Lets unauthenticated callers register; listing and deleting stay admin-only.
    pub allow_self_registration: bool,
}

// derive(Clone) would require R: Clone and I: Clone
impl<R: UserRepository, I: IdentityProvider> Clone for AppState<R, I> {
    fn clone(&self) -> Self {
        Self {
            register_service: Arc::clone(&self.register_service),
            delete_service: Arc::clone(&self.delete_service),
            list_service: Arc::clone(&self.list_service),
            token_verifier: Arc::clone(&self.token_verifier),
            allow_self_registration: self.allow_self_registration,
        }
    }
}

impl<R: UserRepository, I: IdentityProvider> FromRef<AppState<R, I>> for SharedTokenVerifier {
    fn from_ref(state: &AppState<R, I>) -> Self {
        Arc::clone(&state.token_verifier)
    }
}

/// Routes for user management, to be nested under `/api/users`.
pub fn create_user_router<R, I>(state: AppState<R, I>) -> Router
where
    R: UserRepository + Send + Sync + 'static,
    I: IdentityProvider + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_users::<R, I>))
        .route("/register", post(register::<R, I>))
        .route("/{id}", delete(delete_user::<R, I>))
        .with_state(state)
}

// handler function

async fn register<R, I>(
    State(state): State<AppState<R, I>>,
    principal: Result<Principal, ApiError>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError>
where
    R: UserRepository + Send + Sync,
    I: IdentityProvider + Send + Sync,
{
    let is_admin = if state.allow_self_registration {
        principal.is_ok_and(|p| p.has_authority(ADMIN_AUTHORITY))
    } else {
        principal?.require(ADMIN_AUTHORITY)?;
        true
    };
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    // self-registered users always get the default role
    if !is_admin {
        if let Some(role) = request.requested_role() {
            warn!(username = %request.username, role, "Role requested without admin authority");
            return Err(ApiError::Forbidden);
        }
    }

    let user = state.register_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn list_users<R, I>(
    State(state): State<AppState<R, I>>,
    principal: Principal,
) -> Result<Json<Vec<UserResponse>>, ApiError>
where
    R: UserRepository + Send + Sync,
    I: IdentityProvider + Send + Sync,
{
    principal.require(ADMIN_AUTHORITY)?;

    let users = state.list_service.list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn delete_user<R, I>(
    State(state): State<AppState<R, I>>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError>
where
    R: UserRepository + Send + Sync,
    I: IdentityProvider + Send + Sync,
{
    principal.require(ADMIN_AUTHORITY)?;

    state.delete_service.delete(UserId::new(id)).await?;
    info!(user_id = id, by = %principal.name(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
