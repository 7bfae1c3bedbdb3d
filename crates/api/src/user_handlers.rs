use auth::{AccountUpdate, NewAccount, Session};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookshelf_core::{PublicUser, Role, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, MessageResponse};
use crate::extract::{parse_id, ValidJson};
use crate::middleware::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Absent keys keep their stored value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub message: String,
    pub user: PublicUser,
}

/// POST /api/users/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state
        .users
        .signup(NewAccount {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            role: payload.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state.users.login(&payload.email, &payload.password).await?;
    Ok(Json(session))
}

/// PUT /api/users/update/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let target: UserId = parse_id(&id, "user")?;
    let changes = AccountUpdate {
        name: payload.name,
        email: payload.email,
        password: payload.password,
    };

    let updated = state.users.update(&user.id, &target, changes).await?;
    Ok(Json(updated))
}

/// DELETE /api/users/delete/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let target: UserId = parse_id(&id, "user")?;
    state.users.delete(&user.id, &target).await?;
    Ok(Json(MessageResponse::new("User removed")))
}

/// GET /api/users/session/validate
pub async fn validate_session(AuthUser(user): AuthUser) -> Json<SessionStatus> {
    Json(SessionStatus {
        message: "Session is valid".to_string(),
        user: user.to_public(),
    })
}
