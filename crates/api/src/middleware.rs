use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use bookshelf_core::{Role, User};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Extract and validate the bearer token from the Authorization header
pub async fn extract_user_from_token(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

    state.users.validate(token).await.map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::from(e)
    })
}

/// Middleware to require authentication.
///
/// Resolves the token to a live user and stores it in the request
/// extensions for [`require_role`] and [`AuthUser`].
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = extract_user_from_token(&state, request.headers()).await?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

type GateFuture = Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>>;

/// Middleware to require a specific role. Must run inside [`require_auth`],
/// i.e. be added with `route_layer` before it.
pub fn require_role(required_role: Role) -> impl Fn(Request, Next) -> GateFuture + Clone + Send + 'static {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let role = request
                .extensions()
                .get::<User>()
                .map(|user| user.role)
                .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

            if role != required_role {
                return Err(ApiError::Forbidden(format!(
                    "Not authorized, {}s only",
                    required_role
                )));
            }

            Ok(next.run(request).await)
        })
    }
}

/// Extractor for authenticated user
/// Use this in handlers that are protected by auth middleware
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("User not authenticated".to_string()))
    }
}
