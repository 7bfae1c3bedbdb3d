use auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use library::LibraryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of every error response, and of plain acknowledgements.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failures surfaced at the HTTP boundary
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Well-formed request refused by a business rule
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid or expired credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the role or ownership is wrong
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique field
    #[error("{0}")]
    Conflict(String),

    /// Detail is logged, never sent
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(MessageResponse { message })).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailTaken => ApiError::Conflict(err.to_string()),
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::Forbidden(msg) => ApiError::Forbidden(msg),
            AuthError::InvalidInput(msg) => ApiError::Validation(msg),
            AuthError::TokenValidationError(_) | AuthError::TokenExpired | AuthError::InvalidToken => {
                ApiError::Unauthorized("Not authorized, token failed".to_string())
            }
            AuthError::HashingError(_) | AuthError::TokenGenerationError(_) | AuthError::Store(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::BookNotFound | LibraryError::UserNotFound => {
                ApiError::NotFound(err.to_string())
            }
            LibraryError::Forbidden(msg) => ApiError::Forbidden(msg),
            LibraryError::InvalidInput(msg) => ApiError::Validation(msg),
            LibraryError::OutOfStock
            | LibraryError::BorrowLimitReached
            | LibraryError::AlreadyBorrowed
            | LibraryError::NotBorrowed
            | LibraryError::StockFull => ApiError::BadRequest(err.to_string()),
            LibraryError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::StoreError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(AuthError::EmailTaken).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(AuthError::TokenExpired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(LibraryError::BookNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(LibraryError::OutOfStock).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(LibraryError::StockFull).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(LibraryError::Forbidden("no".into())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(LibraryError::Store(StoreError::InvalidUrl("x".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_carry_through() {
        assert_eq!(
            ApiError::from(AuthError::EmailTaken).to_string(),
            "User already exists"
        );
        assert_eq!(
            ApiError::from(LibraryError::NotBorrowed).to_string(),
            "You have not borrowed this book"
        );
    }
}
