use axum::{
    extract::{Path, State},
    Json,
};
use bookshelf_core::{Book, BookId, PublicUser, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::{parse_id, ValidJson};
use crate::middleware::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LendingRequest {
    #[validate(length(min = 1, message = "bookId is required"))]
    pub book_id: String,
}

#[derive(Debug, Serialize)]
pub struct LendingResponse {
    pub message: String,
    pub book: Book,
}

/// POST /api/reader/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<ProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let updated = state
        .users
        .update_profile(&user.id, payload.name, payload.email)
        .await?;
    Ok(Json(updated))
}

/// POST /api/reader/books/borrow
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<LendingRequest>,
) -> Result<Json<LendingResponse>, ApiError> {
    let book_id: BookId = parse_id(&payload.book_id, "book")?;
    let book = state.lending.borrow(&user.id, &book_id).await?;

    Ok(Json(LendingResponse {
        message: "Book borrowed successfully".to_string(),
        book,
    }))
}

/// POST /api/reader/books/return
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<LendingRequest>,
) -> Result<Json<LendingResponse>, ApiError> {
    let book_id: BookId = parse_id(&payload.book_id, "book")?;
    let book = state.lending.return_book(&user.id, &book_id).await?;

    Ok(Json(LendingResponse {
        message: "Book returned successfully".to_string(),
        book,
    }))
}

/// GET /api/reader/books/{id}
pub async fn borrowed_books(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let reader: UserId = parse_id(&id, "user")?;
    let books = state.lending.borrowed_books(&user.id, &reader).await?;
    Ok(Json(books))
}
