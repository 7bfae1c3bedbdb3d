use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bookshelf_core::{Book, BookId, UserId};
use library::{AuthorShelf, BookChanges, NewBook};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, MessageResponse};
use crate::extract::{parse_id, ValidJson};
use crate::middleware::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Genre is required"))]
    pub genre: String,
    pub stock: u32,
    pub description: Option<String>,
}

/// Absent keys keep their stored value; `"stock": 0` is honoured.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Genre must not be empty"))]
    pub genre: Option<String>,
    pub stock: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
}

/// POST /api/books/create
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<CreateBookRequest>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state
        .books
        .create(
            &user.id,
            NewBook {
                title: payload.title,
                genre: payload.genre,
                stock: payload.stock,
                description: payload.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /api/books?title=
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = state.books.search(query.title.as_deref()).await?;
    Ok(Json(books))
}

/// GET /api/books/author/{id}
pub async fn author_books(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<AuthorShelf>, ApiError> {
    let author: UserId = parse_id(&id, "author")?;
    let shelf = state.books.by_author(&user.id, &author).await?;
    Ok(Json(shelf))
}

/// PUT /api/books/update/{id}
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateBookRequest>,
) -> Result<Json<Book>, ApiError> {
    let book_id: BookId = parse_id(&id, "book")?;
    let changes = BookChanges {
        title: payload.title,
        genre: payload.genre,
        stock: payload.stock,
        description: payload.description,
    };

    let book = state.books.update(&user.id, &book_id, changes).await?;
    Ok(Json(book))
}

/// DELETE /api/books/delete/{id}
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let book_id: BookId = parse_id(&id, "book")?;
    state.books.delete(&user.id, &book_id).await?;
    Ok(Json(MessageResponse::new("Book removed")))
}
