use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use bookshelf_core::Role;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::{book_handlers, middleware as auth_middleware, reader_handlers, user_handlers, AppState};

pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(|| async { "Bookshelf API running" }))
        .route("/api/users/signup", post(user_handlers::signup))
        .route("/api/users/login", post(user_handlers::login))
        .route("/api/books", get(book_handlers::list_books));

    // Account routes (any authenticated user)
    let account_routes = Router::new()
        .route("/api/users/update/{id}", put(user_handlers::update_user))
        .route("/api/users/delete/{id}", delete(user_handlers::delete_user))
        .route("/api/users/session/validate", get(user_handlers::validate_session))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_auth,
        ));

    // Catalogue management (authors only); route layers run bottom-up
    let author_routes = Router::new()
        .route("/api/books/create", post(book_handlers::create_book))
        .route("/api/books/author/{id}", get(book_handlers::author_books))
        .route("/api/books/update/{id}", put(book_handlers::update_book))
        .route("/api/books/delete/{id}", delete(book_handlers::delete_book))
        .route_layer(middleware::from_fn(auth_middleware::require_role(Role::Author)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_auth,
        ));

    // Lending (readers only)
    let reader_routes = Router::new()
        .route("/api/reader/profile", post(reader_handlers::update_profile))
        .route("/api/reader/books/borrow", post(reader_handlers::borrow_book))
        .route("/api/reader/books/return", post(reader_handlers::return_book))
        .route("/api/reader/books/{id}", get(reader_handlers::borrowed_books))
        .route_layer(middleware::from_fn(auth_middleware::require_role(Role::Reader)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(account_routes)
        .merge(author_routes)
        .merge(reader_routes)
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
