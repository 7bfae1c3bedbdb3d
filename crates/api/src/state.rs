use auth::UserService;
use bookshelf_core::AuthConfig;
use library::{BookService, LendingService};
use storage::Database;

/// Application state shared across all handlers
pub struct AppState {
    pub users: UserService,
    pub books: BookService,
    pub lending: LendingService,
}

impl AppState {
    pub fn new(db: Database, auth: &AuthConfig) -> Self {
        Self {
            users: UserService::new(db.clone(), auth.jwt_secret.clone(), auth.token_expiry_seconds),
            books: BookService::new(db.clone()),
            lending: LendingService::new(db),
        }
    }
}
