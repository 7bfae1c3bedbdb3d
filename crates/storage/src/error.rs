use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported database url: {0}")]
    InvalidUrl(String),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Turns a unique-index violation on `users.email` into
    /// [`StoreError::DuplicateEmail`].
    pub(crate) fn from_email_write(err: sqlx::Error, email: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateEmail(email.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
