use storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Book not found")]
    BookNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Book is out of stock")]
    OutOfStock,

    #[error("You have reached the maximum limit of borrowed books")]
    BorrowLimitReached,

    #[error("You have already borrowed this book")]
    AlreadyBorrowed,

    #[error("You have not borrowed this book")]
    NotBorrowed,

    #[error("Book stock is already at its maximum")]
    StockFull,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
