//! Book inventory and the borrow/return workflow
//!
//! - [`BookService`]: authors create, list, update and delete their books;
//!   anyone can search the catalogue
//! - [`LendingService`]: readers borrow and return copies, moving stock and
//!   their borrowed list together in one transaction

pub mod books;
pub mod error;
pub mod lending;

pub use books::{AuthorShelf, BookChanges, BookService, NewBook};
pub use error::{LibraryError, Result};
pub use lending::{LendingService, MAX_BORROWED_BOOKS};
