use bookshelf_core::{Book, BookId, UserId};
use serde::Serialize;
use storage::{books, Database, StoreError};

use crate::error::{LibraryError, Result};

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub genre: String,
    pub stock: u32,
    pub description: Option<String>,
}

/// Partial book update. `None` keeps the stored value, so `stock: Some(0)`
/// really does empty the shelf.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub stock: Option<u32>,
    /// An empty string clears the description.
    pub description: Option<String>,
}

/// An author's catalogue, plus the subset currently out with readers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorShelf {
    pub books: Vec<Book>,
    pub borrowed_books: Vec<Book>,
}

pub struct BookService {
    db: Database,
}

impl BookService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a book written by `author`. Authorship always comes from the
    /// caller's identity, never from the payload.
    pub async fn create(&self, author: &UserId, book: NewBook) -> Result<Book> {
        let title = required("title", &book.title)?.to_string();
        let genre = required("genre", &book.genre)?.to_string();
        let description = book.description.filter(|d| !d.trim().is_empty());

        let book = Book::new(title, *author, genre, book.stock, description);
        let mut conn = self.db.acquire().await?;
        books::insert(&mut conn, &book).await?;

        tracing::info!(book_id = %book.id, author = %author, stock = book.stock, "book created");
        Ok(book)
    }

    /// Every book, optionally narrowed to titles containing `title`
    /// (case-insensitive), sorted by title.
    pub async fn search(&self, title: Option<&str>) -> Result<Vec<Book>> {
        let needle = title.map(str::trim).filter(|t| !t.is_empty());

        let mut conn = self.db.acquire().await?;
        Ok(books::search(&mut conn, needle).await?)
    }

    pub async fn find(&self, id: &BookId) -> Result<Book> {
        let mut conn = self.db.acquire().await?;
        books::find(&mut conn, id)
            .await?
            .ok_or(LibraryError::BookNotFound)
    }

    /// The catalogue of `author`, visible only to that author.
    pub async fn by_author(&self, actor: &UserId, author: &UserId) -> Result<AuthorShelf> {
        if actor != author {
            return Err(LibraryError::Forbidden(
                "Not authorized to view these books".to_string(),
            ));
        }

        let mut tx = self.db.snapshot().await?;
        let shelf = AuthorShelf {
            books: books::by_author(&mut tx, author).await?,
            borrowed_books: books::on_loan_by_author(&mut tx, author).await?,
        };
        Ok(shelf)
    }

    pub async fn update(&self, actor: &UserId, id: &BookId, changes: BookChanges) -> Result<Book> {
        let title = changes
            .title
            .as_deref()
            .map(|t| required("title", t).map(str::to_string))
            .transpose()?;
        let genre = changes
            .genre
            .as_deref()
            .map(|g| required("genre", g).map(str::to_string))
            .transpose()?;

        let mut tx = self.db.begin().await?;
        let mut book = owned_book(&mut tx, actor, id, "update").await?;

        if let Some(title) = title {
            book.title = title;
        }
        if let Some(genre) = genre {
            book.genre = genre;
        }
        if let Some(stock) = changes.stock {
            book.stock = stock;
        }
        if let Some(description) = changes.description {
            let description = description.trim().to_string();
            book.description = (!description.is_empty()).then_some(description);
        }
        book.touch();

        books::update(&mut tx, &book).await?;
        tx.commit().await.map_err(StoreError::from)?;

        tracing::info!(book_id = %book.id, stock = book.stock, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, actor: &UserId, id: &BookId) -> Result<()> {
        let mut tx = self.db.begin().await?;
        owned_book(&mut tx, actor, id, "delete").await?;
        books::delete(&mut tx, id).await?;
        tx.commit().await.map_err(StoreError::from)?;

        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }
}

/// Missing books are reported before ownership, so a stranger learns only
/// that the book exists.
async fn owned_book(tx: &mut storage::Tx, actor: &UserId, id: &BookId, action: &str) -> Result<Book> {
    let book = books::find(tx, id).await?.ok_or(LibraryError::BookNotFound)?;
    if !book.is_owned_by(actor) {
        return Err(LibraryError::Forbidden(format!(
            "Not authorized to {} this book",
            action
        )));
    }
    Ok(book)
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}
