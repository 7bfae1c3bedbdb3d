//! Queries over the `books` table.

use bookshelf_core::{Book, BookId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::error::{Result, StoreError};

#[derive(Debug, FromRow)]
pub(crate) struct BookRow {
    id: String,
    title: String,
    author_id: String,
    genre: String,
    stock: i64,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookRow {
    pub(crate) fn into_book(self) -> Result<Book> {
        Ok(Book {
            id: self.id.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            title: self.title,
            author: self
                .author_id
                .parse::<UserId>()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            genre: self.genre,
            stock: u32::try_from(self.stock)
                .map_err(|_| StoreError::Corrupt(format!("stock {} out of range", self.stock)))?,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub(crate) fn collect(rows: Vec<BookRow>) -> Result<Vec<Book>> {
    rows.into_iter().map(BookRow::into_book).collect()
}

pub async fn find(conn: &mut SqliteConnection, id: &BookId) -> Result<Option<Book>> {
    let row: Option<BookRow> = sqlx::query_as(
        "SELECT id, title, author_id, genre, stock, description, created_at, updated_at
         FROM books WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(BookRow::into_book).transpose()
}

pub async fn exists(conn: &mut SqliteConnection, id: &BookId) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM books WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Every book whose title contains `needle` (ASCII case folding), or every
/// book when there is no needle. Sorted by title, then id.
pub async fn search(conn: &mut SqliteConnection, needle: Option<&str>) -> Result<Vec<Book>> {
    let rows: Vec<BookRow> = match needle {
        Some(needle) => {
            sqlx::query_as(
                "SELECT id, title, author_id, genre, stock, description, created_at, updated_at
                 FROM books WHERE instr(lower(title), lower(?)) > 0
                 ORDER BY title, id",
            )
            .bind(needle)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT id, title, author_id, genre, stock, description, created_at, updated_at
                 FROM books ORDER BY title, id",
            )
            .fetch_all(&mut *conn)
            .await?
        }
    };

    collect(rows)
}

pub async fn by_author(conn: &mut SqliteConnection, author: &UserId) -> Result<Vec<Book>> {
    let rows: Vec<BookRow> = sqlx::query_as(
        "SELECT id, title, author_id, genre, stock, description, created_at, updated_at
         FROM books WHERE author_id = ? ORDER BY title, id",
    )
    .bind(author.to_string())
    .fetch_all(&mut *conn)
    .await?;

    collect(rows)
}

/// Books by `author` that at least one reader currently holds.
pub async fn on_loan_by_author(conn: &mut SqliteConnection, author: &UserId) -> Result<Vec<Book>> {
    let rows: Vec<BookRow> = sqlx::query_as(
        "SELECT id, title, author_id, genre, stock, description, created_at, updated_at
         FROM books
         WHERE author_id = ? AND EXISTS (SELECT 1 FROM loans WHERE loans.book_id = books.id)
         ORDER BY title, id",
    )
    .bind(author.to_string())
    .fetch_all(&mut *conn)
    .await?;

    collect(rows)
}

pub async fn insert(conn: &mut SqliteConnection, book: &Book) -> Result<()> {
    sqlx::query(
        "INSERT INTO books (id, title, author_id, genre, stock, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(book.id.to_string())
    .bind(&book.title)
    .bind(book.author.to_string())
    .bind(&book.genre)
    .bind(i64::from(book.stock))
    .bind(&book.description)
    .bind(book.created_at)
    .bind(book.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Overwrite the editable fields of an existing book.
pub async fn update(conn: &mut SqliteConnection, book: &Book) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE books SET title = ?, genre = ?, stock = ?, description = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&book.title)
    .bind(&book.genre)
    .bind(i64::from(book.stock))
    .bind(&book.description)
    .bind(book.updated_at)
    .bind(book.id.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(conn: &mut SqliteConnection, id: &BookId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Take one copy off the shelf. False when the book is missing or out of
/// stock.
pub async fn take_copy(conn: &mut SqliteConnection, id: &BookId) -> Result<bool> {
    let result =
        sqlx::query("UPDATE books SET stock = stock - 1, updated_at = ? WHERE id = ? AND stock > 0")
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Put one copy back on the shelf. False when the book is missing or its
/// stock is already `u32::MAX`.
pub async fn put_back_copy(conn: &mut SqliteConnection, id: &BookId) -> Result<bool> {
    let result =
        sqlx::query("UPDATE books SET stock = stock + 1, updated_at = ? WHERE id = ? AND stock < ?")
            .bind(Utc::now())
            .bind(id.to_string())
            .bind(i64::from(u32::MAX))
            .execute(&mut *conn)
            .await?;
    Ok(result.rows_affected() > 0)
}
