//! Queries over the `loans` table: which reader holds which book, in borrow
//! order.

use bookshelf_core::{Book, BookId, UserId};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::books::{self, BookRow};
use crate::error::{Result, StoreError};

pub async fn holds(conn: &mut SqliteConnection, reader: &UserId, book: &BookId) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM loans WHERE user_id = ? AND book_id = ?")
            .bind(reader.to_string())
            .bind(book.to_string())
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}

/// Record that `reader` holds `book`, unless they already hold `limit`
/// books. Returns false when the limit refused the loan.
pub async fn lend(
    conn: &mut SqliteConnection,
    reader: &UserId,
    book: &BookId,
    limit: usize,
) -> Result<bool> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let result = sqlx::query(
        "INSERT INTO loans (user_id, book_id, borrowed_at)
         SELECT ?1, ?2, ?3
         WHERE (SELECT COUNT(*) FROM loans WHERE user_id = ?1) < ?4",
    )
    .bind(reader.to_string())
    .bind(book.to_string())
    .bind(Utc::now())
    .bind(limit)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop the loan of `book` to `reader`. False when there was none.
pub async fn give_back(conn: &mut SqliteConnection, reader: &UserId, book: &BookId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM loans WHERE user_id = ? AND book_id = ?")
        .bind(reader.to_string())
        .bind(book.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Ids `reader` holds in borrow order, including books deleted since.
pub async fn book_ids_for(conn: &mut SqliteConnection, reader: &UserId) -> Result<Vec<BookId>> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT book_id FROM loans WHERE user_id = ? ORDER BY seq")
            .bind(reader.to_string())
            .fetch_all(&mut *conn)
            .await?;

    ids.iter()
        .map(|id| id.parse().map_err(|e| StoreError::Corrupt(format!("{e}"))))
        .collect()
}

/// Full records of the books `reader` holds in borrow order. Loans of
/// deleted books are skipped.
pub async fn books_for(conn: &mut SqliteConnection, reader: &UserId) -> Result<Vec<Book>> {
    let rows: Vec<BookRow> = sqlx::query_as(
        "SELECT b.id, b.title, b.author_id, b.genre, b.stock, b.description,
                b.created_at, b.updated_at
         FROM loans l JOIN books b ON b.id = l.book_id
         WHERE l.user_id = ?
         ORDER BY l.seq",
    )
    .bind(reader.to_string())
    .fetch_all(&mut *conn)
    .await?;

    books::collect(rows)
}

pub(crate) async fn forget_reader(conn: &mut SqliteConnection, reader: &UserId) -> Result<()> {
    sqlx::query("DELETE FROM loans WHERE user_id = ?")
        .bind(reader.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
