//! Queries over the `users` table. A user's borrowed list lives in `loans`
//! and is loaded alongside the row.

use bookshelf_core::{Role, User, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::error::{Result, StoreError};
use crate::loans;

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role.parse::<Role>().map_err(StoreError::Corrupt)?,
            borrowed_books: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

async fn hydrate(conn: &mut SqliteConnection, row: Option<UserRow>) -> Result<Option<User>> {
    let Some(row) = row else {
        return Ok(None);
    };

    let mut user = row.into_user()?;
    user.borrowed_books = loans::book_ids_for(conn, &user.id).await?;
    Ok(Some(user))
}

pub async fn find(conn: &mut SqliteConnection, id: &UserId) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, name, email, password_hash, role, created_at, updated_at
         FROM users WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    hydrate(conn, row).await
}

pub async fn find_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, name, email, password_hash, role, created_at, updated_at
         FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;

    hydrate(conn, row).await
}

pub async fn exists(conn: &mut SqliteConnection, id: &UserId) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Whether `email` belongs to anyone other than `except`.
pub async fn email_taken(
    conn: &mut SqliteConnection,
    email: &str,
    except: Option<&UserId>,
) -> Result<bool> {
    let owner: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(match owner {
        Some(owner) => except.is_none_or(|id| id.to_string() != owner),
        None => false,
    })
}

/// Fails with [`StoreError::DuplicateEmail`] if the email is registered.
pub async fn insert(conn: &mut SqliteConnection, user: &User) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id.to_string())
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::from_email_write(e, &user.email))?;
    Ok(())
}

/// Overwrite name, email and password hash. The borrowed list is managed
/// through [`loans`].
pub async fn update(conn: &mut SqliteConnection, user: &User) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET name = ?, email = ?, password_hash = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.updated_at)
    .bind(user.id.to_string())
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::from_email_write(e, &user.email))?;
    Ok(result.rows_affected() > 0)
}

/// Remove the user and their borrowed list. Books they wrote stay.
pub async fn delete(conn: &mut SqliteConnection, id: &UserId) -> Result<bool> {
    loans::forget_reader(conn, id).await?;

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
