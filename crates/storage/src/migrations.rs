//! Versioned schema, applied in order when a database is opened.

use sqlx::SqlitePool;

use crate::error::Result;

struct Migration {
    version: i64,
    name: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 20250301_000001,
        name: "create_users_table",
        statements: &[
            "CREATE TABLE users (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('author', 'reader')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE UNIQUE INDEX idx_users_email ON users (email)",
        ],
    },
    Migration {
        version: 20250301_000002,
        name: "create_books_table",
        statements: &[
            "CREATE TABLE books (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                author_id TEXT NOT NULL,
                genre TEXT NOT NULL,
                stock INTEGER NOT NULL CHECK (stock >= 0 AND stock <= 4294967295),
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE INDEX idx_books_author ON books (author_id)",
            "CREATE INDEX idx_books_title ON books (title)",
        ],
    },
    // No foreign keys: deleting a book leaves readers' loans in place.
    Migration {
        version: 20250301_000003,
        name: "create_loans_table",
        statements: &[
            "CREATE TABLE loans (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                borrowed_at TEXT NOT NULL,
                UNIQUE (user_id, book_id)
            )",
            "CREATE INDEX idx_loans_book ON loans (book_id)",
        ],
    },
];

/// Apply every migration newer than the recorded schema version.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    let current = current.unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(version = migration.version, name = migration.name, "migration applied");
    }

    Ok(())
}
