use bookshelf_core::{Book, BookId, UserId};
use storage::{books, loans, users, Database, StoreError};

use crate::error::{LibraryError, Result};

/// How many books a reader may hold at once
pub const MAX_BORROWED_BOOKS: usize = 5;

/// Moves copies between the shelf and readers.
///
/// Each operation runs inside one write transaction. Stock only moves
/// through conditional updates (`stock > 0` to take, `stock < u32::MAX` to
/// put back) and a loan is only recorded while the reader is under the
/// limit, so concurrent requests can neither overdraw stock nor push a reader
/// past the limit.
pub struct LendingService {
    db: Database,
}

impl LendingService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Take one copy of `book_id` off the shelf for `reader`.
    pub async fn borrow(&self, reader: &UserId, book_id: &BookId) -> Result<Book> {
        let mut tx = self.db.begin().await?;

        let taken = books::take_copy(&mut tx, book_id).await?;
        if !taken && !books::exists(&mut tx, book_id).await? {
            return Err(LibraryError::BookNotFound);
        }
        if !users::exists(&mut tx, reader).await? {
            return Err(LibraryError::UserNotFound);
        }
        if loans::holds(&mut tx, reader, book_id).await? {
            return Err(LibraryError::AlreadyBorrowed);
        }
        if !taken {
            return Err(LibraryError::OutOfStock);
        }
        if !loans::lend(&mut tx, reader, book_id, MAX_BORROWED_BOOKS).await? {
            return Err(LibraryError::BorrowLimitReached);
        }

        let book = books::find(&mut tx, book_id)
            .await?
            .ok_or(LibraryError::BookNotFound)?;
        tx.commit().await.map_err(StoreError::from)?;

        tracing::info!(reader = %reader, book_id = %book_id, stock = book.stock, "book borrowed");
        Ok(book)
    }

    /// Put one copy of `book_id` held by `reader` back on the shelf.
    pub async fn return_book(&self, reader: &UserId, book_id: &BookId) -> Result<Book> {
        let mut tx = self.db.begin().await?;

        if !books::exists(&mut tx, book_id).await? {
            return Err(LibraryError::BookNotFound);
        }
        if !loans::give_back(&mut tx, reader, book_id).await? {
            return Err(LibraryError::NotBorrowed);
        }
        if !books::put_back_copy(&mut tx, book_id).await? {
            return Err(LibraryError::StockFull);
        }

        let book = books::find(&mut tx, book_id)
            .await?
            .ok_or(LibraryError::BookNotFound)?;
        tx.commit().await.map_err(StoreError::from)?;

        tracing::info!(reader = %reader, book_id = %book_id, stock = book.stock, "book returned");
        Ok(book)
    }

    /// The books `reader` currently holds, in the order they were borrowed.
    /// Only the reader themselves may look.
    pub async fn borrowed_books(&self, actor: &UserId, reader: &UserId) -> Result<Vec<Book>> {
        if actor != reader {
            return Err(LibraryError::Forbidden(
                "Not authorized to view these books".to_string(),
            ));
        }

        let mut tx = self.db.snapshot().await?;
        if !users::exists(&mut tx, reader).await? {
            return Err(LibraryError::UserNotFound);
        }
        // Loans of deleted books are skipped.
        Ok(loans::books_for(&mut tx, reader).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::{BookChanges, BookService, NewBook};
    use bookshelf_core::{Role, User};
    use std::sync::Arc;

    struct Fixture {
        db: Database,
        lending: LendingService,
    }

    async fn fixture() -> Fixture {
        fixture_at("sqlite::memory:").await
    }

    async fn fixture_at(url: &str) -> Fixture {
        let db = Database::connect(url).await.unwrap();
        Fixture {
            lending: LendingService::new(db.clone()),
            db,
        }
    }

    impl Fixture {
        async fn reader(&self, email: &str) -> UserId {
            let user = User::new("Reader".into(), email.into(), "hash".into(), Role::Reader);
            let mut conn = self.db.acquire().await.unwrap();
            users::insert(&mut conn, &user).await.unwrap();
            user.id
        }

        async fn book(&self, title: &str, stock: u32) -> BookId {
            let book = Book::new(title.into(), UserId::new(), "Fiction".into(), stock, None);
            let mut conn = self.db.acquire().await.unwrap();
            books::insert(&mut conn, &book).await.unwrap();
            book.id
        }

        async fn stock(&self, id: &BookId) -> u32 {
            let mut conn = self.db.acquire().await.unwrap();
            books::find(&mut conn, id).await.unwrap().unwrap().stock
        }

        async fn held(&self, id: &UserId) -> Vec<BookId> {
            let mut conn = self.db.acquire().await.unwrap();
            loans::book_ids_for(&mut conn, id).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_borrow_then_return_round_trip() {
        let fx = fixture().await;
        let reader = fx.reader("r@example.com").await;
        let book = fx.book("Test Book", 10).await;

        let borrowed = fx.lending.borrow(&reader, &book).await.unwrap();
        assert_eq!(borrowed.stock, 9);
        assert_eq!(fx.held(&reader).await, vec![book]);

        let returned = fx.lending.return_book(&reader, &book).await.unwrap();
        assert_eq!(returned.stock, 10);
        assert!(fx.held(&reader).await.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_stock_changes_nothing() {
        let fx = fixture().await;
        let reader = fx.reader("r@example.com").await;
        let book = fx.book("Gone", 0).await;

        let err = fx.lending.borrow(&reader, &book).await.unwrap_err();
        assert!(matches!(err, LibraryError::OutOfStock));
        assert_eq!(fx.stock(&book).await, 0);
        assert!(fx.held(&reader).await.is_empty());
    }

    #[tokio::test]
    async fn test_limit_of_five() {
        let fx = fixture().await;
        let reader = fx.reader("r@example.com").await;

        for i in 0..4 {
            let book = fx.book(&format!("Book {}", i), 1).await;
            fx.lending.borrow(&reader, &book).await.unwrap();
        }

        let fifth = fx.book("Fifth", 1).await;
        fx.lending.borrow(&reader, &fifth).await.unwrap();
        assert_eq!(fx.held(&reader).await.len(), MAX_BORROWED_BOOKS);

        let sixth = fx.book("Sixth", 1).await;
        let err = fx.lending.borrow(&reader, &sixth).await.unwrap_err();
        assert!(matches!(err, LibraryError::BorrowLimitReached));
        assert_eq!(fx.stock(&sixth).await, 1);
    }

    #[tokio::test]
    async fn test_same_book_twice_is_refused() {
        let fx = fixture().await;
        let reader = fx.reader("r@example.com").await;
        let book = fx.book("Popular", 5).await;

        fx.lending.borrow(&reader, &book).await.unwrap();
        let err = fx.lending.borrow(&reader, &book).await.unwrap_err();

        assert!(matches!(err, LibraryError::AlreadyBorrowed));
        assert_eq!(fx.stock(&book).await, 4);
    }

    #[tokio::test]
    async fn test_return_without_borrow_fails() {
        let fx = fixture().await;
        let reader = fx.reader("r@example.com").await;
        let book = fx.book("Untouched", 3).await;

        let err = fx.lending.return_book(&reader, &book).await.unwrap_err();
        assert!(matches!(err, LibraryError::NotBorrowed));
        assert_eq!(fx.stock(&book).await, 3);

        let err = fx.lending.return_book(&reader, &BookId::new()).await.unwrap_err();
        assert!(matches!(err, LibraryError::BookNotFound));
    }

    #[tokio::test]
    async fn test_missing_book_cannot_be_borrowed() {
        let fx = fixture().await;
        let reader = fx.reader("r@example.com").await;

        let err = fx.lending.borrow(&reader, &BookId::new()).await.unwrap_err();
        assert!(matches!(err, LibraryError::BookNotFound));
    }

    #[tokio::test]
    async fn test_borrowed_books_view() {
        let fx = fixture().await;
        let reader = fx.reader("r@example.com").await;
        let other = fx.reader("o@example.com").await;
        let first = fx.book("Zebra", 1).await;
        let second = fx.book("Aardvark", 1).await;

        fx.lending.borrow(&reader, &first).await.unwrap();
        fx.lending.borrow(&reader, &second).await.unwrap();

        let books = fx.lending.borrowed_books(&reader, &reader).await.unwrap();
        let ids: Vec<_> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![first, second]);

        let err = fx.lending.borrowed_books(&other, &reader).await.unwrap_err();
        assert!(matches!(err, LibraryError::Forbidden(_)));

        let mut conn = fx.db.acquire().await.unwrap();
        books::delete(&mut conn, &first).await.unwrap();
        drop(conn);
        let books = fx.lending.borrowed_books(&reader, &reader).await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, second);
    }

    #[tokio::test]
    async fn test_return_onto_a_full_shelf_is_refused() {
        let fx = fixture().await;
        let reader = fx.reader("r@example.com").await;
        let author = UserId::new();
        let shelf = BookService::new(fx.db.clone());
        let book = shelf
            .create(
                &author,
                NewBook {
                    title: "Bottomless".into(),
                    genre: "Fiction".into(),
                    stock: 1,
                    description: None,
                },
            )
            .await
            .unwrap();

        fx.lending.borrow(&reader, &book.id).await.unwrap();
        shelf
            .update(&author, &book.id, BookChanges { stock: Some(u32::MAX), ..Default::default() })
            .await
            .unwrap();

        let err = fx.lending.return_book(&reader, &book.id).await.unwrap_err();
        assert!(matches!(err, LibraryError::StockFull));
        assert_eq!(fx.stock(&book.id).await, u32::MAX);
        assert_eq!(fx.held(&reader).await, vec![book.id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_never_overdraw() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("lending.db").display());
        let fx = Arc::new(fixture_at(&url).await);
        let book = fx.book("Scarce", 3).await;

        let mut readers = Vec::new();
        for i in 0..12 {
            readers.push(fx.reader(&format!("reader{}@example.com", i)).await);
        }

        let handles: Vec<_> = readers
            .into_iter()
            .map(|reader| {
                let fx = Arc::clone(&fx);
                tokio::spawn(async move { fx.lending.borrow(&reader, &book).await.is_ok() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 3);
        assert_eq!(fx.stock(&book).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_never_pass_the_limit() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("lending.db").display());
        let fx = Arc::new(fixture_at(&url).await);
        let reader = fx.reader("greedy@example.com").await;

        for i in 0..MAX_BORROWED_BOOKS - 1 {
            let book = fx.book(&format!("Held {}", i), 1).await;
            fx.lending.borrow(&reader, &book).await.unwrap();
        }

        let mut wanted = Vec::new();
        for i in 0..6 {
            wanted.push(fx.book(&format!("Wanted {}", i), 1).await);
        }

        let handles: Vec<_> = wanted
            .iter()
            .copied()
            .map(|book| {
                let fx = Arc::clone(&fx);
                tokio::spawn(async move { fx.lending.borrow(&reader, &book).await })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => granted += 1,
                Err(err) => assert!(matches!(err, LibraryError::BorrowLimitReached)),
            }
        }

        assert_eq!(granted, 1);
        assert_eq!(fx.held(&reader).await.len(), MAX_BORROWED_BOOKS);

        let mut left_on_shelf = 0;
        for book in &wanted {
            left_on_shelf += fx.stock(book).await;
        }
        assert_eq!(left_on_shelf, wanted.len() as u32 - 1);
    }
}
