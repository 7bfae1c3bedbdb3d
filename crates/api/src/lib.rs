pub mod book_handlers;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod reader_handlers;
pub mod router;
pub mod state;
pub mod user_handlers;

pub use error::{ApiError, MessageResponse};
pub use router::router;
pub use state::AppState;
