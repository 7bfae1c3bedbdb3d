//! Shared building blocks for the bookshelf service: the domain model every
//! crate speaks and the layered application configuration.

pub mod config;
pub mod model;

pub use config::{AppConfig, AuthConfig, DatabaseConfig, ServerConfig};
pub use model::{Book, BookId, ParseIdError, PublicUser, Role, User, UserId};
