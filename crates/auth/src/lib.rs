// Core modules
mod error;
mod jwt;
mod password;

// Database-backed modules
pub mod model;
pub mod service;

// Re-export error types
pub use error::{AuthError, Result};

// Re-export crypto primitives
pub use jwt::{generate_token, validate_token, Claims};
pub use password::{hash_password, verify_password};

pub use model::{normalize_email, AccountUpdate, NewAccount, Session};
pub use service::UserService;
