use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has been deserialized and then checked with its
/// `validator` rules. Both failures become a 400 with a `message`.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| ApiError::Validation(errors.to_string()))?;

        Ok(ValidJson(value))
    }
}

/// Parse a document id taken from a path segment or a body field
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("Invalid {} id", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::BookId;

    #[test]
    fn test_parse_id() {
        let id = BookId::new();
        assert_eq!(parse_id::<BookId>(&id.to_string(), "book").unwrap(), id);

        let err = parse_id::<BookId>("64f0c2", "book").unwrap_err();
        assert_eq!(err.to_string(), "Invalid book id");
    }
}
