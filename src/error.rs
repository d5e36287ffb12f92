use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("record was not created")]
    NotCreated,

    #[error("record was not updated")]
    NotUpdated,

    #[error("record was not deleted")]
    NotDeleted,

    #[error("token collision")]
    TokenCollision,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Coarse classification used at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotCreated,
    NotUpdated,
    NotDeleted,
    Forbidden,
    Unauthorized,
    Validation,
    Storage,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound => ErrorKind::NotFound,
            Error::NotCreated => ErrorKind::NotCreated,
            Error::NotUpdated => ErrorKind::NotUpdated,
            Error::NotDeleted => ErrorKind::NotDeleted,
            Error::Forbidden => ErrorKind::Forbidden,
            Error::Unauthorized | Error::InvalidTokenFormat => ErrorKind::Unauthorized,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Database(_) | Error::TokenCollision | Error::Io(_) | Error::Config(_) => {
                ErrorKind::Storage
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_classify_by_variant() {
        assert_eq!(Error::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(Error::NotUpdated.kind(), ErrorKind::NotUpdated);
        assert_eq!(Error::NotDeleted.kind(), ErrorKind::NotDeleted);
        assert_eq!(
            Error::Validation("name is required".into()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_storage_failures_classify_as_storage() {
        let err = Error::from(rusqlite::Error::InvalidQuery);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(Error::TokenCollision.kind(), ErrorKind::Storage);
    }
}
