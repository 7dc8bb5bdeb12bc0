use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("query failed: {0}")]
    Query(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification used when deciding what to tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Query,
    NotFound,
    Validation,
    Other,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Database(_) | AppError::Sqlite(_) | AppError::Http(_) | AppError::Query(_) => {
                ErrorCategory::Query
            }
            AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::Validation(_) => ErrorCategory::Validation,
            _ => ErrorCategory::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            AppError::Query("503".into()).category(),
            ErrorCategory::Query
        );
        assert_eq!(
            AppError::Sqlite(rusqlite::Error::QueryReturnedNoRows).category(),
            ErrorCategory::Query
        );
        assert_eq!(
            AppError::NotFound("tip".into()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            AppError::Validation("no fields".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AppError::Audio("missing file".into()).category(),
            ErrorCategory::Other
        );
    }
}
