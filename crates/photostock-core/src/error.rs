//! Error types module
//!
//! `AppError` is the catalog and licensing error shared by the store traits and
//! the services built on them. Rendering and pipeline failures have their own
//! types in `photostock-processing`.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Stable machine-readable code for logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "sqlx")]
            AppError::Database(e) => matches!(
                e,
                SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_)
            ),
            _ => false,
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => AppError::NotFound("Row not found".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_pool_errors_are_transient() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert!(err.is_transient());

        let missing = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(missing, AppError::NotFound(_)));
        assert!(!missing.is_transient());
    }

    #[test]
    fn test_codes() {
        assert_eq!(AppError::NotFound("asset".to_string()).code(), "NOT_FOUND");
        assert_eq!(AppError::Conflict("dup".to_string()).code(), "CONFLICT");
    }

    #[test]
    fn test_anyhow_conversion_keeps_message() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AppError::InternalWithSource { ref message, .. } if message == "boom"));
        assert_eq!(err.to_string(), "boom");
    }
}
