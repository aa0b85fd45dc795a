use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure reported by a non-SQL store, carrying the store's message.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("指定されたIDのタスクが見つかりません")]
    TaskNotFound,
}

impl ServiceError {
    /// Text recorded against a single failed row of a batch.
    pub fn row_message(&self) -> String {
        match self {
            ServiceError::Database(sqlx::Error::Database(db_err)) => db_err.message().to_string(),
            ServiceError::Database(e) => e.to_string(),
            ServiceError::Store(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Store(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid username or password"))
            }
            ServiceError::InvalidToken => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::TaskNotFound => {
                AppError::NotFound(anyhow::anyhow!("指定されたIDのタスクが見つかりません"))
            }
        }
    }
}
