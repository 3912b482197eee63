//! Error types module
//!
//! Unified application error enum used at crate boundaries. Repository and
//! storage crates define their own error types and convert into `AppError`
//! where a single surface is needed (e.g. HTTP responses).

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Internal error wrapping a source error with context.
    pub fn internal_with_source(message: impl Into<String>, source: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: message.into(),
            source,
        }
    }

    /// HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) | AppError::BadRequest(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::PayloadTooLarge(_) => 413,
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Config(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => 500,
        }
    }

    /// Message safe to return to API clients. Internal variants are
    /// summarized so backend details never leak into responses.
    pub fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::Database(_) => "Database error".to_string(),
            AppError::Storage(_) => "Storage error".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AppError::Database("connection refused to 10.0.0.5".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(!err.client_message().contains("10.0.0.5"));
    }

    #[test]
    fn client_errors_carry_their_message() {
        let err = AppError::InvalidInput("missing file field".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.client_message(), "missing file field");
    }
}
