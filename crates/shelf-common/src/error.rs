//! Error types shared across Shelf crates

use thiserror::Error;

/// Result type alias for shared Shelf operations
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Main error type for code living in `shelf-common`
#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl ShelfError {
    /// Shorthand for a configuration error with a formatted message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ShelfError::config("LOG_LEVEL must be one of trace, debug, info, warn, error");
        assert_eq!(
            err.to_string(),
            "Configuration error: LOG_LEVEL must be one of trace, debug, info, warn, error"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ShelfError = io.into();
        assert!(matches!(err, ShelfError::Io(_)));
    }
}
