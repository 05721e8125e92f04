use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Rendering error: {0}")]
    Rendering(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("State corruption: {0}")]
    StateCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Errors that abort a whole run. Everything else is contained at the
    /// item, source or record boundary where it happened.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Configuration(_) | AppError::Config(_) | AppError::Persistence(_)
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
