use thiserror::Error;

/// Top-level error type for the Sanket platform.
#[derive(Error, Debug)]
pub enum SanketError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, SanketError>;
