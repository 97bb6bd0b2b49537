use thiserror::Error;

/// Errors produced while normalizing raw listing data.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The value could not be interpreted under the field's grammar.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The value parsed but violates a domain invariant.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No mapping rule exists for the key and the caller requires strictness.
    #[error("No mapping rule for key: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
