use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathwireError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Cannot convert from '{from}' to '{to}'")]
    IncompatibleUnits { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote error {code}: {message}")]
    Remote { code: String, message: String },

    #[error("Not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, PathwireError>;
