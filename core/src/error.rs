use thiserror::Error;

#[derive(Error, Debug)]
pub enum NfrError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Retention window '{label}' not found")]
    UnknownWindow { label: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NfrError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

pub type NfrResult<T> = Result<T, NfrError>;
