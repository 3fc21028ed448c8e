use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CasefeedError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Seed dataset error: {0}")]
    Seed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),
}

impl From<serde_json::Error> for CasefeedError {
    fn from(err: serde_json::Error) -> Self {
        CasefeedError::Json(err.to_string())
    }
}

impl From<io::Error> for CasefeedError {
    fn from(err: io::Error) -> Self {
        CasefeedError::Io(err.to_string())
    }
}

impl From<anyhow::Error> for CasefeedError {
    fn from(err: anyhow::Error) -> Self {
        CasefeedError::Config(format!("{:#}", err))
    }
}
