use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("CONFIG_MISSING: {0}")]
    Config(String),
    #[error("TRANSPORT_FAILURE: {0}")]
    Transport(String),
    #[error("DATE_NOT_FOUND: {0}")]
    DateNotFound(String),
    #[error("STORE_FAILURE: {0}")]
    Store(String),
    #[error("PARSE_FAILURE: {0}")]
    Parse(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(value.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
