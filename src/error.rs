use thiserror::Error;

use crate::stage::Stage;

#[derive(Error, Debug)]
pub enum CaptionerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("{stage} stage failed: {cause}")]
    StageExecution { stage: Stage, cause: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CaptionerError {
    pub fn stage<S: Into<String>>(stage: Stage, cause: S) -> Self {
        Self::StageExecution {
            stage,
            cause: cause.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptionerError>;
