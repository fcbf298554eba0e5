use crate::types::ContentKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("{0} bank is exhausted")]
    BankExhausted(ContentKind),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid source config: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    /// Short machine-friendly label used in log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::BankExhausted(_) => "bank_exhausted",
            Self::MalformedResponse(_) => "malformed_response",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedResponse(e.to_string())
    }
}
