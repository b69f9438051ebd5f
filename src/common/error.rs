use rust_tokenizers::error::TokenizerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuacError {
    #[error("IO error: {0}")]
    IOError(String),

    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    #[error("Invalid configuration error: {0}")]
    InvalidConfigurationError(String),

    #[error("Value error: {0}")]
    ValueError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for QuacError {
    fn from(error: std::io::Error) -> Self {
        QuacError::IOError(error.to_string())
    }
}

impl From<TokenizerError> for QuacError {
    fn from(error: TokenizerError) -> Self {
        QuacError::TokenizerError(error.to_string())
    }
}

impl From<serde_json::Error> for QuacError {
    fn from(error: serde_json::Error) -> Self {
        QuacError::SerializationError(error.to_string())
    }
}
