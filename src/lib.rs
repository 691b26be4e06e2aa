use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatcherError>;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for MatcherError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod catalog;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod matcher;
pub mod output;
pub mod query;
pub mod scan;
