//! Error types for catalog access and scene download.

use thiserror::Error;

/// Errors produced by STAC search and scene download.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("item {item} has no asset for band {band}")]
    MissingAsset { item: String, band: String },

    #[error("item {0} has no parseable acquisition date")]
    MissingDate(String),

    #[error("core error: {0}")]
    Core(#[from] pestwatch_core::Error),
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
