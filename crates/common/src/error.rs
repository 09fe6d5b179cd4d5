//! Unified error type for the mosaic composer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid grouping parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid retrieval request: {0}")]
    InvalidRequest(String),

    #[error("Scene catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("No scenes found for the requested area and period")]
    NoScenesFound,

    #[error("Tile fetch failed: {0}")]
    TileFetch(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Config error: {0}")]
    Config(String),
}
