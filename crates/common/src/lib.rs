//! Shared types, config, and error definitions for the mosaic composer.

pub mod config;
pub mod error;
pub mod types;

pub use config::ComposerConfig;
pub use error::Error;
pub use types::*;
