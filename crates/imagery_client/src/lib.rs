//! Imagery backend client library.
//!
//! Lists the scenes available for an area of interest and requests
//! rendered tile URLs for a compositing window.

pub mod catalog;
pub mod http;

pub use catalog::{LayerQuery, SceneCatalog, TileRenderer};
pub use http::ImageryClient;
