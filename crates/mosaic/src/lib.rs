//! Temporal mosaic composer.
//!
//! Groups scene acquisitions into mosaic windows, caches rendered
//! results, and orchestrates catalog → grouping → tile retrieval.

pub mod cache;
pub mod fingerprint;
pub mod grouper;
pub mod retriever;

pub use cache::{spawn_sweeper, ArtifactCache, CacheStats, Clock, SystemClock};
pub use fingerprint::fingerprint;
pub use grouper::{group_into_mosaics, month_diff, GroupingParams};
pub use retriever::{MosaicRetriever, ResultCache};
