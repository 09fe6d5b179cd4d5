//! End-to-end mosaic retrieval.
//!
//! catalog listing → grouping → per-group tile rendering, with the
//! artifact cache short-circuiting repeat requests. Each call is an
//! independent pipeline; the cache is the only state shared between calls.

use std::sync::Arc;
use std::time::Duration;

use common::{
    ComposerConfig, Error, FetchReport, MosaicGroup, MosaicResult, RetrievalRequest, TileOutcome,
};
use futures_util::future::join_all;
use imagery_client::{LayerQuery, SceneCatalog, TileRenderer};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::cache::ArtifactCache;
use crate::fingerprint::fingerprint;
use crate::grouper::{group_into_mosaics, GroupingParams};

/// Cache of completed result sets, keyed by request fingerprint.
pub type ResultCache = ArtifactCache<Vec<MosaicResult>>;

pub struct MosaicRetriever {
    catalog: Arc<dyn SceneCatalog>,
    renderer: Arc<dyn TileRenderer>,
    cache: Arc<ResultCache>,
    params: GroupingParams,
    namespace: String,
    ttl_minutes: u64,
    call_timeout: Duration,
}

impl MosaicRetriever {
    pub fn new(
        catalog: Arc<dyn SceneCatalog>,
        renderer: Arc<dyn TileRenderer>,
        cache: Arc<ResultCache>,
        config: &ComposerConfig,
    ) -> Self {
        Self {
            catalog,
            renderer,
            cache,
            params: GroupingParams::from(&config.grouping),
            namespace: config.cache.namespace.clone(),
            ttl_minutes: config.cache.ttl_minutes,
            call_timeout: Duration::from_secs(config.backend.timeout_secs),
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Fetch every eligible mosaic for `request`.
    ///
    /// Fails with `CatalogUnavailable` when the listing errors or times out,
    /// and with `NoScenesFound` when it comes back empty. Tile failures are
    /// reported per group in the returned report. Only fully rendered result
    /// sets are cached.
    #[instrument(skip(self, request), fields(layer = %request.layer_type))]
    pub async fn fetch_mosaics(&self, request: &RetrievalRequest) -> Result<FetchReport, Error> {
        request.validate()?;

        let key = fingerprint(&self.namespace, request);
        if let Some(results) = self.cache.get(&key) {
            info!("Cache hit: {} mosaics", results.len());
            return Ok(FetchReport {
                results,
                from_cache: true,
            });
        }

        let query = LayerQuery::from(request);
        let groups = self.group_catalog(&query).await?;

        let results = join_all(
            groups
                .into_iter()
                .map(|group| self.render_group(&query, group)),
        )
        .await;

        let report = FetchReport {
            results,
            from_cache: false,
        };

        if report.is_complete() {
            self.cache.set(key, report.results.clone(), self.ttl_minutes);
            info!("{}", report.summary());
        } else {
            warn!("{}; partial result not cached", report.summary());
        }

        Ok(report)
    }

    /// List the catalog and group it, without rendering or caching.
    pub async fn list_groups(&self, request: &RetrievalRequest) -> Result<Vec<MosaicGroup>, Error> {
        request.validate()?;
        self.group_catalog(&LayerQuery::from(request)).await
    }

    async fn group_catalog(&self, query: &LayerQuery) -> Result<Vec<MosaicGroup>, Error> {
        let scenes = match timeout(self.call_timeout, self.catalog.list_scenes(query)).await {
            Ok(Ok(scenes)) => scenes,
            Ok(Err(Error::CatalogUnavailable(msg))) => return Err(Error::CatalogUnavailable(msg)),
            Ok(Err(e)) => return Err(Error::CatalogUnavailable(e.to_string())),
            Err(_) => {
                return Err(Error::CatalogUnavailable(format!(
                    "catalog listing timed out after {:?}",
                    self.call_timeout
                )))
            }
        };

        if scenes.is_empty() {
            return Err(Error::NoScenesFound);
        }

        debug!("Catalog returned {} scenes", scenes.len());
        group_into_mosaics(&scenes, &self.params)
    }

    async fn render_group(&self, query: &LayerQuery, group: MosaicGroup) -> MosaicResult {
        let window = query.for_window(group.start_date, group.end_date);

        let tile = match timeout(self.call_timeout, self.renderer.render_tile(&window)).await {
            Ok(Ok(tile_url)) => TileOutcome::Ready { tile_url },
            Ok(Err(e)) => {
                warn!(
                    "Tile for {}..{} failed: {}",
                    group.start_date, group.end_date, e
                );
                TileOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(
                    "Tile for {}..{} timed out",
                    group.start_date, group.end_date
                );
                TileOutcome::Failed {
                    reason: format!("tile request timed out after {:?}", self.call_timeout),
                }
            }
        };

        MosaicResult { group, tile }
    }
}
