//! HTTP client for the imagery backend.
//!
//! Talks to `POST /api/list_images` for the scene catalog and
//! `POST /api/get_tile` for rendered tile URLs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::config::BackendConfig;
use common::{Coordinate, Error, LayerType, SceneRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{LayerQuery, SceneCatalog, TileRenderer};

const LIST_IMAGES_PATH: &str = "/api/list_images";
const GET_TILE_PATH: &str = "/api/get_tile";
const MAX_ERROR_BODY: usize = 500;

/// Imagery backend client with connection pooling.
#[derive(Debug, Clone)]
pub struct ImageryClient {
    client: reqwest::Client,
    base_url: String,
}

// ── Backend request/response types ────────────────────────────────────

/// Body shared by the listing and tile endpoints.
#[derive(Debug, Serialize)]
struct LayerRequestBody<'a> {
    polygon: &'a [Coordinate],
    start_date: String,
    end_date: String,
    layer_type: LayerType,
    cloud_percentage: u8,
}

impl<'a> From<&'a LayerQuery> for LayerRequestBody<'a> {
    fn from(query: &'a LayerQuery) -> Self {
        Self {
            polygon: &query.area,
            start_date: query.start_date.format("%Y-%m-%d").to_string(),
            end_date: query.end_date.format("%Y-%m-%d").to_string(),
            layer_type: query.layer_type,
            cloud_percentage: query.cloud_filter,
        }
    }
}

/// Response from `/api/list_images`.
#[derive(Debug, Deserialize)]
pub struct ImageListResponse {
    #[serde(default)]
    pub images: Vec<ImageListItem>,
    #[serde(default)]
    pub total_found: usize,
}

#[derive(Debug, Deserialize)]
pub struct ImageListItem {
    /// `YYYY-MM-DD`, or a placeholder when the backend lacks a timestamp.
    pub date: String,
    #[serde(default)]
    pub cloud_cover: f64,
    #[serde(default)]
    pub satellite: String,
}

/// Response from `/api/get_tile`.
#[derive(Debug, Deserialize)]
pub struct TileResponse {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub layer_type: String,
    #[serde(default)]
    pub tile_url: String,
}

// ── Implementation ────────────────────────────────────────────────────

impl ImageryClient {
    pub fn new(config: &BackendConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build imagery HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &LayerQuery,
    ) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        let body = LayerRequestBody::from(query);

        debug!(
            "POST {} layer={} window={}..{}",
            url, query.layer_type, body.start_date, body.end_date
        );

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("request to {url} timed out")
                } else {
                    format!("HTTP error for {url}: {e}")
                }
            })?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!(
                "backend returned {} for {}: {}",
                status,
                url,
                truncate(&body, MAX_ERROR_BODY)
            ));
        }

        resp.json()
            .await
            .map_err(|e| format!("JSON parse error for {url}: {e}"))
    }
}

#[async_trait]
impl SceneCatalog for ImageryClient {
    async fn list_scenes(&self, query: &LayerQuery) -> Result<Vec<SceneRecord>, Error> {
        let listing: ImageListResponse = self
            .post_json(LIST_IMAGES_PATH, query)
            .await
            .map_err(Error::CatalogUnavailable)?;

        debug!(
            "Catalog listed {} scenes ({} in period) for {}",
            listing.images.len(),
            listing.total_found,
            query.layer_type
        );

        Ok(scenes_from_listing(listing))
    }
}

#[async_trait]
impl TileRenderer for ImageryClient {
    async fn render_tile(&self, query: &LayerQuery) -> Result<String, Error> {
        let tile: TileResponse = self
            .post_json(GET_TILE_PATH, query)
            .await
            .map_err(Error::TileFetch)?;

        tile_url_from_response(tile)
    }
}

/// Convert a listing into scene records, skipping entries without a usable date.
pub fn scenes_from_listing(listing: ImageListResponse) -> Vec<SceneRecord> {
    listing
        .images
        .into_iter()
        .filter_map(|item| match NaiveDate::parse_from_str(item.date.trim(), "%Y-%m-%d") {
            Ok(date) => Some(SceneRecord {
                date,
                cloud_cover: item.cloud_cover.clamp(0.0, 100.0),
                satellite: item.satellite,
            }),
            Err(_) => {
                warn!("Skipping catalog entry with unparseable date '{}'", item.date);
                None
            }
        })
        .collect()
}

fn tile_url_from_response(tile: TileResponse) -> Result<String, Error> {
    if tile.tile_url.trim().is_empty() {
        return Err(Error::TileFetch(format!(
            "backend returned no tile URL for {} ({})",
            tile.layer_type, tile.date
        )));
    }
    Ok(tile.tile_url)
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
