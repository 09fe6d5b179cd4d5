//! Domain types shared across the composer.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Error;

// ── Catalog Types ─────────────────────────────────────────────────────

/// A WGS84 polygon vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Imagery layer products rendered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    #[serde(rename = "SENTINEL2_RGB")]
    Sentinel2Rgb,
    #[serde(rename = "LANDSAT_RGB")]
    LandsatRgb,
    #[serde(rename = "SENTINEL1_VV")]
    Sentinel1Vv,
    #[serde(rename = "NDVI")]
    Ndvi,
    #[serde(rename = "NDWI")]
    Ndwi,
    #[serde(rename = "LST")]
    Lst,
    #[serde(rename = "UHI")]
    Uhi,
    #[serde(rename = "UTFVI")]
    Utfvi,
}

impl LayerType {
    pub const ALL: [LayerType; 8] = [
        LayerType::Sentinel2Rgb,
        LayerType::LandsatRgb,
        LayerType::Sentinel1Vv,
        LayerType::Ndvi,
        LayerType::Ndwi,
        LayerType::Lst,
        LayerType::Uhi,
        LayerType::Utfvi,
    ];

    /// Identifier used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Sentinel2Rgb => "SENTINEL2_RGB",
            LayerType::LandsatRgb => "LANDSAT_RGB",
            LayerType::Sentinel1Vv => "SENTINEL1_VV",
            LayerType::Ndvi => "NDVI",
            LayerType::Ndwi => "NDWI",
            LayerType::Lst => "LST",
            LayerType::Uhi => "UHI",
            LayerType::Utfvi => "UTFVI",
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        LayerType::ALL
            .into_iter()
            .find(|layer| layer.as_str() == wanted)
            .ok_or_else(|| Error::InvalidRequest(format!("unknown layer type '{}'", s.trim())))
    }
}

/// A single scene acquisition as listed by the imagery catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub date: NaiveDate,
    /// Cloud cover percentage, 0–100.
    pub cloud_cover: f64,
    pub satellite: String,
}

impl SceneRecord {
    pub fn new(date: NaiveDate, cloud_cover: f64, satellite: impl Into<String>) -> Self {
        Self {
            date,
            cloud_cover,
            satellite: satellite.into(),
        }
    }
}

// ── Mosaic Types ──────────────────────────────────────────────────────

/// A run of acquisition dates that composite into one rendered layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicGroup {
    /// Chronological, never empty.
    pub dates: Vec<NaiveDate>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl MosaicGroup {
    /// Build a group from an already ordered date run. Returns `None` when empty.
    pub fn from_dates(dates: Vec<NaiveDate>) -> Option<Self> {
        let start_date = *dates.first()?;
        let end_date = *dates.last()?;
        Some(Self {
            dates,
            start_date,
            end_date,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Ephemeral "show me imagery for this area" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub area: Vec<Coordinate>,
    pub layer_type: LayerType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Maximum cloud cover percentage accepted by the catalog.
    pub cloud_filter: u8,
}

impl RetrievalRequest {
    /// Polygons need at least this many vertices.
    pub const MIN_VERTICES: usize = 3;

    pub fn validate(&self) -> Result<(), Error> {
        if self.area.len() < Self::MIN_VERTICES {
            return Err(Error::InvalidRequest(format!(
                "area needs at least {} vertices, got {}",
                Self::MIN_VERTICES,
                self.area.len()
            )));
        }
        if self.cloud_filter > 100 {
            return Err(Error::InvalidRequest(format!(
                "cloud_filter must be within 0..=100, got {}",
                self.cloud_filter
            )));
        }
        if self.start_date > self.end_date {
            return Err(Error::InvalidRequest(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

/// Outcome of rendering one group's tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TileOutcome {
    Ready { tile_url: String },
    Failed { reason: String },
}

impl TileOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, TileOutcome::Ready { .. })
    }

    pub fn tile_url(&self) -> Option<&str> {
        match self {
            TileOutcome::Ready { tile_url } => Some(tile_url),
            TileOutcome::Failed { .. } => None,
        }
    }
}

/// One group together with its rendered tile (or the reason it failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicResult {
    pub group: MosaicGroup,
    pub tile: TileOutcome,
}

/// Everything a single retrieval produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReport {
    pub results: Vec<MosaicResult>,
    /// True when served from the artifact cache without touching the backend.
    pub from_cache: bool,
}

impl FetchReport {
    /// Number of groups whose tile rendered.
    pub fn loaded(&self) -> usize {
        self.results.iter().filter(|r| r.tile.is_ready()).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        self.loaded() == self.total()
    }

    /// User-facing summary, e.g. "3 of 4 mosaics loaded".
    pub fn summary(&self) -> String {
        format!("{} of {} mosaics loaded", self.loaded(), self.total())
    }
}
