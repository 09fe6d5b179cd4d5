//! Backend-agnostic seams for scene listing and tile rendering.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{Coordinate, Error, LayerType, RetrievalRequest, SceneRecord};
use serde::Serialize;

/// Area, period and product a catalog or tile call is scoped to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerQuery {
    pub area: Vec<Coordinate>,
    pub layer_type: LayerType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cloud_filter: u8,
}

impl LayerQuery {
    /// Same area and product, narrowed to a compositing window.
    pub fn for_window(&self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            ..self.clone()
        }
    }
}

impl From<&RetrievalRequest> for LayerQuery {
    fn from(request: &RetrievalRequest) -> Self {
        Self {
            area: request.area.clone(),
            layer_type: request.layer_type,
            start_date: request.start_date,
            end_date: request.end_date,
            cloud_filter: request.cloud_filter,
        }
    }
}

/// Lists the scenes available for a query.
///
/// Implementations may return records in any order and may include
/// duplicate dates.
#[async_trait]
pub trait SceneCatalog: Send + Sync {
    async fn list_scenes(&self, query: &LayerQuery) -> Result<Vec<SceneRecord>, Error>;
}

/// Renders one tile URL compositing every scene in the query's window.
#[async_trait]
pub trait TileRenderer: Send + Sync {
    async fn render_tile(&self, query: &LayerQuery) -> Result<String, Error>;
}
