//! Deterministic cache keys for retrieval requests.

use common::RetrievalRequest;
use sha2::{Digest, Sha256};

/// Fingerprint a request within a cache namespace.
///
/// Covers the area vertices (in order, rounded to 1e-7 degrees), the date
/// range, the layer type and the cloud filter. The result is
/// `"{namespace}:{sha256 hex}"`.
pub fn fingerprint(namespace: &str, request: &RetrievalRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"|");
    hasher.update(request.layer_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(request.start_date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(request.end_date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(request.cloud_filter.to_string().as_bytes());
    for vertex in &request.area {
        hasher.update(format!("|{:.7},{:.7}", vertex.lat, vertex.lng).as_bytes());
    }

    format!("{}:{}", namespace, hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::{Coordinate, LayerType};

    fn request() -> RetrievalRequest {
        RetrievalRequest {
            area: vec![
                Coordinate { lat: -23.5505, lng: -46.6333 },
                Coordinate { lat: -23.5605, lng: -46.6233 },
                Coordinate { lat: -23.5705, lng: -46.6433 },
            ],
            layer_type: LayerType::Ndvi,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            cloud_filter: 20,
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint("mosaic", &request());
        let b = fingerprint("mosaic", &request());
        assert_eq!(a, b);
        assert!(a.starts_with("mosaic:"));
        assert_eq!(a.len(), "mosaic:".len() + 64);
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let base = fingerprint("mosaic", &request());

        assert_ne!(base, fingerprint("timelapse", &request()));

        let mut other = request();
        other.layer_type = LayerType::Lst;
        assert_ne!(base, fingerprint("mosaic", &other));

        let mut other = request();
        other.end_date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_ne!(base, fingerprint("mosaic", &other));

        let mut other = request();
        other.cloud_filter = 50;
        assert_ne!(base, fingerprint("mosaic", &other));

        let mut other = request();
        other.area[1].lat += 0.001;
        assert_ne!(base, fingerprint("mosaic", &other));
    }
}
