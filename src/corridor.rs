//! Corridor bounds generation around route geometry.
//!
//! A route polyline is processed in fixed-size chunks; each chunk's minimal
//! enclosing rectangle is expanded by a buffer so incidents near-but-not-on
//! the path still count. Chunking keeps corridor width proportional to local
//! route geometry instead of the route's full bounding box, which for a long
//! route would be a wildly oversized search area.

use log::warn;

use crate::geo_utils::km_to_degrees;
use crate::{polyline, GeoBound, RouteCandidate};

/// Configuration for corridor bounds generation.
#[derive(Debug, Clone)]
pub struct CorridorConfig {
    /// Polyline points per corridor chunk. Smaller chunks give more granular
    /// analysis at the cost of more containment queries. Default: 10
    pub chunk_size: usize,
    /// Buffer around each chunk, in kilometres. Default: 0.5
    pub buffer_km: f64,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            buffer_km: 0.5,
        }
    }
}

/// Generate buffered corridor bounds for a route.
///
/// Chunks partition the decoded point sequence with no overlap in source
/// points, though the buffered rectangles may overlap geographically. When
/// the route carries no polyline (or its polyline cannot be decoded), the
/// route's explicit overall bounds are used as-is, without buffering — the
/// historical behavior of the fallback path, kept deliberately. A route with
/// neither geometry source yields an empty vector; empty output is the
/// failure signal here, not an error.
pub fn bounds_for_route(route: &RouteCandidate, config: &CorridorConfig) -> Vec<GeoBound> {
    let points = match &route.encoded_polyline {
        Some(encoded) => match polyline::decode(encoded) {
            Ok(points) => points,
            Err(e) => {
                warn!("Route '{}': {}; no corridor generated", route.summary, e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    if !points.is_empty() {
        let buffer_degrees = km_to_degrees(config.buffer_km);
        return points
            .chunks(config.chunk_size.max(1))
            .filter_map(GeoBound::from_points)
            .map(|bound| bound.buffered(buffer_degrees))
            .collect();
    }

    // Fallback: the provider's overall route bounds, unbuffered
    match route.explicit_bounds {
        Some(bounds) => vec![bounds],
        None => Vec::new(),
    }
}
