//! Live-position deviation detection.
//!
//! Computes the minimum great-circle distance from a tracked position to the
//! vertices of the active route's polyline and flags the off-route condition
//! against a threshold. Distance is measured to the nearest decoded vertex,
//! not to interpolated segments; on long straight segments with sparse
//! vertices this can overstate the true distance to the path.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SafetyError};
use crate::geo_utils::haversine_distance;
use crate::{polyline, GeoPoint};

/// Default off-route threshold, in meters.
pub const DEFAULT_DEVIATION_THRESHOLD_M: f64 = 50.0;

/// On-route / off-route condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    OnRoute,
    OffRoute,
}

/// Result of one deviation check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviationStatus {
    pub status: TrackStatus,
    pub needs_reroute: bool,
    /// Distance to the nearest route vertex, in meters, rounded to 2 decimals
    pub distance_from_route: f64,
    /// RFC3339 UTC timestamp of the check
    pub timestamp: String,
}

impl DeviationStatus {
    /// Classify a measured distance against a threshold (inclusive: exactly
    /// at the threshold is still on route).
    pub fn from_distance(distance_m: f64, threshold_m: f64) -> Self {
        let on_route = distance_m <= threshold_m;
        Self {
            status: if on_route {
                TrackStatus::OnRoute
            } else {
                TrackStatus::OffRoute
            },
            needs_reroute: !on_route,
            distance_from_route: (distance_m * 100.0).round() / 100.0,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Minimum haversine distance from a point to any vertex of a route.
pub fn min_distance_to_route(point: &GeoPoint, vertices: &[GeoPoint]) -> f64 {
    vertices
        .iter()
        .map(|vertex| haversine_distance(point, vertex))
        .fold(f64::INFINITY, f64::min)
}

/// Check whether a live position has deviated from the active route.
///
/// Fails with [`SafetyError::MalformedPolyline`] when the polyline decodes
/// to zero points — no distance can be computed, and the caller should treat
/// an undecodable route as off-route (fail-safe: reroute).
pub fn check_deviation(
    current: &GeoPoint,
    route_polyline: &str,
    threshold_m: f64,
) -> Result<DeviationStatus> {
    let vertices = polyline::decode(route_polyline)?;
    if vertices.is_empty() {
        return Err(SafetyError::MalformedPolyline { position: 0 });
    }

    let distance = min_distance_to_route(current, &vertices);
    Ok(DeviationStatus::from_distance(distance, threshold_m))
}
