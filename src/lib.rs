//! # Route Safety
//!
//! Route-safety scoring from historical incident density and time-of-day risk.
//!
//! This library provides:
//! - Polyline decoding for route geometry from a directions provider
//! - Corridor bounds generation and spatial incident matching
//! - A deterministic 0-100 safety score with time-of-day adjustment
//! - Ranking of alternative routes and live deviation detection
//!
//! ## Features
//!
//! - **`parallel`** - Score alternative routes in parallel with rayon
//! - **`http`** - Enable clients for external collaborators (incident
//!   details, LLM risk summaries)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveTime;
//! use route_safety::{rank_routes, CorridorConfig, IncidentStore, RouteCandidate};
//!
//! // A store would normally be loaded from a dataset file once at startup.
//! let store = IncidentStore::from_incidents(vec![]);
//!
//! let route = RouteCandidate::from_polyline("High Street", "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
//! let at = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
//!
//! let ranked = rank_routes(&[route], &store, &at, &CorridorConfig::default()).unwrap();
//! assert_eq!(ranked.safest_route.as_deref(), Some("High Street"));
//! assert_eq!(ranked.routes[0].safety_score, 100);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, SafetyError};

// Polyline encoding/decoding (route geometry boundary)
pub mod polyline;

// Geographic utilities (haversine distance, unit conversion)
pub mod geo_utils;

// Historical incident dataset (load-once store with spatial index)
pub mod incidents;
pub use incidents::{Incident, IncidentStore};

// Corridor bounds generation around route geometry
pub mod corridor;
pub use corridor::{bounds_for_route, CorridorConfig};

// Spatial incident matching against corridor bounds
pub mod matcher;
pub use matcher::{incidents_for_route, incidents_in_bound};

// Time-of-day risk multiplier table
pub mod time_risk;
pub use time_risk::multiplier_for;

// Safety score computation
pub mod scoring;
pub use scoring::{RiskLevel, SafetyScore};

// Route ranking across alternatives
pub mod ranking;
pub use ranking::{analyze_route, rank_routes, select_safest};

// Live-position deviation detection
pub mod deviation;
pub use deviation::{
    check_deviation, min_distance_to_route, DeviationStatus, TrackStatus,
    DEFAULT_DEVIATION_THRESHOLD_M,
};

// HTTP clients for external collaborators
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{IncidentDetailsClient, RiskSummary, RiskSummaryClient};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use route_safety::GeoPoint;
/// let point = GeoPoint::new(12.9716, 77.5946); // Bengaluru
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid WGS84 coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A closed axis-aligned geographic rectangle.
///
/// Invariant: `north_east.latitude >= south_west.latitude` and
/// `north_east.longitude >= south_west.longitude` (antimeridian-crossing
/// rectangles are not supported).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBound {
    pub north_east: GeoPoint,
    pub south_west: GeoPoint,
}

impl GeoBound {
    pub fn new(north_east: GeoPoint, south_west: GeoPoint) -> Self {
        Self {
            north_east,
            south_west,
        }
    }

    /// Minimal enclosing rectangle of a set of points.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            north_east: GeoPoint::new(max_lat, max_lng),
            south_west: GeoPoint::new(min_lat, min_lng),
        })
    }

    /// Expand every edge outward by `degrees`.
    pub fn buffered(&self, degrees: f64) -> Self {
        Self {
            north_east: GeoPoint::new(
                self.north_east.latitude + degrees,
                self.north_east.longitude + degrees,
            ),
            south_west: GeoPoint::new(
                self.south_west.latitude - degrees,
                self.south_west.longitude - degrees,
            ),
        }
    }

    /// Containment test, closed on all four edges.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.south_west.latitude
            && point.latitude <= self.north_east.latitude
            && point.longitude >= self.south_west.longitude
            && point.longitude <= self.north_east.longitude
    }
}

/// One leg of a route, as reported by the directions provider.
///
/// Only the addresses are consumed here (they feed the risk-summary prompt);
/// everything else the provider returns stays with the hosting layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteLeg {
    #[serde(default)]
    pub start_address: String,
    #[serde(default)]
    pub end_address: String,
}

/// One alternative route returned by the directions provider.
///
/// Read-only input to the scoring engine. A candidate must carry either an
/// encoded polyline or explicit overall bounds; [`RouteCandidate::validate`]
/// rejects candidates with neither at the boundary instead of every
/// downstream consumer checking defensively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Human-readable route name (e.g. major road names)
    pub summary: String,
    /// Encoded overview polyline, if the provider supplied one
    #[serde(default)]
    pub encoded_polyline: Option<String>,
    /// Overall bounding box fallback when no polyline is available
    #[serde(default)]
    pub explicit_bounds: Option<GeoBound>,
    /// Route legs (start/end addresses)
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
}

impl RouteCandidate {
    /// Candidate with an encoded polyline.
    pub fn from_polyline(summary: &str, encoded: &str) -> Self {
        Self {
            summary: summary.to_string(),
            encoded_polyline: Some(encoded.to_string()),
            explicit_bounds: None,
            legs: Vec::new(),
        }
    }

    /// Candidate with only an overall bounding box.
    pub fn from_bounds(summary: &str, bounds: GeoBound) -> Self {
        Self {
            summary: summary.to_string(),
            encoded_polyline: None,
            explicit_bounds: Some(bounds),
            legs: Vec::new(),
        }
    }

    /// Fail fast if the candidate carries no geometry at all.
    pub fn validate(&self) -> Result<()> {
        if self.encoded_polyline.is_none() && self.explicit_bounds.is_none() {
            return Err(SafetyError::InvalidRoute {
                summary: self.summary.clone(),
            });
        }
        Ok(())
    }
}

/// Safety analysis for a single route.
///
/// Created fresh per scoring call and never mutated afterwards. Serializes
/// with the wire field names the hosting layer exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSafetyResult {
    pub route_name: String,
    /// 0-100, higher is safer
    pub safety_score: u8,
    /// Unique incidents matched across all corridor bounds
    pub incident_count: usize,
    pub risk_level: RiskLevel,
    /// Number of corridor bounds generated for this route
    pub bounds_analyzed: usize,
    /// Matched incident ids, sorted for deterministic output
    pub incident_ids: Vec<String>,
}

/// Terminal output of one ranking invocation.
///
/// `routes` preserves input order regardless of score; `safest_route` is
/// `None` only when the input route list was empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub routes: Vec<RouteSafetyResult>,
    pub safest_route: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(12.9716, 77.5946).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bound_from_points() {
        let points = vec![
            GeoPoint::new(12.97, 77.59),
            GeoPoint::new(12.99, 77.58),
            GeoPoint::new(12.95, 77.61),
        ];
        let bound = GeoBound::from_points(&points).unwrap();
        assert_eq!(bound.north_east, GeoPoint::new(12.99, 77.61));
        assert_eq!(bound.south_west, GeoPoint::new(12.95, 77.58));

        assert!(GeoBound::from_points(&[]).is_none());
    }

    #[test]
    fn test_bound_contains_is_closed() {
        let bound = GeoBound::new(GeoPoint::new(13.0, 78.0), GeoPoint::new(12.0, 77.0));
        // Interior and all four edges match
        assert!(bound.contains(&GeoPoint::new(12.5, 77.5)));
        assert!(bound.contains(&GeoPoint::new(13.0, 77.5)));
        assert!(bound.contains(&GeoPoint::new(12.0, 77.5)));
        assert!(bound.contains(&GeoPoint::new(12.5, 78.0)));
        assert!(bound.contains(&GeoPoint::new(12.5, 77.0)));
        // One ulp outside does not
        assert!(!bound.contains(&GeoPoint::new(f64::from_bits(13.0f64.to_bits() + 1), 77.5)));
    }

    #[test]
    fn test_bound_buffered() {
        let bound = GeoBound::new(GeoPoint::new(13.0, 78.0), GeoPoint::new(12.0, 77.0));
        let buffered = bound.buffered(0.01);
        assert_eq!(buffered.north_east, GeoPoint::new(13.01, 78.01));
        assert_eq!(buffered.south_west, GeoPoint::new(11.99, 76.99));
    }

    #[test]
    fn test_route_candidate_validation() {
        assert!(RouteCandidate::from_polyline("a", "_p~iF~ps|U").validate().is_ok());

        let empty = RouteCandidate {
            summary: "no geometry".to_string(),
            encoded_polyline: None,
            explicit_bounds: None,
            legs: Vec::new(),
        };
        assert!(matches!(
            empty.validate(),
            Err(SafetyError::InvalidRoute { .. })
        ));
    }

    #[test]
    fn test_result_wire_field_names() {
        let result = RouteSafetyResult {
            route_name: "MG Road".to_string(),
            safety_score: 84,
            incident_count: 3,
            risk_level: RiskLevel::Low,
            bounds_analyzed: 2,
            incident_ids: vec!["11837".to_string()],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["route_name"], "MG Road");
        assert_eq!(json["safety_score"], 84);
        assert_eq!(json["risk_level"], "Low Risk");
        assert_eq!(json["bounds_analyzed"], 2);
        assert_eq!(json["incident_ids"][0], "11837");
    }
}
