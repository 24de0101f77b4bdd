//! Route ranking across alternatives.
//!
//! For every candidate, in input order: generate corridor bounds, match
//! incidents against the store's spatial index, score, and assemble a
//! [`RouteSafetyResult`]. Routes are independent and read-only with respect
//! to the shared incident data, so with the `parallel` feature they are
//! scored concurrently; output order is input order either way.

use std::collections::HashSet;

use chrono::Timelike;
use log::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::corridor::{bounds_for_route, CorridorConfig};
use crate::error::Result;
use crate::incidents::IncidentStore;
use crate::scoring::SafetyScore;
use crate::{RankedResult, RouteCandidate, RouteSafetyResult};

/// Score a single route against the incident store.
pub fn analyze_route<T: Timelike>(
    route: &RouteCandidate,
    store: &IncidentStore,
    at: &T,
    config: &CorridorConfig,
) -> Result<RouteSafetyResult> {
    let bounds = bounds_for_route(route, config);

    let mut matched: HashSet<String> = HashSet::new();
    for bound in &bounds {
        matched.extend(
            store
                .incidents_in_bound(bound)?
                .into_iter()
                .map(str::to_owned),
        );
    }

    let mut incident_ids: Vec<String> = matched.into_iter().collect();
    incident_ids.sort();

    let result = SafetyScore::compute(incident_ids.len(), at);
    debug!(
        "Route '{}': {} bounds, {} incidents, score {}",
        route.summary,
        bounds.len(),
        incident_ids.len(),
        result.score
    );

    Ok(RouteSafetyResult {
        route_name: route.summary.clone(),
        safety_score: result.score,
        incident_count: incident_ids.len(),
        risk_level: result.risk_level,
        bounds_analyzed: bounds.len(),
        incident_ids,
    })
}

/// Rank alternative routes and select the safest.
///
/// Candidates are validated up front: a route with neither polyline nor
/// explicit bounds is rejected with a clear error before any scoring work.
/// An empty candidate list is not an error — it ranks to an empty result
/// with no safest route ("nothing to rank", e.g. the directions provider
/// returned no alternatives).
pub fn rank_routes<T: Timelike + Sync>(
    routes: &[RouteCandidate],
    store: &IncidentStore,
    at: &T,
    config: &CorridorConfig,
) -> Result<RankedResult> {
    for route in routes {
        route.validate()?;
    }

    // One blocking dataset load before fanning out across routes
    store.load()?;

    #[cfg(not(feature = "parallel"))]
    let results: Vec<RouteSafetyResult> = routes
        .iter()
        .map(|route| analyze_route(route, store, at, config))
        .collect::<Result<_>>()?;

    #[cfg(feature = "parallel")]
    let results: Vec<RouteSafetyResult> = routes
        .par_iter()
        .map(|route| analyze_route(route, store, at, config))
        .collect::<Result<_>>()?;

    let safest_route = select_safest(&results).map(str::to_owned);

    Ok(RankedResult {
        routes: results,
        safest_route,
    })
}

/// Pick the safest route name from scored results.
///
/// Highest score wins; on a score tie the fewer-incidents candidate wins;
/// ties beyond both criteria keep the earliest-seen route. Deterministic for
/// any input order.
pub fn select_safest(results: &[RouteSafetyResult]) -> Option<&str> {
    let mut safest: Option<&RouteSafetyResult> = None;

    for candidate in results {
        let replaces = match safest {
            None => true,
            Some(best) => {
                candidate.safety_score > best.safety_score
                    || (candidate.safety_score == best.safety_score
                        && candidate.incident_count < best.incident_count)
            }
        };
        if replaces {
            safest = Some(candidate);
        }
    }

    safest.map(|result| result.route_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::RiskLevel;
    use crate::{GeoBound, GeoPoint, Incident};
    use chrono::NaiveTime;

    fn result(name: &str, score: u8, incidents: usize) -> RouteSafetyResult {
        RouteSafetyResult {
            route_name: name.to_string(),
            safety_score: score,
            incident_count: incidents,
            risk_level: RiskLevel::from_score(score),
            bounds_analyzed: 1,
            incident_ids: Vec::new(),
        }
    }

    #[test]
    fn test_select_safest_highest_score() {
        let results = vec![result("a", 71, 12), result("b", 84, 3)];
        assert_eq!(select_safest(&results), Some("b"));
    }

    #[test]
    fn test_select_safest_tie_break_on_incidents() {
        // Same score, fewer incidents wins, regardless of input order
        let forward = vec![result("few", 80, 2), result("many", 80, 9)];
        let backward = vec![result("many", 80, 9), result("few", 80, 2)];
        assert_eq!(select_safest(&forward), Some("few"));
        assert_eq!(select_safest(&backward), Some("few"));
    }

    #[test]
    fn test_select_safest_full_tie_keeps_earliest() {
        let results = vec![result("first", 80, 5), result("second", 80, 5)];
        assert_eq!(select_safest(&results), Some("first"));
    }

    #[test]
    fn test_rank_empty_input() {
        let store = IncidentStore::from_incidents(vec![]);
        let at = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let ranked = rank_routes(&[], &store, &at, &CorridorConfig::default()).unwrap();
        assert!(ranked.routes.is_empty());
        assert!(ranked.safest_route.is_none());
    }

    #[test]
    fn test_rank_rejects_route_without_geometry() {
        let store = IncidentStore::from_incidents(vec![]);
        let at = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let bad = RouteCandidate {
            summary: "empty".to_string(),
            encoded_polyline: None,
            explicit_bounds: None,
            legs: Vec::new(),
        };
        assert!(rank_routes(&[bad], &store, &at, &CorridorConfig::default()).is_err());
    }

    fn cluster(prefix: &str, count: usize, lat: f64, lng: f64) -> Vec<Incident> {
        (0..count)
            .map(|i| Incident::new(&format!("{}-{}", prefix, i), lat + i as f64 * 1e-4, lng))
            .collect()
    }

    #[test]
    fn test_rank_end_to_end_at_night() {
        // Route 1 passes 3 incidents, route 2 passes 12; both scored at
        // 22:00 (multiplier 1.3).
        let mut incidents = cluster("r1", 3, 10.0, 10.0);
        incidents.extend(cluster("r2", 12, 20.0, 20.0));
        let store = IncidentStore::from_incidents(incidents);

        let route1 = RouteCandidate::from_bounds(
            "Inner Ring Road",
            GeoBound::new(GeoPoint::new(10.01, 10.01), GeoPoint::new(9.99, 9.99)),
        );
        let route2 = RouteCandidate::from_bounds(
            "Old Highway",
            GeoBound::new(GeoPoint::new(20.01, 20.01), GeoPoint::new(19.99, 19.99)),
        );

        let at = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let ranked =
            rank_routes(&[route1, route2], &store, &at, &CorridorConfig::default()).unwrap();

        assert_eq!(ranked.routes.len(), 2);
        // Input order preserved
        assert_eq!(ranked.routes[0].route_name, "Inner Ring Road");
        assert_eq!(ranked.routes[0].safety_score, 84);
        assert_eq!(ranked.routes[0].risk_level, RiskLevel::Low);
        assert_eq!(ranked.routes[0].incident_count, 3);
        assert_eq!(ranked.routes[1].safety_score, 71);
        assert_eq!(ranked.routes[1].risk_level, RiskLevel::Moderate);
        assert_eq!(ranked.routes[1].incident_count, 12);
        assert_eq!(ranked.safest_route.as_deref(), Some("Inner Ring Road"));
    }

    #[test]
    fn test_analyze_route_sorts_incident_ids() {
        let store = IncidentStore::from_incidents(vec![
            Incident::new("b", 10.0, 10.0),
            Incident::new("a", 10.001, 10.0),
        ]);
        let route = RouteCandidate::from_bounds(
            "sorted",
            GeoBound::new(GeoPoint::new(10.01, 10.01), GeoPoint::new(9.99, 9.99)),
        );
        let at = NaiveTime::from_hms_opt(12, 0, 0).unwrap();

        let result = analyze_route(&route, &store, &at, &CorridorConfig::default()).unwrap();
        assert_eq!(result.incident_ids, vec!["a", "b"]);
        assert_eq!(result.bounds_analyzed, 1);
    }
}
