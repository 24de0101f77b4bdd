//! Spatial incident matching against corridor bounds.
//!
//! An incident matches a bound iff its coordinates fall inside the closed
//! rectangle. Incidents whose stored coordinates don't parse are treated as
//! having no location and never match; no error is raised for them.

use std::collections::HashSet;

use crate::corridor::{bounds_for_route, CorridorConfig};
use crate::{GeoBound, Incident, RouteCandidate};

/// Ids of incidents falling inside a single bound.
pub fn incidents_in_bound<'a>(bound: &GeoBound, incidents: &'a [Incident]) -> Vec<&'a str> {
    incidents
        .iter()
        .filter(|incident| {
            incident
                .location()
                .map(|point| bound.contains(&point))
                .unwrap_or(false)
        })
        .map(|incident| incident.id.as_str())
        .collect()
}

/// Unique incident ids matched across every corridor bound of a route.
///
/// An incident sitting in the buffered overlap of two adjacent chunks is
/// counted once.
pub fn incidents_for_route(
    route: &RouteCandidate,
    incidents: &[Incident],
    config: &CorridorConfig,
) -> HashSet<String> {
    let mut matched = HashSet::new();
    for bound in bounds_for_route(route, config) {
        matched.extend(
            incidents_in_bound(&bound, incidents)
                .into_iter()
                .map(str::to_owned),
        );
    }
    matched
}
