//! Safety score computation.
//!
//! Incident density is converted to a penalty on a logarithmic scale, so
//! high-incident corridors stay differentiated instead of all capping out,
//! then amplified by the time-of-day multiplier and subtracted from 100.
//! Pure and deterministic: identical inputs always produce identical output.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::time_risk;

/// Penalty units per decade of incident count: `20 * log10(n + 1)`.
/// 0 incidents = 0 penalty, 10 = 20, 100 = 40, 1000 = 60.
pub const PENALTY_SCALE: f64 = 20.0;

/// Penalty cap, leaving a base score floor even for extreme incident density.
pub const MAX_INCIDENT_PENALTY: f64 = 75.0;

/// Discrete risk bucket derived from the safety score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLevel {
    /// Bucket for a final safety score: >= 75 low, >= 50 moderate, else high.
    pub fn from_score(score: u8) -> Self {
        if score >= 75 {
            RiskLevel::Low
        } else if score >= 50 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }
}

/// A computed safety score and its risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyScore {
    /// 0-100, higher is safer
    pub score: u8,
    pub risk_level: RiskLevel,
}

impl SafetyScore {
    /// Score a route from its unique incident count at the given time.
    pub fn compute<T: Timelike>(incident_count: usize, at: &T) -> Self {
        Self::with_multiplier(incident_count, time_risk::multiplier_for(at))
    }

    /// Score with an explicit time multiplier.
    ///
    /// The raw score is clamped to [0, 100] and rounded to the nearest
    /// integer, half away from zero (`f64::round` semantics).
    pub fn with_multiplier(incident_count: usize, multiplier: f64) -> Self {
        let penalty = if incident_count == 0 {
            0.0
        } else {
            PENALTY_SCALE * (incident_count as f64 + 1.0).log10()
        };
        let penalty = penalty.min(MAX_INCIDENT_PENALTY);

        let adjusted = penalty * multiplier;
        let score = (100.0 - adjusted).clamp(0.0, 100.0).round() as u8;

        Self {
            score,
            risk_level: RiskLevel::from_score(score),
        }
    }
}
