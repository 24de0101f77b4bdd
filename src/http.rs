//! HTTP clients for external collaborators.
//!
//! Two collaborators live here, both optional to the scoring core:
//! - Incident detail lookup: the upstream API has no batch endpoint, so a
//!   capped batch of ids is fetched sequentially with bounded retry.
//! - LLM risk summary: a generative model summarizes corridor risk from the
//!   route's summary and leg addresses. Its absence or failure resolves to a
//!   neutral placeholder document, never a hard failure of scoring.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SafetyError};
use crate::RouteCandidate;

/// Maximum incident ids per detail batch; extra ids are truncated.
pub const MAX_BATCH_SIZE: usize = 15;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Incident detail lookup
// ============================================================================

/// Result of one incident detail batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentDetailsResult {
    pub count: usize,
    /// Full incident documents, passed through as the upstream returns them
    pub incidents: Vec<serde_json::Value>,
}

/// Sequential fetcher for incident detail records.
pub struct IncidentDetailsClient {
    client: Client,
    endpoint: String,
}

impl IncidentDetailsClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SafetyError::Http {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Fetch details for up to [`MAX_BATCH_SIZE`] incidents, sequentially.
    ///
    /// Individual failures are logged and skipped; the result carries
    /// whatever was successfully fetched.
    pub async fn fetch_details(&self, incident_ids: &[String]) -> IncidentDetailsResult {
        let batch = capped_batch(incident_ids);
        if batch.len() < incident_ids.len() {
            warn!(
                "Incident detail batch truncated from {} to {} ids",
                incident_ids.len(),
                batch.len()
            );
        }

        let mut incidents = Vec::with_capacity(batch.len());
        for id in batch {
            match self.fetch_single(id).await {
                Ok(details) => incidents.push(details),
                Err(e) => warn!("Skipping incident {}: {}", id, e),
            }
        }

        info!(
            "Fetched {}/{} incident detail records",
            incidents.len(),
            batch.len()
        );
        IncidentDetailsResult {
            count: incidents.len(),
            incidents,
        }
    }

    async fn fetch_single(&self, incident_id: &str) -> Result<serde_json::Value> {
        let mut retries = 0;

        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .header(
                    "Content-Type",
                    "application/x-www-form-urlencoded; charset=UTF-8",
                )
                .body(format!("incident_id={}", incident_id))
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        retries += 1;
                        if retries > MAX_RETRIES {
                            return Err(SafetyError::Http {
                                message: "Max retries exceeded (429)".to_string(),
                                status_code: Some(429),
                            });
                        }
                        let backoff = Duration::from_millis(500 * (1 << retries));
                        debug!(
                            "429 for incident {}, retry {} after {:?}",
                            incident_id, retries, backoff
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(SafetyError::Http {
                            message: format!("detail fetch for incident {}", incident_id),
                            status_code: Some(status.as_u16()),
                        });
                    }

                    return resp.json().await.map_err(|e| SafetyError::Http {
                        message: format!("Parse error: {}", e),
                        status_code: None,
                    });
                }
                Err(e) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(SafetyError::Http {
                            message: format!("Request error: {}", e),
                            status_code: None,
                        });
                    }
                    let backoff = Duration::from_millis(500 * (1 << retries));
                    debug!(
                        "Error for incident {}: {}, retry {} after {:?}",
                        incident_id, e, retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn capped_batch(ids: &[String]) -> &[String] {
    &ids[..ids.len().min(MAX_BATCH_SIZE)]
}

// ============================================================================
// LLM risk summary
// ============================================================================

/// Route corridor identification within a risk summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteCorridor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub primary_segments: Vec<String>,
}

/// The model's derived risk conclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRiskSummary {
    /// "low", "moderate", "high" or "unknown"
    #[serde(default = "unknown_risk")]
    pub overall_risk_level: String,
    #[serde(default)]
    pub primary_risk_factors: Vec<String>,
}

fn unknown_risk() -> String {
    "unknown".to_string()
}

impl Default for DerivedRiskSummary {
    fn default() -> Self {
        Self {
            overall_risk_level: unknown_risk(),
            primary_risk_factors: Vec::new(),
        }
    }
}

/// Structured corridor risk document from the LLM collaborator.
///
/// The scoring core treats this as opaque additional context; the
/// deterministic safety score never depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSummary {
    /// "ok" or "restricted"
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub route_corridor: RouteCorridor,
    /// Incident reports the model surfaced, passed through unmodified
    #[serde(default)]
    pub incidents: Vec<serde_json::Value>,
    #[serde(default)]
    pub derived_risk_summary: DerivedRiskSummary,
}

impl RiskSummary {
    /// Neutral placeholder used whenever the collaborator is absent or fails.
    pub fn restricted(reason: &str, corridor_name: &str) -> Self {
        Self {
            status: "restricted".to_string(),
            reason: Some(reason.to_string()),
            route_corridor: RouteCorridor {
                name: corridor_name.to_string(),
                primary_segments: Vec::new(),
            },
            incidents: Vec::new(),
            derived_risk_summary: DerivedRiskSummary::default(),
        }
    }
}

/// Generative-model request/response shapes.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Client for the LLM risk-summary collaborator.
pub struct RiskSummaryClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RiskSummaryClient {
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SafetyError::Http {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.map(str::to_owned),
        })
    }

    /// Ask the model for a corridor risk summary.
    ///
    /// This never returns an error: any failure path (missing key, transport
    /// error, unparsable reply) resolves to [`RiskSummary::restricted`].
    pub async fn analyze_route(&self, route: &RouteCandidate) -> RiskSummary {
        let Some(api_key) = &self.api_key else {
            warn!("Risk summary API key missing, skipping analysis");
            return RiskSummary::restricted("api_key_missing", &route.summary);
        };

        let prompt = build_prompt(route);
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key.as_str())])
            .json(&request)
            .send()
            .await;

        let resp = match response {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!("Risk summary request failed: HTTP {}", resp.status());
                return RiskSummary::restricted("api_error", &route.summary);
            }
            Err(e) => {
                warn!("Risk summary request failed: {}", e);
                return RiskSummary::restricted("api_error", &route.summary);
            }
        };

        let body: GenerateResponse = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Risk summary reply unparsable: {}", e);
                return RiskSummary::restricted("api_error", &route.summary);
            }
        };

        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default();

        match extract_json(text).and_then(|json| serde_json::from_str::<RiskSummary>(&json).ok()) {
            Some(summary) => summary,
            None => {
                warn!("Risk summary reply carried no usable JSON");
                RiskSummary::restricted("ambiguous_results", &route.summary)
            }
        }
    }
}

/// Build the corridor prompt from the route's summary and leg addresses.
fn build_prompt(route: &RouteCandidate) -> String {
    let start = route
        .legs
        .first()
        .map(|leg| leg.start_address.as_str())
        .unwrap_or("Unknown");
    let end = route
        .legs
        .first()
        .map(|leg| leg.end_address.as_str())
        .unwrap_or("Unknown");

    format!(
        "Analyze public safety incidents relevant to the following route corridor \
         using recent publicly available reports. Respond with machine-readable \
         JSON only.\n\
         Route Summary: {}\n\
         Start Address: {}\n\
         End Address: {}\n",
        route.summary, start, end
    )
}

/// Pull the outermost JSON object out of a model reply, tolerating markdown
/// fences and surrounding prose.
fn extract_json(text: &str) -> Option<String> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    Some(cleaned[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capped_batch() {
        let ids: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(capped_batch(&ids).len(), MAX_BATCH_SIZE);
        assert_eq!(capped_batch(&ids[..3]).len(), 3);
        assert!(capped_batch(&[]).is_empty());
    }

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"status\": \"ok\"}\n```\nanything else?";
        assert_eq!(extract_json(reply).as_deref(), Some("{\"status\": \"ok\"}"));

        assert!(extract_json("no json here").is_none());
    }

    #[test]
    fn test_risk_summary_tolerates_partial_documents() {
        let summary: RiskSummary = serde_json::from_str("{\"status\": \"ok\"}").unwrap();
        assert_eq!(summary.status, "ok");
        assert_eq!(summary.derived_risk_summary.overall_risk_level, "unknown");
        assert!(summary.incidents.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key_falls_back_to_restricted() {
        let client = RiskSummaryClient::new("http://localhost:0/generate", None).unwrap();
        let route = RouteCandidate::from_polyline("MG Road", "_p~iF~ps|U");

        let summary = client.analyze_route(&route).await;
        assert_eq!(summary.status, "restricted");
        assert_eq!(summary.reason.as_deref(), Some("api_key_missing"));
        assert_eq!(summary.route_corridor.name, "MG Road");
        assert_eq!(summary.derived_risk_summary.overall_risk_level, "unknown");
    }

    #[tokio::test]
    async fn test_empty_detail_batch_makes_no_requests() {
        let client = IncidentDetailsClient::new("http://localhost:0/details").unwrap();
        let result = client.fetch_details(&[]).await;
        assert_eq!(result.count, 0);
        assert!(result.incidents.is_empty());
    }
}
