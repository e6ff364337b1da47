// src/model.rs
// Request/response types shared by the enrichment pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thesis used when the caller supplies none.
pub const DEFAULT_THESIS: &str = "General B2B SaaS and high-growth technology startups";

/// Inbound body of `POST /enrich`. The dashboard historically sent the URL
/// under several field names, so all three are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentRequest {
    #[serde(default, alias = "url", alias = "websiteUrl")]
    pub website: Option<String>,
    #[serde(default)]
    pub thesis: Option<String>,
}

impl EnrichmentRequest {
    /// Thesis to score against, falling back to the general-purpose default.
    pub fn thesis_or_default(&self) -> &str {
        match self.thesis.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_THESIS,
        }
    }
}

/// One provenance entry for an enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// Structured intelligence for one company website.
///
/// Invariants upheld by every producer (synthesis and fallback alike):
/// `thesis_match_score` is within 0..=100 and `sources` contains at least
/// one entry whose `url` equals the request's website.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub summary: String,
    pub what_they_do: Vec<String>,
    pub keywords: Vec<String>,
    pub signals: Vec<String>,
    pub thesis_match_score: u8,
    pub thesis_explanation: String,
    pub sources: Vec<SourceRef>,
    pub enriched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mock: Option<bool>,
}

impl EnrichmentResult {
    /// True when the schema invariants hold for the given request URL.
    pub fn satisfies_invariants(&self, source_url: &str) -> bool {
        self.thesis_match_score <= 100 && self.sources.iter().any(|s| s.url == source_url)
    }
}
