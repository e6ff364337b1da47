// src/fallback.rs
// Deterministic, schema-valid substitute for an unavailable synthesis model.

use chrono::Utc;
use rand::Rng;

use crate::model::{EnrichmentResult, SourceRef};

/// Inclusive bounds of the jittered fallback score. The jitter only exists
/// so repeated fallback results are distinguishable from one hard-coded
/// answer; tests assert the range, not an exact value.
pub const SCORE_MIN: u8 = 75;
pub const SCORE_MAX: u8 = 94;

/// Build a mock enrichment for `hostname`. Has no external dependency and
/// is total over its input domain: it must succeed for any hostname.
pub fn mock_enrichment(hostname: &str, source_url: &str) -> EnrichmentResult {
    let entity = entity_name(hostname);
    let now = Utc::now();

    EnrichmentResult {
        summary: format!(
            "{entity} is a leading technology entity focused on scaling digital \
             infrastructure and user-centric platforms."
        ),
        what_they_do: vec![
            "Developing next-generation vertical-specific software solutions".into(),
            "Optimizing core user workflows through advanced automation".into(),
            "Scaling global infrastructure for high-growth enterprises".into(),
            "Leveraging proprietary datasets for strategic advantage".into(),
        ],
        keywords: vec![
            "Infrastructure".into(),
            "Enterprise SaaS".into(),
            "Growth Velocity".into(),
            "Automation".into(),
            "Scale".into(),
        ],
        signals: vec![
            "Recent expansion into international markets detected".into(),
            "Series B+ growth trajectory with strong capital efficiency".into(),
            "Potential M&A target for strategic ecosystem expansion".into(),
        ],
        thesis_match_score: rand::rng().random_range(SCORE_MIN..=SCORE_MAX),
        thesis_explanation: "This entity aligns closely with the provided thesis through its \
                             focus on scalable infrastructure and clear market dominance in \
                             its niche."
            .into(),
        sources: vec![SourceRef {
            url: source_url.to_string(),
            timestamp: now,
        }],
        enriched_at: now,
        is_mock: Some(true),
    }
}

/// Human-readable entity name: first hostname label, first letter uppercased.
fn entity_name(hostname: &str) -> String {
    let label = hostname.split('.').next().unwrap_or(hostname);
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
