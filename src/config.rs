// src/config.rs
// Environment-driven service configuration.

use std::time::Duration;

/// Runtime configuration for the enrichment service.
///
/// An absent `gemini_api_key` is a valid state, not an error: the
/// orchestrator then routes every request to the fallback generator.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub gemini_api_key: Option<String>,
    /// Gemini model id, e.g. "gemini-2.5-flash".
    pub model: String,
    pub fetch_timeout: Duration,
    pub synthesis_timeout: Duration,
    /// Upper bound on cached hostnames (LRU beyond that).
    pub cache_capacity: usize,
    /// Optional entry TTL; `None` keeps entries for the process lifetime.
    pub cache_ttl: Option<Duration>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: "gemini-2.5-flash".to_string(),
            fetch_timeout: Duration::from_secs(15),
            synthesis_timeout: Duration::from_secs(30),
            cache_capacity: 1024,
            cache_ttl: None,
        }
    }
}

impl EnrichConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let model = std::env::var("ENRICH_MODEL").unwrap_or(defaults.model);

        let fetch_timeout = env_u64("ENRICH_FETCH_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);
        let synthesis_timeout = env_u64("ENRICH_SYNTH_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.synthesis_timeout);

        let cache_capacity = env_u64("ENRICH_CACHE_CAPACITY")
            .map(|n| n as usize)
            .filter(|n| *n > 0)
            .unwrap_or(defaults.cache_capacity);
        let cache_ttl = env_u64("ENRICH_CACHE_TTL_MS")
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Self {
            gemini_api_key,
            model,
            fetch_timeout,
            synthesis_timeout,
            cache_capacity,
            cache_ttl,
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}
