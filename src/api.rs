// src/api.rs
// HTTP surface and the enrichment orchestrator.

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::State,
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::CorsLayer;
use url::Url;

use crate::cache::{CacheStatus, EnrichmentCache};
use crate::config::EnrichConfig;
use crate::error::EnrichError;
use crate::extract::extract_readable_text;
use crate::fallback::mock_enrichment;
use crate::model::{EnrichmentRequest, EnrichmentResult};
use crate::synthesis::{build_synthesizer, DynSynthesizer};

/// Browser-like identifying header for the page fetch; many sites reject
/// unidentified automated clients.
const FETCH_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Clone)]
pub struct AppState {
    config: Arc<EnrichConfig>,
    cache: Arc<EnrichmentCache>,
    http: reqwest::Client,
    synthesizer: Option<DynSynthesizer>,
}

impl AppState {
    pub fn new(config: EnrichConfig) -> Self {
        let synthesizer = build_synthesizer(&config);
        Self::with_synthesizer(config, synthesizer)
    }

    /// State with an explicit synthesizer (or none), used by tests to
    /// script the model without touching the environment.
    pub fn with_synthesizer(config: EnrichConfig, synthesizer: Option<DynSynthesizer>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(FETCH_USER_AGENT)
            .timeout(config.fetch_timeout)
            .build()
            .expect("reqwest client");
        let cache = Arc::new(EnrichmentCache::new(
            config.cache_capacity,
            config.cache_ttl,
        ));
        Self {
            config: Arc::new(config),
            cache,
            http,
            synthesizer,
        }
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    pub fn cache(&self) -> &EnrichmentCache {
        &self.cache
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/enrich", post(enrich))
        .route("/debug/cache", get(debug_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// The per-request state machine. Exactly one of MissingInput, InvalidUrl,
/// FetchFailure, EmptyContent, or success-with-result terminates each
/// request; synthesis failures are recovered internally and never surface.
async fn enrich(
    State(state): State<AppState>,
    Json(body): Json<EnrichmentRequest>,
) -> Result<Response, EnrichError> {
    // 1. Validate. No network activity happens before this point.
    let website = body
        .website
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .ok_or(EnrichError::MissingInput)?
        .to_string();
    let parsed = Url::parse(&website).map_err(|_| EnrichError::InvalidUrl)?;
    let hostname = parsed
        .host_str()
        .ok_or(EnrichError::InvalidUrl)?
        .to_ascii_lowercase();
    let thesis = body.thesis_or_default().to_string();

    // 2-6. Cache check with single-flight: the first request for an uncached
    // hostname runs the pipeline, concurrent ones await its result.
    let (result, status) = state
        .cache
        .get_or_compute(&hostname, || {
            run_pipeline(&state, &website, &hostname, &thesis)
        })
        .await?;

    if status == CacheStatus::Hit {
        tracing::info!(%hostname, "cache hit");
    }

    let mut response = Json(result).into_response();
    response.headers_mut().insert(
        "X-Enrichment-Cache",
        HeaderValue::from_static(match status {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }),
    );
    Ok(response)
}

/// Fetch -> extract -> synthesize-or-fallback -> stamp.
async fn run_pipeline(
    state: &AppState,
    website: &str,
    hostname: &str,
    thesis: &str,
) -> Result<EnrichmentResult, EnrichError> {
    // 3. Fetch. Terminal on failure: with no content there is nothing to
    // mock meaningfully beyond the hostname.
    let html = fetch_page(state, website).await?;

    // 4. Extract.
    let text = extract_readable_text(&html);
    if text.is_empty() {
        return Err(EnrichError::EmptyContent);
    }
    tracing::info!(%hostname, chars = text.len(), "extracted page text");

    // 5. Synthesize or fall back. An absent synthesizer is a configuration
    // state (no credential), not a failure.
    let mut result = match &state.synthesizer {
        None => {
            tracing::info!(%hostname, "no model credential configured; using fallback");
            mock_enrichment(hostname, website)
        }
        Some(synth) => match synth.synthesize(&text, thesis, website).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = ?e, provider = synth.name(), %hostname,
                    "synthesis failed; falling back");
                mock_enrichment(hostname, website)
            }
        },
    };

    // 6. Stamp; the caller stores it under the hostname.
    result.enriched_at = Utc::now();
    Ok(result)
}

async fn fetch_page(state: &AppState, website: &str) -> Result<String, EnrichError> {
    let resp = state
        .http
        .get(website)
        .send()
        .await
        .map_err(|e| EnrichError::FetchFailure(e.into()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(EnrichError::FetchFailure(anyhow!("HTTP {status}")));
    }

    resp.text()
        .await
        .map_err(|e| EnrichError::FetchFailure(e.into()))
}

#[derive(serde::Serialize)]
struct CacheInfo {
    entries: usize,
    capacity: usize,
}

async fn debug_cache(State(state): State<AppState>) -> Json<CacheInfo> {
    Json(CacheInfo {
        entries: state.cache.len(),
        capacity: state.cache.capacity(),
    })
}
