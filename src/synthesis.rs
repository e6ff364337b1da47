// src/synthesis.rs
// Gemini-backed structured extraction: provider trait + concrete client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EnrichConfig;
use crate::error::SynthesisError;
use crate::model::{EnrichmentResult, SourceRef};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Seam between the orchestrator and the language model. One attempt per
/// request is the contract; retries are a caller-visible decision reserved
/// for a future revision.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        thesis: &str,
        source_url: &str,
    ) -> Result<EnrichmentResult, SynthesisError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynSynthesizer = Arc<dyn Synthesizer>;

/// Build the configured synthesizer. `None` when no model credential is
/// configured — a valid state that routes requests to the fallback
/// generator, not a failure.
pub fn build_synthesizer(config: &EnrichConfig) -> Option<DynSynthesizer> {
    let api_key = config.gemini_api_key.clone()?;
    Some(Arc::new(GeminiSynthesizer::new(
        api_key,
        config.model.clone(),
        config.synthesis_timeout,
    )))
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiSynthesizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiSynthesizer {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                "vc-enrichment-service/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl Synthesizer for GeminiSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        thesis: &str,
        source_url: &str,
    ) -> Result<EnrichmentResult, SynthesisError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct GenerationConfig<'a> {
            #[serde(rename = "responseMimeType")]
            response_mime_type: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            #[serde(rename = "generationConfig")]
            generation_config: GenerationConfig<'a>,
        }

        #[derive(Deserialize)]
        struct Resp {
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

        let prompt = build_prompt(text, thesis, source_url);
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .map_err(SynthesisError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SynthesisError::Status(status.as_u16()));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(SynthesisError::Transport)?;
        let reply_text = body
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        parse_reply(&reply_text, source_url)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Prompt instructing the model to act as a VC analyst and reply with
/// strict JSON matching the result schema. The thesis is embedded verbatim
/// as scoring context.
pub fn build_prompt(text: &str, thesis: &str, source_url: &str) -> String {
    let timestamp = Utc::now().to_rfc3339();
    format!(
        r#"You are a senior Venture Capital Investment Analyst. Analyze the following startup website content and extract structured intelligence.

Investment Thesis Context: "{thesis}"

Website Content:
{text}

Rules:
- Return STRICT JSON.
- Do not hallucinate. Use only information present in the text.
- Infer signals based on content (e.g., careers -> hiring, docs -> dev product).

JSON Structure:
{{
    "summary": "1-2 sentence business summary",
    "what_they_do": ["3-6 core bullet points"],
    "keywords": ["5-10 key industry terms"],
    "signals": ["2-4 inferred investment signals"],
    "thesis_match_score": 0-100 (relative to the provided thesis),
    "thesis_explanation": "brief reasoning for the score",
    "sources": [
        {{
            "url": "{source_url}",
            "timestamp": "{timestamp}"
        }}
    ]
}}"#
    )
}

/// Expected shape of the model's JSON reply. Source timestamps are lenient
/// because the model echoes them back as strings.
#[derive(Deserialize)]
struct SynthesisReply {
    summary: String,
    what_they_do: Vec<String>,
    keywords: Vec<String>,
    signals: Vec<String>,
    thesis_match_score: i64,
    thesis_explanation: String,
    #[serde(default)]
    sources: Vec<ReplySource>,
}

#[derive(Deserialize)]
struct ReplySource {
    url: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Parse and validate a model reply. Invalid JSON and schema violations are
/// classified separately; a reply that merely omits the request URL from
/// `sources` is repaired rather than rejected, since that invariant is ours
/// to uphold.
pub fn parse_reply(reply_text: &str, source_url: &str) -> Result<EnrichmentResult, SynthesisError> {
    let value: serde_json::Value =
        serde_json::from_str(reply_text).map_err(SynthesisError::InvalidJson)?;
    let reply: SynthesisReply =
        serde_json::from_value(value).map_err(|e| SynthesisError::Schema(e.to_string()))?;

    if !(0..=100).contains(&reply.thesis_match_score) {
        return Err(SynthesisError::Schema(format!(
            "thesis_match_score {} out of range 0-100",
            reply.thesis_match_score
        )));
    }

    let now = Utc::now();
    let mut sources: Vec<SourceRef> = reply
        .sources
        .into_iter()
        .map(|s| SourceRef {
            url: s.url,
            timestamp: s.timestamp.unwrap_or(now),
        })
        .collect();
    if !sources.iter().any(|s| s.url == source_url) {
        sources.insert(
            0,
            SourceRef {
                url: source_url.to_string(),
                timestamp: now,
            },
        );
    }

    Ok(EnrichmentResult {
        summary: reply.summary,
        what_they_do: reply.what_they_do,
        keywords: reply.keywords,
        signals: reply.signals,
        thesis_match_score: reply.thesis_match_score as u8,
        thesis_explanation: reply.thesis_explanation,
        sources,
        enriched_at: now,
        is_mock: None,
    })
}

/// Scripted synthesizer for tests and local runs.
pub enum MockSynthesizer {
    /// Always returns a clone of the given result.
    Fixed(EnrichmentResult),
    /// Like `Fixed`, but copies the received thesis into
    /// `thesis_explanation` so callers can observe what was scored against.
    EchoingThesis(EnrichmentResult),
    /// Always fails with a schema violation, forcing the fallback path.
    Failing,
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        thesis: &str,
        _source_url: &str,
    ) -> Result<EnrichmentResult, SynthesisError> {
        match self {
            MockSynthesizer::Fixed(result) => Ok(result.clone()),
            MockSynthesizer::EchoingThesis(result) => {
                let mut result = result.clone();
                result.thesis_explanation = thesis.to_string();
                Ok(result)
            }
            MockSynthesizer::Failing => {
                Err(SynthesisError::Schema("forced failure (mock)".to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
