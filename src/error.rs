// src/error.rs
// Caller-visible failure taxonomy for the enrichment endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Terminal failures of an enrichment request. Synthesis failures are not
/// here on purpose: they are recovered locally via the fallback generator
/// and never surfaced to the caller (see `SynthesisError`).
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("Website URL is required")]
    MissingInput,

    #[error("Invalid URL provided")]
    InvalidUrl,

    #[error("Failed to access website. The site may be blocking automated requests.")]
    FetchFailure(#[source] anyhow::Error),

    #[error("No readable content found on the page.")]
    EmptyContent,
}

impl EnrichError {
    /// Input problems are client errors; fetch/content problems are
    /// upstream (server-class) errors.
    pub fn status(&self) -> StatusCode {
        match self {
            EnrichError::MissingInput | EnrichError::InvalidUrl => StatusCode::BAD_REQUEST,
            EnrichError::FetchFailure(_) | EnrichError::EmptyContent => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for EnrichError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Internal failure modes of the synthesis client. Each is classified
/// distinctly for logging, but the orchestrator treats them all the same:
/// abandon synthesis and substitute the fallback result.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("synthesis transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("synthesis endpoint returned status {0}")]
    Status(u16),

    #[error("synthesis reply is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("synthesis reply violates the result schema: {0}")]
    Schema(String),
}
