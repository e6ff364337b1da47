// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod model;
pub mod synthesis;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::EnrichConfig;
pub use crate::error::{EnrichError, SynthesisError};
pub use crate::model::{EnrichmentRequest, EnrichmentResult, SourceRef};

/// Build the in-process app router from the environment. Tests that need a
/// scripted synthesizer should construct `AppState` directly instead.
pub fn app() -> axum::Router {
    api::create_router(AppState::new(EnrichConfig::from_env()))
}
