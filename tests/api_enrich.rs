//! Integration tests for the enrichment endpoint.
//!
//! Covered (strict):
//! - Success path with fallback (no model credential configured)
//! - Cache MISS -> HIT for the same hostname, with a fetch-count assertion
//! - Hostname keying: different paths on one host share a cache entry
//! - Input rejections: missing website, unparseable URL
//! - Terminal fetch/content failures (non-2xx upstream, chrome-only page)
//!
//! Endpoint: POST /enrich
//! Payload: {"website": "...", "thesis": "..."} (aliases: url, websiteUrl)

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vc_enrichment_service::{api, AppState, EnrichConfig};

const PAGE_HTML: &str = r#"<html><head><title>Acme</title></head><body>
    <nav>Home Pricing Careers</nav>
    <main>
        <h1>Acme</h1>
        <p>We build usage-based billing infrastructure for SaaS companies.</p>
        <p>Trusted by hundreds of engineering teams. We're hiring!</p>
    </main>
    <footer>Copyright Acme Inc.</footer>
</body></html>"#;

/// Router with no synthesizer configured: every miss goes through
/// fetch -> extract -> fallback.
fn build_app() -> Router {
    let state = AppState::with_synthesizer(EnrichConfig::default(), None);
    api::create_router(state)
}

async fn post_enrich(app: &Router, payload: Value) -> (StatusCode, HeaderMap, Value) {
    let body = Body::from(serde_json::to_vec(&payload).expect("serialize payload"));
    let req = Request::builder()
        .method("POST")
        .uri("/enrich")
        .header("content-type", "application/json")
        .body(body)
        .expect("request build");

    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

fn cache_header(headers: &HeaderMap) -> &str {
    headers
        .get("X-Enrichment-Cache")
        .expect("X-Enrichment-Cache header must be present")
        .to_str()
        .expect("header must be valid ASCII")
}

async fn serve_page(html: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&server)
        .await;
    server
}

// --- TESTS ---

#[tokio::test]
async fn enrichment_without_credential_yields_schema_valid_mock() {
    let server = serve_page(PAGE_HTML).await;
    let app = build_app();
    let website = format!("{}/", server.uri());

    let (status, headers, body) = post_enrich(&app, json!({ "website": website })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_header(&headers), "MISS");
    assert_eq!(body["is_mock"], json!(true));
    assert_eq!(body["sources"][0]["url"], json!(website));

    let score = body["thesis_match_score"].as_u64().expect("integer score");
    assert!((75..=94).contains(&score), "score {score} out of band");
    assert!(body["summary"].as_str().unwrap().len() > 10);
    assert!(!body["what_they_do"].as_array().unwrap().is_empty());
    assert!(body["enriched_at"].is_string());
}

#[tokio::test]
async fn second_request_hits_cache_and_skips_the_fetch() {
    let server = serve_page(PAGE_HTML).await;
    let app = build_app();
    let website = format!("{}/", server.uri());

    let (s1, h1, first) = post_enrich(&app, json!({ "website": website })).await;
    assert_eq!(s1, StatusCode::OK);
    assert_eq!(cache_header(&h1), "MISS");

    let (s2, h2, second) = post_enrich(&app, json!({ "website": website })).await;
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(cache_header(&h2), "HIT");
    assert_eq!(first, second, "hit must return the stored result unchanged");

    let fetches = server.received_requests().await.expect("request log");
    assert_eq!(fetches.len(), 1, "cache hit must not refetch the page");
}

#[tokio::test]
async fn cache_key_is_the_hostname_not_the_full_url() {
    let server = serve_page(PAGE_HTML).await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_HTML))
        .mount(&server)
        .await;

    let app = build_app();

    let (_, h1, _) = post_enrich(&app, json!({ "website": format!("{}/", server.uri()) })).await;
    assert_eq!(cache_header(&h1), "MISS");

    // Same host, different path and query: treated as the same entity.
    let (_, h2, _) = post_enrich(
        &app,
        json!({ "website": format!("{}/about?ref=nav", server.uri()) }),
    )
    .await;
    assert_eq!(cache_header(&h2), "HIT");

    let fetches = server.received_requests().await.expect("request log");
    assert_eq!(fetches.len(), 1);
}

#[tokio::test]
async fn url_field_aliases_are_accepted() {
    let server = serve_page(PAGE_HTML).await;
    let app = build_app();
    let website = format!("{}/", server.uri());

    let (s1, _, _) = post_enrich(&app, json!({ "url": website })).await;
    assert_eq!(s1, StatusCode::OK);

    let (s2, _, _) = post_enrich(&app, json!({ "websiteUrl": website })).await;
    assert_eq!(s2, StatusCode::OK);
}

#[tokio::test]
async fn missing_website_is_rejected_without_network_activity() {
    let app = build_app();

    let (status, _, body) = post_enrich(&app, json!({ "thesis": "vertical SaaS" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Website URL is required"));
}

#[tokio::test]
async fn unparseable_website_is_rejected() {
    let app = build_app();

    let (status, _, body) = post_enrich(&app, json!({ "website": "not a url" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid URL provided"));
}

#[tokio::test]
async fn upstream_non_2xx_is_a_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let app = build_app();
    let (status, _, body) = post_enrich(&app, json!({ "website": format!("{}/", server.uri()) })).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to access website"));
}

#[tokio::test]
async fn chrome_only_page_is_empty_content() {
    let html = r#"<html><body>
        <script>window.__APP__ = {};</script>
        <nav><a href="/">Home</a></nav>
    </body></html>"#;
    let server = serve_page(html).await;

    let app = build_app();
    let (status, _, body) = post_enrich(&app, json!({ "website": format!("{}/", server.uri()) })).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], json!("No readable content found on the page."));
}

#[tokio::test]
async fn failed_request_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let app = build_app();
    let website = format!("{}/", server.uri());

    let (s1, _, _) = post_enrich(&app, json!({ "website": website })).await;
    assert_eq!(s1, StatusCode::BAD_GATEWAY);

    // A failure must not poison the cache: the retry refetches.
    let (s2, _, _) = post_enrich(&app, json!({ "website": website })).await;
    assert_eq!(s2, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn concurrent_requests_for_one_host_fetch_once() {
    let server = serve_page(PAGE_HTML).await;
    let app = build_app();
    let website = format!("{}/", server.uri());

    let mut handles = Vec::new();
    for _ in 0..4 {
        let app = app.clone();
        let payload = json!({ "website": website });
        handles.push(tokio::spawn(async move {
            post_enrich(&app, payload).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let fetches = server.received_requests().await.expect("request log");
    assert_eq!(fetches.len(), 1, "single-flight: one leader fetch");
}

#[tokio::test]
async fn health_and_debug_cache_respond() {
    let server = serve_page(PAGE_HTML).await;
    let app = build_app();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let _ = post_enrich(&app, json!({ "website": format!("{}/", server.uri()) })).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/debug/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let info: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(info["entries"], json!(1));
}
