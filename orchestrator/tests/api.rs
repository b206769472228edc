use std::sync::Arc;
use std::time::Duration;

use agentic_summarizer::agents::SummarizationService;
use agentic_summarizer::api::{self, EMPTY_QUERY_NOTICE, NO_RESULTS_NOTICE};
use agentic_summarizer::error::{Error, Result};
use agentic_summarizer::feedback::FeedbackLog;
use agentic_summarizer::llm::{
    Device, LoadedModel, MockGeneration, ModelKind, Precision, TokenizerHandle,
};
use agentic_summarizer::models::SearchResult;
use agentic_summarizer::pipeline::Pipeline;
use agentic_summarizer::search::{SearchBackend, SearchProvider};
use async_trait::async_trait;
use serde_json::{json, Value};
use warp::http::StatusCode;

struct FixedSearch(Vec<SearchResult>);

#[async_trait]
impl SearchBackend for FixedSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        Ok(self.0.iter().take(max_results).cloned().collect())
    }
}

struct OfflineSearch;

#[async_trait]
impl SearchBackend for OfflineSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
        Err(Error::SearchUnavailable("connection refused".into()))
    }
}

fn results(n: usize) -> Vec<SearchResult> {
    (1..=n)
        .map(|i| SearchResult {
            title: format!("Source {}", i),
            url: format!("https://example.com/{}", i),
            snippet: format!("Snippet {} about quantum error correction.", i),
        })
        .collect()
}

fn pipeline(search: impl SearchBackend + 'static) -> Arc<Pipeline> {
    let model = LoadedModel {
        model_id: "HuggingFaceTB/SmolLM2-135M-Instruct".into(),
        kind: ModelKind::Causal,
        device: Device::Cpu,
        precision: Precision::Auto,
        tokenizer: TokenizerHandle {
            eos_token: Some("<|im_end|>".into()),
            pad_token: None,
        },
        backend: Arc::new(MockGeneration::with_reply(|_| "A concise summary.".into())),
    };
    let service = SummarizationService::with_model(Some(model), false, Duration::from_secs(5));
    let provider = SearchProvider::new(search, 8, Duration::from_secs(60), Duration::from_secs(5));
    Arc::new(Pipeline::new(Arc::new(provider), Arc::new(service), 2))
}

struct Harness {
    _dir: tempfile::TempDir,
    feedback_log: Arc<FeedbackLog>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let feedback_log = Arc::new(FeedbackLog::new(dir.path().join("feedback_log.jsonl")));
        Self {
            _dir: dir,
            feedback_log,
        }
    }
}

fn feedback_body(title: &str, edit: &str) -> Value {
    json!({
        "query": "quantum computing",
        "source": "https://example.com/2",
        "title": title,
        "old_summary": "A concise summary.",
        "user_edit": edit,
    })
}

#[tokio::test]
async fn summarize_returns_items_and_insight() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(results(3))), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/summarize")
        .json(&json!({ "query": "quantum computing", "num_results": 3 }))
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert!(body.get("notice").is_none());
    assert_eq!(body["result"]["query"], "quantum computing");
    assert_eq!(body["result"]["global_summary"], "A concise summary.");

    let items = body["result"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[1]["title"], "Source 2");
    assert_eq!(items[1]["status"], "ok");
    assert_eq!(
        items[1]["summary"],
        "A concise summary.\n🔗 Source: [Source 2](https://example.com/2)"
    );
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(results(3))), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/summarize")
        .json(&json!({ "query": "  " }))
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["details"], format!("Bad request: {}", EMPTY_QUERY_NOTICE));
}

#[tokio::test]
async fn out_of_range_count_is_a_bad_request() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(results(3))), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/summarize")
        .json(&json!({ "query": "quantum", "num_results": 11 }))
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn no_results_carry_a_notice() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(vec![])), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/summarize")
        .json(&json!({ "query": "zzzz nothing" }))
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["notice"], NO_RESULTS_NOTICE);
    assert_eq!(body["result"]["global_summary"], "");
    assert!(body["result"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_outage_reads_as_no_results() {
    let harness = Harness::new();
    let app = api::app(pipeline(OfflineSearch), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/summarize")
        .json(&json!({ "query": "quantum" }))
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["notice"], NO_RESULTS_NOTICE);
}

#[tokio::test]
async fn stream_emits_named_events_in_order() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(results(2))), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/summarize/stream?query=quantum%20computing&num_results=2")
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(resp.body().to_vec()).unwrap();
    let events: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("event:"))
        .map(str::trim)
        .collect();
    assert_eq!(
        events,
        vec!["status", "found", "item", "item", "status", "synthesis", "done"]
    );
}

#[tokio::test]
async fn feedback_is_appended_and_listed_newest_first() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(results(3))), harness.feedback_log.clone());

    for (title, edit) in [("Source 1", "First fix."), ("Source 2", "Second fix.")] {
        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/feedback")
            .json(&feedback_body(title, edit))
            .reply(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let raw = std::fs::read_to_string(harness.feedback_log.path()).unwrap();
    assert_eq!(raw.lines().count(), 2);

    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/feedback")
        .reply(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let entries: Vec<Value> = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["title"], "Source 2");
    assert_eq!(entries[0]["user_edit"], "Second fix.");
    assert_eq!(entries[1]["title"], "Source 1");
}

#[tokio::test]
async fn empty_correction_is_rejected_and_not_logged() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(results(3))), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/feedback")
        .json(&feedback_body("Source 2", "   "))
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!harness.feedback_log.path().exists());
}

#[tokio::test]
async fn health_reports_model_readiness() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(vec![])), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_ready"], true);
}

#[tokio::test]
async fn index_serves_the_front_end() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(vec![])), harness.feedback_log.clone());

    let resp = warp::test::request().method("GET").path("/").reply(&app).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(resp.body().to_vec()).unwrap();
    assert!(body.contains("Was this summary accurate?"));
}

fn stream_events(body: &[u8]) -> Vec<String> {
    String::from_utf8(body.to_vec())
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("event:"))
        .map(|name| name.trim().to_string())
        .collect()
}

#[tokio::test]
async fn stream_of_search_outage_reports_no_results() {
    let harness = Harness::new();
    let app = api::app(pipeline(OfflineSearch), harness.feedback_log.clone());

    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/summarize/stream?query=quantum")
        .reply(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stream_events(resp.body()), vec!["status", "status", "done"]);
    let body = String::from_utf8(resp.body().to_vec()).unwrap();
    assert!(body.contains(NO_RESULTS_NOTICE));
    assert!(!body.contains("Search unavailable"));
}

#[tokio::test]
async fn stream_rejects_out_of_range_count_up_front() {
    let harness = Harness::new();
    let app = api::app(pipeline(FixedSearch(results(3))), harness.feedback_log.clone());

    for count in [0, 11] {
        let resp = warp::test::request()
            .method("GET")
            .path(&format!("/api/v1/summarize/stream?query=quantum&num_results={}", count))
            .reply(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "count {}", count);
    }
}
