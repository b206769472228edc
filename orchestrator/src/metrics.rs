use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

use crate::models::SummaryStatus;

static SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "summarizer_searches_total",
        "Web searches by cache outcome",
        &["outcome"]
    )
    .expect("searches counter registers once")
});

static SUMMARIES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "summarizer_summaries_total",
        "Summarization calls by status",
        &["status"]
    )
    .expect("summaries counter registers once")
});

static RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "summarizer_pipeline_runs_total",
        "Pipeline executions by outcome",
        &["outcome"]
    )
    .expect("runs counter registers once")
});

static FEEDBACK: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "summarizer_feedback_entries_total",
        "User corrections appended to the feedback log",
        &["result"]
    )
    .expect("feedback counter registers once")
});

pub fn record_search(outcome: &str) {
    SEARCHES.with_label_values(&[outcome]).inc();
}

pub fn record_summary(status: SummaryStatus) {
    let label = match status {
        SummaryStatus::Ok => "ok",
        SummaryStatus::Degraded => "degraded",
        SummaryStatus::Failed => "failed",
    };
    SUMMARIES.with_label_values(&[label]).inc();
}

pub fn record_run(outcome: &str) {
    RUNS.with_label_values(&[outcome]).inc();
}

pub fn record_feedback(result: &str) {
    FEEDBACK.with_label_values(&[result]).inc();
}

/// Prometheus text exposition of the default registry, with its content type.
pub fn render() -> prometheus::Result<(Vec<u8>, String)> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((buffer, encoder.format_type().to_string()))
}
