use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One record returned by the search backend, in relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    #[serde(alias = "href")]
    pub url: String,
    #[serde(alias = "body", alias = "text", default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Ok,
    Degraded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub index: usize,
    pub title: String,
    pub source: String,
    pub summary: String,
    pub trace: String,
    pub status: SummaryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub query: String,
    pub global_summary: String,
    pub items: Vec<ItemSummary>,
}

impl PipelineResult {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            global_summary: String::new(),
            items: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Plain-text report: numbered summaries followed by the unified insight.
    pub fn render_text(&self) -> String {
        if self.items.is_empty() {
            return "❌ No relevant results found. Try another query.".to_string();
        }

        let mut text = String::from("📌 **Summarized Results:**\n\n");
        for item in &self.items {
            text.push_str(&format!(
                "{}. **{}**\n   {}\n\n",
                item.index + 1,
                item.title,
                item.summary
            ));
        }
        if !self.global_summary.is_empty() {
            text.push_str(&format!("🧠 **Unified Insight:**\n{}\n", self.global_summary));
        }
        text.trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub query: String,
    pub source: String,
    pub title: String,
    pub old_summary: String,
    pub user_edit: String,
    pub timestamp: DateTime<Utc>,
}

// API Request/Response models
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub query: String,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
}

fn default_num_results() -> usize {
    crate::search::DEFAULT_RESULTS
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub request_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub result: PipelineResult,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub query: String,
    #[serde(default)]
    pub source: String,
    pub title: String,
    pub old_summary: String,
    pub user_edit: String,
}

impl FeedbackRequest {
    pub fn into_entry(self, timestamp: DateTime<Utc>) -> FeedbackEntry {
        FeedbackEntry {
            query: self.query,
            source: self.source,
            title: self.title,
            old_summary: self.old_summary,
            user_edit: self.user_edit,
            timestamp,
        }
    }
}
