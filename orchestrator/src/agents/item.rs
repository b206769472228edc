// Per-Item Summarizer Agent: one search result in, one attributed summary out

use std::sync::Arc;

use tracing::info;

use super::summarizer::SummarizationService;
use crate::models::{ItemSummary, SearchResult};

pub struct ItemSummarizer {
    service: Arc<SummarizationService>,
}

impl ItemSummarizer {
    pub fn new(service: Arc<SummarizationService>) -> Self {
        Self { service }
    }

    pub async fn summarize_item(&self, content: &str, source: &str, title: &str) -> ItemSummary {
        info!("Summarizer: Reading {}", title);
        let word_count = content.split_whitespace().count();

        let outcome = self.service.summarize(content).await;
        let summary = format!("{}{}", outcome.render(), attribution(source, title));

        ItemSummary {
            index: 0,
            title: title.to_string(),
            source: source.to_string(),
            summary,
            trace: trace(title, word_count),
            status: outcome.status(),
        }
    }

    pub async fn summarize_result(&self, index: usize, result: &SearchResult) -> ItemSummary {
        let mut item = self
            .summarize_item(&result.snippet, &result.url, &result.title)
            .await;
        item.index = index;
        item
    }
}

fn attribution(source: &str, title: &str) -> String {
    if source.is_empty() {
        return String::new();
    }
    let label = if title.is_empty() { "View Original" } else { title };
    format!("\n🔗 Source: [{}]({})", label, source)
}

fn trace(title: &str, word_count: usize) -> String {
    format!(
        "🤔 Agent reads: {}\n📚 Extracting claims from content.\n🔤 Tokens: {}",
        title, word_count
    )
}
