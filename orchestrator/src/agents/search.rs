// Search Agent: runs the cached web search and normalizes records for summarization

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::models::SearchResult;
use crate::search::SearchProvider;

pub const UNTITLED: &str = "No Title";

pub struct SearchAgent {
    provider: Arc<SearchProvider>,
}

impl SearchAgent {
    pub fn new(provider: Arc<SearchProvider>) -> Self {
        Self { provider }
    }

    pub async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        info!("Search: Looking up: {}", query);

        let results = self.provider.search(query, num_results).await?;
        Ok(results.into_iter().map(normalize).collect())
    }
}

fn normalize(mut result: SearchResult) -> SearchResult {
    let title = result.title.trim();
    result.title = if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    };
    result.url = result.url.trim().to_string();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_titles_get_placeholder() {
        let normalized = normalize(SearchResult {
            title: "   ".into(),
            url: " https://example.com ".into(),
            snippet: "body".into(),
        });
        assert_eq!(normalized.title, UNTITLED);
        assert_eq!(normalized.url, "https://example.com");
        assert_eq!(normalized.snippet, "body");
    }
}
