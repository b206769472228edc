// DuckDuckGo HTML endpoint backend

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::SearchBackend;
use crate::error::{Error, Result};
use crate::models::SearchResult;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) agentic-summarizer/0.1";

static RESULT: Lazy<Selector> = Lazy::new(|| selector(".result"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| selector("a.result__a"));
static SNIPPET: Lazy<Selector> = Lazy::new(|| selector(".result__snippet"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid CSS")
}

pub struct DuckDuckGo {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGo {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGo {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        info!("Searching for '{}' with {} results...", query, max_results);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::SearchUnavailable(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::SearchUnavailable(format!(
                "search backend answered {}",
                status
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::SearchUnavailable(e.to_string()))?;

        let results = parse_results(&html, max_results);
        info!("Found {} results.", results.len());
        Ok(results)
    }
}

/// Extracts organic results from a DuckDuckGo HTML results page.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    document
        .select(&RESULT)
        .filter(|node| !is_ad(node))
        .filter_map(|node| {
            let link = node.select(&TITLE_LINK).next()?;
            let href = link.value().attr("href")?;
            let title = collapse_text(&link);
            if title.is_empty() {
                return None;
            }
            let snippet = node
                .select(&SNIPPET)
                .next()
                .map(|s| collapse_text(&s))
                .unwrap_or_default();

            Some(SearchResult {
                title,
                url: resolve_link(href),
                snippet,
            })
        })
        .take(max_results)
        .collect()
}

fn is_ad(node: &ElementRef<'_>) -> bool {
    node.value().classes().any(|c| c == "result--ad")
}

fn collapse_text(node: &ElementRef<'_>) -> String {
    node.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// DuckDuckGo wraps outbound links as `//duckduckgo.com/l/?uddg=<target>`.
fn resolve_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    match Url::parse(&absolute) {
        Ok(url) if url.path() == "/l/" => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        Ok(_) => absolute,
        Err(e) => {
            debug!("Keeping unparsable result link {}: {}", href, e);
            href.to_string()
        }
    }
}
