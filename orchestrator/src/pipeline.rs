// Pipeline Orchestrator: search -> per-item summaries -> synthesis

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::agents::{ItemSummarizer, SearchAgent, SummarizationService, SummaryOutcome};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{ItemSummary, PipelineResult, SearchResult};
use crate::search::{DuckDuckGo, SearchProvider};

/// Observer invoked at every stage boundary.
pub type Progress<'a> = Option<&'a (dyn Fn(&PipelineStage) + Send + Sync + 'a)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineStage {
    Searching,
    DoneEmpty,
    Summarizing {
        index: usize,
        total: usize,
        title: String,
    },
    Synthesizing,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Searching => write!(f, "🔍 Performing web search..."),
            PipelineStage::DoneEmpty => write!(f, "❌ No relevant results found."),
            PipelineStage::Summarizing {
                index,
                total,
                title,
            } => write!(f, "🧠 Summarizing {}/{}: {}...", index, total, title),
            PipelineStage::Synthesizing => write!(f, "🧠 Synthesizing a unified insight..."),
            PipelineStage::Done => write!(f, "✅ All summaries generated."),
        }
    }
}

/// Events of a step-wise run, in emission order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Status { message: String },
    Found { results: Vec<SearchResult> },
    Item { item: ItemSummary },
    Synthesis { global_summary: String },
    Failed { message: String },
    Done,
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::Status { .. } => "status",
            PipelineEvent::Found { .. } => "found",
            PipelineEvent::Item { .. } => "item",
            PipelineEvent::Synthesis { .. } => "synthesis",
            PipelineEvent::Failed { .. } => "failed",
            PipelineEvent::Done => "done",
        }
    }

    fn status(stage: PipelineStage) -> Self {
        PipelineEvent::Status {
            message: stage.to_string(),
        }
    }
}

pub struct Pipeline {
    search: SearchAgent,
    items: ItemSummarizer,
    service: Arc<SummarizationService>,
    concurrency: usize,
}

impl Pipeline {
    /// `concurrency` bounds in-flight item summaries; 1 reproduces strictly
    /// sequential processing.
    pub fn new(
        provider: Arc<SearchProvider>,
        service: Arc<SummarizationService>,
        concurrency: usize,
    ) -> Self {
        Self {
            search: SearchAgent::new(provider),
            items: ItemSummarizer::new(service.clone()),
            service,
            concurrency: concurrency.max(1),
        }
    }

    /// Wires the DuckDuckGo backend and the configured model.
    pub async fn open(config: &Config) -> Result<Self> {
        let backend = DuckDuckGo::new(config.search_backend_url.clone())?;
        let provider = SearchProvider::new(
            backend,
            config.search_cache_capacity,
            config.search_cache_ttl(),
            config.search_timeout(),
        );
        let service = SummarizationService::open(config).await;

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(service),
            config.summarize_concurrency,
        ))
    }

    /// Releases the model once no other handle to the service remains.
    pub fn close(self) {
        let Pipeline { search, items, service, .. } = self;
        drop(search);
        drop(items);
        match Arc::try_unwrap(service) {
            Ok(service) => service.close(),
            Err(_) => warn!("Summarization service still shared; model stays loaded"),
        }
    }

    pub fn service(&self) -> &SummarizationService {
        &self.service
    }

    pub async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be blank".into()));
        }
        self.search.search(query.trim(), num_results).await
    }

    pub async fn summarize_one(&self, index: usize, result: &SearchResult) -> ItemSummary {
        self.items.summarize_result(index, result).await
    }

    /// One summary per result, in result order regardless of completion order.
    pub async fn summarize_all(
        &self,
        results: &[SearchResult],
        progress: Progress<'_>,
    ) -> Vec<ItemSummary> {
        self.summarize_stream(results, progress).collect().await
    }

    pub async fn synthesize(&self, items: &[ItemSummary]) -> SummaryOutcome {
        let combined = items
            .iter()
            .map(|item| item.summary.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.service.synthesize(&combined).await
    }

    #[instrument(skip(self, progress))]
    pub async fn run(
        &self,
        query: &str,
        num_results: usize,
        progress: Progress<'_>,
    ) -> Result<PipelineResult> {
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be blank".into()));
        }

        report(progress, PipelineStage::Searching);
        let results = match self.search(query, num_results).await {
            Ok(results) => results,
            Err(e) => {
                metrics::record_run("error");
                return Err(e);
            }
        };

        if results.is_empty() {
            info!("No results for '{}'", query);
            report(progress, PipelineStage::DoneEmpty);
            metrics::record_run("empty");
            return Ok(PipelineResult::empty(query));
        }

        info!("Found {} sources, summarizing", results.len());
        let items = self.summarize_all(&results, progress).await;

        report(progress, PipelineStage::Synthesizing);
        let global = self.synthesize(&items).await;
        if !global.is_ok() {
            warn!("Synthesis degraded: {}", global);
        }

        report(progress, PipelineStage::Done);
        metrics::record_run("ok");
        Ok(PipelineResult {
            query: query.to_string(),
            global_summary: global.render(),
            items,
        })
    }

    /// Step-wise run as an event stream: the found results first, then each
    /// item as it is ready (in result order), then the synthesis.
    pub fn stream(
        self: Arc<Self>,
        query: String,
        num_results: usize,
    ) -> impl Stream<Item = PipelineEvent> + Send + 'static {
        async_stream::stream! {
            yield PipelineEvent::status(PipelineStage::Searching);

            let results = match self.search(&query, num_results).await {
                Ok(results) => results,
                Err(Error::SearchUnavailable(e)) => {
                    warn!("Search unavailable for '{}': {}", query, e);
                    metrics::record_run("error");
                    yield PipelineEvent::status(PipelineStage::DoneEmpty);
                    yield PipelineEvent::Done;
                    return;
                }
                Err(e) => {
                    metrics::record_run("error");
                    yield PipelineEvent::Failed { message: e.to_string() };
                    return;
                }
            };

            if results.is_empty() {
                metrics::record_run("empty");
                yield PipelineEvent::status(PipelineStage::DoneEmpty);
                yield PipelineEvent::Done;
                return;
            }

            yield PipelineEvent::Found { results: results.clone() };

            let mut items = Vec::with_capacity(results.len());
            let mut pending = Box::pin(self.summarize_stream(&results, None));
            while let Some(item) = pending.next().await {
                items.push(item.clone());
                yield PipelineEvent::Item { item };
            }
            drop(pending);

            yield PipelineEvent::status(PipelineStage::Synthesizing);
            let global = self.synthesize(&items).await;
            metrics::record_run("ok");
            yield PipelineEvent::Synthesis { global_summary: global.render() };
            yield PipelineEvent::Done;
        }
    }

    fn summarize_stream<'a>(
        &'a self,
        results: &'a [SearchResult],
        progress: Progress<'a>,
    ) -> impl Stream<Item = ItemSummary> + Send + 'a {
        let total = results.len();
        stream::iter(results.iter().enumerate())
            .map(move |(index, result)| async move {
                report(
                    progress,
                    PipelineStage::Summarizing {
                        index: index + 1,
                        total,
                        title: result.title.clone(),
                    },
                );
                self.items.summarize_result(index, result).await
            })
            .buffered(self.concurrency)
    }
}

fn report(progress: Progress<'_>, stage: PipelineStage) {
    if let Some(callback) = progress {
        callback(&stage);
    }
}
