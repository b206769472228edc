use std::convert::Infallible;
use std::sync::Arc;

use futures::StreamExt;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use warp::{Rejection, Reply};

use crate::error::{ApiError, Error};
use crate::metrics;
use crate::models::{PipelineResult, SummarizeRequest, SummarizeResponse};
use crate::pipeline::Pipeline;
use crate::search::{validate_count, DEFAULT_RESULTS};

pub const EMPTY_QUERY_NOTICE: &str = "⚠️ Please enter a query to begin.";
pub const NO_RESULTS_NOTICE: &str = "❌ No relevant results found.";

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub query: String,
    #[serde(default)]
    pub num_results: Option<usize>,
}

#[instrument(skip(pipeline), fields(query = %request.query))]
pub async fn handle_summarize(
    request: SummarizeRequest,
    pipeline: Arc<Pipeline>,
) -> Result<impl Reply, Rejection> {
    let request_id = Uuid::new_v4();
    info!("Processing query [{}]: {}", request_id, request.query);

    if request.query.trim().is_empty() {
        return Err(warp::reject::custom(ApiError::BadRequest(
            EMPTY_QUERY_NOTICE.to_string(),
        )));
    }

    let result = match pipeline.run(&request.query, request.num_results, None).await {
        Ok(result) => result,
        Err(Error::SearchUnavailable(e)) => {
            warn!("Search backend unavailable [{}]: {}", request_id, e);
            PipelineResult::empty(request.query.as_str())
        }
        Err(e) => {
            error!("Query [{}] failed: {}", request_id, e);
            return Err(warp::reject::custom(ApiError::from(e)));
        }
    };

    let notice = result.is_empty().then(|| NO_RESULTS_NOTICE.to_string());

    Ok(warp::reply::json(&SummarizeResponse {
        request_id,
        notice,
        result,
    }))
}

pub async fn handle_stream(
    params: StreamParams,
    pipeline: Arc<Pipeline>,
) -> Result<impl Reply, Rejection> {
    if params.query.trim().is_empty() {
        return Err(warp::reject::custom(ApiError::BadRequest(
            EMPTY_QUERY_NOTICE.to_string(),
        )));
    }

    let num_results = validate_count(params.num_results.unwrap_or(DEFAULT_RESULTS))
        .map_err(|e| warp::reject::custom(ApiError::from(e)))?;

    info!("Streaming query: {}", params.query);
    let events = pipeline
        .stream(params.query, num_results)
        .map(|event| warp::sse::Event::default().event(event.name()).json_data(&event));

    Ok(warp::sse::reply(warp::sse::keep_alive().stream(events)))
}

pub async fn handle_metrics() -> Result<impl Reply, Infallible> {
    let (body, content_type) = match metrics::render() {
        Ok(rendered) => rendered,
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (Vec::new(), "text/plain".to_string())
        }
    };
    Ok(warp::reply::with_header(body, "Content-Type", content_type))
}
