use std::convert::Infallible;
use std::sync::Arc;

use warp::{Filter, Rejection, Reply};

use crate::error::handle_rejection;
use crate::feedback::FeedbackLog;
use crate::middleware;
use crate::pipeline::Pipeline;

mod feedback;
mod query;

pub use query::{EMPTY_QUERY_NOTICE, NO_RESULTS_NOTICE};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Every route the server exposes, with CORS and rejection handling applied.
pub fn app(
    pipeline: Arc<Pipeline>,
    feedback_log: Arc<FeedbackLog>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML));

    let health_pipeline = pipeline.clone();
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "model_ready": health_pipeline.service().is_ready(),
            }))
        });

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(query::handle_metrics);

    index
        .or(health)
        .or(metrics)
        .or(routes(pipeline, feedback_log).with(warp::log("api")))
        .recover(handle_rejection)
        .with(middleware::cors())
}

pub fn routes(
    pipeline: Arc<Pipeline>,
    feedback_log: Arc<FeedbackLog>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let summarize_route = warp::path!("api" / "v1" / "summarize")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pipeline(pipeline.clone()))
        .and_then(query::handle_summarize);

    let stream_route = warp::path!("api" / "v1" / "summarize" / "stream")
        .and(warp::get())
        .and(warp::query())
        .and(with_pipeline(pipeline))
        .and_then(query::handle_stream);

    let submit_feedback_route = warp::path!("api" / "v1" / "feedback")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_feedback(feedback_log.clone()))
        .and_then(feedback::handle_submit);

    let list_feedback_route = warp::path!("api" / "v1" / "feedback")
        .and(warp::get())
        .and(with_feedback(feedback_log))
        .and_then(feedback::handle_list);

    summarize_route
        .or(stream_route)
        .or(submit_feedback_route)
        .or(list_feedback_route)
}

fn with_pipeline(
    pipeline: Arc<Pipeline>,
) -> impl Filter<Extract = (Arc<Pipeline>,), Error = Infallible> + Clone {
    warp::any().map(move || pipeline.clone())
}

fn with_feedback(
    feedback_log: Arc<FeedbackLog>,
) -> impl Filter<Extract = (Arc<FeedbackLog>,), Error = Infallible> + Clone {
    warp::any().map(move || feedback_log.clone())
}
