use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::error::ApiError;
use crate::feedback::FeedbackLog;
use crate::models::FeedbackRequest;

pub async fn handle_submit(
    request: FeedbackRequest,
    feedback_log: Arc<FeedbackLog>,
) -> Result<impl Reply, Rejection> {
    if request.user_edit.trim().is_empty() {
        return Err(warp::reject::custom(ApiError::BadRequest(
            "a correction is required to submit feedback".to_string(),
        )));
    }

    info!("Feedback received for '{}'", request.title);
    let entry = request.into_entry(Utc::now());

    if let Err(e) = feedback_log.append(&entry).await {
        error!("Failed to save feedback: {}", e);
        return Err(warp::reject::custom(ApiError::from(e)));
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&entry),
        StatusCode::CREATED,
    ))
}

pub async fn handle_list(feedback_log: Arc<FeedbackLog>) -> Result<impl Reply, Rejection> {
    match feedback_log.recent().await {
        Ok(entries) => Ok(warp::reply::json(&entries)),
        Err(e) => {
            error!("Failed to read feedback log: {}", e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}
