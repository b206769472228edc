use std::time::Duration;

use thiserror::Error;
use warp::{reject::Reject, Rejection, Reply};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Feedback log error: {0}")]
    Feedback(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream timeout: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl Reject for ApiError {}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgument(msg) => ApiError::BadRequest(msg),
            err @ Error::Timeout { .. } => ApiError::Timeout(err.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(api_err) = err.find::<ApiError>() {
        let (code, message) = match api_err {
            ApiError::BadRequest(_) => (
                warp::http::StatusCode::BAD_REQUEST,
                "Bad request",
            ),
            ApiError::Timeout(_) => (
                warp::http::StatusCode::GATEWAY_TIMEOUT,
                "Upstream timed out",
            ),
            ApiError::InternalError(_) => (
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ),
        };

        let json = warp::reply::json(&serde_json::json!({
            "error": message,
            "details": api_err.to_string(),
        }));

        Ok(warp::reply::with_status(json, code))
    } else {
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = Error::Timeout {
            operation: "search",
            elapsed: Duration::from_millis(50),
        };
        assert_eq!(err.to_string(), "search timed out after 50ms");
        assert!(matches!(ApiError::from(err), ApiError::Timeout(msg) if msg == "search timed out after 50ms"));
    }
}
