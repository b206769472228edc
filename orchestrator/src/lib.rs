pub mod agents;
pub mod api;
pub mod config;
pub mod error;
pub mod feedback;
pub mod llm;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod search;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineEvent, PipelineStage};
