use std::sync::Arc;

use tracing::info;

use agentic_summarizer::api;
use agentic_summarizer::config::Config;
use agentic_summarizer::feedback::FeedbackLog;
use agentic_summarizer::pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!("Starting Agentic AI Web Summarizer");
    info!("Configuration loaded");

    // Load the model and wire the search backend
    let pipeline = Arc::new(Pipeline::open(&config).await?);
    if pipeline.service().is_ready() {
        info!("Summarization service ready");
    } else {
        info!("Summarization service degraded; summaries will carry diagnostics");
    }

    let feedback_log = Arc::new(FeedbackLog::new(config.feedback_log.clone()));
    info!("Feedback log at {}", feedback_log.path().display());

    let routes = api::app(pipeline.clone(), feedback_log);

    // Start server
    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(
        ([0, 0, 0, 0], config.port),
        async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        },
    )?;
    info!("Server listening on {}", addr);

    server.await;

    match Arc::try_unwrap(pipeline) {
        Ok(pipeline) => pipeline.close(),
        Err(_) => info!("Pipeline still referenced at shutdown"),
    }

    Ok(())
}
