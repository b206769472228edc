use clap::Parser;

use agentic_summarizer::config::Config;
use agentic_summarizer::models::PipelineResult;
use agentic_summarizer::pipeline::{Pipeline, PipelineStage};
use agentic_summarizer::search::DEFAULT_RESULTS;
use agentic_summarizer::Error;

/// DuckDuckGo Web Search + AI Summarization
#[derive(Parser, Debug)]
#[command(name = "summarize", version, about)]
struct Args {
    /// Enter your search query
    query: String,

    /// Number of search results to fetch (1-10)
    #[arg(long = "num_results", default_value_t = DEFAULT_RESULTS)]
    num_results: usize,

    /// Suppress progress lines on stderr
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let pipeline = Pipeline::open(&config).await?;

    eprintln!("\n🔍 Searching DuckDuckGo for: {}\n", args.query);
    let print_stage = |stage: &PipelineStage| eprintln!("{}", stage);
    let progress: Option<&(dyn Fn(&PipelineStage) + Send + Sync)> =
        if args.quiet { None } else { Some(&print_stage) };

    let result = match pipeline.run(&args.query, args.num_results, progress).await {
        Ok(result) => result,
        Err(Error::SearchUnavailable(e)) => {
            tracing::warn!("Search unavailable: {}", e);
            PipelineResult::empty(args.query.as_str())
        }
        Err(e) => return Err(e.into()),
    };
    println!("{}", result.render_text());

    pipeline.close();
    Ok(())
}
