pub mod item;
pub mod search;
pub mod summarizer;

pub use item::ItemSummarizer;
pub use search::SearchAgent;
pub use summarizer::{SummarizationService, SummaryOutcome};
