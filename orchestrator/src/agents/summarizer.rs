// Summarization Service: prompt construction, greedy generation and reply extraction

use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::llm::{GenerationParams, LoadedModel, ModelLoader};
use crate::metrics;
use crate::models::SummaryStatus;

pub const MAX_NEW_TOKENS: u32 = 150;

const ASSISTANT_MARKER: &str = "<|im_start|>assistant\n";
const END_OF_TURN: &str = "<|im_end|>";

/// Leading glyphs of every rendered diagnostic.
pub const DIAGNOSTIC_PREFIXES: [&str; 2] = ["⚠️", "🚫"];

pub fn is_diagnostic(text: &str) -> bool {
    DIAGNOSTIC_PREFIXES.iter().any(|p| text.starts_with(p))
}

/// A role-tagged prompt in the model's chat format.
pub struct PromptTemplate {
    pub system: &'static str,
    pub instruction: &'static str,
}

pub const SUMMARIZE: PromptTemplate = PromptTemplate {
    system: "You are a helpful assistant that summarizes text into a few concise sentences.",
    instruction: "Summarize the following text:",
};

pub const SYNTHESIZE: PromptTemplate = PromptTemplate {
    system: "You are a scholarly assistant synthesizing multiple independent web summaries.",
    instruction: "Combine the following insights into a unified high-level overview:",
};

impl PromptTemplate {
    pub fn render(&self, text: &str) -> String {
        format!(
            "<|im_start|>system\n{}{end}\n<|im_start|>user\n{}\n\n{}{end}\n{}",
            self.system,
            self.instruction,
            text,
            ASSISTANT_MARKER,
            end = END_OF_TURN,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    EmptyInput,
    ModelUnavailable,
    MissingEos,
    EmptyGeneration,
    NothingToSynthesize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Backend(String),
    Timeout(Duration),
}

/// Result of one summarization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Ok(String),
    Degraded(Degradation),
    Failed(Failure),
}

impl SummaryOutcome {
    pub fn status(&self) -> SummaryStatus {
        match self {
            SummaryOutcome::Ok(_) => SummaryStatus::Ok,
            SummaryOutcome::Degraded(_) => SummaryStatus::Degraded,
            SummaryOutcome::Failed(_) => SummaryStatus::Failed,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SummaryOutcome::Ok(_))
    }

    /// Display text; diagnostics start with one of [`DIAGNOSTIC_PREFIXES`].
    pub fn render(&self) -> String {
        match self {
            SummaryOutcome::Ok(text) => text.clone(),
            SummaryOutcome::Degraded(Degradation::EmptyInput) => {
                "⚠️ No content available to summarize.".into()
            }
            SummaryOutcome::Degraded(Degradation::ModelUnavailable) => {
                "🚫 Summarizer pipeline not initialized. Check model and token.".into()
            }
            SummaryOutcome::Degraded(Degradation::MissingEos) => {
                "🚫 Tokenizer has no end-of-sequence token; generation would be unbounded.".into()
            }
            SummaryOutcome::Degraded(Degradation::EmptyGeneration) => {
                "⚠️ Model returned an empty summary.".into()
            }
            SummaryOutcome::Degraded(Degradation::NothingToSynthesize) => {
                "⚠️ No individual summaries were generated to synthesize.".into()
            }
            SummaryOutcome::Failed(Failure::Backend(e)) => format!("🚫 Inference error: {}", e),
            SummaryOutcome::Failed(Failure::Timeout(after)) => {
                format!("🚫 Inference timed out after {:?}.", after)
            }
        }
    }
}

impl fmt::Display for SummaryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Owns the loaded model and turns text into summaries.
///
/// Generation is serialized through `gate` unless the backend was declared
/// reentrant.
pub struct SummarizationService {
    model: Option<LoadedModel>,
    gate: Option<Mutex<()>>,
    timeout: Duration,
}

impl SummarizationService {
    /// Loads the configured model. A load failure leaves the service usable
    /// but degraded.
    pub async fn open(config: &Config) -> Self {
        let model = match ModelLoader::new(config) {
            Ok(loader) => match loader.load(&config.model_id, config.model_kind).await {
                Ok(model) => Some(model),
                Err(e) => {
                    error!("Error loading model: {}", e);
                    None
                }
            },
            Err(e) => {
                error!("Error building model loader: {}", e);
                None
            }
        };

        Self::with_model(model, config.generation_reentrant, config.generation_timeout())
    }

    pub fn with_model(model: Option<LoadedModel>, reentrant: bool, timeout: Duration) -> Self {
        Self {
            model,
            gate: (!reentrant).then(|| Mutex::new(())),
            timeout,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn close(self) {
        if let Some(model) = self.model {
            info!("Releasing model '{}'", model.model_id);
        }
    }

    pub async fn summarize(&self, text: &str) -> SummaryOutcome {
        self.generate_with(&SUMMARIZE, text).await
    }

    pub async fn synthesize(&self, combined: &str) -> SummaryOutcome {
        if combined.trim().is_empty() {
            return SummaryOutcome::Degraded(Degradation::NothingToSynthesize);
        }
        self.generate_with(&SYNTHESIZE, combined).await
    }

    async fn generate_with(&self, template: &PromptTemplate, text: &str) -> SummaryOutcome {
        let outcome = self.try_generate(template, text).await;
        metrics::record_summary(outcome.status());
        outcome
    }

    async fn try_generate(&self, template: &PromptTemplate, text: &str) -> SummaryOutcome {
        if text.trim().is_empty() {
            return SummaryOutcome::Degraded(Degradation::EmptyInput);
        }

        let model = match &self.model {
            Some(model) => model,
            None => return SummaryOutcome::Degraded(Degradation::ModelUnavailable),
        };

        let eos = match &model.tokenizer.eos_token {
            Some(eos) => eos.clone(),
            None => {
                warn!("Tokenizer for '{}' has no eos token", model.model_id);
                return SummaryOutcome::Degraded(Degradation::MissingEos);
            }
        };

        let prompt = template.render(text);
        let params = GenerationParams {
            max_new_tokens: MAX_NEW_TOKENS,
            do_sample: false,
            stop: vec![eos],
            return_full_text: model.kind.echoes_prompt(),
        };

        let _guard = match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };

        let generated =
            match tokio::time::timeout(self.timeout, model.backend.generate(&prompt, &params)).await
            {
                Ok(Ok(generated)) => generated,
                Ok(Err(e)) => {
                    warn!("Inference error: {}", e);
                    return SummaryOutcome::Failed(Failure::Backend(e.to_string()));
                }
                Err(_) => {
                    warn!("Inference timed out after {:?}", self.timeout);
                    return SummaryOutcome::Failed(Failure::Timeout(self.timeout));
                }
            };

        let reply = extract_reply(&generated, &prompt);
        if reply.is_empty() {
            SummaryOutcome::Degraded(Degradation::EmptyGeneration)
        } else {
            SummaryOutcome::Ok(reply)
        }
    }
}

/// Keeps only what follows the final assistant marker, falling back to
/// stripping the prompt when the marker is missing.
pub fn extract_reply(generated: &str, prompt: &str) -> String {
    let reply = match generated.rfind(ASSISTANT_MARKER) {
        Some(at) => &generated[at + ASSISTANT_MARKER.len()..],
        None => generated.strip_prefix(prompt).unwrap_or(generated),
    };

    reply.trim().trim_end_matches(END_OF_TURN).trim().to_string()
}
