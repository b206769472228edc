use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod loader;
pub mod mock;
pub mod tgi;

pub use loader::ModelLoader;
pub use mock::MockGeneration;
pub use tgi::TgiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Causal,
    Seq2seq,
}

impl ModelKind {
    /// Causal decoders echo the prompt ahead of the generated continuation.
    pub fn echoes_prompt(self) -> bool {
        matches!(self, ModelKind::Causal)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Causal => write!(f, "CAUSAL"),
            ModelKind::Seq2seq => write!(f, "SEQ2SEQ"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    Auto,
    Cuda,
    Cpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Cpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Bfloat16,
    Auto,
}

/// The subset of a tokenizer the prompt and decoding setup depend on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenizerHandle {
    pub eos_token: Option<String>,
    pub pad_token: Option<String>,
}

/// Decoding configuration handed to the inference backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub do_sample: bool,
    pub stop: Vec<String>,
    pub return_full_text: bool,
}

/// Remote or in-process text generation.
///
/// Implementations return the generated text, including the prompt prefix
/// when `return_full_text` is set.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// A resolved model ready for generation.
#[derive(Clone)]
pub struct LoadedModel {
    pub model_id: String,
    pub kind: ModelKind,
    pub device: Device,
    pub precision: Precision,
    pub tokenizer: TokenizerHandle,
    pub backend: Arc<dyn TextGeneration>,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model_id", &self.model_id)
            .field("kind", &self.kind)
            .field("device", &self.device)
            .field("precision", &self.precision)
            .field("tokenizer", &self.tokenizer)
            .finish_non_exhaustive()
    }
}
