use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::llm::{DevicePreference, ModelKind};

pub const DEFAULT_MODEL_ID: &str = "HuggingFaceTB/SmolLM2-135M-Instruct";
pub const DEFAULT_CACHE_DIR: &str = "/tmp/huggingface_cache";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub search_backend_url: String,
    pub search_timeout_secs: u64,
    pub search_cache_capacity: usize,
    pub search_cache_ttl_secs: u64,
    pub model_id: String,
    pub model_kind: ModelKind,
    pub device: DevicePreference,
    pub inference_url: String,
    pub hub_url: String,
    pub hf_cache_dir: PathBuf,
    pub huggingface_hub_token: Option<String>,
    pub load_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    pub generation_reentrant: bool,
    pub summarize_concurrency: usize,
    pub feedback_log: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Defaults layered under the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Self::defaults()?
            .add_source(::config::Environment::default().try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Defaults only, ignoring the environment.
    pub fn builtin() -> Result<Self> {
        Ok(Self::defaults()?.build()?.try_deserialize()?)
    }

    fn defaults() -> Result<::config::ConfigBuilder<::config::builder::DefaultState>> {
        Ok(::config::Config::builder()
            .set_default("port", 8080)?
            .set_default("search_backend_url", "https://html.duckduckgo.com/html/")?
            .set_default("search_timeout_secs", 20)?
            .set_default("search_cache_capacity", 128)?
            .set_default("search_cache_ttl_secs", 3600)?
            .set_default("model_id", DEFAULT_MODEL_ID)?
            .set_default("model_kind", "causal")?
            .set_default("device", "auto")?
            .set_default("inference_url", "http://localhost:8081")?
            .set_default("hub_url", "https://huggingface.co")?
            .set_default("hf_cache_dir", DEFAULT_CACHE_DIR)?
            .set_default("load_timeout_secs", 30)?
            .set_default("generation_timeout_secs", 120)?
            .set_default("generation_reentrant", false)?
            .set_default("summarize_concurrency", 1)?
            .set_default("feedback_log", "feedback_log.jsonl")?
            .set_default("log_level", "info")?)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn search_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.search_cache_ttl_secs)
    }

    /// Bound on each hub fetch and inference-backend probe at startup.
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}
