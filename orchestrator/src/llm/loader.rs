// Model Loader: resolves tokenizer metadata and the serving backend for a model id

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use super::tgi::{BackendInfo, TgiClient};
use super::{Device, DevicePreference, LoadedModel, ModelKind, Precision, TokenizerHandle};
use crate::config::Config;
use crate::error::{Error, Result};

const TOKENIZER_CONFIG: &str = "tokenizer_config.json";

pub struct ModelLoader {
    client: reqwest::Client,
    hub_url: String,
    inference_url: String,
    token: Option<String>,
    cache_dir: PathBuf,
    device: DevicePreference,
    timeout: Duration,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpecialToken {
    Text(String),
    Added { content: String },
}

impl SpecialToken {
    fn into_text(self) -> String {
        match self {
            SpecialToken::Text(s) => s,
            SpecialToken::Added { content } => content,
        }
    }
}

#[derive(Deserialize)]
struct TokenizerConfig {
    #[serde(default)]
    eos_token: Option<SpecialToken>,
    #[serde(default)]
    pad_token: Option<SpecialToken>,
}

impl ModelLoader {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            hub_url: config.hub_url.trim_end_matches('/').to_string(),
            inference_url: config.inference_url.clone(),
            token: config.huggingface_hub_token.clone(),
            cache_dir: config.hf_cache_dir.clone(),
            device: config.device,
            timeout: config.load_timeout(),
        })
    }

    /// Resolves `model_id` into a generation-ready handle.
    ///
    /// Every failure is reported as [`Error::ModelUnavailable`] so the caller
    /// can keep serving in a degraded mode.
    pub async fn load(&self, model_id: &str, kind: ModelKind) -> Result<LoadedModel> {
        if self.token.is_none() {
            warn!("HUGGINGFACE_HUB_TOKEN is not set; proceeding without a token for public models");
        }

        let tokenizer = self.load_tokenizer(model_id).await?;

        let backend = TgiClient::new(self.client.clone(), self.inference_url.clone());
        let backend_info = backend.info(self.timeout).await.map_err(|e| {
            Error::ModelUnavailable(format!(
                "inference backend at {} is unreachable: {}",
                self.inference_url, e
            ))
        })?;
        if backend_info.model_id != model_id {
            warn!(
                "Inference backend serves '{}' but '{}' was requested",
                backend_info.model_id, model_id
            );
        }

        let device = select_device(self.device, &backend_info);
        let precision = select_precision(device, &backend_info);
        info!("Using device: {:?}", device);
        info!("Loaded {} model '{}' on {:?} ({:?})", kind, model_id, device, precision);

        Ok(LoadedModel {
            model_id: model_id.to_string(),
            kind,
            device,
            precision,
            tokenizer,
            backend: Arc::new(backend),
        })
    }

    /// Reads the tokenizer config from the local cache, fetching it from the
    /// hub on a miss.
    pub async fn load_tokenizer(&self, model_id: &str) -> Result<TokenizerHandle> {
        let cached = cache_path(&self.cache_dir, model_id);

        let raw = match tokio::fs::read_to_string(&cached).await {
            Ok(raw) => raw,
            Err(_) => {
                let raw = self.fetch_tokenizer_config(model_id).await?;
                if let Err(e) = write_cache(&cached, &raw).await {
                    warn!("Could not cache tokenizer config at {}: {}", cached.display(), e);
                }
                raw
            }
        };

        parse_tokenizer_config(&raw)
    }

    async fn fetch_tokenizer_config(&self, model_id: &str) -> Result<String> {
        let url = format!("{}/{}/resolve/main/{}", self.hub_url, model_id, TOKENIZER_CONFIG);

        let mut request = self.client.get(&url).timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::ModelUnavailable(format!("fetching {}: {}", url, e)))?;

        match response.status() {
            s if s.is_success() => response
                .text()
                .await
                .map_err(|e| Error::ModelUnavailable(e.to_string())),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                let reason = if self.token.is_some() {
                    format!("access to '{}' was denied for the configured token", model_id)
                } else {
                    format!("'{}' is gated and HUGGINGFACE_HUB_TOKEN is not set", model_id)
                };
                Err(Error::ModelUnavailable(reason))
            }
            s => Err(Error::ModelUnavailable(format!(
                "hub answered {} for '{}'",
                s, model_id
            ))),
        }
    }
}

/// Hub cache layout: `<cache>/models--<org>--<name>/tokenizer_config.json`.
fn cache_path(cache_dir: &Path, model_id: &str) -> PathBuf {
    cache_dir
        .join(format!("models--{}", model_id.replace('/', "--")))
        .join(TOKENIZER_CONFIG)
}

async fn write_cache(path: &Path, raw: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, raw).await
}

fn parse_tokenizer_config(raw: &str) -> Result<TokenizerHandle> {
    let config: TokenizerConfig = serde_json::from_str(raw)
        .map_err(|e| Error::ModelUnavailable(format!("malformed tokenizer config: {}", e)))?;

    Ok(TokenizerHandle {
        eos_token: config.eos_token.map(SpecialToken::into_text),
        pad_token: config.pad_token.map(SpecialToken::into_text),
    })
}

fn select_device(preference: DevicePreference, info: &BackendInfo) -> Device {
    match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => Device::Cuda,
        DevicePreference::Auto => match info.model_device_type.as_deref() {
            Some(kind) if !kind.eq_ignore_ascii_case("cpu") => Device::Cuda,
            _ => Device::Cpu,
        },
    }
}

fn select_precision(device: Device, info: &BackendInfo) -> Precision {
    let bf16_capable = info
        .model_dtype
        .as_deref()
        .map(|dtype| dtype.contains("bfloat16"))
        .unwrap_or(false);

    if device == Device::Cuda && bf16_capable {
        Precision::Bfloat16
    } else {
        Precision::Auto
    }
}
