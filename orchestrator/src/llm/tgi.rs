// Text-generation-inference HTTP client

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationParams, TextGeneration};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct TgiClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParams,
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

// `/generate` answers with an object; the hosted inference API wraps it in a list
#[derive(Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Single(Generated),
    Batch(Vec<Generated>),
}

/// What the server reports about the model it serves.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendInfo {
    pub model_id: String,
    #[serde(default)]
    pub model_dtype: Option<String>,
    #[serde(default)]
    pub model_device_type: Option<String>,
}

impl TgiClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn info(&self, timeout: Duration) -> Result<BackendInfo> {
        let url = format!("{}/info", self.base_url);
        let info = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<BackendInfo>()
            .await?;
        Ok(info)
    }
}

#[async_trait]
impl TextGeneration for TgiClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let url = format!("{}/generate", self.base_url);
        debug!("Generating up to {} tokens via {}", params.max_new_tokens, url);

        let response = self
            .client
            .post(url)
            .json(&GenerateRequest {
                inputs: prompt,
                parameters: params,
            })
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("{}: {}", status, body)));
        }

        let generated = match response.json::<GenerateResponse>().await? {
            GenerateResponse::Single(g) => g.generated_text,
            GenerateResponse::Batch(batch) => batch
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .unwrap_or_default(),
        };

        Ok(generated)
    }
}
